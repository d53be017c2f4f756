use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::api::ApiClient;

use super::{ActiveToken, AuthError, CredentialStore, Credentials};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
}

/// Where the token activated by an automatic login came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    /// Token persisted by an earlier session; no request was made
    Stored,
    /// Fresh token obtained with the stored username and password
    LoggedIn,
}

/// Decides whether a session exists, obtains one when possible and keeps the
/// active token in sync with the credential store.
///
/// Login attempts and logout are serialized: each holds the login lock for
/// its whole read-store, call-service, write-store sequence.
pub struct SessionCoordinator {
    store: Arc<dyn CredentialStore>,
    api: ApiClient,
    token: ActiveToken,
    login_lock: Mutex<()>,
}

impl SessionCoordinator {
    /// `token` must be the same handle the API client signs requests with
    pub fn new(store: Arc<dyn CredentialStore>, api: ApiClient, token: ActiveToken) -> Self {
        Self {
            store,
            api,
            token,
            login_lock: Mutex::new(()),
        }
    }

    pub fn state(&self) -> SessionState {
        if self.token.is_active() {
            SessionState::Authenticated
        } else {
            SessionState::Unauthenticated
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.state() == SessionState::Authenticated
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub fn active_token(&self) -> &ActiveToken {
        &self.token
    }

    /// Restore a session without user interaction.
    ///
    /// Uses the stored token when there is one. Otherwise logs in with the
    /// stored username and password. A failed attempt leaves the store as it
    /// was: the credentials may work again once the service is reachable.
    pub async fn perform_auto_login(&self) -> Result<TokenSource, AuthError> {
        let _guard = self.login_lock.lock().await;

        if let Some(token) = self.store.token()?.filter(|t| !t.trim().is_empty()) {
            debug!("Using stored token");
            self.token.set(token);
            return Ok(TokenSource::Stored);
        }

        let credentials = match self.store.credentials()? {
            Some(credentials) if credentials.is_complete() => credentials,
            _ => {
                debug!("No stored credentials, skipping automatic login");
                return Err(AuthError::NoCredentials);
            }
        };

        match self.api.login(&credentials).await {
            Ok(token) => {
                self.store.save_token(&token)?;
                self.token.set(token);
                info!(username = %credentials.username, "Automatic login successful");
                Ok(TokenSource::LoggedIn)
            }
            Err(e) => {
                warn!(error = %e, "Automatic login failed");
                Err(AuthError::LoginFailed(e))
            }
        }
    }

    /// Log in with credentials supplied by the user.
    ///
    /// Skips the stored token and credentials entirely. On success the token
    /// and the credentials are persisted; on any failure the active token is
    /// cleared and all stored state wiped. A store that cannot be wiped is
    /// logged; the login failure is still what the caller sees.
    pub async fn manual_login(&self, credentials: Credentials) -> Result<(), AuthError> {
        let _guard = self.login_lock.lock().await;

        match self.api.login(&credentials).await {
            Ok(token) => {
                self.store.save_token(&token)?;
                self.token.set(token);
                self.store
                    .save_credentials(&credentials.username, &credentials.password)?;
                info!(username = %credentials.username, "Login successful");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, username = %credentials.username, "Login failed, clearing stored credentials");
                self.token.clear();
                if let Err(clear_err) = self.store.clear_all() {
                    warn!(error = %clear_err, "Failed to clear stored credentials after failed login");
                }
                Err(AuthError::LoginFailed(e))
            }
        }
    }

    /// Forget the session: clear the store and the active token
    pub async fn logout(&self) -> Result<(), AuthError> {
        let _guard = self.login_lock.lock().await;
        self.token.clear();
        self.store.clear_all()?;
        info!("Logged out");
        Ok(())
    }
}
