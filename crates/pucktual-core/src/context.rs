//! Wiring of configuration, credential store, API client and session.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use crate::api::ApiClient;
use crate::auth::{ActiveToken, CredentialStore, FileStore, KeyringStore, SessionCoordinator};
use crate::config::{Config, CredentialBackend, UrlManager};

/// Everything a front end needs, built once at startup.
///
/// One `ActiveToken` is shared between the API client (which signs requests
/// with it) and the session coordinator (which decides its value).
pub struct AppContext {
    pub urls: Arc<UrlManager>,
    pub api: ApiClient,
    pub session: SessionCoordinator,
}

impl AppContext {
    /// Build from a loaded config, choosing the store backend it names
    pub fn new(config: Config, config_path: PathBuf) -> Result<Self> {
        let store: Arc<dyn CredentialStore> = match config.credential_backend {
            CredentialBackend::Keyring => Arc::new(KeyringStore::new()),
            CredentialBackend::File => Arc::new(FileStore::open_default()?),
        };
        debug!(backend = %config.credential_backend, "Credential store selected");
        Self::with_store(config, config_path, store)
    }

    /// Build with an explicit credential store
    pub fn with_store(
        config: Config,
        config_path: PathBuf,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Self> {
        let timeout = config.request_timeout();
        let urls = Arc::new(UrlManager::new(config, config_path));
        let token = ActiveToken::new();
        let api = ApiClient::new(Arc::clone(&urls), token.clone(), timeout)
            .context("Failed to create HTTP client")?;
        let session = SessionCoordinator::new(store, api.clone(), token);

        Ok(Self { urls, api, session })
    }
}
