//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::Result;
use pucktual_core::{AppContext, Config, CredentialStore};
use tempfile::TempDir;
use wiremock::{Match, Request};

#[derive(Default, Clone)]
struct State {
    token: Option<String>,
    username: Option<String>,
    password: Option<String>,
}

/// In-memory credential store for tests
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    fail_clear: bool,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_token(token: &str) -> Arc<Self> {
        let store = Self::default();
        store.state.lock().unwrap().token = Some(token.to_string());
        Arc::new(store)
    }

    pub fn with_credentials(username: &str, password: &str) -> Arc<Self> {
        let store = Self::default();
        {
            let mut state = store.state.lock().unwrap();
            state.username = Some(username.to_string());
            state.password = Some(password.to_string());
        }
        Arc::new(store)
    }
}

impl MemoryStore {
    /// Store holding credentials whose `clear_all` always fails
    pub fn with_failing_clear(username: &str, password: &str) -> Arc<Self> {
        let store = Self {
            fail_clear: true,
            ..Self::default()
        };
        store.save_credentials(username, password).unwrap();
        Arc::new(store)
    }
}

impl CredentialStore for MemoryStore {
    fn save_token(&self, token: &str) -> Result<()> {
        self.state.lock().unwrap().token = Some(token.to_string());
        Ok(())
    }

    fn token(&self) -> Result<Option<String>> {
        Ok(self.state.lock().unwrap().token.clone())
    }

    fn save_credentials(&self, username: &str, password: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.username = Some(username.to_string());
        state.password = Some(password.to_string());
        Ok(())
    }

    fn username(&self) -> Result<Option<String>> {
        Ok(self.state.lock().unwrap().username.clone())
    }

    fn password(&self) -> Result<Option<String>> {
        let state = self.state.lock().unwrap();
        Ok(state.username.as_ref().and(state.password.clone()))
    }

    fn clear_all(&self) -> Result<()> {
        if self.fail_clear {
            anyhow::bail!("store is read-only");
        }
        *self.state.lock().unwrap() = State::default();
        Ok(())
    }
}

/// Context pointed at `base_url`, with its config file in a temp dir.
/// Keep the returned `TempDir` alive for the duration of the test.
pub fn context_with(base_url: Option<String>, store: Arc<dyn CredentialStore>) -> (AppContext, TempDir) {
    context_with_timeout(base_url, store, None)
}

pub fn context_with_timeout(
    base_url: Option<String>,
    store: Arc<dyn CredentialStore>,
    timeout_secs: Option<u64>,
) -> (AppContext, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config = Config {
        base_url,
        request_timeout_secs: timeout_secs,
        ..Config::default()
    };
    let ctx = AppContext::with_store(config, dir.path().join("config.json"), store)
        .expect("Failed to build app context");
    (ctx, dir)
}

/// Base URL for a mock server, in the stored (trailing slash) form
pub fn base_url(uri: &str) -> Option<String> {
    Some(format!("{}/", uri))
}

/// Matches requests that carry no Authorization header
pub struct NoAuthorization;

impl Match for NoAuthorization {
    fn matches(&self, request: &Request) -> bool {
        !request.headers.contains_key("authorization")
    }
}
