use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Config;

const SERVICE_NAME: &str = "pucktual";

/// Keys used for the persisted fields
const TOKEN_KEY: &str = "auth_token";
const USERNAME_KEY: &str = "saved_username";
const PASSWORD_KEY: &str = "saved_password";

/// File name of the file-backed store inside the data directory
const STORE_FILE: &str = "auth.json";

/// Username and password as entered by the user
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Both fields contain something other than whitespace
    pub fn is_complete(&self) -> bool {
        !self.username.trim().is_empty() && !self.password.trim().is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Durable storage for one bearer token and one username/password pair.
///
/// Credentials are written and cleared as a pair; implementations must never
/// report a password whose username is missing.
pub trait CredentialStore: Send + Sync {
    /// Overwrite the stored token
    fn save_token(&self, token: &str) -> Result<()>;

    fn token(&self) -> Result<Option<String>>;

    /// Overwrite username and password together
    fn save_credentials(&self, username: &str, password: &str) -> Result<()>;

    fn username(&self) -> Result<Option<String>>;

    fn password(&self) -> Result<Option<String>>;

    /// Remove token, username and password
    fn clear_all(&self) -> Result<()>;

    fn credentials(&self) -> Result<Option<Credentials>> {
        match (self.username()?, self.password()?) {
            (Some(username), Some(password)) => Ok(Some(Credentials::new(username, password))),
            _ => Ok(None),
        }
    }
}

// ============================================================================
// OS keychain
// ============================================================================

/// Stores every field as its own entry in the OS keychain
pub struct KeyringStore {
    service: String,
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyringStore {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        Entry::new(&self.service, key).context("Failed to create keyring entry")
    }

    fn read(&self, key: &str) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to retrieve {} from keychain", key)),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .with_context(|| format!("Failed to store {} in keychain", key))
    }

    fn delete(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to delete {} from keychain", key)),
        }
    }
}

impl CredentialStore for KeyringStore {
    fn save_token(&self, token: &str) -> Result<()> {
        self.write(TOKEN_KEY, token)
    }

    fn token(&self) -> Result<Option<String>> {
        self.read(TOKEN_KEY)
    }

    fn save_credentials(&self, username: &str, password: &str) -> Result<()> {
        self.write(USERNAME_KEY, username)?;
        if let Err(e) = self.write(PASSWORD_KEY, password) {
            // Don't leave a username paired with a stale password
            if let Err(cleanup) = self.delete(USERNAME_KEY) {
                warn!(error = %cleanup, "Failed to roll back username after password write failed");
            }
            return Err(e);
        }
        Ok(())
    }

    fn username(&self) -> Result<Option<String>> {
        self.read(USERNAME_KEY)
    }

    fn password(&self) -> Result<Option<String>> {
        if self.read(USERNAME_KEY)?.is_none() {
            return Ok(None);
        }
        self.read(PASSWORD_KEY)
    }

    fn clear_all(&self) -> Result<()> {
        // Attempt every key even if one fails, then report the first failure
        let results = [
            self.delete(TOKEN_KEY),
            self.delete(PASSWORD_KEY),
            self.delete(USERNAME_KEY),
        ];
        results.into_iter().collect::<Result<Vec<_>>>()?;
        Ok(())
    }
}

// ============================================================================
// JSON file
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
struct PersistedState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    password: Option<String>,
}

impl PersistedState {
    fn is_empty(&self) -> bool {
        self.token.is_none() && self.username.is_none() && self.password.is_none()
    }
}

/// Keeps the auth state in a single JSON document.
///
/// Every save rewrites the whole document through a temporary file that is
/// renamed into place, so token and credential updates are all-or-nothing.
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Store rooted at `dir` (the file is `dir/auth.json`)
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(STORE_FILE),
            lock: Mutex::new(()),
        }
    }

    /// Store in the default data directory
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(Config::data_dir()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<PersistedState> {
        if !self.path.exists() {
            return Ok(PersistedState::default());
        }
        let contents = std::fs::read_to_string(&self.path)
            .context("Failed to read credential file")?;
        serde_json::from_str(&contents).context("Failed to parse credential file")
    }

    fn store(&self, state: &PersistedState) -> Result<()> {
        if state.is_empty() {
            return Self::remove_if_present(&self.path);
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_vec_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        // A leftover tmp file would keep its old permissions
        Self::remove_if_present(&tmp)?;
        {
            let mut options = OpenOptions::new();
            options.write(true).create(true).truncate(true);
            #[cfg(unix)]
            {
                use std::os::unix::fs::OpenOptionsExt;
                options.mode(0o600);
            }
            let mut file = options
                .open(&tmp)
                .context("Failed to create temporary credential file")?;
            file.write_all(&contents)?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp, &self.path).context("Failed to replace credential file")?;
        debug!(path = %self.path.display(), "Credential file written");
        Ok(())
    }

    fn remove_if_present(path: &Path) -> Result<()> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
        }
    }

    fn read<T, F: FnOnce(PersistedState) -> T>(&self, f: F) -> Result<T> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(f(self.load()?))
    }

    fn modify<F: FnOnce(&mut PersistedState)>(&self, change: F) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut state = self.load()?;
        change(&mut state);
        self.store(&state)
    }
}

impl CredentialStore for FileStore {
    fn save_token(&self, token: &str) -> Result<()> {
        self.modify(|state| state.token = Some(token.to_string()))
    }

    fn token(&self) -> Result<Option<String>> {
        self.read(|state| state.token)
    }

    fn save_credentials(&self, username: &str, password: &str) -> Result<()> {
        self.modify(|state| {
            state.username = Some(username.to_string());
            state.password = Some(password.to_string());
        })
    }

    fn username(&self) -> Result<Option<String>> {
        self.read(|state| state.username)
    }

    fn password(&self) -> Result<Option<String>> {
        self.read(|state| state.username.and(state.password))
    }

    /// Deletes the file without reading it, so a corrupt file can still be cleared
    fn clear_all(&self) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Self::remove_if_present(&self.path)?;
        debug!(path = %self.path.display(), "Credential file removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials::new("barista", "hunter2");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("barista"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_credentials_is_complete() {
        assert!(Credentials::new("u", "p").is_complete());
        assert!(!Credentials::new("", "p").is_complete());
        assert!(!Credentials::new("u", "   ").is_complete());
    }

    #[test]
    fn test_file_store_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert_eq!(store.token().unwrap(), None);
        assert_eq!(store.username().unwrap(), None);
        assert_eq!(store.password().unwrap(), None);
        assert_eq!(store.credentials().unwrap(), None);
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileStore::new(dir.path());
            store.save_token("tok-1").unwrap();
            store.save_credentials("barista", "hunter2").unwrap();
        }

        let store = FileStore::new(dir.path());
        assert_eq!(store.token().unwrap().as_deref(), Some("tok-1"));
        assert_eq!(
            store.credentials().unwrap(),
            Some(Credentials::new("barista", "hunter2"))
        );
    }

    #[test]
    fn test_file_store_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.save_token("old").unwrap();
        store.save_token("new").unwrap();
        store.save_credentials("a", "1").unwrap();
        store.save_credentials("b", "2").unwrap();

        assert_eq!(store.token().unwrap().as_deref(), Some("new"));
        assert_eq!(store.username().unwrap().as_deref(), Some("b"));
        assert_eq!(store.password().unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn test_file_store_clear_all_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.save_token("tok").unwrap();
        store.save_credentials("barista", "hunter2").unwrap();
        assert!(store.path().exists());

        store.clear_all().unwrap();
        assert!(!store.path().exists());
        assert_eq!(store.token().unwrap(), None);
        assert_eq!(store.credentials().unwrap(), None);
    }

    #[test]
    fn test_file_store_hides_orphaned_password() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        std::fs::write(store.path(), r#"{"password": "orphan"}"#).unwrap();

        assert_eq!(store.password().unwrap(), None);
        assert_eq!(store.credentials().unwrap(), None);
    }

    #[test]
    fn test_file_store_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        std::fs::write(store.path(), "not json").unwrap();
        assert!(store.token().is_err());
    }

    #[test]
    fn test_file_store_clear_all_removes_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        std::fs::write(store.path(), "{not json").unwrap();

        store.clear_all().unwrap();
        assert!(!store.path().exists());
        assert_eq!(store.token().unwrap(), None);
    }

    #[test]
    fn test_file_store_clear_all_without_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FileStore::new(dir.path()).clear_all().is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_replaces_stale_tmp_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let tmp = store.path().with_extension("json.tmp");
        std::fs::write(&tmp, "leftover").unwrap();
        std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o644)).unwrap();

        store.save_token("tok").unwrap();
        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert!(!tmp.exists());
    }

    /// Needs a real OS keychain (Secret Service, macOS Keychain or Windows
    /// Credential Manager); run with `cargo test -- --ignored`.
    #[test]
    #[ignore]
    fn test_keyring_store_round_trip() {
        let store = KeyringStore::with_service("pucktual-test");
        store.clear_all().unwrap();

        store.save_token("tok-1").unwrap();
        store.save_credentials("barista", "hunter2").unwrap();

        // A second handle reads through the keychain, not through memory
        let reopened = KeyringStore::with_service("pucktual-test");
        assert_eq!(reopened.token().unwrap().as_deref(), Some("tok-1"));
        assert_eq!(
            reopened.credentials().unwrap(),
            Some(Credentials::new("barista", "hunter2"))
        );

        reopened.clear_all().unwrap();
        assert_eq!(store.token().unwrap(), None);
        assert_eq!(store.credentials().unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.save_token("tok").unwrap();
        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
