//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which holds the service base URL, the credential storage backend and the
//! request timeout.
//!
//! Configuration is stored at `~/.config/pucktual/config.json`. The directory
//! can be overridden with `PUCKTUAL_CONFIG_DIR`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Application name used for config/data directory paths
const APP_NAME: &str = "pucktual";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment override for the config directory
const CONFIG_DIR_ENV: &str = "PUCKTUAL_CONFIG_DIR";

/// Environment override for the data directory (file credential store)
const DATA_DIR_ENV: &str = "PUCKTUAL_DATA_DIR";

/// HTTP request timeout in seconds.
/// 30s allows for slow responses while failing fast enough to fall back to the login prompt.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Where the token and credentials are persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    /// OS keychain
    #[default]
    Keyring,
    /// JSON file in the data directory
    File,
}

impl FromStr for CredentialBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keyring" => Ok(CredentialBackend::Keyring),
            "file" => Ok(CredentialBackend::File),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

impl fmt::Display for CredentialBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialBackend::Keyring => write!(f, "keyring"),
            CredentialBackend::File => write!(f, "file"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("URL must not be empty")]
    EmptyUrl,

    #[error("URL must start with http:// or https:// (got {0})")]
    InvalidScheme(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Unknown credential backend: {0} (expected keyring or file)")]
    UnknownBackend(String),

    #[error("Failed to persist configuration: {0:#}")]
    Persist(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default)]
    pub credential_backend: CredentialBackend,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

impl Config {
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = match std::env::var_os(CONFIG_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::config_dir()
                .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
                .join(APP_NAME),
        };
        Ok(config_dir.join(CONFIG_FILE))
    }

    /// Directory for the file credential store
    pub fn data_dir() -> Result<PathBuf> {
        match std::env::var_os(DATA_DIR_ENV) {
            Some(dir) => Ok(PathBuf::from(dir)),
            None => Ok(dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?
                .join(APP_NAME)),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }
}

/// Validate a user-entered base URL and bring it into canonical form.
///
/// Only http(s) URLs are accepted. A trailing slash is appended to the path
/// so relative endpoint paths join below the base instead of replacing its
/// last segment.
pub fn normalize_base_url(url: &str) -> Result<String, ConfigError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(ConfigError::EmptyUrl);
    }
    let lower = url.to_ascii_lowercase();
    if !lower.starts_with("http://") && !lower.starts_with("https://") {
        return Err(ConfigError::InvalidScheme(url.to_string()));
    }
    let mut parsed =
        Url::parse(url).map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", url, e)))?;
    if !parsed.path().ends_with('/') {
        let path = format!("{}/", parsed.path());
        parsed.set_path(&path);
    }
    Ok(parsed.to_string())
}

/// Owns the persisted base URL of the remote service.
///
/// Reads are served from memory; every change is written through to the
/// config file before it becomes visible.
#[derive(Debug)]
pub struct UrlManager {
    path: PathBuf,
    config: RwLock<Config>,
}

impl UrlManager {
    pub fn new(config: Config, path: PathBuf) -> Self {
        Self {
            path,
            config: RwLock::new(config),
        }
    }

    /// Load the config at `path` (defaults when the file is absent)
    pub fn open(path: PathBuf) -> Result<Self> {
        let config = Config::load_from(&path)?;
        Ok(Self::new(config, path))
    }

    /// Validate, normalize and persist a new base URL. Returns the stored form.
    pub fn save_base_url(&self, url: &str) -> Result<String, ConfigError> {
        let formatted = normalize_base_url(url)?;
        self.update(|config| config.base_url = Some(formatted.clone()))?;
        info!(base_url = %formatted, "Base URL saved");
        Ok(formatted)
    }

    pub fn base_url(&self) -> Option<String> {
        self.snapshot()
            .base_url
            .filter(|url| !url.trim().is_empty())
    }

    pub fn is_configured(&self) -> bool {
        self.base_url().is_some()
    }

    /// Forget the base URL, sending the user back through setup
    pub fn reset_base_url(&self) -> Result<(), ConfigError> {
        debug!("Resetting base URL");
        self.update(|config| config.base_url = None)
    }

    /// Copy of the current configuration
    pub fn snapshot(&self) -> Config {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn update<F: FnOnce(&mut Config)>(&self, change: F) -> Result<(), ConfigError> {
        let mut guard = self.config.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = guard.clone();
        change(&mut next);
        next.save_to(&self.path)?;
        *guard = next;
        Ok(())
    }
}
