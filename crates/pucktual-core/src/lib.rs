//! Pucktual core library.
//!
//! Client-side pieces of the espresso recipe companion: the REST API client,
//! credential persistence, the login session, URL configuration and the
//! list/detail view states.

pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod models;
pub mod utils;
pub mod views;

pub use api::{ApiClient, ApiError};
pub use auth::{
    ActiveToken, AuthError, CredentialStore, Credentials, FileStore, KeyringStore,
    SessionCoordinator, SessionState, TokenSource,
};
pub use config::{Config, ConfigError, CredentialBackend, UrlManager};
pub use context::AppContext;
pub use models::{Bean, Extraction};
pub use views::{BeanListState, ExtractionState};
