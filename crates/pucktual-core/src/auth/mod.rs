//! Authentication module for managing credentials and the login session.
//!
//! This module provides:
//! - `CredentialStore`: persistence for the token and username/password pair,
//!   backed by the OS keychain (`KeyringStore`) or a JSON file (`FileStore`)
//! - `ActiveToken`: the bearer token used to sign outgoing requests
//! - `SessionCoordinator`: automatic and manual login
//!
//! Tokens have no client-visible expiry. A token stays valid until the
//! service answers 401 or the user logs out.

pub mod credentials;
pub mod error;
pub mod session;
pub mod token;

pub use credentials::{CredentialStore, Credentials, FileStore, KeyringStore};
pub use error::AuthError;
pub use session::{SessionCoordinator, SessionState, TokenSource};
pub use token::ActiveToken;
