use thiserror::Error;

use crate::api::ApiError;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("No stored credentials")]
    NoCredentials,

    #[error("Login failed: {0}")]
    LoginFailed(#[source] ApiError),

    #[error("Credential store unavailable: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl AuthError {
    /// The login attempt itself failed (as opposed to nothing to try, or storage trouble)
    pub fn is_login_failure(&self) -> bool {
        matches!(self, AuthError::LoginFailed(_))
    }

    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            AuthError::LoginFailed(e) => Some(e),
            _ => None,
        }
    }
}
