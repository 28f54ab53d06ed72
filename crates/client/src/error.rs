//! Client error types.

use thiserror::Error;

/// Result type alias for the client crate.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur while running a command.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Auth(#[from] oidcrp_auth::AuthError),

    #[error("invalid configuration: {}", .0.join("; "))]
    InvalidConfig(Vec<String>),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<oidcrp_core::auth::AuthError> for ClientError {
    fn from(err: oidcrp_core::auth::AuthError) -> Self {
        ClientError::Auth(err.into())
    }
}
