use thiserror::Error;

/// Auth errors for the oidcrp_auth crate.
///
/// This wraps the core `AuthError` and adds crate-specific error variants
/// for I/O operations that can't be in the functional core.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Error from the core auth module (validation, token parsing, etc.)
    #[error(transparent)]
    Core(#[from] oidcrp_core::auth::AuthError),

    /// HTTP client error during OIDC flow
    #[error("HTTP error: {0}")]
    Http(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl AuthError {
    /// Whether the failure came from the identity provider rather than this client.
    pub fn is_provider_failure(&self) -> bool {
        use oidcrp_core::auth::AuthError as CoreError;

        match self {
            AuthError::Core(core_err) => matches!(
                core_err,
                CoreError::ProviderError { .. } | CoreError::CodeExchange(_) | CoreError::Provider(_)
            ),
            AuthError::Http(_) => true,
            AuthError::Config(_) => false,
        }
    }
}
