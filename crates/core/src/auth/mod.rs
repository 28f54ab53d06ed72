mod callback;
mod error;
mod functions;
mod traits;
mod types;
mod validation;

pub use callback::{callback_state, is_callback_url, parse_callback};
pub use error::AuthError;
pub use functions::{access_token_expiry, generate_nonce, generate_state, has_expired};
pub use traits::{
    AuthStatePublisher, AuthStorage, CallbackDetector, CallbackProcessor, ConfigurationGate,
    FrameHost, OidcProviderClient, PeriodicValidityScheduler, Result, SessionChangeMonitor,
    SessionValidator, SilentRenewProvisioner, UserProfilePublisher,
};
pub use types::{
    AuthEvent, AuthFlowState, AuthorizationRequest, CallbackParams, FrameHandle, IdTokenClaims,
    ResponseType, StoredTokens, TokenResponse,
};
pub use validation::{validate_config, validate_id_token_claims};
