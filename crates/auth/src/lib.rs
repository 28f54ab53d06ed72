//! OpenID Connect relying-party client for oidcrp.
//!
//! This crate provides:
//! - The check-auth orchestrator and the services it coordinates
//! - An openidconnect-backed provider client (and a mock one with `mock`)
//! - Background token checks, session-change monitoring and silent renewal
//! - A mock identity provider server (feature `mock`)

mod callback;
mod check_auth;
mod config;
mod error;
mod iframe;
mod login;
mod periodic;
mod providers;
mod security;
mod state;
mod storage;
mod tokens;
mod user;

pub use callback::{CallbackService, UrlCallbackDetector};
pub use check_auth::{CheckAuthCollaborators, CheckAuthService};
pub use config::ConfigurationProvider;
pub use error::AuthError;
pub use iframe::{
    CheckSessionService, PostedMessage, RecordingFrameHost, SilentRenewService,
    CHECK_SESSION_FRAME_ID, SILENT_RENEW_FRAME_ID,
};
pub use login::LoginService;
pub use periodic::{PeriodicTokenCheckService, TickOutcome};
#[cfg(feature = "mock")]
pub use providers::{MockProvider, MockUser};
pub use providers::{new_pkce_pair, OpenIdProvider};
pub use security::OidcSecurityService;
pub use state::AuthStateService;
pub use storage::InMemoryAuthStorage;
pub use tokens::decode_id_token_claims;
pub use user::UserService;

#[cfg(feature = "mock")]
pub mod mock_idp;
