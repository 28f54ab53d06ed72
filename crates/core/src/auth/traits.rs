use async_trait::async_trait;
use url::Url;

use super::{
    AuthError, AuthFlowState, AuthorizationRequest, FrameHandle, StoredTokens, TokenResponse,
};

/// Result type for auth operations.
pub type Result<T> = std::result::Result<T, AuthError>;

// ==================== Orchestrator collaborators ====================

/// Decides whether a usable configuration is present.
pub trait ConfigurationGate: Send + Sync {
    /// Pure predicate over the active configuration.
    fn has_valid_config(&self) -> bool;

    /// Interval for the periodic token check, from the active configuration.
    fn token_refresh_in_seconds(&self) -> u64;
}

/// Decides whether a navigation is the identity provider's callback.
pub trait CallbackDetector: Send + Sync {
    fn is_callback(&self, current_url: &str) -> bool;
}

/// Completes a login from the provider's callback.
#[async_trait]
pub trait CallbackProcessor: Send + Sync {
    /// Exchange or parse the callback, persist the tokens and fire the
    /// events of a freshly completed login.
    ///
    /// Implementations log their own failures before returning them.
    async fn handle_callback_and_fire_events(&self, current_url: &str) -> Result<()>;
}

/// Reports whether the persisted tokens form a valid session.
pub trait SessionValidator: Send + Sync {
    fn are_auth_storage_tokens_valid(&self) -> bool;
}

/// Flips the process-wide authenticated flag and notifies subscribers.
pub trait AuthStatePublisher: Send + Sync {
    fn set_authorized_and_fire_event(&self);
}

/// Republishes cached user data.
pub trait UserProfilePublisher: Send + Sync {
    fn publish_user_data_if_exists(&self);
}

/// Recurring background token validation.
pub trait PeriodicValidityScheduler: Send + Sync {
    /// Start the check. Must not create a second timer while one is running.
    fn start_token_validation_periodically(&self, interval_seconds: u64);
}

/// Iframe-based detection of provider session changes.
pub trait SessionChangeMonitor: Send + Sync {
    fn is_check_session_configured(&self) -> bool;

    /// Start polling. A no-op while already running.
    fn start(&self);
}

/// Hidden channel used to renew tokens without a redirect.
pub trait SilentRenewProvisioner: Send + Sync {
    fn is_silent_renew_configured(&self) -> bool;

    /// Returns the existing renewal frame or creates it.
    fn get_or_create_iframe(&self) -> Result<FrameHandle>;
}

// ==================== External boundaries ====================

/// Abstraction over the OIDC provider's HTTP endpoints.
#[async_trait]
pub trait OidcProviderClient: Send + Sync {
    /// Generate the authorization URL for a redirect or a silent renewal.
    async fn authorization_url(&self, request: &AuthorizationRequest) -> Result<Url>;

    /// Exchange an authorization code for tokens.
    async fn exchange_code(
        &self,
        code: &str,
        pkce_verifier: Option<&str>,
        redirect_uri: Option<&Url>,
    ) -> Result<TokenResponse>;

    /// Refresh-token grant.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse>;

    /// Check the signature and audience of an ID token this client did not
    /// obtain itself, such as one delivered in an implicit-flow fragment.
    fn verify_id_token(&self, id_token: &str) -> Result<()>;
}

/// Persisted-storage primitives for the relying party.
pub trait AuthStorage: Send + Sync {
    fn read_tokens(&self) -> Result<Option<StoredTokens>>;

    fn write_tokens(&self, tokens: &StoredTokens) -> Result<()>;

    fn read_user_data(&self) -> Result<Option<serde_json::Value>>;

    fn write_user_data(&self, data: &serde_json::Value) -> Result<()>;

    fn read_session_state(&self) -> Result<Option<String>>;

    fn write_session_state(&self, session_state: Option<&str>) -> Result<()>;

    /// Store state/nonce/PKCE for a pending authorization.
    fn store_auth_flow(&self, state: &str, flow: &AuthFlowState) -> Result<()>;

    /// Retrieve a pending authorization without consuming it.
    fn peek_auth_flow(&self, state: &str) -> Result<Option<AuthFlowState>>;

    /// Retrieve and delete a pending authorization. Makes the state single use.
    fn take_auth_flow(&self, state: &str) -> Result<Option<AuthFlowState>>;

    /// Drop tokens, user data and session state. Pending flows survive.
    fn clear_auth_data(&self) -> Result<()>;
}

/// Host-side management of hidden frames (iframes, webviews).
pub trait FrameHost: Send + Sync {
    /// Return the frame with this id, creating it if needed.
    fn get_or_create_frame(&self, id: &str) -> Result<FrameHandle>;

    /// Load a URL into the frame.
    fn navigate(&self, frame: &FrameHandle, url: &Url) -> Result<()>;

    /// `postMessage` into the frame.
    fn post_message(&self, frame: &FrameHandle, message: &str, target_origin: &str) -> Result<()>;
}
