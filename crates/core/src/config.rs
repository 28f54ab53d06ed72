//! Relying-party configuration.

use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::auth::ResponseType;

/// Default interval between periodic token checks.
pub const DEFAULT_TOKEN_REFRESH_IN_SECONDS: u64 = 4;

/// Default heartbeat of the check-session poller.
pub const DEFAULT_CHECK_SESSION_INTERVAL_IN_SECONDS: u64 = 3;

/// Default tolerance for the ID token `iat` claim.
pub const DEFAULT_MAX_ID_TOKEN_IAT_OFFSET_IN_SECONDS: i64 = 120;

/// OpenID Connect client configuration.
///
/// Owned by the application and read-only to the auth services. Loading and
/// merging happen outside this crate; `from_env` covers the simple case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenIdConfiguration {
    /// Issuer / security token service URL.
    pub sts_server: String,
    /// Where the provider sends the user back after login.
    pub redirect_url: String,
    pub client_id: String,
    pub response_type: String,
    pub scope: String,
    pub post_logout_redirect_uri: Option<String>,
    /// Start the iframe-based session-change monitor after login.
    pub start_checksession: bool,
    /// Check-session iframe endpoint advertised by the provider.
    pub check_session_iframe: Option<String>,
    pub check_session_interval_in_seconds: u64,
    /// Renew tokens through a hidden iframe before they expire.
    pub silent_renew: bool,
    pub silent_renew_url: Option<String>,
    /// Renew tokens with the refresh-token grant instead of an iframe.
    pub use_refresh_token: bool,
    pub token_refresh_in_seconds: u64,
    /// Treat tokens as expired this many seconds early.
    pub silent_renew_offset_in_seconds: i64,
    pub max_id_token_iat_offset_allowed_in_seconds: i64,
    pub disable_iat_offset_validation: bool,
    /// Fire `AuthEvent::NewAuthorizationResult` after each callback.
    pub trigger_authorization_result_event: bool,
}

impl Default for OpenIdConfiguration {
    fn default() -> Self {
        Self {
            sts_server: String::new(),
            redirect_url: String::new(),
            client_id: String::new(),
            response_type: "code".to_string(),
            scope: "openid email profile".to_string(),
            post_logout_redirect_uri: None,
            start_checksession: false,
            check_session_iframe: None,
            check_session_interval_in_seconds: DEFAULT_CHECK_SESSION_INTERVAL_IN_SECONDS,
            silent_renew: false,
            silent_renew_url: None,
            use_refresh_token: false,
            token_refresh_in_seconds: DEFAULT_TOKEN_REFRESH_IN_SECONDS,
            silent_renew_offset_in_seconds: 0,
            max_id_token_iat_offset_allowed_in_seconds: DEFAULT_MAX_ID_TOKEN_IAT_OFFSET_IN_SECONDS,
            disable_iat_offset_validation: false,
            trigger_authorization_result_event: false,
        }
    }
}

impl OpenIdConfiguration {
    /// Load from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OIDC_STS_SERVER`: Issuer URL (required for a valid configuration)
    /// - `OIDC_CLIENT_ID`: Client ID (required for a valid configuration)
    /// - `OIDC_REDIRECT_URL`: Callback URL (default: `http://localhost:4200`)
    /// - `OIDC_RESPONSE_TYPE`: `code` or `id_token token` (default: `code`)
    /// - `OIDC_SCOPE`: Requested scopes (default: `openid email profile`)
    /// - `OIDC_POST_LOGOUT_REDIRECT_URI`: Optional
    /// - `OIDC_START_CHECKSESSION`: `true`/`1` enables the session monitor
    /// - `OIDC_CHECK_SESSION_IFRAME`: Optional check-session endpoint
    /// - `OIDC_SILENT_RENEW`: `true`/`1` enables iframe renewal
    /// - `OIDC_SILENT_RENEW_URL`: Page the renewal iframe lands on
    /// - `OIDC_USE_REFRESH_TOKEN`: `true`/`1` enables refresh-token renewal
    /// - `OIDC_TOKEN_REFRESH_IN_SECONDS`: Periodic check interval (default: 4)
    ///
    /// Missing values are left empty; `validate_config` reports them.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            sts_server: env::var("OIDC_STS_SERVER").unwrap_or_default(),
            redirect_url: env::var("OIDC_REDIRECT_URL")
                .unwrap_or_else(|_| "http://localhost:4200".to_string()),
            client_id: env::var("OIDC_CLIENT_ID").unwrap_or_default(),
            response_type: env::var("OIDC_RESPONSE_TYPE").unwrap_or(defaults.response_type),
            scope: env::var("OIDC_SCOPE").unwrap_or(defaults.scope),
            post_logout_redirect_uri: env::var("OIDC_POST_LOGOUT_REDIRECT_URI").ok(),
            start_checksession: env_flag("OIDC_START_CHECKSESSION"),
            check_session_iframe: env::var("OIDC_CHECK_SESSION_IFRAME").ok(),
            silent_renew: env_flag("OIDC_SILENT_RENEW"),
            silent_renew_url: env::var("OIDC_SILENT_RENEW_URL").ok(),
            use_refresh_token: env_flag("OIDC_USE_REFRESH_TOKEN"),
            token_refresh_in_seconds: env::var("OIDC_TOKEN_REFRESH_IN_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TOKEN_REFRESH_IN_SECONDS),
            ..defaults
        }
    }

    /// Parsed response type. Falls back to the code flow for unknown values,
    /// which `validate_config` reports separately.
    pub fn response_type(&self) -> ResponseType {
        ResponseType::from_str(&self.response_type).unwrap_or(ResponseType::Code)
    }

    /// Parsed redirect URL, if set and well-formed.
    pub fn redirect_url(&self) -> Option<Url> {
        Url::parse(&self.redirect_url).ok()
    }

    /// Whether tokens are renewed in the background at all.
    pub fn renews_tokens(&self) -> bool {
        self.use_refresh_token || self.silent_renew
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}
