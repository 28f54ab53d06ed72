use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use super::AuthError;

/// OAuth2 response type requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseType {
    /// Authorization code flow (with PKCE). Callback data arrives in the query.
    #[serde(rename = "code")]
    Code,
    /// Implicit flow. Tokens arrive in the URL fragment.
    #[serde(rename = "id_token token")]
    IdTokenToken,
}

impl FromStr for ResponseType {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "code" => Ok(Self::Code),
            "id_token token" => Ok(Self::IdTokenToken),
            other => Err(AuthError::InvalidConfig(format!(
                "unsupported response type '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for ResponseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Code => write!(f, "code"),
            Self::IdTokenToken => write!(f, "id_token token"),
        }
    }
}

/// Claims read from an ID token.
///
/// The signature has already been checked by whoever produced the token
/// response; these are only used for expiry and replay checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdTokenClaims {
    pub sub: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub exp: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub iat: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    /// Everything else (email, name, ...). Republished as user data.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Tokens persisted after a successful authorization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredTokens {
    pub access_token: String,
    pub id_token: String,
    pub refresh_token: Option<String>,
    /// Absolute access token expiry, when the provider sent `expires_in`.
    pub access_token_expires_at: Option<DateTime<Utc>>,
    pub id_token_claims: IdTokenClaims,
}

/// Raw token endpoint (or fragment) response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub id_token: Option<String>,
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds.
    pub expires_in: Option<i64>,
}

/// State, nonce and PKCE verifier stored while the user is at the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthFlowState {
    pub nonce: String,
    /// Absent for the implicit flow.
    pub pkce_verifier: Option<String>,
    /// Redirect URL sent with the authorization request when it was not the
    /// configured one. The code exchange must repeat it.
    pub redirect_uri: Option<Url>,
    pub created_at: DateTime<Utc>,
}

/// Parameters the provider needs to build an authorization URL.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizationRequest {
    pub state: String,
    pub nonce: String,
    pub pkce_challenge: Option<String>,
    /// `Some("none")` for silent renewal.
    pub prompt: Option<String>,
    /// Overrides the configured redirect URL (silent renewal page).
    pub redirect_uri: Option<Url>,
}

/// What the provider sent back to the redirect URL.
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackParams {
    Code {
        code: String,
        state: String,
        session_state: Option<String>,
    },
    Implicit {
        access_token: String,
        id_token: String,
        expires_in: Option<i64>,
        state: String,
        session_state: Option<String>,
    },
    Error {
        error: String,
        description: Option<String>,
        state: Option<String>,
    },
}

/// Notifications fired to subscribers of the auth state.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    /// The session was (re)confirmed valid.
    Authorized,
    /// Authorization data was reset.
    Unauthorized,
    /// Cached user profile, republished.
    UserDataChanged(serde_json::Value),
    /// A callback finished; `authorized` says whether it succeeded.
    NewAuthorizationResult { authorized: bool },
    /// The provider reported a session change out-of-band.
    CheckSessionChanged,
    /// A background token renewal failed.
    SilentRenewFailed(String),
}

/// Opaque handle to a hidden frame owned by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FrameHandle(String);

impl FrameHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FrameHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
