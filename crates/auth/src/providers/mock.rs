//! Mock OIDC provider for development and testing.
//!
//! This module provides a mock implementation of `OidcProviderClient`
//! that works with the Mock IdP server for local development.

use async_trait::async_trait;
use base64::Engine;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use oidcrp_core::auth::{
    AuthError, AuthorizationRequest, OidcProviderClient, ResponseType, Result, TokenResponse,
};
use serde::{Deserialize, Serialize};
use url::Url;

/// Lifetime of mock tokens.
const MOCK_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Shared secret the mock tokens are signed with.
const MOCK_SIGNING_KEY: &[u8] = b"mock-idp";

/// Prefix that turns a mock refresh token back into a subject.
const REFRESH_PREFIX: &str = "mock-refresh-";

/// User info carried inside a mock authorization code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockUser {
    pub sub: String,
    pub email: String,
    pub name: Option<String>,
    pub nonce: Option<String>,
}

impl MockUser {
    /// Encode as an authorization code the way the Mock IdP hands it out.
    pub fn to_code(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(
            serde_json::to_string(self).unwrap_or_default(),
        )
    }

    fn from_code(code: &str) -> Result<Self> {
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(code)
            .map_err(|e| AuthError::CodeExchange(e.to_string()))?;

        serde_json::from_slice(&decoded).map_err(|e| AuthError::CodeExchange(e.to_string()))
    }

    /// Tokens a real provider would return for this user.
    pub fn token_response(&self) -> Result<TokenResponse> {
        let now = Utc::now();
        let mut claims = serde_json::json!({
            "sub": self.sub,
            "email": self.email,
            "name": self.name,
            "iat": now.timestamp(),
            "exp": (now + Duration::seconds(MOCK_TOKEN_LIFETIME_SECS)).timestamp(),
        });
        if let Some(nonce) = &self.nonce {
            claims["nonce"] = serde_json::json!(nonce);
        }

        let id_token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(MOCK_SIGNING_KEY),
        )
        .map_err(|e| AuthError::Provider(e.to_string()))?;

        Ok(TokenResponse {
            access_token: format!("mock-access-{}", self.sub),
            id_token: Some(id_token),
            refresh_token: Some(format!("{REFRESH_PREFIX}{}", self.sub)),
            expires_in: Some(MOCK_TOKEN_LIFETIME_SECS),
        })
    }
}

/// Mock OIDC provider that works with MockIdpServer.
///
/// This provider generates authorization URLs that point to the Mock IdP server
/// and can decode mock authorization codes that contain embedded user info.
pub struct MockProvider {
    mock_idp_url: Url,
    redirect_uri: Url,
    client_id: String,
    response_type: ResponseType,
}

impl MockProvider {
    /// Create a new MockProvider.
    ///
    /// # Arguments
    /// * `mock_idp_url` - The URL of the Mock IdP server (e.g., http://localhost:3001)
    /// * `redirect_uri` - The callback URL of the relying party
    pub fn new(
        mock_idp_url: Url,
        redirect_uri: Url,
        client_id: impl Into<String>,
        response_type: ResponseType,
    ) -> Self {
        Self {
            mock_idp_url,
            redirect_uri,
            client_id: client_id.into(),
            response_type,
        }
    }
}

#[async_trait]
impl OidcProviderClient for MockProvider {
    async fn authorization_url(&self, request: &AuthorizationRequest) -> Result<Url> {
        let mut url = self
            .mock_idp_url
            .join("/authorize")
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &self.client_id)
                .append_pair("response_type", &self.response_type.to_string())
                .append_pair("state", &request.state)
                .append_pair("nonce", &request.nonce)
                .append_pair(
                    "redirect_uri",
                    request
                        .redirect_uri
                        .as_ref()
                        .unwrap_or(&self.redirect_uri)
                        .as_str(),
                );
            if let Some(prompt) = &request.prompt {
                query.append_pair("prompt", prompt);
            }
        }

        Ok(url)
    }

    async fn exchange_code(
        &self,
        code: &str,
        _pkce_verifier: Option<&str>,
        _redirect_uri: Option<&Url>,
    ) -> Result<TokenResponse> {
        MockUser::from_code(code)?.token_response()
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse> {
        let sub = refresh_token
            .strip_prefix(REFRESH_PREFIX)
            .ok_or_else(|| AuthError::Provider("unknown refresh token".to_string()))?;

        MockUser {
            sub: sub.to_string(),
            email: format!("{sub}@example.com"),
            name: None,
            nonce: None,
        }
        .token_response()
    }

    fn verify_id_token(&self, id_token: &str) -> Result<()> {
        let mut validation = Validation::default();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        decode::<serde_json::Value>(
            id_token,
            &DecodingKey::from_secret(MOCK_SIGNING_KEY),
            &validation,
        )
        .map(|_| ())
        .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }
}
