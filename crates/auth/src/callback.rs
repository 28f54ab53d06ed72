//! Provider callback detection and handling.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use oidcrp_core::auth::{
    access_token_expiry, callback_state, is_callback_url, parse_callback,
    validate_id_token_claims, AuthError, AuthEvent, AuthStorage, CallbackDetector,
    CallbackParams, CallbackProcessor, OidcProviderClient, Result, StoredTokens, TokenResponse,
};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::ConfigurationProvider;
use crate::state::AuthStateService;
use crate::tokens::decode_id_token_claims;
use crate::user::UserService;

/// Recognises callbacks by the configured redirect URL and response type.
pub struct UrlCallbackDetector {
    config: Arc<ConfigurationProvider>,
}

impl UrlCallbackDetector {
    pub fn new(config: Arc<ConfigurationProvider>) -> Self {
        Self { config }
    }
}

impl CallbackDetector for UrlCallbackDetector {
    fn is_callback(&self, current_url: &str) -> bool {
        let Ok(current) = Url::parse(current_url) else {
            return false;
        };
        let config = self.config.openid_configuration();

        is_callback_url(
            &current,
            config.redirect_url().as_ref(),
            config.response_type(),
        )
    }
}

/// Completes code and implicit flow callbacks and token refreshes.
pub struct CallbackService {
    config: Arc<ConfigurationProvider>,
    storage: Arc<dyn AuthStorage>,
    provider: Arc<dyn OidcProviderClient>,
    auth_state: Arc<AuthStateService>,
    users: Arc<UserService>,
}

impl CallbackService {
    pub fn new(
        config: Arc<ConfigurationProvider>,
        storage: Arc<dyn AuthStorage>,
        provider: Arc<dyn OidcProviderClient>,
        auth_state: Arc<AuthStateService>,
        users: Arc<UserService>,
    ) -> Self {
        Self {
            config,
            storage,
            provider,
            auth_state,
            users,
        }
    }

    async fn handle_callback(&self, current_url: &str) -> Result<()> {
        let url = Url::parse(current_url)
            .map_err(|e| AuthError::MissingParameter(format!("callback URL ({e})")))?;
        let response_type = self.config.openid_configuration().response_type();

        match parse_callback(&url, response_type)? {
            CallbackParams::Error {
                error,
                description,
                state,
            } => {
                // The pending flow is dead either way.
                if let Some(state) = state {
                    self.storage.take_auth_flow(&state)?;
                }
                Err(AuthError::ProviderError { error, description })
            }
            CallbackParams::Code {
                code,
                state,
                session_state,
            } => {
                let flow = self
                    .storage
                    .take_auth_flow(&state)?
                    .ok_or(AuthError::InvalidState)?;

                let response = self
                    .provider
                    .exchange_code(
                        &code,
                        flow.pkce_verifier.as_deref(),
                        flow.redirect_uri.as_ref(),
                    )
                    .await?;

                self.persist_token_response(
                    response,
                    Some(flow.nonce.as_str()),
                    session_state.as_deref(),
                )
            }
            CallbackParams::Implicit {
                access_token,
                id_token,
                expires_in,
                state,
                session_state,
            } => {
                let flow = self
                    .storage
                    .take_auth_flow(&state)?
                    .ok_or(AuthError::InvalidState)?;

                self.provider.verify_id_token(&id_token)?;

                let response = TokenResponse {
                    access_token,
                    id_token: Some(id_token),
                    refresh_token: None,
                    expires_in,
                };

                self.persist_token_response(
                    response,
                    Some(flow.nonce.as_str()),
                    session_state.as_deref(),
                )
            }
        }
    }

    /// Validate and store a token response from a callback.
    fn persist_token_response(
        &self,
        response: TokenResponse,
        expected_nonce: Option<&str>,
        session_state: Option<&str>,
    ) -> Result<()> {
        let id_token = response
            .id_token
            .ok_or_else(|| AuthError::InvalidToken("No ID token in response".to_string()))?;

        let now = Utc::now();
        let claims = decode_id_token_claims(&id_token)?;
        validate_id_token_claims(
            &claims,
            expected_nonce,
            self.config.openid_configuration(),
            now,
        )?;

        let tokens = StoredTokens {
            access_token: response.access_token,
            id_token,
            refresh_token: response.refresh_token,
            access_token_expires_at: access_token_expiry(now, response.expires_in)?,
            id_token_claims: claims,
        };

        self.storage.write_tokens(&tokens)?;
        self.storage.write_session_state(session_state)?;
        self.users.persist_user_data(&tokens.id_token_claims)?;

        info!("Stored tokens for subject {}", tokens.id_token_claims.sub);
        Ok(())
    }

    /// Renew the stored tokens with the refresh-token grant.
    ///
    /// Providers may omit the ID token or rotate the refresh token; whatever
    /// is missing from the response is kept from the stored tokens.
    pub async fn refresh_session_with_refresh_token(&self) -> Result<()> {
        let current = self
            .storage
            .read_tokens()?
            .ok_or_else(|| AuthError::MissingParameter("stored tokens".to_string()))?;
        let refresh_token = current
            .refresh_token
            .clone()
            .ok_or_else(|| AuthError::MissingParameter("refresh_token".to_string()))?;

        let response = self.provider.refresh(&refresh_token).await.map_err(|e| {
            error!("Refresh token grant failed: {}", e);
            e
        })?;

        let now = Utc::now();
        let (id_token, claims) = match response.id_token {
            Some(id_token) => {
                let claims = decode_id_token_claims(&id_token)?;
                validate_id_token_claims(&claims, None, self.config.openid_configuration(), now)?;
                (id_token, claims)
            }
            None => {
                // The session stays invalid until a grant brings a new ID token.
                if current.id_token_claims.exp <= now {
                    warn!(
                        "Refresh kept an ID token that expired at {}",
                        current.id_token_claims.exp
                    );
                }
                (current.id_token, current.id_token_claims)
            }
        };

        let tokens = StoredTokens {
            access_token: response.access_token,
            id_token,
            refresh_token: response.refresh_token.or(Some(refresh_token)),
            access_token_expires_at: access_token_expiry(now, response.expires_in)?,
            id_token_claims: claims,
        };
        self.storage.write_tokens(&tokens)?;

        debug!("Tokens renewed with refresh token");
        Ok(())
    }

    /// Whether `current_url` answers an authorization started for silent renewal.
    ///
    /// Only renewals record a redirect override with their pending flow.
    fn is_renewal_callback(&self, current_url: &str) -> bool {
        let Ok(url) = Url::parse(current_url) else {
            return false;
        };
        let response_type = self.config.openid_configuration().response_type();

        callback_state(&url, response_type).is_some_and(|state| {
            matches!(
                self.storage.peek_auth_flow(&state),
                Ok(Some(flow)) if flow.redirect_uri.is_some()
            )
        })
    }
}

#[async_trait]
impl CallbackProcessor for CallbackService {
    async fn handle_callback_and_fire_events(&self, current_url: &str) -> Result<()> {
        let renewal = self.is_renewal_callback(current_url);
        let result = self.handle_callback(current_url).await;

        if let Err(e) = &result {
            error!("Failed to handle authorization callback: {}", e);
            // The renewal owner resets on its own failure.
            if !renewal {
                self.auth_state.reset_authorization_data();
            }
        }

        if self
            .config
            .openid_configuration()
            .trigger_authorization_result_event
        {
            self.auth_state.publish(AuthEvent::NewAuthorizationResult {
                authorized: result.is_ok(),
            });
        }

        result
    }
}
