//! Starting an authorization and ending it locally.

use std::sync::Arc;

use chrono::Utc;
use oidcrp_core::auth::{
    generate_nonce, generate_state, AuthFlowState, AuthStorage, AuthorizationRequest,
    OidcProviderClient, ResponseType, Result,
};
use tracing::info;
use url::Url;

use crate::config::ConfigurationProvider;
use crate::providers::new_pkce_pair;
use crate::state::AuthStateService;

/// Store a fresh state/nonce (and PKCE verifier for the code flow) and
/// return the request the provider turns into an authorization URL.
pub(crate) fn begin_authorization(
    storage: &dyn AuthStorage,
    response_type: ResponseType,
    prompt: Option<&str>,
    redirect_uri: Option<Url>,
) -> Result<AuthorizationRequest> {
    let state = generate_state();
    let nonce = generate_nonce();

    let (pkce_challenge, pkce_verifier) = match response_type {
        ResponseType::Code => {
            let (challenge, verifier) = new_pkce_pair();
            (Some(challenge), Some(verifier))
        }
        ResponseType::IdTokenToken => (None, None),
    };

    let flow = AuthFlowState {
        nonce: nonce.clone(),
        pkce_verifier,
        redirect_uri: redirect_uri.clone(),
        created_at: Utc::now(),
    };
    storage.store_auth_flow(&state, &flow)?;

    Ok(AuthorizationRequest {
        state,
        nonce,
        pkce_challenge,
        prompt: prompt.map(String::from),
        redirect_uri,
    })
}

/// Interactive login and local logoff.
pub struct LoginService {
    config: Arc<ConfigurationProvider>,
    storage: Arc<dyn AuthStorage>,
    provider: Arc<dyn OidcProviderClient>,
    auth_state: Arc<AuthStateService>,
}

impl LoginService {
    pub fn new(
        config: Arc<ConfigurationProvider>,
        storage: Arc<dyn AuthStorage>,
        provider: Arc<dyn OidcProviderClient>,
        auth_state: Arc<AuthStateService>,
    ) -> Self {
        Self {
            config,
            storage,
            provider,
            auth_state,
        }
    }

    /// Authorization URL to send the user to.
    pub async fn authorize_url(&self) -> Result<Url> {
        let request = begin_authorization(
            self.storage.as_ref(),
            self.config.openid_configuration().response_type(),
            None,
            None,
        )?;
        let url = self.provider.authorization_url(&request).await?;
        info!("Starting authorization at {}", url.origin().ascii_serialization());
        Ok(url)
    }

    /// Forget the session locally. The provider session is left alone.
    pub fn logoff_local(&self) {
        self.auth_state.reset_authorization_data();
    }
}
