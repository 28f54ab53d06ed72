//! OpenID Connect provider backed by discovery.

use std::borrow::Cow;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use oidcrp_core::auth::{
    AuthError, AuthorizationRequest, OidcProviderClient, ResponseType, Result, TokenResponse,
};
use oidcrp_core::config::OpenIdConfiguration;
use openidconnect::{
    core::{
        CoreAuthenticationFlow, CoreClient, CoreIdToken, CoreProviderMetadata, CoreTokenResponse,
    },
    reqwest, AuthorizationCode, ClientId, CsrfToken, EndpointMaybeSet, EndpointSet, IssuerUrl,
    Nonce, OAuth2TokenResponse as _, PkceCodeChallenge, PkceCodeVerifier, RedirectUrl,
    RefreshToken, Scope, TokenResponse as _,
};
use tracing::debug;
use url::Url;

/// Timeout for every request to the provider.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Type alias for a CoreClient configured from provider metadata.
///
/// `from_provider_metadata` returns a client with:
/// - HasAuthUrl = EndpointSet (always set from discovery)
/// - HasDeviceAuthUrl = EndpointNotSet
/// - HasIntrospectionUrl = EndpointNotSet
/// - HasRevocationUrl = EndpointNotSet
/// - HasTokenUrl = EndpointMaybeSet (may or may not be in discovery)
/// - HasUserInfoUrl = EndpointMaybeSet (may or may not be in discovery)
///
/// Calling `set_redirect_uri` preserves these type parameters.
type ConfiguredCoreClient = CoreClient<
    EndpointSet,
    openidconnect::EndpointNotSet,
    openidconnect::EndpointNotSet,
    openidconnect::EndpointNotSet,
    EndpointMaybeSet,
    EndpointMaybeSet,
>;

/// Provider for any issuer that publishes a discovery document.
pub struct OpenIdProvider {
    client: ConfiguredCoreClient,
    http_client: reqwest::Client,
    response_type: ResponseType,
    scopes: Vec<String>,
}

impl OpenIdProvider {
    /// Create a provider by discovering the issuer's OIDC metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The issuer or redirect URL is invalid
    /// - The HTTP client cannot be built
    /// - Discovery fails (network error or invalid metadata)
    pub async fn discover(
        config: &OpenIdConfiguration,
    ) -> std::result::Result<Self, crate::AuthError> {
        let issuer_url = IssuerUrl::new(config.sts_server.clone())
            .map_err(|e| crate::AuthError::Config(e.to_string()))?;

        // Build HTTP client without redirect following (security requirement)
        let http_client = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| crate::AuthError::Http(format!("Failed to build HTTP client: {}", e)))?;

        let provider_metadata = CoreProviderMetadata::discover_async(issuer_url, &http_client)
            .await
            .map_err(|e| crate::AuthError::Http(e.to_string()))?;

        let client = CoreClient::from_provider_metadata(
            provider_metadata,
            ClientId::new(config.client_id.clone()),
            None,
        )
        .set_redirect_uri(
            RedirectUrl::new(config.redirect_url.clone())
                .map_err(|e| crate::AuthError::Config(e.to_string()))?,
        );

        Ok(Self {
            client,
            http_client,
            response_type: config.response_type(),
            scopes: config
                .scope
                .split_whitespace()
                .filter(|s| *s != "openid")
                .map(String::from)
                .collect(),
        })
    }

    /// Signature and audience; nonce and `iat` are checked by the caller.
    fn verify(&self, id_token: &CoreIdToken) -> Result<()> {
        id_token
            .claims(&self.client.id_token_verifier(), |_: Option<&Nonce>| Ok(()))
            .map(|_| ())
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }

    fn to_token_response(&self, response: &CoreTokenResponse) -> Result<TokenResponse> {
        let id_token = match response.id_token() {
            Some(id_token) => {
                self.verify(id_token)?;
                Some(id_token.to_string())
            }
            None => None,
        };

        Ok(TokenResponse {
            access_token: response.access_token().secret().clone(),
            id_token,
            refresh_token: response.refresh_token().map(|t| t.secret().clone()),
            expires_in: response.expires_in().map(|d| d.as_secs() as i64),
        })
    }
}

#[async_trait]
impl OidcProviderClient for OpenIdProvider {
    async fn authorization_url(&self, request: &AuthorizationRequest) -> Result<Url> {
        // Clone state and nonce to avoid lifetime issues with closures
        let state_owned = request.state.clone();
        let nonce_owned = request.nonce.clone();

        let flow = match self.response_type {
            ResponseType::Code => CoreAuthenticationFlow::AuthorizationCode,
            ResponseType::IdTokenToken => CoreAuthenticationFlow::Implicit(true),
        };

        let mut builder = self.client.authorize_url(
            flow,
            move || CsrfToken::new(state_owned),
            move || Nonce::new(nonce_owned),
        );

        for scope in &self.scopes {
            builder = builder.add_scope(Scope::new(scope.clone()));
        }

        // The challenge is the base64url-encoded SHA256 hash of the verifier.
        if let Some(challenge) = &request.pkce_challenge {
            builder = builder
                .add_extra_param("code_challenge", challenge.clone())
                .add_extra_param("code_challenge_method", "S256");
        }

        if let Some(prompt) = &request.prompt {
            builder = builder.add_extra_param("prompt", prompt.clone());
        }

        if let Some(redirect_uri) = &request.redirect_uri {
            builder = builder.set_redirect_uri(Cow::Owned(RedirectUrl::from_url(
                redirect_uri.clone(),
            )));
        }

        let (auth_url, _csrf_token, _nonce) = builder.url();
        Ok(auth_url)
    }

    async fn exchange_code(
        &self,
        code: &str,
        pkce_verifier: Option<&str>,
        redirect_uri: Option<&Url>,
    ) -> Result<TokenResponse> {
        let mut request = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .map_err(|e| AuthError::CodeExchange(e.to_string()))?;

        if let Some(verifier) = pkce_verifier {
            request = request.set_pkce_verifier(PkceCodeVerifier::new(verifier.to_string()));
        }

        if let Some(redirect_uri) = redirect_uri {
            request =
                request.set_redirect_uri(Cow::Owned(RedirectUrl::from_url(redirect_uri.clone())));
        }

        let token_response = request
            .request_async(&self.http_client)
            .await
            .map_err(|e| AuthError::CodeExchange(e.to_string()))?;

        debug!("Authorization code exchanged");
        self.to_token_response(&token_response)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse> {
        let token_response = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .map_err(|e| AuthError::Provider(e.to_string()))?
            .request_async(&self.http_client)
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        debug!("Tokens refreshed");
        self.to_token_response(&token_response)
    }

    fn verify_id_token(&self, id_token: &str) -> Result<()> {
        let id_token =
            CoreIdToken::from_str(id_token).map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        self.verify(&id_token)
    }
}

/// Generate a fresh PKCE pair as `(challenge, verifier)`.
pub fn new_pkce_pair() -> (String, String) {
    let (challenge, verifier) = PkceCodeChallenge::new_random_sha256();
    (challenge.as_str().to_string(), verifier.secret().to_string())
}
