//! Wiring of the concrete services into one relying-party client.

use std::sync::Arc;

use oidcrp_core::auth::{AuthEvent, AuthStorage, FrameHost, OidcProviderClient, Result};
use oidcrp_core::config::OpenIdConfiguration;
use tokio::sync::broadcast;
use url::Url;

use crate::callback::{CallbackService, UrlCallbackDetector};
use crate::check_auth::{CheckAuthCollaborators, CheckAuthService};
use crate::config::ConfigurationProvider;
use crate::iframe::{CheckSessionService, SilentRenewService};
use crate::login::LoginService;
use crate::periodic::PeriodicTokenCheckService;
use crate::state::AuthStateService;
use crate::user::UserService;

/// An OpenID Connect relying party.
///
/// Owns every service and hands the orchestrator its collaborators. Hosts
/// create one per application, call [`check_auth`](Self::check_auth) on
/// start-up and on every navigation, and forward frame traffic to
/// [`handle_check_session_message`](Self::handle_check_session_message) and
/// [`handle_silent_renew_callback`](Self::handle_silent_renew_callback).
pub struct OidcSecurityService {
    config: Arc<ConfigurationProvider>,
    auth_state: Arc<AuthStateService>,
    users: Arc<UserService>,
    login: LoginService,
    periodic_check: Arc<PeriodicTokenCheckService>,
    check_session: Arc<CheckSessionService>,
    silent_renew: Arc<SilentRenewService>,
    check_auth: CheckAuthService,
}

impl OidcSecurityService {
    pub fn new(
        config: Option<OpenIdConfiguration>,
        provider: Arc<dyn OidcProviderClient>,
        frame_host: Arc<dyn FrameHost>,
        storage: Arc<dyn AuthStorage>,
    ) -> Self {
        let config = Arc::new(ConfigurationProvider::new(config));
        let auth_state = Arc::new(AuthStateService::new(config.clone(), storage.clone()));
        let users = Arc::new(UserService::new(storage.clone(), auth_state.clone()));
        let callbacks = Arc::new(CallbackService::new(
            config.clone(),
            storage.clone(),
            provider.clone(),
            auth_state.clone(),
            users.clone(),
        ));
        let silent_renew = Arc::new(SilentRenewService::new(
            config.clone(),
            storage.clone(),
            provider.clone(),
            frame_host.clone(),
            callbacks.clone(),
            auth_state.clone(),
        ));
        let periodic_check = Arc::new(PeriodicTokenCheckService::new(
            config.clone(),
            auth_state.clone(),
            callbacks.clone(),
            silent_renew.clone(),
        ));
        let check_session = Arc::new(CheckSessionService::new(
            config.clone(),
            storage.clone(),
            frame_host,
            auth_state.clone(),
        ));
        let login = LoginService::new(config.clone(), storage, provider, auth_state.clone());

        let check_auth = CheckAuthService::new(CheckAuthCollaborators {
            config: config.clone(),
            callback_detector: Arc::new(UrlCallbackDetector::new(config.clone())),
            callback_processor: callbacks,
            session_validator: auth_state.clone(),
            auth_state: auth_state.clone(),
            user_profile: users.clone(),
            periodic_check: periodic_check.clone(),
            check_session: check_session.clone(),
            silent_renew: silent_renew.clone(),
        });

        Self {
            config,
            auth_state,
            users,
            login,
            periodic_check,
            check_session,
            silent_renew,
            check_auth,
        }
    }

    pub async fn check_auth(&self, current_url: &str) -> bool {
        self.check_auth.check_auth(current_url).await
    }

    pub async fn authorize_url(&self) -> Result<Url> {
        self.login.authorize_url().await
    }

    /// Stop background work and forget the session locally.
    pub fn logoff_local(&self) {
        self.periodic_check.stop();
        self.check_session.stop();
        self.login.logoff_local();
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.auth_state.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth_state.is_authorized()
    }

    pub fn user_data(&self) -> Option<serde_json::Value> {
        self.users.user_data()
    }

    /// Problems that make the configuration unusable.
    pub fn configuration_problems(&self) -> &[String] {
        self.config.problems()
    }

    pub fn handle_check_session_message(&self, message: &str) {
        self.check_session.handle_frame_message(message);
    }

    pub async fn handle_silent_renew_callback(&self, url: &str) -> Result<()> {
        self.silent_renew.handle_renew_callback(url).await
    }

    /// Whether the background token check is live.
    pub fn is_token_check_running(&self) -> bool {
        self.periodic_check.is_running()
    }

    pub fn is_check_session_running(&self) -> bool {
        self.check_session.is_running()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iframe::{RecordingFrameHost, CHECK_SESSION_FRAME_ID, SILENT_RENEW_FRAME_ID};
    use crate::storage::InMemoryAuthStorage;
    use crate::tokens::test_support;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use oidcrp_core::auth::{AuthError, AuthorizationRequest, TokenResponse};
    use std::sync::Mutex;

    /// Provider that remembers the nonce it was asked for and mints a
    /// matching ID token on exchange.
    #[derive(Default)]
    struct NonceEchoProvider {
        nonce: Mutex<Option<String>>,
    }

    #[async_trait]
    impl OidcProviderClient for NonceEchoProvider {
        async fn authorization_url(&self, request: &AuthorizationRequest) -> Result<Url> {
            *self.nonce.lock().unwrap() = Some(request.nonce.clone());
            let mut url = Url::parse("https://idp.example.com/authorize").unwrap();
            url.query_pairs_mut().append_pair("state", &request.state);
            Ok(url)
        }

        async fn exchange_code(
            &self,
            code: &str,
            _pkce_verifier: Option<&str>,
            _redirect_uri: Option<&Url>,
        ) -> Result<TokenResponse> {
            if code != "good-code" {
                return Err(AuthError::CodeExchange("invalid_grant".to_string()));
            }
            let nonce = self.nonce.lock().unwrap().clone();
            let now = Utc::now();
            Ok(TokenResponse {
                access_token: "access-1".to_string(),
                id_token: Some(test_support::id_token(
                    "user-1",
                    nonce.as_deref(),
                    now,
                    now + Duration::hours(1),
                )),
                refresh_token: None,
                expires_in: Some(3600),
            })
        }

        async fn refresh(&self, _refresh_token: &str) -> Result<TokenResponse> {
            Err(AuthError::Provider("no refresh".to_string()))
        }

        fn verify_id_token(&self, id_token: &str) -> Result<()> {
            test_support::verify_id_token(id_token)
        }
    }

    fn config() -> OpenIdConfiguration {
        OpenIdConfiguration {
            sts_server: "https://idp.example.com".to_string(),
            client_id: "spa".to_string(),
            redirect_url: "http://localhost:4200/callback".to_string(),
            start_checksession: true,
            check_session_iframe: Some("https://idp.example.com/checksession".to_string()),
            silent_renew: true,
            silent_renew_url: Some("http://localhost:4200/silent-renew.html".to_string()),
            ..Default::default()
        }
    }

    fn security(config: Option<OpenIdConfiguration>) -> (OidcSecurityService, RecordingFrameHost) {
        let host = RecordingFrameHost::new();
        let service = OidcSecurityService::new(
            config,
            Arc::new(NonceEchoProvider::default()),
            Arc::new(host.clone()),
            Arc::new(InMemoryAuthStorage::new()),
        );
        (service, host)
    }

    async fn state_of(service: &OidcSecurityService) -> String {
        let url = service.authorize_url().await.unwrap();
        url.query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
            .unwrap()
    }

    #[tokio::test]
    async fn test_login_round_trip() {
        let (service, host) = security(Some(config()));
        let mut events = service.subscribe();
        let state = state_of(&service).await;

        let authenticated = service
            .check_auth(&format!(
                "http://localhost:4200/callback?code=good-code&state={state}&session_state=ss-1"
            ))
            .await;

        assert!(authenticated);
        assert!(service.is_authenticated());
        assert_eq!(service.user_data().unwrap()["sub"], "user-1");
        assert!(service.is_token_check_running());
        assert!(service.is_check_session_running());
        assert_eq!(
            host.created_frames(),
            vec![
                CHECK_SESSION_FRAME_ID.to_string(),
                SILENT_RENEW_FRAME_ID.to_string()
            ]
        );

        assert!(matches!(events.recv().await.unwrap(), AuthEvent::UserDataChanged(_)));
        assert_eq!(events.recv().await.unwrap(), AuthEvent::Authorized);
    }

    #[tokio::test]
    async fn test_bad_code_is_not_authenticated() {
        let (service, host) = security(Some(config()));
        let state = state_of(&service).await;

        let authenticated = service
            .check_auth(&format!(
                "http://localhost:4200/callback?code=bad-code&state={state}"
            ))
            .await;

        assert!(!authenticated);
        assert!(!service.is_authenticated());
        assert!(!service.is_token_check_running());
        assert!(host.created_frames().is_empty());
    }

    #[tokio::test]
    async fn test_failed_callback_ends_existing_session() {
        let (service, _) = security(Some(config()));
        let state = state_of(&service).await;
        assert!(
            service
                .check_auth(&format!(
                    "http://localhost:4200/callback?code=good-code&state={state}"
                ))
                .await
        );

        let state = state_of(&service).await;
        let authenticated = service
            .check_auth(&format!(
                "http://localhost:4200/callback?code=bad-code&state={state}"
            ))
            .await;

        assert!(!authenticated);
        assert!(!service.is_authenticated());
        assert!(service.user_data().is_none());
        assert!(!service.check_auth("http://localhost:4200/home").await);
    }

    #[tokio::test]
    async fn test_missing_config_is_not_authenticated() {
        let (service, _) = security(None);

        assert!(!service.check_auth("http://localhost:4200/home").await);
        assert!(!service.configuration_problems().is_empty());
    }

    #[tokio::test]
    async fn test_logoff_stops_background_work() {
        let (service, _) = security(Some(config()));
        let state = state_of(&service).await;
        assert!(
            service
                .check_auth(&format!(
                    "http://localhost:4200/callback?code=good-code&state={state}"
                ))
                .await
        );

        service.logoff_local();

        assert!(!service.is_authenticated());
        assert!(!service.is_token_check_running());
        assert!(!service.is_check_session_running());
        assert!(service.user_data().is_none());
        assert!(!service.check_auth("http://localhost:4200/home").await);
    }
}
