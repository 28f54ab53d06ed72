//! Building a relying party from the environment and running checks with it.

use std::sync::Arc;

use oidcrp_auth::{InMemoryAuthStorage, OidcSecurityService, OpenIdProvider, RecordingFrameHost};
use oidcrp_core::auth::{validate_config, AuthEvent, OidcProviderClient};
use oidcrp_core::config::OpenIdConfiguration;
use serde::Serialize;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info};

use crate::error::{ClientError, Result};

/// Outcome of one `check_auth` call, with the events it fired.
#[derive(Debug, Clone, Serialize)]
pub struct CheckAuthReport {
    pub authenticated: bool,
    pub user: Option<serde_json::Value>,
    pub events: Vec<String>,
}

/// Validate `config` and build a relying party for it.
///
/// With `mock_idp_url` the Mock IdP stands in for the provider; otherwise the
/// provider is discovered from `sts_server`.
pub async fn connect(
    config: OpenIdConfiguration,
    mock_idp_url: Option<&str>,
) -> Result<OidcSecurityService> {
    let problems = validate_config(&config);
    if !problems.is_empty() {
        return Err(ClientError::InvalidConfig(problems));
    }

    let provider = provider_for(&config, mock_idp_url).await?;

    Ok(OidcSecurityService::new(
        Some(config),
        provider,
        Arc::new(RecordingFrameHost::new()),
        Arc::new(InMemoryAuthStorage::new()),
    ))
}

#[cfg(feature = "mock")]
async fn provider_for(
    config: &OpenIdConfiguration,
    mock_idp_url: Option<&str>,
) -> Result<Arc<dyn OidcProviderClient>> {
    use oidcrp_auth::MockProvider;
    use url::Url;

    let Some(mock_idp_url) = mock_idp_url else {
        return discover(config).await;
    };

    let mock_idp_url = Url::parse(mock_idp_url)
        .map_err(|e| ClientError::InvalidInput(format!("mock IdP URL: {e}")))?;
    let redirect_uri = config
        .redirect_url()
        .ok_or_else(|| ClientError::InvalidInput("redirect_url is not a URL".to_string()))?;

    info!("Using Mock IdP at {}", mock_idp_url);
    Ok(Arc::new(MockProvider::new(
        mock_idp_url,
        redirect_uri,
        config.client_id.clone(),
        config.response_type(),
    )))
}

#[cfg(not(feature = "mock"))]
async fn provider_for(
    config: &OpenIdConfiguration,
    mock_idp_url: Option<&str>,
) -> Result<Arc<dyn OidcProviderClient>> {
    if mock_idp_url.is_some() {
        return Err(ClientError::InvalidInput(
            "built without mock provider support".to_string(),
        ));
    }
    discover(config).await
}

async fn discover(config: &OpenIdConfiguration) -> Result<Arc<dyn OidcProviderClient>> {
    debug!("Discovering provider at {}", config.sts_server);
    Ok(Arc::new(OpenIdProvider::discover(config).await?))
}

/// Run `check_auth` and collect what it reported.
pub async fn check_auth_report(service: &OidcSecurityService, url: &str) -> CheckAuthReport {
    let mut events = service.subscribe();
    let authenticated = service.check_auth(url).await;

    CheckAuthReport {
        authenticated,
        user: service.user_data(),
        events: drain_events(&mut events),
    }
}

fn drain_events(receiver: &mut broadcast::Receiver<AuthEvent>) -> Vec<String> {
    let mut events = Vec::new();
    loop {
        match receiver.try_recv() {
            Ok(event) => events.push(describe_event(&event)),
            Err(TryRecvError::Lagged(skipped)) => events.push(format!("({skipped} events lost)")),
            Err(TryRecvError::Empty | TryRecvError::Closed) => return events,
        }
    }
}

/// One-line description of an auth event.
pub fn describe_event(event: &AuthEvent) -> String {
    match event {
        AuthEvent::Authorized => "authorized".to_string(),
        AuthEvent::Unauthorized => "unauthorized".to_string(),
        AuthEvent::UserDataChanged(_) => "user data changed".to_string(),
        AuthEvent::NewAuthorizationResult { authorized } => {
            format!("authorization result: {}", if *authorized { "ok" } else { "failed" })
        }
        AuthEvent::CheckSessionChanged => "provider session changed".to_string(),
        AuthEvent::SilentRenewFailed(reason) => format!("renewal failed: {reason}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> OpenIdConfiguration {
        OpenIdConfiguration {
            sts_server: "http://localhost:3001".to_string(),
            client_id: "spa".to_string(),
            redirect_url: "http://localhost:4200/callback".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_connect_rejects_invalid_config() {
        let result = connect(OpenIdConfiguration::default(), None).await;

        assert!(matches!(result, Err(ClientError::InvalidConfig(problems)) if !problems.is_empty()));
    }

    #[cfg(feature = "mock")]
    #[tokio::test]
    async fn test_check_auth_without_session_reports_false() {
        let service = connect(valid_config(), Some("http://localhost:3001"))
            .await
            .unwrap();

        let report = check_auth_report(&service, "http://localhost:4200/home").await;

        assert!(!report.authenticated);
        assert!(report.user.is_none());
        assert!(report.events.is_empty());
    }

    #[cfg(feature = "mock")]
    #[tokio::test]
    async fn test_unknown_state_callback_reports_false() {
        let service = connect(valid_config(), Some("http://localhost:3001"))
            .await
            .unwrap();

        let report = check_auth_report(
            &service,
            "http://localhost:4200/callback?code=abc&state=unknown",
        )
        .await;

        assert!(!report.authenticated);
    }

    #[test]
    fn test_describe_event() {
        assert_eq!(
            describe_event(&AuthEvent::NewAuthorizationResult { authorized: false }),
            "authorization result: failed"
        );
        assert_eq!(
            describe_event(&AuthEvent::SilentRenewFailed("login_required".to_string())),
            "renewal failed: login_required"
        );
    }
}
