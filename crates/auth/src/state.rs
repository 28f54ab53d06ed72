//! Process-wide authentication state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use oidcrp_core::auth::{
    has_expired, AuthEvent, AuthStatePublisher, AuthStorage, SessionValidator, StoredTokens,
};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::ConfigurationProvider;

/// Channel capacity for auth events.
const CHANNEL_CAPACITY: usize = 100;

/// Owned authentication state with publish/subscribe.
///
/// Constructed once per application and shared by `Arc` with every service
/// that reads or publishes auth events.
pub struct AuthStateService {
    config: Arc<ConfigurationProvider>,
    storage: Arc<dyn AuthStorage>,
    authorized: AtomicBool,
    events: broadcast::Sender<AuthEvent>,
}

impl AuthStateService {
    pub fn new(config: Arc<ConfigurationProvider>, storage: Arc<dyn AuthStorage>) -> Self {
        let (events, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            config,
            storage,
            authorized: AtomicBool::new(false),
            events,
        }
    }

    /// Subscribe to auth events fired from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    /// Fire an event to all current subscribers.
    pub fn publish(&self, event: AuthEvent) {
        // No receivers just means nobody is listening yet.
        let _ = self.events.send(event);
    }

    pub fn is_authorized(&self) -> bool {
        self.authorized.load(Ordering::SeqCst)
    }

    pub fn set_unauthorized_and_fire_event(&self) {
        self.authorized.store(false, Ordering::SeqCst);
        self.publish(AuthEvent::Unauthorized);
    }

    /// Drop persisted auth data and fall back to unauthorized.
    pub fn reset_authorization_data(&self) {
        if let Err(e) = self.storage.clear_auth_data() {
            warn!("Failed to clear auth data: {}", e);
        }
        info!("Authorization data reset");
        self.set_unauthorized_and_fire_event();
    }

    /// Whether any tokens are persisted, valid or not.
    pub fn has_stored_tokens(&self) -> bool {
        self.stored_tokens().is_some()
    }

    fn stored_tokens(&self) -> Option<StoredTokens> {
        match self.storage.read_tokens() {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!("Failed to read tokens from storage: {}", e);
                None
            }
        }
    }
}

impl AuthStatePublisher for AuthStateService {
    fn set_authorized_and_fire_event(&self) {
        self.authorized.store(true, Ordering::SeqCst);
        self.publish(AuthEvent::Authorized);
    }
}

impl SessionValidator for AuthStateService {
    fn are_auth_storage_tokens_valid(&self) -> bool {
        let Some(tokens) = self.stored_tokens() else {
            debug!("No tokens in storage");
            return false;
        };

        let offset = self.config.openid_configuration().silent_renew_offset_in_seconds;
        let now = Utc::now();

        if tokens.access_token.is_empty() || tokens.id_token.is_empty() {
            return false;
        }

        if has_expired(tokens.id_token_claims.exp, offset, now) {
            debug!("ID token expired at {}", tokens.id_token_claims.exp);
            return false;
        }

        if let Some(expires_at) = tokens.access_token_expires_at {
            if has_expired(expires_at, offset, now) {
                debug!("Access token expired at {}", expires_at);
                return false;
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryAuthStorage;
    use chrono::{DateTime, Duration};
    use oidcrp_core::auth::IdTokenClaims;
    use oidcrp_core::config::OpenIdConfiguration;

    fn tokens(id_exp: DateTime<Utc>, access_exp: Option<DateTime<Utc>>) -> StoredTokens {
        StoredTokens {
            access_token: "access".to_string(),
            id_token: "id".to_string(),
            refresh_token: None,
            access_token_expires_at: access_exp,
            id_token_claims: IdTokenClaims {
                sub: "user-1".to_string(),
                exp: id_exp,
                iat: Utc::now(),
                nonce: None,
                extra: Default::default(),
            },
        }
    }

    fn service_with(
        config: OpenIdConfiguration,
    ) -> (AuthStateService, Arc<InMemoryAuthStorage>) {
        let storage = Arc::new(InMemoryAuthStorage::new());
        let service = AuthStateService::new(
            Arc::new(ConfigurationProvider::new(Some(config))),
            storage.clone(),
        );
        (service, storage)
    }

    #[test]
    fn test_no_tokens_is_invalid() {
        let (service, _) = service_with(OpenIdConfiguration::default());
        assert!(!service.are_auth_storage_tokens_valid());
        assert!(!service.has_stored_tokens());
    }

    #[test]
    fn test_fresh_tokens_are_valid() {
        let (service, storage) = service_with(OpenIdConfiguration::default());
        let now = Utc::now();
        storage
            .write_tokens(&tokens(now + Duration::hours(1), Some(now + Duration::hours(1))))
            .unwrap();

        assert!(service.are_auth_storage_tokens_valid());
    }

    #[test]
    fn test_expired_id_token_is_invalid() {
        let (service, storage) = service_with(OpenIdConfiguration::default());
        let now = Utc::now();
        storage
            .write_tokens(&tokens(now - Duration::seconds(1), None))
            .unwrap();

        assert!(!service.are_auth_storage_tokens_valid());
        assert!(service.has_stored_tokens());
    }

    #[test]
    fn test_expired_access_token_is_invalid() {
        let (service, storage) = service_with(OpenIdConfiguration::default());
        let now = Utc::now();
        storage
            .write_tokens(&tokens(now + Duration::hours(1), Some(now - Duration::seconds(1))))
            .unwrap();

        assert!(!service.are_auth_storage_tokens_valid());
    }

    #[test]
    fn test_missing_access_expiry_is_ignored() {
        let (service, storage) = service_with(OpenIdConfiguration::default());
        storage
            .write_tokens(&tokens(Utc::now() + Duration::hours(1), None))
            .unwrap();

        assert!(service.are_auth_storage_tokens_valid());
    }

    #[test]
    fn test_renew_offset_expires_tokens_early() {
        let (service, storage) = service_with(OpenIdConfiguration {
            silent_renew_offset_in_seconds: 120,
            ..Default::default()
        });
        storage
            .write_tokens(&tokens(Utc::now() + Duration::seconds(60), None))
            .unwrap();

        assert!(!service.are_auth_storage_tokens_valid());
    }

    #[tokio::test]
    async fn test_set_authorized_fires_event() {
        let (service, _) = service_with(OpenIdConfiguration::default());
        let mut receiver = service.subscribe();

        service.set_authorized_and_fire_event();

        assert!(service.is_authorized());
        assert_eq!(receiver.recv().await.unwrap(), AuthEvent::Authorized);
    }

    #[tokio::test]
    async fn test_reset_clears_storage_and_fires_unauthorized() {
        let (service, storage) = service_with(OpenIdConfiguration::default());
        storage
            .write_tokens(&tokens(Utc::now() + Duration::hours(1), None))
            .unwrap();
        service.set_authorized_and_fire_event();
        let mut receiver = service.subscribe();

        service.reset_authorization_data();

        assert!(!service.is_authorized());
        assert!(storage.read_tokens().unwrap().is_none());
        assert_eq!(receiver.recv().await.unwrap(), AuthEvent::Unauthorized);
    }

    #[test]
    fn test_publish_without_subscribers_is_fine() {
        let (service, _) = service_with(OpenIdConfiguration::default());
        service.publish(AuthEvent::CheckSessionChanged);
    }
}
