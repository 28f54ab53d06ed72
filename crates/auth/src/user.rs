//! Cached user profile.

use std::sync::Arc;

use oidcrp_core::auth::{AuthEvent, AuthStorage, IdTokenClaims, Result, UserProfilePublisher};
use tracing::{debug, warn};

use crate::state::AuthStateService;

/// Persists the user profile taken from the ID token and republishes it.
pub struct UserService {
    storage: Arc<dyn AuthStorage>,
    auth_state: Arc<AuthStateService>,
}

impl UserService {
    pub fn new(storage: Arc<dyn AuthStorage>, auth_state: Arc<AuthStateService>) -> Self {
        Self {
            storage,
            auth_state,
        }
    }

    /// Store the profile claims of a fresh ID token and publish them.
    pub fn persist_user_data(&self, claims: &IdTokenClaims) -> Result<()> {
        let mut data = claims.extra.clone();
        data.insert("sub".to_string(), serde_json::json!(claims.sub));
        let data = serde_json::Value::Object(data);

        self.storage.write_user_data(&data)?;
        self.auth_state.publish(AuthEvent::UserDataChanged(data));
        Ok(())
    }

    /// Current cached profile, if any.
    pub fn user_data(&self) -> Option<serde_json::Value> {
        self.storage.read_user_data().unwrap_or_else(|e| {
            warn!("Failed to read user data: {}", e);
            None
        })
    }
}

impl UserProfilePublisher for UserService {
    fn publish_user_data_if_exists(&self) {
        match self.user_data() {
            Some(data) => self.auth_state.publish(AuthEvent::UserDataChanged(data)),
            None => debug!("No user data to publish"),
        }
    }
}
