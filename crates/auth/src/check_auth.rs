//! Session bootstrap run on every application start or navigation.

use std::sync::Arc;

use oidcrp_core::auth::{
    AuthStatePublisher, CallbackDetector, CallbackProcessor, ConfigurationGate,
    PeriodicValidityScheduler, SessionChangeMonitor, SessionValidator, SilentRenewProvisioner,
    UserProfilePublisher,
};
use tracing::{debug, warn};

/// Everything `CheckAuthService` talks to.
pub struct CheckAuthCollaborators {
    pub config: Arc<dyn ConfigurationGate>,
    pub callback_detector: Arc<dyn CallbackDetector>,
    pub callback_processor: Arc<dyn CallbackProcessor>,
    pub session_validator: Arc<dyn SessionValidator>,
    pub auth_state: Arc<dyn AuthStatePublisher>,
    pub user_profile: Arc<dyn UserProfilePublisher>,
    pub periodic_check: Arc<dyn PeriodicValidityScheduler>,
    pub check_session: Arc<dyn SessionChangeMonitor>,
    pub silent_renew: Arc<dyn SilentRenewProvisioner>,
}

/// Decides whether the user is authenticated and, if so, brings up the
/// session's background machinery.
pub struct CheckAuthService {
    c: CheckAuthCollaborators,
}

impl CheckAuthService {
    pub fn new(collaborators: CheckAuthCollaborators) -> Self {
        Self { c: collaborators }
    }

    /// Resolve whether the user is authenticated for `current_url`.
    ///
    /// Never fails: an invalid configuration or a failed callback resolves to
    /// `false`. Callback failures are logged by the processor.
    pub async fn check_auth(&self, current_url: &str) -> bool {
        if !self.c.config.has_valid_config() {
            debug!("No valid configuration, not authenticated");
            return false;
        }

        if self.c.callback_detector.is_callback(current_url) {
            debug!("Handling authorization callback");
            if self
                .c
                .callback_processor
                .handle_callback_and_fire_events(current_url)
                .await
                .is_err()
            {
                return false;
            }
        }

        let is_authenticated = self.c.session_validator.are_auth_storage_tokens_valid();
        debug!("Session valid: {}", is_authenticated);

        if is_authenticated {
            self.start_session();
        }

        is_authenticated
    }

    fn start_session(&self) {
        self.c.auth_state.set_authorized_and_fire_event();
        self.c.user_profile.publish_user_data_if_exists();
        self.c
            .periodic_check
            .start_token_validation_periodically(self.c.config.token_refresh_in_seconds());

        if self.c.check_session.is_check_session_configured() {
            self.c.check_session.start();
        }

        if self.c.silent_renew.is_silent_renew_configured() {
            if let Err(e) = self.c.silent_renew.get_or_create_iframe() {
                warn!("Failed to create silent renew frame: {}", e);
            }
        }
    }
}
