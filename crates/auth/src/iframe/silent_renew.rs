//! Token renewal through a hidden frame.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use oidcrp_core::auth::{
    AuthError, AuthEvent, AuthStorage, CallbackProcessor, FrameHandle, FrameHost,
    OidcProviderClient, Result, SilentRenewProvisioner,
};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::ConfigurationProvider;
use crate::login::begin_authorization;
use crate::state::AuthStateService;

/// Id of the hidden frame used for silent renewal.
pub const SILENT_RENEW_FRAME_ID: &str = "myiFrameForSilentRenew";

/// A renewal that has not called back within this window is abandoned.
const RENEW_TIMEOUT: Duration = Duration::from_secs(20);

/// Renews tokens by loading a `prompt=none` authorization into a hidden frame.
pub struct SilentRenewService {
    config: Arc<ConfigurationProvider>,
    storage: Arc<dyn AuthStorage>,
    provider: Arc<dyn OidcProviderClient>,
    frame_host: Arc<dyn FrameHost>,
    callbacks: Arc<dyn CallbackProcessor>,
    auth_state: Arc<AuthStateService>,
    frame: Mutex<Option<FrameHandle>>,
    renew_started: Mutex<Option<Instant>>,
}

impl SilentRenewService {
    pub fn new(
        config: Arc<ConfigurationProvider>,
        storage: Arc<dyn AuthStorage>,
        provider: Arc<dyn OidcProviderClient>,
        frame_host: Arc<dyn FrameHost>,
        callbacks: Arc<dyn CallbackProcessor>,
        auth_state: Arc<AuthStateService>,
    ) -> Self {
        Self {
            config,
            storage,
            provider,
            frame_host,
            callbacks,
            auth_state,
            frame: Mutex::new(None),
            renew_started: Mutex::new(None),
        }
    }

    /// Claim the renewal slot. False while another renewal is in flight.
    pub fn try_begin_renew(&self) -> bool {
        let mut started = self.renew_started.lock().unwrap_or_else(|e| e.into_inner());
        match *started {
            Some(at) if at.elapsed() < RENEW_TIMEOUT => false,
            Some(_) => {
                warn!("Previous silent renew timed out");
                *started = Some(Instant::now());
                true
            }
            None => {
                *started = Some(Instant::now());
                true
            }
        }
    }

    /// Release the renewal slot.
    pub fn finish_renew(&self) {
        *self.renew_started.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub fn is_renewing(&self) -> bool {
        self.renew_started
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some_and(|at| at.elapsed() < RENEW_TIMEOUT)
    }

    /// Start a renewal: point the frame at a `prompt=none` authorization.
    ///
    /// The renewal completes when the host passes the frame's final URL to
    /// [`handle_renew_callback`](Self::handle_renew_callback).
    pub async fn renew(&self) -> Result<()> {
        let config = self.config.openid_configuration();
        let redirect_uri = config
            .silent_renew_url
            .as_deref()
            .map(Url::parse)
            .transpose()
            .map_err(|e| AuthError::InvalidConfig(format!("silent_renew_url: {e}")))?
            .ok_or_else(|| AuthError::InvalidConfig("silent_renew_url is required".to_string()))?;

        let frame = self.get_or_create_iframe()?;
        let request = begin_authorization(
            self.storage.as_ref(),
            config.response_type(),
            Some("none"),
            Some(redirect_uri),
        )?;
        let url = self.provider.authorization_url(&request).await?;

        self.frame_host.navigate(&frame, &url)?;
        info!("Silent renew started");
        Ok(())
    }

    /// Complete a renewal from the URL the renewal frame landed on.
    pub async fn handle_renew_callback(&self, url: &str) -> Result<()> {
        let result = self.callbacks.handle_callback_and_fire_events(url).await;
        self.finish_renew();

        match &result {
            Ok(()) => debug!("Silent renew completed"),
            Err(e) => {
                warn!("Silent renew failed: {}", e);
                self.auth_state
                    .publish(AuthEvent::SilentRenewFailed(e.to_string()));
                self.auth_state.reset_authorization_data();
            }
        }

        result
    }
}

impl SilentRenewProvisioner for SilentRenewService {
    fn is_silent_renew_configured(&self) -> bool {
        let config = self.config.openid_configuration();
        config.silent_renew && !config.use_refresh_token
    }

    fn get_or_create_iframe(&self) -> Result<FrameHandle> {
        let mut frame = self.frame.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = frame.as_ref() {
            return Ok(existing.clone());
        }

        let created = self.frame_host.get_or_create_frame(SILENT_RENEW_FRAME_ID)?;
        debug!("Silent renew frame {} ready", created);
        *frame = Some(created.clone());
        Ok(created)
    }
}
