//! Session-change detection through the provider's check-session frame.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use oidcrp_core::auth::{
    AuthEvent, AuthStorage, FrameHandle, FrameHost, Result, SessionChangeMonitor,
};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::ConfigurationProvider;
use crate::state::AuthStateService;

/// Id of the hidden frame hosting the provider's check-session page.
pub const CHECK_SESSION_FRAME_ID: &str = "myiFrameForCheckSession";

/// Polls the provider's check-session frame with the current session state.
pub struct CheckSessionService {
    config: Arc<ConfigurationProvider>,
    storage: Arc<dyn AuthStorage>,
    frame_host: Arc<dyn FrameHost>,
    auth_state: Arc<AuthStateService>,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl CheckSessionService {
    pub fn new(
        config: Arc<ConfigurationProvider>,
        storage: Arc<dyn AuthStorage>,
        frame_host: Arc<dyn FrameHost>,
        auth_state: Arc<AuthStateService>,
    ) -> Self {
        Self {
            config,
            storage,
            frame_host,
            auth_state,
            poller: Mutex::new(None),
        }
    }

    fn check_session_url(&self) -> Option<Url> {
        self.config
            .openid_configuration()
            .check_session_iframe
            .as_deref()
            .and_then(|url| Url::parse(url).ok())
    }

    /// Handle a message the check-session frame posted back.
    pub fn handle_frame_message(&self, message: &str) {
        match message.trim() {
            "changed" => {
                info!("Provider reported a session change");
                self.auth_state.publish(AuthEvent::CheckSessionChanged);
            }
            "error" => {
                warn!("Check-session frame reported an error, stopping");
                self.stop();
            }
            "unchanged" => debug!("Session unchanged"),
            other => debug!("Ignoring check-session message {:?}", other),
        }
    }

    pub fn stop(&self) {
        if let Some(handle) = self.lock_poller().take() {
            handle.abort();
            debug!("Check-session polling stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock_poller()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn lock_poller(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.poller.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn open_frame(&self, url: &Url) -> Result<FrameHandle> {
        let frame = self.frame_host.get_or_create_frame(CHECK_SESSION_FRAME_ID)?;
        self.frame_host.navigate(&frame, url)?;
        Ok(frame)
    }
}

impl SessionChangeMonitor for CheckSessionService {
    fn is_check_session_configured(&self) -> bool {
        self.config.openid_configuration().start_checksession && self.check_session_url().is_some()
    }

    fn start(&self) {
        let mut poller = self.lock_poller();
        if poller.as_ref().is_some_and(|handle| !handle.is_finished()) {
            debug!("Check-session polling already running");
            return;
        }

        let Some(url) = self.check_session_url() else {
            warn!("No check-session URL configured");
            return;
        };

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No async runtime available, check-session polling not started");
            return;
        };

        let frame = match self.open_frame(&url) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Failed to open check-session frame: {}", e);
                return;
            }
        };

        let poll = SessionPoll {
            storage: self.storage.clone(),
            frame_host: self.frame_host.clone(),
            frame,
            client_id: self.config.openid_configuration().client_id.clone(),
            target_origin: url.origin().ascii_serialization(),
        };
        let period = Duration::from_secs(
            self.config
                .openid_configuration()
                .check_session_interval_in_seconds
                .max(1),
        );

        *poller = Some(runtime.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                poll.post();
            }
        }));

        info!("Check-session polling started every {:?}", period);
    }
}

impl Drop for CheckSessionService {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One poller's view of the frame it posts into.
struct SessionPoll {
    storage: Arc<dyn AuthStorage>,
    frame_host: Arc<dyn FrameHost>,
    frame: FrameHandle,
    client_id: String,
    target_origin: String,
}

impl SessionPoll {
    fn post(&self) {
        let session_state = match self.storage.read_session_state() {
            Ok(Some(session_state)) => session_state,
            Ok(None) => {
                debug!("No session state to check");
                return;
            }
            Err(e) => {
                warn!("Failed to read session state: {}", e);
                return;
            }
        };

        let message = format!("{} {}", self.client_id, session_state);
        if let Err(e) = self
            .frame_host
            .post_message(&self.frame, &message, &self.target_origin)
        {
            warn!("Failed to post to check-session frame: {}", e);
        }
    }
}
