//! Background token validity check.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use oidcrp_core::auth::{AuthEvent, PeriodicValidityScheduler, SessionValidator};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::callback::CallbackService;
use crate::config::ConfigurationProvider;
use crate::iframe::SilentRenewService;
use crate::state::AuthStateService;

/// What a single token check did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Tokens still valid.
    Valid,
    /// Nothing stored, nothing to check.
    Idle,
    /// Expired with no way to renew; auth data was reset.
    ForcedLogout,
    /// A renewal is already in flight.
    AlreadyRenewing,
    /// Refresh-token grant succeeded.
    Renewed,
    /// Silent renew frame was pointed at the provider.
    RenewStarted,
    /// Renewal failed; auth data was reset.
    RenewFailed,
}

#[derive(Clone)]
struct TokenCheck {
    config: Arc<ConfigurationProvider>,
    auth_state: Arc<AuthStateService>,
    callbacks: Arc<CallbackService>,
    silent_renew: Arc<SilentRenewService>,
}

impl TokenCheck {
    async fn run_once(&self) -> TickOutcome {
        if self.auth_state.are_auth_storage_tokens_valid() {
            return TickOutcome::Valid;
        }

        if !self.auth_state.has_stored_tokens() {
            return TickOutcome::Idle;
        }

        let config = self.config.openid_configuration();
        if !config.renews_tokens() {
            info!("Tokens expired and no renewal configured, re-authentication required");
            self.auth_state.reset_authorization_data();
            return TickOutcome::ForcedLogout;
        }

        if !self.silent_renew.try_begin_renew() {
            debug!("Renewal already in flight");
            return TickOutcome::AlreadyRenewing;
        }

        let result = if config.use_refresh_token {
            let result = self.callbacks.refresh_session_with_refresh_token().await;
            self.silent_renew.finish_renew();
            result.map(|()| TickOutcome::Renewed)
        } else {
            // The slot stays claimed until the frame calls back.
            self.silent_renew.renew().await.map(|()| TickOutcome::RenewStarted)
        };

        result.unwrap_or_else(|e| {
            warn!("Token renewal failed: {}", e);
            self.silent_renew.finish_renew();
            self.auth_state
                .publish(AuthEvent::SilentRenewFailed(e.to_string()));
            self.auth_state.reset_authorization_data();
            TickOutcome::RenewFailed
        })
    }
}

/// Runs the token check on a timer.
pub struct PeriodicTokenCheckService {
    check: TokenCheck,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PeriodicTokenCheckService {
    pub fn new(
        config: Arc<ConfigurationProvider>,
        auth_state: Arc<AuthStateService>,
        callbacks: Arc<CallbackService>,
        silent_renew: Arc<SilentRenewService>,
    ) -> Self {
        Self {
            check: TokenCheck {
                config,
                auth_state,
                callbacks,
                silent_renew,
            },
            task: Mutex::new(None),
        }
    }

    /// Run one check now, outside the timer.
    pub async fn check_now(&self) -> TickOutcome {
        self.check.run_once().await
    }

    pub fn stop(&self) {
        if let Some(task) = self.lock_task().take() {
            task.abort();
            debug!("Periodic token check stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock_task()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    fn lock_task(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.task.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl PeriodicValidityScheduler for PeriodicTokenCheckService {
    fn start_token_validation_periodically(&self, interval_seconds: u64) {
        let mut task = self.lock_task();
        if task.as_ref().is_some_and(|task| !task.is_finished()) {
            debug!("Periodic token check already running");
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No async runtime available, periodic token check not started");
            return;
        };

        let period = Duration::from_secs(interval_seconds.max(1));
        let check = self.check.clone();

        *task = Some(runtime.spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let outcome = check.run_once().await;
                debug!("Token check: {:?}", outcome);
            }
        }));

        info!("Periodic token check started every {:?}", period);
    }
}

impl Drop for PeriodicTokenCheckService {
    fn drop(&mut self) {
        self.stop();
    }
}
