//! Heirloom Watch
//!
//! Watchdog for the dead-man's-switch. Nobody is obliged to call
//! `trigger_inheritance`; this service does it on the beneficiaries' behalf
//! and reminds owners before their deadline passes.
//!
//! # Features
//!
//! - Periodic heartbeat evaluation of every estate
//! - Triggers inheritance once an estate becomes triggerable
//! - Check-in reminders, sent once per urgency level
//! - Persistent state tracking across restarts
//!
//! # Example
//!
//! ```ignore
//! use heirloom_watch::{Watchdog, WatchdogConfig};
//! use std::path::Path;
//!
//! let mut config = WatchdogConfig::from_file(Path::new("heirloom.toml"))?;
//! config.apply_env_overrides();
//!
//! let mut watchdog = Watchdog::new(config)?;
//! for event in watchdog.poll(&mut custodian)? {
//!     println!("Event: {:?}", event);
//! }
//! ```

pub mod config;
pub mod events;
pub mod state;

pub use config::{WatchdogConfig, WatchdogSection, MIN_POLL_INTERVAL_SECS};
pub use events::WatchEvent;
pub use state::{load_snapshot, save_snapshot, EstateWatch, StateError, WatchState};

use heirloom_core::{
    AssetCustody, Clock, Custodian, EstateError, HeartbeatAction, Principal, StrategyExecutor,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{watch, Mutex};

/// Errors from the watchdog
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Estate error: {0}")]
    Estate(#[from] EstateError),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Poll interval too short (minimum {min} seconds)")]
    PollTooFrequent { min: u64 },
}

pub struct Watchdog {
    config: WatchdogConfig,
    state: WatchState,
    watcher: Principal,
}

impl Watchdog {
    /// Create a watchdog, resuming from its state file if one exists
    pub fn new(config: WatchdogConfig) -> Result<Self, WatchError> {
        config
            .validate()
            .map_err(|e| WatchError::InvalidConfig(format!("{:#}", e)))?;

        let state = match WatchState::load(&config.watchdog.state_path) {
            Ok(state) => state,
            Err(e) => {
                log::warn!(
                    "Ignoring unreadable watch state {}: {}",
                    config.watchdog.state_path.display(),
                    e
                );
                WatchState::default()
            }
        };
        let watcher = Principal::new(config.watchdog.watcher.clone());

        Ok(Self {
            config,
            state,
            watcher,
        })
    }

    pub fn config(&self) -> &WatchdogConfig {
        &self.config
    }

    pub fn state(&self) -> &WatchState {
        &self.state
    }

    /// Identity used when triggering inheritance
    pub fn watcher(&self) -> &Principal {
        &self.watcher
    }

    /// Evaluate every estate once and act on the result.
    ///
    /// Triggerable estates are triggered; owners nearing their deadline get
    /// a reminder unless one was already sent for the same urgency since
    /// their last check-in.
    pub fn poll<C, A, S>(
        &mut self,
        custodian: &mut Custodian<C, A, S>,
    ) -> Result<Vec<WatchEvent>, WatchError>
    where
        C: Clock,
        A: AssetCustody,
        S: StrategyExecutor,
    {
        // Rate limiting
        let now = custodian.now();
        if let Some(last) = self.state.last_poll {
            if now.saturating_sub(last) < MIN_POLL_INTERVAL_SECS as i64 {
                return Err(WatchError::PollTooFrequent {
                    min: MIN_POLL_INTERVAL_SECS,
                });
            }
        }

        let mut events = Vec::new();

        for status in custodian.heartbeat_all(&self.config.heartbeat) {
            let estate = status.estate;
            let last_active_at = custodian.estate(estate)?.last_active_at;
            let watch = self.state.watch_mut(estate, status.action);

            if watch.last_action != status.action {
                log::info!(
                    "{}: {:?} -> {:?} ({:.0}% of inactivity elapsed)",
                    estate,
                    watch.last_action,
                    status.action,
                    status.elapsed_fraction * 100.0
                );
            }
            watch.last_action = status.action;

            if status.action == HeartbeatAction::Triggerable {
                match custodian.trigger_inheritance(&self.watcher, estate) {
                    Ok(()) => {
                        log::info!("{}: inheritance triggered", estate);
                        watch.triggered_at = Some(now);
                        watch.last_action = HeartbeatAction::Claimable;
                        events.push(WatchEvent::InheritanceTriggered { estate });
                    }
                    Err(e) => {
                        log::warn!("{}: trigger rejected: {}", estate, e);
                        events.push(WatchEvent::TriggerRejected {
                            estate,
                            message: e.to_string(),
                        });
                    }
                }
            } else if status.action.needs_checkin()
                && watch.reminder_due(last_active_at, status.action)
            {
                watch.record_reminder(last_active_at, status.action);
                events.push(WatchEvent::CheckinReminder {
                    estate,
                    action: status.action,
                    seconds_until_trigger: status.seconds_until_trigger,
                });
            }
        }

        self.state.update_poll(now);
        self.state.save(&self.config.watchdog.state_path)?;
        if let Some(path) = &self.config.watchdog.snapshot_path {
            save_snapshot(path, custodian.state())?;
        }

        log::debug!("Poll #{} complete: {} event(s)", self.state.polls, events.len());
        Ok(events)
    }

    /// Poll on the configured interval until `shutdown` turns true or its
    /// sender is dropped.
    ///
    /// Poll errors are logged and the loop carries on.
    pub async fn run<C, A, S>(
        mut self,
        custodian: Arc<Mutex<Custodian<C, A, S>>>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Self
    where
        C: Clock,
        A: AssetCustody,
        S: StrategyExecutor,
    {
        let mut ticker =
            tokio::time::interval(Duration::from_secs(self.config.watchdog.poll_interval_secs));

        log::info!(
            "Watchdog {} running (every {}s)",
            self.watcher,
            self.config.watchdog.poll_interval_secs
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let mut custodian = custodian.lock().await;
                    match self.poll(&mut custodian) {
                        Ok(events) => {
                            for event in events.iter().filter(|e| e.is_error()) {
                                log::warn!("Watch event: {:?}", event);
                            }
                        }
                        Err(WatchError::PollTooFrequent { .. }) => {
                            log::debug!("Skipping poll: too soon after the last one");
                        }
                        Err(e) => log::error!("Poll failed: {}", e),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        log::info!("Watchdog {} stopped", self.watcher);
        self
    }
}
