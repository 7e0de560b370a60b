//! Persistent state for the watchdog
//!
//! Remembers which reminders were already sent and when each estate was
//! triggered, so a restarted watchdog does not repeat itself.

use heirloom_core::{CustodyState, EstateId, HeartbeatAction, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

/// Errors from state operations
#[derive(Error, Debug)]
pub enum StateError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// What the watchdog last saw and did for one estate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstateWatch {
    pub last_action: HeartbeatAction,
    /// Last reminder sent: the owner's `last_active_at` at the time and the
    /// urgency it was sent for
    pub reminded: Option<(Timestamp, HeartbeatAction)>,
    /// When this watchdog fired the dead-man's-switch
    pub triggered_at: Option<Timestamp>,
}

impl EstateWatch {
    pub fn new(action: HeartbeatAction) -> Self {
        Self {
            last_action: action,
            reminded: None,
            triggered_at: None,
        }
    }

    /// A reminder is due unless one was already sent for this urgency since
    /// the owner last checked in.
    pub fn reminder_due(&self, last_active_at: Timestamp, action: HeartbeatAction) -> bool {
        self.reminded != Some((last_active_at, action))
    }

    pub fn record_reminder(&mut self, last_active_at: Timestamp, action: HeartbeatAction) {
        self.reminded = Some((last_active_at, action));
    }
}

/// Full watchdog state (all estates)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WatchState {
    pub estates: BTreeMap<EstateId, EstateWatch>,
    /// Last successful poll (unix timestamp)
    pub last_poll: Option<Timestamp>,
    /// Number of completed polls
    pub polls: u64,
}

impl WatchState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load state from file, or create empty if not exists
    pub fn load(path: &Path) -> Result<Self, StateError> {
        if path.exists() {
            let contents = fs::read_to_string(path)?;
            let state: WatchState = serde_json::from_str(&contents)?;
            Ok(state)
        } else {
            Ok(Self::new())
        }
    }

    /// Save state to file
    pub fn save(&self, path: &Path) -> Result<(), StateError> {
        write_json(path, self)
    }

    /// Entry for an estate, created on first sight
    pub fn watch_mut(&mut self, estate: EstateId, action: HeartbeatAction) -> &mut EstateWatch {
        self.estates
            .entry(estate)
            .or_insert_with(|| EstateWatch::new(action))
    }

    pub fn watch(&self, estate: EstateId) -> Option<&EstateWatch> {
        self.estates.get(&estate)
    }

    pub fn update_poll(&mut self, timestamp: Timestamp) {
        self.last_poll = Some(timestamp);
        self.polls += 1;
    }
}

/// Write a JSON snapshot of the custody state.
pub fn save_snapshot(path: &Path, state: &CustodyState) -> Result<(), StateError> {
    write_json(path, state)
}

/// Read a snapshot written by [`save_snapshot`]; `None` if there is none yet.
pub fn load_snapshot(path: &Path) -> Result<Option<CustodyState>, StateError> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&contents)?))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StateError> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let contents = serde_json::to_string_pretty(value)?;
    fs::write(path, contents)?;
    Ok(())
}
