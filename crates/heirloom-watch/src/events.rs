//! Watch events emitted by the watchdog

use heirloom_core::{EstateId, HeartbeatAction};
use serde::{Deserialize, Serialize};

/// Events emitted by the [`Watchdog`](crate::Watchdog) on each poll
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum WatchEvent {
    /// The owner should check in
    /// (delivery is left to the host's notifier)
    CheckinReminder {
        estate: EstateId,
        /// How urgent: recommended, required or grace period
        action: HeartbeatAction,
        /// Seconds left before anyone may trigger inheritance
        seconds_until_trigger: i64,
    },

    /// The watchdog fired the dead-man's-switch
    InheritanceTriggered { estate: EstateId },

    /// The estate looked triggerable but the custodian refused
    TriggerRejected {
        estate: EstateId,
        /// Error message
        message: String,
    },
}

impl WatchEvent {
    pub fn estate(&self) -> EstateId {
        match self {
            WatchEvent::CheckinReminder { estate, .. }
            | WatchEvent::InheritanceTriggered { estate }
            | WatchEvent::TriggerRejected { estate, .. } => *estate,
        }
    }

    /// Check if this is an error event
    pub fn is_error(&self) -> bool {
        matches!(self, WatchEvent::TriggerRejected { .. })
    }
}
