//! Dead-man's-switch heartbeat evaluation.
//!
//! Pure logic: takes an estate and the current time, returns a
//! recommendation. The caller (watchdog, host app) decides whether to act.
//!
//! ```text
//! |-- Healthy --|-- CheckinRecommended --|-- CheckinRequired --|-- GracePeriod --|-- Triggerable
//! 0%           50%                      90%                  100%      inactivity + grace
//! ```
//!
//! Percentages are of the inactivity period. Thresholds are configurable.

use crate::clock::Timestamp;
use crate::registry::{Estate, EstatePhase};
use crate::types::EstateId;
use serde::{Deserialize, Serialize};

/// When to recommend a check-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    /// Fraction of the inactivity period elapsed before recommending a
    /// check-in (0.0–1.0). Default: 0.5.
    pub checkin_threshold: f64,

    /// Fraction elapsed before a check-in is critical. Default: 0.9.
    pub critical_threshold: f64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            checkin_threshold: 0.5,
            critical_threshold: 0.9,
        }
    }
}

impl HeartbeatConfig {
    /// Validate that thresholds are sensible.
    pub fn validate(&self) -> Result<(), HeartbeatError> {
        if self.checkin_threshold <= 0.0 || self.checkin_threshold >= 1.0 {
            return Err(HeartbeatError::InvalidThreshold(
                "checkin_threshold must be between 0.0 and 1.0 exclusive".into(),
            ));
        }
        if self.critical_threshold <= self.checkin_threshold || self.critical_threshold >= 1.0 {
            return Err(HeartbeatError::InvalidThreshold(
                "critical_threshold must be between checkin_threshold and 1.0 exclusive".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HeartbeatError {
    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),
}

/// What the heartbeat recommends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeartbeatAction {
    /// Far from the deadline.
    Healthy,
    /// Past the check-in threshold.
    CheckinRecommended,
    /// Past the critical threshold. The owner must check in now.
    CheckinRequired,
    /// Inactivity period over; only the grace period remains.
    GracePeriod,
    /// Anyone may trigger inheritance.
    Triggerable,
    /// Emergency lock active; the owner cannot check in.
    Locked,
    Claimable,
    Closed,
}

impl HeartbeatAction {
    /// Lower is more urgent.
    fn priority(self) -> u8 {
        match self {
            HeartbeatAction::Triggerable => 0,
            HeartbeatAction::GracePeriod => 1,
            HeartbeatAction::CheckinRequired => 2,
            HeartbeatAction::Locked => 3,
            HeartbeatAction::CheckinRecommended => 4,
            HeartbeatAction::Healthy => 5,
            HeartbeatAction::Claimable => 6,
            HeartbeatAction::Closed => 7,
        }
    }

    /// Whether the owner should be reminded to check in.
    pub fn needs_checkin(self) -> bool {
        matches!(
            self,
            HeartbeatAction::CheckinRecommended
                | HeartbeatAction::CheckinRequired
                | HeartbeatAction::GracePeriod
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatStatus {
    pub estate: EstateId,
    /// Fraction of the inactivity period elapsed (0.0–1.0+).
    pub elapsed_fraction: f64,
    /// Seconds until `trigger_inheritance` can succeed; 0 once it can.
    pub seconds_until_trigger: i64,
    pub action: HeartbeatAction,
}

pub fn evaluate_heartbeat(estate: &Estate, now: Timestamp, config: &HeartbeatConfig) -> HeartbeatStatus {
    let elapsed = now.saturating_sub(estate.last_active_at).max(0);
    let elapsed_fraction = if estate.inactivity_period_secs <= 0 {
        1.0
    } else {
        elapsed as f64 / estate.inactivity_period_secs as f64
    };

    // trigger_inheritance fires strictly after the deadline
    let deadline = estate.inheritance_deadline();
    let seconds_until_trigger = deadline.saturating_add(1).saturating_sub(now).max(0);

    let action = match estate.phase() {
        EstatePhase::Closed => HeartbeatAction::Closed,
        EstatePhase::Claimable => HeartbeatAction::Claimable,
        EstatePhase::Locked => HeartbeatAction::Locked,
        EstatePhase::Active => {
            if now > deadline {
                HeartbeatAction::Triggerable
            } else if elapsed_fraction >= 1.0 {
                HeartbeatAction::GracePeriod
            } else if elapsed_fraction >= config.critical_threshold {
                HeartbeatAction::CheckinRequired
            } else if elapsed_fraction >= config.checkin_threshold {
                HeartbeatAction::CheckinRecommended
            } else {
                HeartbeatAction::Healthy
            }
        }
    };

    HeartbeatStatus {
        estate: estate.id,
        elapsed_fraction,
        seconds_until_trigger,
        action,
    }
}

/// Evaluate many estates. Most urgent first, then by elapsed fraction.
pub fn evaluate_batch<'a>(
    estates: impl IntoIterator<Item = &'a Estate>,
    now: Timestamp,
    config: &HeartbeatConfig,
) -> Vec<HeartbeatStatus> {
    let mut statuses: Vec<HeartbeatStatus> = estates
        .into_iter()
        .map(|estate| evaluate_heartbeat(estate, now, config))
        .collect();

    statuses.sort_by(|a, b| {
        a.action.priority().cmp(&b.action.priority()).then(
            a.elapsed_fraction
                .partial_cmp(&b.elapsed_fraction)
                .unwrap_or(std::cmp::Ordering::Equal)
                .reverse(),
        )
    });

    statuses
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::DAY_SECS;
    use crate::limits::Limits;
    use crate::registry::EstateRegistry;
    use crate::types::{ContactHash, Principal};

    const PERIOD: i64 = 100 * DAY_SECS;
    const GRACE: i64 = 10 * DAY_SECS;

    fn estate_at(last_active: Timestamp) -> Estate {
        let mut registry = EstateRegistry::new();
        let id = registry
            .create(
                Principal::new("owner"),
                ContactHash::digest("owner@example.com"),
                PERIOD,
                GRACE,
                last_active,
                &Limits::default(),
            )
            .unwrap();
        registry.get(id).unwrap().clone()
    }

    #[test]
    fn test_healthy_status() {
        let estate = estate_at(0);
        let status = evaluate_heartbeat(&estate, 10 * DAY_SECS, &HeartbeatConfig::default());
        assert_eq!(status.action, HeartbeatAction::Healthy);
        assert!((status.elapsed_fraction - 0.1).abs() < 0.001);
        assert_eq!(status.seconds_until_trigger, PERIOD + GRACE + 1 - 10 * DAY_SECS);
    }

    #[test]
    fn test_thresholds() {
        let estate = estate_at(0);
        let config = HeartbeatConfig::default();
        let at = |days: i64| evaluate_heartbeat(&estate, days * DAY_SECS, &config).action;

        assert_eq!(at(50), HeartbeatAction::CheckinRecommended);
        assert_eq!(at(89), HeartbeatAction::CheckinRecommended);
        assert_eq!(at(90), HeartbeatAction::CheckinRequired);
        assert_eq!(at(100), HeartbeatAction::GracePeriod);
        assert_eq!(at(110), HeartbeatAction::GracePeriod);
        assert_eq!(at(111), HeartbeatAction::Triggerable);
    }

    #[test]
    fn test_triggerable_exactly_after_deadline() {
        let estate = estate_at(0);
        let config = HeartbeatConfig::default();
        let deadline = estate.inheritance_deadline();

        let status = evaluate_heartbeat(&estate, deadline, &config);
        assert_eq!(status.action, HeartbeatAction::GracePeriod);
        assert_eq!(status.seconds_until_trigger, 1);

        let status = evaluate_heartbeat(&estate, deadline + 1, &config);
        assert_eq!(status.action, HeartbeatAction::Triggerable);
        assert_eq!(status.seconds_until_trigger, 0);
    }

    #[test]
    fn test_flags_override_timing() {
        let mut estate = estate_at(0);
        let config = HeartbeatConfig::default();

        estate.is_locked = true;
        assert_eq!(
            evaluate_heartbeat(&estate, 200 * DAY_SECS, &config).action,
            HeartbeatAction::Locked
        );
        estate.is_claimable = true;
        assert_eq!(
            evaluate_heartbeat(&estate, 0, &config).action,
            HeartbeatAction::Claimable
        );
        estate.closed = true;
        assert_eq!(
            evaluate_heartbeat(&estate, 0, &config).action,
            HeartbeatAction::Closed
        );
    }

    #[test]
    fn test_config_validation() {
        let bad = HeartbeatConfig {
            checkin_threshold: 0.0,
            critical_threshold: 0.9,
        };
        assert!(bad.validate().is_err());

        let inverted = HeartbeatConfig {
            checkin_threshold: 0.5,
            critical_threshold: 0.4,
        };
        assert!(inverted.validate().is_err());

        assert!(HeartbeatConfig::default().validate().is_ok());
    }

    #[test]
    fn test_batch_sorted_by_urgency() {
        let estates = vec![
            estate_at(95 * DAY_SECS), // 5 days in
            estate_at(0),             // 100 days in: grace
            estate_at(40 * DAY_SECS), // 60 days in
            estate_at(30 * DAY_SECS), // 70 days in
        ];
        let statuses = evaluate_batch(&estates, 100 * DAY_SECS, &HeartbeatConfig::default());

        assert_eq!(statuses[0].action, HeartbeatAction::GracePeriod);
        assert_eq!(statuses[1].action, HeartbeatAction::CheckinRecommended);
        assert_eq!(statuses[2].action, HeartbeatAction::CheckinRecommended);
        assert!(statuses[1].elapsed_fraction > statuses[2].elapsed_fraction);
        assert_eq!(statuses[3].action, HeartbeatAction::Healthy);
        assert!(statuses[0].action.needs_checkin());
        assert!(!statuses[3].action.needs_checkin());
    }
}
