//! Fixed bounds and delays enforced by the core.
//!
//! Defaults mirror production values; tests and hosts may tighten or relax
//! them, but every set of limits goes through [`Limits::validate`] first.

use crate::clock::DAY_SECS;
use crate::error::EstateError;
use crate::types::Amount;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Shortest inactivity window an owner may choose.
    pub min_inactivity_secs: i64,
    /// Longest inactivity window an owner may choose.
    pub max_inactivity_secs: i64,
    pub min_grace_secs: i64,
    pub max_grace_secs: i64,
    pub max_beneficiaries: usize,

    /// Minimum gap between a lock/unlock transition and the next lock.
    pub lock_cooldown_secs: i64,
    /// Minimum dwell time before an owner may unlock.
    pub min_unlock_delay_secs: i64,
    /// Wrong seeds allowed per lock episode.
    pub max_unlock_attempts: u8,
    pub min_reason_len: usize,
    pub max_reason_len: usize,

    pub min_signers: usize,
    pub max_signers: usize,

    /// How long an estate must have been claimable before recovery may start.
    pub recovery_eligibility_delay_secs: i64,
    /// Delay between initiating and executing a recovery.
    pub recovery_timelock_secs: i64,
    pub min_recovery_fee: Amount,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            min_inactivity_secs: DAY_SECS,
            max_inactivity_secs: 300 * 365 * DAY_SECS,
            min_grace_secs: DAY_SECS,
            max_grace_secs: 90 * DAY_SECS,
            max_beneficiaries: 10,
            lock_cooldown_secs: 3600,
            min_unlock_delay_secs: 300,
            max_unlock_attempts: 5,
            min_reason_len: 11,
            max_reason_len: 128,
            min_signers: 2,
            max_signers: 10,
            recovery_eligibility_delay_secs: 30 * DAY_SECS,
            recovery_timelock_secs: 7 * DAY_SECS,
            min_recovery_fee: 100_000_000,
        }
    }
}

impl Limits {
    /// Check that every range is non-empty and every delay non-negative.
    pub fn validate(&self) -> Result<(), EstateError> {
        let bad = |msg: &str| Err(EstateError::InvalidLimits(msg.into()));

        if self.min_inactivity_secs <= 0 || self.min_inactivity_secs > self.max_inactivity_secs {
            return bad("inactivity range must be positive and non-empty");
        }
        if self.min_grace_secs < 0 || self.min_grace_secs > self.max_grace_secs {
            return bad("grace range must be non-negative and non-empty");
        }
        if self.max_beneficiaries == 0 {
            return bad("max_beneficiaries must be > 0");
        }
        if self.lock_cooldown_secs < 0
            || self.min_unlock_delay_secs < 0
            || self.recovery_eligibility_delay_secs < 0
            || self.recovery_timelock_secs < 0
        {
            return bad("delays must be non-negative");
        }
        if self.max_unlock_attempts == 0 {
            return bad("max_unlock_attempts must be > 0");
        }
        if self.min_reason_len == 0 || self.min_reason_len > self.max_reason_len {
            return bad("reason length range must be non-empty and start above zero");
        }
        // threshold must exceed one, so a multisig needs at least two signers
        if self.min_signers < 2 || self.min_signers > self.max_signers {
            return bad("signer range must start at 2 or more and be non-empty");
        }
        Ok(())
    }

    pub(crate) fn check_inactivity(&self, secs: i64) -> Result<(), EstateError> {
        check_period("inactivity", secs, self.min_inactivity_secs, self.max_inactivity_secs)
    }

    pub(crate) fn check_grace(&self, secs: i64) -> Result<(), EstateError> {
        check_period("grace", secs, self.min_grace_secs, self.max_grace_secs)
    }
}

fn check_period(which: &'static str, secs: i64, min: i64, max: i64) -> Result<(), EstateError> {
    if secs < min || secs > max {
        return Err(EstateError::InvalidPeriod {
            which,
            secs,
            min,
            max,
        });
    }
    Ok(())
}
