//! Recovery module: last-resort reassignment of an estate nobody claimed.
//!
//! Two delays stand between a claimable estate and its recovery: the
//! eligibility delay after the switch fired, then the timelock after
//! initiation. Beneficiaries can still claim throughout both.

use crate::clock::Timestamp;
use crate::error::EstateError;
use crate::limits::Limits;
use crate::registry::Estate;
use crate::types::{Amount, EstateId, Principal, RecoveryId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recovery {
    pub id: RecoveryId,
    pub estate: EstateId,
    pub initiator: Principal,
    pub initiated_at: Timestamp,
    pub recovery_fee: Amount,
    pub executed: bool,
    pub executed_at: Option<Timestamp>,
}

impl Recovery {
    /// Earliest instant `execute` may succeed.
    pub fn unlocks_at(&self, limits: &Limits) -> Timestamp {
        self.initiated_at
            .saturating_add(limits.recovery_timelock_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecoveryModule {
    recoveries: Vec<Recovery>,
}

impl RecoveryModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: RecoveryId) -> Option<&Recovery> {
        self.recoveries.get(id.index())
    }

    /// Most recent recovery for an estate.
    pub fn latest_for(&self, estate: EstateId) -> Option<&Recovery> {
        self.recoveries.iter().rev().find(|r| r.estate == estate)
    }

    pub fn history(&self, estate: EstateId) -> impl Iterator<Item = &Recovery> {
        self.recoveries.iter().filter(move |r| r.estate == estate)
    }

    pub(crate) fn initiate(
        &mut self,
        estate: &Estate,
        initiator: &Principal,
        fee: Amount,
        now: Timestamp,
        limits: &Limits,
    ) -> Result<RecoveryId, EstateError> {
        if estate.closed {
            return Err(EstateError::EstateClosed);
        }
        let claimable_since = match (estate.is_claimable, estate.claimable_since) {
            (true, Some(since)) => since,
            _ => return Err(EstateError::NotClaimable),
        };
        if self
            .latest_for(estate.id)
            .is_some_and(|r| !r.executed)
        {
            return Err(EstateError::RecoveryAlreadyInitiated);
        }
        let retry_at = claimable_since.saturating_add(limits.recovery_eligibility_delay_secs);
        if now < retry_at {
            return Err(EstateError::RecoveryTooEarly { retry_at });
        }
        if fee < limits.min_recovery_fee {
            return Err(EstateError::InsufficientRecoveryFee {
                fee,
                min: limits.min_recovery_fee,
            });
        }

        let id = RecoveryId::from_index(self.recoveries.len());
        self.recoveries.push(Recovery {
            id,
            estate: estate.id,
            initiator: initiator.clone(),
            initiated_at: now,
            recovery_fee: fee,
            executed: false,
            executed_at: None,
        });
        Ok(id)
    }

    /// Check that `caller` may execute the pending recovery now. Nothing is
    /// written; [`RecoveryModule::mark_executed`] finalizes once the estate
    /// has been reassigned.
    pub(crate) fn executable(
        &self,
        estate: EstateId,
        caller: &Principal,
        now: Timestamp,
        limits: &Limits,
    ) -> Result<&Recovery, EstateError> {
        let recovery = self
            .latest_for(estate)
            .ok_or(EstateError::RecoveryNotFound(estate))?;
        if &recovery.initiator != caller {
            return Err(EstateError::Unauthorized);
        }
        if recovery.executed {
            return Err(EstateError::RecoveryAlreadyExecuted);
        }
        let retry_at = recovery.unlocks_at(limits);
        if now < retry_at {
            return Err(EstateError::TimelockNotExpired { retry_at });
        }
        Ok(recovery)
    }

    pub(crate) fn mark_executed(&mut self, id: RecoveryId, now: Timestamp) {
        if let Some(recovery) = self.recoveries.get_mut(id.index()) {
            recovery.executed = true;
            recovery.executed_at = Some(now);
        }
    }
}
