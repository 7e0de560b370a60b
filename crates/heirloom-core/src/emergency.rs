//! Emergency lock manager.
//!
//! Freezes an estate on top of its lifecycle state, independent of the
//! dead-man's-switch. The lock manager is the only writer of
//! [`EmergencyLockState`]; it flips the estate's `is_locked` flag through the
//! registry.
//!
//! # Unlock paths
//!
//! - **Owner**: present the seed whose commitment was stored at lock time,
//!   after a minimum dwell, within a bounded number of attempts.
//! - **Governance**: a signer presents an executed unlock proposal that
//!   targets the estate. Seeds are not checked and the attempt budget is
//!   reset.

use crate::clock::Timestamp;
use crate::error::EstateError;
use crate::limits::Limits;
use crate::multisig::{Proposal, ProposalAction};
use crate::registry::EstateRegistry;
use crate::types::{ContactHash, EstateId, MultisigId, Principal, ProposalId};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use zeroize::Zeroizing;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockType {
    SecurityBreach,
    SuspiciousActivity,
    UserInitiated,
    MultisigInitiated,
    Recovery,
}

impl LockType {
    /// Lock types the estate owner may raise and clear with a seed.
    pub fn is_owner_type(self) -> bool {
        match self {
            LockType::UserInitiated | LockType::SecurityBreach | LockType::SuspiciousActivity => {
                true
            }
            LockType::MultisigInitiated | LockType::Recovery => false,
        }
    }
}

/// Who is asking for a lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockAuthority<'a> {
    Caller(&'a Principal),
    /// An executed `EmergencyLock` proposal of this multisig
    Governance(MultisigId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyLockState {
    pub estate: EstateId,
    pub lock_type: LockType,
    pub reason: String,
    pub locked_by: String,
    pub locked_at: Timestamp,
    /// Total locks ever placed on this estate
    pub lock_count: u32,
    /// Wrong seeds in the current episode
    pub failed_unlock_attempts: u8,
    #[serde(with = "crate::types::hex32")]
    pub verification_hash: [u8; 32],
    pub unlock_timestamp: Option<Timestamp>,
    /// Latest lock or unlock; the cooldown runs from here
    pub last_transition_at: Timestamp,
    pub active: bool,
    /// Unlock proposals already spent on this estate
    pub overrides_used: Vec<ProposalId>,
}

/// Result of a successful unlock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unlocked {
    pub unlocked_at: Timestamp,
    pub lock_duration_secs: i64,
}

/// Commitment stored at lock time:
/// `SHA-256(estate id ‖ owner contact hash ‖ lockedAt ‖ seed)`.
pub fn verification_commitment(
    estate: EstateId,
    owner_contact_hash: &ContactHash,
    locked_at: Timestamp,
    seed: &str,
) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(estate.get().to_le_bytes());
    hasher.update(owner_contact_hash.as_bytes());
    hasher.update(locked_at.to_le_bytes());
    hasher.update(seed.as_bytes());
    hasher.finalize().into()
}

/// Fresh random seed for an owner lock, hex encoded. Wiped on drop.
pub fn generate_verification_seed() -> Zeroizing<String> {
    let mut bytes = Zeroizing::new([0u8; 32]);
    rand::thread_rng().fill_bytes(bytes.as_mut());
    Zeroizing::new(hex::encode(bytes.as_ref()))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmergencyLockManager {
    states: BTreeMap<EstateId, EmergencyLockState>,
}

impl EmergencyLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, estate: EstateId) -> Option<&EmergencyLockState> {
        self.states.get(&estate)
    }

    /// Place a lock. Returns the new lock count.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn initiate(
        &mut self,
        registry: &mut EstateRegistry,
        id: EstateId,
        authority: LockAuthority<'_>,
        lock_type: LockType,
        reason: &str,
        verification_seed: &str,
        now: Timestamp,
        limits: &Limits,
    ) -> Result<u32, EstateError> {
        let estate = registry.get(id)?;

        let locked_by = match authority {
            LockAuthority::Caller(caller) => {
                if !lock_type.is_owner_type() || &estate.owner != caller {
                    return Err(EstateError::Unauthorized);
                }
                caller.to_string()
            }
            LockAuthority::Governance(multisig) => {
                if lock_type != LockType::MultisigInitiated {
                    return Err(EstateError::Unauthorized);
                }
                match estate.multisig {
                    Some(attached) if attached == multisig => multisig.to_string(),
                    _ => return Err(EstateError::MultisigNotAttached),
                }
            }
        };

        if estate.closed {
            return Err(EstateError::EstateClosed);
        }
        if estate.is_locked {
            return Err(EstateError::LockAlreadyActive);
        }
        if let Some(previous) = self.states.get(&id) {
            let retry_at = previous
                .last_transition_at
                .saturating_add(limits.lock_cooldown_secs);
            if now < retry_at {
                return Err(EstateError::CooldownActive { retry_at });
            }
        }
        let len = reason.len();
        if len < limits.min_reason_len || len > limits.max_reason_len {
            return Err(EstateError::InvalidLockReason {
                len,
                min: limits.min_reason_len,
                max: limits.max_reason_len,
            });
        }

        let verification_hash =
            verification_commitment(id, &estate.owner_contact_hash, now, verification_seed);

        let (lock_count, overrides_used) = match self.states.remove(&id) {
            Some(previous) => (previous.lock_count.saturating_add(1), previous.overrides_used),
            None => (1, Vec::new()),
        };
        self.states.insert(
            id,
            EmergencyLockState {
                estate: id,
                lock_type,
                reason: reason.to_string(),
                locked_by,
                locked_at: now,
                lock_count,
                failed_unlock_attempts: 0,
                verification_hash,
                unlock_timestamp: None,
                last_transition_at: now,
                active: true,
                overrides_used,
            },
        );
        registry.set_locked(id, true)?;
        Ok(lock_count)
    }

    /// Owner unlock with the lock's seed.
    ///
    /// A wrong seed is recorded against the attempt budget before the error
    /// is returned.
    pub(crate) fn attempt_unlock(
        &mut self,
        registry: &mut EstateRegistry,
        id: EstateId,
        caller: &Principal,
        candidate_seed: &str,
        now: Timestamp,
        limits: &Limits,
    ) -> Result<Unlocked, EstateError> {
        let estate = registry.get(id)?;
        let state = match self.states.get_mut(&id) {
            Some(state) if state.active && estate.is_locked => state,
            _ => return Err(EstateError::LockNotActive),
        };

        if !state.lock_type.is_owner_type() || &estate.owner != caller {
            return Err(EstateError::Unauthorized);
        }

        let retry_at = state
            .locked_at
            .saturating_add(limits.min_unlock_delay_secs);
        if now < retry_at {
            return Err(EstateError::TooEarly { retry_at });
        }
        if state.failed_unlock_attempts >= limits.max_unlock_attempts {
            return Err(EstateError::MaxAttemptsExceeded);
        }

        let candidate =
            verification_commitment(id, &estate.owner_contact_hash, state.locked_at, candidate_seed);
        if candidate != state.verification_hash {
            state.failed_unlock_attempts = state.failed_unlock_attempts.saturating_add(1);
            return Err(EstateError::InvalidVerification {
                remaining: limits
                    .max_unlock_attempts
                    .saturating_sub(state.failed_unlock_attempts),
            });
        }

        let unlocked = Self::release(state, now);
        registry.set_locked(id, false)?;
        Ok(unlocked)
    }

    /// Governance override. `proposal` must be an executed unlock proposal of
    /// the estate's attached multisig that targets this estate and has not
    /// been spent before.
    pub(crate) fn force_unlock(
        &mut self,
        registry: &mut EstateRegistry,
        id: EstateId,
        proposal: &Proposal,
        now: Timestamp,
    ) -> Result<Unlocked, EstateError> {
        let estate = registry.get(id)?;

        if estate.multisig != Some(proposal.multisig) {
            return Err(EstateError::InvalidProposal(format!(
                "{} is not governed by {}",
                id, proposal.multisig
            )));
        }
        if !proposal.executed {
            return Err(EstateError::InvalidProposal(format!(
                "{} has not been executed",
                proposal.id
            )));
        }
        if !matches!(
            proposal.action,
            ProposalAction::ForceUnlock | ProposalAction::EmergencyUnlock
        ) {
            return Err(EstateError::InvalidProposal(format!(
                "{} is a {} proposal",
                proposal.id,
                proposal.action.name()
            )));
        }
        if proposal.target_estate != id {
            return Err(EstateError::InvalidProposal(format!(
                "{} targets {}",
                proposal.id, proposal.target_estate
            )));
        }

        let state = match self.states.get_mut(&id) {
            Some(state) if state.active && estate.is_locked => state,
            _ => return Err(EstateError::LockNotActive),
        };
        if state.overrides_used.contains(&proposal.id) {
            return Err(EstateError::InvalidProposal(format!(
                "{} was already used",
                proposal.id
            )));
        }

        state.overrides_used.push(proposal.id);
        let unlocked = Self::release(state, now);
        registry.set_locked(id, false)?;
        Ok(unlocked)
    }

    /// Close any open lock episode as part of a recovery.
    pub(crate) fn release_for_recovery(&mut self, id: EstateId, now: Timestamp) {
        if let Some(state) = self.states.get_mut(&id) {
            if state.active {
                Self::release(state, now);
            }
        }
    }

    fn release(state: &mut EmergencyLockState, now: Timestamp) -> Unlocked {
        state.active = false;
        state.unlock_timestamp = Some(now);
        state.failed_unlock_attempts = 0;
        state.last_transition_at = now;
        Unlocked {
            unlocked_at: now,
            lock_duration_secs: now - state.locked_at,
        }
    }
}
