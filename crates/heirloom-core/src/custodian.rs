//! The `Custodian`: one entry point for every estate operation.
//!
//! Each call reads the clock once, runs the owning component's checks, and
//! only then writes. A rejected call leaves [`CustodyState`] untouched and
//! emits nothing; a successful one appends exactly one [`AuditEvent`].
//!
//! Stores are owned by their components:
//!
//! | store | writer |
//! |---|---|
//! | estates, claim records | [`EstateRegistry`] |
//! | lock states | [`EmergencyLockManager`] |
//! | multisigs, proposals | [`MultisigEngine`] |
//! | recoveries | [`RecoveryModule`] |
//!
//! Governance never writes estate state itself. An executed proposal is
//! dispatched to the registry or the lock manager, which apply their own
//! checks.

use crate::beneficiary::{share_of, validate_beneficiaries, Beneficiary, ClaimRecord};
use crate::clock::{Clock, Timestamp};
use crate::emergency::{
    EmergencyLockManager, EmergencyLockState, LockAuthority, LockType, Unlocked,
};
use crate::error::EstateError;
use crate::events::{AuditAction, AuditEvent};
use crate::external::{AssetCustody, StrategyExecutor};
use crate::heartbeat::{evaluate_batch, evaluate_heartbeat, HeartbeatConfig, HeartbeatStatus};
use crate::limits::Limits;
use crate::multisig::{Multisig, MultisigEngine, Proposal, ProposalAction};
use crate::recovery::{Recovery, RecoveryModule};
use crate::registry::{Estate, EstateRegistry};
use crate::types::{Amount, ContactHash, EstateId, MultisigId, Principal, ProposalId, RecoveryId};
use serde::{Deserialize, Serialize};

/// Every store, in one serializable value a host can persist.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustodyState {
    pub registry: EstateRegistry,
    pub locks: EmergencyLockManager,
    pub governance: MultisigEngine,
    pub recoveries: RecoveryModule,
}

pub struct Custodian<C, A, S> {
    clock: C,
    custody: A,
    strategy: S,
    limits: Limits,
    state: CustodyState,
    journal: Vec<AuditEvent>,
}

impl<C, A, S> Custodian<C, A, S>
where
    C: Clock,
    A: AssetCustody,
    S: StrategyExecutor,
{
    pub fn new(clock: C, custody: A, strategy: S, limits: Limits) -> Result<Self, EstateError> {
        Self::with_state(clock, custody, strategy, limits, CustodyState::default())
    }

    /// Resume from a previously persisted state.
    pub fn with_state(
        clock: C,
        custody: A,
        strategy: S,
        limits: Limits,
        state: CustodyState,
    ) -> Result<Self, EstateError> {
        limits.validate()?;
        Ok(Self {
            clock,
            custody,
            strategy,
            limits,
            state,
            journal: Vec::new(),
        })
    }

    // ---- Estate lifecycle ----

    pub fn create_estate(
        &mut self,
        owner: &Principal,
        inactivity_period_secs: i64,
        grace_period_secs: i64,
        owner_contact_hash: ContactHash,
    ) -> Result<EstateId, EstateError> {
        let now = self.clock.now();
        let id = self.state.registry.create(
            owner.clone(),
            owner_contact_hash,
            inactivity_period_secs,
            grace_period_secs,
            now,
            &self.limits,
        )?;
        self.emit(
            Some(id),
            owner,
            now,
            AuditAction::EstateCreated {
                inactivity_period_secs,
                grace_period_secs,
            },
        );
        Ok(id)
    }

    pub fn check_in(&mut self, caller: &Principal, estate: EstateId) -> Result<(), EstateError> {
        let now = self.clock.now();
        self.state.registry.check_in(estate, caller, now)?;
        self.emit(Some(estate), caller, now, AuditAction::CheckedIn);
        Ok(())
    }

    /// Replace the whole beneficiary list. Returns the new count.
    pub fn update_beneficiaries(
        &mut self,
        caller: &Principal,
        estate: EstateId,
        beneficiaries: Vec<Beneficiary>,
    ) -> Result<usize, EstateError> {
        let now = self.clock.now();
        let count =
            self.state
                .registry
                .update_beneficiaries(estate, caller, beneficiaries, &self.limits)?;
        self.emit(
            Some(estate),
            caller,
            now,
            AuditAction::BeneficiariesUpdated { count },
        );
        Ok(count)
    }

    /// Fire the dead-man's-switch. Anyone may call this.
    pub fn trigger_inheritance(
        &mut self,
        caller: &Principal,
        estate: EstateId,
    ) -> Result<(), EstateError> {
        let now = self.clock.now();
        self.state.registry.trigger_inheritance(estate, now)?;
        self.emit(Some(estate), caller, now, AuditAction::InheritanceTriggered);
        Ok(())
    }

    /// Claim the caller's share and have custody pay it out.
    ///
    /// The first claim of a lifecycle snapshots the estate balance; every
    /// later share is computed against the same snapshot.
    pub fn claim_inheritance(
        &mut self,
        caller: &Principal,
        estate: EstateId,
        beneficiary_index: usize,
    ) -> Result<ClaimRecord, EstateError> {
        let now = self.clock.now();
        let ticket = self
            .state
            .registry
            .prepare_claim(estate, beneficiary_index, caller)?;

        let snapshot = match ticket.snapshot {
            Some(snapshot) => snapshot,
            None => self.custody.estate_balance(estate)?,
        };
        let amount = share_of(snapshot, ticket.share);
        self.custody.payout(estate, caller, amount)?;

        let record = self
            .state
            .registry
            .record_claim(ticket, caller, snapshot, amount, now)?;
        self.emit(
            Some(estate),
            caller,
            now,
            AuditAction::InheritanceClaimed {
                beneficiary_index,
                share: record.share_percentage,
                amount,
            },
        );
        Ok(record)
    }

    /// Mark a fully claimed estate as closed.
    pub fn close_estate(&mut self, caller: &Principal, estate: EstateId) -> Result<(), EstateError> {
        let now = self.clock.now();
        self.state.registry.close(estate)?;
        self.emit(Some(estate), caller, now, AuditAction::EstateClosed);
        Ok(())
    }

    /// Put the estate under a multisig's governance.
    pub fn attach_multisig(
        &mut self,
        caller: &Principal,
        estate: EstateId,
        multisig: MultisigId,
    ) -> Result<(), EstateError> {
        let now = self.clock.now();
        self.state.governance.multisig(multisig)?;
        self.state
            .registry
            .attach_multisig(estate, caller, multisig)?;
        self.emit(
            Some(estate),
            caller,
            now,
            AuditAction::MultisigAttached { multisig },
        );
        Ok(())
    }

    // ---- Emergency locks ----

    /// Owner lock. Returns the estate's lock count after this lock.
    ///
    /// Only a commitment to `verification_seed` is kept; the owner needs the
    /// seed itself to unlock.
    pub fn initiate_emergency_lock(
        &mut self,
        caller: &Principal,
        estate: EstateId,
        lock_type: LockType,
        reason: &str,
        verification_seed: &str,
    ) -> Result<u32, EstateError> {
        let now = self.clock.now();
        let CustodyState {
            registry, locks, ..
        } = &mut self.state;
        let lock_count = locks.initiate(
            registry,
            estate,
            LockAuthority::Caller(caller),
            lock_type,
            reason,
            verification_seed,
            now,
            &self.limits,
        )?;
        if registry.get(estate)?.trading_enabled {
            self.strategy.pause(estate);
        }
        self.emit(
            Some(estate),
            caller,
            now,
            AuditAction::EmergencyLocked {
                lock_type,
                lock_count,
            },
        );
        Ok(lock_count)
    }

    /// Owner unlock with the lock's seed.
    ///
    /// A wrong seed is the one rejection that changes state: it consumes an
    /// attempt and is recorded in the journal.
    pub fn attempt_emergency_unlock(
        &mut self,
        caller: &Principal,
        estate: EstateId,
        candidate_seed: &str,
    ) -> Result<Unlocked, EstateError> {
        let now = self.clock.now();
        let CustodyState {
            registry, locks, ..
        } = &mut self.state;
        match locks.attempt_unlock(registry, estate, caller, candidate_seed, now, &self.limits) {
            Ok(unlocked) => {
                let resume = registry.get(estate)?;
                if resume.trading_enabled {
                    if let Some(settings) = &resume.risk_settings {
                        self.strategy.resume(estate, settings);
                    }
                }
                self.emit(
                    Some(estate),
                    caller,
                    now,
                    AuditAction::EmergencyUnlocked {
                        lock_duration_secs: unlocked.lock_duration_secs,
                    },
                );
                Ok(unlocked)
            }
            Err(err @ EstateError::InvalidVerification { .. }) => {
                let failed_attempts = locks
                    .state(estate)
                    .map(|s| s.failed_unlock_attempts)
                    .unwrap_or_default();
                log::warn!(
                    "Wrong unlock seed for {} ({} failed attempts)",
                    estate,
                    failed_attempts
                );
                self.emit(
                    Some(estate),
                    caller,
                    now,
                    AuditAction::UnlockFailed { failed_attempts },
                );
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Clear a lock with an executed unlock proposal of the estate's
    /// multisig. `caller` must be one of its signers.
    pub fn force_unlock_by_multisig(
        &mut self,
        caller: &Principal,
        estate: EstateId,
        proposal: ProposalId,
    ) -> Result<Unlocked, EstateError> {
        let now = self.clock.now();
        let CustodyState {
            registry,
            locks,
            governance,
            ..
        } = &mut self.state;

        let multisig = registry
            .get(estate)?
            .multisig
            .ok_or(EstateError::MultisigNotAttached)?;
        if !governance.multisig(multisig)?.is_signer(caller) {
            return Err(EstateError::NotASigner(caller.clone()));
        }
        let proposal = governance.proposal(proposal)?;
        let unlocked = locks.force_unlock(registry, estate, proposal, now)?;
        let proposal_id = proposal.id;

        let resume = registry.get(estate)?;
        if resume.trading_enabled {
            if let Some(settings) = &resume.risk_settings {
                self.strategy.resume(estate, settings);
            }
        }
        self.emit(
            Some(estate),
            caller,
            now,
            AuditAction::ForceUnlocked {
                proposal: proposal_id,
                lock_duration_secs: unlocked.lock_duration_secs,
            },
        );
        Ok(unlocked)
    }

    // ---- Governance ----

    pub fn initialize_multisig(
        &mut self,
        caller: &Principal,
        signers: Vec<Principal>,
        threshold: usize,
    ) -> Result<MultisigId, EstateError> {
        let now = self.clock.now();
        let count = signers.len();
        let id = self
            .state
            .governance
            .initialize(caller, signers, threshold, now, &self.limits)?;
        self.emit(
            None,
            caller,
            now,
            AuditAction::MultisigInitialized {
                multisig: id,
                signers: count,
                threshold,
            },
        );
        Ok(id)
    }

    /// Raise a proposal against an estate governed by `multisig`. The
    /// proposer's approval is counted immediately.
    ///
    /// Payloads are validated here so a proposal that could never execute is
    /// rejected up front.
    pub fn create_proposal(
        &mut self,
        caller: &Principal,
        multisig: MultisigId,
        target_estate: EstateId,
        action: ProposalAction,
    ) -> Result<ProposalId, EstateError> {
        let now = self.clock.now();
        match self.state.registry.get(target_estate)?.multisig {
            Some(attached) if attached == multisig => {}
            Some(_) => {
                return Err(EstateError::InvalidProposal(format!(
                    "{} is not governed by {}",
                    target_estate, multisig
                )))
            }
            None => return Err(EstateError::MultisigNotAttached),
        }
        self.validate_payload(&action)?;

        let kind = action.name();
        let id = self.state.governance.create_proposal(
            multisig,
            caller,
            target_estate,
            action,
            now,
        )?;
        self.emit(
            Some(target_estate),
            caller,
            now,
            AuditAction::ProposalCreated {
                proposal: id,
                kind: kind.to_string(),
            },
        );
        Ok(id)
    }

    /// Returns the approval count after this approval.
    pub fn approve_proposal(
        &mut self,
        caller: &Principal,
        proposal: ProposalId,
    ) -> Result<usize, EstateError> {
        let now = self.clock.now();
        let approvals = self.state.governance.approve(proposal, caller)?;
        let estate = self.state.governance.proposal(proposal)?.target_estate;
        self.emit(
            Some(estate),
            caller,
            now,
            AuditAction::ProposalApproved {
                proposal,
                approvals,
            },
        );
        Ok(approvals)
    }

    /// Execute a proposal that has reached its threshold. Anyone may call
    /// this.
    ///
    /// The action is applied first; the proposal is only marked executed if
    /// that succeeded. Unlock proposals apply nothing here: once executed
    /// they authorize one [`Custodian::force_unlock_by_multisig`].
    pub fn execute_proposal(
        &mut self,
        caller: &Principal,
        proposal: ProposalId,
    ) -> Result<(), EstateError> {
        let now = self.clock.now();
        let proposal = self.state.governance.executable(proposal)?.clone();
        let estate = proposal.target_estate;
        let multisig = proposal.multisig;

        let CustodyState {
            registry, locks, ..
        } = &mut self.state;
        match &proposal.action {
            ProposalAction::EmergencyLock { reason } => {
                let seed = format!("proposal:{}", proposal.id.get());
                locks.initiate(
                    registry,
                    estate,
                    LockAuthority::Governance(multisig),
                    LockType::MultisigInitiated,
                    reason,
                    &seed,
                    now,
                    &self.limits,
                )?;
                if registry.get(estate)?.trading_enabled {
                    self.strategy.pause(estate);
                }
            }
            ProposalAction::EmergencyUnlock | ProposalAction::ForceUnlock => {
                match registry.get(estate)?.multisig {
                    Some(attached) if attached == multisig => {}
                    _ => return Err(EstateError::MultisigNotAttached),
                }
            }
            ProposalAction::UpdateBeneficiaries { beneficiaries } => {
                registry.update_beneficiaries_by_governance(
                    estate,
                    multisig,
                    beneficiaries.clone(),
                    &self.limits,
                )?;
            }
            ProposalAction::EnableTrading { risk_settings } => {
                registry.enable_trading(estate, multisig, risk_settings.clone())?;
                self.strategy.resume(estate, risk_settings);
            }
            ProposalAction::DisableTrading => {
                registry.disable_trading(estate, multisig)?;
                self.strategy.pause(estate);
            }
        }

        self.state.governance.mark_executed(proposal.id, now)?;
        self.emit(
            Some(estate),
            caller,
            now,
            AuditAction::ProposalExecuted {
                proposal: proposal.id,
                kind: proposal.action.name().to_string(),
            },
        );
        Ok(())
    }

    fn validate_payload(&self, action: &ProposalAction) -> Result<(), EstateError> {
        match action {
            ProposalAction::EmergencyLock { reason } => {
                let len = reason.len();
                if len < self.limits.min_reason_len || len > self.limits.max_reason_len {
                    return Err(EstateError::InvalidLockReason {
                        len,
                        min: self.limits.min_reason_len,
                        max: self.limits.max_reason_len,
                    });
                }
                Ok(())
            }
            ProposalAction::UpdateBeneficiaries { beneficiaries } => {
                validate_beneficiaries(beneficiaries, self.limits.max_beneficiaries)
            }
            ProposalAction::EnableTrading { risk_settings } => risk_settings.validate(),
            ProposalAction::EmergencyUnlock
            | ProposalAction::ForceUnlock
            | ProposalAction::DisableTrading => Ok(()),
        }
    }

    // ---- Recovery ----

    /// Start recovering an estate that stayed unclaimed. Anyone may call
    /// this by paying at least the minimum fee.
    pub fn initiate_recovery(
        &mut self,
        caller: &Principal,
        estate: EstateId,
        fee: Amount,
    ) -> Result<RecoveryId, EstateError> {
        let now = self.clock.now();
        let record = self.state.registry.get(estate)?;
        let id = self
            .state
            .recoveries
            .initiate(record, caller, fee, now, &self.limits)?;
        self.emit(
            Some(estate),
            caller,
            now,
            AuditAction::RecoveryInitiated { recovery: id, fee },
        );
        Ok(id)
    }

    /// Reassign the estate to the recovery's initiator once the timelock
    /// has passed. Any open lock is closed and the lifecycle restarts.
    pub fn execute_recovery(&mut self, caller: &Principal, estate: EstateId) -> Result<(), EstateError> {
        let now = self.clock.now();
        let CustodyState {
            registry,
            locks,
            recoveries,
            ..
        } = &mut self.state;

        let recovery = recoveries
            .executable(estate, caller, now, &self.limits)?
            .id;
        let record = registry.get(estate)?;
        // every beneficiary claimed during the timelock
        if record.closed {
            return Err(EstateError::EstateClosed);
        }
        let was_trading = record.trading_enabled;

        locks.release_for_recovery(estate, now);
        let previous_owner = registry.recover(estate, caller.clone(), now)?;
        recoveries.mark_executed(recovery, now);
        if was_trading {
            self.strategy.pause(estate);
        }

        self.emit(
            Some(estate),
            caller,
            now,
            AuditAction::RecoveryExecuted {
                recovery,
                previous_owner,
            },
        );
        Ok(())
    }

    // ---- Queries ----

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn estate(&self, id: EstateId) -> Result<&Estate, EstateError> {
        self.state.registry.get(id)
    }

    pub fn estates(&self) -> impl Iterator<Item = &Estate> {
        self.state.registry.iter()
    }

    pub fn claim_record(&self, estate: EstateId, beneficiary: &Principal) -> Option<&ClaimRecord> {
        self.state.registry.claim_record(estate, beneficiary)
    }

    pub fn lock_state(&self, estate: EstateId) -> Option<&EmergencyLockState> {
        self.state.locks.state(estate)
    }

    pub fn multisig(&self, id: MultisigId) -> Result<&Multisig, EstateError> {
        self.state.governance.multisig(id)
    }

    pub fn proposal(&self, id: ProposalId) -> Result<&Proposal, EstateError> {
        self.state.governance.proposal(id)
    }

    pub fn recovery_for(&self, estate: EstateId) -> Option<&Recovery> {
        self.state.recoveries.latest_for(estate)
    }

    pub fn heartbeat(
        &self,
        estate: EstateId,
        config: &HeartbeatConfig,
    ) -> Result<HeartbeatStatus, EstateError> {
        Ok(evaluate_heartbeat(self.estate(estate)?, self.now(), config))
    }

    /// Heartbeat of every estate, most urgent first.
    pub fn heartbeat_all(&self, config: &HeartbeatConfig) -> Vec<HeartbeatStatus> {
        evaluate_batch(self.state.registry.iter(), self.now(), config)
    }

    pub fn events(&self) -> &[AuditEvent] {
        &self.journal
    }

    /// Take the journal, e.g. to forward it to a notifier.
    pub fn drain_events(&mut self) -> Vec<AuditEvent> {
        std::mem::take(&mut self.journal)
    }

    pub fn state(&self) -> &CustodyState {
        &self.state
    }

    pub fn into_state(self) -> CustodyState {
        self.state
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn custody(&self) -> &A {
        &self.custody
    }

    pub fn custody_mut(&mut self) -> &mut A {
        &mut self.custody
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    fn emit(&mut self, estate: Option<EstateId>, actor: &Principal, at: Timestamp, action: AuditAction) {
        match estate {
            Some(estate) => log::info!("{} {} by {}", estate, action.name(), actor),
            None => log::info!("{} by {}", action.name(), actor),
        }
        self.journal.push(AuditEvent {
            estate,
            actor: actor.clone(),
            action,
            at,
        });
    }
}
