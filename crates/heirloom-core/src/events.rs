//! Audit events emitted by every successful mutation

use crate::clock::Timestamp;
use crate::emergency::LockType;
use crate::types::{Amount, EstateId, MultisigId, Principal, ProposalId, RecoveryId};
use serde::{Deserialize, Serialize};

/// One audit record: who did what to which estate, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Estate affected, if any (multisig creation has none)
    pub estate: Option<EstateId>,
    /// Caller that caused the event
    pub actor: Principal,
    pub action: AuditAction,
    pub at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditAction {
    EstateCreated {
        inactivity_period_secs: i64,
        grace_period_secs: i64,
    },
    CheckedIn,
    BeneficiariesUpdated {
        count: usize,
    },
    InheritanceTriggered,
    InheritanceClaimed {
        beneficiary_index: usize,
        share: u8,
        amount: Amount,
    },
    EstateClosed,
    MultisigAttached {
        multisig: MultisigId,
    },
    EmergencyLocked {
        lock_type: LockType,
        lock_count: u32,
    },
    /// A wrong seed was presented. Recorded because it consumes an attempt.
    UnlockFailed {
        failed_attempts: u8,
    },
    EmergencyUnlocked {
        lock_duration_secs: i64,
    },
    ForceUnlocked {
        proposal: ProposalId,
        lock_duration_secs: i64,
    },
    MultisigInitialized {
        multisig: MultisigId,
        signers: usize,
        threshold: usize,
    },
    ProposalCreated {
        proposal: ProposalId,
        kind: String,
    },
    ProposalApproved {
        proposal: ProposalId,
        approvals: usize,
    },
    ProposalExecuted {
        proposal: ProposalId,
        kind: String,
    },
    RecoveryInitiated {
        recovery: RecoveryId,
        fee: Amount,
    },
    RecoveryExecuted {
        recovery: RecoveryId,
        previous_owner: Principal,
    },
}

impl AuditAction {
    pub fn name(&self) -> &'static str {
        match self {
            AuditAction::EstateCreated { .. } => "estate_created",
            AuditAction::CheckedIn => "checked_in",
            AuditAction::BeneficiariesUpdated { .. } => "beneficiaries_updated",
            AuditAction::InheritanceTriggered => "inheritance_triggered",
            AuditAction::InheritanceClaimed { .. } => "inheritance_claimed",
            AuditAction::EstateClosed => "estate_closed",
            AuditAction::MultisigAttached { .. } => "multisig_attached",
            AuditAction::EmergencyLocked { .. } => "emergency_locked",
            AuditAction::UnlockFailed { .. } => "unlock_failed",
            AuditAction::EmergencyUnlocked { .. } => "emergency_unlocked",
            AuditAction::ForceUnlocked { .. } => "force_unlocked",
            AuditAction::MultisigInitialized { .. } => "multisig_initialized",
            AuditAction::ProposalCreated { .. } => "proposal_created",
            AuditAction::ProposalApproved { .. } => "proposal_approved",
            AuditAction::ProposalExecuted { .. } => "proposal_executed",
            AuditAction::RecoveryInitiated { .. } => "recovery_initiated",
            AuditAction::RecoveryExecuted { .. } => "recovery_executed",
        }
    }
}

impl AuditEvent {
    /// Check if this event changes who controls or inherits the estate
    pub fn is_ownership_change(&self) -> bool {
        matches!(
            self.action,
            AuditAction::InheritanceTriggered | AuditAction::RecoveryExecuted { .. }
        )
    }
}
