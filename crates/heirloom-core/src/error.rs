//! Typed failures for every estate operation.
//!
//! Every rejected operation leaves state unchanged. The single exception is a
//! wrong unlock seed, which still counts against the lock's attempt budget.

use crate::clock::Timestamp;
use crate::external::CustodyError;
use crate::types::{Amount, EstateId, MultisigId, Principal, ProposalId};
use thiserror::Error;

/// How a caller should react to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input. Resubmit with corrected values.
    Validation,
    /// Wrong caller. Never retried automatically.
    Authorization,
    /// A precondition on current state does not hold.
    State,
    /// Too early. Retry once the delay elapses.
    Timing,
    /// Attempt budget spent for this lock episode. Needs a governance override.
    Exhaustion,
    /// Unknown handle.
    NotFound,
    /// An external collaborator failed.
    External,
}

impl ErrorKind {
    pub fn is_transient(self) -> bool {
        matches!(self, ErrorKind::Timing)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EstateError {
    // Validation
    #[error("Invalid {which} period: {secs} seconds is outside [{min}, {max}]")]
    InvalidPeriod {
        which: &'static str,
        secs: i64,
        min: i64,
        max: i64,
    },

    #[error("Invalid beneficiary shares: {0}")]
    InvalidShares(String),

    #[error("Too many beneficiaries: {count} (maximum {max})")]
    TooManyBeneficiaries { count: usize, max: usize },

    #[error("Beneficiary listed twice: {0}")]
    DuplicateBeneficiary(Principal),

    #[error("Invalid threshold: {threshold} of {signers} signers")]
    InvalidThreshold { threshold: usize, signers: usize },

    #[error("Invalid number of signers: {count} (must be between {min} and {max})")]
    InvalidSignerCount { count: usize, min: usize, max: usize },

    #[error("Signer listed twice: {0}")]
    DuplicateSigner(Principal),

    #[error("Lock reason must be {min}..={max} bytes, got {len}")]
    InvalidLockReason { len: usize, min: usize, max: usize },

    #[error("Invalid risk settings: {0}")]
    InvalidRiskSettings(String),

    #[error("Recovery fee {fee} is below the minimum {min}")]
    InsufficientRecoveryFee { fee: Amount, min: Amount },

    #[error("Invalid limits: {0}")]
    InvalidLimits(String),

    // Authorization
    #[error("Unauthorized access")]
    Unauthorized,

    #[error("{0} is not a signer of this multisig")]
    NotASigner(Principal),

    #[error("{0} is not the beneficiary at this index")]
    NotAuthorizedBeneficiary(Principal),

    #[error("Verification failed ({remaining} attempts remaining)")]
    InvalidVerification { remaining: u8 },

    // State
    #[error("Estate is locked")]
    EstateLocked,

    #[error("Estate is claimable")]
    EstateClaimable,

    #[error("Estate is already claimable")]
    AlreadyClaimable,

    #[error("Estate is not claimable")]
    NotClaimable,

    #[error("Estate is not yet claimable (deadline {deadline})")]
    NotYetClaimable { deadline: Timestamp },

    #[error("Estate is closed")]
    EstateClosed,

    #[error("Not all beneficiaries have claimed ({claimed} of {total})")]
    NotAllClaimed { claimed: u32, total: usize },

    #[error("Invalid beneficiary index {index} ({count} beneficiaries)")]
    InvalidBeneficiaryIndex { index: usize, count: usize },

    #[error("Inheritance already claimed by {0}")]
    AlreadyClaimed(Principal),

    #[error("Emergency lock already active")]
    LockAlreadyActive,

    #[error("Emergency lock not active")]
    LockNotActive,

    #[error("Multisig already attached to this estate")]
    MultisigAlreadyAttached,

    #[error("No multisig attached to this estate")]
    MultisigNotAttached,

    #[error("Proposal already approved by {0}")]
    AlreadyApproved(Principal),

    #[error("Proposal already executed")]
    ProposalExecuted,

    #[error("Insufficient approvals: {have} of {need}")]
    InsufficientApprovals { have: usize, need: usize },

    #[error("Invalid proposal: {0}")]
    InvalidProposal(String),

    #[error("Trading already enabled for this estate")]
    TradingAlreadyEnabled,

    #[error("Trading not enabled for this estate")]
    TradingNotEnabled,

    #[error("Recovery already initiated for this estate")]
    RecoveryAlreadyInitiated,

    #[error("Recovery already executed")]
    RecoveryAlreadyExecuted,

    // Timing
    #[error("Emergency lock cooldown active until {retry_at}")]
    CooldownActive { retry_at: Timestamp },

    #[error("Too early to unlock, retry at {retry_at}")]
    TooEarly { retry_at: Timestamp },

    #[error("Timelock not expired until {retry_at}")]
    TimelockNotExpired { retry_at: Timestamp },

    #[error("Recovery not yet eligible, retry at {retry_at}")]
    RecoveryTooEarly { retry_at: Timestamp },

    // Exhaustion
    #[error("Maximum unlock attempts exceeded")]
    MaxAttemptsExceeded,

    // Lookups
    #[error("Estate not found: {0}")]
    EstateNotFound(EstateId),

    #[error("Multisig not found: {0}")]
    MultisigNotFound(MultisigId),

    #[error("Proposal not found: {0}")]
    ProposalNotFound(ProposalId),

    #[error("No recovery initiated for {0}")]
    RecoveryNotFound(EstateId),

    // External
    #[error("Custody error: {0}")]
    Custody(#[from] CustodyError),
}

impl EstateError {
    pub fn kind(&self) -> ErrorKind {
        use EstateError::*;
        match self {
            InvalidPeriod { .. }
            | InvalidShares(_)
            | TooManyBeneficiaries { .. }
            | DuplicateBeneficiary(_)
            | InvalidThreshold { .. }
            | InvalidSignerCount { .. }
            | DuplicateSigner(_)
            | InvalidLockReason { .. }
            | InvalidRiskSettings(_)
            | InsufficientRecoveryFee { .. }
            | InvalidLimits(_) => ErrorKind::Validation,

            Unauthorized
            | NotASigner(_)
            | NotAuthorizedBeneficiary(_)
            | InvalidVerification { .. } => ErrorKind::Authorization,

            EstateLocked
            | EstateClaimable
            | AlreadyClaimable
            | NotClaimable
            | NotYetClaimable { .. }
            | EstateClosed
            | NotAllClaimed { .. }
            | InvalidBeneficiaryIndex { .. }
            | AlreadyClaimed(_)
            | LockAlreadyActive
            | LockNotActive
            | MultisigAlreadyAttached
            | MultisigNotAttached
            | AlreadyApproved(_)
            | ProposalExecuted
            | InsufficientApprovals { .. }
            | InvalidProposal(_)
            | TradingAlreadyEnabled
            | TradingNotEnabled
            | RecoveryAlreadyInitiated
            | RecoveryAlreadyExecuted => ErrorKind::State,

            CooldownActive { .. }
            | TooEarly { .. }
            | TimelockNotExpired { .. }
            | RecoveryTooEarly { .. } => ErrorKind::Timing,

            MaxAttemptsExceeded => ErrorKind::Exhaustion,

            EstateNotFound(_) | MultisigNotFound(_) | ProposalNotFound(_) | RecoveryNotFound(_) => {
                ErrorKind::NotFound
            }

            Custody(_) => ErrorKind::External,
        }
    }

    /// When a timing failure can be retried.
    pub fn retry_at(&self) -> Option<Timestamp> {
        match self {
            EstateError::CooldownActive { retry_at }
            | EstateError::TooEarly { retry_at }
            | EstateError::TimelockNotExpired { retry_at }
            | EstateError::RecoveryTooEarly { retry_at } => Some(*retry_at),
            _ => None,
        }
    }
}
