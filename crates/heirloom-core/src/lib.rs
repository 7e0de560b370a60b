//! Heirloom Core
//!
//! Custody of a digital estate: an owner-controlled account that becomes
//! claimable by designated beneficiaries after a period of owner inactivity,
//! and that can be locked, unlocked or recovered through threshold
//! governance.
//!
//! # Concepts
//!
//! - **Dead-man's-switch**: the owner checks in; once
//!   `inactivity + grace` passes without one, anyone may trigger inheritance
//! - **Claims**: each beneficiary claims its percentage of the estate once
//! - **Emergency lock**: freezes the estate; the owner unlocks with a seed
//!   whose commitment was stored at lock time
//! - **Multisig**: named signers approve proposals that lock, unlock, change
//!   beneficiaries or toggle trading on estates they govern
//! - **Recovery**: a fee-gated, timelocked reassignment of an estate nobody
//!   claimed
//!
//! # Example
//!
//! ```ignore
//! use heirloom_core::{Beneficiary, ContactHash, Custodian, InMemoryCustody, Limits, NoStrategy,
//!     Principal, SystemClock, DAY_SECS};
//!
//! let mut custodian = Custodian::new(SystemClock::new(), InMemoryCustody::new(), NoStrategy,
//!     Limits::default())?;
//! let owner = Principal::new("owner");
//! let estate = custodian.create_estate(&owner, 180 * DAY_SECS, 30 * DAY_SECS,
//!     ContactHash::digest("owner@example.com"))?;
//! custodian.update_beneficiaries(&owner, estate, vec![
//!     Beneficiary::new("alice", 60, "daughter", "alice@example.com"),
//!     Beneficiary::new("bob", 40, "son", "bob@example.com"),
//! ])?;
//! ```

pub mod beneficiary;
pub mod clock;
pub mod custodian;
pub mod emergency;
pub mod error;
pub mod events;
pub mod external;
pub mod heartbeat;
pub mod limits;
pub mod multisig;
pub mod recovery;
pub mod registry;
pub mod risk;
pub mod types;

pub use beneficiary::{Beneficiary, ClaimRecord, SHARE_TOTAL};
pub use clock::{Clock, ManualClock, SystemClock, Timestamp, DAY_SECS};
pub use custodian::{Custodian, CustodyState};
pub use emergency::{generate_verification_seed, EmergencyLockState, LockType, Unlocked};
pub use error::{ErrorKind, EstateError};
pub use events::{AuditAction, AuditEvent};
pub use external::{
    AssetCustody, CustodyError, InMemoryCustody, NoStrategy, Payout, StrategyExecutor,
};
pub use heartbeat::{HeartbeatAction, HeartbeatConfig, HeartbeatStatus};
pub use limits::Limits;
pub use multisig::{Multisig, Proposal, ProposalAction};
pub use recovery::Recovery;
pub use registry::{Estate, EstatePhase};
pub use risk::RiskSettings;
pub use types::{Amount, ContactHash, EstateId, MultisigId, Principal, ProposalId, RecoveryId};
