//! Beneficiary ledger: who inherits, in what proportion, and who has
//! already claimed.

use crate::clock::Timestamp;
use crate::error::EstateError;
use crate::types::{Amount, ContactHash, EstateId, Principal};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Shares are whole percentage points and must total this.
pub const SHARE_TOTAL: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Beneficiary {
    /// Identity that may claim this slot
    pub wallet: Principal,
    /// Percentage points of the distributable balance
    pub share: u8,
    /// Free-form label, e.g. "daughter"
    pub description: String,
    /// Hash of the beneficiary's private contact
    pub contact_hash: ContactHash,
}

impl Beneficiary {
    pub fn new(
        wallet: impl Into<String>,
        share: u8,
        description: impl Into<String>,
        contact: &str,
    ) -> Self {
        Self {
            wallet: Principal::new(wallet),
            share,
            description: description.into(),
            contact_hash: ContactHash::digest(contact),
        }
    }
}

/// Check a replacement beneficiary list in isolation.
///
/// The list must be non-empty, at most `max` long, name each wallet once,
/// give every entry a positive share, and total exactly [`SHARE_TOTAL`].
pub fn validate_beneficiaries(list: &[Beneficiary], max: usize) -> Result<(), EstateError> {
    if list.len() > max {
        return Err(EstateError::TooManyBeneficiaries {
            count: list.len(),
            max,
        });
    }
    if list.is_empty() {
        return Err(EstateError::InvalidShares(
            "at least one beneficiary is required".into(),
        ));
    }

    let mut seen = BTreeSet::new();
    for b in list {
        if !seen.insert(&b.wallet) {
            return Err(EstateError::DuplicateBeneficiary(b.wallet.clone()));
        }
        if b.share == 0 {
            return Err(EstateError::InvalidShares(format!(
                "{} has a zero share",
                b.wallet
            )));
        }
    }

    let total = share_total(list);
    if total != SHARE_TOTAL {
        return Err(EstateError::InvalidShares(format!(
            "shares sum to {}, expected {}",
            total, SHARE_TOTAL
        )));
    }
    Ok(())
}

/// Sum of shares, widened so it cannot overflow.
pub fn share_total(list: &[Beneficiary]) -> u32 {
    list.iter().map(|b| b.share as u32).sum()
}

/// `share` percent of `balance`, rounded down.
pub fn share_of(balance: Amount, share: u8) -> Amount {
    (balance as u128 * share as u128 / SHARE_TOTAL as u128) as Amount
}

/// One per (estate, generation, beneficiary). Never removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRecord {
    pub estate: EstateId,
    pub beneficiary: Principal,
    /// Estate generation the claim belongs to; bumped by recovery
    pub generation: u32,
    pub share_percentage: u8,
    pub amount: Amount,
    pub claim_time: Timestamp,
    pub claimed: bool,
}
