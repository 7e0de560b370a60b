//! Estate registry and the lifecycle state machine.
//!
//! ```text
//! Active ──lock──▶ Active+Locked ──unlock──▶ Active
//!   │
//!   └─trigger (after inactivity + grace)──▶ Claimable ──all claimed──▶ Closed
//!                                              │
//!                                              └─recovery──▶ Active (new owner)
//! ```
//!
//! The registry is the only writer of [`Estate`] and [`ClaimRecord`] fields.
//! The lock manager and recovery module reach estate flags through the
//! crate-private setters below.

use crate::beneficiary::{share_total, validate_beneficiaries, Beneficiary, ClaimRecord};
use crate::clock::Timestamp;
use crate::error::EstateError;
use crate::limits::Limits;
use crate::risk::RiskSettings;
use crate::types::{Amount, ContactHash, EstateId, MultisigId, Principal};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Coarse lifecycle position, derived from the estate's flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EstatePhase {
    Active,
    Locked,
    Claimable,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Estate {
    pub id: EstateId,
    pub owner: Principal,
    pub owner_contact_hash: ContactHash,
    pub created_at: Timestamp,
    pub last_active_at: Timestamp,
    pub inactivity_period_secs: i64,
    pub grace_period_secs: i64,
    /// Emergency lock flag
    pub is_locked: bool,
    /// Dead-man's-switch has fired
    pub is_claimable: bool,
    pub claimable_since: Option<Timestamp>,
    /// Terminal: every beneficiary has claimed
    pub closed: bool,
    pub beneficiaries: Vec<Beneficiary>,
    pub total_claims: u32,
    /// Balance snapshot every share of this generation is computed against
    pub distributable_balance: Option<Amount>,
    pub multisig: Option<MultisigId>,
    pub trading_enabled: bool,
    pub risk_settings: Option<RiskSettings>,
    /// Bumped each time the estate is recovered
    pub generation: u32,
}

impl Estate {
    /// Last instant at which the dead-man's-switch cannot fire yet.
    pub fn inheritance_deadline(&self) -> Timestamp {
        self.last_active_at
            .saturating_add(self.inactivity_period_secs)
            .saturating_add(self.grace_period_secs)
    }

    pub fn phase(&self) -> EstatePhase {
        if self.closed {
            EstatePhase::Closed
        } else if self.is_claimable {
            EstatePhase::Claimable
        } else if self.is_locked {
            EstatePhase::Locked
        } else {
            EstatePhase::Active
        }
    }

    pub fn share_total(&self) -> u32 {
        share_total(&self.beneficiaries)
    }

    fn ensure_owner(&self, caller: &Principal) -> Result<(), EstateError> {
        if &self.owner != caller {
            return Err(EstateError::Unauthorized);
        }
        Ok(())
    }

    /// Owner and governance mutations are only allowed on an active estate.
    fn ensure_mutable(&self) -> Result<(), EstateError> {
        if self.closed {
            return Err(EstateError::EstateClosed);
        }
        if self.is_locked {
            return Err(EstateError::EstateLocked);
        }
        if self.is_claimable {
            return Err(EstateError::EstateClaimable);
        }
        Ok(())
    }

    fn ensure_governed_by(&self, multisig: MultisigId) -> Result<(), EstateError> {
        match self.multisig {
            Some(attached) if attached == multisig => Ok(()),
            Some(_) => Err(EstateError::InvalidProposal(format!(
                "{} is not attached to {}",
                multisig, self.id
            ))),
            None => Err(EstateError::MultisigNotAttached),
        }
    }
}

/// What a validated claim entitles the caller to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimTicket {
    pub estate: EstateId,
    pub index: usize,
    pub share: u8,
    pub generation: u32,
    /// Snapshot already taken by an earlier claim, if any
    pub snapshot: Option<Amount>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EstateRegistry {
    estates: Vec<Estate>,
    claims: BTreeMap<EstateId, Vec<ClaimRecord>>,
}

impl EstateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: EstateId) -> Result<&Estate, EstateError> {
        self.estates
            .get(id.index())
            .ok_or(EstateError::EstateNotFound(id))
    }

    fn get_mut(&mut self, id: EstateId) -> Result<&mut Estate, EstateError> {
        self.estates
            .get_mut(id.index())
            .ok_or(EstateError::EstateNotFound(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Estate> {
        self.estates.iter()
    }

    pub fn len(&self) -> usize {
        self.estates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.estates.is_empty()
    }

    /// Claim record for `beneficiary` in the estate's current generation.
    pub fn claim_record(&self, id: EstateId, beneficiary: &Principal) -> Option<&ClaimRecord> {
        let generation = self.get(id).ok()?.generation;
        self.claims
            .get(&id)?
            .iter()
            .find(|c| c.generation == generation && &c.beneficiary == beneficiary)
    }

    pub fn claim_records(&self, id: EstateId) -> &[ClaimRecord] {
        self.claims.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn create(
        &mut self,
        owner: Principal,
        owner_contact_hash: ContactHash,
        inactivity_period_secs: i64,
        grace_period_secs: i64,
        now: Timestamp,
        limits: &Limits,
    ) -> Result<EstateId, EstateError> {
        limits.check_inactivity(inactivity_period_secs)?;
        limits.check_grace(grace_period_secs)?;

        let id = EstateId::from_index(self.estates.len());
        self.estates.push(Estate {
            id,
            owner,
            owner_contact_hash,
            created_at: now,
            last_active_at: now,
            inactivity_period_secs,
            grace_period_secs,
            is_locked: false,
            is_claimable: false,
            claimable_since: None,
            closed: false,
            beneficiaries: Vec::new(),
            total_claims: 0,
            distributable_balance: None,
            multisig: None,
            trading_enabled: false,
            risk_settings: None,
            generation: 0,
        });
        Ok(id)
    }

    pub(crate) fn check_in(
        &mut self,
        id: EstateId,
        caller: &Principal,
        now: Timestamp,
    ) -> Result<(), EstateError> {
        let estate = self.get_mut(id)?;
        estate.ensure_owner(caller)?;
        estate.ensure_mutable()?;
        estate.last_active_at = now;
        Ok(())
    }

    pub(crate) fn trigger_inheritance(
        &mut self,
        id: EstateId,
        now: Timestamp,
    ) -> Result<(), EstateError> {
        let estate = self.get_mut(id)?;
        if estate.is_claimable || estate.closed {
            return Err(EstateError::AlreadyClaimable);
        }
        if estate.is_locked {
            return Err(EstateError::EstateLocked);
        }
        let deadline = estate.inheritance_deadline();
        if now <= deadline {
            return Err(EstateError::NotYetClaimable { deadline });
        }
        estate.is_claimable = true;
        estate.claimable_since = Some(now);
        Ok(())
    }

    pub(crate) fn update_beneficiaries(
        &mut self,
        id: EstateId,
        caller: &Principal,
        list: Vec<Beneficiary>,
        limits: &Limits,
    ) -> Result<usize, EstateError> {
        let estate = self.get_mut(id)?;
        estate.ensure_owner(caller)?;
        Self::replace_beneficiaries(estate, list, limits)
    }

    pub(crate) fn update_beneficiaries_by_governance(
        &mut self,
        id: EstateId,
        multisig: MultisigId,
        list: Vec<Beneficiary>,
        limits: &Limits,
    ) -> Result<usize, EstateError> {
        let estate = self.get_mut(id)?;
        estate.ensure_governed_by(multisig)?;
        Self::replace_beneficiaries(estate, list, limits)
    }

    /// Validate first, then swap the whole list in one assignment.
    fn replace_beneficiaries(
        estate: &mut Estate,
        list: Vec<Beneficiary>,
        limits: &Limits,
    ) -> Result<usize, EstateError> {
        estate.ensure_mutable()?;
        validate_beneficiaries(&list, limits.max_beneficiaries)?;
        let count = list.len();
        estate.beneficiaries = list;
        Ok(count)
    }

    /// Every check a claim must pass before custody is consulted.
    ///
    /// An emergency lock does not hold up claims once the estate is
    /// claimable.
    pub(crate) fn prepare_claim(
        &self,
        id: EstateId,
        index: usize,
        caller: &Principal,
    ) -> Result<ClaimTicket, EstateError> {
        let estate = self.get(id)?;
        if !estate.is_claimable {
            return Err(EstateError::NotClaimable);
        }
        let beneficiary =
            estate
                .beneficiaries
                .get(index)
                .ok_or(EstateError::InvalidBeneficiaryIndex {
                    index,
                    count: estate.beneficiaries.len(),
                })?;
        if &beneficiary.wallet != caller {
            return Err(EstateError::NotAuthorizedBeneficiary(caller.clone()));
        }
        if self
            .claim_record(id, caller)
            .is_some_and(|record| record.claimed)
        {
            return Err(EstateError::AlreadyClaimed(caller.clone()));
        }
        Ok(ClaimTicket {
            estate: id,
            index,
            share: beneficiary.share,
            generation: estate.generation,
            snapshot: estate.distributable_balance,
        })
    }

    pub(crate) fn record_claim(
        &mut self,
        ticket: ClaimTicket,
        beneficiary: &Principal,
        snapshot: Amount,
        amount: Amount,
        now: Timestamp,
    ) -> Result<ClaimRecord, EstateError> {
        let estate = self.get_mut(ticket.estate)?;
        estate.distributable_balance.get_or_insert(snapshot);
        estate.total_claims += 1;

        let record = ClaimRecord {
            estate: ticket.estate,
            beneficiary: beneficiary.clone(),
            generation: ticket.generation,
            share_percentage: ticket.share,
            amount,
            claim_time: now,
            claimed: true,
        };
        self.claims
            .entry(ticket.estate)
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    pub(crate) fn close(&mut self, id: EstateId) -> Result<(), EstateError> {
        let estate = self.get_mut(id)?;
        if estate.closed {
            return Err(EstateError::EstateClosed);
        }
        if !estate.is_claimable {
            return Err(EstateError::NotClaimable);
        }
        if (estate.total_claims as usize) < estate.beneficiaries.len() {
            return Err(EstateError::NotAllClaimed {
                claimed: estate.total_claims,
                total: estate.beneficiaries.len(),
            });
        }
        estate.closed = true;
        Ok(())
    }

    pub(crate) fn attach_multisig(
        &mut self,
        id: EstateId,
        caller: &Principal,
        multisig: MultisigId,
    ) -> Result<(), EstateError> {
        let estate = self.get_mut(id)?;
        estate.ensure_owner(caller)?;
        estate.ensure_mutable()?;
        if estate.multisig.is_some() {
            return Err(EstateError::MultisigAlreadyAttached);
        }
        estate.multisig = Some(multisig);
        Ok(())
    }

    pub(crate) fn set_locked(&mut self, id: EstateId, locked: bool) -> Result<(), EstateError> {
        self.get_mut(id)?.is_locked = locked;
        Ok(())
    }

    pub(crate) fn enable_trading(
        &mut self,
        id: EstateId,
        multisig: MultisigId,
        settings: RiskSettings,
    ) -> Result<(), EstateError> {
        let estate = self.get_mut(id)?;
        estate.ensure_governed_by(multisig)?;
        estate.ensure_mutable()?;
        if estate.trading_enabled {
            return Err(EstateError::TradingAlreadyEnabled);
        }
        settings.validate()?;
        estate.trading_enabled = true;
        estate.risk_settings = Some(settings);
        Ok(())
    }

    pub(crate) fn disable_trading(
        &mut self,
        id: EstateId,
        multisig: MultisigId,
    ) -> Result<(), EstateError> {
        let estate = self.get_mut(id)?;
        estate.ensure_governed_by(multisig)?;
        if estate.closed {
            return Err(EstateError::EstateClosed);
        }
        if !estate.trading_enabled {
            return Err(EstateError::TradingNotEnabled);
        }
        estate.trading_enabled = false;
        Ok(())
    }

    /// Hand the estate to `new_owner` and restart its lifecycle.
    /// Returns the previous owner.
    pub(crate) fn recover(
        &mut self,
        id: EstateId,
        new_owner: Principal,
        now: Timestamp,
    ) -> Result<Principal, EstateError> {
        let estate = self.get_mut(id)?;
        if estate.closed {
            return Err(EstateError::EstateClosed);
        }
        let previous = std::mem::replace(&mut estate.owner, new_owner);
        estate.is_claimable = false;
        estate.is_locked = false;
        estate.claimable_since = None;
        estate.last_active_at = now;
        estate.beneficiaries.clear();
        estate.total_claims = 0;
        estate.distributable_balance = None;
        estate.trading_enabled = false;
        estate.generation += 1;
        Ok(previous)
    }
}
