//! Multisig governance engine.
//!
//! Named signers raise proposals against an estate; once `threshold`
//! distinct signers have approved, anyone may execute. The engine only
//! tracks proposals and approvals. The privileged effect of an executed
//! proposal is applied by the component that owns the affected state.

use crate::beneficiary::Beneficiary;
use crate::clock::Timestamp;
use crate::error::EstateError;
use crate::limits::Limits;
use crate::risk::RiskSettings;
use crate::types::{EstateId, MultisigId, Principal, ProposalId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Multisig {
    pub id: MultisigId,
    pub signers: Vec<Principal>,
    pub threshold: usize,
    pub proposal_count: u64,
    pub created_by: Principal,
    pub created_at: Timestamp,
}

impl Multisig {
    pub fn is_signer(&self, who: &Principal) -> bool {
        self.signers.contains(who)
    }
}

/// What an executed proposal does to its target estate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProposalAction {
    EmergencyLock { reason: String },
    EmergencyUnlock,
    ForceUnlock,
    UpdateBeneficiaries { beneficiaries: Vec<Beneficiary> },
    EnableTrading { risk_settings: RiskSettings },
    DisableTrading,
}

impl ProposalAction {
    pub fn name(&self) -> &'static str {
        match self {
            ProposalAction::EmergencyLock { .. } => "emergency_lock",
            ProposalAction::EmergencyUnlock => "emergency_unlock",
            ProposalAction::ForceUnlock => "force_unlock",
            ProposalAction::UpdateBeneficiaries { .. } => "update_beneficiaries",
            ProposalAction::EnableTrading { .. } => "enable_trading",
            ProposalAction::DisableTrading => "disable_trading",
        }
    }

    /// Unlock proposals authorize a later `force_unlock` instead of acting
    /// on execution.
    pub fn is_unlock(&self) -> bool {
        matches!(
            self,
            ProposalAction::EmergencyUnlock | ProposalAction::ForceUnlock
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub multisig: MultisigId,
    pub proposer: Principal,
    pub target_estate: EstateId,
    pub action: ProposalAction,
    /// Distinct approving signers, proposer first
    pub approvals: Vec<Principal>,
    pub executed: bool,
    pub created_at: Timestamp,
    pub executed_at: Option<Timestamp>,
}

impl Proposal {
    pub fn has_approved(&self, who: &Principal) -> bool {
        self.approvals.contains(who)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MultisigEngine {
    multisigs: Vec<Multisig>,
    proposals: Vec<Proposal>,
}

impl MultisigEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn multisig(&self, id: MultisigId) -> Result<&Multisig, EstateError> {
        self.multisigs
            .get(id.index())
            .ok_or(EstateError::MultisigNotFound(id))
    }

    pub fn proposal(&self, id: ProposalId) -> Result<&Proposal, EstateError> {
        self.proposals
            .get(id.index())
            .ok_or(EstateError::ProposalNotFound(id))
    }

    pub fn proposals(&self) -> impl Iterator<Item = &Proposal> {
        self.proposals.iter()
    }

    /// Proposals of `multisig` still waiting for approvals or execution.
    pub fn pending(&self, multisig: MultisigId) -> impl Iterator<Item = &Proposal> {
        self.proposals
            .iter()
            .filter(move |p| p.multisig == multisig && !p.executed)
    }

    pub(crate) fn initialize(
        &mut self,
        creator: &Principal,
        signers: Vec<Principal>,
        threshold: usize,
        now: Timestamp,
        limits: &Limits,
    ) -> Result<MultisigId, EstateError> {
        if signers.len() < limits.min_signers || signers.len() > limits.max_signers {
            return Err(EstateError::InvalidSignerCount {
                count: signers.len(),
                min: limits.min_signers,
                max: limits.max_signers,
            });
        }
        let mut seen = BTreeSet::new();
        for signer in &signers {
            if !seen.insert(signer) {
                return Err(EstateError::DuplicateSigner(signer.clone()));
            }
        }
        if threshold <= 1 || threshold > signers.len() {
            return Err(EstateError::InvalidThreshold {
                threshold,
                signers: signers.len(),
            });
        }

        let id = MultisigId::from_index(self.multisigs.len());
        self.multisigs.push(Multisig {
            id,
            signers,
            threshold,
            proposal_count: 0,
            created_by: creator.clone(),
            created_at: now,
        });
        Ok(id)
    }

    /// Record a new proposal with the proposer's approval already counted.
    /// The caller has checked that the target estate is governed by
    /// `multisig`.
    pub(crate) fn create_proposal(
        &mut self,
        multisig: MultisigId,
        proposer: &Principal,
        target_estate: EstateId,
        action: ProposalAction,
        now: Timestamp,
    ) -> Result<ProposalId, EstateError> {
        let group = self
            .multisigs
            .get_mut(multisig.index())
            .ok_or(EstateError::MultisigNotFound(multisig))?;
        if !group.is_signer(proposer) {
            return Err(EstateError::NotASigner(proposer.clone()));
        }
        group.proposal_count += 1;

        let id = ProposalId::from_index(self.proposals.len());
        self.proposals.push(Proposal {
            id,
            multisig,
            proposer: proposer.clone(),
            target_estate,
            action,
            approvals: vec![proposer.clone()],
            executed: false,
            created_at: now,
            executed_at: None,
        });
        Ok(id)
    }

    /// Returns the approval count after this approval.
    pub(crate) fn approve(
        &mut self,
        id: ProposalId,
        signer: &Principal,
    ) -> Result<usize, EstateError> {
        let proposal = self
            .proposals
            .get_mut(id.index())
            .ok_or(EstateError::ProposalNotFound(id))?;
        let group = self
            .multisigs
            .get(proposal.multisig.index())
            .ok_or(EstateError::MultisigNotFound(proposal.multisig))?;

        if !group.is_signer(signer) {
            return Err(EstateError::NotASigner(signer.clone()));
        }
        if proposal.executed {
            return Err(EstateError::ProposalExecuted);
        }
        if proposal.has_approved(signer) {
            return Err(EstateError::AlreadyApproved(signer.clone()));
        }
        proposal.approvals.push(signer.clone());
        Ok(proposal.approvals.len())
    }

    /// The proposal, if it may be executed now.
    pub(crate) fn executable(&self, id: ProposalId) -> Result<&Proposal, EstateError> {
        let proposal = self.proposal(id)?;
        if proposal.executed {
            return Err(EstateError::ProposalExecuted);
        }
        let need = self.multisig(proposal.multisig)?.threshold;
        let have = proposal.approvals.len();
        if have < need {
            return Err(EstateError::InsufficientApprovals { have, need });
        }
        Ok(proposal)
    }

    /// Flip `executed`. Only called after the action was applied.
    pub(crate) fn mark_executed(
        &mut self,
        id: ProposalId,
        now: Timestamp,
    ) -> Result<&Proposal, EstateError> {
        let proposal = self
            .proposals
            .get_mut(id.index())
            .ok_or(EstateError::ProposalNotFound(id))?;
        if proposal.executed {
            return Err(EstateError::ProposalExecuted);
        }
        proposal.executed = true;
        proposal.executed_at = Some(now);
        Ok(&*proposal)
    }
}
