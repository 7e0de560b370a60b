//! Interfaces to the collaborators this core drives but does not own:
//! asset custody (balances and payouts) and the trading strategy executor.

use crate::risk::RiskSettings;
use crate::types::{Amount, EstateId, Principal};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CustodyError {
    #[error("Insufficient funds in {estate}: requested {requested}, available {available}")]
    InsufficientFunds {
        estate: EstateId,
        requested: Amount,
        available: Amount,
    },

    #[error("Custody service unavailable: {0}")]
    Unavailable(String),
}

/// Holds the estate's assets. Consulted only after a claim has passed every
/// check in the core.
pub trait AssetCustody {
    fn estate_balance(&self, estate: EstateId) -> Result<Amount, CustodyError>;

    fn payout(
        &mut self,
        estate: EstateId,
        beneficiary: &Principal,
        amount: Amount,
    ) -> Result<(), CustodyError>;
}

/// Receives pause/resume signals. Trading logic lives entirely outside the
/// core.
pub trait StrategyExecutor {
    fn pause(&mut self, estate: EstateId);

    fn resume(&mut self, estate: EstateId, settings: &RiskSettings);
}

/// Strategy executor for deployments without trading.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoStrategy;

impl StrategyExecutor for NoStrategy {
    fn pause(&mut self, estate: EstateId) {
        log::debug!("No strategy executor; ignoring pause for {}", estate);
    }

    fn resume(&mut self, estate: EstateId, _settings: &RiskSettings) {
        log::debug!("No strategy executor; ignoring resume for {}", estate);
    }
}

/// A completed payout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payout {
    pub estate: EstateId,
    pub beneficiary: Principal,
    pub amount: Amount,
}

/// Balance book kept in memory. Useful for embedding and tests.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCustody {
    balances: HashMap<EstateId, Amount>,
    payouts: Vec<Payout>,
}

impl InMemoryCustody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deposit(&mut self, estate: EstateId, amount: Amount) {
        let balance = self.balances.entry(estate).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    pub fn payouts(&self) -> &[Payout] {
        &self.payouts
    }
}

impl AssetCustody for InMemoryCustody {
    fn estate_balance(&self, estate: EstateId) -> Result<Amount, CustodyError> {
        Ok(self.balances.get(&estate).copied().unwrap_or(0))
    }

    fn payout(
        &mut self,
        estate: EstateId,
        beneficiary: &Principal,
        amount: Amount,
    ) -> Result<(), CustodyError> {
        let balance = self.balances.entry(estate).or_insert(0);
        if *balance < amount {
            return Err(CustodyError::InsufficientFunds {
                estate,
                requested: amount,
                available: *balance,
            });
        }
        *balance -= amount;
        self.payouts.push(Payout {
            estate,
            beneficiary: beneficiary.clone(),
            amount,
        });
        Ok(())
    }
}
