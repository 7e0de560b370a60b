//! Trading risk parameters attached to an estate.
//!
//! The core only stores and validates these; enforcement belongs to the
//! external strategy executor.

use crate::error::EstateError;
use serde::{Deserialize, Serialize};

/// 100% in basis points
pub const BPS_DENOMINATOR: u16 = 10_000;

const MAX_OPEN_POSITIONS: u8 = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskSettings {
    pub max_drawdown_bps: u16,
    pub max_daily_loss_bps: u16,
    pub max_position_size_bps: u16,
    pub max_open_positions: u8,
    pub stop_loss_bps: Option<u16>,
    pub take_profit_bps: Option<u16>,
}

impl RiskSettings {
    pub fn conservative() -> Self {
        Self {
            max_drawdown_bps: 2000,
            max_daily_loss_bps: 500,
            max_position_size_bps: 3000,
            max_open_positions: 3,
            stop_loss_bps: Some(500),
            take_profit_bps: Some(1500),
        }
    }

    pub fn balanced() -> Self {
        Self {
            max_drawdown_bps: 3000,
            max_daily_loss_bps: 1000,
            max_position_size_bps: 4000,
            max_open_positions: 5,
            stop_loss_bps: Some(1000),
            take_profit_bps: Some(3000),
        }
    }

    pub fn aggressive() -> Self {
        Self {
            max_drawdown_bps: 5000,
            max_daily_loss_bps: 2000,
            max_position_size_bps: 6000,
            max_open_positions: 10,
            stop_loss_bps: Some(2000),
            take_profit_bps: None,
        }
    }

    pub fn validate(&self) -> Result<(), EstateError> {
        let fields = [
            ("max_drawdown_bps", Some(self.max_drawdown_bps)),
            ("max_daily_loss_bps", Some(self.max_daily_loss_bps)),
            ("max_position_size_bps", Some(self.max_position_size_bps)),
            ("stop_loss_bps", self.stop_loss_bps),
            ("take_profit_bps", self.take_profit_bps),
        ];
        for (name, value) in fields {
            if let Some(bps) = value {
                if bps > BPS_DENOMINATOR {
                    return Err(EstateError::InvalidRiskSettings(format!(
                        "{} = {} exceeds {}",
                        name, bps, BPS_DENOMINATOR
                    )));
                }
            }
        }
        if self.max_open_positions == 0 || self.max_open_positions > MAX_OPEN_POSITIONS {
            return Err(EstateError::InvalidRiskSettings(format!(
                "max_open_positions must be 1..={}",
                MAX_OPEN_POSITIONS
            )));
        }
        Ok(())
    }
}

impl Default for RiskSettings {
    fn default() -> Self {
        Self::conservative()
    }
}
