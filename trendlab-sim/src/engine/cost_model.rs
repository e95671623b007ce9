//! Execution friction: slippage against the fill price, fees on notional.
//!
//! Slippage is directional: buys fill higher, sells fill lower. Fees are
//! charged per side in basis points of the slipped notional.

use serde::{Deserialize, Serialize};

use crate::domain::Side;
use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CostModel {
    /// Fee per fill, basis points of notional.
    #[serde(default)]
    pub fee_bps: f64,
    /// Adverse price adjustment per fill, basis points of the reference price.
    #[serde(default)]
    pub slippage_bps: f64,
}

impl CostModel {
    pub fn new(fee_bps: f64, slippage_bps: f64) -> Self {
        Self {
            fee_bps,
            slippage_bps,
        }
    }

    pub fn frictionless() -> Self {
        Self::new(0.0, 0.0)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, bps) in [("fee_bps", self.fee_bps), ("slippage_bps", self.slippage_bps)] {
            if !bps.is_finite() || !(0.0..10_000.0).contains(&bps) {
                return Err(ConfigError::CostModel(format!(
                    "{name} = {bps} must be finite and in [0, 10000)"
                )));
            }
        }
        Ok(())
    }

    /// Price after slippage.
    pub fn fill_price(&self, reference: f64, side: Side) -> f64 {
        if self.slippage_bps == 0.0 {
            return reference;
        }
        let slip = self.slippage_bps / 10_000.0;
        match side {
            Side::Buy => reference * (1.0 + slip),
            Side::Sell => reference * (1.0 - slip),
        }
    }

    pub fn fee(&self, price: f64, quantity: f64) -> f64 {
        price * quantity * self.fee_rate()
    }

    pub fn fee_rate(&self) -> f64 {
        self.fee_bps / 10_000.0
    }
}
