//! Simulation engine: a Flat/Long state machine over one bar series.
//!
//! Per bar, in order:
//! 1. execute an order carried from the previous bar at this bar's open
//! 2. evaluate the strategy on the causal view ending at this bar
//! 3. under the same-close convention, fill the new order at this close;
//!    under next-open, carry it (an order from the final bar never fills)
//! 4. on the final bar, optionally force-close at the close
//! 5. mark equity at the close
//!
//! All state lives on the stack of one call. Nothing depends on wall-clock
//! time or unordered iteration, so identical inputs give identical output.

mod cost_model;
mod ledger;
mod run;

pub use cost_model::CostModel;
pub use run::{run_strategy, simulate};

use serde::{Deserialize, Serialize};

use crate::domain::{EquityPoint, Fill, Position, Trade};
use crate::error::ConfigError;
use crate::strategy::MAX_PERIOD;

/// Which price a signal on bar `i` fills at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillConvention {
    /// Open of bar `i + 1`.
    #[default]
    NextBarOpen,
    /// Close of bar `i`.
    SignalBarClose,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PositionSizing {
    /// Spend this fraction of cash, fee included.
    FractionOfEquity { fraction: f64 },
    /// Buy this many units, fewer if cash does not cover it.
    FixedQuantity { quantity: f64 },
    /// Buy so that one ATR move against the position costs `risk_fraction`
    /// of cash: `risk_fraction * cash / atr`, capped by what cash covers.
    /// ATR is read at the signal bar; an undefined ATR skips the entry.
    Volatility { atr_period: usize, risk_fraction: f64 },
}

impl PositionSizing {
    /// ATR period the engine has to compute for this sizing, if any.
    pub fn atr_period(&self) -> Option<usize> {
        match *self {
            PositionSizing::Volatility { atr_period, .. } => Some(atr_period),
            _ => None,
        }
    }
}

impl Default for PositionSizing {
    fn default() -> Self {
        PositionSizing::FractionOfEquity { fraction: 1.0 }
    }
}

/// Everything besides bars and strategy that determines a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub initial_cash: f64,
    pub cost_model: CostModel,
    pub fill_convention: FillConvention,
    /// Close an open position at the final bar's close.
    pub force_close_at_end: bool,
    pub sizing: PositionSizing,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            initial_cash: 100_000.0,
            cost_model: CostModel::default(),
            fill_convention: FillConvention::default(),
            force_close_at_end: true,
            sizing: PositionSizing::default(),
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.initial_cash.is_finite() || self.initial_cash <= 0.0 {
            return Err(ConfigError::Simulation(format!(
                "initial_cash = {} must be finite and > 0",
                self.initial_cash
            )));
        }
        self.cost_model.validate()?;
        match self.sizing {
            PositionSizing::FractionOfEquity { fraction } => {
                if !(fraction > 0.0 && fraction <= 1.0) {
                    return Err(ConfigError::Simulation(format!(
                        "sizing fraction = {fraction} must be in (0, 1]"
                    )));
                }
            }
            PositionSizing::FixedQuantity { quantity } => {
                if !quantity.is_finite() || quantity <= 0.0 {
                    return Err(ConfigError::Simulation(format!(
                        "sizing quantity = {quantity} must be finite and > 0"
                    )));
                }
            }
            PositionSizing::Volatility {
                atr_period,
                risk_fraction,
            } => {
                if atr_period == 0 || atr_period > MAX_PERIOD {
                    return Err(ConfigError::Simulation(format!(
                        "sizing atr_period = {atr_period} must be in [1, {MAX_PERIOD}]"
                    )));
                }
                if !(risk_fraction > 0.0 && risk_fraction <= 1.0) {
                    return Err(ConfigError::Simulation(format!(
                        "sizing risk_fraction = {risk_fraction} must be in (0, 1]"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Ledger and curve of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutput {
    pub symbol: String,
    pub strategy: String,
    pub trades: Vec<Trade>,
    pub fills: Vec<Fill>,
    /// Exactly one point per bar.
    pub equity: Vec<EquityPoint>,
    /// Set when the series ended long without a forced close.
    pub open_position: Option<Position>,
}

impl SimulationOutput {
    pub fn equity_values(&self) -> Vec<f64> {
        self.equity.iter().map(|p| p.equity).collect()
    }

    pub fn final_equity(&self) -> Option<f64> {
        self.equity.last().map(|p| p.equity)
    }

    /// Fraction of bars with a non-zero position.
    pub fn exposure(&self) -> f64 {
        if self.equity.is_empty() {
            return 0.0;
        }
        let held = self.equity.iter().filter(|p| p.position_qty > 0.0).count();
        held as f64 / self.equity.len() as f64
    }
}
