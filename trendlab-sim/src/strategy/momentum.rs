//! Momentum threshold over a lookback.
//!
//! Long while the `lookback`-bar rate of change is above `entry_threshold`,
//! flat once it falls below `exit_threshold`. Between the two thresholds the
//! rule abstains, which gives the band its hysteresis.

use super::{signal_from_stance, CausalContext, Signal, Stance, Strategy};
use crate::indicators::{Indicator, Roc};

#[derive(Debug, Clone)]
pub struct MomentumThreshold {
    pub lookback: usize,
    pub entry_threshold: f64,
    pub exit_threshold: f64,
    roc_key: String,
}

impl MomentumThreshold {
    pub fn new(lookback: usize, entry_threshold: f64, exit_threshold: f64) -> Self {
        assert!(lookback >= 1, "lookback must be >= 1");
        assert!(
            exit_threshold <= entry_threshold,
            "exit_threshold must be <= entry_threshold"
        );
        Self {
            lookback,
            entry_threshold,
            exit_threshold,
            roc_key: Roc::new(lookback).name().to_string(),
        }
    }

    pub fn roc_key(&self) -> &str {
        &self.roc_key
    }
}

impl Strategy for MomentumThreshold {
    fn name(&self) -> &str {
        "momentum"
    }

    fn warmup(&self) -> usize {
        self.lookback
    }

    fn indicators(&self) -> Vec<Box<dyn Indicator>> {
        vec![Box::new(Roc::new(self.lookback))]
    }

    fn stance(&self, ctx: &CausalContext<'_>) -> Option<Stance> {
        let roc = ctx.value(&self.roc_key)?;
        if roc > self.entry_threshold {
            Some(Stance::Long)
        } else if roc < self.exit_threshold {
            Some(Stance::Flat)
        } else {
            None
        }
    }

    fn evaluate(&self, ctx: &CausalContext<'_>) -> Signal {
        signal_from_stance(self.stance(ctx))
    }
}
