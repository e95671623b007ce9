//! Moving-average crossover: enter on a golden cross, exit on a death cross.
//!
//! Reads `{ma_type}_{fast}` and `{ma_type}_{slow}`, e.g. `sma_10` / `sma_50`.

use serde::{Deserialize, Serialize};

use super::{CausalContext, Stance, Strategy};
use crate::indicators::{Ema, Indicator, Sma};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaType {
    #[default]
    Sma,
    Ema,
}

impl MaType {
    pub fn prefix(&self) -> &'static str {
        match self {
            MaType::Sma => "sma",
            MaType::Ema => "ema",
        }
    }

    pub(crate) fn indicator(&self, period: usize) -> Box<dyn Indicator> {
        match self {
            MaType::Sma => Box::new(Sma::new(period)),
            MaType::Ema => Box::new(Ema::new(period)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MaCrossover {
    pub fast: usize,
    pub slow: usize,
    pub ma_type: MaType,
    fast_key: String,
    slow_key: String,
}

impl MaCrossover {
    pub fn new(fast: usize, slow: usize, ma_type: MaType) -> Self {
        assert!(fast >= 1, "fast period must be >= 1");
        assert!(slow > fast, "slow period must be > fast period");
        Self {
            fast,
            slow,
            ma_type,
            fast_key: ma_type.indicator(fast).name().to_string(),
            slow_key: ma_type.indicator(slow).name().to_string(),
        }
    }

    pub fn fast_key(&self) -> &str {
        &self.fast_key
    }

    pub fn slow_key(&self) -> &str {
        &self.slow_key
    }
}

impl Strategy for MaCrossover {
    fn name(&self) -> &str {
        "ma_crossover"
    }

    fn warmup(&self) -> usize {
        self.slow
    }

    fn indicators(&self) -> Vec<Box<dyn Indicator>> {
        vec![self.ma_type.indicator(self.fast), self.ma_type.indicator(self.slow)]
    }

    fn stance(&self, ctx: &CausalContext<'_>) -> Option<Stance> {
        let fast = ctx.value(&self.fast_key)?;
        let slow = ctx.value(&self.slow_key)?;
        Some(if fast > slow { Stance::Long } else { Stance::Flat })
    }
}
