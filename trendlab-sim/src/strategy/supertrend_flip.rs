//! Volatility trailing-stop flip on Supertrend direction.

use super::{flip_signal, CausalContext, Signal, Stance, Strategy};
use crate::indicators::{Indicator, Supertrend, SupertrendOutput, Trend};

#[derive(Debug, Clone)]
pub struct SupertrendFlip {
    pub atr_period: usize,
    pub multiplier: f64,
    direction_key: String,
}

impl SupertrendFlip {
    pub fn new(atr_period: usize, multiplier: f64) -> Self {
        let direction = Supertrend::new(atr_period, multiplier, SupertrendOutput::Direction);
        Self {
            atr_period,
            multiplier,
            direction_key: direction.name().to_string(),
        }
    }

    pub fn direction_key(&self) -> &str {
        &self.direction_key
    }
}

impl Strategy for SupertrendFlip {
    fn name(&self) -> &str {
        "supertrend_flip"
    }

    fn warmup(&self) -> usize {
        self.atr_period.saturating_add(1)
    }

    fn indicators(&self) -> Vec<Box<dyn Indicator>> {
        vec![
            Box::new(Supertrend::new(
                self.atr_period,
                self.multiplier,
                SupertrendOutput::Direction,
            )),
            Box::new(Supertrend::new(
                self.atr_period,
                self.multiplier,
                SupertrendOutput::Level,
            )),
        ]
    }

    fn stance(&self, ctx: &CausalContext<'_>) -> Option<Stance> {
        match Trend::from_sign(ctx.value(&self.direction_key)?)? {
            Trend::Up => Some(Stance::Long),
            Trend::Down => Some(Stance::Flat),
        }
    }

    fn evaluate(&self, ctx: &CausalContext<'_>) -> Signal {
        flip_signal(self, ctx)
    }
}
