//! Acceleration-factor trailing-stop flip on Parabolic SAR direction.

use super::{flip_signal, CausalContext, Signal, Stance, Strategy};
use crate::indicators::{Indicator, ParabolicSar, SarOutput, Trend};

#[derive(Debug, Clone)]
pub struct ParabolicSarFlip {
    pub af_start: f64,
    pub af_step: f64,
    pub af_max: f64,
    direction_key: String,
}

impl ParabolicSarFlip {
    pub fn new(af_start: f64, af_step: f64, af_max: f64) -> Self {
        let direction = ParabolicSar::new(af_start, af_step, af_max, SarOutput::Direction);
        Self {
            af_start,
            af_step,
            af_max,
            direction_key: direction.name().to_string(),
        }
    }

    pub fn direction_key(&self) -> &str {
        &self.direction_key
    }
}

impl Strategy for ParabolicSarFlip {
    fn name(&self) -> &str {
        "psar_flip"
    }

    fn warmup(&self) -> usize {
        2
    }

    fn indicators(&self) -> Vec<Box<dyn Indicator>> {
        vec![
            Box::new(ParabolicSar::new(
                self.af_start,
                self.af_step,
                self.af_max,
                SarOutput::Direction,
            )),
            Box::new(ParabolicSar::new(
                self.af_start,
                self.af_step,
                self.af_max,
                SarOutput::Level,
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
