//! Scripted signals at fixed bar indices.
//!
//! Used to drive the engine with known entries and exits in tests and
//! regression fixtures. Carries no indicators and abstains from votes.

use std::collections::BTreeSet;

use super::{CausalContext, Signal, Stance, Strategy};
use crate::indicators::Indicator;

#[derive(Debug, Clone, Default)]
pub struct FixedSchedule {
    entries: BTreeSet<usize>,
    exits: BTreeSet<usize>,
}

impl FixedSchedule {
    pub fn new(entries: impl IntoIterator<Item = usize>, exits: impl IntoIterator<Item = usize>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
            exits: exits.into_iter().collect(),
        }
    }

    /// One entry and one exit.
    pub fn round_trip(entry: usize, exit: usize) -> Self {
        Self::new([entry], [exit])
    }
}

impl Strategy for FixedSchedule {
    fn name(&self) -> &str {
        "fixed_schedule"
    }

    fn warmup(&self) -> usize {
        0
    }

    fn indicators(&self) -> Vec<Box<dyn Indicator>> {
        Vec::new()
    }

    fn stance(&self, _ctx: &CausalContext<'_>) -> Option<Stance> {
        None
    }

    fn evaluate(&self, ctx: &CausalContext<'_>) -> Signal {
        let i = ctx.index();
        if self.entries.contains(&i) {
            Signal::Enter
        } else if self.exits.contains(&i) {
            Signal::Exit
        } else {
            Signal::None
        }
    }
}
