//! Channel breakout with independent entry and exit channels.
//!
//! Enter when the close exceeds the highest high of the previous
//! `entry_lookback` bars; exit when the close drops below the lowest low of the
//! previous `exit_lookback` bars. The channel is read at `i - 1` so the
//! current bar never sits inside the window it is compared against.

use super::{signal_from_stance, CausalContext, Signal, Stance, Strategy};
use crate::indicators::{Donchian, Indicator};

#[derive(Debug, Clone)]
pub struct ChannelBreakout {
    pub entry_lookback: usize,
    pub exit_lookback: usize,
    upper_key: String,
    lower_key: String,
}

impl ChannelBreakout {
    pub fn new(entry_lookback: usize, exit_lookback: usize) -> Self {
        assert!(entry_lookback >= 1, "entry_lookback must be >= 1");
        assert!(exit_lookback >= 1, "exit_lookback must be >= 1");
        Self {
            entry_lookback,
            exit_lookback,
            upper_key: Donchian::upper(entry_lookback).name().to_string(),
            lower_key: Donchian::lower(exit_lookback).name().to_string(),
        }
    }

    pub fn upper_key(&self) -> &str {
        &self.upper_key
    }

    pub fn lower_key(&self) -> &str {
        &self.lower_key
    }
}

impl Strategy for ChannelBreakout {
    fn name(&self) -> &str {
        "channel_breakout"
    }

    fn warmup(&self) -> usize {
        self.entry_lookback.max(self.exit_lookback)
    }

    fn indicators(&self) -> Vec<Box<dyn Indicator>> {
        vec![
            Box::new(Donchian::upper(self.entry_lookback)),
            Box::new(Donchian::lower(self.exit_lookback)),
        ]
    }

    fn stance(&self, ctx: &CausalContext<'_>) -> Option<Stance> {
        let close = ctx.bar().close;
        if let Some(upper) = ctx.value_back(&self.upper_key, 1) {
            if close > upper {
                return Some(Stance::Long);
            }
        }
        if let Some(lower) = ctx.value_back(&self.lower_key, 1) {
            if close < lower {
                return Some(Stance::Flat);
            }
        }
        None
    }

    fn evaluate(&self, ctx: &CausalContext<'_>) -> Signal {
        signal_from_stance(self.stance(ctx))
    }
}
