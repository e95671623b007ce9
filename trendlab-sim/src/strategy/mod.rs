//! Strategy evaluators.
//!
//! A strategy is a pure mapping from the causal view at bar `i` (indicator
//! values plus bars up to `i`) to a [`Signal`]. It keeps no memory of its own;
//! whatever state a rule needs is carried by the indicators it declares.
//!
//! Parameters arrive as a [`StrategyParams`] value that has already passed
//! [`StrategyParams::validate`]; out-of-domain values never reach a strategy.

mod channel_breakout;
mod context;
pub mod describe;
mod ensemble;
mod ma_crossover;
mod momentum;
mod params;
mod psar_flip;
mod schedule;
mod supertrend_flip;

pub use channel_breakout::ChannelBreakout;
pub use context::CausalContext;
pub use describe::{Condition, IndicatorDef, Operand, PriceField, StrategyDescription};
pub use ensemble::Ensemble;
pub use ma_crossover::{MaCrossover, MaType};
pub use momentum::MomentumThreshold;
pub use params::{ParamValue, StrategyParams, VotingMethod, MAX_PERIOD};
pub use psar_flip::ParabolicSarFlip;
pub use schedule::FixedSchedule;
pub use supertrend_flip::SupertrendFlip;

use serde::{Deserialize, Serialize};

use crate::domain::Bar;
use crate::indicators::{Indicator, IndicatorValues};

/// Per-bar decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    #[default]
    None,
    Enter,
    Exit,
}

/// Directional opinion at a bar, used for transitions and ensemble votes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    Long,
    Flat,
}

pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;

    /// Bars of history before the first bar that can produce a signal.
    fn warmup(&self) -> usize;

    /// Indicators this strategy reads, keyed by [`Indicator::name`].
    fn indicators(&self) -> Vec<Box<dyn Indicator>>;

    /// Opinion at the current bar, `None` when undefined or abstaining.
    fn stance(&self, ctx: &CausalContext<'_>) -> Option<Stance>;

    /// Default rule: signal on a change of stance between the previous bar
    /// and this one. Level-triggered strategies override this.
    fn evaluate(&self, ctx: &CausalContext<'_>) -> Signal {
        stance_transition(self, ctx)
    }
}

/// Change of stance between the previous bar and this one.
pub(crate) fn stance_transition<S: Strategy + ?Sized>(strategy: &S, ctx: &CausalContext<'_>) -> Signal {
    let Some(prev) = ctx.previous() else {
        return Signal::None;
    };
    match (strategy.stance(&prev), strategy.stance(ctx)) {
        (Some(Stance::Flat), Some(Stance::Long)) => Signal::Enter,
        (Some(Stance::Long), Some(Stance::Flat)) => Signal::Exit,
        _ => Signal::None,
    }
}

/// Transition rule for trend-flip strategies. A trend that is already up on
/// the first evaluable bar, or on the first bar its direction is defined,
/// enters as well.
pub(crate) fn flip_signal<S: Strategy + ?Sized>(strategy: &S, ctx: &CausalContext<'_>) -> Signal {
    if strategy.stance(ctx) == Some(Stance::Long) {
        let at_warmup = ctx.index() == strategy.warmup();
        let newly_defined = ctx
            .previous()
            .map_or(true, |prev| strategy.stance(&prev).is_none());
        if at_warmup || newly_defined {
            return Signal::Enter;
        }
    }
    stance_transition(strategy, ctx)
}

/// Signal that follows the stance directly, for level-triggered rules.
pub(crate) fn signal_from_stance(stance: Option<Stance>) -> Signal {
    match stance {
        Some(Stance::Long) => Signal::Enter,
        Some(Stance::Flat) => Signal::Exit,
        None => Signal::None,
    }
}

/// Evaluate a strategy over every bar of a series.
pub fn signal_series(
    strategy: &dyn Strategy,
    bars: &[Bar],
    indicators: &IndicatorValues,
) -> Vec<Signal> {
    (0..bars.len())
        .map(|i| {
            if i < strategy.warmup() {
                Signal::None
            } else {
                strategy.evaluate(&CausalContext::new(bars, indicators, i))
            }
        })
        .collect()
}

/// Compute every indicator a strategy declares, once per key.
pub fn compute_indicators(
    strategy: &dyn Strategy,
    bars: &[Bar],
) -> IndicatorValues {
    let mut values = IndicatorValues::new();
    for indicator in strategy.indicators() {
        if !values.contains(indicator.name()) {
            let series = indicator.compute(bars);
            values.insert(indicator.name(), series);
        }
    }
    values
}
