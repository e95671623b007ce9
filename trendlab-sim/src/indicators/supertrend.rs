//! Supertrend, the ATR band-flip trend indicator.
//!
//! Candidate bands are `hl2 ± multiplier * ATR`. The final upper band only
//! tightens (moves down) while the previous close stays at or below it, the
//! final lower band only tightens (moves up) while the previous close stays at
//! or above it. A close through the active band flips the trend.
//!
//! The carried [`SupertrendState`] is explicit, advanced by a pure `step`.
//! Lookback: the ATR period.

use serde::{Deserialize, Serialize};

use super::atr::{true_range, wilder_smooth};
use super::{Indicator, Trend};
use crate::domain::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupertrendOutput {
    /// Lower band while up, upper band while down.
    Level,
    /// +1.0 up, -1.0 down.
    Direction,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SupertrendState {
    pub upper: f64,
    pub lower: f64,
    pub trend: Trend,
}

impl SupertrendState {
    pub fn level(&self) -> f64 {
        match self.trend {
            Trend::Up => self.lower,
            Trend::Down => self.upper,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Supertrend {
    period: usize,
    multiplier: f64,
    output: SupertrendOutput,
    name: String,
}

impl Supertrend {
    pub fn new(period: usize, multiplier: f64, output: SupertrendOutput) -> Self {
        assert!(period >= 1, "Supertrend period must be >= 1");
        assert!(multiplier > 0.0, "Supertrend multiplier must be > 0");
        let prefix = match output {
            SupertrendOutput::Level => "supertrend",
            SupertrendOutput::Direction => "supertrend_dir",
        };
        Self {
            period,
            multiplier,
            output,
            name: format!("{prefix}_{period}_{multiplier}"),
        }
    }

    /// Initial state on the first bar with a defined ATR. Starts in an uptrend.
    pub fn seed(&self, bar: &Bar, atr: f64) -> SupertrendState {
        SupertrendState {
            upper: bar.hl2() + self.multiplier * atr,
            lower: bar.hl2() - self.multiplier * atr,
            trend: Trend::Up,
        }
    }

    pub fn step(&self, state: &SupertrendState, prev_close: f64, bar: &Bar, atr: f64) -> SupertrendState {
        let basic_upper = bar.hl2() + self.multiplier * atr;
        let basic_lower = bar.hl2() - self.multiplier * atr;

        let upper = if prev_close <= state.upper {
            basic_upper.min(state.upper)
        } else {
            basic_upper
        };
        let lower = if prev_close >= state.lower {
            basic_lower.max(state.lower)
        } else {
            basic_lower
        };

        let trend = match state.trend {
            Trend::Up if bar.close < lower => Trend::Down,
            Trend::Down if bar.close > upper => Trend::Up,
            t => t,
        };
        SupertrendState {
            upper,
            lower,
            trend,
        }
    }

    /// Causal fold. The ATR series it consumes is itself causal.
    pub fn fold(&self, bars: &[Bar]) -> Vec<Option<SupertrendState>> {
        let mut out = vec![None; bars.len()];
        let mut tr = true_range(bars);
        if let Some(first) = tr.first_mut() {
            *first = f64::NAN;
        }
        let atr = wilder_smooth(&tr, self.period);

        let Some(start) = atr.iter().position(|v| !v.is_nan()) else {
            return out;
        };
        if bars[start].is_void() {
            return out;
        }

        let mut state = self.seed(&bars[start], atr[start]);
        out[start] = Some(state);
        for i in (start + 1)..bars.len() {
            if atr[i].is_nan() || bars[i].is_void() {
                continue;
            }
            state = self.step(&state, bars[i - 1].close, &bars[i], atr[i]);
            out[i] = Some(state);
        }
        out
    }
}

impl Indicator for Supertrend {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        self.fold(bars)
            .into_iter()
            .map(|s| match (s, self.output) {
                (Some(s), SupertrendOutput::Level) => s.level(),
                (Some(s), SupertrendOutput::Direction) => s.trend.sign(),
                (None, _) => f64::NAN,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_ohlc_bars;

    fn trending(n: usize, slope: f64) -> Vec<Bar> {
        let data: Vec<_> = (0..n)
            .map(|i| {
                let base = 150.0 + i as f64 * slope;
                (base - slope / 2.0, base + 3.0, base - 3.0, base + slope / 2.0)
            })
            .collect();
        make_ohlc_bars(&data)
    }

    #[test]
    fn uptrend_level_below_close() {
        let bars = trending(15, 2.0);
        let st = Supertrend::new(3, 2.0, SupertrendOutput::Level);
        let result = st.compute(&bars);
        assert!(result[2].is_nan());
        for i in 3..15 {
            assert!(result[i] < bars[i].close, "bar {i}");
        }
    }

    #[test]
    fn downtrend_flips_direction() {
        let bars = trending(20, -4.0);
        let dir = Supertrend::new(3, 1.0, SupertrendOutput::Direction).compute(&bars);
        assert_eq!(dir[3], 1.0, "seeded in uptrend");
        assert_eq!(dir[19], -1.0);
    }

    #[test]
    fn lower_band_never_loosens_in_uptrend() {
        let bars = trending(20, 2.0);
        let states = Supertrend::new(3, 2.0, SupertrendOutput::Level).fold(&bars);
        let lowers: Vec<f64> = states.iter().flatten().map(|s| s.lower).collect();
        for w in lowers.windows(2) {
            assert!(w[1] >= w[0]);
        }
    }

    #[test]
    fn step_inherits_band_until_crossed() {
        let st = Supertrend::new(3, 1.0, SupertrendOutput::Level);
        let state = SupertrendState {
            upper: 110.0,
            lower: 90.0,
            trend: Trend::Up,
        };
        // Candidate lower = 100 - 5 = 95 > 90, previous close above: band tightens to 95.
        let bar = make_ohlc_bars(&[(100.0, 102.0, 98.0, 101.0)])[0];
        let next = st.step(&state, 100.0, &bar, 5.0);
        assert_eq!(next.lower, 95.0);
        assert_eq!(next.upper, 105.0);
        assert_eq!(next.trend, Trend::Up);

        // Candidate lower below the carried band: the carried band is inherited.
        let next = st.step(&state, 100.0, &bar, 15.0);
        assert_eq!(next.lower, 90.0);

        // Close through the lower band flips the trend.
        let crash = make_ohlc_bars(&[(92.0, 93.0, 80.0, 81.0)])[0];
        let next = st.step(&state, 100.0, &crash, 2.0);
        assert_eq!(next.trend, Trend::Down);
        assert_eq!(next.level(), next.upper);
    }

    #[test]
    fn too_few_bars() {
        let bars = make_ohlc_bars(&[(100.0, 105.0, 95.0, 102.0)]);
        let st = Supertrend::new(3, 2.0, SupertrendOutput::Level);
        assert!(st.compute(&bars).iter().all(|v| v.is_nan()));
    }
}
