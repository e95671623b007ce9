//! Parabolic SAR, Wilder's acceleration-factor trailing stop.
//!
//! State carried bar to bar is an explicit [`SarState`]: the stop level, the
//! extreme point of the current trend, the acceleration factor, and the trend
//! direction. Each new extreme raises the factor by `af_step` up to `af_max`;
//! a cross of the stop flips the trend, moves the stop to the old extreme and
//! resets the factor to `af_start`.
//!
//! Direction is seeded from the first two closes. Lookback: 1.

use serde::{Deserialize, Serialize};

use super::{Indicator, Trend};
use crate::domain::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SarOutput {
    /// The stop level.
    Level,
    /// +1.0 in an uptrend, -1.0 in a downtrend.
    Direction,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SarState {
    pub sar: f64,
    pub extreme: f64,
    pub af: f64,
    pub trend: Trend,
}

#[derive(Debug, Clone)]
pub struct ParabolicSar {
    af_start: f64,
    af_step: f64,
    af_max: f64,
    output: SarOutput,
    name: String,
}

impl ParabolicSar {
    pub fn new(af_start: f64, af_step: f64, af_max: f64, output: SarOutput) -> Self {
        assert!(af_start > 0.0, "AF start must be > 0");
        assert!(af_step > 0.0, "AF step must be > 0");
        assert!(af_max >= af_start, "AF max must be >= AF start");
        let prefix = match output {
            SarOutput::Level => "psar",
            SarOutput::Direction => "psar_dir",
        };
        Self {
            af_start,
            af_step,
            af_max,
            output,
            name: format!("{prefix}_{af_start}_{af_step}_{af_max}"),
        }
    }

    /// 0.02 / 0.02 / 0.20 stop level.
    pub fn default_params() -> Self {
        Self::new(0.02, 0.02, 0.20, SarOutput::Level)
    }

    pub fn seed(&self, first: &Bar, second: &Bar) -> SarState {
        if second.close >= first.close {
            SarState {
                sar: first.low,
                extreme: second.high,
                af: self.af_start,
                trend: Trend::Up,
            }
        } else {
            SarState {
                sar: first.high,
                extreme: second.low,
                af: self.af_start,
                trend: Trend::Down,
            }
        }
    }

    /// Advance the state by one bar. `prev2` and `prev1` are the two bars
    /// before `bar`; the new stop may not penetrate their range.
    pub fn step(&self, state: &SarState, prev2: &Bar, prev1: &Bar, bar: &Bar) -> SarState {
        let projected = state.sar + state.af * (state.extreme - state.sar);
        match state.trend {
            Trend::Up => {
                let sar = projected.min(prev1.low).min(prev2.low);
                if bar.low < sar {
                    SarState {
                        sar: state.extreme,
                        extreme: bar.low,
                        af: self.af_start,
                        trend: Trend::Down,
                    }
                } else if bar.high > state.extreme {
                    SarState {
                        sar,
                        extreme: bar.high,
                        af: (state.af + self.af_step).min(self.af_max),
                        trend: Trend::Up,
                    }
                } else {
                    SarState { sar, ..*state }
                }
            }
            Trend::Down => {
                let sar = projected.max(prev1.high).max(prev2.high);
                if bar.high > sar {
                    SarState {
                        sar: state.extreme,
                        extreme: bar.high,
                        af: self.af_start,
                        trend: Trend::Up,
                    }
                } else if bar.low < state.extreme {
                    SarState {
                        sar,
                        extreme: bar.low,
                        af: (state.af + self.af_step).min(self.af_max),
                        trend: Trend::Down,
                    }
                } else {
                    SarState { sar, ..*state }
                }
            }
        }
    }

    /// Causal fold over the series. `None` marks bars where the state is
    /// undefined (warm-up or a void bar, which leaves the state untouched).
    pub fn fold(&self, bars: &[Bar]) -> Vec<Option<SarState>> {
        let mut out = vec![None; bars.len()];
        if bars.len() < 2 || bars[0].is_void() || bars[1].is_void() {
            return out;
        }

        let mut state = self.seed(&bars[0], &bars[1]);
        out[1] = Some(state);
        for i in 2..bars.len() {
            if bars[i].is_void() {
                continue;
            }
            state = self.step(&state, &bars[i - 2], &bars[i - 1], &bars[i]);
            out[i] = Some(state);
        }
        out
    }
}

impl Indicator for ParabolicSar {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        self.fold(bars)
            .into_iter()
            .map(|s| match (s, self.output) {
                (Some(s), SarOutput::Level) => s.sar,
                (Some(s), SarOutput::Direction) => s.trend.sign(),
                (None, _) => f64::NAN,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_ohlc_bars;

    fn uptrend(n: usize) -> Vec<Bar> {
        let data: Vec<_> = (0..n)
            .map(|i| {
                let base = 100.0 + i as f64 * 3.0;
                (base, base + 2.0, base - 1.0, base + 1.5)
            })
            .collect();
        make_ohlc_bars(&data)
    }

    #[test]
    fn psar_uptrend_below_price() {
        let bars = uptrend(10);
        let result = ParabolicSar::default_params().compute(&bars);
        assert!(result[0].is_nan());
        for i in 2..10 {
            assert!(result[i] < bars[i].low, "bar {i}: {} >= {}", result[i], bars[i].low);
        }
    }

    #[test]
    fn af_grows_and_caps() {
        let psar = ParabolicSar::new(0.02, 0.02, 0.10, SarOutput::Level);
        let states = psar.fold(&uptrend(30));
        let last = states[29].unwrap();
        assert_eq!(last.trend, Trend::Up);
        assert!((last.af - 0.10).abs() < 1e-12);
        let early = states[2].unwrap();
        assert!((early.af - 0.04).abs() < 1e-12);
    }

    #[test]
    fn reversal_resets_af_and_moves_stop_to_extreme() {
        let bars = make_ohlc_bars(&[
            (100.0, 105.0, 98.0, 103.0),
            (103.0, 108.0, 101.0, 107.0),
            (107.0, 112.0, 105.0, 111.0),
            (111.0, 115.0, 109.0, 114.0),
            (114.0, 114.5, 95.0, 96.0),
            (96.0, 97.0, 90.0, 91.0),
        ]);
        let psar = ParabolicSar::default_params();
        let states = psar.fold(&bars);
        let before = states[3].unwrap();
        assert_eq!(before.trend, Trend::Up);
        let flipped = states[4].unwrap();
        assert_eq!(flipped.trend, Trend::Down);
        assert_eq!(flipped.sar, before.extreme);
        assert_eq!(flipped.extreme, 95.0);
        assert_eq!(flipped.af, 0.02);

        let dir = ParabolicSar::new(0.02, 0.02, 0.2, SarOutput::Direction).compute(&bars);
        assert_eq!(dir[3], 1.0);
        assert_eq!(dir[4], -1.0);
    }

    #[test]
    fn void_bar_leaves_state_untouched() {
        let mut bars = uptrend(8);
        bars[5].high = f64::NAN;
        let psar = ParabolicSar::default_params();
        let states = psar.fold(&bars);
        assert!(states[5].is_none());
        assert!(states[6].is_some());
    }

    #[test]
    fn psar_too_few_bars() {
        let bars = make_ohlc_bars(&[(100.0, 105.0, 95.0, 102.0)]);
        assert!(ParabolicSar::default_params()
            .compute(&bars)
            .iter()
            .all(|v| v.is_nan()));
    }

    #[test]
    fn names_distinguish_outputs() {
        let level = ParabolicSar::new(0.02, 0.02, 0.2, SarOutput::Level);
        let dir = ParabolicSar::new(0.02, 0.02, 0.2, SarOutput::Direction);
        assert_eq!(level.name(), "psar_0.02_0.02_0.2");
        assert_eq!(dir.name(), "psar_dir_0.02_0.02_0.2");
    }
}
