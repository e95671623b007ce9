//! Average True Range with Wilder smoothing (alpha = 1/period).
//!
//! True range at t: max(high-low, |high-prev_close|, |low-prev_close|).
//! The first bar has no previous close, so the smoothing seed starts at bar 1.
//! Lookback: period.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            period,
            name: format!("atr_{period}"),
        }
    }
}

/// True range series. `tr[0]` is the plain high-low range.
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let range = bar.high - bar.low;
            if i == 0 {
                return range;
            }
            let pc = bars[i - 1].close;
            range.max((bar.high - pc).abs()).max((bar.low - pc).abs())
        })
        .collect()
}

/// Wilder smoothing, seeded with the mean of the first `period` consecutive
/// defined values. A NaN after the seed leaves the remainder undefined.
pub fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 {
        return result;
    }

    let alpha = 1.0 / period as f64;
    let mut run = 0usize;
    let mut prev: Option<f64> = None;

    for i in 0..n {
        let v = values[i];
        match prev {
            None => {
                if v.is_nan() {
                    run = 0;
                    continue;
                }
                run += 1;
                if run == period {
                    let seed = values[i + 1 - period..=i].iter().sum::<f64>() / period as f64;
                    result[i] = seed;
                    prev = Some(seed);
                }
            }
            Some(p) => {
                if v.is_nan() {
                    break;
                }
                let smoothed = alpha * v + (1.0 - alpha) * p;
                result[i] = smoothed;
                prev = Some(smoothed);
            }
        }
    }
    result
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let mut tr = true_range(bars);
        if let Some(first) = tr.first_mut() {
            *first = f64::NAN;
        }
        wilder_smooth(&tr, self.period)
    }
}
