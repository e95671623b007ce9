//! Exponential Moving Average over closes.
//!
//! Seeded with the SMA of the first `period` closes, then
//! `ema[t] = alpha * close[t] + (1 - alpha) * ema[t-1]` with alpha = 2/(n+1).
//! A NaN close leaves every later value undefined.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    name: String,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        Self {
            period,
            name: format!("ema_{period}"),
        }
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        ema_of_series(&closes, self.period)
    }
}

pub fn ema_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period {
        return result;
    }

    let seed_window = &values[..period];
    if seed_window.iter().any(|v| v.is_nan()) {
        return result;
    }
    let mut prev = seed_window.iter().sum::<f64>() / period as f64;
    result[period - 1] = prev;

    let alpha = 2.0 / (period as f64 + 1.0);
    for (i, &v) in values.iter().enumerate().skip(period) {
        if v.is_nan() {
            break;
        }
        prev = alpha * v + (1.0 - alpha) * prev;
        result[i] = prev;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn ema_seed_is_sma() {
        let bars = make_bars(&[2.0, 4.0, 6.0, 8.0]);
        let result = Ema::new(3).compute(&bars);
        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        assert_approx(result[2], 4.0, DEFAULT_EPSILON);
        // alpha = 0.5 -> 0.5*8 + 0.5*4 = 6
        assert_approx(result[3], 6.0, DEFAULT_EPSILON);
    }

    #[test]
    fn ema_nan_taints_rest() {
        let mut bars = make_bars(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        bars[3].close = f64::NAN;
        let result = Ema::new(2).compute(&bars);
        assert!(!result[2].is_nan());
        assert!(result[3].is_nan());
        assert!(result[4].is_nan());
    }

    #[test]
    fn ema_constant_series() {
        let bars = make_bars(&[50.0; 10]);
        let result = Ema::new(4).compute(&bars);
        for v in &result[3..] {
            assert_approx(*v, 50.0, DEFAULT_EPSILON);
        }
    }
}
