//! Simple Moving Average over closes.
//!
//! Lookback: period - 1.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self {
            period,
            name: format!("sma_{period}"),
        }
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];
        let p = self.period;

        // Running sum over the finite values in the window plus a NaN count,
        // so a NaN only poisons the windows that actually contain it.
        let mut sum = 0.0;
        let mut nan_count = 0usize;
        for i in 0..n {
            let entering = bars[i].close;
            if entering.is_nan() {
                nan_count += 1;
            } else {
                sum += entering;
            }
            if i >= p {
                let leaving = bars[i - p].close;
                if leaving.is_nan() {
                    nan_count -= 1;
                } else {
                    sum -= leaving;
                }
            }
            if i + 1 >= p && nan_count == 0 {
                result[i] = sum / p as f64;
            }
        }
        result
    }
}
