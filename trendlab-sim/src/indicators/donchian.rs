//! Donchian channel: highest high or lowest low over a trailing window that
//! includes the current bar.
//!
//! Lookback: period - 1.

use serde::{Deserialize, Serialize};

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DonchianBand {
    Upper,
    Lower,
}

#[derive(Debug, Clone)]
pub struct Donchian {
    period: usize,
    band: DonchianBand,
    name: String,
}

impl Donchian {
    pub fn new(period: usize, band: DonchianBand) -> Self {
        assert!(period >= 1, "Donchian period must be >= 1");
        let label = match band {
            DonchianBand::Upper => "upper",
            DonchianBand::Lower => "lower",
        };
        Self {
            period,
            band,
            name: format!("donchian_{label}_{period}"),
        }
    }

    pub fn upper(period: usize) -> Self {
        Self::new(period, DonchianBand::Upper)
    }

    pub fn lower(period: usize) -> Self {
        Self::new(period, DonchianBand::Lower)
    }
}

impl Indicator for Donchian {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];
        if n < self.period {
            return result;
        }

        for i in (self.period - 1)..n {
            let window = &bars[i + 1 - self.period..=i];
            let mut prices = window.iter().map(|b| match self.band {
                DonchianBand::Upper => b.high,
                DonchianBand::Lower => b.low,
            });
            let extreme = match self.band {
                DonchianBand::Upper => prices.try_fold(f64::NEG_INFINITY, |acc, p| {
                    (!p.is_nan()).then(|| acc.max(p))
                }),
                DonchianBand::Lower => prices.try_fold(f64::INFINITY, |acc, p| {
                    (!p.is_nan()).then(|| acc.min(p))
                }),
            };
            if let Some(v) = extreme {
                result[i] = v;
            }
        }
        result
    }
}
