//! Rolling walk-forward folds over one equity curve.
//!
//! Each fold is an in-sample window followed, after `gap_bars`, by an
//! out-of-sample window. Folds start every `step_bars` bars and stop when the
//! out-of-sample window would run past the curve.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::{sharpe_ratio, stats};
use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkForwardConfig {
    pub in_sample_bars: usize,
    pub out_of_sample_bars: usize,
    pub gap_bars: usize,
    pub step_bars: usize,
    /// Fewer folds than this and the curve has no walk-forward summary.
    pub min_folds: usize,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self {
            in_sample_bars: 252,
            out_of_sample_bars: 63,
            gap_bars: 5,
            step_bars: 63,
            min_folds: 3,
        }
    }
}

impl WalkForwardConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Sharpe needs at least two returns per window.
        if self.in_sample_bars < 3 || self.out_of_sample_bars < 3 {
            return Err(ConfigError::Simulation(format!(
                "walk-forward windows ({} in-sample, {} out-of-sample) must be >= 3 bars",
                self.in_sample_bars, self.out_of_sample_bars
            )));
        }
        if self.step_bars == 0 {
            return Err(ConfigError::Simulation(
                "walk-forward step_bars must be > 0".to_string(),
            ));
        }
        if self.min_folds == 0 {
            return Err(ConfigError::Simulation(
                "walk-forward min_folds must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    fn span(&self) -> usize {
        self.in_sample_bars
            .saturating_add(self.gap_bars)
            .saturating_add(self.out_of_sample_bars)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fold {
    pub index: usize,
    pub in_sample: (usize, usize),
    pub out_of_sample: (usize, usize),
}

impl Fold {
    pub fn in_sample_range(&self) -> Range<usize> {
        self.in_sample.0..self.in_sample.1
    }

    pub fn out_of_sample_range(&self) -> Range<usize> {
        self.out_of_sample.0..self.out_of_sample.1
    }
}

/// Every fold that fits in `total_bars`, in time order.
pub fn rolling_folds(total_bars: usize, config: &WalkForwardConfig) -> Vec<Fold> {
    let mut folds = Vec::new();
    if config.step_bars == 0 {
        return folds;
    }
    let mut start = 0usize;
    while start.saturating_add(config.span()) <= total_bars {
        let is_end = start + config.in_sample_bars;
        let oos_start = is_end + config.gap_bars;
        folds.push(Fold {
            index: folds.len(),
            in_sample: (start, is_end),
            out_of_sample: (oos_start, oos_start + config.out_of_sample_bars),
        });
        start = match start.checked_add(config.step_bars) {
            Some(next) => next,
            None => break,
        };
    }
    folds
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkForwardSummary {
    pub folds: usize,
    pub mean_in_sample_sharpe: f64,
    pub mean_out_of_sample_sharpe: f64,
    /// Fraction of folds whose out-of-sample Sharpe is positive.
    pub profitable_fold_fraction: f64,
}

/// Mean fold Sharpes, or `None` when fewer than `min_folds` folds fit.
pub fn summarize(equity_curve: &[f64], config: &WalkForwardConfig) -> Option<WalkForwardSummary> {
    let folds = rolling_folds(equity_curve.len(), config);
    if folds.is_empty() || folds.len() < config.min_folds {
        return None;
    }
    let (is_sharpes, oos_sharpes): (Vec<f64>, Vec<f64>) = folds
        .iter()
        .map(|f| {
            (
                sharpe_ratio(&equity_curve[f.in_sample_range()]),
                sharpe_ratio(&equity_curve[f.out_of_sample_range()]),
            )
        })
        .unzip();
    let profitable = oos_sharpes.iter().filter(|&&s| s > 0.0).count();
    Some(WalkForwardSummary {
        folds: folds.len(),
        mean_in_sample_sharpe: stats::mean(&is_sharpes),
        mean_out_of_sample_sharpe: stats::mean(&oos_sharpes),
        profitable_fold_fraction: profitable as f64 / folds.len() as f64,
    })
}
