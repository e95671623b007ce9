//! Performance metrics: pure functions from an equity curve and trade list to
//! scalars.
//!
//! Degenerate inputs (flat curves, too few bars, no trades) never error. They
//! produce the documented sentinel and a [`Degeneracy`] entry naming the
//! metric, so callers can tell "zero" from "undefined".

pub mod stats;
pub mod walk_forward;

use serde::{Deserialize, Serialize};

use crate::domain::Trade;
use crate::engine::SimulationOutput;
use walk_forward::{WalkForwardConfig, WalkForwardSummary};

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Fraction of bars used as in-sample when none is configured.
pub const DEFAULT_IN_SAMPLE_FRACTION: f64 = 0.7;

/// A metric that fell back to its sentinel value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Degeneracy {
    pub metric: String,
    pub reason: String,
}

impl Degeneracy {
    fn new(metric: &str, reason: &str) -> Self {
        Self {
            metric: metric.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Metrics for one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub cagr: f64,
    pub sharpe: f64,
    pub sortino: f64,
    pub calmar: f64,
    /// Negative fraction, e.g. -0.15 for a 15% drawdown.
    pub max_drawdown: f64,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub trade_count: usize,
    pub avg_holding_bars: f64,
    pub exposure: f64,
    /// One-sided p-value of daily returns against a zero mean, 1.0 if undefined.
    pub p_value: f64,
    /// Daily-return moments, pooled across symbols by the leaderboard.
    #[serde(default)]
    pub return_moments: stats::Moments,
    pub in_sample_sharpe: f64,
    pub out_of_sample_sharpe: f64,
    /// Rolling-fold Sharpes, when walk-forward folds were requested and fit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub walk_forward: Option<WalkForwardSummary>,
    pub degeneracies: Vec<Degeneracy>,
}

impl PerformanceMetrics {
    pub fn from_output(output: &SimulationOutput, in_sample_fraction: f64) -> Self {
        Self::compute(
            &output.equity_values(),
            &output.trades,
            output.exposure(),
            in_sample_fraction,
        )
    }

    pub fn compute(
        equity_curve: &[f64],
        trades: &[Trade],
        exposure: f64,
        in_sample_fraction: f64,
    ) -> Self {
        let mut degeneracies = Vec::new();
        let returns = daily_returns(equity_curve);
        let return_moments = stats::Moments::from_values(&returns);

        if returns.len() < 2 {
            degeneracies.push(Degeneracy::new("sharpe", "fewer than two returns"));
        } else if stats::std_dev(&returns) < 1e-15 {
            degeneracies.push(Degeneracy::new("sharpe", "zero return variance"));
        }

        let p_value = match stats::one_sided_t_test_moments(&return_moments) {
            Some(t) => t.p_value,
            None => {
                degeneracies.push(Degeneracy::new("p_value", "t statistic undefined"));
                1.0
            }
        };

        if trades.is_empty() {
            degeneracies.push(Degeneracy::new("win_rate", "no closed trades"));
            degeneracies.push(Degeneracy::new("profit_factor", "no closed trades"));
        }

        let (in_sample, out_of_sample) = split_curve(equity_curve, in_sample_fraction);
        if out_of_sample.len() < 3 {
            degeneracies.push(Degeneracy::new(
                "out_of_sample_sharpe",
                "out-of-sample segment too short",
            ));
        }

        Self {
            total_return: total_return(equity_curve),
            cagr: cagr(equity_curve),
            sharpe: sharpe_ratio(equity_curve),
            sortino: sortino_ratio(equity_curve),
            calmar: calmar_ratio(equity_curve),
            max_drawdown: max_drawdown(equity_curve),
            win_rate: win_rate(trades),
            profit_factor: profit_factor(trades),
            trade_count: trades.len(),
            avg_holding_bars: avg_holding_bars(trades),
            exposure,
            p_value,
            return_moments,
            in_sample_sharpe: sharpe_ratio(in_sample),
            out_of_sample_sharpe: sharpe_ratio(out_of_sample),
            walk_forward: None,
            degeneracies,
        }
    }

    /// Attach rolling walk-forward Sharpes computed over `equity_curve`.
    pub fn with_walk_forward(mut self, equity_curve: &[f64], config: &WalkForwardConfig) -> Self {
        self.walk_forward = walk_forward::summarize(equity_curve, config);
        if self.walk_forward.is_none() {
            self.degeneracies
                .push(Degeneracy::new("walk_forward", "fewer folds than min_folds"));
        }
        self
    }

    /// (in-sample, out-of-sample) Sharpe used for grading: fold means when
    /// a walk-forward summary exists, the single split otherwise.
    pub fn grading_sharpes(&self) -> (f64, f64) {
        match &self.walk_forward {
            Some(wf) => (wf.mean_in_sample_sharpe, wf.mean_out_of_sample_sharpe),
            None => (self.in_sample_sharpe, self.out_of_sample_sharpe),
        }
    }

    pub fn is_degenerate(&self, metric: &str) -> bool {
        self.degeneracies.iter().any(|d| d.metric == metric)
    }
}

/// Split at `fraction` of the bars. Both halves share the boundary point so
/// no return is lost.
pub fn split_curve(equity_curve: &[f64], fraction: f64) -> (&[f64], &[f64]) {
    let n = equity_curve.len();
    if n < 2 {
        return (equity_curve, &[]);
    }
    let fraction = if fraction.is_finite() {
        fraction.clamp(0.0, 1.0)
    } else {
        DEFAULT_IN_SAMPLE_FRACTION
    };
    let boundary = ((n as f64 * fraction).floor() as usize).clamp(1, n - 1);
    (&equity_curve[..=boundary], &equity_curve[boundary..])
}

// ─── Individual metric functions ────────────────────────────────────

/// (final - initial) / initial.
pub fn total_return(equity_curve: &[f64]) -> f64 {
    match (equity_curve.first(), equity_curve.last()) {
        (Some(&first), Some(&last)) if equity_curve.len() >= 2 && first > 0.0 => {
            (last - first) / first
        }
        _ => 0.0,
    }
}

/// Compound annual growth over the curve's length in bars.
pub fn cagr(equity_curve: &[f64]) -> f64 {
    let (Some(&first), Some(&last)) = (equity_curve.first(), equity_curve.last()) else {
        return 0.0;
    };
    if equity_curve.len() < 2 || first <= 0.0 || last <= 0.0 {
        return 0.0;
    }
    let years = equity_curve.len() as f64 / TRADING_DAYS_PER_YEAR;
    (last / first).powf(1.0 / years) - 1.0
}

/// Annualized mean over standard deviation of daily returns.
/// 0.0 with fewer than two returns or zero variance.
pub fn sharpe_ratio(equity_curve: &[f64]) -> f64 {
    let returns = daily_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let std = stats::std_dev(&returns);
    if std < 1e-15 {
        return 0.0;
    }
    stats::mean(&returns) / std * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Like Sharpe with downside deviation. 0.0 when there is no downside.
pub fn sortino_ratio(equity_curve: &[f64]) -> f64 {
    let returns = daily_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let downside: f64 = returns.iter().filter(|&&r| r < 0.0).map(|r| r * r).sum();
    let downside_std = (downside / returns.len() as f64).sqrt();
    if downside_std < 1e-15 {
        return 0.0;
    }
    stats::mean(&returns) / downside_std * TRADING_DAYS_PER_YEAR.sqrt()
}

/// CAGR / |max drawdown|. 0.0 without a drawdown or with non-positive CAGR.
pub fn calmar_ratio(equity_curve: &[f64]) -> f64 {
    let c = cagr(equity_curve);
    let dd = max_drawdown(equity_curve);
    if dd >= 0.0 || c <= 0.0 {
        return 0.0;
    }
    c / dd.abs()
}

pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let mut peak = f64::MIN;
    let mut max_dd = 0.0_f64;
    for &eq in equity_curve {
        peak = peak.max(eq);
        if peak > 0.0 {
            max_dd = max_dd.min((eq - peak) / peak);
        }
    }
    max_dd
}

pub fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().filter(|t| t.is_winner()).count() as f64 / trades.len() as f64
}

/// Gross profit / gross loss, capped at 100.0.
pub fn profit_factor(trades: &[Trade]) -> f64 {
    let profit: f64 = trades.iter().map(|t| t.net_pnl.max(0.0)).sum();
    let loss: f64 = trades.iter().map(|t| (-t.net_pnl).max(0.0)).sum();
    if loss < 1e-10 {
        return if profit > 0.0 { 100.0 } else { 0.0 };
    }
    (profit / loss).min(100.0)
}

pub fn avg_holding_bars(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().map(|t| t.holding_bars as f64).sum::<f64>() / trades.len() as f64
}

pub fn daily_returns(equity_curve: &[f64]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ExitReason;
    use chrono::NaiveDate;

    fn make_trade(net_pnl: f64, holding_bars: usize) -> Trade {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        Trade {
            entry_index: 0,
            exit_index: holding_bars,
            entry_date: date,
            exit_date: date,
            entry_price: 100.0,
            exit_price: 100.0 + net_pnl / 50.0,
            quantity: 50.0,
            fees: 0.0,
            gross_pnl: net_pnl,
            net_pnl,
            return_pct: net_pnl / 5_000.0,
            holding_bars,
            exit_reason: ExitReason::Signal,
        }
    }

    fn rising_curve(n: usize) -> Vec<f64> {
        let mut eq = vec![100_000.0];
        for i in 1..n {
            let r = if i % 2 == 0 { 1.002 } else { 1.0005 };
            eq.push(eq[i - 1] * r);
        }
        eq
    }

    #[test]
    fn total_return_cases() {
        assert!((total_return(&[100_000.0, 100_500.0, 110_000.0]) - 0.1).abs() < 1e-10);
        assert!((total_return(&[100_000.0, 90_000.0]) + 0.1).abs() < 1e-10);
        assert_eq!(total_return(&[100_000.0]), 0.0);
        assert_eq!(total_return(&[]), 0.0);
    }

    #[test]
    fn cagr_one_year() {
        let mut eq = vec![100_000.0];
        for i in 1..252 {
            eq.push(eq[i - 1] * 1.1_f64.powf(1.0 / 251.0));
        }
        assert!((cagr(&eq) - 0.1).abs() < 0.005);
        assert_eq!(cagr(&[100_000.0; 252]), 0.0);
    }

    #[test]
    fn sharpe_positive_for_steady_gains() {
        assert!(sharpe_ratio(&rising_curve(253)) > 5.0);
        assert_eq!(sharpe_ratio(&[100_000.0; 100]), 0.0);
    }

    #[test]
    fn sortino_needs_downside() {
        assert_eq!(sortino_ratio(&rising_curve(50)), 0.0);
        let eq = [100.0, 102.0, 101.0, 104.0, 103.0, 106.0];
        assert!(sortino_ratio(&eq) > 0.0);
    }

    #[test]
    fn drawdown() {
        let eq = [100.0, 120.0, 90.0, 130.0, 117.0];
        assert!((max_drawdown(&eq) + 0.25).abs() < 1e-12);
        assert_eq!(max_drawdown(&[100.0, 101.0, 102.0]), 0.0);
    }

    #[test]
    fn trade_statistics() {
        let trades = vec![make_trade(500.0, 4), make_trade(-250.0, 2), make_trade(250.0, 6)];
        assert!((win_rate(&trades) - 2.0 / 3.0).abs() < 1e-12);
        assert!((profit_factor(&trades) - 3.0).abs() < 1e-12);
        assert!((avg_holding_bars(&trades) - 4.0).abs() < 1e-12);
        assert_eq!(profit_factor(&[make_trade(10.0, 1)]), 100.0);
        assert_eq!(profit_factor(&[]), 0.0);
    }

    #[test]
    fn flat_curve_is_degenerate_not_an_error() {
        let m = PerformanceMetrics::compute(&[100_000.0; 40], &[], 0.0, 0.7);
        assert_eq!(m.sharpe, 0.0);
        assert_eq!(m.p_value, 1.0);
        assert!(m.is_degenerate("sharpe"));
        assert!(m.is_degenerate("p_value"));
        assert!(m.is_degenerate("win_rate"));
        assert_eq!(m.trade_count, 0);
    }

    #[test]
    fn in_and_out_of_sample_split() {
        let eq: Vec<f64> = (0..10).map(|i| i as f64 + 1.0).collect();
        let (is, oos) = split_curve(&eq, 0.7);
        assert_eq!(is.len(), 8);
        assert_eq!(oos.len(), 3);
        assert_eq!(is.last(), oos.first());

        let (is, oos) = split_curve(&eq, 0.0);
        assert_eq!(is.len(), 2);
        assert_eq!(oos.len(), 9);
    }

    #[test]
    fn grading_prefers_rolling_folds_when_they_fit() {
        let curve: Vec<f64> = (0..400)
            .map(|i| 100_000.0 * (1.0 + 0.0005 * i as f64 + 0.0002 * (i % 4) as f64))
            .collect();
        let single = PerformanceMetrics::compute(&curve, &[], 1.0, 0.7);
        assert_eq!(
            single.grading_sharpes(),
            (single.in_sample_sharpe, single.out_of_sample_sharpe)
        );

        let two_folds = WalkForwardConfig {
            min_folds: 2,
            ..WalkForwardConfig::default()
        };
        let rolled = single.clone().with_walk_forward(&curve, &two_folds);
        let wf = rolled.walk_forward.clone().unwrap();
        assert_eq!(wf.folds, 2);
        assert!(!rolled.is_degenerate("walk_forward"));
        assert_eq!(
            rolled.grading_sharpes(),
            (wf.mean_in_sample_sharpe, wf.mean_out_of_sample_sharpe)
        );

        let short = single.with_walk_forward(&curve[..300], &two_folds);
        assert!(short.walk_forward.is_none());
        assert!(short.is_degenerate("walk_forward"));
    }

    #[test]
    fn steady_gains_are_significant() {
        let m = PerformanceMetrics::compute(&rising_curve(120), &[], 1.0, 0.7);
        assert!(m.p_value < 0.01);
        assert!(m.in_sample_sharpe > 0.0);
        assert!(m.out_of_sample_sharpe > 0.0);
        assert!(!m.is_degenerate("sharpe"));
    }
}
