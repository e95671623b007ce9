//! Causal indicator engine.
//!
//! Every indicator maps a bar slice to a series of the same length in which
//! element `i` depends only on `bars[..=i]`. Warm-up positions and positions
//! touched by a NaN input are `f64::NAN`, meaning "undefined"; strategies
//! treat undefined as "no signal".
//!
//! Two families:
//! - window-based: [`Sma`], [`Ema`], [`Atr`], [`Donchian`], [`Roc`]
//! - recurrence-based trailing stops: [`ParabolicSar`], [`Supertrend`], each a
//!   causal fold over an explicit state value with a pure `step` function
//!
//! Multi-output indicators are exposed as separately named instances, one per
//! output, so the single-series [`Indicator`] trait stays unchanged.

pub mod atr;
pub mod donchian;
pub mod ema;
pub mod parabolic_sar;
pub mod roc;
pub mod sma;
pub mod supertrend;
mod values;

pub use atr::Atr;
pub use donchian::{Donchian, DonchianBand};
pub use ema::Ema;
pub use parabolic_sar::{ParabolicSar, SarOutput, SarState};
pub use roc::Roc;
pub use sma::Sma;
pub use supertrend::{Supertrend, SupertrendOutput, SupertrendState};
pub use values::IndicatorValues;

use serde::{Deserialize, Serialize};

use crate::domain::Bar;

/// A causal derived series.
///
/// # Look-ahead guard
/// No value at bar t may depend on bar t+1 or later. Every implementation is
/// checked by computing on a prefix and on the full series and comparing.
pub trait Indicator: Send + Sync {
    /// Key under which the series is stored, e.g. `"sma_20"`.
    fn name(&self) -> &str;

    /// Number of leading bars that are always undefined.
    fn lookback(&self) -> usize;

    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Direction carried by the recurrence indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Up,
    Down,
}

impl Trend {
    /// +1.0 for up, -1.0 for down. This is the value stored in direction series.
    pub fn sign(self) -> f64 {
        match self {
            Trend::Up => 1.0,
            Trend::Down => -1.0,
        }
    }

    pub fn from_sign(value: f64) -> Option<Trend> {
        if value > 0.0 {
            Some(Trend::Up)
        } else if value < 0.0 {
            Some(Trend::Down)
        } else {
            None
        }
    }
}

/// Create synthetic bars from close prices for testing.
///
/// open = prev close (close for the first bar), high = max(open, close) + 1,
/// low = min(open, close) - 1, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar::new(
                base_date + chrono::Duration::days(i as i64),
                open,
                open.max(close) + 1.0,
                open.min(close) - 1.0,
                close,
                1000,
            )
        })
        .collect()
}

#[cfg(test)]
pub fn make_ohlc_bars(data: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    data.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| {
            Bar::new(
                base_date + chrono::Duration::days(i as i64),
                open,
                high,
                low,
                close,
                1000,
            )
        })
        .collect()
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;

#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, eps: f64) {
    assert!(
        (actual - expected).abs() < eps,
        "expected {expected}, got {actual} (eps {eps})"
    );
}
