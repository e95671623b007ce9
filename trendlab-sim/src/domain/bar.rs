//! Bar: one trading session of OHLCV data.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// OHLCV bar for one session. The owning symbol lives on [`BarSeries`](super::BarSeries).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: u64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Returns true if any price field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// First price field that is non-finite or non-positive, if any.
    pub fn first_invalid_price(&self) -> Option<(&'static str, f64)> {
        [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ]
        .into_iter()
        .find(|(_, v)| !v.is_finite() || *v <= 0.0)
    }

    /// Midpoint of the session range.
    pub fn hl2(&self) -> f64 {
        (self.high + self.low) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bar() -> Bar {
        Bar::new(
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            100.0,
            105.0,
            98.0,
            103.0,
            50_000,
        )
    }

    #[test]
    fn valid_bar_has_no_invalid_price() {
        assert!(sample_bar().first_invalid_price().is_none());
        assert!(!sample_bar().is_void());
    }

    #[test]
    fn nan_close_is_reported() {
        let mut bar = sample_bar();
        bar.close = f64::NAN;
        assert!(bar.is_void());
        let (field, value) = bar.first_invalid_price().unwrap();
        assert_eq!(field, "close");
        assert!(value.is_nan());
    }

    #[test]
    fn non_positive_open_is_reported() {
        let mut bar = sample_bar();
        bar.open = 0.0;
        assert_eq!(bar.first_invalid_price(), Some(("open", 0.0)));
    }

    #[test]
    fn hl2_is_midpoint() {
        assert_eq!(sample_bar().hl2(), 101.5);
    }

    #[test]
    fn serde_roundtrip() {
        let bar = sample_bar();
        let json = serde_json::to_string(&bar).unwrap();
        let back: Bar = serde_json::from_str(&json).unwrap();
        assert_eq!(bar, back);
    }
}
