use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Per-bar valuation.
///
/// `equity` is always computed as `cash + position_qty * mark_price`, where
/// the mark is the bar's close, so the identity holds bit-for-bit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub bar_index: usize,
    pub date: NaiveDate,
    pub cash: f64,
    pub position_qty: f64,
    pub mark_price: f64,
    pub equity: f64,
}

impl EquityPoint {
    pub fn mark(bar_index: usize, date: NaiveDate, cash: f64, position_qty: f64, close: f64) -> Self {
        Self {
            bar_index,
            date,
            cash,
            position_qty,
            mark_price: close,
            equity: cash + position_qty * close,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_satisfies_identity() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let p = EquityPoint::mark(7, d, 1234.5, 3.25, 101.75);
        assert_eq!(p.equity, p.cash + p.position_qty * p.mark_price);
        assert_eq!(p.bar_index, 7);
    }

    #[test]
    fn flat_equity_is_cash() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let p = EquityPoint::mark(0, d, 100_000.0, 0.0, 55.0);
        assert_eq!(p.equity, 100_000.0);
    }
}
