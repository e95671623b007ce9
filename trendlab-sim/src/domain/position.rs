use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The single open long exposure of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub quantity: f64,
    /// Bar whose signal caused the entry.
    pub signal_index: usize,
    /// Bar on which the entry filled.
    pub entry_index: usize,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub entry_fee: f64,
}

impl Position {
    pub fn cost_basis(&self) -> f64 {
        self.entry_price * self.quantity + self.entry_fee
    }

    pub fn market_value(&self, mark: f64) -> f64 {
        self.quantity * mark
    }
}
