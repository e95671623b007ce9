//! BarSeries: an immutable, shareable per-symbol bar sequence.
//!
//! The bar buffer sits behind an `Arc<[Bar]>`, so cloning a series is a
//! pointer copy and concurrent runs on the same symbol read the same memory
//! without synchronization.

use std::sync::Arc;

use crate::domain::Bar;
use crate::error::DataError;

#[derive(Debug, Clone)]
pub struct BarSeries {
    symbol: Arc<str>,
    bars: Arc<[Bar]>,
}

impl BarSeries {
    /// Wrap bars without validating them. The engine validates before every run.
    pub fn new(symbol: impl Into<String>, bars: Vec<Bar>) -> Self {
        let symbol: String = symbol.into();
        Self {
            symbol: Arc::from(symbol),
            bars: Arc::from(bars),
        }
    }

    /// Wrap bars, rejecting malformed input up front.
    pub fn try_new(symbol: impl Into<String>, bars: Vec<Bar>) -> Result<Self, DataError> {
        let series = Self::new(symbol, bars);
        series.validate()?;
        Ok(series)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// A new series holding only the first `len` bars.
    pub fn prefix(&self, len: usize) -> BarSeries {
        let end = len.min(self.bars.len());
        Self {
            symbol: Arc::clone(&self.symbol),
            bars: Arc::from(&self.bars[..end]),
        }
    }

    /// Check the structural invariants: non-empty, strictly increasing unique
    /// timestamps, finite positive prices, high >= low.
    pub fn validate(&self) -> Result<(), DataError> {
        let symbol = || self.symbol.to_string();

        if self.bars.is_empty() {
            return Err(DataError::Empty { symbol: symbol() });
        }

        for (index, bar) in self.bars.iter().enumerate() {
            if let Some((field, value)) = bar.first_invalid_price() {
                return Err(DataError::InvalidPrice {
                    symbol: symbol(),
                    index,
                    field,
                    value,
                });
            }
            if bar.high < bar.low {
                return Err(DataError::InvertedRange {
                    symbol: symbol(),
                    index,
                    high: bar.high,
                    low: bar.low,
                });
            }
            if index > 0 {
                let previous = self.bars[index - 1].date;
                if bar.date == previous {
                    return Err(DataError::DuplicateTimestamp {
                        symbol: symbol(),
                        index,
                        date: bar.date,
                    });
                }
                if bar.date < previous {
                    return Err(DataError::NonMonotonic {
                        symbol: symbol(),
                        index,
                        previous,
                        current: bar.date,
                    });
                }
            }
        }
        Ok(())
    }
}
