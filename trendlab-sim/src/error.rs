//! Error types for the simulation core.
//!
//! `DataError` aborts one run and nothing else. `ConfigError` is raised by the
//! validation step that runs before a configuration is ever scheduled.

use chrono::NaiveDate;
use thiserror::Error;

/// Malformed or insufficient market data for a single run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    #[error("bar series for {symbol} is empty")]
    Empty { symbol: String },

    #[error("{symbol}: timestamps not strictly increasing at index {index} ({previous} then {current})")]
    NonMonotonic {
        symbol: String,
        index: usize,
        previous: NaiveDate,
        current: NaiveDate,
    },

    #[error("{symbol}: duplicate timestamp {date} at index {index}")]
    DuplicateTimestamp {
        symbol: String,
        index: usize,
        date: NaiveDate,
    },

    #[error("{symbol}: invalid {field} price {value} at index {index}")]
    InvalidPrice {
        symbol: String,
        index: usize,
        field: &'static str,
        value: f64,
    },

    #[error("{symbol}: high {high} below low {low} at index {index}")]
    InvertedRange {
        symbol: String,
        index: usize,
        high: f64,
        low: f64,
    },

    #[error("{symbol}: insufficient history, strategy needs {required} bars, series has {available}")]
    InsufficientHistory {
        symbol: String,
        required: usize,
        available: usize,
    },
}

/// A parameter outside its domain, caught before scheduling.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{strategy}: `{param}` = {value} {reason}")]
    OutOfRange {
        strategy: &'static str,
        param: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("{strategy}: {reason}")]
    Invalid {
        strategy: &'static str,
        reason: String,
    },

    #[error("unknown strategy kind `{0}`")]
    UnknownStrategy(String),

    #[error("{strategy}: missing parameter `{param}`")]
    MissingParameter {
        strategy: &'static str,
        param: String,
    },

    #[error("constraint `{expr}`: {reason}")]
    Constraint { expr: String, reason: String },

    #[error("axis `{0}` is empty or declared twice")]
    Axis(String),

    #[error("cost model: {0}")]
    CostModel(String),

    #[error("simulation config: {0}")]
    Simulation(String),
}

/// Either failure of a single run started from unvalidated parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RunError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ConfigError {
    pub(crate) fn out_of_range(
        strategy: &'static str,
        param: &'static str,
        value: f64,
        reason: &'static str,
    ) -> Self {
        Self::OutOfRange {
            strategy,
            param,
            value,
            reason,
        }
    }
}
