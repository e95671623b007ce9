//! Sweep-level errors.
//!
//! [`SweepError`] is fatal and reaches the caller of a sweep. [`TupleError`]
//! is the reason one (strategy, config, symbol) tuple failed; it is recorded
//! and the sweep carries on.

use thiserror::Error;
use trendlab_sim::{ConfigError, DataError, RunError};

#[derive(Debug, Error)]
pub enum SweepError {
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("invalid sweep spec: {0}")]
    Spec(#[from] ConfigError),

    #[error("failed to parse sweep spec: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("exploration checkpoint: {0:#}")]
    Checkpoint(anyhow::Error),

    #[error("failed to read sweep spec {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TupleError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("run panicked: {0}")]
    Panic(String),
}

impl From<RunError> for TupleError {
    fn from(err: RunError) -> Self {
        match err {
            RunError::Data(e) => TupleError::Data(e),
            RunError::Config(e) => TupleError::Config(e),
        }
    }
}
