//! Per-tuple outcomes of a sweep.

use serde::Serialize;
use trendlab_sim::metrics::PerformanceMetrics;
use trendlab_sim::SimulationOutput;

use crate::config::{serialize_display, RunConfig};
use crate::error::TupleError;

/// One successful (strategy, config, symbol) run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResult {
    /// Position in the sweep's tuple order, config-major.
    pub tuple_index: usize,
    pub strategy_id: String,
    pub config_id: String,
    pub symbol: String,
    pub config: RunConfig,
    pub metrics: PerformanceMetrics,
    pub output: SimulationOutput,
}

impl RunResult {
    pub fn sharpe(&self) -> f64 {
        self.metrics.sharpe
    }
}

/// A tuple that produced no result, with the context needed to reproduce it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TupleFailure {
    pub tuple_index: usize,
    pub strategy_id: String,
    pub config_id: String,
    pub symbol: String,
    #[serde(serialize_with = "serialize_display")]
    pub error: TupleError,
}
