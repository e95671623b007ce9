//! TrendLab Sim: the deterministic single-run simulation core.
//!
//! This crate turns one symbol's bar series plus one strategy configuration
//! into a trade ledger and equity curve:
//! - Domain types (bars, series, fills, positions, trades, equity points)
//! - Causal indicators, window-based and recurrence-based
//! - Stateless strategy evaluators and the ensemble voting variant
//! - The Flat/Long fill engine with a fixed accounting identity
//! - Per-run performance metrics with explicit degenerate sentinels
//!
//! Nothing in here spawns threads or touches the filesystem. Orchestration
//! across symbols and configurations lives in `trendlab-sweep`.

pub mod domain;
pub mod engine;
pub mod error;
pub mod indicators;
pub mod metrics;
pub mod strategy;

pub use domain::{Bar, BarSeries, EquityPoint, ExitReason, Fill, Position, Side, Trade};
pub use engine::{
    run_strategy, simulate, CostModel, FillConvention, PositionSizing, SimConfig,
    SimulationOutput,
};
pub use error::{ConfigError, DataError, RunError};
pub use metrics::PerformanceMetrics;
pub use strategy::{Signal, Stance, Strategy, StrategyParams, VotingMethod};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything shared across sweep workers is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<Bar>();
        require_sync::<Bar>();
        require_send::<BarSeries>();
        require_sync::<BarSeries>();
        require_send::<Trade>();
        require_sync::<Trade>();
        require_send::<EquityPoint>();
        require_sync::<EquityPoint>();
        require_send::<SimConfig>();
        require_sync::<SimConfig>();
        require_send::<StrategyParams>();
        require_sync::<StrategyParams>();
        require_send::<SimulationOutput>();
        require_sync::<SimulationOutput>();
        require_send::<PerformanceMetrics>();
        require_sync::<PerformanceMetrics>();
        require_send::<Box<dyn Strategy>>();
        require_sync::<Box<dyn Strategy>>();
    }
}
