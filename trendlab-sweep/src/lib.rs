//! TrendLab Sweep: orchestration on top of `trendlab-sim`.
//!
//! - Parameter grids with declarative constraints, expanded eagerly
//! - TOML sweep specs with validation before anything is scheduled
//! - The sweep coordinator: a bounded rayon pool and a single consumer
//! - Cross-symbol robustness aggregation with FDR and walk-forward grades
//! - Continuous exploration over coverage-aware sampled batches, resumable
//!   from a checkpoint file
//! - Per-run artifact export and logging setup

pub mod aggregate;
pub mod artifacts;
pub mod cancel;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod exploration;
pub mod fdr;
pub mod grade;
pub mod grid;
pub mod logging;
pub mod result;
pub mod spec;

pub use aggregate::{
    AggregatorConfig, AggregatorState, LeaderboardEntry, LeaderboardSummary, RobustnessAggregator,
};
pub use cancel::CancellationToken;
pub use config::{RejectedConfig, RunConfig};
pub use coordinator::{
    run_tuple, NoopObserver, SweepCoordinator, SweepObserver, SweepOptions, SweepOutcome,
    SweepProgress,
};
pub use error::{SweepError, TupleError};
pub use exploration::{
    ExplorationCheckpoint, ExplorationConfig, ExplorationObserver, ExplorationReport,
    ExplorationTask, IterationSummary, SamplingMode,
};
pub use grade::{GradeThresholds, WalkForwardGrade};
pub use grid::{Axis, Constraint, GridPoint, ParamGrid};
pub use result::{RunResult, TupleFailure};
pub use spec::{StrategyGrid, SweepManifest, SweepPlan, SweepSpec};

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<RunResult>();
        require_sync::<RunResult>();
        require_send::<TupleFailure>();
        require_sync::<TupleFailure>();
        require_send::<RunConfig>();
        require_sync::<RunConfig>();
        require_send::<CancellationToken>();
        require_sync::<CancellationToken>();
        require_send::<SweepPlan>();
        require_sync::<SweepPlan>();
    }
}
