//! Sweep coordinator: runs every (config, symbol) tuple on a bounded worker
//! pool and hands results to a single consumer.
//!
//! Workers send each finished tuple over an mpsc channel. The calling thread
//! is the only consumer: it drains the channel, keeps the tallies and drives
//! the [`SweepObserver`], so an aggregator attached as observer sees results
//! one at a time without locks.
//!
//! Tuple execution is isolated. Data errors, config errors and panics become
//! [`TupleFailure`] records; only pool construction and the tuple limit can
//! fail the sweep itself.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use trendlab_sim::metrics::PerformanceMetrics;
use trendlab_sim::{run_strategy, BarSeries};

use crate::cancel::CancellationToken;
use crate::config::{RejectedConfig, RunConfig};
use crate::error::{SweepError, TupleError};
use crate::result::{RunResult, TupleFailure};
use crate::spec::SweepPlan;

/// Limits applied to one sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepOptions {
    /// Worker threads; `None` uses the available hardware concurrency.
    pub max_concurrency: Option<usize>,
    /// Sweeps with more tuples than this are refused.
    pub max_tuples: usize,
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self {
            max_concurrency: None,
            max_tuples: 1_000_000,
        }
    }
}

impl SweepOptions {
    fn worker_count(&self) -> usize {
        let hardware = std::thread::available_parallelism().map_or(1, |n| n.get());
        self.max_concurrency.map_or(hardware, |cap| cap.clamp(1, hardware.max(1)))
    }
}

/// Progress after each finished tuple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepProgress {
    pub completed: usize,
    pub total: usize,
    pub current_symbol: String,
    pub current_strategy: String,
}

/// Receives sweep events on the consumer thread.
pub trait SweepObserver {
    fn on_result(&mut self, _result: &RunResult) {}

    fn on_failure(&mut self, _failure: &TupleFailure) {}

    fn on_progress(&mut self, _progress: &SweepProgress) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl SweepObserver for NoopObserver {}

/// Everything a sweep produced. A cancelled sweep is still a valid outcome.
#[derive(Debug, Clone, Serialize)]
pub struct SweepOutcome {
    /// Sorted by tuple index.
    pub results: Vec<RunResult>,
    /// Sorted by tuple index.
    pub failures: Vec<TupleFailure>,
    pub rejected: Vec<RejectedConfig>,
    pub completed: usize,
    pub total: usize,
    pub cancelled: bool,
}

enum TupleMessage {
    Done(RunResult),
    Failed(TupleFailure),
}

#[derive(Debug, Clone, Default)]
pub struct SweepCoordinator {
    options: SweepOptions,
}

impl SweepCoordinator {
    pub fn new(options: SweepOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SweepOptions {
        &self.options
    }

    /// Run every config of `plan` against every series of `universe`.
    ///
    /// Tuple `k` is config `k / universe.len()` on symbol `k % universe.len()`.
    pub fn run(
        &self,
        plan: &SweepPlan,
        universe: &[BarSeries],
        cancel: &CancellationToken,
        observer: &mut dyn SweepObserver,
    ) -> Result<SweepOutcome, SweepError> {
        self.execute(plan, universe, cancel, observer, run_tuple)
    }

    pub(crate) fn execute<F>(
        &self,
        plan: &SweepPlan,
        universe: &[BarSeries],
        cancel: &CancellationToken,
        observer: &mut dyn SweepObserver,
        run: F,
    ) -> Result<SweepOutcome, SweepError>
    where
        F: Fn(usize, &RunConfig, &BarSeries) -> Result<RunResult, TupleError> + Sync,
    {
        let symbols = universe.len();
        let total = plan.tuple_count(symbols);
        if total > self.options.max_tuples {
            return Err(SweepError::ResourceExhausted(format!(
                "{total} tuples exceeds the limit of {}",
                self.options.max_tuples
            )));
        }

        let workers = self.options.worker_count();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("sweep-worker-{i}"))
            .build()
            .map_err(|e| SweepError::ResourceExhausted(format!("worker pool: {e}")))?;

        tracing::info!(
            configs = plan.configs.len(),
            symbols,
            total,
            workers,
            rejected = plan.rejected.len(),
            "sweep started"
        );

        let mut results = Vec::new();
        let mut failures = Vec::new();
        let (tx, rx) = mpsc::channel::<TupleMessage>();

        std::thread::scope(|scope| {
            let run = &run;
            scope.spawn(move || {
                pool.install(|| {
                    (0..total).into_par_iter().for_each_with(tx, |tx, index| {
                        if cancel.is_cancelled() {
                            return;
                        }
                        let config = &plan.configs[index / symbols];
                        let series = &universe[index % symbols];
                        let message = match catch_unwind(AssertUnwindSafe(|| run(index, config, series))) {
                            Ok(Ok(result)) => TupleMessage::Done(result),
                            Ok(Err(error)) => TupleMessage::Failed(failure(index, config, series, error)),
                            Err(payload) => TupleMessage::Failed(failure(
                                index,
                                config,
                                series,
                                TupleError::Panic(panic_message(payload.as_ref())),
                            )),
                        };
                        // The consumer outlives every worker.
                        let _ = tx.send(message);
                    });
                });
            });

            for message in rx {
                let (symbol, strategy) = match message {
                    TupleMessage::Done(result) => {
                        observer.on_result(&result);
                        let ctx = (result.symbol.clone(), result.strategy_id.clone());
                        results.push(result);
                        ctx
                    }
                    TupleMessage::Failed(failure) => {
                        let short_id = failure.config_id.get(..12).unwrap_or(&failure.config_id);
                        tracing::warn!(
                            symbol = %failure.symbol,
                            strategy = %failure.strategy_id,
                            config = short_id,
                            error = %failure.error,
                            "tuple failed"
                        );
                        observer.on_failure(&failure);
                        let ctx = (failure.symbol.clone(), failure.strategy_id.clone());
                        failures.push(failure);
                        ctx
                    }
                };
                observer.on_progress(&SweepProgress {
                    completed: results.len() + failures.len(),
                    total,
                    current_symbol: symbol,
                    current_strategy: strategy,
                });
            }
        });

        results.sort_by_key(|r| r.tuple_index);
        failures.sort_by_key(|f| f.tuple_index);
        let completed = results.len() + failures.len();
        let cancelled = completed < total && cancel.is_cancelled();
        if cancelled {
            tracing::info!(completed, total, "sweep cancelled");
        } else {
            tracing::info!(
                succeeded = results.len(),
                failed = failures.len(),
                "sweep finished"
            );
        }

        Ok(SweepOutcome {
            results,
            failures,
            rejected: plan.rejected.clone(),
            completed,
            total,
            cancelled,
        })
    }
}

/// Simulate one tuple and compute its metrics.
pub fn run_tuple(
    tuple_index: usize,
    config: &RunConfig,
    series: &BarSeries,
) -> Result<RunResult, TupleError> {
    let output = run_strategy(series, &config.strategy, &config.sim)?;
    let mut metrics = PerformanceMetrics::from_output(&output, config.in_sample_fraction);
    if let Some(wf) = &config.walk_forward {
        metrics = metrics.with_walk_forward(&output.equity_values(), wf);
    }
    Ok(RunResult {
        tuple_index,
        strategy_id: config.strategy_id().to_string(),
        config_id: config.config_id(),
        symbol: series.symbol().to_string(),
        config: config.clone(),
        metrics,
        output,
    })
}

fn failure(index: usize, config: &RunConfig, series: &BarSeries, error: TupleError) -> TupleFailure {
    TupleFailure {
        tuple_index: index,
        strategy_id: config.strategy_id().to_string(),
        config_id: config.config_id(),
        symbol: series.symbol().to_string(),
        error,
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
