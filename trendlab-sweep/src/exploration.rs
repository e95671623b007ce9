//! Continuous exploration: a repeatable task that samples configs and symbols,
//! runs a bounded sweep per batch and republishes the leaderboard.
//!
//! One iteration is one batch. The task's own cancellation token is checked
//! only between iterations; each batch runs under a fresh sweep token and
//! always completes. The iteration counter and aggregator persist, so a
//! cancelled task resumes where it stopped.
//!
//! Config sampling is coverage-aware by default: each batch draws from the
//! least-visited candidates, ties broken by the seeded RNG, so every
//! candidate is tried once before any is tried twice. A checkpoint file
//! carries the counter, visit counts and leaderboard across processes.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use trendlab_sim::BarSeries;

use crate::aggregate::{
    read_json, write_json, AggregatorConfig, AggregatorState, LeaderboardSummary,
    RobustnessAggregator,
};
use crate::cancel::CancellationToken;
use crate::config::RunConfig;
use crate::coordinator::{NoopObserver, SweepCoordinator};
use crate::error::SweepError;
use crate::spec::SweepPlan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingMode {
    /// Uniform without replacement, independent of history.
    Uniform,
    /// Least-visited candidates first.
    #[default]
    Coverage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorationConfig {
    pub seed: u64,
    pub configs_per_batch: usize,
    /// 0 means every symbol in the universe.
    pub symbols_per_batch: usize,
    pub top_k: usize,
    pub sampling: SamplingMode,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            configs_per_batch: 8,
            symbols_per_batch: 0,
            top_k: 10,
            sampling: SamplingMode::default(),
        }
    }
}

/// Deterministic RNG hierarchy.
///
/// Sub-seeds are BLAKE3 of (master seed, stream, iteration), so each draw is
/// independent of the order in which streams or iterations are visited.
#[derive(Debug, Clone)]
pub struct RngHierarchy {
    master_seed: u64,
}

impl RngHierarchy {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn sub_seed(&self, stream: &str, iteration: u64) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(stream.as_bytes());
        hasher.update(&iteration.to_le_bytes());
        let hash = hasher.finalize();
        let mut word = [0u8; 8];
        word.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(word)
    }

    pub fn rng_for(&self, stream: &str, iteration: u64) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(stream, iteration))
    }
}

/// Emitted after every completed batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationSummary {
    pub iteration: usize,
    pub configs_sampled: usize,
    pub symbols_sampled: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub leaderboard_summary: LeaderboardSummary,
}

pub trait ExplorationObserver {
    fn on_iteration(&mut self, summary: &IterationSummary);
}

impl<F: FnMut(&IterationSummary)> ExplorationObserver for F {
    fn on_iteration(&mut self, summary: &IterationSummary) {
        self(summary)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplorationReport {
    /// Iterations completed by this call.
    pub iterations_run: usize,
    /// Iterations completed over the task's lifetime.
    pub total_iterations: usize,
    pub cancelled: bool,
}

/// Everything needed to continue an exploration in another process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplorationCheckpoint {
    pub config: ExplorationConfig,
    pub iteration: usize,
    /// BLAKE3 over the candidates' config ids, in order.
    pub candidates_hash: String,
    /// Times each candidate has been sampled, by candidate index.
    pub visits: Vec<u32>,
    pub aggregator: AggregatorState,
}

pub struct ExplorationTask {
    config: ExplorationConfig,
    coordinator: SweepCoordinator,
    candidates: Vec<RunConfig>,
    universe: Vec<BarSeries>,
    aggregator: RobustnessAggregator,
    rng: RngHierarchy,
    iteration: usize,
    visits: Vec<u32>,
    checkpoint_file: Option<PathBuf>,
    token: CancellationToken,
}

fn candidates_hash(candidates: &[RunConfig]) -> String {
    let mut hasher = blake3::Hasher::new();
    for c in candidates {
        hasher.update(c.config_id().as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

impl ExplorationTask {
    pub fn new(
        config: ExplorationConfig,
        coordinator: SweepCoordinator,
        candidates: Vec<RunConfig>,
        universe: Vec<BarSeries>,
        aggregator: AggregatorConfig,
    ) -> Self {
        let rng = RngHierarchy::new(config.seed);
        let visits = vec![0; candidates.len()];
        Self {
            config,
            coordinator,
            candidates,
            universe,
            aggregator: RobustnessAggregator::new(aggregator),
            rng,
            iteration: 0,
            visits,
            checkpoint_file: None,
            token: CancellationToken::new(),
        }
    }

    /// Continue from a checkpoint. The candidate list must be the one the
    /// checkpoint was taken with; the universe may differ.
    pub fn from_checkpoint(
        checkpoint: ExplorationCheckpoint,
        coordinator: SweepCoordinator,
        candidates: Vec<RunConfig>,
        universe: Vec<BarSeries>,
    ) -> anyhow::Result<Self> {
        if checkpoint.candidates_hash != candidates_hash(&candidates)
            || checkpoint.visits.len() != candidates.len()
        {
            bail!(
                "checkpoint was taken over a different candidate list ({} candidates now, {} then)",
                candidates.len(),
                checkpoint.visits.len()
            );
        }
        Ok(Self {
            rng: RngHierarchy::new(checkpoint.config.seed),
            config: checkpoint.config,
            coordinator,
            candidates,
            universe,
            aggregator: RobustnessAggregator::from_state(checkpoint.aggregator),
            iteration: checkpoint.iteration,
            visits: checkpoint.visits,
            checkpoint_file: None,
            token: CancellationToken::new(),
        })
    }

    /// [`Self::from_checkpoint`] reading the checkpoint from `path`.
    pub fn restore(
        path: &Path,
        coordinator: SweepCoordinator,
        candidates: Vec<RunConfig>,
        universe: Vec<BarSeries>,
    ) -> anyhow::Result<Self> {
        let checkpoint = read_json(path)?;
        let task = Self::from_checkpoint(checkpoint, coordinator, candidates, universe)
            .with_context(|| format!("Failed to restore exploration from {}", path.display()))?;
        tracing::info!(
            path = %path.display(),
            iteration = task.iteration,
            "exploration restored"
        );
        Ok(task)
    }

    /// Write a checkpoint to `path` after every completed iteration.
    pub fn with_checkpoint_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.checkpoint_file = Some(path.into());
        self
    }

    pub fn checkpoint(&self) -> ExplorationCheckpoint {
        ExplorationCheckpoint {
            config: self.config.clone(),
            iteration: self.iteration,
            candidates_hash: candidates_hash(&self.candidates),
            visits: self.visits.clone(),
            aggregator: self.aggregator.to_state(),
        }
    }

    pub fn save_checkpoint(&self, path: &Path) -> anyhow::Result<()> {
        write_json(path, &self.checkpoint())
    }

    /// Times each candidate has been sampled, by candidate index.
    pub fn visits(&self) -> &[u32] {
        &self.visits
    }

    /// A handle that stops the task at the next iteration boundary.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn aggregator(&self) -> &RobustnessAggregator {
        &self.aggregator
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Run until `max_iterations` more batches finish or the task is
    /// cancelled. `None` runs until cancelled.
    pub fn run(
        &mut self,
        max_iterations: Option<usize>,
        observer: &mut dyn ExplorationObserver,
    ) -> Result<ExplorationReport, SweepError> {
        let mut iterations_run = 0;
        loop {
            if self.token.is_cancelled() {
                tracing::info!(iteration = self.iteration, "exploration cancelled");
                return Ok(self.report(iterations_run, true));
            }
            if max_iterations.is_some_and(|max| iterations_run >= max) {
                return Ok(self.report(iterations_run, false));
            }
            let summary = self.run_iteration()?;
            observer.on_iteration(&summary);
            iterations_run += 1;
        }
    }

    /// Clear a previous cancellation and continue.
    pub fn resume(
        &mut self,
        max_iterations: Option<usize>,
        observer: &mut dyn ExplorationObserver,
    ) -> Result<ExplorationReport, SweepError> {
        self.token.reset();
        self.run(max_iterations, observer)
    }

    /// One batch: sample, sweep, ingest, summarize.
    pub fn run_iteration(&mut self) -> Result<IterationSummary, SweepError> {
        let iteration = self.iteration;
        let picked = match self.config.sampling {
            SamplingMode::Uniform => {
                self.sample("configs", self.candidates.len(), self.config.configs_per_batch)
            }
            SamplingMode::Coverage => self.least_visited(self.config.configs_per_batch),
        };
        for &i in &picked {
            self.visits[i] = self.visits[i].saturating_add(1);
        }
        let configs: Vec<RunConfig> = picked
            .into_iter()
            .map(|i| self.candidates[i].clone())
            .collect();
        let symbols_wanted = match self.config.symbols_per_batch {
            0 => self.universe.len(),
            n => n,
        };
        let universe: Vec<BarSeries> = self
            .sample("symbols", self.universe.len(), symbols_wanted)
            .into_iter()
            .map(|i| self.universe[i].clone())
            .collect();

        let plan = SweepPlan::from_configs(configs);
        let outcome =
            self.coordinator
                .run(&plan, &universe, &CancellationToken::new(), &mut NoopObserver)?;
        // Tuple order, not arrival order, so ties rank the same on every run.
        self.aggregator.ingest_all(&outcome.results);
        self.iteration += 1;

        let summary = IterationSummary {
            iteration,
            configs_sampled: plan.configs.len(),
            symbols_sampled: universe.len(),
            succeeded: outcome.results.len(),
            failed: outcome.failures.len(),
            leaderboard_summary: self.aggregator.summary(self.config.top_k),
        };
        tracing::info!(
            iteration,
            succeeded = summary.succeeded,
            failed = summary.failed,
            groups = summary.leaderboard_summary.groups,
            "exploration iteration finished"
        );
        if let Some(path) = &self.checkpoint_file {
            self.save_checkpoint(path).map_err(SweepError::Checkpoint)?;
        }
        Ok(summary)
    }

    /// Sorted indices of the `amount` least-visited candidates. Equal visit
    /// counts are ordered by a seeded shuffle.
    fn least_visited(&self, amount: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.candidates.len()).collect();
        let mut rng = self.rng.rng_for("coverage", self.iteration as u64);
        order.shuffle(&mut rng);
        order.sort_by_key(|&i| self.visits[i]);
        order.truncate(amount);
        order.sort_unstable();
        order
    }

    /// Sorted distinct indices into `0..len`.
    fn sample(&self, stream: &str, len: usize, amount: usize) -> Vec<usize> {
        let amount = amount.min(len);
        if amount == len {
            return (0..len).collect();
        }
        let mut rng = self.rng.rng_for(stream, self.iteration as u64);
        let mut picked = rand::seq::index::sample(&mut rng, len, amount).into_vec();
        picked.sort_unstable();
        picked
    }

    fn report(&self, iterations_run: usize, cancelled: bool) -> ExplorationReport {
        ExplorationReport {
            iterations_run,
            total_iterations: self.iteration,
            cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_seeds_are_deterministic_and_distinct() {
        let h = RngHierarchy::new(42);
        assert_eq!(h.sub_seed("configs", 0), h.sub_seed("configs", 0));
        assert_ne!(h.sub_seed("configs", 0), h.sub_seed("configs", 1));
        assert_ne!(h.sub_seed("configs", 0), h.sub_seed("symbols", 0));
        assert_ne!(h.sub_seed("configs", 0), RngHierarchy::new(43).sub_seed("configs", 0));
    }

    #[test]
    fn sampling_is_bounded_and_sorted() {
        let task = ExplorationTask::new(
            ExplorationConfig::default(),
            SweepCoordinator::default(),
            Vec::new(),
            Vec::new(),
            AggregatorConfig::default(),
        );
        let picked = task.sample("configs", 20, 5);
        assert_eq!(picked.len(), 5);
        assert!(picked.windows(2).all(|w| w[0] < w[1]));
        assert!(picked.iter().all(|&i| i < 20));
        assert_eq!(task.sample("configs", 20, 5), picked);
        assert_eq!(task.sample("configs", 3, 5), vec![0, 1, 2]);
    }

    #[test]
    fn least_visited_prefers_unvisited_candidates() {
        use trendlab_sim::{SimConfig, StrategyParams};

        let candidates: Vec<RunConfig> = (10..16)
            .map(|entry| {
                RunConfig::new(
                    StrategyParams::ChannelBreakout {
                        entry_lookback: entry,
                        exit_lookback: 5,
                    },
                    SimConfig::default(),
                )
            })
            .collect();
        let mut task = ExplorationTask::new(
            ExplorationConfig::default(),
            SweepCoordinator::default(),
            candidates,
            Vec::new(),
            AggregatorConfig::default(),
        );
        task.visits = vec![2, 0, 1, 0, 2, 1];
        assert_eq!(task.least_visited(2), vec![1, 3]);
        let three = task.least_visited(3);
        assert_eq!(three.len(), 3);
        assert!(three.contains(&1) && three.contains(&3));
        assert!(three.contains(&2) || three.contains(&5));
    }
}
