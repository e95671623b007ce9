//! Robustness aggregator and leaderboard.
//!
//! Results are grouped by (strategy, config) across the symbol universe.
//! Ingestion is incremental: a new result for a known group replaces that
//! symbol's record and the leaderboard is recomputed from the groups on
//! request. The aggregator is owned by one consumer; it has no interior
//! locking.
//!
//! Ordering: robustness score descending, then mean Sharpe descending, then
//! the order in which groups were first seen.
//!
//! Every group's p-value comes from the same test: a one-sided t-test on the
//! daily returns of all its symbols pooled together. A one-symbol group
//! therefore carries exactly that run's p-value, and Benjamini-Hochberg
//! corrects one family of comparable tests.
//!
//! State can be saved to and loaded from JSON so a leaderboard outlives the
//! process that built it.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use trendlab_sim::metrics::stats::{self, Moments};
use trendlab_sim::StrategyParams;

use crate::coordinator::SweepObserver;
use crate::fdr::benjamini_hochberg;
use crate::grade::{GradeThresholds, WalkForwardGrade};
use crate::result::RunResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// False-discovery rate for the significance flag.
    pub fdr_alpha: f64,
    pub grades: GradeThresholds,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            fdr_alpha: 0.05,
            grades: GradeThresholds::default(),
        }
    }
}

/// mean / (1 + std). Strictly decreasing in `std`, strictly increasing in `mean`.
pub fn robustness_score(mean_sharpe: f64, std_sharpe: f64) -> f64 {
    mean_sharpe / (1.0 + std_sharpe)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolRecord {
    pub sharpe: f64,
    pub in_sample_sharpe: f64,
    pub out_of_sample_sharpe: f64,
    pub returns: Moments,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Group {
    strategy_id: String,
    config_id: String,
    params: StrategyParams,
    first_seen: usize,
    symbols: BTreeMap<String, SymbolRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// 1-based.
    pub rank: usize,
    pub strategy_id: String,
    pub config_id: String,
    pub params: StrategyParams,
    pub symbol_count: usize,
    pub mean_sharpe: f64,
    pub median_sharpe: f64,
    pub std_sharpe: f64,
    pub min_sharpe: f64,
    pub max_sharpe: f64,
    /// Fraction of symbols with a positive Sharpe.
    pub hit_rate: f64,
    pub mean_in_sample_sharpe: f64,
    pub mean_out_of_sample_sharpe: f64,
    pub walk_forward_ratio: Option<f64>,
    pub grade: WalkForwardGrade,
    pub p_value: f64,
    pub adjusted_p_value: f64,
    pub significant: bool,
    pub robustness_score: f64,
    pub first_seen: usize,
}

/// Snapshot published after each exploration batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardSummary {
    pub groups: usize,
    pub results_ingested: usize,
    pub significant: usize,
    pub top: Vec<LeaderboardEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct RobustnessAggregator {
    config: AggregatorConfig,
    groups: Vec<Group>,
    index: HashMap<(String, String), usize>,
    ingested: usize,
}

impl RobustnessAggregator {
    pub fn new(config: AggregatorConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    pub fn to_state(&self) -> AggregatorState {
        AggregatorState {
            config: self.config.clone(),
            groups: self.groups.clone(),
            ingested: self.ingested,
        }
    }

    /// Rebuild from saved state. Group order, and so first-seen ranking,
    /// is preserved.
    pub fn from_state(state: AggregatorState) -> Self {
        let index = state
            .groups
            .iter()
            .enumerate()
            .map(|(slot, g)| ((g.strategy_id.clone(), g.config_id.clone()), slot))
            .collect();
        Self {
            config: state.config,
            groups: state.groups,
            index,
            ingested: state.ingested,
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json(path, &self.to_state())
    }

    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self::from_state(read_json(path)?))
    }

    /// Load `path` if it exists, else start empty with `config`.
    pub fn load_or_new(path: &Path, config: AggregatorConfig) -> Result<Self> {
        if path.exists() {
            let loaded = Self::load(path)?;
            tracing::info!(
                path = %path.display(),
                groups = loaded.group_count(),
                "loaded leaderboard state"
            );
            Ok(loaded)
        } else {
            Ok(Self::new(config))
        }
    }

    pub fn ingest(&mut self, result: &RunResult) {
        let key = (result.strategy_id.clone(), result.config_id.clone());
        let slot = match self.index.get(&key) {
            Some(&slot) => slot,
            None => {
                let slot = self.groups.len();
                self.groups.push(Group {
                    strategy_id: result.strategy_id.clone(),
                    config_id: result.config_id.clone(),
                    params: result.config.strategy.clone(),
                    first_seen: slot,
                    symbols: BTreeMap::new(),
                });
                self.index.insert(key, slot);
                slot
            }
        };
        let m = &result.metrics;
        let (in_sample_sharpe, out_of_sample_sharpe) = m.grading_sharpes();
        self.groups[slot].symbols.insert(
            result.symbol.clone(),
            SymbolRecord {
                sharpe: m.sharpe,
                in_sample_sharpe,
                out_of_sample_sharpe,
                returns: m.return_moments,
            },
        );
        self.ingested += 1;
    }

    pub fn ingest_all<'a>(&mut self, results: impl IntoIterator<Item = &'a RunResult>) {
        for result in results {
            self.ingest(result);
        }
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn results_ingested(&self) -> usize {
        self.ingested
    }

    /// Every group, ranked.
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        let mut entries: Vec<LeaderboardEntry> =
            self.groups.iter().map(|g| self.entry(g)).collect();

        let p_values: Vec<(String, f64)> = entries
            .iter()
            .map(|e| (e.config_id.clone(), e.p_value))
            .collect();
        for (entry, fdr) in entries
            .iter_mut()
            .zip(benjamini_hochberg(&p_values, self.config.fdr_alpha))
        {
            entry.adjusted_p_value = fdr.adjusted_p;
            entry.significant = fdr.significant;
        }

        entries.sort_by(compare_entries);
        for (i, entry) in entries.iter_mut().enumerate() {
            entry.rank = i + 1;
        }
        entries
    }

    pub fn top_k(&self, k: usize) -> Vec<LeaderboardEntry> {
        let mut board = self.leaderboard();
        board.truncate(k);
        board
    }

    pub fn summary(&self, k: usize) -> LeaderboardSummary {
        let board = self.leaderboard();
        LeaderboardSummary {
            groups: board.len(),
            results_ingested: self.ingested,
            significant: board.iter().filter(|e| e.significant).count(),
            top: board.into_iter().take(k).collect(),
        }
    }

    fn entry(&self, group: &Group) -> LeaderboardEntry {
        let records: Vec<&SymbolRecord> = group.symbols.values().collect();
        let sharpes: Vec<f64> = records.iter().map(|r| r.sharpe).collect();
        let n = sharpes.len();

        let mean_sharpe = stats::mean(&sharpes);
        let std_sharpe = stats::std_dev(&sharpes);
        let mean_is = stats::mean(&records.iter().map(|r| r.in_sample_sharpe).collect::<Vec<_>>());
        let mean_oos =
            stats::mean(&records.iter().map(|r| r.out_of_sample_sharpe).collect::<Vec<_>>());
        let (walk_forward_ratio, grade) = self.config.grades.grade(mean_is, mean_oos);

        let pooled = records
            .iter()
            .fold(Moments::default(), |acc, r| acc.merge(&r.returns));
        let p_value = stats::one_sided_t_test_moments(&pooled).map_or(1.0, |t| t.p_value);

        LeaderboardEntry {
            rank: 0,
            strategy_id: group.strategy_id.clone(),
            config_id: group.config_id.clone(),
            params: group.params.clone(),
            symbol_count: n,
            mean_sharpe,
            median_sharpe: stats::median(&sharpes),
            std_sharpe,
            min_sharpe: sharpes.iter().copied().fold(f64::INFINITY, f64::min),
            max_sharpe: sharpes.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            hit_rate: if n == 0 {
                0.0
            } else {
                sharpes.iter().filter(|&&s| s > 0.0).count() as f64 / n as f64
            },
            mean_in_sample_sharpe: mean_is,
            mean_out_of_sample_sharpe: mean_oos,
            walk_forward_ratio,
            grade,
            p_value,
            adjusted_p_value: p_value,
            significant: false,
            robustness_score: robustness_score(mean_sharpe, std_sharpe),
            first_seen: group.first_seen,
        }
    }
}

/// Serialized form of a [`RobustnessAggregator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatorState {
    config: AggregatorConfig,
    groups: Vec<Group>,
    ingested: usize,
}

pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

pub(crate) fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Failed to parse {}", path.display()))
}

fn compare_entries(a: &LeaderboardEntry, b: &LeaderboardEntry) -> Ordering {
    b.robustness_score
        .total_cmp(&a.robustness_score)
        .then_with(|| b.mean_sharpe.total_cmp(&a.mean_sharpe))
        .then_with(|| a.first_seen.cmp(&b.first_seen))
}

/// Live ingestion in arrival order. Arrival order depends on scheduling, so
/// exact ties may rank differently between runs; ingest
/// [`SweepOutcome::results`](crate::SweepOutcome) after the sweep for a
/// reproducible first-seen order.
impl SweepObserver for RobustnessAggregator {
    fn on_result(&mut self, result: &RunResult) {
        self.ingest(result);
    }
}
