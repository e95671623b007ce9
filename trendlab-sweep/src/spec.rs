//! Sweep specification (TOML) and its expansion into a run plan.
//!
//! ```toml
//! [sim]
//! initial_cash = 100000.0
//! fill_convention = "next_bar_open"
//!
//! [sim.cost_model]
//! fee_bps = 5.0
//! slippage_bps = 2.0
//!
//! [[strategies]]
//! kind = "ma_crossover"
//! constraints = ["fast < slow"]
//! axes = [
//!     { name = "fast", values = [5, 10, 20] },
//!     { name = "slow", values = [50, 100] },
//! ]
//!
//! [[configs]]
//! kind = "ensemble"
//! voting = "majority"
//! members = [
//!     { kind = "ma_crossover", fast = 10, slow = 50 },
//!     { kind = "channel_breakout", entry_lookback = 55, exit_lookback = 20 },
//! ]
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use trendlab_sim::metrics::walk_forward::WalkForwardConfig;
use trendlab_sim::{ConfigError, SimConfig, StrategyParams};

use crate::config::{default_in_sample_fraction, RejectedConfig, RunConfig};
use crate::coordinator::SweepOptions;
use crate::error::SweepError;
use crate::grid::{Axis, Constraint, GridPoint, ParamGrid};

/// Grid over one strategy kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyGrid {
    pub kind: String,
    pub axes: Vec<Axis>,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepSpec {
    /// Applied uniformly to every run.
    #[serde(default)]
    pub sim: SimConfig,
    #[serde(default = "default_in_sample_fraction")]
    pub in_sample_fraction: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub walk_forward: Option<WalkForwardConfig>,
    #[serde(default)]
    pub options: SweepOptions,
    #[serde(default)]
    pub strategies: Vec<StrategyGrid>,
    /// Explicit configs, for kinds that are not grid-enumerable.
    #[serde(default)]
    pub configs: Vec<StrategyParams>,
}

impl Default for SweepSpec {
    fn default() -> Self {
        Self {
            sim: SimConfig::default(),
            in_sample_fraction: default_in_sample_fraction(),
            walk_forward: None,
            options: SweepOptions::default(),
            strategies: Vec::new(),
            configs: Vec::new(),
        }
    }
}

/// Validated configs ready to schedule, plus the ones refused.
#[derive(Debug, Clone, Default)]
pub struct SweepPlan {
    pub configs: Vec<RunConfig>,
    pub rejected: Vec<RejectedConfig>,
}

impl SweepPlan {
    pub fn from_configs(configs: Vec<RunConfig>) -> Self {
        Self {
            configs,
            rejected: Vec::new(),
        }
    }

    pub fn tuple_count(&self, symbols: usize) -> usize {
        self.configs.len().saturating_mul(symbols)
    }
}

impl SweepSpec {
    pub fn from_toml_str(s: &str) -> Result<Self, SweepError> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, SweepError> {
        let text = std::fs::read_to_string(path).map_err(|source| SweepError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// BLAKE3 of the canonical JSON form.
    pub fn spec_hash(&self) -> String {
        let canonical =
            serde_json::to_vec(self).unwrap_or_else(|_| format!("{self:?}").into_bytes());
        blake3::hash(&canonical).to_hex().to_string()
    }

    /// Expand every grid and explicit config.
    ///
    /// A structurally broken spec (bad axis, unknown strategy kind, invalid
    /// simulation settings) is fatal. A single config outside its parameter
    /// domain is recorded in [`SweepPlan::rejected`] and skipped. Duplicate
    /// configs are scheduled once.
    pub fn plan(&self) -> Result<SweepPlan, SweepError> {
        self.sim.validate()?;
        let mut plan = SweepPlan::default();
        let mut seen = HashSet::new();

        let mut admit = |plan: &mut SweepPlan, config: RunConfig, point: GridPoint| {
            match config.validate() {
                Ok(()) => {
                    if seen.insert(config.config_id()) {
                        plan.configs.push(config);
                    }
                }
                Err(error) => plan.rejected.push(RejectedConfig {
                    strategy_kind: config.strategy_id().to_string(),
                    point,
                    error,
                }),
            }
        };

        for grid in &self.strategies {
            let param_grid = ParamGrid::new(grid.axes.clone(), grid.constraints.clone())?;
            for point in param_grid.expand() {
                match StrategyParams::from_values(&grid.kind, &point) {
                    Ok(strategy) => admit(&mut plan, self.run_config(strategy), point),
                    Err(e @ ConfigError::UnknownStrategy(_)) => return Err(e.into()),
                    Err(e @ ConfigError::Invalid { .. }) if explicit_only(&grid.kind) => {
                        return Err(e.into())
                    }
                    Err(error) => plan.rejected.push(RejectedConfig {
                        strategy_kind: grid.kind.clone(),
                        point,
                        error,
                    }),
                }
            }
        }

        for strategy in &self.configs {
            admit(&mut plan, self.run_config(strategy.clone()), GridPoint::new());
        }

        tracing::debug!(
            configs = plan.configs.len(),
            rejected = plan.rejected.len(),
            "sweep spec expanded"
        );
        Ok(plan)
    }

    fn run_config(&self, strategy: StrategyParams) -> RunConfig {
        RunConfig {
            strategy,
            sim: self.sim.clone(),
            in_sample_fraction: self.in_sample_fraction,
            walk_forward: self.walk_forward,
        }
    }
}

/// Kinds that can only be listed explicitly.
fn explicit_only(kind: &str) -> bool {
    matches!(kind, "ensemble" | "fixed_schedule")
}

/// Reproducibility record written next to every sweep's artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepManifest {
    pub code_version: String,
    pub spec_hash: String,
    pub spec: SweepSpec,
}

impl SweepManifest {
    pub fn new(spec: &SweepSpec) -> Self {
        Self {
            code_version: env!("CARGO_PKG_VERSION").to_string(),
            spec_hash: spec.spec_hash(),
            spec: spec.clone(),
        }
    }
}
