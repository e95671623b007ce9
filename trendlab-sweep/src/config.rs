//! One fully specified run configuration and the configs a sweep refused.

use serde::{Deserialize, Serialize};
use trendlab_sim::metrics::walk_forward::WalkForwardConfig;
use trendlab_sim::metrics::DEFAULT_IN_SAMPLE_FRACTION;
use trendlab_sim::{ConfigError, SimConfig, StrategyParams};

use crate::grid::GridPoint;

/// Strategy parameters plus everything else that determines a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub strategy: StrategyParams,
    #[serde(default)]
    pub sim: SimConfig,
    /// Fraction of each series treated as in-sample for the walk-forward split.
    #[serde(default = "default_in_sample_fraction")]
    pub in_sample_fraction: f64,
    /// Rolling folds for grading; the single split is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub walk_forward: Option<WalkForwardConfig>,
}

pub(crate) fn default_in_sample_fraction() -> f64 {
    DEFAULT_IN_SAMPLE_FRACTION
}

impl RunConfig {
    pub fn new(strategy: StrategyParams, sim: SimConfig) -> Self {
        Self {
            strategy,
            sim,
            in_sample_fraction: DEFAULT_IN_SAMPLE_FRACTION,
            walk_forward: None,
        }
    }

    pub fn strategy_id(&self) -> &'static str {
        self.strategy.strategy_id()
    }

    /// Content-addressed id: BLAKE3 of the canonical JSON form. Two configs
    /// share an id exactly when every field matches.
    pub fn config_id(&self) -> String {
        let canonical =
            serde_json::to_vec(self).unwrap_or_else(|_| format!("{self:?}").into_bytes());
        blake3::hash(&canonical).to_hex().to_string()
    }

    /// First 12 hex characters of [`Self::config_id`], for paths and logs.
    pub fn short_id(&self) -> String {
        self.config_id()[..12].to_string()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.strategy.validate()?;
        self.sim.validate()?;
        let f = self.in_sample_fraction;
        if !(f > 0.0 && f < 1.0) {
            return Err(ConfigError::Simulation(format!(
                "in_sample_fraction = {f} must be in (0, 1)"
            )));
        }
        if let Some(wf) = &self.walk_forward {
            wf.validate()?;
        }
        Ok(())
    }
}

/// A config that failed domain validation and was never scheduled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedConfig {
    pub strategy_kind: String,
    /// Grid values that produced it; empty for explicitly listed configs.
    pub point: GridPoint,
    #[serde(serialize_with = "serialize_display")]
    pub error: ConfigError,
}

/// Errors are written out by their message.
pub(crate) fn serialize_display<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: std::fmt::Display,
    S: serde::Serializer,
{
    serializer.collect_str(value)
}
