//! Logging setup for binaries and tests built on the sweep engine.
//!
//! Library code only emits `tracing` events; installing a subscriber is the
//! caller's choice.

use tracing_subscriber::EnvFilter;

/// Environment variable that overrides [`LogConfig::filter`].
pub const LOG_ENV_VAR: &str = "TRENDLAB_LOG";

const DEFAULT_FILTER: &str = "info,trendlab=debug";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// `EnvFilter` directive string, e.g. `info,trendlab_sweep=debug`.
    pub filter: String,
    pub with_target: bool,
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
            with_target: true,
            ansi: true,
        }
    }
}

impl LogConfig {
    pub fn new(filter: impl Into<String>) -> Self {
        Self {
            filter: filter.into(),
            ..Default::default()
        }
    }

    /// Defaults, with the filter taken from `TRENDLAB_LOG` when set.
    pub fn from_env() -> Self {
        match std::env::var(LOG_ENV_VAR) {
            Ok(filter) if !filter.trim().is_empty() => Self::new(filter),
            _ => Self::default(),
        }
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.filter).unwrap_or_else(|err| {
            eprintln!("invalid log filter {:?} ({err}), using {DEFAULT_FILTER}", self.filter);
            EnvFilter::new(DEFAULT_FILTER)
        })
    }
}

/// Install a global fmt subscriber.
///
/// Returns `false` when a global subscriber was already installed, in which
/// case nothing changes.
pub fn init_logging(config: &LogConfig) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(config.env_filter())
        .with_target(config.with_target)
        .with_ansi(config.ansi)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_a_no_op() {
        let config = LogConfig {
            ansi: false,
            ..LogConfig::default()
        };
        let _ = init_logging(&config);
        assert!(!init_logging(&config));
    }

    #[test]
    fn bad_filter_falls_back() {
        let config = LogConfig::new("trendlab=loudest");
        let filter = config.env_filter();
        assert_eq!(filter.to_string(), EnvFilter::new(DEFAULT_FILTER).to_string());
    }
}
