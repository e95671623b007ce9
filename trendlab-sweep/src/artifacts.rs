//! Per-run artifact export: trade ledger, equity curve, metrics and a
//! reproducibility manifest, one directory per (strategy, config, symbol).

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use trendlab_sim::{EquityPoint, Trade};

use crate::config::RunConfig;
use crate::result::RunResult;
use crate::spec::SweepManifest;

/// Paths written by [`write_run_artifacts`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub dir: PathBuf,
    pub trades_csv: PathBuf,
    pub equity_csv: PathBuf,
    pub metrics_json: PathBuf,
    pub manifest_json: PathBuf,
}

/// What produced one run, precisely enough to rerun it.
#[derive(Debug, Clone, Serialize)]
pub struct RunManifest<'a> {
    #[serde(flatten)]
    pub sweep: &'a SweepManifest,
    pub strategy_id: &'a str,
    pub config_id: &'a str,
    pub symbol: &'a str,
    pub config: &'a RunConfig,
}

pub fn trades_csv(trades: &[Trade]) -> Result<String> {
    records_csv(trades).context("Failed to encode trades CSV")
}

pub fn equity_csv(equity: &[EquityPoint]) -> Result<String> {
    records_csv(equity).context("Failed to encode equity CSV")
}

fn records_csv<T: Serialize>(records: &[T]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in records {
        writer.serialize(record)?;
    }
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

/// Directory name for one run; characters unsafe in paths become `_`.
pub fn run_dir_name(result: &RunResult) -> String {
    let short_id = result.config_id.get(..12).unwrap_or(&result.config_id);
    let symbol: String = result
        .symbol
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect();
    format!("{}_{}_{}", result.strategy_id, short_id, symbol)
}

/// Write all artifacts for `result` under `root/<run_dir_name>`.
pub fn write_run_artifacts(
    root: &Path,
    result: &RunResult,
    manifest: &SweepManifest,
) -> Result<ArtifactPaths> {
    let dir = root.join(run_dir_name(result));
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create artifact directory {}", dir.display()))?;

    let trades_path = dir.join("trades.csv");
    write_file(&trades_path, trades_csv(&result.output.trades)?)?;

    let equity_path = dir.join("equity.csv");
    write_file(&equity_path, equity_csv(&result.output.equity)?)?;

    let metrics_path = dir.join("metrics.json");
    let metrics = serde_json::to_string_pretty(&result.metrics)
        .context("Failed to serialize run metrics")?;
    write_file(&metrics_path, metrics)?;

    let manifest_path = dir.join("manifest.json");
    let run_manifest = RunManifest {
        sweep: manifest,
        strategy_id: &result.strategy_id,
        config_id: &result.config_id,
        symbol: &result.symbol,
        config: &result.config,
    };
    let json = serde_json::to_string_pretty(&run_manifest)
        .context("Failed to serialize run manifest")?;
    write_file(&manifest_path, json)?;

    tracing::debug!(dir = %dir.display(), "wrote run artifacts");
    Ok(ArtifactPaths {
        dir,
        trades_csv: trades_path,
        equity_csv: equity_path,
        metrics_json: metrics_path,
        manifest_json: manifest_path,
    })
}

fn write_file(path: &Path, contents: String) -> Result<()> {
    std::fs::write(path, contents)
        .with_context(|| format!("Failed to write {}", path.display()))
}
