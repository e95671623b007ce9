use chrono::NaiveDate;
use trendlab_sim::{Bar, BarSeries, SimConfig, StrategyParams};
use trendlab_sweep::artifacts::{run_dir_name, write_run_artifacts};
use trendlab_sweep::{run_tuple, RunConfig, SweepManifest, SweepSpec};

fn series() -> BarSeries {
    let base = NaiveDate::from_ymd_opt(2022, 2, 1).unwrap();
    let bars = (0..60)
        .map(|i| {
            let close = 20.0 + (i as f64 / 3.0).sin() * 2.0 + i as f64 * 0.05;
            Bar::new(
                base + chrono::Duration::days(i as i64),
                close,
                close + 0.5,
                close - 0.5,
                close,
                500,
            )
        })
        .collect();
    BarSeries::new("BRK/B", bars)
}

#[test]
fn writes_all_run_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let config = RunConfig::new(
        StrategyParams::FixedSchedule {
            entries: vec![5, 30],
            exits: vec![20],
        },
        SimConfig::default(),
    );
    let result = run_tuple(0, &config, &series()).unwrap();
    let manifest = SweepManifest::new(&SweepSpec::default());

    let paths = write_run_artifacts(dir.path(), &result, &manifest).unwrap();
    assert_eq!(paths.dir, dir.path().join(run_dir_name(&result)));
    assert!(paths.dir.file_name().unwrap().to_str().unwrap().starts_with("fixed_schedule_"));
    assert!(paths.dir.to_str().unwrap().ends_with("BRK_B"));

    let trades = std::fs::read_to_string(&paths.trades_csv).unwrap();
    // Header plus two round trips; the second is closed at end of data.
    assert_eq!(trades.lines().count(), 3);
    assert!(trades.lines().last().unwrap().ends_with("end_of_data"));

    let equity = std::fs::read_to_string(&paths.equity_csv).unwrap();
    assert_eq!(equity.lines().count(), 61);
    assert!(equity.starts_with("bar_index,date,cash,position_qty,mark_price,equity"));

    let metrics: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&paths.metrics_json).unwrap()).unwrap();
    assert_eq!(metrics["trade_count"], 2);

    let manifest_json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&paths.manifest_json).unwrap()).unwrap();
    assert_eq!(manifest_json["config_id"], result.config_id.as_str());
    assert_eq!(manifest_json["spec_hash"], manifest.spec_hash.as_str());
    assert_eq!(manifest_json["code_version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(manifest_json["symbol"], "BRK/B");
    assert_eq!(manifest_json["config"]["strategy"]["kind"], "fixed_schedule");
}

#[test]
fn rewriting_a_run_overwrites_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let config = RunConfig::new(
        StrategyParams::FixedSchedule {
            entries: vec![5],
            exits: vec![10],
        },
        SimConfig::default(),
    );
    let result = run_tuple(0, &config, &series()).unwrap();
    let manifest = SweepManifest::new(&SweepSpec::default());
    let first = write_run_artifacts(dir.path(), &result, &manifest).unwrap();
    let second = write_run_artifacts(dir.path(), &result, &manifest).unwrap();
    assert_eq!(first, second);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}
