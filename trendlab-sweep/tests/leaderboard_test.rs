//! Leaderboard behaviour over real sweep output.

use chrono::NaiveDate;
use trendlab_sim::{Bar, BarSeries, SimConfig, StrategyParams};
use trendlab_sweep::{
    run_tuple, CancellationToken, RobustnessAggregator, RunConfig, SweepCoordinator, SweepPlan,
};

fn trend(symbol: &str, slope: f64) -> BarSeries {
    let base = NaiveDate::from_ymd_opt(2021, 1, 4).unwrap();
    let bars = (0..300)
        .map(|i| {
            let t = i as f64;
            let close = 50.0 + slope * t + (t / 4.0).sin() * 1.5;
            Bar::new(
                base + chrono::Duration::days(i as i64),
                close - 0.2,
                close + 0.6,
                close - 0.6,
                close,
                10_000,
            )
        })
        .collect();
    BarSeries::new(symbol, bars)
}

fn ma(fast: usize, slow: usize) -> RunConfig {
    RunConfig::new(
        StrategyParams::MaCrossover {
            fast,
            slow,
            ma_type: Default::default(),
        },
        SimConfig::default(),
    )
}

#[test]
fn leaderboard_is_ranked_and_complete() {
    let universe = vec![trend("UP1", 0.2), trend("UP2", 0.1), trend("FLAT", 0.0)];
    let plan = SweepPlan::from_configs(vec![ma(5, 20), ma(10, 40), ma(3, 60)]);
    let mut aggregator = RobustnessAggregator::default();
    SweepCoordinator::default()
        .run(&plan, &universe, &CancellationToken::new(), &mut aggregator)
        .unwrap();

    let board = aggregator.leaderboard();
    assert_eq!(board.len(), 3);
    assert_eq!(aggregator.results_ingested(), 9);
    for (i, entry) in board.iter().enumerate() {
        assert_eq!(entry.rank, i + 1);
        assert_eq!(entry.symbol_count, 3);
        assert!(entry.adjusted_p_value >= entry.p_value - 1e-12);
        assert!((0.0..=1.0).contains(&entry.adjusted_p_value));
        assert!(entry.min_sharpe <= entry.median_sharpe && entry.median_sharpe <= entry.max_sharpe);
    }
    assert!(board
        .windows(2)
        .all(|w| w[0].robustness_score >= w[1].robustness_score));

    let top = aggregator.top_k(2);
    assert_eq!(top.len(), 2);
    assert_eq!(top[..], board[..2]);
}

#[test]
fn first_seen_breaks_exact_ties() {
    let series = trend("UP1", 0.2);
    // Both fractions put the split on bar 150, so every metric matches while
    // the config ids differ.
    let later = RunConfig {
        in_sample_fraction: 0.5,
        ..ma(5, 20)
    };
    let earlier = RunConfig {
        in_sample_fraction: 0.5000001,
        ..ma(5, 20)
    };
    assert_ne!(later.config_id(), earlier.config_id());

    let first = run_tuple(0, &earlier, &series).unwrap();
    let second = run_tuple(1, &later, &series).unwrap();
    let mut aggregator = RobustnessAggregator::default();
    aggregator.ingest(&first);
    aggregator.ingest(&second);

    let board = aggregator.leaderboard();
    assert_eq!(board.len(), 2);
    assert_eq!(board[0].robustness_score, board[1].robustness_score);
    assert_eq!(board[0].mean_sharpe, board[1].mean_sharpe);
    assert_eq!(board[0].config_id, first.config_id);
    assert!(board[0].first_seen < board[1].first_seen);
}

#[test]
fn rolling_folds_drive_the_walk_forward_grade() {
    use trendlab_sim::metrics::walk_forward::WalkForwardConfig;

    let series = trend("UP1", 0.2);
    let rolled = RunConfig {
        walk_forward: Some(WalkForwardConfig {
            in_sample_bars: 100,
            out_of_sample_bars: 40,
            gap_bars: 0,
            step_bars: 40,
            min_folds: 3,
        }),
        ..ma(5, 20)
    };
    let result = run_tuple(0, &rolled, &series).unwrap();
    let wf = result.metrics.walk_forward.clone().unwrap();
    // starts 0, 40, 80, 120, 160; 160 + 140 = 300 still fits
    assert_eq!(wf.folds, 5);

    let mut aggregator = RobustnessAggregator::default();
    aggregator.ingest(&result);
    let entry = &aggregator.leaderboard()[0];
    assert_eq!(entry.mean_in_sample_sharpe, wf.mean_in_sample_sharpe);
    assert_eq!(entry.mean_out_of_sample_sharpe, wf.mean_out_of_sample_sharpe);
    assert_ne!(rolled.config_id(), ma(5, 20).config_id());
}
