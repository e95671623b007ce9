use super::ledger::Ledger;
use super::{FillConvention, SimConfig, SimulationOutput};
use crate::domain::{BarSeries, EquityPoint, ExitReason};
use crate::error::{DataError, RunError};
use crate::indicators::{Atr, Indicator};
use crate::strategy::{compute_indicators, CausalContext, Signal, Strategy, StrategyParams};

/// An order decided on one bar, waiting for the next bar's open.
#[derive(Debug, Clone, Copy)]
enum PendingOrder {
    Enter { signal_index: usize },
    Exit,
}

/// Run one strategy over one series.
///
/// `config` is expected to have passed [`SimConfig::validate`]. Malformed
/// bars and a series shorter than the strategy's warm-up abort the run with
/// a [`DataError`].
pub fn simulate(
    series: &BarSeries,
    strategy: &dyn Strategy,
    config: &SimConfig,
) -> Result<SimulationOutput, DataError> {
    series.validate()?;
    let bars = series.bars();
    let warmup = strategy.warmup();
    if bars.len() <= warmup {
        return Err(DataError::InsufficientHistory {
            symbol: series.symbol().to_string(),
            required: warmup.saturating_add(1),
            available: bars.len(),
        });
    }

    let indicators = compute_indicators(strategy, bars);
    let sizing_atr = config
        .sizing
        .atr_period()
        .filter(|&period| period >= 1)
        .map(|period| Atr::new(period).compute(bars));
    let atr_at = |index: usize| sizing_atr.as_ref().map(|atr| atr[index]);
    let mut ledger = Ledger::new(config.initial_cash, config.cost_model, config.sizing);
    let mut equity = Vec::with_capacity(bars.len());
    let mut pending: Option<PendingOrder> = None;
    let last = bars.len() - 1;

    for (i, bar) in bars.iter().enumerate() {
        if let Some(order) = pending.take() {
            match order {
                PendingOrder::Enter { signal_index } => {
                    let atr = atr_at(signal_index);
                    ledger.buy(signal_index, i, bar.date, bar.open, atr);
                }
                PendingOrder::Exit => {
                    ledger.sell(i, bar.date, bar.open, ExitReason::Signal);
                }
            }
        }

        let signal = if i >= warmup {
            strategy.evaluate(&CausalContext::new(bars, &indicators, i))
        } else {
            Signal::None
        };

        let order = match (signal, ledger.position()) {
            (Signal::Enter, None) => Some(PendingOrder::Enter { signal_index: i }),
            (Signal::Exit, Some(pos)) if i > pos.signal_index => Some(PendingOrder::Exit),
            _ => None,
        };

        if let Some(order) = order {
            match config.fill_convention {
                FillConvention::SignalBarClose => match order {
                    PendingOrder::Enter { signal_index } => {
                        let atr = atr_at(signal_index);
                        ledger.buy(signal_index, i, bar.date, bar.close, atr);
                    }
                    PendingOrder::Exit => {
                        ledger.sell(i, bar.date, bar.close, ExitReason::Signal);
                    }
                },
                FillConvention::NextBarOpen if i < last => pending = Some(order),
                FillConvention::NextBarOpen => {}
            }
        }

        if i == last && config.force_close_at_end {
            let closable = ledger.position().is_some_and(|p| p.entry_index < i);
            if closable {
                ledger.sell(i, bar.date, bar.close, ExitReason::EndOfData);
            }
        }

        equity.push(EquityPoint::mark(
            i,
            bar.date,
            ledger.cash(),
            ledger.position_qty(),
            bar.close,
        ));
    }

    let (trades, fills, open_position) = ledger.finish();
    tracing::trace!(
        symbol = series.symbol(),
        strategy = strategy.name(),
        bars = bars.len(),
        trades = trades.len(),
        "simulation finished"
    );

    Ok(SimulationOutput {
        symbol: series.symbol().to_string(),
        strategy: strategy.name().to_string(),
        trades,
        fills,
        equity,
        open_position,
    })
}

/// Validate parameters and config, build the strategy and simulate.
pub fn run_strategy(
    series: &BarSeries,
    params: &StrategyParams,
    config: &SimConfig,
) -> Result<SimulationOutput, RunError> {
    params.validate()?;
    config.validate()?;
    let strategy = params.build();
    Ok(simulate(series, strategy.as_ref(), config)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Bar;
    use crate::engine::CostModel;
    use crate::strategy::FixedSchedule;
    use chrono::NaiveDate;

    fn series(n: usize) -> BarSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = (0..n)
            .map(|i| {
                let open = 100.0 + i as f64;
                let close = open + 0.5;
                Bar::new(
                    start + chrono::Duration::days(i as i64),
                    open,
                    close + 1.0,
                    open - 1.0,
                    close,
                    1_000,
                )
            })
            .collect();
        BarSeries::new("TEST", bars)
    }

    #[test]
    fn next_bar_open_fills() {
        let s = series(10);
        let strat = FixedSchedule::round_trip(2, 4);
        let out = simulate(&s, &strat, &SimConfig::default()).unwrap();
        assert_eq!(out.trades.len(), 1);
        let t = &out.trades[0];
        assert_eq!(t.entry_index, 3);
        assert_eq!(t.exit_index, 5);
        assert_eq!(t.entry_price, s.bars()[3].open);
        assert_eq!(t.exit_price, s.bars()[5].open);
        assert_eq!(out.equity.len(), 10);
    }

    #[test]
    fn signal_bar_close_fills() {
        let s = series(10);
        let strat = FixedSchedule::round_trip(2, 4);
        let cfg = SimConfig {
            fill_convention: FillConvention::SignalBarClose,
            ..SimConfig::default()
        };
        let out = simulate(&s, &strat, &cfg).unwrap();
        let t = &out.trades[0];
        assert_eq!(t.entry_index, 2);
        assert_eq!(t.exit_index, 4);
        assert_eq!(t.entry_price, s.bars()[2].close);
    }

    #[test]
    fn entry_on_last_bar_never_fills() {
        let s = series(5);
        let strat = FixedSchedule::new(vec![4], vec![]);
        let out = simulate(&s, &strat, &SimConfig::default()).unwrap();
        assert!(out.fills.is_empty());
        assert!(out.trades.is_empty());
        assert_eq!(out.final_equity(), Some(100_000.0));
    }

    #[test]
    fn force_close_at_end() {
        let s = series(8);
        let strat = FixedSchedule::new(vec![1], vec![]);
        let out = simulate(&s, &strat, &SimConfig::default()).unwrap();
        assert_eq!(out.trades.len(), 1);
        assert_eq!(out.trades[0].exit_reason, ExitReason::EndOfData);
        assert_eq!(out.trades[0].exit_index, 7);
        assert_eq!(out.trades[0].exit_price, s.bars()[7].close);
        assert!(out.open_position.is_none());

        let cfg = SimConfig {
            force_close_at_end: false,
            ..SimConfig::default()
        };
        let out = simulate(&s, &strat, &cfg).unwrap();
        assert!(out.trades.is_empty());
        let open = out.open_position.unwrap();
        assert_eq!(open.entry_index, 2);
    }

    #[test]
    fn exit_right_after_entry_fill_is_honoured() {
        let s = series(8);
        let strat = FixedSchedule::new(vec![2], vec![3]);
        let out = simulate(&s, &strat, &SimConfig::default()).unwrap();
        assert_eq!(out.trades.len(), 1);
        assert_eq!(out.trades[0].entry_index, 3);
        assert_eq!(out.trades[0].exit_index, 4);
        assert_eq!(out.trades[0].exit_reason, ExitReason::Signal);
    }

    #[test]
    fn invalid_bars_abort_with_data_error() {
        let mut bars = series(5).bars().to_vec();
        bars[2].close = f64::NAN;
        let s = BarSeries::new("BAD", bars);
        let err = simulate(&s, &FixedSchedule::round_trip(0, 1), &SimConfig::default()).unwrap_err();
        assert!(matches!(err, DataError::InvalidPrice { index: 2, .. }));
    }

    #[test]
    fn short_series_is_insufficient_history() {
        let s = series(10);
        let params = StrategyParams::MaCrossover {
            fast: 5,
            slow: 20,
            ma_type: Default::default(),
        };
        let err = run_strategy(&s, &params, &SimConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            RunError::Data(DataError::InsufficientHistory { required: 21, available: 10, .. })
        ));
    }

    #[test]
    fn run_strategy_rejects_bad_config() {
        let s = series(10);
        let cfg = SimConfig {
            cost_model: CostModel::new(f64::INFINITY, 0.0),
            ..SimConfig::default()
        };
        let params = StrategyParams::FixedSchedule {
            entries: vec![1],
            exits: vec![3],
        };
        assert!(matches!(
            run_strategy(&s, &params, &cfg),
            Err(RunError::Config(_))
        ));
    }
}
