//! Cash, position and the append-only fill/trade ledger of one run.

use chrono::NaiveDate;

use super::{CostModel, PositionSizing};
use crate::domain::{ExitReason, Fill, Position, Side, Trade};

#[derive(Debug)]
pub(crate) struct Ledger {
    cash: f64,
    cost: CostModel,
    sizing: PositionSizing,
    position: Option<Position>,
    fills: Vec<Fill>,
    trades: Vec<Trade>,
}

impl Ledger {
    pub(crate) fn new(initial_cash: f64, cost: CostModel, sizing: PositionSizing) -> Self {
        Self {
            cash: initial_cash,
            cost,
            sizing,
            position: None,
            fills: Vec::new(),
            trades: Vec::new(),
        }
    }

    pub(crate) fn cash(&self) -> f64 {
        self.cash
    }

    pub(crate) fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub(crate) fn position_qty(&self) -> f64 {
        self.position.as_ref().map_or(0.0, |p| p.quantity)
    }

    /// Units bought at `price`; notional plus fee stays within the budget.
    /// `atr` is the signal-bar ATR, used only by volatility sizing.
    fn entry_quantity(&self, price: f64, atr: Option<f64>) -> f64 {
        let unit_cost = price * (1.0 + self.cost.fee_rate());
        if !(unit_cost > 0.0) || self.cash <= 0.0 {
            return 0.0;
        }
        let affordable = self.cash / unit_cost;
        match self.sizing {
            PositionSizing::FractionOfEquity { fraction } => affordable * fraction,
            PositionSizing::FixedQuantity { quantity } => quantity.min(affordable),
            PositionSizing::Volatility { risk_fraction, .. } => match atr {
                Some(atr) if atr.is_finite() && atr > 0.0 => {
                    (risk_fraction * self.cash / atr).min(affordable)
                }
                _ => 0.0,
            },
        }
    }

    /// Open a long position. Returns false when nothing could be bought.
    pub(crate) fn buy(
        &mut self,
        signal_index: usize,
        bar_index: usize,
        date: NaiveDate,
        reference_price: f64,
        atr: Option<f64>,
    ) -> bool {
        if self.position.is_some() {
            return false;
        }
        let price = self.cost.fill_price(reference_price, Side::Buy);
        let quantity = self.entry_quantity(price, atr);
        if !(quantity > 0.0) {
            tracing::debug!(bar_index, cash = self.cash, "entry skipped: nothing affordable");
            return false;
        }
        let fee = self.cost.fee(price, quantity);
        self.cash -= price * quantity + fee;
        self.fills.push(Fill {
            side: Side::Buy,
            bar_index,
            date,
            reference_price,
            price,
            quantity,
            fee,
        });
        self.position = Some(Position {
            quantity,
            signal_index,
            entry_index: bar_index,
            entry_date: date,
            entry_price: price,
            entry_fee: fee,
        });
        true
    }

    /// Close the open position and append the round trip.
    pub(crate) fn sell(
        &mut self,
        bar_index: usize,
        date: NaiveDate,
        reference_price: f64,
        reason: ExitReason,
    ) -> Option<&Trade> {
        let position = self.position.take()?;
        let price = self.cost.fill_price(reference_price, Side::Sell);
        let quantity = position.quantity;
        let fee = self.cost.fee(price, quantity);
        self.cash += price * quantity - fee;
        self.fills.push(Fill {
            side: Side::Sell,
            bar_index,
            date,
            reference_price,
            price,
            quantity,
            fee,
        });

        let gross_pnl = (price - position.entry_price) * quantity;
        let fees = position.entry_fee + fee;
        let net_pnl = gross_pnl - fees;
        let basis = position.cost_basis();
        self.trades.push(Trade {
            entry_index: position.entry_index,
            exit_index: bar_index,
            entry_date: position.entry_date,
            exit_date: date,
            entry_price: position.entry_price,
            exit_price: price,
            quantity,
            fees,
            gross_pnl,
            net_pnl,
            return_pct: if basis > 0.0 { net_pnl / basis } else { 0.0 },
            holding_bars: bar_index - position.entry_index,
            exit_reason: reason,
        });
        self.trades.last()
    }

    pub(crate) fn finish(self) -> (Vec<Trade>, Vec<Fill>, Option<Position>) {
        (self.trades, self.fills, self.position)
    }
}
