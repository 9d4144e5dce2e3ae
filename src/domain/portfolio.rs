//! Single-asset, long-only portfolio state and equity tracking.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::position::Position;
use super::trade::Trade;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    pub equity: f64,
}

/// Result of offering one order to the portfolio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FillOutcome {
    Bought { quantity: f64, cost: f64 },
    Sold { quantity: f64, proceeds: f64 },
    AlreadyLong,
    Flat,
    Unaffordable { cost: f64, cash: f64 },
    InvalidPrice,
}

impl FillOutcome {
    pub fn is_fill(&self) -> bool {
        matches!(self, FillOutcome::Bought { .. } | FillOutcome::Sold { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub cash: f64,
    pub initial_cash: f64,
    pub position: Option<Position>,
    pub closed_trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
}

impl Portfolio {
    pub fn new(initial_cash: f64) -> Self {
        Portfolio {
            cash: initial_cash,
            initial_cash,
            position: None,
            closed_trades: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    pub fn is_long(&self) -> bool {
        self.position.is_some()
    }

    pub fn position_quantity(&self) -> f64 {
        self.position.as_ref().map_or(0.0, |p| p.quantity)
    }

    /// Opens a position if flat and `quantity × price` fits in cash. No partial fills.
    pub fn buy(
        &mut self,
        timestamp: NaiveDateTime,
        price: f64,
        quantity: f64,
        signal_type: &str,
    ) -> FillOutcome {
        if self.is_long() {
            return FillOutcome::AlreadyLong;
        }
        if !(price > 0.0 && price.is_finite() && quantity > 0.0 && quantity.is_finite()) {
            return FillOutcome::InvalidPrice;
        }

        let cost = quantity * price;
        if cost > self.cash {
            return FillOutcome::Unaffordable {
                cost,
                cash: self.cash,
            };
        }

        self.cash -= cost;
        self.position = Some(Position {
            quantity,
            entry_price: price,
            entry_time: timestamp,
            entry_signal: signal_type.to_string(),
        });
        FillOutcome::Bought { quantity, cost }
    }

    /// Closes the whole position at `price`.
    pub fn sell(&mut self, timestamp: NaiveDateTime, price: f64, signal_type: &str) -> FillOutcome {
        let Some(position) = self.position.take() else {
            return FillOutcome::Flat;
        };

        let proceeds = position.market_value(price);
        self.cash += proceeds;

        let mut trade = Trade::open(
            position.entry_time,
            position.entry_price,
            position.quantity,
            &position.entry_signal,
        );
        trade.close(timestamp, price, signal_type);
        self.closed_trades.push(trade);

        FillOutcome::Sold {
            quantity: position.quantity,
            proceeds,
        }
    }

    pub fn total_equity(&self, price: f64) -> f64 {
        self.cash
            + self
                .position
                .as_ref()
                .map_or(0.0, |p| p.market_value(price))
    }

    pub fn record_equity(&mut self, timestamp: NaiveDateTime, equity: f64) {
        self.equity_curve.push(EquityPoint { timestamp, equity });
    }

    /// Closed trades followed by the still-open position, if any.
    pub fn ledger(&self) -> Vec<Trade> {
        let mut trades = self.closed_trades.clone();
        if let Some(position) = &self.position {
            trades.push(Trade::open(
                position.entry_time,
                position.entry_price,
                position.quantity,
                &position.entry_signal,
            ));
        }
        trades
    }
}
