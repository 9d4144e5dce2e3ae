//! Round-trip trade records.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeStatus {
    Closed,
    Open,
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeStatus::Closed => f.write_str("CLOSED"),
            TradeStatus::Open => f.write_str("OPEN"),
        }
    }
}

/// A BUY paired with the SELL that closed it. Exit fields stay `None` while open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,
    pub exit_time: Option<NaiveDateTime>,
    pub exit_price: Option<f64>,
    pub quantity: f64,
    pub profit_loss: Option<f64>,
    pub profit_loss_pct: Option<f64>,
    pub duration_days: Option<i64>,
    pub status: TradeStatus,
    pub entry_signal: String,
    pub exit_signal: Option<String>,
}

impl Trade {
    pub fn open(entry_time: NaiveDateTime, entry_price: f64, quantity: f64, entry_signal: &str) -> Self {
        Trade {
            entry_time,
            entry_price,
            exit_time: None,
            exit_price: None,
            quantity,
            profit_loss: None,
            profit_loss_pct: None,
            duration_days: None,
            status: TradeStatus::Open,
            entry_signal: entry_signal.to_string(),
            exit_signal: None,
        }
    }

    pub fn close(&mut self, exit_time: NaiveDateTime, exit_price: f64, exit_signal: &str) {
        let entry_value = self.entry_price * self.quantity;
        let profit_loss = exit_price * self.quantity - entry_value;

        self.exit_time = Some(exit_time);
        self.exit_price = Some(exit_price);
        self.profit_loss = Some(profit_loss);
        self.profit_loss_pct = Some(if entry_value > 0.0 {
            profit_loss / entry_value * 100.0
        } else {
            0.0
        });
        self.duration_days = Some((exit_time - self.entry_time).num_days());
        self.status = TradeStatus::Closed;
        self.exit_signal = Some(exit_signal.to_string());
    }

    pub fn is_closed(&self) -> bool {
        self.status == TradeStatus::Closed
    }

    /// Break-even counts as a loss.
    pub fn is_win(&self) -> bool {
        self.profit_loss.is_some_and(|pnl| pnl > 0.0)
    }
}
