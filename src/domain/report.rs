//! Performance and risk analytics over a finished backtest.
//!
//! [`summarize`] rebuilds round-trip trades from the signal list, then derives
//! trade statistics, risk metrics, drawdown periods and monthly returns.
//! [`BacktestReport`] bundles the summary with run metadata for the report
//! adapters.

use crate::domain::backtest::StrategyResult;
use crate::domain::metrics::{self, Metrics};
use crate::domain::portfolio::EquityPoint;
use crate::domain::signal::{OrderSide, Signal};
use crate::domain::strategy::Strategy;
use crate::domain::timeframe::Timeframe;
use crate::domain::trade::{Trade, TradeStatus};
use chrono::{Datelike, NaiveDateTime};
use serde::Serialize;
use std::collections::BTreeMap;

const DISPLAY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";
const OPEN: &str = "OPEN";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Performance {
    pub total_return: f64,
    pub annualized_return: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub win_rate: f64,
    /// `null` in JSON when there are no losing trades.
    pub profit_factor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskMetrics {
    pub volatility: f64,
    pub var_95: f64,
    pub cvar_95: f64,
    pub calmar_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeStatistics {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub open_trades: usize,
    pub win_rate: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub max_win: f64,
    pub max_loss: f64,
    pub avg_duration_days: f64,
    pub profit_factor: f64,
    pub best_trade: Option<Trade>,
    pub worst_trade: Option<Trade>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawdownPeriod {
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub max_drawdown: f64,
    pub duration_days: i64,
    /// False when the series ends before equity regains its peak.
    pub recovered: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonthlyReturn {
    pub year: i32,
    pub month: u32,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub performance: Performance,
    pub risk_metrics: RiskMetrics,
    pub trade_statistics: TradeStatistics,
    pub drawdown_periods: Vec<DrawdownPeriod>,
    pub monthly_returns: Vec<MonthlyReturn>,
    pub trades: Vec<Trade>,
}

pub fn summarize(result: &StrategyResult, initial_cash: f64) -> Summary {
    let trades = reconstruct_trades(&result.signals);
    let trade_statistics = trade_statistics(&trades);
    let metrics = Metrics::compute(&result.equity_curve, initial_cash, result.periods_per_year);

    let calmar_ratio = if result.max_drawdown != 0.0 {
        metrics.annualized_return / result.max_drawdown.abs()
    } else {
        0.0
    };

    Summary {
        performance: Performance {
            total_return: result.total_return,
            annualized_return: metrics.annualized_return,
            sharpe_ratio: result.sharpe_ratio,
            max_drawdown: result.max_drawdown,
            win_rate: result.win_rate,
            profit_factor: trade_statistics.profit_factor,
        },
        risk_metrics: RiskMetrics {
            volatility: metrics.volatility,
            var_95: metrics.var_95,
            cvar_95: metrics.cvar_95,
            calmar_ratio,
        },
        trade_statistics,
        drawdown_periods: drawdown_periods(&result.equity_curve),
        monthly_returns: monthly_returns(&result.equity_curve),
        trades,
    }
}

/// Pairs each BUY with the next SELL. A BUY while a trade is open is ignored;
/// a SELL with nothing open is ignored; a trailing BUY stays open.
pub fn reconstruct_trades(signals: &[Signal]) -> Vec<Trade> {
    let mut trades = Vec::new();
    let mut current: Option<Trade> = None;

    for signal in signals {
        match signal.side {
            OrderSide::Buy if current.is_none() => {
                current = Some(Trade::open(
                    signal.timestamp,
                    signal.price,
                    signal.quantity,
                    &signal.signal_type,
                ));
            }
            OrderSide::Sell => {
                if let Some(mut trade) = current.take() {
                    trade.close(signal.timestamp, signal.price, &signal.signal_type);
                    trades.push(trade);
                }
            }
            OrderSide::Buy => {}
        }
    }

    trades.extend(current);
    trades
}

pub fn trade_statistics(trades: &[Trade]) -> TradeStatistics {
    let closed: Vec<&Trade> = trades.iter().filter(|t| t.is_closed()).collect();
    let open_trades = trades.len() - closed.len();

    let pnl = |t: &&Trade| t.profit_loss.unwrap_or(0.0);
    let wins: Vec<f64> = closed.iter().filter(|t| t.is_win()).map(pnl).collect();
    let losses: Vec<f64> = closed.iter().filter(|t| !t.is_win()).map(pnl).collect();

    let avg_win = metrics::mean(&wins).unwrap_or(0.0);
    let avg_loss = metrics::mean(&losses).unwrap_or(0.0);

    let profit_factor = if closed.is_empty() {
        0.0
    } else if avg_loss == 0.0 {
        f64::INFINITY
    } else {
        (avg_win / avg_loss).abs()
    };

    let best_trade = closed
        .iter()
        .copied()
        .max_by(|a, b| pnl(a).total_cmp(&pnl(b)))
        .cloned();
    let worst_trade = closed
        .iter()
        .copied()
        .min_by(|a, b| pnl(a).total_cmp(&pnl(b)))
        .cloned();

    let durations: Vec<f64> = closed
        .iter()
        .map(|t| t.duration_days.unwrap_or(0) as f64)
        .collect();

    TradeStatistics {
        total_trades: closed.len(),
        winning_trades: wins.len(),
        losing_trades: losses.len(),
        open_trades,
        win_rate: if closed.is_empty() {
            0.0
        } else {
            wins.len() as f64 / closed.len() as f64
        },
        avg_win,
        avg_loss,
        max_win: best_trade.as_ref().and_then(|t| t.profit_loss).unwrap_or(0.0),
        max_loss: worst_trade.as_ref().and_then(|t| t.profit_loss).unwrap_or(0.0),
        avg_duration_days: metrics::mean(&durations).unwrap_or(0.0),
        profit_factor,
        best_trade,
        worst_trade,
    }
}

/// Contiguous runs of negative drawdown. A run ends on the first point back at
/// its peak; a run still open at the last point is reported unrecovered.
pub fn drawdown_periods(equity_curve: &[EquityPoint]) -> Vec<DrawdownPeriod> {
    let drawdowns = metrics::drawdown_series(equity_curve);
    let mut periods = Vec::new();
    let mut current: Option<(NaiveDateTime, f64)> = None;

    for (point, &dd) in equity_curve.iter().zip(&drawdowns) {
        match current {
            None if dd < 0.0 => current = Some((point.timestamp, dd)),
            Some((start, worst)) if dd < 0.0 => current = Some((start, worst.min(dd))),
            Some((start, worst)) => {
                periods.push(DrawdownPeriod {
                    start_date: start,
                    end_date: point.timestamp,
                    max_drawdown: worst,
                    duration_days: (point.timestamp - start).num_days(),
                    recovered: true,
                });
                current = None;
            }
            None => {}
        }
    }

    if let (Some((start, worst)), Some(last)) = (current, equity_curve.last()) {
        periods.push(DrawdownPeriod {
            start_date: start,
            end_date: last.timestamp,
            max_drawdown: worst,
            duration_days: (last.timestamp - start).num_days(),
            recovered: false,
        });
    }

    periods
}

/// Compounded period returns per calendar month of the later point. Months
/// between the first and last observation with no returns report 0.
pub fn monthly_returns(equity_curve: &[EquityPoint]) -> Vec<MonthlyReturn> {
    let returns = metrics::period_returns(equity_curve);
    let mut buckets: BTreeMap<(i32, u32), f64> = BTreeMap::new();

    for (point, r) in equity_curve.iter().skip(1).zip(returns) {
        let key = (point.timestamp.year(), point.timestamp.month());
        *buckets.entry(key).or_insert(1.0) *= 1.0 + r;
    }

    let (Some(&first), Some(&last)) = (buckets.keys().next(), buckets.keys().next_back()) else {
        return Vec::new();
    };

    let mut months = Vec::new();
    let (mut year, mut month) = first;
    while (year, month) <= last {
        let growth = buckets.get(&(year, month)).copied().unwrap_or(1.0);
        months.push(MonthlyReturn {
            year,
            month,
            value: growth - 1.0,
        });
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }
    months
}

/// One display row per trade, numbered from 1.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeRow {
    pub trade_id: usize,
    pub entry_time: String,
    pub entry_price: String,
    pub entry_signal: String,
    pub quantity: String,
    pub exit_time: String,
    pub exit_price: String,
    pub exit_signal: String,
    pub profit_loss: String,
    pub profit_loss_pct: String,
    pub duration_days: String,
    pub status: String,
}

pub fn trade_list(trades: &[Trade]) -> Vec<TradeRow> {
    let or_open = |value: Option<String>| value.unwrap_or_else(|| OPEN.to_string());

    trades
        .iter()
        .enumerate()
        .map(|(i, trade)| TradeRow {
            trade_id: i + 1,
            entry_time: trade.entry_time.format(DISPLAY_TIME_FORMAT).to_string(),
            entry_price: format!("${:.2}", trade.entry_price),
            entry_signal: trade.entry_signal.clone(),
            quantity: format!("{:.2}", trade.quantity),
            exit_time: or_open(
                trade
                    .exit_time
                    .map(|t| t.format(DISPLAY_TIME_FORMAT).to_string()),
            ),
            exit_price: or_open(trade.exit_price.map(|p| format!("${p:.2}"))),
            exit_signal: or_open(trade.exit_signal.clone()),
            profit_loss: or_open(trade.profit_loss.map(|p| format!("${p:.2}"))),
            profit_loss_pct: or_open(trade.profit_loss_pct.map(|p| format!("{p:.2}%"))),
            duration_days: or_open(trade.duration_days.map(|d| d.to_string())),
            status: match trade.status {
                TradeStatus::Closed => "CLOSED".to_string(),
                TradeStatus::Open => OPEN.to_string(),
            },
        })
        .collect()
}

/// Everything a report adapter renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestReport {
    pub strategy: String,
    pub symbol: String,
    pub timeframe: Timeframe,
    pub parameters: BTreeMap<String, f64>,
    pub initial_cash: f64,
    pub max_position_size: f64,
    pub bars: usize,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub signals: Vec<Signal>,
    pub summary: Summary,
    pub trade_list: Vec<TradeRow>,
    pub equity_curve: Vec<EquityPoint>,
}

impl BacktestReport {
    pub fn new(strategy: &Strategy<'_>, result: &StrategyResult, bars: usize) -> Self {
        let config = &strategy.config;
        let summary = summarize(result, config.cash);
        let trade_list = trade_list(&summary.trades);
        let has_bars = bars > 0;

        BacktestReport {
            strategy: strategy.id().to_string(),
            symbol: config.symbol.clone(),
            timeframe: config.timeframe,
            parameters: config.parameters.clone(),
            initial_cash: config.cash,
            max_position_size: config.max_position_size,
            bars,
            start: result
                .equity_curve
                .first()
                .filter(|_| has_bars)
                .map(|p| p.timestamp),
            end: result
                .equity_curve
                .last()
                .filter(|_| has_bars)
                .map(|p| p.timestamp),
            signals: result.signals.clone(),
            summary,
            trade_list,
            equity_curve: result.equity_curve.clone(),
        }
    }
}
