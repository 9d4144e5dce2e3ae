//! Backtest orchestration: indicators, signals, simulation, headline metrics.

use crate::domain::error::BacktestError;
use crate::domain::metrics;
use crate::domain::ohlcv::Bar;
use crate::domain::portfolio::EquityPoint;
use crate::domain::signal::Signal;
use crate::domain::simulator;
use crate::domain::strategy::Strategy;
use crate::domain::trade::Trade;
use serde::Serialize;

/// Outcome of one run. Built once by [`run_backtest`] and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyResult {
    pub total_return: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    /// Winning share of the simulator's closed trades.
    pub win_rate: f64,
    /// Closed trades in the simulator ledger.
    pub total_trades: usize,
    pub signals: Vec<Signal>,
    pub equity_curve: Vec<EquityPoint>,
    pub trades: Vec<Trade>,
    pub periods_per_year: f64,
}

pub fn run_backtest(
    strategy: &Strategy<'_>,
    bars: &[Bar],
    periods_per_year: Option<f64>,
) -> Result<StrategyResult, BacktestError> {
    let config = &strategy.config;
    let span = tracing::info_span!("backtest", strategy = strategy.id(), symbol = %config.symbol);
    let _guard = span.enter();

    let periods_per_year = match periods_per_year {
        Some(p) if p.is_finite() && p > 0.0 => p,
        Some(_) => {
            return Err(BacktestError::invalid_configuration(
                "periods_per_year",
                "must be a positive number",
            ));
        }
        None => config.timeframe.periods_per_year(),
    };

    tracing::info!(bars = bars.len(), "starting backtest");

    let indicators = strategy.compute_indicators(bars)?;
    let signals = strategy.generate_signals(bars, &indicators);
    let simulation = simulator::simulate(bars, &signals, config.cash, config.max_position_size)?;

    let returns = metrics::period_returns(&simulation.equity_curve);
    let total_return = metrics::total_return(&simulation.equity_curve, config.cash);
    let sharpe_ratio = metrics::sharpe_ratio(&returns, periods_per_year);
    let max_drawdown = metrics::max_drawdown(&simulation.equity_curve);

    let closed: Vec<&Trade> = simulation.trades.iter().filter(|t| t.is_closed()).collect();
    let wins = closed.iter().filter(|t| t.is_win()).count();
    let win_rate = if closed.is_empty() {
        0.0
    } else {
        wins as f64 / closed.len() as f64
    };

    tracing::info!(
        total_return,
        sharpe_ratio,
        max_drawdown,
        win_rate,
        total_trades = closed.len(),
        signals = signals.len(),
        skipped_signals = simulation.skipped_signals,
        final_cash = simulation.final_cash,
        final_position = simulation.final_position,
        "backtest completed"
    );

    Ok(StrategyResult {
        total_return,
        sharpe_ratio,
        max_drawdown,
        win_rate,
        total_trades: closed.len(),
        signals,
        equity_curve: simulation.equity_curve,
        trades: simulation.trades,
        periods_per_year,
    })
}
