//! Trade simulator: walks bars in order and applies signals to a FLAT/LONG portfolio.

use crate::domain::error::BacktestError;
use crate::domain::ohlcv::{self, Bar};
use crate::domain::portfolio::{EquityPoint, FillOutcome, Portfolio};
use crate::domain::signal::{OrderSide, Signal};
use crate::domain::strategy::validate_capital;
use crate::domain::trade::Trade;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Simulation {
    pub equity_curve: Vec<EquityPoint>,
    /// Closed trades in exit order, then the open trade if one remains.
    pub trades: Vec<Trade>,
    pub final_cash: f64,
    pub final_position: f64,
    /// Signals that did not change the position.
    pub skipped_signals: usize,
}

pub fn simulate(
    bars: &[Bar],
    signals: &[Signal],
    initial_cash: f64,
    max_position_size: f64,
) -> Result<Simulation, BacktestError> {
    validate_capital(initial_cash, max_position_size)?;
    if !ohlcv::is_strictly_ordered(bars) {
        return Err(BacktestError::Data {
            reason: "bar timestamps must be strictly increasing".to_string(),
        });
    }

    let mut portfolio = Portfolio::new(initial_cash);

    if bars.is_empty() {
        portfolio.record_equity(NaiveDateTime::default(), initial_cash);
        return Ok(finish(portfolio, signals.len()));
    }

    let mut by_timestamp: HashMap<NaiveDateTime, Vec<&Signal>> = HashMap::new();
    for signal in signals {
        by_timestamp.entry(signal.timestamp).or_default().push(signal);
    }

    let mut applied = 0usize;
    let mut filled = 0usize;

    for (i, bar) in bars.iter().enumerate() {
        if let Some(pending) = by_timestamp.get(&bar.timestamp) {
            for signal in pending {
                applied += 1;
                let outcome = apply(&mut portfolio, bar, signal, max_position_size);
                if outcome.is_fill() {
                    filled += 1;
                }
                log_outcome(bar, signal, &outcome);
            }
        }

        let equity = if i == 0 {
            initial_cash
        } else {
            portfolio.total_equity(bar.close)
        };
        portfolio.record_equity(bar.timestamp, equity);
    }

    let unmatched = signals.len() - applied;
    if unmatched > 0 {
        tracing::debug!(unmatched, "signals without a matching bar were ignored");
    }

    Ok(finish(portfolio, signals.len() - filled))
}

fn apply(portfolio: &mut Portfolio, bar: &Bar, signal: &Signal, max_position_size: f64) -> FillOutcome {
    match signal.side {
        OrderSide::Buy => {
            let quantity = if signal.quantity > 0.0 && signal.quantity.is_finite() {
                signal.quantity
            } else if bar.close > 0.0 {
                portfolio.cash * max_position_size / bar.close
            } else {
                0.0
            };
            portfolio.buy(bar.timestamp, bar.close, quantity, &signal.signal_type)
        }
        OrderSide::Sell => portfolio.sell(bar.timestamp, bar.close, &signal.signal_type),
    }
}

fn log_outcome(bar: &Bar, signal: &Signal, outcome: &FillOutcome) {
    match outcome {
        FillOutcome::Bought { quantity, cost } => {
            tracing::debug!(timestamp = %bar.timestamp, quantity, price = bar.close, cost, "buy executed");
        }
        FillOutcome::Sold { quantity, proceeds } => {
            tracing::debug!(timestamp = %bar.timestamp, quantity, price = bar.close, proceeds, "sell executed");
        }
        FillOutcome::Unaffordable { cost, cash } => {
            tracing::debug!(timestamp = %bar.timestamp, cost, cash, "buy skipped: insufficient cash");
        }
        other => {
            tracing::trace!(timestamp = %bar.timestamp, side = %signal.side, outcome = ?other, "signal ignored");
        }
    }
}

fn finish(portfolio: Portfolio, skipped_signals: usize) -> Simulation {
    Simulation {
        trades: portfolio.ledger(),
        final_cash: portfolio.cash,
        final_position: portfolio.position_quantity(),
        equity_curve: portfolio.equity_curve,
        skipped_signals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trade::TradeStatus;
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn ts(i: usize) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + chrono::Duration::days(i as i64)
    }

    fn make_bars(prices: &[f64]) -> Vec<Bar> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                timestamp: ts(i),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000.0,
            })
            .collect()
    }

    fn signal(i: usize, side: OrderSide, price: f64, quantity: f64) -> Signal {
        Signal {
            timestamp: ts(i),
            symbol: "TEST".into(),
            side,
            price,
            quantity,
            signal_type: format!("{side}"),
            metadata: BTreeMap::new(),
        }
    }

    #[test]
    fn rejects_bad_capital() {
        let bars = make_bars(&[100.0]);
        assert!(matches!(
            simulate(&bars, &[], 0.0, 0.1),
            Err(BacktestError::InvalidConfiguration { .. })
        ));
        assert!(matches!(
            simulate(&bars, &[], 1000.0, 1.01),
            Err(BacktestError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn empty_bars_yield_single_anchor_point() {
        let sim = simulate(&[], &[], 1000.0, 0.1).unwrap();
        assert_eq!(sim.equity_curve.len(), 1);
        assert_eq!(sim.equity_curve[0].equity, 1000.0);
        assert_eq!(sim.equity_curve[0].timestamp, NaiveDateTime::default());
        assert!(sim.trades.is_empty());
    }

    #[test]
    fn single_bar_keeps_initial_cash() {
        let sim = simulate(&make_bars(&[100.0]), &[], 1000.0, 0.1).unwrap();
        assert_eq!(sim.equity_curve.len(), 1);
        assert_eq!(sim.equity_curve[0].equity, 1000.0);
    }

    #[test]
    fn buy_and_sell_mark_to_market() {
        let bars = make_bars(&[100.0, 105.0, 95.0, 110.0, 90.0, 120.0]);
        let signals = vec![
            signal(3, OrderSide::Buy, 110.0, 100.0 / 110.0),
            signal(4, OrderSide::Sell, 90.0, 0.0),
        ];
        let sim = simulate(&bars, &signals, 1000.0, 0.1).unwrap();

        let equity: Vec<f64> = sim.equity_curve.iter().map(|p| p.equity).collect();
        assert_eq!(equity[..3], [1000.0, 1000.0, 1000.0]);
        assert!((equity[3] - 1000.0).abs() < 1e-9);
        let expected_after_sell = 1000.0 - 100.0 + 100.0 / 110.0 * 90.0;
        assert!((equity[4] - expected_after_sell).abs() < 1e-9);
        assert!((equity[5] - expected_after_sell).abs() < 1e-9);

        assert_eq!(sim.trades.len(), 1);
        assert_eq!(sim.trades[0].status, TradeStatus::Closed);
        assert_eq!(sim.final_position, 0.0);
        assert_eq!(sim.skipped_signals, 0);
    }

    #[test]
    fn ignores_buy_while_long_and_sell_while_flat() {
        let bars = make_bars(&[100.0, 100.0, 100.0, 100.0]);
        let signals = vec![
            signal(0, OrderSide::Sell, 100.0, 0.0),
            signal(1, OrderSide::Buy, 100.0, 1.0),
            signal(2, OrderSide::Buy, 100.0, 1.0),
        ];
        let sim = simulate(&bars, &signals, 1000.0, 0.1).unwrap();
        assert!((sim.final_position - 1.0).abs() < f64::EPSILON);
        assert_eq!(sim.skipped_signals, 2);
        assert_eq!(sim.trades.len(), 1);
        assert_eq!(sim.trades[0].status, TradeStatus::Open);
    }

    #[test]
    fn unaffordable_buy_is_skipped_without_partial_fill() {
        let bars = make_bars(&[100.0, 100.0]);
        let signals = vec![signal(1, OrderSide::Buy, 100.0, 20.0)];
        let sim = simulate(&bars, &signals, 1000.0, 0.1).unwrap();
        assert_eq!(sim.final_position, 0.0);
        assert_eq!(sim.final_cash, 1000.0);
        assert_eq!(sim.skipped_signals, 1);
    }

    #[test]
    fn placeholder_quantity_sized_from_cash() {
        let bars = make_bars(&[100.0, 50.0]);
        let signals = vec![signal(1, OrderSide::Buy, 50.0, 0.0)];
        let sim = simulate(&bars, &signals, 1000.0, 0.5).unwrap();
        assert!((sim.final_position - 10.0).abs() < 1e-12);
        assert!((sim.final_cash - 500.0).abs() < 1e-9);
    }

    #[test]
    fn signals_on_one_bar_apply_in_list_order() {
        let bars = make_bars(&[100.0, 100.0]);
        let signals = vec![
            signal(1, OrderSide::Buy, 100.0, 1.0),
            signal(1, OrderSide::Sell, 100.0, 0.0),
        ];
        let sim = simulate(&bars, &signals, 1000.0, 0.1).unwrap();
        assert_eq!(sim.final_position, 0.0);
        assert_eq!(sim.trades.len(), 1);
        assert!(sim.trades[0].is_closed());
    }

    #[test]
    fn unmatched_signal_is_skipped() {
        let bars = make_bars(&[100.0, 100.0]);
        let signals = vec![signal(9, OrderSide::Buy, 100.0, 1.0)];
        let sim = simulate(&bars, &signals, 1000.0, 0.1).unwrap();
        assert_eq!(sim.skipped_signals, 1);
        assert_eq!(sim.final_position, 0.0);
    }

    #[test]
    fn duplicate_bar_timestamps_are_rejected() {
        let mut bars = make_bars(&[100.0, 101.0]);
        bars[0].timestamp = ts(1);
        let signals = vec![
            signal(1, OrderSide::Buy, 100.0, 1.0),
            signal(1, OrderSide::Sell, 101.0, 0.0),
        ];
        assert!(matches!(
            simulate(&bars, &signals, 1000.0, 0.1),
            Err(BacktestError::Data { reason }) if reason.contains("strictly increasing")
        ));
    }

    #[test]
    fn out_of_order_bars_are_rejected() {
        let mut bars = make_bars(&[100.0, 101.0, 102.0]);
        bars.swap(1, 2);
        assert!(matches!(
            simulate(&bars, &[], 1000.0, 0.1),
            Err(BacktestError::Data { .. })
        ));
    }

    /// Closed and open trade counts of a FLAT/LONG walk where every BUY while flat fills.
    fn accepted_pairs(sides: &[bool]) -> (usize, bool) {
        let mut long = false;
        let mut closed = 0;
        for &is_buy in sides {
            if is_buy && !long {
                long = true;
            } else if !is_buy && long {
                long = false;
                closed += 1;
            }
        }
        (closed, long)
    }

    fn arb_sides() -> impl Strategy<Value = (Vec<f64>, Vec<(usize, bool)>)> {
        prop::collection::vec(1.0f64..500.0, 1..60).prop_flat_map(|prices| {
            let n = prices.len();
            let sides = prop::collection::vec((0..n, any::<bool>()), 0..30);
            (Just(prices), sides)
        })
    }

    fn arb_case() -> impl Strategy<Value = (Vec<f64>, Vec<(usize, bool, f64)>)> {
        prop::collection::vec(1.0f64..500.0, 1..60).prop_flat_map(|prices| {
            let n = prices.len();
            let signals = prop::collection::vec((0..n, any::<bool>(), 0.0f64..40.0), 0..20);
            (Just(prices), signals)
        })
    }

    proptest! {
        #[test]
        fn anchor_cash_and_idempotence((prices, raw) in arb_case()) {
            let bars = make_bars(&prices);
            let mut raw = raw;
            raw.sort_by_key(|(i, _, _)| *i);
            let signals: Vec<Signal> = raw
                .iter()
                .map(|&(i, is_buy, qty)| {
                    let side = if is_buy { OrderSide::Buy } else { OrderSide::Sell };
                    signal(i, side, prices[i], qty)
                })
                .collect();

            let first = simulate(&bars, &signals, 1000.0, 0.25).unwrap();
            let second = simulate(&bars, &signals, 1000.0, 0.25).unwrap();

            prop_assert_eq!(first.equity_curve[0].equity, 1000.0);
            prop_assert_eq!(first.equity_curve.len(), bars.len());
            prop_assert!(first.final_cash >= 0.0);
            prop_assert!(first.trades.iter().filter(|t| !t.is_closed()).count() <= 1);
            prop_assert_eq!(&first, &second);
        }

        #[test]
        fn closed_trades_equal_accepted_buy_sell_pairs((prices, raw) in arb_sides()) {
            let bars = make_bars(&prices);
            let mut raw = raw;
            raw.sort_by_key(|(i, _)| *i);
            let signals: Vec<Signal> = raw
                .iter()
                .map(|&(i, is_buy)| {
                    let side = if is_buy { OrderSide::Buy } else { OrderSide::Sell };
                    signal(i, side, prices[i], 0.0)
                })
                .collect();
            let sides: Vec<bool> = raw.iter().map(|&(_, is_buy)| is_buy).collect();
            let (closed, ends_long) = accepted_pairs(&sides);

            let sim = simulate(&bars, &signals, 1000.0, 0.25).unwrap();

            prop_assert_eq!(sim.trades.iter().filter(|t| t.is_closed()).count(), closed);
            prop_assert_eq!(sim.trades.len(), closed + usize::from(ends_long));
            prop_assert_eq!(sim.final_position > 0.0, ends_long);
            let fills = 2 * closed + usize::from(ends_long);
            prop_assert_eq!(sim.skipped_signals, signals.len() - fills);
        }
    }
}
