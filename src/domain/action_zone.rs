//! CDC ActionZone strategy (signal generator).
//!
//! buy edge  = bar enters green, sell edge = bar enters red.
//! Trend at bar t compares bars-since-last-buy-edge with bars-since-last-sell-edge.
//! BUY fires on a buy edge when the previous bar was bearish, SELL on a
//! sell edge when the previous bar was bullish. Bar 0 never fires.

use crate::domain::error::BacktestError;
use crate::domain::indicator::{self, IndicatorParams, IndicatorPoint, IndicatorTable, Zone};
use crate::domain::ohlcv::Bar;
use crate::domain::signal::{MetadataValue, OrderSide, Signal};
use crate::domain::strategy::{ParameterKind, ParameterSpec, StrategyConfig, StrategyDefinition};
use serde::Serialize;
use std::collections::BTreeMap;

pub const STRATEGY_ID: &str = "cdc_actionzone";
pub const BUY_SIGNAL_TYPE: &str = "CDC_ActionZone_Buy";
pub const SELL_SIGNAL_TYPE: &str = "CDC_ActionZone_Sell";
const METADATA_STRATEGY: &str = "CDC_ActionZone";

pub fn definition() -> StrategyDefinition {
    StrategyDefinition {
        id: STRATEGY_ID,
        display_name: "CDC ActionZone",
        description: "EMA zone crossover with bars-since trend confirmation",
        parameters: parameter_specs(),
        check_parameters,
        compute_indicators,
        generate_signals,
    }
}

fn parameter_specs() -> Vec<ParameterSpec> {
    vec![
        ParameterSpec {
            name: "fast_period",
            kind: ParameterKind::Int,
            default: 12.0,
            min: 5.0,
            max: 50.0,
            description: "span of the fast EMA",
        },
        ParameterSpec {
            name: "slow_period",
            kind: ParameterKind::Int,
            default: 26.0,
            min: 10.0,
            max: 100.0,
            description: "span of the slow EMA",
        },
        ParameterSpec {
            name: "smoothing",
            kind: ParameterKind::Int,
            default: 1.0,
            min: 1.0,
            max: 10.0,
            description: "span of the EMA applied to close before the averages",
        },
    ]
}

/// Resolves the three periods from `config`, falling back to documented defaults.
pub fn indicator_params(config: &StrategyConfig) -> Result<IndicatorParams, BacktestError> {
    let mut resolved = [0usize; 3];

    for (slot, spec) in resolved.iter_mut().zip(parameter_specs().iter()) {
        let value = config.parameter(spec.name).unwrap_or(spec.default);
        spec.check_type(value)
            .map_err(|reason| BacktestError::invalid_parameter(spec.name, reason))?;
        if value < 1.0 {
            return Err(BacktestError::invalid_parameter(spec.name, "must be positive"));
        }
        if !spec.in_range(value) {
            tracing::warn!(
                parameter = spec.name,
                value,
                min = spec.min,
                max = spec.max,
                "parameter outside documented range"
            );
        }
        *slot = value as usize;
    }

    IndicatorParams::new(resolved[0], resolved[1], resolved[2])
}

fn check_parameters(config: &StrategyConfig) -> Result<(), BacktestError> {
    indicator_params(config).map(|_| ())
}

fn compute_indicators(bars: &[Bar], config: &StrategyConfig) -> Result<IndicatorTable, BacktestError> {
    let params = indicator_params(config)?;
    Ok(indicator::compute_with_params(bars, params))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Bullish,
    Bearish,
    Undefined,
}

/// Bars elapsed since `conditions` was last true; `None` if never.
pub fn bars_since(conditions: &[bool]) -> Vec<Option<usize>> {
    let mut last_true: Option<usize> = None;
    conditions
        .iter()
        .enumerate()
        .map(|(i, &condition)| {
            if condition {
                last_true = Some(i);
            }
            last_true.map(|last| i - last)
        })
        .collect()
}

/// True on bars that are in `zone` while the previous bar was not.
pub fn zone_entries(points: &[IndicatorPoint], zone: Zone) -> Vec<bool> {
    let mut previous = false;
    points
        .iter()
        .map(|point| {
            let current = point.in_zone(zone);
            let entered = current && !previous;
            previous = current;
            entered
        })
        .collect()
}

/// `None` stands for "never", which compares greater than any count.
pub fn trend_from(since_buy: Option<usize>, since_sell: Option<usize>) -> Trend {
    match (since_buy, since_sell) {
        (Some(buy), Some(sell)) if buy < sell => Trend::Bullish,
        (Some(buy), Some(sell)) if sell < buy => Trend::Bearish,
        (Some(_), None) => Trend::Bullish,
        (None, Some(_)) => Trend::Bearish,
        _ => Trend::Undefined,
    }
}

/// Per-bar edges and trend, exposed for reporting and debugging.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalFrame {
    pub buy_edge: Vec<bool>,
    pub sell_edge: Vec<bool>,
    pub trend: Vec<Trend>,
}

pub fn analyze(indicators: &IndicatorTable) -> SignalFrame {
    let buy_edge = zone_entries(&indicators.points, Zone::Green);
    let sell_edge = zone_entries(&indicators.points, Zone::Red);
    let trend = bars_since(&buy_edge)
        .into_iter()
        .zip(bars_since(&sell_edge))
        .map(|(since_buy, since_sell)| trend_from(since_buy, since_sell))
        .collect();

    SignalFrame {
        buy_edge,
        sell_edge,
        trend,
    }
}

pub fn generate_signals(
    bars: &[Bar],
    indicators: &IndicatorTable,
    config: &StrategyConfig,
) -> Vec<Signal> {
    if bars.len() < indicators.params.warmup_bars() {
        tracing::debug!(
            bars = bars.len(),
            required = indicators.params.warmup_bars(),
            "insufficient bars for signal generation"
        );
        return Vec::new();
    }
    if bars.len() != indicators.len() {
        tracing::warn!(
            bars = bars.len(),
            indicators = indicators.len(),
            "indicator table does not match bar series"
        );
        return Vec::new();
    }

    let frame = analyze(indicators);
    let mut signals = Vec::new();

    for t in 1..bars.len() {
        let bar = &bars[t];
        let point = &indicators.points[t];

        if frame.trend[t - 1] == Trend::Bearish && frame.buy_edge[t] {
            let quantity = if bar.close > 0.0 {
                config.cash * config.max_position_size / bar.close
            } else {
                0.0
            };
            let mut metadata = base_metadata(point, Zone::Green);
            metadata.insert("was_bearish".into(), true.into());
            metadata.insert("buycond".into(), true.into());

            tracing::debug!(timestamp = %bar.timestamp, price = bar.close, "buy signal generated");
            signals.push(Signal {
                timestamp: bar.timestamp,
                symbol: config.symbol.clone(),
                side: OrderSide::Buy,
                price: bar.close,
                quantity,
                signal_type: BUY_SIGNAL_TYPE.to_string(),
                metadata,
            });
        } else if frame.trend[t - 1] == Trend::Bullish && frame.sell_edge[t] {
            let mut metadata = base_metadata(point, Zone::Red);
            metadata.insert("was_bullish".into(), true.into());
            metadata.insert("sellcond".into(), true.into());

            tracing::debug!(timestamp = %bar.timestamp, price = bar.close, "sell signal generated");
            signals.push(Signal {
                timestamp: bar.timestamp,
                symbol: config.symbol.clone(),
                side: OrderSide::Sell,
                price: bar.close,
                quantity: 0.0,
                signal_type: SELL_SIGNAL_TYPE.to_string(),
                metadata,
            });
        }
    }

    tracing::info!(
        total_signals = signals.len(),
        buy_signals = signals.iter().filter(|s| s.is_buy()).count(),
        sell_signals = signals.iter().filter(|s| s.is_sell()).count(),
        "signals calculated"
    );
    signals
}

fn base_metadata(point: &IndicatorPoint, zone: Zone) -> BTreeMap<String, MetadataValue> {
    let mut metadata = BTreeMap::new();
    metadata.insert("strategy".into(), METADATA_STRATEGY.into());
    metadata.insert("zone".into(), zone.label().into());
    if let Some(fast) = point.fast_ma {
        metadata.insert("fast_ma".into(), fast.into());
    }
    if let Some(slow) = point.slow_ma {
        metadata.insert("slow_ma".into(), slow.into());
    }
    metadata
}
