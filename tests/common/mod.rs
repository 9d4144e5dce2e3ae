#![allow(dead_code)]

use actionzone::domain::error::BacktestError;
pub use actionzone::domain::ohlcv::Bar;
use actionzone::domain::strategy::StrategyConfig;
use actionzone::domain::timeframe::Timeframe;
use actionzone::ports::data_port::BarSource;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;

pub struct MockBarSource {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
}

impl MockBarSource {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl BarSource for MockBarSource {
    fn fetch_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        _timeframe: Timeframe,
    ) -> Result<Vec<Bar>, BacktestError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(BacktestError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(symbol)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date() >= start && b.date() <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_symbols(&self, _timeframe: Timeframe) -> Result<Vec<String>, BacktestError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn day(i: usize) -> NaiveDateTime {
    date(2024, 1, 1).and_hms_opt(0, 0, 0).unwrap() + chrono::Duration::days(i as i64)
}

pub fn make_bar(timestamp: NaiveDateTime, close: f64) -> Bar {
    Bar {
        timestamp,
        open: close,
        high: close + 1.0,
        low: (close - 1.0).max(0.0),
        close,
        volume: 1000.0,
    }
}

/// Daily bars from 2024-01-01, one per close.
pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| make_bar(day(i), close))
        .collect()
}

pub fn generate_bars(count: usize, start_price: f64, step: f64) -> Vec<Bar> {
    (0..count)
        .map(|i| make_bar(day(i), start_price + step * i as f64))
        .collect()
}

/// Closes that alternate in and out of the green and red zones with 2/3/1.
pub const ALTERNATING: [f64; 6] = [100.0, 105.0, 95.0, 110.0, 90.0, 120.0];

pub fn action_zone_config(fast: f64, slow: f64, smoothing: f64, cash: f64) -> StrategyConfig {
    let mut config = StrategyConfig::new("cdc_actionzone", "TEST")
        .with_parameter("fast_period", fast)
        .with_parameter("slow_period", slow)
        .with_parameter("smoothing", smoothing);
    config.cash = cash;
    config
}
