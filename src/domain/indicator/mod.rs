//! Indicator engine.
//!
//! Produces one [`IndicatorPoint`] per bar: the smoothed price, fast and slow
//! EMAs of that price, and the resulting ActionZone classification.

pub mod ema;
pub mod zone;

pub use zone::{Zone, ZoneFlags};

use crate::domain::error::BacktestError;
use crate::domain::ohlcv::Bar;
use chrono::NaiveDateTime;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndicatorParams {
    pub fast_period: usize,
    pub slow_period: usize,
    pub smoothing: usize,
}

impl IndicatorParams {
    pub fn new(
        fast_period: usize,
        slow_period: usize,
        smoothing: usize,
    ) -> Result<Self, BacktestError> {
        for (name, value) in [
            ("fast_period", fast_period),
            ("slow_period", slow_period),
            ("smoothing", smoothing),
        ] {
            if value == 0 {
                return Err(BacktestError::invalid_parameter(name, "must be positive"));
            }
        }
        Ok(IndicatorParams {
            fast_period,
            slow_period,
            smoothing,
        })
    }

    /// Bars needed before both averages can be defined.
    pub fn warmup_bars(&self) -> usize {
        self.fast_period.max(self.slow_period)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorPoint {
    pub timestamp: NaiveDateTime,
    pub price: Option<f64>,
    pub fast_ma: Option<f64>,
    pub slow_ma: Option<f64>,
    pub zone: Option<Zone>,
}

impl IndicatorPoint {
    pub fn in_zone(&self, zone: Zone) -> bool {
        self.zone == Some(zone)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorTable {
    pub params: IndicatorParams,
    pub points: Vec<IndicatorPoint>,
}

impl IndicatorTable {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

pub fn compute_indicators(
    bars: &[Bar],
    fast_period: usize,
    slow_period: usize,
    smoothing: usize,
) -> Result<IndicatorTable, BacktestError> {
    let params = IndicatorParams::new(fast_period, slow_period, smoothing)?;
    Ok(compute_with_params(bars, params))
}

pub fn compute_with_params(bars: &[Bar], params: IndicatorParams) -> IndicatorTable {
    let closes: Vec<Option<f64>> = bars.iter().map(|bar| Some(bar.close)).collect();
    let price = ema::calculate_ema(&closes, params.smoothing);
    let fast_ma = ema::calculate_ema(&price, params.fast_period);
    let slow_ma = ema::calculate_ema(&price, params.slow_period);

    let points = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| IndicatorPoint {
            timestamp: bar.timestamp,
            price: price[i],
            fast_ma: fast_ma[i],
            slow_ma: slow_ma[i],
            zone: zone::classify(price[i], fast_ma[i], slow_ma[i]),
        })
        .collect();

    IndicatorTable { params, points }
}
