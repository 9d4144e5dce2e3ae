//! Bar timeframe and its annualisation factor.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    Minute1,
    #[serde(rename = "5m")]
    Minute5,
    #[serde(rename = "15m")]
    Minute15,
    #[serde(rename = "30m")]
    Minute30,
    #[serde(rename = "1h")]
    Hour1,
    #[serde(rename = "4h")]
    Hour4,
    #[default]
    #[serde(rename = "1d")]
    Day1,
    #[serde(rename = "1w")]
    Week1,
}

impl Timeframe {
    /// Number of bars per year used to annualise Sharpe, volatility and return.
    ///
    /// Intraday factors assume a 6.5 hour regular session.
    pub fn periods_per_year(self) -> f64 {
        match self {
            Timeframe::Minute1 => TRADING_DAYS_PER_YEAR * 390.0,
            Timeframe::Minute5 => TRADING_DAYS_PER_YEAR * 78.0,
            Timeframe::Minute15 => TRADING_DAYS_PER_YEAR * 26.0,
            Timeframe::Minute30 => TRADING_DAYS_PER_YEAR * 13.0,
            Timeframe::Hour1 => TRADING_DAYS_PER_YEAR * 7.0,
            Timeframe::Hour4 => TRADING_DAYS_PER_YEAR * 2.0,
            Timeframe::Day1 => TRADING_DAYS_PER_YEAR,
            Timeframe::Week1 => 52.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Timeframe::Minute1 => "1m",
            Timeframe::Minute5 => "5m",
            Timeframe::Minute15 => "15m",
            Timeframe::Minute30 => "30m",
            Timeframe::Hour1 => "1h",
            Timeframe::Hour4 => "4h",
            Timeframe::Day1 => "1d",
            Timeframe::Week1 => "1w",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1m" | "1min" => Ok(Timeframe::Minute1),
            "5m" | "5min" => Ok(Timeframe::Minute5),
            "15m" | "15min" => Ok(Timeframe::Minute15),
            "30m" | "30min" => Ok(Timeframe::Minute30),
            "1h" | "1hour" => Ok(Timeframe::Hour1),
            "4h" | "4hour" => Ok(Timeframe::Hour4),
            "1d" | "1day" | "day" | "daily" => Ok(Timeframe::Day1),
            "1w" | "1week" | "week" | "weekly" => Ok(Timeframe::Week1),
            other => Err(format!("unsupported timeframe '{other}'")),
        }
    }
}
