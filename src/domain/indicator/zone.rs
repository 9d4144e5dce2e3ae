//! ActionZone classification of price against a fast and a slow EMA.
//!
//! bull = fast > slow, bear = fast < slow. Six zones split the bull/bear x
//! price-vs-MA space; boundary equalities fall into no zone.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    Green,
    Blue,
    LightBlue,
    Red,
    Orange,
    Yellow,
}

impl Zone {
    pub fn label(self) -> &'static str {
        match self {
            Zone::Green => "green",
            Zone::Blue => "blue",
            Zone::LightBlue => "light_blue",
            Zone::Red => "red",
            Zone::Orange => "orange",
            Zone::Yellow => "yellow",
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The six zone conditions evaluated independently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ZoneFlags {
    pub green: bool,
    pub blue: bool,
    pub light_blue: bool,
    pub red: bool,
    pub orange: bool,
    pub yellow: bool,
}

impl ZoneFlags {
    pub fn evaluate(price: f64, fast_ma: f64, slow_ma: f64) -> Self {
        let bull = fast_ma > slow_ma;
        let bear = fast_ma < slow_ma;

        ZoneFlags {
            green: bull && price > fast_ma,
            blue: bear && price > fast_ma && price > slow_ma,
            light_blue: bear && price > fast_ma && price < slow_ma,
            red: bear && price < fast_ma,
            orange: bull && price < fast_ma && price < slow_ma,
            yellow: bull && price < fast_ma && price > slow_ma,
        }
    }

    pub fn count(&self) -> usize {
        [
            self.green,
            self.blue,
            self.light_blue,
            self.red,
            self.orange,
            self.yellow,
        ]
        .iter()
        .filter(|&&flag| flag)
        .count()
    }

    pub fn zone(&self) -> Option<Zone> {
        if self.green {
            Some(Zone::Green)
        } else if self.blue {
            Some(Zone::Blue)
        } else if self.light_blue {
            Some(Zone::LightBlue)
        } else if self.red {
            Some(Zone::Red)
        } else if self.orange {
            Some(Zone::Orange)
        } else if self.yellow {
            Some(Zone::Yellow)
        } else {
            None
        }
    }
}

/// Zone for one bar; `None` while any input is still in warm-up.
pub fn classify(price: Option<f64>, fast_ma: Option<f64>, slow_ma: Option<f64>) -> Option<Zone> {
    match (price, fast_ma, slow_ma) {
        (Some(p), Some(f), Some(s)) => ZoneFlags::evaluate(p, f, s).zone(),
        _ => None,
    }
}
