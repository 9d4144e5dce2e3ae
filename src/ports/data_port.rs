//! Bar series supplier port.

use crate::domain::error::BacktestError;
use crate::domain::ohlcv::Bar;
use crate::domain::timeframe::Timeframe;
use chrono::NaiveDate;

pub trait BarSource {
    /// Bars for `symbol` whose date lies in `[start, end]`, ordered by
    /// timestamp. An empty vector means no data; the caller decides whether
    /// that is an error.
    fn fetch_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        timeframe: Timeframe,
    ) -> Result<Vec<Bar>, BacktestError>;

    fn list_symbols(&self, timeframe: Timeframe) -> Result<Vec<String>, BacktestError>;
}
