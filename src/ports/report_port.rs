//! Report generation port trait.

use crate::domain::error::BacktestError;
use crate::domain::report::BacktestReport;
use std::path::Path;

/// Port for writing backtest reports.
pub trait ReportPort {
    fn write(&self, report: &BacktestReport, output_path: &Path) -> Result<(), BacktestError>;
}
