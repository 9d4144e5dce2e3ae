//! CSV trade log adapter implementing ReportPort.
//!
//! One row per reconstructed trade, using the display formatting of
//! [`crate::domain::report::trade_list`].

use crate::adapters::json_report_adapter::create_output_file;
use crate::domain::error::BacktestError;
use crate::domain::report::BacktestReport;
use crate::ports::report_port::ReportPort;
use std::path::Path;

#[derive(Debug, Clone, Copy, Default)]
pub struct CsvTradeLogAdapter;

impl CsvTradeLogAdapter {
    pub fn new() -> Self {
        CsvTradeLogAdapter
    }
}

fn report_error(path: &Path, e: impl std::fmt::Display) -> BacktestError {
    BacktestError::Report {
        reason: format!("failed to write {}: {}", path.display(), e),
    }
}

impl ReportPort for CsvTradeLogAdapter {
    fn write(&self, report: &BacktestReport, output_path: &Path) -> Result<(), BacktestError> {
        let file = create_output_file(output_path)?;
        let mut wtr = csv::Writer::from_writer(file);

        if report.trade_list.is_empty() {
            wtr.write_record([
                "trade_id",
                "entry_time",
                "entry_price",
                "entry_signal",
                "quantity",
                "exit_time",
                "exit_price",
                "exit_signal",
                "profit_loss",
                "profit_loss_pct",
                "duration_days",
                "status",
            ])
            .map_err(|e| report_error(output_path, e))?;
        }
        for row in &report.trade_list {
            wtr.serialize(row).map_err(|e| report_error(output_path, e))?;
        }
        wtr.flush().map_err(|e| report_error(output_path, e))?;

        tracing::info!(
            path = %output_path.display(),
            trades = report.trade_list.len(),
            "trade log written"
        );
        Ok(())
    }
}
