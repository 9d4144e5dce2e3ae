//! JSON report adapter implementing ReportPort.
//!
//! Writes the whole [`BacktestReport`] as pretty-printed JSON. Non-finite
//! floats (an unbounded profit factor) come out as `null`.

use crate::domain::error::BacktestError;
use crate::domain::report::BacktestReport;
use crate::ports::report_port::ReportPort;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReportAdapter;

impl JsonReportAdapter {
    pub fn new() -> Self {
        JsonReportAdapter
    }

    pub fn render(report: &BacktestReport) -> Result<String, BacktestError> {
        serde_json::to_string_pretty(report).map_err(|e| BacktestError::Report {
            reason: format!("failed to serialise report: {e}"),
        })
    }
}

pub(crate) fn create_output_file(output_path: &Path) -> Result<fs::File, BacktestError> {
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| BacktestError::Report {
            reason: format!("failed to create {}: {}", parent.display(), e),
        })?;
    }
    fs::File::create(output_path).map_err(|e| BacktestError::Report {
        reason: format!("failed to create {}: {}", output_path.display(), e),
    })
}

impl ReportPort for JsonReportAdapter {
    fn write(&self, report: &BacktestReport, output_path: &Path) -> Result<(), BacktestError> {
        let mut writer = BufWriter::new(create_output_file(output_path)?);
        serde_json::to_writer_pretty(&mut writer, report)
            .map_err(|e| BacktestError::Report {
                reason: format!("failed to write {}: {}", output_path.display(), e),
            })?;
        writer.flush().map_err(|e| BacktestError::Report {
            reason: format!("failed to write {}: {}", output_path.display(), e),
        })?;

        tracing::info!(path = %output_path.display(), "json report written");
        Ok(())
    }
}
