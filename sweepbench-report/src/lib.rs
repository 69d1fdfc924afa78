#![warn(missing_docs)]
//! SweepBench Report - Persisting and Presenting Sweeps
//!
//! Output formats:
//! - CSV (one row per trial, appended as the sweep runs)
//! - JSON (full report with run metadata)
//! - Human (terminal table, rendered by the CLI)

mod csv;
mod json;
mod report;

pub use csv::{CSV_HEADER, CsvSink, generate_csv_report};
pub use json::generate_json_report;
pub use report::{
    ReportConfig, ReportMeta, ReportSummary, SweepReport, SystemInfo, TrialReport, TrialRow,
    Winner, select_winner,
};

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable terminal output
    #[default]
    Human,
    /// JSON with full metadata
    Json,
    /// CSV for spreadsheets
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" | "text" => Ok(OutputFormat::Human),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}
