//! Report Building
//!
//! ```text
//! Vec<TrialResult> + ReportConfig + accelerator name
//!              │
//!              ▼
//!      ReportMeta (git, host, config)
//!              │
//!              ▼
//!   SweepReport (rows, summary, winner)
//! ```

use super::metadata::build_report_meta;
use sweepbench_core::TrialResult;
use sweepbench_report::{ReportConfig, SweepReport};

/// Build a complete report from finished trials
pub fn build_report(
    results: &[TrialResult],
    config: ReportConfig,
    accelerator: Option<String>,
) -> SweepReport {
    SweepReport::new(build_report_meta(config, accelerator), results)
}
