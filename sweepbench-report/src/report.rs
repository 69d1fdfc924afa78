//! Report Data Structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sweepbench_core::{FailureKind, TrialResult};
use sweepbench_stats::{AggregateStats, keys};

/// Complete sweep report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepReport {
    pub meta: ReportMeta,
    pub results: Vec<TrialReport>,
    pub summary: ReportSummary,
}

impl SweepReport {
    /// Build a report from finished trials
    pub fn new(meta: ReportMeta, results: &[TrialResult]) -> Self {
        Self {
            meta,
            results: results.iter().map(TrialReport::from_result).collect(),
            summary: ReportSummary::from_results(results),
        }
    }
}

/// Report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMeta {
    pub schema_version: u32,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub git_commit: Option<String>,
    pub git_branch: Option<String>,
    pub system: SystemInfo,
    pub config: ReportConfig,
}

/// Sweep configuration captured in report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub cli_path: String,
    pub model_path: String,
    pub timeout_ms: u64,
    pub sample_interval_ms: u64,
    pub gpu_index: u32,
    pub gpu_layers: Vec<u32>,
    pub threads: Vec<u32>,
    pub ctx_size: u32,
    pub n_predict: u32,
}

/// System information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os: String,
    pub os_version: String,
    pub cpu: String,
    pub cpu_cores: u32,
    pub memory_gb: f64,
    /// Detected accelerator, `None` when monitoring runs without one
    pub accelerator: Option<String>,
}

/// One persisted CSV row.
///
/// Missing statistics are written as zero, as is the throughput of a trial
/// whose output carried no timing figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRow {
    /// Layers offloaded to the accelerator
    pub n_gpu_layers: u32,
    /// CPU threads
    pub threads: u32,
    /// Context size
    pub ctx_size: u32,
    /// Exit status zero before the timeout
    pub success: bool,
    /// Generation throughput (tokens/s)
    pub tokens_per_second: f64,
    /// Prompt processing throughput (tokens/s)
    pub prompt_tokens_per_second: f64,
    pub peak_vram_mb: f64,
    pub avg_vram_mb: f64,
    pub avg_power_watts: f64,
    pub peak_ram_mb: f64,
    /// Wall-clock duration of the process run (s)
    pub duration_s: f64,
    /// Error text, empty on success
    pub error: String,
}

impl TrialRow {
    /// Flatten a trial into its row
    pub fn from_result(result: &TrialResult) -> Self {
        let parsed = result.parsed_metrics();
        let stats = &result.stats;
        Self {
            n_gpu_layers: result.config.n_gpu_layers,
            threads: result.config.threads,
            ctx_size: result.config.ctx_size,
            success: result.success,
            tokens_per_second: parsed.generation_tps,
            prompt_tokens_per_second: parsed.prompt_tps,
            peak_vram_mb: stats.get_or_zero(keys::PEAK_VRAM_MB),
            avg_vram_mb: stats.get_or_zero(keys::AVG_VRAM_MB),
            avg_power_watts: stats.get_or_zero(keys::AVG_POWER_WATTS),
            peak_ram_mb: stats.get_or_zero(keys::PEAK_RAM_MB),
            duration_s: result.duration_secs(),
            error: result.error.clone().unwrap_or_default(),
        }
    }
}

/// Individual trial in the JSON report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialReport {
    #[serde(flatten)]
    pub row: TrialRow,
    pub failure: Option<FailureKind>,
    pub started_at: DateTime<Utc>,
    pub sample_count: usize,
    pub total_duration_ms: f64,
    pub stats: AggregateStats,
}

impl TrialReport {
    /// Build the report entry for one trial
    pub fn from_result(result: &TrialResult) -> Self {
        Self {
            row: TrialRow::from_result(result),
            failure: result.failure,
            started_at: result.started_at,
            sample_count: result.sample_count,
            total_duration_ms: result.parsed_metrics().total_duration_ms,
            stats: result.stats.clone(),
        }
    }
}

/// Fastest successful configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Winner {
    pub n_gpu_layers: u32,
    pub threads: u32,
    pub ctx_size: u32,
    pub tokens_per_second: f64,
    pub peak_vram_mb: f64,
}

/// Pick the successful trial with the highest generation throughput.
///
/// Ties keep the earlier trial. Returns `None` when nothing succeeded.
pub fn select_winner(results: &[TrialResult]) -> Option<Winner> {
    let mut best: Option<Winner> = None;
    for row in results
        .iter()
        .filter(|r| r.success)
        .map(TrialRow::from_result)
    {
        if best
            .as_ref()
            .is_some_and(|b| row.tokens_per_second <= b.tokens_per_second)
        {
            continue;
        }
        best = Some(Winner {
            n_gpu_layers: row.n_gpu_layers,
            threads: row.threads,
            ctx_size: row.ctx_size,
            tokens_per_second: row.tokens_per_second,
            peak_vram_mb: row.peak_vram_mb,
        });
    }
    best
}

/// Report summary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_trials: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub not_found: usize,
    pub total_duration_s: f64,
    pub winner: Option<Winner>,
}

impl ReportSummary {
    /// Count outcomes over a finished sweep
    pub fn from_results(results: &[TrialResult]) -> Self {
        let mut summary = ReportSummary {
            total_trials: results.len(),
            winner: select_winner(results),
            ..Default::default()
        };
        for result in results {
            summary.total_duration_s += result.duration_secs();
            if result.success {
                summary.succeeded += 1;
                continue;
            }
            summary.failed += 1;
            match result.failure {
                Some(FailureKind::TimedOut) => summary.timed_out += 1,
                Some(FailureKind::NotFound) => summary.not_found += 1,
                _ => {}
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::time::Duration;
    use sweepbench_core::{TrialConfig, combine_output};

    fn success(ngl: u32, threads: u32, tps: f64) -> TrialResult {
        let mut stats = AggregateStats::new();
        stats.insert(keys::PEAK_VRAM_MB, 1000.0 + ngl as f64);
        TrialResult::succeeded(
            TrialConfig::new("cli", "model", ngl, threads, 2048),
            stats,
            combine_output(&format!("Generation: {tps} t/s"), ""),
            Duration::from_secs(2),
            Utc::now(),
            20,
        )
    }

    #[test]
    fn test_row_from_result() {
        let row = TrialRow::from_result(&success(10, 4, 12.5));
        assert_eq!(row.n_gpu_layers, 10);
        assert_eq!(row.tokens_per_second, 12.5);
        assert_eq!(row.peak_vram_mb, 1010.0);
        assert_eq!(row.avg_power_watts, 0.0);
        assert_eq!(row.duration_s, 2.0);
        assert!(row.error.is_empty());
    }

    #[test]
    fn test_winner_ignores_failures() {
        let failed = TrialResult::failed(
            TrialConfig::new("cli", "model", 35, 12, 2048),
            FailureKind::ExitFailure { code: Some(1) },
            "Process exited with code 1",
            AggregateStats::new(),
            combine_output("Generation: 99.0 t/s", ""),
            Duration::from_secs(1),
            Utc::now(),
            10,
        );
        let results = vec![success(0, 4, 5.0), failed, success(20, 8, 14.0), success(28, 8, 14.0)];

        let winner = select_winner(&results).unwrap();
        assert_eq!((winner.n_gpu_layers, winner.threads), (20, 8));
        assert_eq!(winner.tokens_per_second, 14.0);
    }

    #[test]
    fn test_no_winner_without_success() {
        let results = vec![TrialResult::not_found(
            TrialConfig::new("cli", "model", 0, 4, 2048),
            "CLI",
            Path::new("cli"),
        )];
        assert!(select_winner(&results).is_none());
    }

    #[test]
    fn test_summary_counts() {
        let not_found = TrialResult::not_found(
            TrialConfig::new("cli", "model", 0, 4, 2048),
            "Model",
            Path::new("model"),
        );
        let results = vec![success(0, 4, 5.0), not_found];
        let summary = ReportSummary::from_results(&results);
        assert_eq!(summary.total_trials, 2);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.not_found, 1);
        assert_eq!(summary.timed_out, 0);
        assert_eq!(summary.total_duration_s, 2.0);
    }
}
