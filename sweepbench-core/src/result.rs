//! Trial Results
//!
//! A [`TrialResult`] is built once when a trial finishes and never changes
//! afterwards. Failures are values here, not errors: the sweep records them
//! and moves on.

use crate::parser::{ParsedMetrics, parse_log};
use crate::trial::TrialConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use sweepbench_stats::AggregateStats;

/// Why a trial did not succeed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureKind {
    /// Executable or model file missing; nothing was launched
    NotFound,
    /// Wall-clock budget exceeded; the process was killed
    TimedOut,
    /// Process exited with a non-zero status (`None` when killed by a signal)
    ExitFailure {
        /// Exit code, if the process exited normally
        code: Option<i32>,
    },
    /// Spawn, I/O or internal failure
    Fault,
}

impl FailureKind {
    /// Short stable reason string
    pub fn reason(&self) -> &'static str {
        match self {
            FailureKind::NotFound => "not found",
            FailureKind::TimedOut => "timed out",
            FailureKind::ExitFailure { .. } => "exit failure",
            FailureKind::Fault => "fault",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::ExitFailure { code: Some(code) } => write!(f, "exited with code {code}"),
            FailureKind::ExitFailure { code: None } => write!(f, "terminated by signal"),
            other => write!(f, "{}", other.reason()),
        }
    }
}

/// Outcome of one trial
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialResult {
    /// Configuration that produced this result
    pub config: TrialConfig,
    /// True only when the process exited with status zero before the timeout
    pub success: bool,
    /// Aggregates of the samples taken during this trial's window
    pub stats: AggregateStats,
    /// Combined stdout and stderr, see [`combine_output`]
    pub raw_output: String,
    /// Human-readable error description
    pub error: Option<String>,
    /// Typed failure, `None` on success
    pub failure: Option<FailureKind>,
    /// Elapsed wall-clock time of the process run
    #[serde(rename = "duration_s", with = "duration_secs")]
    pub duration: Duration,
    /// When the trial started
    pub started_at: DateTime<Utc>,
    /// Number of samples in the monitoring window
    pub sample_count: usize,
}

impl TrialResult {
    /// Successful trial
    pub fn succeeded(
        config: TrialConfig,
        stats: AggregateStats,
        raw_output: String,
        duration: Duration,
        started_at: DateTime<Utc>,
        sample_count: usize,
    ) -> Self {
        Self {
            config,
            success: true,
            stats,
            raw_output,
            error: None,
            failure: None,
            duration,
            started_at,
            sample_count,
        }
    }

    /// Failed trial that still ran (and was monitored)
    #[allow(clippy::too_many_arguments)]
    pub fn failed(
        config: TrialConfig,
        failure: FailureKind,
        error: impl Into<String>,
        stats: AggregateStats,
        raw_output: String,
        duration: Duration,
        started_at: DateTime<Utc>,
        sample_count: usize,
    ) -> Self {
        Self {
            config,
            success: false,
            stats,
            raw_output,
            error: Some(error.into()),
            failure: Some(failure),
            duration,
            started_at,
            sample_count,
        }
    }

    /// Pre-flight failure: `what` ("CLI" or "Model") at `path` is missing.
    ///
    /// Carries empty stats, empty output and zero duration.
    pub fn not_found(config: TrialConfig, what: &str, path: &Path) -> Self {
        Self {
            config,
            success: false,
            stats: AggregateStats::new(),
            raw_output: String::new(),
            error: Some(format!("{what} not found: {}", path.display())),
            failure: Some(FailureKind::NotFound),
            duration: Duration::ZERO,
            started_at: Utc::now(),
            sample_count: 0,
        }
    }

    /// Elapsed duration in seconds
    pub fn duration_secs(&self) -> f64 {
        self.duration.as_secs_f64()
    }

    /// Throughput figures parsed from the raw output
    pub fn parsed_metrics(&self) -> ParsedMetrics {
        parse_log(&self.raw_output)
    }

    /// True when the failure was a timeout
    pub fn timed_out(&self) -> bool {
        self.failure == Some(FailureKind::TimedOut)
    }
}

/// Join captured streams into the stored raw-output text
pub fn combine_output(stdout: &str, stderr: &str) -> String {
    format!("--- STDOUT ---\n{stdout}\n--- STDERR ---\n{stderr}")
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TrialConfig {
        TrialConfig::new("/bin/llama-cli", "/models/m.gguf", 10, 4, 2048)
    }

    #[test]
    fn test_not_found() {
        let result = TrialResult::not_found(config(), "CLI", Path::new("/bin/llama-cli"));
        assert!(!result.success);
        assert_eq!(result.failure, Some(FailureKind::NotFound));
        assert_eq!(result.error.as_deref(), Some("CLI not found: /bin/llama-cli"));
        assert!(result.stats.is_empty());
        assert_eq!(result.duration, Duration::ZERO);
        assert_eq!(result.sample_count, 0);
    }

    #[test]
    fn test_failure_reasons() {
        assert_eq!(FailureKind::NotFound.reason(), "not found");
        assert_eq!(FailureKind::TimedOut.reason(), "timed out");
        assert_eq!(FailureKind::ExitFailure { code: Some(2) }.to_string(), "exited with code 2");
        assert_eq!(FailureKind::ExitFailure { code: None }.to_string(), "terminated by signal");
    }

    #[test]
    fn test_combine_output() {
        assert_eq!(
            combine_output("out", "err"),
            "--- STDOUT ---\nout\n--- STDERR ---\nerr"
        );
    }

    #[test]
    fn test_failed_keeps_stats() {
        let mut stats = AggregateStats::new();
        stats.insert("peak_ram_mb", 512.0);
        let result = TrialResult::failed(
            config(),
            FailureKind::TimedOut,
            "Benchmark timed out (process hung)",
            stats,
            String::new(),
            Duration::from_secs(2),
            Utc::now(),
            20,
        );
        assert!(result.timed_out());
        assert_eq!(result.stats.get("peak_ram_mb"), Some(512.0));
    }

    #[test]
    fn test_parsed_metrics_from_raw_output() {
        let result = TrialResult::succeeded(
            config(),
            AggregateStats::new(),
            combine_output("Generation: 12.50 t/s", ""),
            Duration::from_millis(1500),
            Utc::now(),
            15,
        );
        assert_eq!(result.parsed_metrics().generation_tps, 12.5);
        assert_eq!(result.duration_secs(), 1.5);
    }

    #[test]
    fn test_serializes_duration_as_seconds() {
        let result = TrialResult::not_found(config(), "Model", Path::new("/m.gguf"));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["duration_s"], 0.0);
        assert_eq!(json["failure"]["kind"], "not_found");

        let back: TrialResult = serde_json::from_value(json).unwrap();
        assert_eq!(back.failure, Some(FailureKind::NotFound));
    }
}
