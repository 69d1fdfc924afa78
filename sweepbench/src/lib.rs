#![warn(missing_docs)]
//! # SweepBench
//!
//! Configuration sweeps for llama.cpp style inference executables.
//!
//! SweepBench runs the executable once per grid point (GPU-offload layer
//! count x thread count) and records for each trial:
//! - **Throughput**: prompt and generation tokens/s parsed from the output
//! - **Resources**: peak/average host memory, accelerator memory and power,
//!   sampled on a background thread for exactly the lifetime of the trial
//! - **Outcome**: success, non-zero exit, timeout (process group killed) or
//!   missing executable/model
//!
//! Results are appended to a CSV file as the sweep runs, so an interrupted
//! sweep keeps every finished trial.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use sweepbench::{ExecutionConfig, RunOrchestrator, SamplerConfig, TrialConfig};
//!
//! let mut orchestrator = RunOrchestrator::new(
//!     ExecutionConfig {
//!         timeout: Duration::from_secs(60),
//!         ..Default::default()
//!     },
//!     SamplerConfig::default(),
//! );
//! let trial = TrialConfig::new("./llama-cli", "./model.gguf", 20, 8, 2048);
//! let result = orchestrator.execute(&trial);
//! println!(
//!     "{}: {:.2} t/s",
//!     trial.label(),
//!     result.parsed_metrics().generation_tps
//! );
//! ```

// Re-export core types
pub use sweepbench_core::{
    CommandLine, DEFAULT_SCRIPTED_INPUT, DEFAULT_TIMEOUT_SECS, FailureKind, ParsedMetrics,
    TrialConfig, TrialResult, combine_output, parse_log,
};

// Re-export monitoring
pub use sweepbench_monitor::{
    AcceleratorProbe, AcceleratorReading, HostProbe, MockAccelerator, MockHost, Monitor,
    MonitorError, ResourceSampler, Sample, SampleSeries, SamplerConfig, keys,
};

// Re-export execution
pub use sweepbench_cli::{
    ExecutionConfig, ExitIndicator, ProcessController, ProcessError, ProcessOutput,
    RunOrchestrator, SweepFile, SweepRunner, build_plan, expand_grid,
};

// Re-export reporting
pub use sweepbench_report::{CsvSink, SweepReport, TrialRow, select_winner};

// Re-export stats
pub use sweepbench_stats::{AggregateStats, SummaryStatistics, compute_summary};

/// Run the SweepBench command-line interface.
///
/// ```no_run
/// fn main() -> anyhow::Result<()> {
///     sweepbench::run()
/// }
/// ```
pub use sweepbench_cli::run;
