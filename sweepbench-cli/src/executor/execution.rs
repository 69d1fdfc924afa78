//! Trial Execution
//!
//! Runs one trial: monitor the hardware while the inference process runs,
//! then fold both into a [`TrialResult`].
//!
//! ## Data Flow
//!
//! ```text
//! TrialConfig
//!      │ paths exist?  ── no ──► TrialResult (not found, no monitoring)
//!      ▼
//! Monitor::start
//!      │
//!      ▼
//! ProcessController::run  (blocking, bounded by timeout + kill grace)
//!      │
//!      ▼
//! Monitor::stop  (exactly once, also on panic)
//!      │
//!      ▼
//! TrialResult (stats, output, duration, failure)
//! ```

use crate::controller::{
    DEFAULT_KILL_GRACE, ExitIndicator, ProcessController, ProcessError, ProcessOutput,
};
use chrono::Utc;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};
use sweepbench_core::{
    DEFAULT_SCRIPTED_INPUT, DEFAULT_TIMEOUT_SECS, FailureKind, TrialConfig, TrialResult,
    combine_output,
};
use sweepbench_monitor::{Monitor, ResourceSampler, SamplerConfig};
use sweepbench_stats::AggregateStats;
use tracing::{info, warn};

/// Configuration for trial execution
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    /// Wall-clock budget for one process run
    pub timeout: Duration,
    /// Written to the process's stdin, which is then closed
    pub scripted_input: String,
    /// Time between SIGTERM and SIGKILL on timeout
    pub kill_grace: Duration,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            scripted_input: DEFAULT_SCRIPTED_INPUT.to_string(),
            kill_grace: DEFAULT_KILL_GRACE,
        }
    }
}

/// Runs trials one at a time, each under its own monitoring window
pub struct RunOrchestrator<M: Monitor = ResourceSampler> {
    monitor: M,
    controller: ProcessController,
    config: ExecutionConfig,
}

impl RunOrchestrator<ResourceSampler> {
    /// Orchestrator backed by the hardware sampler
    pub fn new(config: ExecutionConfig, sampler: SamplerConfig) -> Self {
        Self::with_monitor(ResourceSampler::new(sampler), config)
    }
}

impl<M: Monitor> RunOrchestrator<M> {
    /// Orchestrator backed by any monitor
    pub fn with_monitor(monitor: M, config: ExecutionConfig) -> Self {
        let controller = ProcessController::new().with_kill_grace(config.kill_grace);
        Self {
            monitor,
            controller,
            config,
        }
    }

    /// The monitor, e.g. to inspect the last window's series
    pub fn monitor(&self) -> &M {
        &self.monitor
    }

    /// Consume the orchestrator, returning its monitor
    pub fn into_monitor(self) -> M {
        self.monitor
    }

    /// Execute one trial.
    ///
    /// Never fails: every outcome, including a panic inside the process
    /// controller, is captured in the returned result.
    pub fn execute(&mut self, trial: &TrialConfig) -> TrialResult {
        if let Some((what, path)) = trial.missing_path() {
            warn!("{} not found: {}", what, path.display());
            return TrialResult::not_found(trial.clone(), what, path);
        }

        info!("Running trial {}", trial.label());
        let cmd = trial.command_line();
        let controller = &self.controller;
        let config = &self.config;

        let started_at = Utc::now();
        let guard = MonitorGuard::start(&mut self.monitor);
        let start = Instant::now();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            controller.run(&cmd, &config.scripted_input, config.timeout)
        }));

        let duration = start.elapsed();
        let (stats, sample_count) = guard.stop();

        let result = match outcome {
            Ok(Ok(output)) => {
                Self::from_output(trial, output, stats, duration, started_at, sample_count)
            }
            Ok(Err(err)) => {
                let kind = match err {
                    ProcessError::NotFound(_) => FailureKind::NotFound,
                    _ => FailureKind::Fault,
                };
                TrialResult::failed(
                    trial.clone(),
                    kind,
                    err.to_string(),
                    stats,
                    String::new(),
                    duration,
                    started_at,
                    sample_count,
                )
            }
            Err(panic) => {
                let message = if let Some(s) = panic.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                TrialResult::failed(
                    trial.clone(),
                    FailureKind::Fault,
                    format!("Unexpected error: {}", message),
                    stats,
                    String::new(),
                    duration,
                    started_at,
                    sample_count,
                )
            }
        };

        if result.success {
            info!(
                "Trial {} finished in {:.2}s ({} samples)",
                trial.label(),
                result.duration_secs(),
                result.sample_count
            );
        } else {
            warn!(
                "Trial {} failed: {}",
                trial.label(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
        result
    }

    fn from_output(
        trial: &TrialConfig,
        output: ProcessOutput,
        stats: AggregateStats,
        duration: Duration,
        started_at: chrono::DateTime<Utc>,
        sample_count: usize,
    ) -> TrialResult {
        let raw_output = combine_output(&output.stdout, &output.stderr);
        let (kind, error) = match output.exit {
            ExitIndicator::Success => {
                return TrialResult::succeeded(
                    trial.clone(),
                    stats,
                    raw_output,
                    duration,
                    started_at,
                    sample_count,
                );
            }
            ExitIndicator::Failed { code: Some(code) } => (
                FailureKind::ExitFailure { code: Some(code) },
                format!("Process exited with code {}\n{}", code, output.stderr),
            ),
            ExitIndicator::Failed { code: None } => (
                FailureKind::ExitFailure { code: None },
                format!("Process terminated by signal\n{}", output.stderr),
            ),
            ExitIndicator::TimedOut => (
                FailureKind::TimedOut,
                "Benchmark timed out (process hung)".to_string(),
            ),
        };
        TrialResult::failed(
            trial.clone(),
            kind,
            error,
            stats,
            raw_output,
            duration,
            started_at,
            sample_count,
        )
    }
}

/// Holds a started monitor; stops it exactly once, on `stop` or on drop
struct MonitorGuard<'a, M: Monitor> {
    monitor: &'a mut M,
    stopped: bool,
}

impl<'a, M: Monitor> MonitorGuard<'a, M> {
    fn start(monitor: &'a mut M) -> Self {
        monitor.start();
        Self {
            monitor,
            stopped: false,
        }
    }

    /// Stop monitoring; returns the aggregates and the window's sample count
    fn stop(mut self) -> (AggregateStats, usize) {
        self.stopped = true;
        let stats = self.monitor.stop();
        (stats, self.monitor.series().len())
    }
}

impl<M: Monitor> Drop for MonitorGuard<'_, M> {
    fn drop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            let _ = self.monitor.stop();
        }
    }
}
