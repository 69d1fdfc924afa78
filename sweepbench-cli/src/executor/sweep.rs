//! Sweep Driver
//!
//! Walks the planned grid strictly in order, one trial at a time, appending
//! each result to the CSV sink as soon as it exists.

use super::execution::RunOrchestrator;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use sweepbench_core::{TrialConfig, TrialResult};
use sweepbench_monitor::Monitor;
use sweepbench_report::CsvSink;
use tracing::info;

/// Runs a whole grid through one orchestrator
pub struct SweepRunner<M: Monitor> {
    orchestrator: RunOrchestrator<M>,
    sink: Option<CsvSink>,
    show_progress: bool,
}

impl<M: Monitor> SweepRunner<M> {
    /// Create a runner without persistence or progress output
    pub fn new(orchestrator: RunOrchestrator<M>) -> Self {
        Self {
            orchestrator,
            sink: None,
            show_progress: false,
        }
    }

    /// Persist every result to `sink` as it completes
    pub fn with_sink(mut self, sink: CsvSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Show a progress bar on stderr
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Run every trial in `plan`, in order.
    ///
    /// Trial failures are recorded and the sweep continues; only a failure
    /// to persist a row aborts it.
    pub fn run(&mut self, plan: &[TrialConfig]) -> io::Result<Vec<TrialResult>> {
        let pb = if self.show_progress {
            ProgressBar::new(plan.len() as u64)
        } else {
            ProgressBar::hidden()
        };
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        let mut results = Vec::with_capacity(plan.len());
        for trial in plan {
            pb.set_message(trial.label());
            let result = self.orchestrator.execute(trial);
            if let Some(sink) = self.sink.as_mut() {
                sink.write_result(&result)?;
            }
            results.push(result);
            pb.inc(1);
        }
        pb.finish_with_message("Complete");

        if let Some(sink) = &self.sink {
            info!(
                "{} rows written to {}",
                sink.rows_written(),
                sink.path().display()
            );
        }
        Ok(results)
    }

    /// The orchestrator driving the trials
    pub fn orchestrator(&self) -> &RunOrchestrator<M> {
        &self.orchestrator
    }

    /// Consume the runner, returning its orchestrator
    pub fn into_orchestrator(self) -> RunOrchestrator<M> {
        self.orchestrator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ExecutionConfig;
    use sweepbench_monitor::{MockHost, ResourceSampler};
    use std::time::Duration;

    #[test]
    fn test_missing_paths_still_produce_rows() {
        let dir = tempfile::TempDir::new().unwrap();
        let csv = dir.path().join("results.csv");
        let sampler =
            ResourceSampler::with_probes(Duration::from_millis(5), Box::new(MockHost::fixed(0)), None);
        let orchestrator = RunOrchestrator::with_monitor(sampler, ExecutionConfig::default());
        let plan: Vec<_> = [0, 10]
            .into_iter()
            .map(|ngl| TrialConfig::new("/missing/cli", "/missing/model", ngl, 4, 2048))
            .collect();

        let mut runner = SweepRunner::new(orchestrator).with_sink(CsvSink::create(&csv).unwrap());
        let results = runner.run(&plan).unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| !r.success));
        let contents = std::fs::read_to_string(&csv).unwrap();
        assert_eq!(contents.lines().count(), 3);
        assert!(contents.lines().nth(2).unwrap().starts_with("10,4,2048,false"));
    }
}
