#![warn(missing_docs)]
//! SweepBench CLI Library
//!
//! Drives an inference executable across a grid of offload-layer and thread
//! counts, one trial at a time, monitoring host and accelerator resources
//! while each trial runs.
//!
//! # Example
//!
//! ```no_run
//! fn main() -> anyhow::Result<()> {
//!     sweepbench_cli::run()
//! }
//! ```

mod config;
mod controller;
mod executor;
mod planner;

pub use config::*;
pub use controller::{
    DEFAULT_KILL_GRACE, ExitIndicator, MAX_KILL_GRACE, ProcessController, ProcessError,
    ProcessOutput, resolve_program,
};
pub use executor::{
    ExecutionConfig, RunOrchestrator, SweepRunner, build_report, build_report_meta,
    format_human_output,
};
pub use planner::{SweepPlan, build_plan, expand_grid};

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use sweepbench_monitor::{ResourceSampler, SamplerConfig};
use sweepbench_report::{
    CsvSink, OutputFormat, ReportConfig, generate_csv_report, generate_json_report,
};
use tracing::{info, warn};

/// SweepBench CLI arguments
#[derive(Parser, Debug)]
#[command(name = "sweepbench")]
#[command(author, version, about = "SweepBench - llama.cpp offload/thread sweep benchmark")]
pub struct Cli {
    /// Optional subcommand (Run, List, Init); defaults to Run
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file (default: sweep.toml found by walking up from cwd)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Inference executable
    #[arg(long, global = true)]
    pub cli: Option<PathBuf>,

    /// Model file
    #[arg(short, long, global = true)]
    pub model: Option<PathBuf>,

    /// GPU offload layer counts, comma separated
    #[arg(long, value_delimiter = ',', global = true)]
    pub gpu_layers: Option<Vec<u32>>,

    /// Thread counts, comma separated
    #[arg(long, value_delimiter = ',', global = true)]
    pub threads: Option<Vec<u32>>,

    /// Context size
    #[arg(long, global = true)]
    pub ctx_size: Option<u32>,

    /// Tokens to generate per trial
    #[arg(short = 'n', long, global = true)]
    pub n_predict: Option<u32>,

    /// Prompt text
    #[arg(short, long, global = true)]
    pub prompt: Option<String>,

    /// Timeout for a single trial (e.g. "120s")
    #[arg(long, global = true)]
    pub timeout: Option<String>,

    /// Interval between hardware samples (e.g. "100ms")
    #[arg(long, global = true)]
    pub sample_interval: Option<String>,

    /// Accelerator index to monitor
    #[arg(long, global = true)]
    pub gpu_index: Option<u32>,

    /// CSV results file
    #[arg(long, global = true)]
    pub csv: Option<PathBuf>,

    /// Also write the JSON report to this file
    #[arg(long, global = true)]
    pub json: Option<PathBuf>,

    /// Output format: human, json, csv
    #[arg(long, global = true)]
    pub format: Option<String>,

    /// Output file (stdout if not specified)
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Hide the progress bar
    #[arg(long, global = true)]
    pub no_progress: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the sweep (default)
    Run,
    /// Print the planned trials without running them
    List,
    /// Print a default sweep.toml
    Init,
}

/// Run the SweepBench CLI with arguments from the command line.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli)
}

/// Run the SweepBench CLI with pre-parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    let filter = if cli.verbose {
        "sweepbench=debug"
    } else {
        "sweepbench=info"
    };
    // A subscriber may already be installed when embedded; keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    if let Some(Commands::Init) = cli.command {
        print!("{}", SweepFile::default_toml());
        return Ok(());
    }

    let config = resolve_config(&cli)?;

    match cli.command {
        Some(Commands::List) => list_trials(&config),
        Some(Commands::Run) | None => run_sweep(&cli, &config),
        Some(Commands::Init) => Ok(()),
    }
}

/// Layer: explicit --config, else discovered sweep.toml, else defaults; then CLI flags.
fn resolve_config(cli: &Cli) -> anyhow::Result<SweepFile> {
    let mut config = match &cli.config {
        Some(path) => SweepFile::load(path)?,
        None => SweepFile::discover()?.unwrap_or_default(),
    };
    apply_overrides(&mut config, cli);
    Ok(config)
}

fn apply_overrides(config: &mut SweepFile, cli: &Cli) {
    if let Some(path) = &cli.cli {
        config.target.cli_path = path.clone();
    }
    if let Some(path) = &cli.model {
        config.target.model_path = path.clone();
    }
    if let Some(layers) = &cli.gpu_layers {
        config.grid.gpu_layers = layers.clone();
    }
    if let Some(threads) = &cli.threads {
        config.grid.threads = threads.clone();
    }
    if let Some(ctx) = cli.ctx_size {
        config.grid.ctx_size = ctx;
    }
    if let Some(n) = cli.n_predict {
        config.grid.n_predict = n;
    }
    if let Some(prompt) = &cli.prompt {
        config.grid.prompt = prompt.clone();
    }
    if let Some(timeout) = &cli.timeout {
        config.runner.timeout = timeout.clone();
    }
    if let Some(interval) = &cli.sample_interval {
        config.runner.sample_interval = interval.clone();
    }
    if let Some(index) = cli.gpu_index {
        config.runner.gpu_index = index;
    }
    if let Some(csv) = &cli.csv {
        config.output.csv = csv.clone();
    }
    if let Some(json) = &cli.json {
        config.output.json = Some(json.clone());
    }
    if let Some(format) = &cli.format {
        config.output.format = format.clone();
    }
}

fn list_trials(config: &SweepFile) -> anyhow::Result<()> {
    let plan = build_plan(config);
    println!("SweepBench Plan:");
    println!("├── cli:   {}", config.target.cli_path.display());
    println!("├── model: {}", config.target.model_path.display());
    for trial in &plan.trials {
        println!("│   ├── {}", trial.label());
    }
    println!("{} trials planned.", plan.len());
    Ok(())
}

fn run_sweep(cli: &Cli, config: &SweepFile) -> anyhow::Result<()> {
    let plan = build_plan(config);
    if plan.is_empty() {
        println!("No trials planned.");
        return Ok(());
    }

    let format: OutputFormat = config.output.format.parse().unwrap_or_else(|e: String| {
        warn!("{}, using human output", e);
        OutputFormat::Human
    });
    let timeout = SweepFile::parse_duration(&config.runner.timeout)?;
    let interval = SweepFile::parse_duration(&config.runner.sample_interval)?;
    let kill_grace = SweepFile::parse_duration(&config.runner.kill_grace)?;

    info!(
        "Model: {}",
        config
            .target
            .model_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| config.target.model_path.display().to_string())
    );
    info!(
        "Running {} trials, timeout {:?}, sampling every {:?}",
        plan.len(),
        timeout,
        interval
    );

    let sampler = ResourceSampler::new(SamplerConfig {
        interval,
        gpu_index: config.runner.gpu_index,
    });
    let accelerator = sampler.accelerator_name().map(str::to_string);
    let exec_config = ExecutionConfig {
        timeout,
        scripted_input: config.runner.scripted_input.clone(),
        kill_grace,
    };

    let sink = CsvSink::create(&config.output.csv)
        .with_context(|| format!("Failed to create {}", config.output.csv.display()))?;
    let mut runner = SweepRunner::new(RunOrchestrator::with_monitor(sampler, exec_config))
        .with_sink(sink)
        .with_progress(!cli.no_progress);
    let results = runner
        .run(&plan.trials)
        .with_context(|| format!("Failed to write {}", config.output.csv.display()))?;
    runner.into_orchestrator().into_monitor().shutdown();

    let report_config = ReportConfig {
        cli_path: config.target.cli_path.display().to_string(),
        model_path: config.target.model_path.display().to_string(),
        timeout_ms: timeout.as_millis() as u64,
        sample_interval_ms: interval.as_millis() as u64,
        gpu_index: config.runner.gpu_index,
        gpu_layers: config.grid.gpu_layers.clone(),
        threads: config.grid.threads.clone(),
        ctx_size: config.grid.ctx_size,
        n_predict: config.grid.n_predict,
    };
    let report = build_report(&results, report_config, accelerator);

    if let Some(path) = &config.output.json {
        let json = generate_json_report(&report)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("JSON report written to {}", path.display());
    }

    let output = match format {
        OutputFormat::Human => format_human_output(&report),
        OutputFormat::Json => generate_json_report(&report)?,
        OutputFormat::Csv => generate_csv_report(&results),
    };

    match &cli.output {
        Some(path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(output.as_bytes())?;
            stdout.flush()?;
        }
    }

    info!(
        "Benchmark complete! Results saved to {}",
        config.output.csv.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_grid_lists() {
        let cli = Cli::parse_from([
            "sweepbench",
            "--gpu-layers",
            "0,20,35",
            "--threads",
            "8",
            "--timeout",
            "30s",
            "list",
        ]);
        assert!(matches!(cli.command, Some(Commands::List)));

        let mut config = SweepFile::default();
        apply_overrides(&mut config, &cli);
        assert_eq!(config.grid.gpu_layers, vec![0, 20, 35]);
        assert_eq!(config.grid.threads, vec![8]);
        assert_eq!(config.runner.timeout, "30s");
        assert_eq!(build_plan(&config).len(), 3);
    }

    #[test]
    fn test_flags_override_file() {
        let cli = Cli::parse_from(["sweepbench", "--cli", "/opt/llama-cli", "--json", "out.json"]);
        let mut config = SweepFile::default();
        apply_overrides(&mut config, &cli);
        assert_eq!(config.target.cli_path, PathBuf::from("/opt/llama-cli"));
        assert_eq!(config.output.json, Some(PathBuf::from("out.json")));
        assert_eq!(config.grid.ctx_size, 2048);
    }

    #[test]
    fn test_default_command_is_run() {
        let cli = Cli::parse_from(["sweepbench"]);
        assert!(cli.command.is_none());
    }
}
