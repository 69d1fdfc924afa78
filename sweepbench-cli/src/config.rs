//! Configuration loading from sweep.toml
//!
//! A sweep can be described in a `sweep.toml` file. The file is discovered
//! by walking up from the current directory; every field has a default and
//! command-line flags override it.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use sweepbench_core::{DEFAULT_SCRIPTED_INPUT, TrialConfig};
use sweepbench_monitor::DEFAULT_SAMPLE_INTERVAL_MS;
use thiserror::Error;

/// Name of the configuration file looked up by [`SweepFile::discover`]
pub const CONFIG_FILE_NAME: &str = "sweep.toml";

/// Errors raised while loading or interpreting `sweep.toml`
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        /// File that failed
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// File is not valid TOML for this schema
    #[error("Invalid configuration in {}: {source}", path.display())]
    Parse {
        /// File that failed
        path: PathBuf,
        /// Underlying TOML error
        source: toml::de::Error,
    },

    /// Duration string could not be parsed
    #[error("Invalid duration '{0}'")]
    Duration(String),
}

/// SweepBench configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SweepFile {
    /// Executable and model
    #[serde(default)]
    pub target: TargetConfig,
    /// Grid definition and generation settings
    #[serde(default)]
    pub grid: GridConfig,
    /// Runner configuration
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
}

/// Executable and model paths
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Inference executable
    #[serde(default = "default_cli_path")]
    pub cli_path: PathBuf,
    /// Model file
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            cli_path: default_cli_path(),
            model_path: default_model_path(),
        }
    }
}

fn default_cli_path() -> PathBuf {
    PathBuf::from("llama-cli")
}
fn default_model_path() -> PathBuf {
    PathBuf::from("model.gguf")
}

/// Grid axes and the settings shared by every grid point
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// Offload-layer counts to try (outer loop)
    #[serde(default = "default_gpu_layers")]
    pub gpu_layers: Vec<u32>,
    /// Thread counts to try (inner loop)
    #[serde(default = "default_threads")]
    pub threads: Vec<u32>,
    /// Context size
    #[serde(default = "default_ctx_size")]
    pub ctx_size: u32,
    /// Tokens to generate
    #[serde(default = "default_n_predict")]
    pub n_predict: u32,
    /// Batch size
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    /// Sampling temperature
    #[serde(default)]
    pub temperature: f32,
    /// Prompt text
    #[serde(default = "default_prompt")]
    pub prompt: String,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            gpu_layers: default_gpu_layers(),
            threads: default_threads(),
            ctx_size: default_ctx_size(),
            n_predict: default_n_predict(),
            batch_size: default_batch_size(),
            temperature: 0.0,
            prompt: default_prompt(),
        }
    }
}

fn default_gpu_layers() -> Vec<u32> {
    vec![0, 10, 20, 28, 35]
}
fn default_threads() -> Vec<u32> {
    vec![4, 8, 12]
}
fn default_ctx_size() -> u32 {
    2048
}
fn default_n_predict() -> u32 {
    100
}
fn default_batch_size() -> u32 {
    TrialConfig::DEFAULT_BATCH_SIZE
}
fn default_prompt() -> String {
    TrialConfig::DEFAULT_PROMPT.to_string()
}

/// Runner configuration for trial execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Timeout for a single trial (e.g., "120s", "5m")
    #[serde(default = "default_timeout")]
    pub timeout: String,
    /// Interval between hardware samples (e.g., "100ms")
    #[serde(default = "default_sample_interval")]
    pub sample_interval: String,
    /// Accelerator index to monitor
    #[serde(default)]
    pub gpu_index: u32,
    /// Text written to the executable's stdin
    #[serde(default = "default_scripted_input")]
    pub scripted_input: String,
    /// Time between SIGTERM and SIGKILL on timeout
    #[serde(default = "default_kill_grace")]
    pub kill_grace: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            sample_interval: default_sample_interval(),
            gpu_index: 0,
            scripted_input: default_scripted_input(),
            kill_grace: default_kill_grace(),
        }
    }
}

fn default_timeout() -> String {
    "120s".to_string()
}
fn default_sample_interval() -> String {
    format!("{}ms", DEFAULT_SAMPLE_INTERVAL_MS)
}
fn default_scripted_input() -> String {
    DEFAULT_SCRIPTED_INPUT.to_string()
}
fn default_kill_grace() -> String {
    "500ms".to_string()
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// CSV file, rewritten at the start of each sweep
    #[serde(default = "default_csv")]
    pub csv: PathBuf,
    /// Optional JSON report path
    #[serde(default)]
    pub json: Option<PathBuf>,
    /// Default output format: "human", "json", "csv"
    #[serde(default = "default_format")]
    pub format: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv: default_csv(),
            json: None,
            format: default_format(),
        }
    }
}

fn default_csv() -> PathBuf {
    PathBuf::from("benchmark_results.csv")
}
fn default_format() -> String {
    "human".to_string()
}

impl SweepFile {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Find `sweep.toml` by walking up from the current directory
    pub fn find() -> Option<PathBuf> {
        let mut dir = std::env::current_dir().ok()?;
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Some(config_path);
            }
            if !dir.pop() {
                return None;
            }
        }
    }

    /// Discover and load configuration; `Ok(None)` when there is no file
    pub fn discover() -> Result<Option<Self>, ConfigError> {
        Self::find().map(Self::load).transpose()
    }

    /// Generate a default configuration as TOML string
    pub fn default_toml() -> String {
        r#"# SweepBench Configuration

[target]
# Inference executable (llama.cpp style CLI)
cli_path = "llama-cli"
# Model file passed with -m
model_path = "model.gguf"

[grid]
# GPU offload layer counts (outer loop)
gpu_layers = [0, 10, 20, 28, 35]
# CPU thread counts (inner loop)
threads = [4, 8, 12]
# Context size
ctx_size = 2048
# Tokens to generate per trial
n_predict = 100
# Batch size
batch_size = 512
# Sampling temperature
temperature = 0.0
# Prompt
prompt = "Write a short story about a space engineer fixing a broken thruster."

[runner]
# Timeout for a single trial
timeout = "120s"
# Interval between hardware samples
sample_interval = "100ms"
# Accelerator to monitor
gpu_index = 0
# Written to stdin so interactive builds exit after generating
scripted_input = "/exit\n"
# Time between SIGTERM and SIGKILL when a trial times out
kill_grace = "500ms"

[output]
# One row per trial, flushed as the sweep runs
csv = "benchmark_results.csv"
# Full JSON report (uncomment to enable)
# json = "sweep_report.json"
# Default output format: human, json, csv
format = "human"
"#
        .to_string()
    }

    /// Parse duration string (e.g., "120s", "100ms", "2m")
    pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ConfigError::Duration(s.to_string()));
        }

        let (num_part, unit_part) = s
            .char_indices()
            .find(|(_, c)| c.is_alphabetic())
            .map(|(i, _)| s.split_at(i))
            .unwrap_or((s, "s"));

        let value: f64 = num_part
            .trim()
            .parse()
            .map_err(|_| ConfigError::Duration(s.to_string()))?;
        if !value.is_finite() || value < 0.0 {
            return Err(ConfigError::Duration(s.to_string()));
        }

        let secs_per_unit = match unit_part.to_lowercase().as_str() {
            "ns" => 1e-9,
            "us" | "µs" => 1e-6,
            "ms" => 1e-3,
            "s" | "" => 1.0,
            "m" | "min" => 60.0,
            _ => return Err(ConfigError::Duration(s.to_string())),
        };

        Duration::try_from_secs_f64(value * secs_per_unit)
            .map_err(|_| ConfigError::Duration(s.to_string()))
    }
}
