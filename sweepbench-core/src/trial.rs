//! Trial Configuration
//!
//! One grid point of a sweep and the command line it runs.

use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

/// Immutable description of one run of the inference executable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialConfig {
    /// Path to the inference executable
    pub cli_path: PathBuf,
    /// Path to the model file
    pub model_path: PathBuf,
    /// Layers offloaded to the accelerator
    pub n_gpu_layers: u32,
    /// CPU threads
    pub threads: u32,
    /// Context size in tokens
    pub ctx_size: u32,
    /// Tokens to generate
    pub n_predict: u32,
    /// Prompt text
    pub prompt: String,
    /// Batch size
    pub batch_size: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl TrialConfig {
    /// Default number of tokens to generate
    pub const DEFAULT_N_PREDICT: u32 = 20;
    /// Default batch size
    pub const DEFAULT_BATCH_SIZE: u32 = 512;
    /// Default prompt
    pub const DEFAULT_PROMPT: &'static str =
        "Write a short story about a space engineer fixing a broken thruster.";

    /// Create a config for one grid point with default generation settings
    pub fn new(
        cli_path: impl Into<PathBuf>,
        model_path: impl Into<PathBuf>,
        n_gpu_layers: u32,
        threads: u32,
        ctx_size: u32,
    ) -> Self {
        Self {
            cli_path: cli_path.into(),
            model_path: model_path.into(),
            n_gpu_layers,
            threads,
            ctx_size,
            n_predict: Self::DEFAULT_N_PREDICT,
            prompt: Self::DEFAULT_PROMPT.to_string(),
            batch_size: Self::DEFAULT_BATCH_SIZE,
            temperature: 0.0,
        }
    }

    /// Set the number of tokens to generate
    pub fn with_n_predict(mut self, n_predict: u32) -> Self {
        self.n_predict = n_predict;
        self
    }

    /// Set the prompt
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Set the batch size
    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// First referenced path that does not exist, executable checked first
    pub fn missing_path(&self) -> Option<(&'static str, &Path)> {
        if !self.cli_path.exists() {
            return Some(("CLI", &self.cli_path));
        }
        if !self.model_path.exists() {
            return Some(("Model", &self.model_path));
        }
        None
    }

    /// Short label for logs and progress output
    pub fn label(&self) -> String {
        format!(
            "ngl={} threads={} ctx={}",
            self.n_gpu_layers, self.threads, self.ctx_size
        )
    }

    /// Build the command line.
    ///
    /// Argument order is fixed:
    ///
    /// ```text
    /// <cli> -m <model> -n <n_predict> --threads <threads> -ngl <layers>
    ///       -c <ctx_size> -b <batch_size> --temp <temperature> -no-cnv -p <prompt>
    /// ```
    pub fn command_line(&self) -> CommandLine {
        // The model path is passed through as-is, not as its display form.
        let args: Vec<OsString> = vec![
            "-m".into(),
            self.model_path.clone().into_os_string(),
            "-n".into(),
            self.n_predict.to_string().into(),
            "--threads".into(),
            self.threads.to_string().into(),
            "-ngl".into(),
            self.n_gpu_layers.to_string().into(),
            "-c".into(),
            self.ctx_size.to_string().into(),
            "-b".into(),
            self.batch_size.to_string().into(),
            "--temp".into(),
            self.temperature.to_string().into(),
            "-no-cnv".into(),
            "-p".into(),
            self.prompt.clone().into(),
        ];
        CommandLine {
            program: self.cli_path.clone(),
            args,
        }
    }
}

/// Program and argument vector of one launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    /// Executable to launch
    pub program: PathBuf,
    /// Arguments, in order
    pub args: Vec<OsString>,
}

impl CommandLine {
    /// Create a command line from a program and its arguments
    pub fn new<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            let arg = arg.to_string_lossy();
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " {:?}", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}
