#![warn(missing_docs)]
//! SweepBench Core - Trial Model
//!
//! Types shared by every stage of a sweep:
//! - [`TrialConfig`] describes one run of the inference executable
//! - [`CommandLine`] is the argument vector derived from a config
//! - [`TrialResult`] is the immutable outcome of one trial
//! - [`parse_log`] extracts throughput figures from captured output

mod parser;
mod result;
mod trial;

pub use parser::{ParsedMetrics, parse_log};
pub use result::{FailureKind, TrialResult, combine_output};
pub use trial::{CommandLine, TrialConfig};

/// Default scripted stdin: asks an interactive CLI to quit after generation
pub const DEFAULT_SCRIPTED_INPUT: &str = "/exit\n";

/// Default wall-clock budget for one trial, in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
