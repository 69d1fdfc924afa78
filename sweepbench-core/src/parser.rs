//! Output Parser
//!
//! Pulls throughput figures out of captured inference output. Two formats
//! are recognised:
//!
//! ```text
//! short:    Generation: 12.50 t/s      Prompt: 30.1 t/s
//! verbose:  prompt eval time = 120.00 ms / 12 tokens ( 10.00 ms per token, 100.00 tokens per second)
//!                  eval time = 2758.62 ms / 20 runs ( 137.93 ms per token, 7.25 tokens per second)
//!                 total time = 2900.00 ms / 32 tokens
//! ```
//!
//! The short form wins; the verbose log is consulted only for figures the
//! short form left at zero.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static GENERATION_SHORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Generation:\s*([\d.]+)\s*t/s").expect("Invalid generation regex"));

static PROMPT_SHORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Prompt:\s*([\d.]+)\s*t/s").expect("Invalid prompt regex"));

static TOKENS_PER_SECOND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*([\d.]+)\s*tokens per second").expect("Invalid rate regex"));

static TOTAL_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"total time\s*=\s*([\d.]+)\s*ms").expect("Invalid total time regex"));

/// Throughput figures extracted from one trial's output
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedMetrics {
    /// Prompt processing throughput, tokens/s
    pub prompt_tps: f64,
    /// Generation throughput, tokens/s
    pub generation_tps: f64,
    /// Total run time reported by the executable, ms
    pub total_duration_ms: f64,
}

/// Parse throughput figures; anything not found is 0.0
pub fn parse_log(text: &str) -> ParsedMetrics {
    let mut metrics = ParsedMetrics {
        prompt_tps: capture_f64(&PROMPT_SHORT, text).unwrap_or(0.0),
        generation_tps: capture_f64(&GENERATION_SHORT, text).unwrap_or(0.0),
        total_duration_ms: capture_f64(&TOTAL_TIME, text).unwrap_or(0.0),
    };

    if metrics.generation_tps == 0.0 {
        if let Some(tps) = verbose_rate(text, |line| {
            line.contains("eval time") && !line.contains("prompt eval time")
        }) {
            metrics.generation_tps = tps;
        }
    }

    if metrics.prompt_tps == 0.0 {
        if let Some(tps) = verbose_rate(text, |line| line.contains("prompt eval time")) {
            metrics.prompt_tps = tps;
        }
    }

    metrics
}

fn verbose_rate(text: &str, select: impl Fn(&str) -> bool) -> Option<f64> {
    text.lines()
        .filter(|line| select(line))
        .find_map(|line| capture_f64(&TOKENS_PER_SECOND, line))
}

fn capture_f64(re: &Regex, text: &str) -> Option<f64> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
