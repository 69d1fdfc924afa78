//! Output Formatting
//!
//! Terminal table of every trial followed by the summary and the winning
//! configuration.

use sweepbench_report::{SweepReport, TrialReport};

/// Format a report for human-readable terminal display
pub fn format_human_output(report: &SweepReport) -> String {
    let mut output = String::new();

    output.push('\n');
    output.push_str("SweepBench Results\n");
    output.push_str(&"=".repeat(78));
    output.push_str("\n\n");

    output.push_str(&format!(
        "  {:<2} {:>5} {:>7} {:>6} {:>10} {:>10} {:>10} {:>9} {:>8}\n",
        "", "ngl", "threads", "ctx", "gen t/s", "prompt t/s", "VRAM MB", "power W", "time s"
    ));
    output.push_str(&"-".repeat(78));
    output.push('\n');

    for result in &report.results {
        output.push_str(&format_row(result));
    }

    let summary = &report.summary;
    output.push_str("\nSummary\n");
    output.push_str(&"-".repeat(78));
    output.push('\n');
    output.push_str(&format!(
        "  Total: {}  Succeeded: {}  Failed: {}  Timed out: {}  Not found: {}\n",
        summary.total_trials,
        summary.succeeded,
        summary.failed,
        summary.timed_out,
        summary.not_found
    ));
    output.push_str(&format!("  Duration: {:.2} s\n", summary.total_duration_s));
    if let Some(accelerator) = &report.meta.system.accelerator {
        output.push_str(&format!("  Accelerator: {}\n", accelerator));
    }

    match &summary.winner {
        Some(winner) => {
            output.push_str("\n--- WINNER CONFIGURATION ---\n");
            output.push_str(&format!("Speed:   {:.2} t/s\n", winner.tokens_per_second));
            output.push_str(&format!(
                "Config:  Layers={}, Threads={}\n",
                winner.n_gpu_layers, winner.threads
            ));
            output.push_str(&format!("VRAM:    {:.2} MB\n", winner.peak_vram_mb));
        }
        None => output.push_str("\nNo successful trials.\n"),
    }

    output
}

fn format_row(result: &TrialReport) -> String {
    let row = &result.row;
    let icon = if row.success { "✓" } else { "✗" };
    let mut line = format!(
        "  {:<2} {:>5} {:>7} {:>6} {:>10.2} {:>10.2} {:>10.1} {:>9.1} {:>8.2}\n",
        icon,
        row.n_gpu_layers,
        row.threads,
        row.ctx_size,
        row.tokens_per_second,
        row.prompt_tokens_per_second,
        row.peak_vram_mb,
        row.avg_power_watts,
        row.duration_s,
    );
    if let Some(first) = row.error.lines().next() {
        line.push_str(&format!("       {}\n", first));
    }
    line
}
