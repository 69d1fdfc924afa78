//! CSV Output
//!
//! Rows are written one trial at a time and flushed immediately, so an
//! interrupted sweep leaves every finished trial on disk.

use crate::report::TrialRow;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use sweepbench_core::TrialResult;

/// Column header, in row order
pub const CSV_HEADER: &str = "n_gpu_layers,threads,ctx_size,success,tokens_per_second,prompt_tokens_per_second,peak_vram_mb,avg_vram_mb,avg_power_watts,peak_ram_mb,duration_s,error";

/// Incremental CSV writer
pub struct CsvSink {
    path: PathBuf,
    writer: BufWriter<File>,
    rows: usize,
}

impl CsvSink {
    /// Start a fresh file at `path`, replacing any previous content
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        let mut sink = Self {
            path,
            writer: BufWriter::new(file),
            rows: 0,
        };
        writeln!(sink.writer, "{}", CSV_HEADER)?;
        sink.writer.flush()?;
        Ok(sink)
    }

    /// Write one row and flush it to disk
    pub fn write_result(&mut self, result: &TrialResult) -> io::Result<()> {
        self.write_row(&TrialRow::from_result(result))
    }

    /// Write one prepared row and flush it to disk
    pub fn write_row(&mut self, row: &TrialRow) -> io::Result<()> {
        writeln!(self.writer, "{}", format_row(row))?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    /// Rows written through this sink
    pub fn rows_written(&self) -> usize {
        self.rows
    }

    /// Destination file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Generate CSV report
pub fn generate_csv_report(results: &[TrialResult]) -> String {
    let mut output = String::new();
    output.push_str(CSV_HEADER);
    output.push('\n');
    for result in results {
        output.push_str(&format_row(&TrialRow::from_result(result)));
        output.push('\n');
    }
    output
}

fn format_row(row: &TrialRow) -> String {
    format!(
        "{},{},{},{},{},{},{},{},{},{},{},{}",
        row.n_gpu_layers,
        row.threads,
        row.ctx_size,
        row.success,
        row.tokens_per_second,
        row.prompt_tokens_per_second,
        row.peak_vram_mb,
        row.avg_vram_mb,
        row.avg_power_watts,
        row.peak_ram_mb,
        row.duration_s,
        escape_csv(&row.error),
    )
}

/// Quote a field if it contains a delimiter, quote or line break
fn escape_csv(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
