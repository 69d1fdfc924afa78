#![warn(missing_docs)]
//! SweepBench Statistics
//!
//! Turns raw per-trial time series into summary figures:
//! - Per-channel peak and mean
//! - Named aggregate maps attached to every trial result
//! - Energy estimation by trapezoidal integration of power samples

mod aggregate;
mod energy;
mod summary;

pub use aggregate::AggregateStats;
pub use energy::{EnergyEstimate, estimate_energy};
pub use summary::{SummaryStatistics, compute_summary};

/// Names of the statistics attached to every trial
pub mod keys {
    /// Peak host memory in use (MB)
    pub const PEAK_RAM_MB: &str = "peak_ram_mb";
    /// Average host memory in use (MB)
    pub const AVG_RAM_MB: &str = "avg_ram_mb";
    /// Peak accelerator memory in use (MB)
    pub const PEAK_VRAM_MB: &str = "peak_vram_mb";
    /// Average accelerator memory in use (MB)
    pub const AVG_VRAM_MB: &str = "avg_vram_mb";
    /// Average accelerator power draw (W)
    pub const AVG_POWER_WATTS: &str = "avg_power_watts";
    /// Peak accelerator power draw (W)
    pub const PEAK_POWER_WATTS: &str = "peak_power_watts";
    /// Accelerator energy over the window (J)
    pub const ENERGY_JOULES: &str = "energy_joules";
}

/// Bytes per mebibyte, used for every memory figure in the reports
pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Convert a byte count into megabytes
pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_to_mb() {
        assert!((bytes_to_mb(1024 * 1024) - 1.0).abs() < f64::EPSILON);
        assert!((bytes_to_mb(0) - 0.0).abs() < f64::EPSILON);
        assert!((bytes_to_mb(512 * 1024) - 0.5).abs() < f64::EPSILON);
    }
}
