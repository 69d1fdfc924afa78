//! Sample Series
//!
//! Raw time series recorded during one monitoring window.

use crate::keys;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sweepbench_stats::{AggregateStats, compute_summary, estimate_energy};

/// One tick of the sampling loop
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Wall-clock time the tick was taken
    pub timestamp: DateTime<Utc>,
    /// Host memory in use (MB)
    pub host_memory_mb: f64,
    /// Accelerator memory in use (MB), zero without an accelerator
    pub accel_memory_mb: f64,
    /// Accelerator power draw (W), zero without an accelerator
    pub accel_power_watts: f64,
}

/// Append-only, time-ordered samples of a single window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleSeries {
    samples: Vec<Sample>,
}

impl SampleSeries {
    /// Create an empty series
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one sample
    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    /// Number of recorded samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Recorded samples in order
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Timestamp of the first sample
    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.samples.first().map(|s| s.timestamp)
    }

    /// Timestamp of the last sample
    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.samples.last().map(|s| s.timestamp)
    }

    /// Compute peak/average figures for every channel.
    ///
    /// An empty series yields an empty map.
    pub fn aggregate(&self) -> AggregateStats {
        let mut stats = AggregateStats::new();
        let Some(start) = self.first_timestamp() else {
            return stats;
        };

        let ram: Vec<f64> = self.samples.iter().map(|s| s.host_memory_mb).collect();
        let vram: Vec<f64> = self.samples.iter().map(|s| s.accel_memory_mb).collect();
        let power: Vec<f64> = self.samples.iter().map(|s| s.accel_power_watts).collect();

        // Channel names expand to `peak_<name>` / `avg_<name>`, see `keys`.
        for (channel, values) in [("ram_mb", &ram), ("vram_mb", &vram), ("power_watts", &power)] {
            if let Some(summary) = compute_summary(values) {
                stats.insert_peak_and_average(channel, &summary);
            }
        }

        let timed_power: Vec<(f64, f64)> = self
            .samples
            .iter()
            .map(|s| {
                let offset = (s.timestamp - start)
                    .num_microseconds()
                    .unwrap_or(i64::MAX) as f64
                    / 1_000_000.0;
                (offset, s.accel_power_watts)
            })
            .collect();
        stats.insert(keys::ENERGY_JOULES, estimate_energy(&timed_power).total_joules);

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_at(start: DateTime<Utc>, ms: i64, ram: f64, vram: f64, watts: f64) -> Sample {
        Sample {
            timestamp: start + Duration::milliseconds(ms),
            host_memory_mb: ram,
            accel_memory_mb: vram,
            accel_power_watts: watts,
        }
    }

    #[test]
    fn test_empty_series_aggregates_to_empty_map() {
        let series = SampleSeries::new();
        let stats = series.aggregate();
        assert!(stats.is_empty());
    }

    #[test]
    fn test_aggregate_keys_and_values() {
        let start = Utc::now();
        let mut series = SampleSeries::new();
        series.push(sample_at(start, 0, 1000.0, 2000.0, 100.0));
        series.push(sample_at(start, 500, 1500.0, 4000.0, 200.0));
        series.push(sample_at(start, 1000, 1200.0, 3000.0, 150.0));

        let stats = series.aggregate();
        assert_eq!(stats.get(keys::PEAK_RAM_MB), Some(1500.0));
        assert!((stats.get_or_zero(keys::AVG_RAM_MB) - 1233.333).abs() < 0.01);
        assert_eq!(stats.get(keys::PEAK_VRAM_MB), Some(4000.0));
        assert_eq!(stats.get(keys::AVG_VRAM_MB), Some(3000.0));
        assert_eq!(stats.get(keys::AVG_POWER_WATTS), Some(150.0));
        assert_eq!(stats.get(keys::PEAK_POWER_WATTS), Some(200.0));
        // (100+200)/2*0.5 + (200+150)/2*0.5 = 75 + 87.5
        assert!((stats.get_or_zero(keys::ENERGY_JOULES) - 162.5).abs() < 1e-6);
    }

    #[test]
    fn test_single_sample_has_zero_energy() {
        let start = Utc::now();
        let mut series = SampleSeries::new();
        series.push(sample_at(start, 0, 10.0, 0.0, 0.0));

        let stats = series.aggregate();
        assert_eq!(stats.get(keys::PEAK_RAM_MB), Some(10.0));
        assert_eq!(stats.get(keys::ENERGY_JOULES), Some(0.0));
    }

    #[test]
    fn test_timestamps() {
        let start = Utc::now();
        let mut series = SampleSeries::new();
        assert!(series.first_timestamp().is_none());
        series.push(sample_at(start, 0, 1.0, 0.0, 0.0));
        series.push(sample_at(start, 100, 1.0, 0.0, 0.0));
        assert_eq!(series.first_timestamp(), Some(start));
        assert_eq!(series.last_timestamp(), Some(start + Duration::milliseconds(100)));
        assert_eq!(series.len(), 2);
    }
}
