#![warn(missing_docs)]
//! SweepBench Monitor - Resource Sampling
//!
//! Samples host memory and accelerator memory/power on a fixed interval,
//! on a dedicated thread, for the lifetime of one trial:
//! - [`ResourceSampler`] owns the sampling thread and the accelerator handle
//! - [`SampleSeries`] is the raw time series of one monitoring window
//! - [`HostProbe`] / [`AcceleratorProbe`] abstract the hardware counters
//!
//! Monitoring is best-effort. A failed read records zero for that field and
//! the loop keeps going; a missing accelerator is not an error.
//!
//! # Example
//!
//! ```no_run
//! use sweepbench_monitor::{Monitor, ResourceSampler, SamplerConfig};
//!
//! let mut sampler = ResourceSampler::new(SamplerConfig::default());
//! sampler.start();
//! // ... run the workload ...
//! let stats = sampler.stop();
//! println!("peak VRAM: {:.1} MB", stats.get_or_zero("peak_vram_mb"));
//! sampler.shutdown();
//! ```

mod probe;
mod sampler;
mod series;

pub use probe::{
    AcceleratorProbe, AcceleratorReading, HostProbe, MockAccelerator, MockHost, MonitorError,
    SysinfoHost, detect_accelerator,
};
#[cfg(feature = "nvml")]
pub use probe::NvmlAccelerator;
pub use sampler::{Monitor, ResourceSampler, SamplerConfig};
pub use series::{Sample, SampleSeries};

/// Default interval between two samples (100ms)
pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 100;

pub use sweepbench_stats::keys;
