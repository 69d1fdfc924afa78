//! Resource Sampler
//!
//! Runs the sampling loop on a dedicated thread between `start()` and
//! `stop()`. The thread is the only writer of the window's [`SampleSeries`]
//! and hands it back through its join handle, so once `stop()` returns no
//! further sample can be recorded.
//!
//! ```text
//!  start() ──spawn──▶ ┌──────────────────────┐
//!                     │ tick: read probes    │◀─┐
//!                     │ push Sample          │  │ recv_timeout(interval)
//!                     └──────────┬───────────┘──┘
//!  stop()  ──signal──────────────▶ exit loop
//!          ◀──join── SampleSeries ──▶ aggregate() ──▶ AggregateStats
//! ```

use crate::DEFAULT_SAMPLE_INTERVAL_MS;
use crate::probe::{AcceleratorProbe, HostProbe, SysinfoHost, detect_accelerator};
use crate::series::{Sample, SampleSeries};
use chrono::Utc;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use sweepbench_stats::{AggregateStats, bytes_to_mb};
use tracing::{debug, warn};

/// Start/stop contract shared by the real sampler and test doubles
pub trait Monitor {
    /// Reset the series and begin sampling in the background
    fn start(&mut self);

    /// Stop sampling, wait for the in-flight tick, and aggregate the window
    fn stop(&mut self) -> AggregateStats;

    /// Samples of the most recently completed window
    fn series(&self) -> &SampleSeries;
}

/// Sampler construction parameters
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// Interval between two samples
    pub interval: Duration,
    /// Accelerator device index
    pub gpu_index: u32,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_SAMPLE_INTERVAL_MS),
            gpu_index: 0,
        }
    }
}

/// Probes shared between the owner and the sampling thread
struct ProbeSet {
    host: Box<dyn HostProbe>,
    accelerator: Option<Box<dyn AcceleratorProbe>>,
}

impl ProbeSet {
    /// Take one sample. Failed reads degrade to zero.
    fn sample(&mut self) -> Sample {
        let host_memory_mb = match self.host.used_memory_bytes() {
            Ok(bytes) => bytes_to_mb(bytes),
            Err(e) => {
                debug!("host memory read failed: {}", e);
                0.0
            }
        };

        let (accel_memory_mb, accel_power_watts) = match self.accelerator.as_mut() {
            Some(accelerator) => match accelerator.read() {
                Ok(reading) => (
                    bytes_to_mb(reading.memory_used_bytes),
                    f64::from(reading.power_milliwatts) / 1000.0,
                ),
                Err(e) => {
                    debug!("accelerator read failed: {}", e);
                    (0.0, 0.0)
                }
            },
            None => (0.0, 0.0),
        };

        Sample {
            timestamp: Utc::now(),
            host_memory_mb,
            accel_memory_mb,
            accel_power_watts,
        }
    }
}

/// An active sampling window
struct Window {
    stop_tx: Sender<()>,
    handle: JoinHandle<SampleSeries>,
}

/// Background sampler of host and accelerator resources
pub struct ResourceSampler {
    interval: Duration,
    probes: Arc<Mutex<ProbeSet>>,
    accelerator_name: Option<String>,
    window: Option<Window>,
    series: SampleSeries,
}

impl ResourceSampler {
    /// Create a sampler over the real host, detecting the accelerator once
    pub fn new(config: SamplerConfig) -> Self {
        let accelerator = detect_accelerator(config.gpu_index);
        Self::with_probes(config.interval, Box::new(SysinfoHost::new()), accelerator)
    }

    /// Create a sampler over explicit probes
    pub fn with_probes(
        interval: Duration,
        host: Box<dyn HostProbe>,
        accelerator: Option<Box<dyn AcceleratorProbe>>,
    ) -> Self {
        let accelerator_name = accelerator.as_ref().map(|a| a.name().to_string());
        Self {
            interval: interval.max(Duration::from_millis(1)),
            probes: Arc::new(Mutex::new(ProbeSet { host, accelerator })),
            accelerator_name,
            window: None,
            series: SampleSeries::new(),
        }
    }

    /// Name of the detected accelerator, if any
    pub fn accelerator_name(&self) -> Option<&str> {
        self.accelerator_name.as_deref()
    }

    /// Whether an accelerator handle is held
    pub fn has_accelerator(&self) -> bool {
        lock_probes(&self.probes).accelerator.is_some()
    }

    /// Whether a sampling window is open
    pub fn is_running(&self) -> bool {
        self.window.is_some()
    }

    /// Sampling interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Release the accelerator handle.
    ///
    /// Stops an open window first. Calling this again is a no-op; the
    /// sampler keeps working afterwards with accelerator fields at zero.
    pub fn shutdown(&mut self) {
        if self.window.is_some() {
            self.stop();
        }
        let accelerator = lock_probes(&self.probes).accelerator.take();
        if let Some(mut accelerator) = accelerator {
            debug!("releasing accelerator handle: {}", accelerator.name());
            accelerator.release();
        }
    }

    fn spawn_window(&self) -> std::io::Result<Window> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let probes = Arc::clone(&self.probes);
        let interval = self.interval;

        let handle = thread::Builder::new()
            .name("sweepbench-sampler".to_string())
            .spawn(move || {
                let mut series = SampleSeries::new();
                loop {
                    let tick = Instant::now();
                    let sample = lock_probes(&probes).sample();
                    series.push(sample);

                    let wait = interval.saturating_sub(tick.elapsed());
                    match stop_rx.recv_timeout(wait) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        // Explicit stop, or the owner went away
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                series
            })?;

        Ok(Window { stop_tx, handle })
    }
}

impl Monitor for ResourceSampler {
    fn start(&mut self) {
        if self.window.is_some() {
            warn!("sampler already running; ignoring start()");
            return;
        }
        self.series = SampleSeries::new();
        match self.spawn_window() {
            Ok(window) => self.window = Some(window),
            Err(e) => warn!("failed to spawn sampling thread, trial runs unmonitored: {}", e),
        }
    }

    fn stop(&mut self) -> AggregateStats {
        let Some(window) = self.window.take() else {
            return self.series.aggregate();
        };

        // The receiver may already be gone if the thread panicked.
        let _ = window.stop_tx.send(());
        self.series = match window.handle.join() {
            Ok(series) => series,
            Err(_) => {
                warn!("sampling thread panicked; discarding window");
                SampleSeries::new()
            }
        };
        debug!("sampling window closed with {} samples", self.series.len());
        self.series.aggregate()
    }

    fn series(&self) -> &SampleSeries {
        &self.series
    }
}

impl Drop for ResourceSampler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Lock the probe set, recovering from a poisoned mutex
fn lock_probes(probes: &Mutex<ProbeSet>) -> MutexGuard<'_, ProbeSet> {
    probes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys;
    use crate::probe::{AcceleratorReading, MockAccelerator, MockHost};
    use std::sync::atomic::Ordering;

    const MB: u64 = 1024 * 1024;

    fn mock_sampler(accelerator: Option<MockAccelerator>) -> ResourceSampler {
        ResourceSampler::with_probes(
            Duration::from_millis(5),
            Box::new(MockHost::fixed(2048 * MB)),
            accelerator.map(|a| Box::new(a) as Box<dyn AcceleratorProbe>),
        )
    }

    fn gpu(memory_mb: u64, watts: u32) -> MockAccelerator {
        MockAccelerator::fixed(AcceleratorReading {
            memory_used_bytes: memory_mb * MB,
            power_milliwatts: watts * 1000,
        })
    }

    #[test]
    fn test_start_stop_collects_samples() {
        let mut sampler = mock_sampler(Some(gpu(4096, 120)));
        sampler.start();
        assert!(sampler.is_running());
        thread::sleep(Duration::from_millis(40));
        let stats = sampler.stop();

        assert!(!sampler.is_running());
        assert!(!sampler.series().is_empty());
        assert_eq!(stats.get(keys::PEAK_RAM_MB), Some(2048.0));
        assert_eq!(stats.get(keys::PEAK_VRAM_MB), Some(4096.0));
        assert_eq!(stats.get(keys::AVG_POWER_WATTS), Some(120.0));
    }

    #[test]
    fn test_immediate_stop_still_has_first_sample() {
        let mut sampler = mock_sampler(None);
        sampler.start();
        let stats = sampler.stop();
        assert_eq!(sampler.series().len(), 1);
        assert_eq!(stats.get(keys::PEAK_VRAM_MB), Some(0.0));
    }

    #[test]
    fn test_stop_does_not_wait_out_the_interval() {
        let mut sampler = ResourceSampler::with_probes(
            Duration::from_secs(10),
            Box::new(MockHost::fixed(MB)),
            None,
        );
        sampler.start();
        thread::sleep(Duration::from_millis(20));

        let stopping = Instant::now();
        let stats = sampler.stop();

        assert!(
            stopping.elapsed() < Duration::from_millis(500),
            "stop() took {:?}",
            stopping.elapsed()
        );
        assert_eq!(sampler.series().len(), 1);
        assert_eq!(stats.get(keys::PEAK_RAM_MB), Some(1.0));
    }

    #[test]
    fn test_stop_without_start_is_empty() {
        let mut sampler = mock_sampler(None);
        let stats = sampler.stop();
        assert!(stats.is_empty());
    }

    #[test]
    fn test_no_samples_after_stop() {
        let mut sampler = mock_sampler(None);
        sampler.start();
        thread::sleep(Duration::from_millis(20));
        sampler.stop();
        let recorded = sampler.series().len();
        let last = sampler.series().last_timestamp();

        thread::sleep(Duration::from_millis(20));
        assert_eq!(sampler.series().len(), recorded);
        assert_eq!(sampler.series().last_timestamp(), last);
    }

    #[test]
    fn test_windows_do_not_leak() {
        let mut sampler = mock_sampler(None);
        sampler.start();
        thread::sleep(Duration::from_millis(15));
        sampler.stop();
        let first_end = sampler.series().last_timestamp().unwrap();

        sampler.start();
        thread::sleep(Duration::from_millis(15));
        sampler.stop();
        let second_start = sampler.series().first_timestamp().unwrap();

        assert!(second_start >= first_end);
        assert!(
            sampler
                .series()
                .samples()
                .iter()
                .all(|s| s.timestamp >= second_start)
        );
    }

    #[test]
    fn test_second_start_is_ignored() {
        let mut sampler = mock_sampler(None);
        sampler.start();
        sampler.start();
        sampler.stop();
        assert!(!sampler.is_running());
        assert!(sampler.stop().get(keys::PEAK_RAM_MB).is_some());
    }

    #[test]
    fn test_failed_reads_degrade_to_zero() {
        let mut sampler = ResourceSampler::with_probes(
            Duration::from_millis(5),
            Box::new(MockHost::failing()),
            Some(Box::new(MockAccelerator::failing())),
        );
        sampler.start();
        thread::sleep(Duration::from_millis(20));
        let stats = sampler.stop();

        assert!(!stats.is_empty());
        assert_eq!(stats.get(keys::PEAK_RAM_MB), Some(0.0));
        assert_eq!(stats.get(keys::PEAK_VRAM_MB), Some(0.0));
        assert_eq!(stats.get(keys::PEAK_POWER_WATTS), Some(0.0));
    }

    #[test]
    fn test_shutdown_releases_once() {
        let accelerator = gpu(1024, 50);
        let releases = accelerator.release_counter();
        let mut sampler = mock_sampler(Some(accelerator));
        assert!(sampler.has_accelerator());
        assert_eq!(sampler.accelerator_name(), Some("Mock GPU"));

        sampler.start();
        sampler.stop();
        sampler.start();
        sampler.stop();
        assert_eq!(releases.load(Ordering::SeqCst), 0);

        sampler.shutdown();
        sampler.shutdown();
        drop(sampler);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_while_running_releases() {
        let accelerator = gpu(1024, 50);
        let releases = accelerator.release_counter();
        let mut sampler = mock_sampler(Some(accelerator));
        sampler.start();
        drop(sampler);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_sampling_continues_after_shutdown() {
        let mut sampler = mock_sampler(Some(gpu(1024, 50)));
        sampler.shutdown();
        assert!(!sampler.has_accelerator());

        sampler.start();
        let stats = sampler.stop();
        assert_eq!(stats.get(keys::PEAK_VRAM_MB), Some(0.0));
        assert_eq!(stats.get(keys::PEAK_RAM_MB), Some(2048.0));
    }

    #[test]
    fn test_default_config() {
        let config = SamplerConfig::default();
        assert_eq!(config.interval, Duration::from_millis(100));
        assert_eq!(config.gpu_index, 0);
    }
}
