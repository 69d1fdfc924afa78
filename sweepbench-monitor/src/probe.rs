//! Hardware Probes
//!
//! Host memory comes from `sysinfo`; accelerator memory and power from NVML
//! when the `nvml` feature is enabled and a device is present. Mock probes
//! give tests deterministic readings.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use sysinfo::System;
use thiserror::Error;
use tracing::info;

/// Errors raised by a single hardware read
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Host memory could not be read
    #[error("host memory counters unavailable")]
    HostUnavailable,

    /// Read after `release()`
    #[error("accelerator handle already released")]
    Released,

    /// Driver reported a failure
    #[error("accelerator read failed: {0}")]
    Accelerator(String),

    /// NVML call failed
    #[cfg(feature = "nvml")]
    #[error("NVML error: {0}")]
    Nvml(#[from] nvml_wrapper::error::NvmlError),
}

/// Host memory counter
pub trait HostProbe: Send {
    /// Bytes of host memory currently in use
    fn used_memory_bytes(&mut self) -> Result<u64, MonitorError>;
}

/// One accelerator reading
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AcceleratorReading {
    /// Device memory in use, in bytes
    pub memory_used_bytes: u64,
    /// Instantaneous power draw, in milliwatts
    pub power_milliwatts: u32,
}

/// Accelerator memory/power counter backed by a driver handle
pub trait AcceleratorProbe: Send {
    /// Device name for logs and report metadata
    fn name(&self) -> &str;

    /// Read current memory use and power draw
    fn read(&mut self) -> Result<AcceleratorReading, MonitorError>;

    /// Release the driver handle. Must be safe to call more than once.
    fn release(&mut self);
}

/// Host memory probe using `sysinfo`
pub struct SysinfoHost {
    system: System,
}

impl SysinfoHost {
    /// Create a probe; no counters are read until the first sample
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for SysinfoHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HostProbe for SysinfoHost {
    fn used_memory_bytes(&mut self) -> Result<u64, MonitorError> {
        self.system.refresh_memory();
        if self.system.total_memory() == 0 {
            return Err(MonitorError::HostUnavailable);
        }
        Ok(self.system.used_memory())
    }
}

/// NVIDIA accelerator probe.
///
/// NVML is initialised once here; every read only looks the device up by
/// index, which is cheap.
#[cfg(feature = "nvml")]
pub struct NvmlAccelerator {
    nvml: Option<nvml_wrapper::Nvml>,
    index: u32,
    name: String,
}

#[cfg(feature = "nvml")]
impl NvmlAccelerator {
    /// Initialise NVML and resolve device `index`
    pub fn init(index: u32) -> Result<Self, MonitorError> {
        let nvml = nvml_wrapper::Nvml::init()?;
        let name = {
            let device = nvml.device_by_index(index)?;
            device.name().unwrap_or_else(|_| format!("GPU {index}"))
        };
        Ok(Self {
            nvml: Some(nvml),
            index,
            name,
        })
    }
}

#[cfg(feature = "nvml")]
impl AcceleratorProbe for NvmlAccelerator {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&mut self) -> Result<AcceleratorReading, MonitorError> {
        let nvml = self.nvml.as_ref().ok_or(MonitorError::Released)?;
        let device = nvml.device_by_index(self.index)?;
        let memory = device.memory_info()?;
        let power = device.power_usage()?;
        Ok(AcceleratorReading {
            memory_used_bytes: memory.used,
            power_milliwatts: power,
        })
    }

    fn release(&mut self) {
        if let Some(nvml) = self.nvml.take() {
            if let Err(e) = nvml.shutdown() {
                tracing::warn!("NVML shutdown failed: {}", e);
            }
        }
    }
}

#[cfg(feature = "nvml")]
impl Drop for NvmlAccelerator {
    fn drop(&mut self) {
        self.release();
    }
}

/// Detect the accelerator at `index`.
///
/// Returns `None` when no driver or device is available; the sampler then
/// reports zero for accelerator fields.
pub fn detect_accelerator(index: u32) -> Option<Box<dyn AcceleratorProbe>> {
    #[cfg(feature = "nvml")]
    {
        match NvmlAccelerator::init(index) {
            Ok(probe) => {
                info!("GPU detected: {}", probe.name());
                Some(Box::new(probe))
            }
            Err(e) => {
                tracing::warn!("NVIDIA GPU not detected or driver error: {}", e);
                None
            }
        }
    }
    #[cfg(not(feature = "nvml"))]
    {
        info!("accelerator monitoring disabled (built without `nvml`), GPU {index} ignored");
        None
    }
}

/// Host probe returning a fixed reading, or failing on demand
#[derive(Debug, Clone)]
pub struct MockHost {
    used_bytes: Option<u64>,
}

impl MockHost {
    /// Always report `used_bytes`
    pub fn fixed(used_bytes: u64) -> Self {
        Self {
            used_bytes: Some(used_bytes),
        }
    }

    /// Every read fails
    pub fn failing() -> Self {
        Self { used_bytes: None }
    }
}

impl HostProbe for MockHost {
    fn used_memory_bytes(&mut self) -> Result<u64, MonitorError> {
        self.used_bytes.ok_or(MonitorError::HostUnavailable)
    }
}

/// Accelerator probe with scripted readings and a release counter
#[derive(Debug, Clone)]
pub struct MockAccelerator {
    reading: AcceleratorReading,
    fail_reads: bool,
    released: bool,
    release_calls: Arc<AtomicUsize>,
}

impl MockAccelerator {
    /// Always report `reading`
    pub fn fixed(reading: AcceleratorReading) -> Self {
        Self {
            reading,
            fail_reads: false,
            released: false,
            release_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Every read fails with a transient driver error
    pub fn failing() -> Self {
        Self {
            fail_reads: true,
            ..Self::fixed(AcceleratorReading::default())
        }
    }

    /// Shared counter of handle releases (idempotent calls not counted)
    pub fn release_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.release_calls)
    }
}

impl AcceleratorProbe for MockAccelerator {
    fn name(&self) -> &str {
        "Mock GPU"
    }

    fn read(&mut self) -> Result<AcceleratorReading, MonitorError> {
        if self.released {
            return Err(MonitorError::Released);
        }
        if self.fail_reads {
            return Err(MonitorError::Accelerator("transient driver error".to_string()));
        }
        Ok(self.reading)
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.release_calls.fetch_add(1, Ordering::SeqCst);
        }
    }
}
