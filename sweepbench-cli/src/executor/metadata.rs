//! System Metadata Collection
//!
//! Collects the host description stored with every report: git state of the
//! working directory, OS, CPU, memory and the monitored accelerator.
//!
//! Linux-specific data (CPU model, memory) degrades on other platforms to
//! "Unknown" or 0.

use chrono::Utc;
use sweepbench_report::{ReportConfig, ReportMeta, SystemInfo};

/// Current report schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Build report metadata including system info and git details
pub fn build_report_meta(config: ReportConfig, accelerator: Option<String>) -> ReportMeta {
    let git_commit = git(&["rev-parse", "HEAD"]);
    let git_branch = git(&["rev-parse", "--abbrev-ref", "HEAD"]);

    let system = SystemInfo {
        os: std::env::consts::OS.to_string(),
        os_version: std::env::consts::ARCH.to_string(),
        cpu: get_cpu_model().unwrap_or_else(|| "Unknown".to_string()),
        cpu_cores: num_cpus(),
        memory_gb: get_memory_gb().unwrap_or(0.0),
        accelerator,
    };

    ReportMeta {
        schema_version: SCHEMA_VERSION,
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        git_commit,
        git_branch,
        system,
        config,
    }
}

fn git(args: &[&str]) -> Option<String> {
    std::process::Command::new("git")
        .args(args)
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Get CPU model name from /proc/cpuinfo (Linux only)
fn get_cpu_model() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/proc/cpuinfo")
            .ok()
            .and_then(|content| {
                content
                    .lines()
                    .find(|l| l.starts_with("model name"))
                    .and_then(|l| l.split(':').nth(1))
                    .map(|s| s.trim().to_string())
            })
    }
    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

fn num_cpus() -> u32 {
    std::thread::available_parallelism()
        .map(|n| n.get() as u32)
        .unwrap_or(1)
}

/// Get total system memory in GB (Linux only)
fn get_memory_gb() -> Option<f64> {
    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/proc/meminfo")
            .ok()
            .and_then(|content| {
                content
                    .lines()
                    .find(|l| l.starts_with("MemTotal"))
                    .and_then(|l| {
                        l.split_whitespace()
                            .nth(1)
                            .and_then(|s| s.parse::<u64>().ok())
                    })
                    .map(|kb| kb as f64 / 1024.0 / 1024.0)
            })
    }
    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_carries_accelerator() {
        let config = ReportConfig {
            cli_path: "cli".to_string(),
            model_path: "model".to_string(),
            timeout_ms: 1000,
            sample_interval_ms: 100,
            gpu_index: 0,
            gpu_layers: vec![0],
            threads: vec![4],
            ctx_size: 2048,
            n_predict: 20,
        };
        let meta = build_report_meta(config, Some("Mock GPU".to_string()));
        assert_eq!(meta.schema_version, SCHEMA_VERSION);
        assert_eq!(meta.system.accelerator.as_deref(), Some("Mock GPU"));
        assert!(meta.system.cpu_cores >= 1);
    }
}
