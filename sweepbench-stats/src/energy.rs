//! Energy Estimation
//!
//! Integrates instantaneous power readings over their timestamps.

use serde::{Deserialize, Serialize};

/// Result of integrating power samples over time
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergyEstimate {
    /// Total energy in joules
    pub total_joules: f64,
    /// Span covered by the samples, in seconds
    pub duration_s: f64,
    /// Number of samples integrated
    pub samples: usize,
}

/// Estimate total energy via trapezoidal integration.
///
/// `samples` are `(seconds_since_window_start, watts)` pairs sorted by time.
/// Fewer than two samples cover no interval and yield zero joules.
pub fn estimate_energy(samples: &[(f64, f64)]) -> EnergyEstimate {
    let n = samples.len();
    if n < 2 {
        return EnergyEstimate {
            samples: n,
            ..EnergyEstimate::default()
        };
    }

    let total_joules = samples
        .windows(2)
        .map(|pair| {
            let (t0, w0) = pair[0];
            let (t1, w1) = pair[1];
            let dt = (t1 - t0).max(0.0);
            (w0 + w1) / 2.0 * dt
        })
        .sum();

    let duration_s = (samples[n - 1].0 - samples[0].0).max(0.0);

    EnergyEstimate {
        total_joules,
        duration_s,
        samples: n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_power() {
        let samples = vec![(0.0, 100.0), (0.5, 100.0), (1.0, 100.0)];
        let energy = estimate_energy(&samples);
        assert!((energy.total_joules - 100.0).abs() < 1e-9);
        assert!((energy.duration_s - 1.0).abs() < 1e-9);
        assert_eq!(energy.samples, 3);
    }

    #[test]
    fn test_ramp() {
        // Linear ramp 0W -> 200W over 2s = 200J
        let samples = vec![(0.0, 0.0), (2.0, 200.0)];
        let energy = estimate_energy(&samples);
        assert!((energy.total_joules - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_too_few_samples() {
        assert_eq!(estimate_energy(&[]).total_joules, 0.0);
        let single = estimate_energy(&[(0.0, 250.0)]);
        assert_eq!(single.total_joules, 0.0);
        assert_eq!(single.samples, 1);
    }

    #[test]
    fn test_out_of_order_interval_contributes_nothing() {
        let samples = vec![(1.0, 100.0), (0.5, 100.0)];
        assert_eq!(estimate_energy(&samples).total_joules, 0.0);
    }
}
