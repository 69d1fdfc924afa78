//! Channel Summary
//!
//! Peak and mean of a single sampled channel (host RAM, VRAM, power),
//! computed in one pass over the full series. A short spike is exactly
//! what a sweep looks for, so nothing is trimmed.

/// Summary of one channel of a sample series
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SummaryStatistics {
    /// Arithmetic mean
    pub mean: f64,
    /// Largest observed value
    pub max: f64,
    /// Number of samples summarised
    pub sample_count: usize,
}

/// Summarise a channel.
///
/// Returns `None` for an empty channel: an empty window has no peak and no
/// average.
pub fn compute_summary(samples: &[f64]) -> Option<SummaryStatistics> {
    if samples.is_empty() {
        return None;
    }

    let (sum, max) = samples
        .iter()
        .fold((0.0, f64::NEG_INFINITY), |(sum, max), &x| (sum + x, f64::max(max, x)));

    Some(SummaryStatistics {
        mean: sum / samples.len() as f64,
        max,
        sample_count: samples.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_summary() {
        let summary = compute_summary(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();

        assert!((summary.mean - 3.0).abs() < 1e-9);
        assert_eq!(summary.max, 5.0);
        assert_eq!(summary.sample_count, 5);
    }

    #[test]
    fn test_spike_is_kept() {
        let summary = compute_summary(&[1.0, 2.0, 3.0, 4.0, 5.0, 100.0]).unwrap();

        assert_eq!(summary.max, 100.0);
        assert!((summary.mean - 115.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_sample() {
        let summary = compute_summary(&[7.5]).unwrap();
        assert_eq!(summary.max, 7.5);
        assert_eq!(summary.mean, 7.5);
    }

    #[test]
    fn test_all_zero_channel() {
        // No accelerator: every reading is zero, peak and mean stay zero.
        let summary = compute_summary(&[0.0, 0.0, 0.0]).unwrap();
        assert_eq!(summary.max, 0.0);
        assert_eq!(summary.mean, 0.0);
    }

    #[test]
    fn test_empty_samples() {
        assert!(compute_summary(&[]).is_none());
    }
}
