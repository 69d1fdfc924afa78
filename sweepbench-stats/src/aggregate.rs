//! Aggregate Statistics
//!
//! Named statistic → value mapping attached to every trial result.
//! Keys are stable strings (`peak_vram_mb`, `avg_power_watts`, ...) so the
//! map serializes straight into reports and CSV columns.

use crate::summary::SummaryStatistics;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Named aggregate statistics derived from one completed sample series.
///
/// An empty map means no sample was recorded in the window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregateStats(BTreeMap<String, f64>);

impl AggregateStats {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a single named value
    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        self.0.insert(key.into(), value);
    }

    /// Record `peak_<channel>` and `avg_<channel>` from a channel summary
    pub fn insert_peak_and_average(&mut self, channel: &str, summary: &SummaryStatistics) {
        self.insert(format!("peak_{channel}"), summary.max);
        self.insert(format!("avg_{channel}"), summary.mean);
    }

    /// Look up a statistic
    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    /// Look up a statistic, reporting zero when absent
    pub fn get_or_zero(&self, key: &str) -> f64 {
        self.get(key).unwrap_or(0.0)
    }

    /// Whether any statistic was recorded
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of named statistics
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate statistics in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl FromIterator<(String, f64)> for AggregateStats {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute_summary;

    #[test]
    fn test_empty_by_default() {
        let stats = AggregateStats::new();
        assert!(stats.is_empty());
        assert_eq!(stats.get("peak_ram_mb"), None);
        assert_eq!(stats.get_or_zero("peak_ram_mb"), 0.0);
    }

    #[test]
    fn test_peak_and_average_keys() {
        let summary = compute_summary(&[100.0, 300.0]).unwrap();
        let mut stats = AggregateStats::new();
        stats.insert_peak_and_average("vram_mb", &summary);

        assert_eq!(stats.get("peak_vram_mb"), Some(300.0));
        assert_eq!(stats.get("avg_vram_mb"), Some(200.0));
        assert_eq!(stats.len(), 2);
    }

    #[test]
    fn test_iterates_in_key_order() {
        let stats: AggregateStats = [("b".to_string(), 2.0), ("a".to_string(), 1.0)]
            .into_iter()
            .collect();
        let keys: Vec<_> = stats.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let mut stats = AggregateStats::new();
        stats.insert("peak_ram_mb", 512.0);
        let json = serde_json::to_string(&stats).unwrap();
        assert_eq!(json, r#"{"peak_ram_mb":512.0}"#);
    }
}
