//! Z-score anomaly detection.
//!
//! A point is anomalous when its distance from the series mean exceeds
//! `threshold` sample standard deviations (divisor `n - 1`).

use crate::descriptive::DescriptiveStats;

/// Default z-score threshold.
pub const DEFAULT_Z_THRESHOLD: f64 = 3.0;

/// Returns the indices of points whose absolute z-score exceeds `threshold`.
///
/// Series with fewer than two points and constant series (zero variance)
/// have no anomalies. Neither does a series containing NaN.
///
/// # Examples
///
/// ```
/// use breakcue_stats::anomaly::zscore_outliers;
///
/// let mut series = vec![0.5; 20];
/// series[7] = 5.0;
/// assert_eq!(zscore_outliers(&series, 3.0), vec![7]);
/// assert!(zscore_outliers(&[1.0, 1.0, 1.0], 3.0).is_empty());
/// ```
#[must_use]
pub fn zscore_outliers(series: &[f64], threshold: f64) -> Vec<usize> {
    if series.len() < 2 {
        return vec![];
    }
    let Some(stats) = DescriptiveStats::new(series.iter().copied()) else {
        return vec![];
    };
    if stats.sample_std_dev <= 0.0 || !stats.sample_std_dev.is_finite() {
        return vec![];
    }
    series
        .iter()
        .enumerate()
        .filter(|(_, v)| ((*v - stats.mean) / stats.sample_std_dev).abs() > threshold)
        .map(|(i, _)| i)
        .collect()
}
