//! Summary Statistics
//!
//! - Mean, median, stddev from CLEANED data (outliers removed)
//! - Min, max, percentiles from ALL data (outliers preserved)

use crate::outliers::{OutlierMethod, detect_outliers};
use crate::percentiles::percentile_of_sorted;
use serde::{Deserialize, Serialize};

/// Summary of one benchmark's per-iteration timings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,

    pub min: f64,
    pub max: f64,

    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
    pub p999: f64,

    pub sample_count: usize,
    pub outlier_count: usize,
}

/// Compute summary statistics with proper separation of cleaned vs raw data
pub fn compute_summary(samples: &[f64], outlier_method: OutlierMethod) -> SummaryStatistics {
    if samples.is_empty() {
        return SummaryStatistics::default();
    }

    let analysis = detect_outliers(samples, outlier_method);
    let all = &analysis.sorted_samples;
    let cleaned = &analysis.cleaned_samples;

    let mean = if cleaned.is_empty() {
        0.0
    } else {
        cleaned.iter().sum::<f64>() / cleaned.len() as f64
    };

    let std_dev = if cleaned.len() < 2 {
        0.0
    } else {
        let variance =
            cleaned.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (cleaned.len() - 1) as f64;
        variance.sqrt()
    };

    SummaryStatistics {
        mean,
        median: percentile_of_sorted(cleaned, 50.0),
        std_dev,
        min: all[0],
        max: all[all.len() - 1],
        p50: percentile_of_sorted(all, 50.0),
        p90: percentile_of_sorted(all, 90.0),
        p95: percentile_of_sorted(all, 95.0),
        p99: percentile_of_sorted(all, 99.0),
        p999: percentile_of_sorted(all, 99.9),
        sample_count: all.len(),
        outlier_count: analysis.outlier_count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_summary() {
        let summary = compute_summary(&[3.0, 1.0, 5.0, 2.0, 4.0], OutlierMethod::default());

        assert!((summary.mean - 3.0).abs() < 0.01);
        assert!((summary.median - 3.0).abs() < 0.01);
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.max, 5.0);
        assert_eq!(summary.sample_count, 5);
    }

    #[test]
    fn test_outlier_handling() {
        let summary = compute_summary(&[1.0, 2.0, 3.0, 4.0, 5.0, 100.0], OutlierMethod::default());

        // Central tendency ignores the outlier, the extremes keep it
        assert!(summary.mean < 10.0);
        assert_eq!(summary.max, 100.0);
        assert!(summary.p99 > 50.0);
        assert_eq!(summary.outlier_count, 1);
    }

    #[test]
    fn test_constant_samples_have_no_spread() {
        let summary = compute_summary(&[100.0; 5], OutlierMethod::None);
        assert_eq!(summary.std_dev, 0.0);
        assert_eq!(summary.p999, 100.0);
    }

    #[test]
    fn test_negative_fence_multiplier_keeps_extremes() {
        let summary = compute_summary(&[1.0, 2.0, 3.0, 4.0, 5.0], OutlierMethod::Iqr { k: -1.0 });
        assert_eq!(summary.sample_count, 5);
        assert_eq!(summary.outlier_count, 5);
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.max, 5.0);
        assert_eq!(summary.mean, 0.0);
    }

    #[test]
    fn test_empty_samples() {
        let summary = compute_summary(&[], OutlierMethod::default());
        assert_eq!(summary.sample_count, 0);
        assert_eq!(summary.mean, 0.0);
    }

    #[test]
    fn test_sub_nanosecond_values() {
        let summary = compute_summary(&[0.31, 0.29, 0.30, 0.30], OutlierMethod::default());
        assert!((summary.mean - 0.30).abs() < 0.01);
        assert!(summary.min > 0.0);
    }
}
