//! Outlier Detection
//!
//! Outliers are detected but kept for min/max/percentiles; only the central
//! tendency (mean, median, stddev) is computed over the cleaned samples.

use crate::percentiles::percentile_of_sorted;
use serde::{Deserialize, Serialize};

/// Method for outlier detection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "method")]
pub enum OutlierMethod {
    /// Tukey fences: outside `[Q1 - k*IQR, Q3 + k*IQR]`
    Iqr {
        /// Fence multiplier (1.5 = standard Tukey fences)
        k: f64,
    },
    /// Keep every sample
    None,
}

impl Default for OutlierMethod {
    fn default() -> Self {
        OutlierMethod::Iqr {
            k: crate::DEFAULT_IQR_MULTIPLIER,
        }
    }
}

impl OutlierMethod {
    /// Whether the fences are well formed (a finite, non-negative `k`)
    pub fn is_valid(&self) -> bool {
        match *self {
            OutlierMethod::Iqr { k } => k.is_finite() && k >= 0.0,
            OutlierMethod::None => true,
        }
    }
}

/// Result of outlier analysis
#[derive(Debug, Clone)]
pub struct OutlierAnalysis {
    /// All samples, sorted ascending
    pub sorted_samples: Vec<f64>,
    /// Samples inside the fences, sorted ascending
    pub cleaned_samples: Vec<f64>,
    /// Samples below the lower fence
    pub low_outlier_count: usize,
    /// Samples above the upper fence and not already below the lower one
    pub high_outlier_count: usize,
}

impl OutlierAnalysis {
    /// Total outliers on both sides
    pub fn outlier_count(&self) -> usize {
        self.low_outlier_count + self.high_outlier_count
    }
}

/// Detect outliers in samples using the given method.
///
/// Inverted fences (a negative `k`) leave nothing inside them: every sample
/// counts as an outlier once and the cleaned set is empty.
pub fn detect_outliers(samples: &[f64], method: OutlierMethod) -> OutlierAnalysis {
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);

    let (lower, upper) = match method {
        OutlierMethod::None => (f64::NEG_INFINITY, f64::INFINITY),
        OutlierMethod::Iqr { .. } if sorted.is_empty() => (0.0, 0.0),
        OutlierMethod::Iqr { k } => {
            let q1 = percentile_of_sorted(&sorted, 25.0);
            let q3 = percentile_of_sorted(&sorted, 75.0);
            let iqr = q3 - q1;
            (q1 - k * iqr, q3 + k * iqr)
        }
    };

    let low_outlier_count = sorted.iter().filter(|&&s| s < lower).count();
    let high_outlier_count = sorted.iter().filter(|&&s| s > upper && s >= lower).count();
    let cleaned_samples: Vec<f64> = sorted
        .iter()
        .copied()
        .filter(|&s| s >= lower && s <= upper)
        .collect();

    OutlierAnalysis {
        sorted_samples: sorted,
        cleaned_samples,
        low_outlier_count,
        high_outlier_count,
    }
}
