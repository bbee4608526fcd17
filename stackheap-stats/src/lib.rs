#![warn(missing_docs)]
//! stackheap Statistics
//!
//! Summary statistics for per-iteration timings:
//! - Outlier detection via Tukey fences (IQR)
//! - Percentiles by linear interpolation, computed over all samples
//! - Mean/median/stddev over outlier-cleaned samples

mod outliers;
mod percentiles;
mod summary;

pub use outliers::{OutlierAnalysis, OutlierMethod, detect_outliers};
pub use percentiles::percentile_of_sorted;
pub use summary::{SummaryStatistics, compute_summary};

/// Tukey fence multiplier used when none is configured
pub const DEFAULT_IQR_MULTIPLIER: f64 = 1.5;
