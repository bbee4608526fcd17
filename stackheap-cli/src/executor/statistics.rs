//! Statistics Computation
//!
//! Parallel computation of summary statistics for sub-benchmark results.
//! Each result's per-iteration samples are summarised independently:
//! - Central tendency (mean, median) over outlier-cleaned samples
//! - Dispersion (std dev, min, max)
//! - Percentiles (p50, p90, p95, p99, p999)

use super::execution::{BenchExecutionResult, ExecutionConfig};
use rayon::prelude::*;
use stackheap_stats::{SummaryStatistics, compute_summary};

/// Compute statistics for sub-benchmark results (parallelized with Rayon)
///
/// Returns `None` for results with no samples (crashed or failed runs).
pub fn compute_statistics(
    results: &[BenchExecutionResult],
    config: &ExecutionConfig,
) -> Vec<(String, Option<SummaryStatistics>)> {
    results
        .par_iter()
        .map(|r| {
            if r.samples.is_empty() {
                (r.benchmark_id.clone(), None)
            } else {
                let stats = compute_summary(&r.samples, config.outlier_method);
                (r.benchmark_id.clone(), Some(stats))
            }
        })
        .collect()
}
