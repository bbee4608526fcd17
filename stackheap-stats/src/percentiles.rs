//! Percentile Computation
//!
//! Percentiles are taken over all samples. A page fault or a preempted batch
//! is part of what the stack arm costs, so the tail keeps its outliers.

/// Percentile of an already sorted slice, linear interpolation between ranks.
pub fn percentile_of_sorted(sorted: &[f64], percentile: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = (percentile / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = (lower + 1).min(n - 1);
            let fraction = rank - lower as f64;
            sorted[lower] + fraction * (sorted[upper] - sorted[lower])
        }
    }
}
