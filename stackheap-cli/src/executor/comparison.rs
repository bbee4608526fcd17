//! Pair Comparisons
//!
//! One row per measurement pair whose stack and heap arms both produced
//! metrics, ordered by width.

use stackheap_core::Strategy;
use stackheap_report::{BenchmarkMetrics, BenchmarkReportResult, BenchmarkStatus, PairComparison};
use std::collections::BTreeMap;

/// Metrics of one arm, if it ran to completion
pub(crate) fn arm_metrics<'a>(
    results: &'a [BenchmarkReportResult],
    group: &str,
    strategy: Strategy,
) -> Option<&'a BenchmarkMetrics> {
    results
        .iter()
        .find(|r| r.group == group && r.strategy == strategy)
        .filter(|r| r.status == BenchmarkStatus::Passed)
        .and_then(|r| r.metrics.as_ref())
}

/// Groups present in the results, ordered by width
pub(crate) fn groups_by_width(results: &[BenchmarkReportResult]) -> Vec<(&str, usize)> {
    let mut groups: BTreeMap<(usize, &str), ()> = BTreeMap::new();
    for r in results {
        groups.insert((r.width_bytes, r.group.as_str()), ());
    }
    groups.into_keys().map(|(w, g)| (g, w)).collect()
}

/// Build stack vs heap rows for every complete pair
pub fn compare_pairs(results: &[BenchmarkReportResult]) -> Vec<PairComparison> {
    groups_by_width(results)
        .into_iter()
        .filter_map(|(group, width_bytes)| {
            let stack = arm_metrics(results, group, Strategy::ByValue)?;
            let heap = arm_metrics(results, group, Strategy::ByReference)?;

            let heap_over_stack = if stack.mean_ns > 0.0 {
                heap.mean_ns / stack.mean_ns
            } else {
                f64::INFINITY
            };

            Some(PairComparison {
                group: group.to_string(),
                width_bytes,
                stack_mean_ns: stack.mean_ns,
                heap_mean_ns: heap.mean_ns,
                heap_over_stack,
                stack_allocs_per_iter: stack.allocs_per_iter,
                heap_allocs_per_iter: heap.allocs_per_iter,
            })
        })
        .collect()
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_rows_ordered_by_width() {
        let results = vec![
            arm("huge", 1 << 20, Strategy::ByValue, 100.0, 0.0),
            arm("huge", 1 << 20, Strategy::ByReference, 120.0, 1.0),
            arm("small", 8, Strategy::ByValue, 1.0, 0.0),
            arm("small", 8, Strategy::ByReference, 20.0, 1.0),
        ];

        let pairs = compare_pairs(&results);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].group, "small");
        assert!((pairs[0].heap_over_stack - 20.0).abs() < 1e-9);
        assert_eq!(pairs[0].heap_allocs_per_iter, 1.0);
        assert_eq!(pairs[1].group, "huge");
    }

    #[test]
    fn test_incomplete_pair_is_omitted() {
        let results = vec![
            arm("medium", 1024, Strategy::ByValue, 5.0, 0.0),
            crashed("medium", 1024, Strategy::ByReference),
            arm("large", 4096, Strategy::ByValue, 9.0, 0.0),
        ];
        assert!(compare_pairs(&results).is_empty());
    }
}
