//! Report Building
//!
//! Turns execution results and their summary statistics into a [`Report`].
//! Pair comparisons and expectations are filled in afterwards from the
//! finished per-benchmark results.
//!
//! ```text
//! BenchExecutionResult + SummaryStatistics
//!              │
//!              ▼
//!   ┌─────────────────────┐
//!   │  BenchmarkMetrics   │  timing stats + allocations + cycles
//!   └──────────┬──────────┘
//!              │
//!              ▼
//!   ┌─────────────────────┐
//!   │      Report         │  pairs / expectations attached later
//!   └─────────────────────┘
//! ```

use super::execution::{BenchExecutionResult, ExecutionConfig};
use super::metadata::build_report_meta;
use stackheap_report::{
    BenchmarkMetrics, BenchmarkReportResult, BenchmarkStatus, FailureInfo, Report, ReportSummary,
};
use stackheap_stats::SummaryStatistics;
use std::collections::HashMap;

/// Build a complete Report from execution results
pub fn build_report(
    results: &[BenchExecutionResult],
    stats: &[(String, Option<SummaryStatistics>)],
    config: &ExecutionConfig,
    total_duration_ms: f64,
) -> Report {
    let stats_map: HashMap<&str, &SummaryStatistics> = stats
        .iter()
        .filter_map(|(id, s)| s.as_ref().map(|s| (id.as_str(), s)))
        .collect();

    let mut benchmark_results = Vec::with_capacity(results.len());
    let mut summary = ReportSummary {
        total_benchmarks: results.len(),
        total_duration_ms,
        ..Default::default()
    };

    for result in results {
        let metrics = stats_map
            .get(result.benchmark_id.as_str())
            .map(|s| BenchmarkMetrics {
                iterations: result.iterations,
                warmup_iterations: result.warmup_iterations,
                allocs_per_iter: result.allocs_per_iter(),
                bytes_per_iter: result.bytes_per_iter(),
                cycles_per_iter: result.cycles_per_iter(),
                ..BenchmarkMetrics::from(*s)
            });

        let failure = result.error_message.as_ref().map(|msg| FailureInfo {
            kind: result
                .failure_kind
                .clone()
                .unwrap_or_else(|| "panic".to_string()),
            message: msg.clone(),
        });

        match result.status {
            BenchmarkStatus::Passed => summary.passed += 1,
            BenchmarkStatus::Failed => summary.failed += 1,
            BenchmarkStatus::Crashed => summary.crashed += 1,
        }

        benchmark_results.push(BenchmarkReportResult {
            id: result.benchmark_id.clone(),
            group: result.group.clone(),
            strategy: result.strategy,
            width_bytes: result.width_bytes,
            status: result.status,
            file: result.file.clone(),
            line: result.line,
            metrics,
            failure,
        });
    }

    Report {
        meta: build_report_meta(config),
        results: benchmark_results,
        pairs: Vec::new(),        // Filled by compare_pairs
        expectations: Vec::new(), // Filled by evaluate_expectations
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackheap_core::Strategy;
    use stackheap_stats::{OutlierMethod, compute_summary};

    fn passed(id: &str, samples: Vec<f64>, iterations: u64, alloc_count: u64) -> BenchExecutionResult {
        BenchExecutionResult {
            benchmark_id: id.to_string(),
            group: "small".to_string(),
            strategy: Strategy::ByReference,
            width_bytes: 8,
            file: "pairs.rs".to_string(),
            line: 1,
            status: BenchmarkStatus::Passed,
            samples,
            iterations,
            warmup_iterations: 0,
            total_time_ns: 0,
            total_cycles: 0,
            alloc_bytes: alloc_count * 8,
            alloc_count,
            duration_ns: 0,
            failure_kind: None,
            error_message: None,
        }
    }

    #[test]
    fn test_metrics_merge_stats_and_allocations() {
        let result = passed("small/heap", vec![10.0, 11.0, 12.0], 300, 300);
        let stats = vec![(
            "small/heap".to_string(),
            Some(compute_summary(&result.samples, OutlierMethod::None)),
        )];

        let report = build_report(&[result], &stats, &ExecutionConfig::default(), 1.0);
        let metrics = report.results[0].metrics.as_ref().unwrap();

        assert!((metrics.mean_ns - 11.0).abs() < 1e-9);
        assert_eq!(metrics.iterations, 300);
        assert_eq!(metrics.allocs_per_iter, 1.0);
        assert_eq!(metrics.bytes_per_iter, 8.0);
        assert_eq!(report.summary.passed, 1);
        assert!(report.pairs.is_empty());
    }

    #[test]
    fn test_crashed_result_has_failure_and_no_metrics() {
        let mut result = passed("small/heap", Vec::new(), 0, 0);
        result.status = BenchmarkStatus::Crashed;
        result.error_message = Some("boom".to_string());
        let stats = vec![("small/heap".to_string(), None)];

        let report = build_report(&[result], &stats, &ExecutionConfig::default(), 1.0);
        let r = &report.results[0];

        assert!(r.metrics.is_none());
        assert_eq!(r.failure.as_ref().unwrap().kind, "panic");
        assert_eq!(report.summary.crashed, 1);
        assert!(report.summary.should_fail());
    }
}
