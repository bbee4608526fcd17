//! Output Formatting
//!
//! Human-readable terminal output for a finished report: per-benchmark
//! timing and allocation metrics grouped by size class, the stack vs heap
//! table, expectation outcomes and the summary.

use stackheap_report::{
    BenchmarkReportResult, BenchmarkStatus, ExpectationStatus, Report, format_bytes,
    format_duration,
};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Format a report for human-readable terminal display
pub fn format_human_output(report: &Report) -> String {
    let mut output = String::new();

    output.push('\n');
    output.push_str("stackheap Results\n");
    output.push_str(&"=".repeat(60));
    output.push_str("\n\n");

    // Group results, narrowest values first
    let mut groups: BTreeMap<(usize, &str), Vec<&BenchmarkReportResult>> = BTreeMap::new();
    for result in &report.results {
        groups
            .entry((result.width_bytes, result.group.as_str()))
            .or_default()
            .push(result);
    }

    for ((width, group), results) in groups {
        let _ = writeln!(output, "Group: {} ({})", group, format_bytes(width));
        output.push_str(&"-".repeat(60));
        output.push('\n');

        for result in results {
            let status_icon = match result.status {
                BenchmarkStatus::Passed => "✓",
                BenchmarkStatus::Failed => "✗",
                BenchmarkStatus::Crashed => "💥",
            };

            let _ = writeln!(output, "  {} {}", status_icon, result.id);

            if let Some(metrics) = &result.metrics {
                let _ = writeln!(
                    output,
                    "      mean: {}  median: {}  stddev: {}",
                    format_duration(metrics.mean_ns),
                    format_duration(metrics.median_ns),
                    format_duration(metrics.std_dev_ns)
                );
                let _ = writeln!(
                    output,
                    "      min: {}  max: {}  samples: {}  iterations: {}",
                    format_duration(metrics.min_ns),
                    format_duration(metrics.max_ns),
                    metrics.samples,
                    metrics.iterations
                );
                let _ = writeln!(
                    output,
                    "      p50: {}  p95: {}  p99: {}",
                    format_duration(metrics.p50_ns),
                    format_duration(metrics.p95_ns),
                    format_duration(metrics.p99_ns)
                );
                if let Some(throughput) = metrics.throughput_ops_sec {
                    let _ = writeln!(output, "      throughput: {:.2} ops/sec", throughput);
                }
                let _ = writeln!(
                    output,
                    "      allocations: {:.3}/iter ({:.1} bytes/iter)",
                    metrics.allocs_per_iter, metrics.bytes_per_iter
                );
                if metrics.cycles_per_iter > 0.0 {
                    let _ = writeln!(output, "      cycles: {:.1}/iter", metrics.cycles_per_iter);
                }
            }

            if let Some(failure) = &result.failure {
                let _ = writeln!(output, "      error ({}): {}", failure.kind, failure.message);
            }

            output.push('\n');
        }
    }

    if !report.pairs.is_empty() {
        output.push_str("Stack vs Heap\n");
        output.push_str(&"-".repeat(60));
        output.push('\n');
        let _ = writeln!(
            output,
            "  {:<8} {:>8}  {:>12}  {:>12}  {:>9}",
            "group", "width", "stack", "heap", "heap/stk"
        );
        for pair in &report.pairs {
            let _ = writeln!(
                output,
                "  {:<8} {:>8}  {:>12}  {:>12}  {:>8.2}x",
                pair.group,
                format_bytes(pair.width_bytes),
                format_duration(pair.stack_mean_ns),
                format_duration(pair.heap_mean_ns),
                pair.heap_over_stack
            );
        }
        output.push('\n');
    }

    // Expectations (skipped ones are only counted)
    let active: Vec<_> = report
        .expectations
        .iter()
        .filter(|e| !matches!(e.status, ExpectationStatus::Skipped { .. }))
        .collect();
    let skipped = report.expectations.len() - active.len();

    if !active.is_empty() || skipped > 0 {
        output.push_str("Expectations\n");
        output.push_str(&"-".repeat(60));
        output.push('\n');

        for e in active {
            let icon = if e.status == ExpectationStatus::Passed {
                "✓"
            } else {
                "✗"
            };
            let _ = writeln!(
                output,
                "  {} [{:?}] {} : {}",
                icon, e.severity, e.id, e.message
            );
        }
        if skipped > 0 {
            let _ = writeln!(output, "  ⊘ {} skipped", skipped);
        }
        output.push('\n');
    }

    output.push_str("Summary\n");
    output.push_str(&"-".repeat(60));
    output.push('\n');
    let _ = writeln!(
        output,
        "  Total: {}  Passed: {}  Failed: {}  Crashed: {}",
        report.summary.total_benchmarks,
        report.summary.passed,
        report.summary.failed,
        report.summary.crashed
    );
    let _ = writeln!(
        output,
        "  Expectations failed: {} ({} critical)",
        report.summary.expectations_failed, report.summary.critical_failures
    );
    let _ = writeln!(
        output,
        "  Duration: {:.2} ms",
        report.summary.total_duration_ms
    );

    output
}
