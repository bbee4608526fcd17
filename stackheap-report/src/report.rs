//! Report Data Structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stackheap_core::{Severity, Strategy};
use stackheap_stats::SummaryStatistics;

/// Complete run report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub meta: ReportMeta,
    pub results: Vec<BenchmarkReportResult>,
    /// Stack vs heap rows, one per size class with both arms measured
    pub pairs: Vec<PairComparison>,
    pub expectations: Vec<ExpectationResult>,
    pub summary: ReportSummary,
}

impl Report {
    /// Look up a sub-benchmark result by id (`small/stack`)
    pub fn result(&self, id: &str) -> Option<&BenchmarkReportResult> {
        self.results.iter().find(|r| r.id == id)
    }
}

/// Report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMeta {
    pub schema_version: u32,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub git_commit: Option<String>,
    pub git_branch: Option<String>,
    pub system: SystemInfo,
    pub config: ReportConfig,
}

/// Execution configuration captured in report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub warmup_time_ns: u64,
    pub measurement_time_ns: u64,
    pub min_iterations: Option<u64>,
    pub max_iterations: Option<u64>,
    pub target_samples: usize,
    pub track_allocations: bool,
    pub pin_cpu: Option<usize>,
}

/// System information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os: String,
    pub arch: String,
    pub cpu: String,
    pub cpu_cores: u32,
    pub memory_gb: f64,
}

/// One sub-benchmark in the report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkReportResult {
    pub id: String,
    pub group: String,
    pub strategy: Strategy,
    pub width_bytes: usize,
    pub status: BenchmarkStatus,
    pub file: String,
    pub line: u32,
    pub metrics: Option<BenchmarkMetrics>,
    pub failure: Option<FailureInfo>,
}

/// Sub-benchmark execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BenchmarkStatus {
    Passed,
    /// Runner function returned an error (e.g. the unit could not spawn)
    Failed,
    /// Execution unit panicked
    Crashed,
}

/// Per-iteration timing and allocation metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BenchmarkMetrics {
    pub samples: usize,
    pub iterations: u64,
    pub warmup_iterations: u64,
    pub mean_ns: f64,
    pub median_ns: f64,
    pub std_dev_ns: f64,
    pub min_ns: f64,
    pub max_ns: f64,
    pub p50_ns: f64,
    pub p90_ns: f64,
    pub p95_ns: f64,
    pub p99_ns: f64,
    pub p999_ns: f64,
    pub outliers: usize,
    pub throughput_ops_sec: Option<f64>,
    pub allocs_per_iter: f64,
    pub bytes_per_iter: f64,
    /// 0 on platforms without a cycle counter
    pub cycles_per_iter: f64,
}

impl From<&SummaryStatistics> for BenchmarkMetrics {
    fn from(stats: &SummaryStatistics) -> Self {
        Self {
            samples: stats.sample_count,
            mean_ns: stats.mean,
            median_ns: stats.median,
            std_dev_ns: stats.std_dev,
            min_ns: stats.min,
            max_ns: stats.max,
            p50_ns: stats.p50,
            p90_ns: stats.p90,
            p95_ns: stats.p95,
            p99_ns: stats.p99,
            p999_ns: stats.p999,
            outliers: stats.outlier_count,
            throughput_ops_sec: (stats.mean > 0.0).then(|| 1_000_000_000.0 / stats.mean),
            ..Default::default()
        }
    }
}

/// Stack vs heap row for one size class
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairComparison {
    /// Size class group
    pub group: String,
    /// Value width in bytes
    pub width_bytes: usize,
    /// Mean ns/iteration of the by-value arm
    pub stack_mean_ns: f64,
    /// Mean ns/iteration of the by-reference arm
    pub heap_mean_ns: f64,
    /// `heap_mean_ns / stack_mean_ns` (>1.0 = stack faster)
    pub heap_over_stack: f64,
    /// Allocations per iteration of the by-value arm
    pub stack_allocs_per_iter: f64,
    /// Allocations per iteration of the by-reference arm
    pub heap_allocs_per_iter: f64,
}

/// Outcome of one expectation check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpectationResult {
    /// Stable identifier, e.g. `stack_cheaper_small`
    pub id: String,
    /// What the expectation asserts
    pub description: String,
    /// Impact of a failure
    pub severity: Severity,
    /// Outcome
    pub status: ExpectationStatus,
    /// Measured values behind the outcome
    pub message: String,
}

impl ExpectationResult {
    /// Failed with critical severity
    pub fn is_critical_failure(&self) -> bool {
        self.status == ExpectationStatus::Failed && self.severity == Severity::Critical
    }
}

/// Expectation status; `Skipped` when an input benchmark is missing or crashed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "status")]
pub enum ExpectationStatus {
    Passed,
    Failed,
    Skipped { missing: String },
}

/// Failure information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureInfo {
    pub kind: String,
    pub message: String,
}

/// Report summary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_benchmarks: usize,
    pub passed: usize,
    pub failed: usize,
    pub crashed: usize,
    pub expectations_failed: usize,
    pub critical_failures: usize,
    pub total_duration_ms: f64,
}

impl ReportSummary {
    /// Whether the run should exit non-zero
    pub fn should_fail(&self) -> bool {
        self.crashed > 0 || self.failed > 0 || self.critical_failures > 0
    }
}
