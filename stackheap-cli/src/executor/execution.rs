//! Benchmark Execution
//!
//! Runs sub-benchmarks one after another in this process. Isolation comes
//! from the sub-benchmarks themselves: each invocation spawns its own
//! execution unit, so the executor only has to hand out a fresh `Bencher`
//! and catch whatever the unit re-raises.
//!
//! ## Data Flow
//!
//! ```text
//! BenchmarkDef (from inventory)
//!        │
//!        ▼
//!   ExecutionConfig ──► LoopPolicy + Bencher
//!        │
//!        ▼
//! ┌──────────────────┐
//! │     Executor     │  runner_fn → ExecutionUnit → Bencher::iter
//! └────────┬─────────┘
//!          │
//!          ▼
//!  BenchExecutionResult (per-iteration samples, status, allocations, cycles)
//! ```

use indicatif::{ProgressBar, ProgressStyle};
use stackheap_core::{Bencher, BenchmarkDef, LoopPolicy, Strategy, run_benchmark_loop};
use stackheap_report::{BenchmarkStatus, ReportConfig};
use stackheap_stats::OutlierMethod;
use std::time::Instant;

/// Configuration for benchmark execution
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    /// Warmup time in nanoseconds
    pub warmup_time_ns: u64,
    /// Measurement time in nanoseconds
    pub measurement_time_ns: u64,
    /// Minimum iterations
    pub min_iterations: Option<u64>,
    /// Maximum iterations
    pub max_iterations: Option<u64>,
    /// Number of timed batches to aim for
    pub target_samples: usize,
    /// Track allocations
    pub track_allocations: bool,
    /// CPU every execution unit pins itself to
    pub pin_cpu: Option<usize>,
    /// Outlier detection for the central statistics
    pub outlier_method: OutlierMethod,
}

impl ExecutionConfig {
    /// Fixed-count mode: no warmup, exactly `iterations` measured iterations
    pub fn fixed(iterations: u64) -> Self {
        Self {
            warmup_time_ns: 0,
            measurement_time_ns: 0,
            min_iterations: Some(iterations),
            max_iterations: Some(iterations),
            ..Self::default()
        }
    }

    /// Loop policy handed to every bencher
    pub fn loop_policy(&self) -> LoopPolicy {
        LoopPolicy {
            warmup_time_ns: self.warmup_time_ns,
            measurement_time_ns: self.measurement_time_ns,
            min_iterations: self.min_iterations,
            max_iterations: self.max_iterations,
        }
    }

    /// Fresh bencher for one sub-benchmark invocation
    pub fn bencher(&self) -> Bencher {
        Bencher::with_config(self.track_allocations, self.target_samples)
            .with_policy(self.loop_policy())
            .with_cpu_affinity(self.pin_cpu)
    }

    /// Snapshot recorded in report metadata
    pub fn report_config(&self) -> ReportConfig {
        ReportConfig {
            warmup_time_ns: self.warmup_time_ns,
            measurement_time_ns: self.measurement_time_ns,
            min_iterations: self.min_iterations,
            max_iterations: self.max_iterations,
            target_samples: self.target_samples,
            track_allocations: self.track_allocations,
            pin_cpu: self.pin_cpu,
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            warmup_time_ns: 1_000_000_000,      // 1 second
            measurement_time_ns: 3_000_000_000, // 3 seconds
            min_iterations: None,
            max_iterations: None,
            target_samples: stackheap_core::DEFAULT_SAMPLE_COUNT,
            track_allocations: true,
            pin_cpu: None,
            outlier_method: OutlierMethod::default(),
        }
    }
}

/// Result from executing a single sub-benchmark
#[derive(Debug)]
pub struct BenchExecutionResult {
    pub benchmark_id: String,
    pub group: String,
    pub strategy: Strategy,
    pub width_bytes: usize,
    pub file: String,
    pub line: u32,
    pub status: BenchmarkStatus,
    /// Per-iteration nanoseconds, one entry per timed batch
    pub samples: Vec<f64>,
    pub iterations: u64,
    pub warmup_iterations: u64,
    pub total_time_ns: u64,
    pub total_cycles: u64,
    pub alloc_bytes: u64,
    pub alloc_count: u64,
    /// Wall time of the whole invocation, unit spawn included
    pub duration_ns: u64,
    pub failure_kind: Option<String>,
    pub error_message: Option<String>,
}

impl BenchExecutionResult {
    fn empty(bench: &BenchmarkDef, status: BenchmarkStatus, duration_ns: u64) -> Self {
        Self {
            benchmark_id: bench.id.to_string(),
            group: bench.group.to_string(),
            strategy: bench.strategy,
            width_bytes: bench.width_bytes,
            file: bench.file.to_string(),
            line: bench.line,
            status,
            samples: Vec::new(),
            iterations: 0,
            warmup_iterations: 0,
            total_time_ns: 0,
            total_cycles: 0,
            alloc_bytes: 0,
            alloc_count: 0,
            duration_ns,
            failure_kind: None,
            error_message: None,
        }
    }

    /// Mean allocations per measured iteration
    pub fn allocs_per_iter(&self) -> f64 {
        per_iter(self.alloc_count, self.iterations)
    }

    /// Mean bytes allocated per measured iteration
    pub fn bytes_per_iter(&self) -> f64 {
        per_iter(self.alloc_bytes, self.iterations)
    }

    /// Mean CPU cycles per measured iteration (0 without a cycle counter)
    pub fn cycles_per_iter(&self) -> f64 {
        per_iter(self.total_cycles, self.iterations)
    }
}

fn per_iter(total: u64, iterations: u64) -> f64 {
    if iterations == 0 {
        0.0
    } else {
        total as f64 / iterations as f64
    }
}

/// Execute sub-benchmarks and produce results
pub struct Executor {
    config: ExecutionConfig,
    results: Vec<BenchExecutionResult>,
    show_progress: bool,
}

impl Executor {
    /// Executor with a progress bar
    pub fn new(config: ExecutionConfig) -> Self {
        Self {
            config,
            results: Vec::new(),
            show_progress: true,
        }
    }

    /// Disable the progress bar (tests, JSON piped to another process)
    pub fn without_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }

    /// Execute all provided sub-benchmarks, sequentially
    pub fn execute(&mut self, benchmarks: &[&BenchmarkDef]) -> Vec<BenchExecutionResult> {
        let pb = if self.show_progress {
            let pb = ProgressBar::new(benchmarks.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template(
                        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                    )
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            pb
        } else {
            ProgressBar::hidden()
        };

        for bench in benchmarks {
            pb.set_message(bench.id.to_string());
            let result = self.execute_single(bench);
            self.results.push(result);
            pb.inc(1);
        }

        pb.finish_with_message("Complete");
        std::mem::take(&mut self.results)
    }

    /// Execute a single sub-benchmark
    fn execute_single(&self, bench: &BenchmarkDef) -> BenchExecutionResult {
        let start = Instant::now();
        tracing::debug!(id = bench.id, "starting sub-benchmark");

        // A unit that panics re-raises on this thread; catch it here so the
        // remaining sub-benchmarks still run.
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            run_benchmark_loop(self.config.bencher(), |b| (bench.runner_fn)(b))
        }));

        let duration_ns = start.elapsed().as_nanos() as u64;

        match result {
            Ok(Ok(bench_result)) => {
                tracing::debug!(
                    id = bench.id,
                    iterations = bench_result.iterations,
                    samples = bench_result.samples.len(),
                    "sub-benchmark complete"
                );

                BenchExecutionResult {
                    samples: bench_result
                        .samples
                        .iter()
                        .map(|s| s.nanos_per_iter())
                        .collect(),
                    iterations: bench_result.iterations,
                    warmup_iterations: bench_result.warmup_iterations,
                    total_time_ns: bench_result.total_time_ns,
                    total_cycles: bench_result.samples.iter().map(|s| s.total_cycles).sum(),
                    alloc_bytes: bench_result.alloc_bytes,
                    alloc_count: bench_result.alloc_count,
                    ..BenchExecutionResult::empty(bench, BenchmarkStatus::Passed, duration_ns)
                }
            }
            Ok(Err(e)) => {
                tracing::warn!(id = bench.id, error = %e, "sub-benchmark failed");
                let message = match std::error::Error::source(&e) {
                    Some(source) => format!("{}: {}", e, source),
                    None => e.to_string(),
                };
                BenchExecutionResult {
                    failure_kind: Some("spawn".to_string()),
                    error_message: Some(message),
                    ..BenchExecutionResult::empty(bench, BenchmarkStatus::Failed, duration_ns)
                }
            }
            Err(panic) => {
                let message = if let Some(s) = panic.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                tracing::warn!(id = bench.id, %message, "sub-benchmark crashed");

                BenchExecutionResult {
                    failure_kind: Some("panic".to_string()),
                    error_message: Some(message),
                    ..BenchExecutionResult::empty(bench, BenchmarkStatus::Crashed, duration_ns)
                }
            }
        }
    }
}
