//! Bencher - The Benchmark Iteration API
//!
//! The benchmark body owns the loop (in the style of Go's `b.Loop()`): a
//! sub-benchmark hands its construct-then-mutate closure to [`Bencher::iter`]
//! once, and the bencher drives warmup and measurement under the runner's
//! [`LoopPolicy`]. This lets the whole loop run inside a single execution unit.
//!
//! Iterations are grouped into samples (Criterion-style batched sampling):
//! each sample times a batch of iterations with one timer read, so timer
//! overhead does not swamp sub-nanosecond bodies.

use crate::allocator::{current_allocation, reset_allocation_counter};
use crate::measure::BatchTimer;
use crate::sample::Sample;
use std::hint::black_box;
use std::time::Instant;

/// Default number of samples to collect (matches Criterion)
pub const DEFAULT_SAMPLE_COUNT: usize = 100;

/// Minimum samples required for statistical validity
pub const MIN_SAMPLE_COUNT: usize = 10;

/// Iteration/time budget owned by the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopPolicy {
    /// Warmup duration in nanoseconds (0 = no warmup)
    pub warmup_time_ns: u64,
    /// Measurement duration in nanoseconds
    pub measurement_time_ns: u64,
    /// Minimum measured iterations before the loop may stop
    pub min_iterations: Option<u64>,
    /// Hard cap on measured iterations
    pub max_iterations: Option<u64>,
}

impl LoopPolicy {
    /// Exactly `iterations` measured iterations, no warmup.
    pub fn fixed(iterations: u64) -> Self {
        Self {
            warmup_time_ns: 0,
            measurement_time_ns: 0,
            min_iterations: Some(iterations),
            max_iterations: Some(iterations),
        }
    }
}

impl Default for LoopPolicy {
    fn default() -> Self {
        Self {
            warmup_time_ns: 1_000_000_000,      // 1 second
            measurement_time_ns: 3_000_000_000, // 3 seconds
            min_iterations: None,
            max_iterations: None,
        }
    }
}

/// Result of a single sub-benchmark invocation
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    /// All collected samples
    pub samples: Vec<Sample>,
    /// Measured iterations (warmup excluded)
    pub iterations: u64,
    /// Iterations spent in warmup
    pub warmup_iterations: u64,
    /// Total time spent in measured batches
    pub total_time_ns: u64,
    /// Bytes allocated across all measured iterations
    pub alloc_bytes: u64,
    /// Allocations across all measured iterations
    pub alloc_count: u64,
}

impl BenchmarkResult {
    /// Mean nanoseconds per measured iteration
    pub fn nanos_per_iter(&self) -> f64 {
        ratio(self.total_time_ns, self.iterations)
    }

    /// Mean allocations per measured iteration
    pub fn allocs_per_iter(&self) -> f64 {
        ratio(self.alloc_count, self.iterations)
    }

    /// Mean allocated bytes per measured iteration
    pub fn bytes_per_iter(&self) -> f64 {
        ratio(self.alloc_bytes, self.iterations)
    }
}

fn ratio(total: u64, iterations: u64) -> f64 {
    if iterations == 0 {
        0.0
    } else {
        total as f64 / iterations as f64
    }
}

/// The Bencher drives the measured loop for one sub-benchmark invocation.
///
/// - Warmup runs doubling batches to estimate iteration time
/// - Measurement batches `iters_per_sample` iterations per sample
/// - Allocation counters are reset per batch and summed across the run
pub struct Bencher {
    // === Completed samples ===
    samples: Vec<Sample>,

    // === Configuration ===
    target_samples: usize,
    iters_per_sample: u64,
    track_allocations: bool,
    policy: LoopPolicy,
    cpu_affinity: Option<usize>,

    // === State ===
    measured_iterations: u64,
    warmup_iterations: u64,
    warmup_nanos: u64,
    alloc_bytes: u64,
    alloc_count: u64,
}

impl Bencher {
    /// Create a new Bencher
    pub fn new(track_allocations: bool) -> Self {
        Self::with_config(track_allocations, DEFAULT_SAMPLE_COUNT)
    }

    /// Create a Bencher with custom sample count
    pub fn with_config(track_allocations: bool, target_samples: usize) -> Self {
        let target_samples = target_samples.max(MIN_SAMPLE_COUNT);
        Self {
            samples: Vec::with_capacity(target_samples),
            target_samples,
            iters_per_sample: 1, // Will be set after warmup
            track_allocations,
            policy: LoopPolicy::default(),
            cpu_affinity: None,
            measured_iterations: 0,
            warmup_iterations: 0,
            warmup_nanos: 0,
            alloc_bytes: 0,
            alloc_count: 0,
        }
    }

    /// Replace the loop policy
    pub fn with_policy(mut self, policy: LoopPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// CPU the execution unit should pin itself to
    pub fn with_cpu_affinity(mut self, cpu: Option<usize>) -> Self {
        self.cpu_affinity = cpu;
        self
    }

    /// Active loop policy
    pub fn policy(&self) -> &LoopPolicy {
        &self.policy
    }

    /// CPU requested for the execution unit, if any
    pub fn cpu_affinity(&self) -> Option<usize> {
        self.cpu_affinity
    }

    /// Estimated iteration time from warmup (in nanoseconds)
    pub fn estimated_iter_time_ns(&self) -> Option<f64> {
        if self.warmup_iterations == 0 {
            return None;
        }
        Some(self.warmup_nanos as f64 / self.warmup_iterations as f64)
    }

    /// Run `f` repeatedly under the loop policy: warmup, then measurement.
    ///
    /// Every call result passes through `black_box`, so the body cannot be
    /// optimised away even when it returns `()`.
    pub fn iter<T, F>(&mut self, mut f: F)
    where
        F: FnMut() -> T,
    {
        self.warm_up(&mut f);
        self.start_measurement();

        let measure_start = Instant::now();
        let min_iterations = self.policy.min_iterations.unwrap_or(0);
        let max_iterations = self
            .policy
            .max_iterations
            .unwrap_or(u64::MAX)
            .max(min_iterations);
        let measurement_time_ns = self.policy.measurement_time_ns as u128;

        loop {
            let measured = self.measured_iterations;
            if measured >= max_iterations {
                break;
            }

            // Stop on sample target or time budget, but only once the
            // minimum iteration count is satisfied.
            let min_iterations_met = measured >= min_iterations;
            let time_limit_reached = measure_start.elapsed().as_nanos() >= measurement_time_ns;
            if (self.has_enough_samples() || time_limit_reached) && min_iterations_met {
                break;
            }

            let batch = self.iters_per_sample.min(max_iterations - measured);
            self.measure_batch(batch, &mut f);
        }
    }

    fn warm_up<T, F>(&mut self, f: &mut F)
    where
        F: FnMut() -> T,
    {
        if self.policy.warmup_time_ns == 0 {
            return;
        }

        let warmup_start = Instant::now();
        let mut batch: u64 = 1;
        while warmup_start.elapsed().as_nanos() < self.policy.warmup_time_ns as u128 {
            let timer = BatchTimer::start();
            for _ in 0..batch {
                black_box(f());
            }
            let timing = timer.stop();

            self.warmup_iterations += batch;
            self.warmup_nanos += timing.nanos;
            batch = batch.saturating_mul(2);
        }
    }

    /// Derive the batch size for the measurement phase
    fn start_measurement(&mut self) {
        let time_per_sample = self.policy.measurement_time_ns / self.target_samples as u64;

        self.iters_per_sample = match self.estimated_iter_time_ns() {
            Some(iter_time) if iter_time > 0.0 && time_per_sample > 0 => {
                ((time_per_sample as f64 / iter_time) as u64).max(1)
            }
            // No estimate: spread a fixed iteration count over the sample target
            _ => match self.policy.max_iterations {
                Some(max) => max.div_ceil(self.target_samples as u64).max(1),
                None => 1,
            },
        };
    }

    #[inline]
    fn measure_batch<T, F>(&mut self, batch: u64, f: &mut F)
    where
        F: FnMut() -> T,
    {
        if self.track_allocations {
            reset_allocation_counter();
        }

        let timer = BatchTimer::start();
        for _ in 0..batch {
            black_box(f());
        }
        let timing = timer.stop();

        let (alloc_bytes, alloc_count) = if self.track_allocations {
            current_allocation()
        } else {
            (0, 0)
        };

        self.measured_iterations += batch;
        self.alloc_bytes += alloc_bytes;
        self.alloc_count += alloc_count;
        self.samples
            .push(Sample::new(batch, timing.nanos, timing.cycles, alloc_bytes, alloc_count));
    }

    /// Check if we've collected enough samples
    pub fn has_enough_samples(&self) -> bool {
        self.samples.len() >= self.target_samples
    }

    /// Get collected samples
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Measured iteration count so far
    pub fn iteration_count(&self) -> u64 {
        self.measured_iterations
    }

    /// Get target sample count
    pub fn target_samples(&self) -> usize {
        self.target_samples
    }

    /// Finalize and return results
    pub fn finish(self) -> BenchmarkResult {
        let total_time_ns: u64 = self.samples.iter().map(|s| s.total_nanos).sum();

        BenchmarkResult {
            samples: self.samples,
            iterations: self.measured_iterations,
            warmup_iterations: self.warmup_iterations,
            total_time_ns,
            alloc_bytes: self.alloc_bytes,
            alloc_count: self.alloc_count,
        }
    }
}

/// Invoke one sub-benchmark with a fresh bencher and collect its result.
///
/// Shared by the runner's executor and by tests; the runner function is
/// expected to call [`Bencher::iter`] (usually from inside an execution unit).
pub fn run_benchmark_loop<F, E>(mut bencher: Bencher, runner_fn: F) -> Result<BenchmarkResult, E>
where
    F: FnOnce(&mut Bencher) -> Result<(), E>,
{
    runner_fn(&mut bencher)?;
    Ok(bencher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_policy_runs_exact_iterations() {
        let mut bencher = Bencher::with_config(false, 10).with_policy(LoopPolicy::fixed(1000));
        bencher.iter(|| 42_u64);

        let result = bencher.finish();
        assert_eq!(result.iterations, 1000);
        assert_eq!(result.warmup_iterations, 0);
        assert_eq!(result.samples.len(), 10);
        assert!(result.samples.iter().all(|s| s.iterations == 100));
    }

    #[test]
    fn test_uneven_fixed_count_is_exact() {
        let mut bencher = Bencher::with_config(false, 10).with_policy(LoopPolicy::fixed(1005));
        bencher.iter(|| 1_u8);

        let result = bencher.finish();
        assert_eq!(result.iterations, 1005);
        let summed: u64 = result.samples.iter().map(|s| s.iterations).sum();
        assert_eq!(summed, 1005);
    }

    #[test]
    fn test_run_loop_respects_min_iterations() {
        let policy = LoopPolicy {
            warmup_time_ns: 0,
            measurement_time_ns: 0,
            min_iterations: Some(100),
            max_iterations: Some(100),
        };
        let bencher = Bencher::with_config(false, 10).with_policy(policy);
        let result = run_benchmark_loop(bencher, |b| {
            b.iter(|| 42_u64);
            Ok::<(), ()>(())
        })
        .unwrap();

        assert_eq!(result.iterations, 100);
    }

    #[test]
    fn test_run_loop_clamps_max_to_min() {
        let policy = LoopPolicy {
            warmup_time_ns: 0,
            measurement_time_ns: 0,
            min_iterations: Some(200),
            max_iterations: Some(50),
        };
        let bencher = Bencher::with_config(false, 10).with_policy(policy);
        let result = run_benchmark_loop(bencher, |b| {
            b.iter(|| 7_u64);
            Ok::<(), ()>(())
        })
        .unwrap();

        assert_eq!(result.iterations, 200);
    }

    #[test]
    fn test_run_loop_propagates_runner_error() {
        let bencher = Bencher::new(false).with_policy(LoopPolicy::fixed(10));
        let result = run_benchmark_loop(bencher, |_| Err("spawn failed"));
        assert_eq!(result.unwrap_err(), "spawn failed");
    }

    #[test]
    fn test_warmup_then_timed_measurement() {
        let policy = LoopPolicy {
            warmup_time_ns: 5_000_000,
            measurement_time_ns: 10_000_000,
            min_iterations: None,
            max_iterations: None,
        };
        let mut bencher = Bencher::new(false).with_policy(policy);
        bencher.iter(|| {
            let mut sum = 0u64;
            for i in 0..100 {
                sum += black_box(i);
            }
            sum
        });

        assert!(bencher.estimated_iter_time_ns().is_some());
        let result = bencher.finish();
        assert!(result.warmup_iterations > 0);
        assert!(result.iterations > 0);
        assert!(!result.samples.is_empty());
        assert!(result.nanos_per_iter() > 0.0);
    }

    #[test]
    fn test_untracked_allocations_report_zero() {
        let mut bencher = Bencher::new(false).with_policy(LoopPolicy::fixed(100));
        bencher.iter(|| vec![0u8; 64]);

        let result = bencher.finish();
        assert_eq!(result.alloc_count, 0);
        assert_eq!(result.allocs_per_iter(), 0.0);
    }

    #[test]
    fn test_affinity_is_carried() {
        let bencher = Bencher::new(false).with_cpu_affinity(Some(0));
        assert_eq!(bencher.cpu_affinity(), Some(0));
    }
}
