#![warn(missing_docs)]
//! # stackheap
//!
//! Measures what it costs to construct a value by value (in the caller's
//! stack frame) versus behind an owning heap handle, across four widths:
//! 8 B, 1 KiB, 4 KiB and 1 MiB.
//!
//! - **Measurement pairs**: every size class registers a `stack` and a `heap`
//!   sub-benchmark; each iteration constructs a zeroed value, increments its
//!   counter byte and drops it
//! - **Execution units**: every invocation runs on a freshly spawned thread
//!   whose stack is sized for the class, so no measurement inherits a warm stack
//! - **Allocation tracking**: `TrackingAllocator` counts heap allocations per
//!   iteration, which is how the by-value arm is shown to be allocation free
//! - **Expectations**: stack cheaper than heap for small widths, convergence
//!   at 1 MiB, heap cost monotonic in width
//!
//! ## Running
//!
//! ```text
//! cargo bench -p stackheap
//! cargo bench -p stackheap -- --size huge --format json
//! cargo bench -p stackheap -- list
//! ```
//!
//! ## Driving a pair directly
//!
//! ```ignore
//! use stackheap::prelude::*;
//!
//! let mut pair = MeasurementPair::new(SizeClass::Large);
//! let (stack, heap) = pair.run(|| Bencher::new(true).with_policy(LoopPolicy::fixed(10_000)))?;
//! println!("{:.1} ns vs {:.1} ns", stack.nanos_per_iter(), heap.nanos_per_iter());
//! ```

mod pairs;
mod size_class;
mod values;

#[doc(hidden)]
pub use pairs::link_registry;
pub use pairs::{
    MeasurementPair, RunState, RunnerFn, SubBenchmark, cycle, heap_cycle, measure, runner_for,
    stack_cycle,
};
pub use size_class::SizeClass;
pub use values::{
    COUNTER_MODULUS, Huge, Large, Medium, Small, Value, create_huge, create_large, create_medium,
    create_small, new_huge, new_large, new_medium, new_small,
};

// Re-export core types
pub use stackheap_core::{
    Bencher, BenchmarkDef, BenchmarkResult, DEFAULT_UNIT_STACK_SIZE, ExecutionUnit, LoopPolicy,
    RunError, Severity, Strategy, TrackingAllocator, current_allocation, registered_benchmarks,
    reset_allocation_counter, run_benchmark_loop,
};

// Re-export stats
pub use stackheap_stats::{OutlierMethod, SummaryStatistics, compute_summary};

// Re-export the runner pieces needed to drive a run without the CLI
pub use stackheap_cli::{ExecutionConfig, ExpectationsConfig, execute_run};
pub use stackheap_report::{BenchmarkStatus, ExpectationStatus, Report};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        Bencher, LoopPolicy, MeasurementPair, RunState, SizeClass, Strategy, SubBenchmark,
        TrackingAllocator, Value,
    };
}

/// Run the stackheap CLI harness over the registered pairs.
///
/// Call this from the benchmark binary's `main()`:
/// ```ignore
/// #[global_allocator]
/// static GLOBAL: stackheap::TrackingAllocator = stackheap::TrackingAllocator;
///
/// fn main() -> anyhow::Result<()> {
///     stackheap::run()
/// }
/// ```
pub fn run() -> anyhow::Result<()> {
    pairs::link_registry();
    stackheap_cli::run()
}
