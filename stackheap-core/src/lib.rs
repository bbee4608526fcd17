#![warn(missing_docs)]
//! stackheap Core - Measurement Runtime
//!
//! This crate provides the execution environment for the stack vs heap benchmarks:
//! - `Bencher` with a self-driven, batched measurement loop
//! - Batch timing with wall-clock nanoseconds and RDTSCP/CNTVCT ticks
//! - Global allocator interceptor for allocation counting
//! - Execution-unit isolation: every measurement runs on its own thread and stack

mod allocator;
mod bencher;
mod isolation;
mod measure;
mod sample;

pub use allocator::{TrackingAllocator, current_allocation, reset_allocation_counter};
pub use bencher::{
    Bencher, BenchmarkResult, DEFAULT_SAMPLE_COUNT, LoopPolicy, MIN_SAMPLE_COUNT,
    run_benchmark_loop,
};
pub use isolation::{DEFAULT_UNIT_STACK_SIZE, ExecutionUnit, RunError, run_isolated};
pub use measure::{BatchTimer, BatchTiming, HAS_CYCLE_COUNTER, pin_to_cpu};
pub use sample::Sample;

/// Construction strategy under measurement.
///
/// The two arms of every measurement pair: a value built in the caller's
/// frame, or a value behind an owning heap handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Value returned by value; storage lives in the loop's stack frame
    ByValue,
    /// Value returned as `Box<T>`; storage is always heap allocated
    ByReference,
}

impl Strategy {
    /// Both strategies, stack arm first
    pub const ALL: [Strategy; 2] = [Strategy::ByValue, Strategy::ByReference];

    /// Sub-benchmark label (`stack` / `heap`)
    pub fn label(self) -> &'static str {
        match self {
            Strategy::ByValue => "stack",
            Strategy::ByReference => "heap",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stack" | "by-value" | "by_value" => Ok(Strategy::ByValue),
            "heap" | "by-reference" | "by_reference" => Ok(Strategy::ByReference),
            other => Err(format!("Unknown strategy: {}", other)),
        }
    }
}

/// Severity levels for expectation reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Severity {
    /// Failure makes the run exit non-zero
    Critical,
    /// Reported but doesn't fail
    Warning,
    /// Informational only
    Info,
}

/// Sub-benchmark registered in the process-wide registry.
///
/// Two definitions sharing a `group` form one measurement pair.
#[derive(Debug, Clone)]
pub struct BenchmarkDef {
    /// Unique identifier, `<group>/<strategy>`
    pub id: &'static str,
    /// Measurement pair this sub-benchmark belongs to
    pub group: &'static str,
    /// Which arm of the pair this is
    pub strategy: Strategy,
    /// Byte width of the measured value (orders groups)
    pub width_bytes: usize,
    /// What the width exercises, shown by `list`
    pub regime: &'static str,
    /// Tags for filtering
    pub tags: &'static [&'static str],
    /// Entry point; receives a fresh `Bencher` per invocation
    pub runner_fn: fn(&mut Bencher) -> Result<(), RunError>,
    /// Source file path
    pub file: &'static str,
    /// Source line number
    pub line: u32,
}

inventory::collect!(BenchmarkDef);

/// All registered sub-benchmarks, ordered by width then strategy (stack first).
pub fn registered_benchmarks() -> Vec<&'static BenchmarkDef> {
    let mut all: Vec<_> = inventory::iter::<BenchmarkDef>.into_iter().collect();
    all.sort_by_key(|b| (b.width_bytes, b.strategy == Strategy::ByReference, b.id));
    all
}

/// Anchor to prevent LTO from stripping inventory entries
#[used]
#[doc(hidden)]
pub static REGISTRY_ANCHOR: fn() = || for _ in inventory::iter::<BenchmarkDef> {};
