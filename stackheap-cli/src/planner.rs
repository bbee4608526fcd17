//! Benchmark Planner
//!
//! Builds the execution plan by filtering and ordering sub-benchmarks.
//!
//! Filtering options:
//! - Regex pattern matching on sub-benchmark ID
//! - Size class (group) filtering
//! - Strategy filtering (stack / heap)
//!
//! Ordering: by width, stack arm before heap arm, so pairs run back to back.

use stackheap_core::{BenchmarkDef, Strategy};

/// Execution plan for sub-benchmarks
pub struct ExecutionPlan<'a> {
    /// Ordered list of sub-benchmarks to run
    pub benchmarks: Vec<&'a BenchmarkDef>,
}

/// Build execution plan from discovered sub-benchmarks
pub fn build_plan<'a>(
    benchmarks: impl IntoIterator<Item = &'a BenchmarkDef>,
    filter: Option<&regex::Regex>,
    group: Option<&str>,
    strategy: Option<Strategy>,
) -> ExecutionPlan<'a> {
    let mut selected: Vec<_> = benchmarks
        .into_iter()
        .filter(|b| {
            if let Some(re) = filter {
                if !re.is_match(b.id) {
                    return false;
                }
            }

            if let Some(g) = group {
                if !b.group.eq_ignore_ascii_case(g) {
                    return false;
                }
            }

            if let Some(s) = strategy {
                if b.strategy != s {
                    return false;
                }
            }

            true
        })
        .collect();

    selected.sort_by_key(|b| (b.width_bytes, b.strategy == Strategy::ByReference, b.id));

    ExecutionPlan {
        benchmarks: selected,
    }
}
