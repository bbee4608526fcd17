//! Expectations
//!
//! Statistical checks over a finished run. Each one reads the per-benchmark
//! metrics of the report and yields Passed, Failed, or Skipped when an arm it
//! needs was filtered out, failed or crashed. Only the allocation checks are
//! critical: a heap arm that doesn't allocate, or a stack arm that does,
//! means the measurement itself is wrong. Timing checks are advisory.
//!
//! | id | severity | passes when |
//! |----|----------|-------------|
//! | `stack_cheaper_{small,medium}` | Warning | stack mean < heap mean |
//! | `huge_converges` | Info | stack <= heap, or relative gap <= tolerance |
//! | `heap_monotonic` | Info | heap means non-decreasing by width, within slack |
//! | `heap_allocates_<group>` | Critical | heap arm >= 0.9 allocations/iteration |
//! | `stack_allocation_free_<group>` | Critical | stack arm < 0.1 allocations/iteration |

use super::comparison::{arm_metrics, groups_by_width};
use stackheap_core::{Severity, Strategy};
use stackheap_report::{
    BenchmarkMetrics, BenchmarkReportResult, ExpectationResult, ExpectationStatus,
};

/// Groups where the stack arm should win outright
pub const STACK_CHEAPER_GROUPS: [&str; 2] = ["small", "medium"];
/// Group where stack and heap costs should converge
pub const CONVERGENT_GROUP: &str = "huge";

const HEAP_MIN_ALLOCS_PER_ITER: f64 = 0.9;
const STACK_MAX_ALLOCS_PER_ITER: f64 = 0.1;

/// Tunables for expectation evaluation
#[derive(Debug, Clone, Copy)]
pub struct ExpectationSettings {
    /// Relative gap under which huge stack and heap count as converged
    pub convergence_tolerance: f64,
    /// Relative drop allowed between consecutive heap means
    pub monotonic_slack: f64,
    /// Allocation tracking was requested for this run
    pub track_allocations: bool,
}

impl Default for ExpectationSettings {
    fn default() -> Self {
        Self {
            convergence_tolerance: 0.5,
            monotonic_slack: 0.1,
            track_allocations: true,
        }
    }
}

/// Outcome tally over a list of expectation results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpectationSummary {
    /// Expectations that held
    pub passed: usize,
    /// Expectations that did not hold
    pub failed: usize,
    /// Expectations missing an arm or allocation data
    pub skipped: usize,
    /// Failures with `Severity::Critical`
    pub critical_failures: usize,
}

/// Evaluate every expectation that applies to the groups present in `results`
pub fn evaluate_expectations(
    results: &[BenchmarkReportResult],
    settings: &ExpectationSettings,
) -> Vec<ExpectationResult> {
    let groups = groups_by_width(results);
    let mut out = Vec::new();

    for (group, _) in &groups {
        if STACK_CHEAPER_GROUPS.contains(group) {
            out.push(stack_cheaper(results, group));
        }
        if *group == CONVERGENT_GROUP {
            out.push(converges(results, group, settings.convergence_tolerance));
        }
    }

    if groups.len() >= 2 {
        out.push(heap_monotonic(results, &groups, settings.monotonic_slack));
    }

    // Tracking "recorded anything" tells an installed TrackingAllocator apart
    // from a binary that never registered it.
    let tracking_active = settings.track_allocations
        && results
            .iter()
            .filter_map(|r| r.metrics.as_ref())
            .any(|m| m.allocs_per_iter > 0.0);

    for (group, _) in &groups {
        out.push(allocation_check(
            results,
            group,
            Strategy::ByReference,
            settings.track_allocations,
            tracking_active,
        ));
        out.push(allocation_check(
            results,
            group,
            Strategy::ByValue,
            settings.track_allocations,
            tracking_active,
        ));
    }

    out
}

/// Count expectation outcomes
pub fn summarize_expectations(results: &[ExpectationResult]) -> ExpectationSummary {
    let mut summary = ExpectationSummary::default();
    for r in results {
        match r.status {
            ExpectationStatus::Passed => summary.passed += 1,
            ExpectationStatus::Failed => {
                summary.failed += 1;
                if r.severity == Severity::Critical {
                    summary.critical_failures += 1;
                }
            }
            ExpectationStatus::Skipped { .. } => summary.skipped += 1,
        }
    }
    summary
}

fn arm_id(group: &str, strategy: Strategy) -> String {
    format!("{}/{}", group, strategy.label())
}

/// Both arms of a pair, or the ids of the missing ones
fn both_arms<'a>(
    results: &'a [BenchmarkReportResult],
    group: &str,
) -> Result<(&'a BenchmarkMetrics, &'a BenchmarkMetrics), String> {
    let stack = arm_metrics(results, group, Strategy::ByValue);
    let heap = arm_metrics(results, group, Strategy::ByReference);
    match (stack, heap) {
        (Some(s), Some(h)) => Ok((s, h)),
        _ => {
            let mut missing = Vec::new();
            if stack.is_none() {
                missing.push(arm_id(group, Strategy::ByValue));
            }
            if heap.is_none() {
                missing.push(arm_id(group, Strategy::ByReference));
            }
            Err(missing.join(", "))
        }
    }
}

fn expectation(
    id: String,
    description: String,
    severity: Severity,
    status: ExpectationStatus,
    message: String,
) -> ExpectationResult {
    ExpectationResult {
        id,
        description,
        severity,
        status,
        message,
    }
}

fn skipped(id: String, description: String, severity: Severity, missing: String) -> ExpectationResult {
    let message = format!("Skipped: unavailable [{}]", missing);
    expectation(
        id,
        description,
        severity,
        ExpectationStatus::Skipped { missing },
        message,
    )
}

fn pass_fail(passed: bool) -> ExpectationStatus {
    if passed {
        ExpectationStatus::Passed
    } else {
        ExpectationStatus::Failed
    }
}

fn stack_cheaper(results: &[BenchmarkReportResult], group: &str) -> ExpectationResult {
    let id = format!("stack_cheaper_{}", group);
    let description = format!("{} values are cheaper on the stack than on the heap", group);

    match both_arms(results, group) {
        Err(missing) => skipped(id, description, Severity::Warning, missing),
        Ok((stack, heap)) => expectation(
            id,
            description,
            Severity::Warning,
            pass_fail(stack.mean_ns < heap.mean_ns),
            format!(
                "stack {:.2} ns vs heap {:.2} ns",
                stack.mean_ns, heap.mean_ns
            ),
        ),
    }
}

fn converges(results: &[BenchmarkReportResult], group: &str, tolerance: f64) -> ExpectationResult {
    let id = format!("{}_converges", group);
    let description = format!("{} stack and heap costs converge", group);

    match both_arms(results, group) {
        Err(missing) => skipped(id, description, Severity::Info, missing),
        Ok((stack, heap)) => {
            let larger = stack.mean_ns.max(heap.mean_ns);
            let gap = if larger > 0.0 {
                (stack.mean_ns - heap.mean_ns).abs() / larger
            } else {
                0.0
            };
            // Without escape analysis the stack arm keeps its frame and may
            // stay ahead; only a heap arm that is far cheaper is a failure.
            let passed = stack.mean_ns <= heap.mean_ns || gap <= tolerance;
            expectation(
                id,
                description,
                Severity::Info,
                pass_fail(passed),
                format!(
                    "stack {:.2} ns vs heap {:.2} ns (gap {:.1}%, tolerance {:.1}%)",
                    stack.mean_ns,
                    heap.mean_ns,
                    gap * 100.0,
                    tolerance * 100.0
                ),
            )
        }
    }
}

fn heap_monotonic(
    results: &[BenchmarkReportResult],
    groups: &[(&str, usize)],
    slack: f64,
) -> ExpectationResult {
    let id = "heap_monotonic".to_string();
    let description = "heap cost does not decrease as width grows".to_string();

    let mut means = Vec::with_capacity(groups.len());
    let mut missing = Vec::new();
    for (group, _) in groups {
        match arm_metrics(results, group, Strategy::ByReference) {
            Some(m) => means.push((*group, m.mean_ns)),
            None => missing.push(arm_id(group, Strategy::ByReference)),
        }
    }
    if !missing.is_empty() {
        return skipped(id, description, Severity::Info, missing.join(", "));
    }

    let violation = means
        .windows(2)
        .find(|w| w[1].1 < w[0].1 * (1.0 - slack));

    let message = match violation {
        Some(w) => format!(
            "{} heap {:.2} ns < {} heap {:.2} ns",
            w[1].0, w[1].1, w[0].0, w[0].1
        ),
        None => means
            .iter()
            .map(|(g, m)| format!("{} {:.2} ns", g, m))
            .collect::<Vec<_>>()
            .join(" <= "),
    };

    expectation(
        id,
        description,
        Severity::Info,
        pass_fail(violation.is_none()),
        message,
    )
}

fn allocation_check(
    results: &[BenchmarkReportResult],
    group: &str,
    strategy: Strategy,
    track_allocations: bool,
    tracking_active: bool,
) -> ExpectationResult {
    let (id, description) = match strategy {
        Strategy::ByReference => (
            format!("heap_allocates_{}", group),
            format!("{} heap arm allocates once per iteration", group),
        ),
        Strategy::ByValue => (
            format!("stack_allocation_free_{}", group),
            format!("{} stack arm never allocates", group),
        ),
    };

    if !track_allocations {
        return skipped(id, description, Severity::Critical, "allocation tracking".to_string());
    }
    if !tracking_active {
        return skipped(id, description, Severity::Critical, "TrackingAllocator".to_string());
    }

    let Some(metrics) = arm_metrics(results, group, strategy) else {
        return skipped(id, description, Severity::Critical, arm_id(group, strategy));
    };

    let per_iter = metrics.allocs_per_iter;
    let passed = match strategy {
        Strategy::ByReference => per_iter >= HEAP_MIN_ALLOCS_PER_ITER,
        Strategy::ByValue => per_iter < STACK_MAX_ALLOCS_PER_ITER,
    };

    expectation(
        id,
        description,
        Severity::Critical,
        pass_fail(passed),
        format!("{:.3} allocations per iteration", per_iter),
    )
}

#[cfg(test)]
mod tests {
    use super::super::comparison::test_support::*;
    use super::*;

    fn full_run(small: (f64, f64), medium: (f64, f64), huge: (f64, f64)) -> Vec<BenchmarkReportResult> {
        vec![
            arm("small", 8, Strategy::ByValue, small.0, 0.0),
            arm("small", 8, Strategy::ByReference, small.1, 1.0),
            arm("medium", 1024, Strategy::ByValue, medium.0, 0.0),
            arm("medium", 1024, Strategy::ByReference, medium.1, 1.0),
            arm("huge", 1 << 20, Strategy::ByValue, huge.0, 0.0),
            arm("huge", 1 << 20, Strategy::ByReference, huge.1, 1.0),
        ]
    }

    fn find<'a>(results: &'a [ExpectationResult], id: &str) -> &'a ExpectationResult {
        results
            .iter()
            .find(|r| r.id == id)
            .unwrap_or_else(|| panic!("missing expectation {id}"))
    }

    #[test]
    fn test_expected_shape_passes_everything() {
        let results = full_run((0.5, 20.0), (15.0, 60.0), (40_000.0, 45_000.0));
        let expectations = evaluate_expectations(&results, &ExpectationSettings::default());

        let summary = summarize_expectations(&expectations);
        assert_eq!(summary.failed, 0, "{expectations:#?}");
        assert_eq!(summary.skipped, 0);
        // 2 stack_cheaper + converges + monotonic + 3 groups * 2 allocation checks
        assert_eq!(expectations.len(), 10);
    }

    #[test]
    fn test_stack_slower_is_a_warning_not_critical() {
        let results = full_run((30.0, 20.0), (15.0, 60.0), (40_000.0, 45_000.0));
        let expectations = evaluate_expectations(&results, &ExpectationSettings::default());

        let small = find(&expectations, "stack_cheaper_small");
        assert_eq!(small.status, ExpectationStatus::Failed);
        assert_eq!(small.severity, Severity::Warning);
        assert_eq!(summarize_expectations(&expectations).critical_failures, 0);
    }

    #[test]
    fn test_huge_convergence_tolerance() {
        let settings = ExpectationSettings::default();

        // Heap cheaper by 10%: within tolerance
        let close = full_run((0.5, 20.0), (15.0, 60.0), (50_000.0, 45_000.0));
        let r = evaluate_expectations(&close, &settings);
        assert_eq!(find(&r, "huge_converges").status, ExpectationStatus::Passed);

        // Heap cheaper by 80%: diverged
        let far = full_run((0.5, 20.0), (15.0, 60.0), (50_000.0, 10_000.0));
        let r = evaluate_expectations(&far, &settings);
        assert_eq!(find(&r, "huge_converges").status, ExpectationStatus::Failed);

        // Stack far ahead: still passes
        let stack_wins = full_run((0.5, 20.0), (15.0, 60.0), (1_000.0, 45_000.0));
        let r = evaluate_expectations(&stack_wins, &settings);
        assert_eq!(find(&r, "huge_converges").status, ExpectationStatus::Passed);
    }

    #[test]
    fn test_heap_monotonic_respects_slack() {
        let settings = ExpectationSettings::default();

        // medium heap 5% below small heap: within 10% slack
        let slight = full_run((0.5, 20.0), (15.0, 19.0), (40_000.0, 45_000.0));
        let r = evaluate_expectations(&slight, &settings);
        assert_eq!(find(&r, "heap_monotonic").status, ExpectationStatus::Passed);

        let dropped = full_run((0.5, 20.0), (15.0, 10.0), (40_000.0, 45_000.0));
        let r = evaluate_expectations(&dropped, &settings);
        let monotonic = find(&r, "heap_monotonic");
        assert_eq!(monotonic.status, ExpectationStatus::Failed);
        assert!(monotonic.message.contains("medium"));
    }

    #[test]
    fn test_allocation_failures_are_critical() {
        let mut results = full_run((0.5, 20.0), (15.0, 60.0), (40_000.0, 45_000.0));
        // small/heap stops allocating, medium/stack starts
        results[1] = arm("small", 8, Strategy::ByReference, 20.0, 0.0);
        results[2] = arm("medium", 1024, Strategy::ByValue, 15.0, 1.0);

        let r = evaluate_expectations(&results, &ExpectationSettings::default());
        assert!(find(&r, "heap_allocates_small").is_critical_failure());
        assert!(find(&r, "stack_allocation_free_medium").is_critical_failure());
        assert_eq!(summarize_expectations(&r).critical_failures, 2);
    }

    #[test]
    fn test_allocation_checks_skip_without_tracking() {
        let results = full_run((0.5, 20.0), (15.0, 60.0), (40_000.0, 45_000.0));
        let settings = ExpectationSettings {
            track_allocations: false,
            ..Default::default()
        };
        let r = evaluate_expectations(&results, &settings);
        assert!(matches!(
            find(&r, "heap_allocates_huge").status,
            ExpectationStatus::Skipped { .. }
        ));
    }

    #[test]
    fn test_allocation_checks_skip_when_nothing_recorded() {
        let results = vec![
            arm("small", 8, Strategy::ByValue, 0.5, 0.0),
            arm("small", 8, Strategy::ByReference, 20.0, 0.0),
        ];
        let r = evaluate_expectations(&results, &ExpectationSettings::default());
        assert_eq!(
            find(&r, "heap_allocates_small").status,
            ExpectationStatus::Skipped {
                missing: "TrackingAllocator".to_string()
            }
        );
        assert_eq!(summarize_expectations(&r).critical_failures, 0);
    }

    #[test]
    fn test_crashed_arm_skips_dependent_expectations() {
        let mut results = full_run((0.5, 20.0), (15.0, 60.0), (40_000.0, 45_000.0));
        results[3] = crashed("medium", 1024, Strategy::ByReference);

        let r = evaluate_expectations(&results, &ExpectationSettings::default());
        assert_eq!(
            find(&r, "stack_cheaper_medium").status,
            ExpectationStatus::Skipped {
                missing: "medium/heap".to_string()
            }
        );
        assert!(matches!(
            find(&r, "heap_monotonic").status,
            ExpectationStatus::Skipped { .. }
        ));
        assert!(matches!(
            find(&r, "heap_allocates_medium").status,
            ExpectationStatus::Skipped { .. }
        ));
    }

    #[test]
    fn test_single_group_has_no_monotonic_check() {
        let results = vec![
            arm("large", 4096, Strategy::ByValue, 30.0, 0.0),
            arm("large", 4096, Strategy::ByReference, 80.0, 1.0),
        ];
        let r = evaluate_expectations(&results, &ExpectationSettings::default());
        assert!(r.iter().all(|e| e.id != "heap_monotonic"));
        assert_eq!(r.len(), 2);
    }
}
