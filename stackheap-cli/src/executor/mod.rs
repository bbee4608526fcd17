//! Benchmark Executor
//!
//! Runs sub-benchmarks and turns their samples into a report.
//!
//! ## Pipeline Overview
//!
//! ```text
//! BenchmarkDef (registered via inventory)
//!       │
//!       ▼
//! ┌─────────────┐
//! │  execution  │  Run sub-benchmarks, collect samples
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │ statistics  │  Compute summary stats (parallel)
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │   report    │  Build Report with metrics and metadata
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │ comparison  │  Stack vs heap rows per size class
//! │ expectations│  Pass/fail checks with severities
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │ formatting  │  Human-readable output
//! └─────────────┘
//! ```

mod comparison;
mod execution;
mod expectations;
mod formatting;
mod metadata;
mod report;
mod statistics;

pub use comparison::compare_pairs;
pub use execution::{BenchExecutionResult, ExecutionConfig, Executor};
pub use expectations::{
    CONVERGENT_GROUP, ExpectationSettings, ExpectationSummary, STACK_CHEAPER_GROUPS,
    evaluate_expectations, summarize_expectations,
};
pub use formatting::format_human_output;
pub use report::build_report;
pub use statistics::compute_statistics;
