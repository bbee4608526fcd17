#![warn(missing_docs)]
//! stackheap CLI Library
//!
//! The benchmark runner behind `cargo bench`: discovers registered
//! sub-benchmarks, runs them with a configurable loop policy, computes
//! statistics, compares each stack arm with its heap arm and checks the
//! expectations the comparison is supposed to meet.
//!
//! # Example
//!
//! ```ignore
//! use stackheap_core::TrackingAllocator;
//!
//! #[global_allocator]
//! static GLOBAL: TrackingAllocator = TrackingAllocator;
//!
//! fn main() -> anyhow::Result<()> {
//!     stackheap_cli::run()
//! }
//! ```

mod config;
mod executor;
mod planner;

pub use config::*;
pub use executor::{
    BenchExecutionResult, CONVERGENT_GROUP, ExecutionConfig, ExpectationSettings,
    ExpectationSummary, Executor, STACK_CHEAPER_GROUPS, build_report, compare_pairs,
    compute_statistics, evaluate_expectations, format_human_output, summarize_expectations,
};
pub use planner::{ExecutionPlan, build_plan};

use clap::{Parser, Subcommand};
use rayon::ThreadPoolBuilder;
use regex::Regex;
use stackheap_core::{BenchmarkDef, Strategy, registered_benchmarks};
use stackheap_report::{OutputFormat, Report, format_bytes, generate_json_report};
use stackheap_stats::OutlierMethod;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// stackheap CLI arguments
#[derive(Parser, Debug)]
#[command(name = "stackheap")]
#[command(author, version, about = "stackheap - stack vs heap allocation cost by value width")]
pub struct Cli {
    /// Optional subcommand (List, Run, Init); defaults to Run
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Filter sub-benchmarks by regex pattern on their id
    #[arg(default_value = ".*")]
    pub filter: String,

    /// Output format: human, json
    #[arg(long)]
    pub format: Option<String>,

    /// Output file (stdout if not specified)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Run only this size class (small, medium, large, huge)
    #[arg(long)]
    pub size: Option<String>,

    /// Run only this strategy (stack, heap)
    #[arg(long)]
    pub strategy: Option<Strategy>,

    /// Warmup time in seconds
    #[arg(long)]
    pub warmup: Option<f64>,

    /// Measurement time in seconds
    #[arg(long)]
    pub measurement: Option<f64>,

    /// Fixed iteration count: skip warmup, run exactly N iterations.
    /// Overrides warmup/measurement/min/max.
    #[arg(long, short = 'n')]
    pub samples: Option<u64>,

    /// Minimum number of iterations
    #[arg(long)]
    pub min_iterations: Option<u64>,

    /// Maximum number of iterations
    #[arg(long)]
    pub max_iterations: Option<u64>,

    /// Pin every execution unit to this CPU
    #[arg(long)]
    pub pin_cpu: Option<usize>,

    /// Don't count allocations inside the measured loop
    #[arg(long)]
    pub no_track_allocations: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Number of threads for parallel statistics computation
    /// 0 = use all available cores (default), 1 = single-threaded
    #[arg(long, short = 'j', default_value = "0")]
    pub threads: usize,

    /// Internal: Absorb cargo bench's --bench flag
    #[arg(long, hide = true)]
    pub bench: bool,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List all registered sub-benchmarks
    List,
    /// Run sub-benchmarks (default)
    Run,
    /// Write a default stackheap.toml to the current directory
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run the stackheap CLI with the process arguments.
/// This is the main entry point for benchmark binaries.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli)
}

/// Run the stackheap CLI with pre-parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("stackheap=debug")
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("stackheap=info")
            .init();
    }

    // Discover stackheap.toml configuration (CLI flags override)
    let config = StackheapConfig::discover().unwrap_or_default();

    match cli.command {
        Some(Commands::List) => list_benchmarks(&cli),
        Some(Commands::Run) | None => run_benchmarks(&cli, &config),
        Some(Commands::Init { force }) => init_config(Path::new(CONFIG_FILE_NAME), force),
    }
}

fn init_config(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    std::fs::write(path, StackheapConfig::default_toml())?;
    println!("Wrote {}", path.display());
    Ok(())
}

/// Filter sub-benchmarks based on CLI options using the planner module.
fn filter_benchmarks<'a>(
    cli: &Cli,
    benchmarks: &[&'a BenchmarkDef],
) -> anyhow::Result<Vec<&'a BenchmarkDef>> {
    let filter_re = Regex::new(&cli.filter)
        .map_err(|e| anyhow::anyhow!("Invalid filter pattern '{}': {}", cli.filter, e))?;

    let plan = build_plan(
        benchmarks.iter().copied(),
        Some(&filter_re),
        cli.size.as_deref(),
        cli.strategy,
    );

    Ok(plan.benchmarks)
}

fn list_benchmarks(cli: &Cli) -> anyhow::Result<()> {
    let all_benchmarks = registered_benchmarks();
    let benchmarks = filter_benchmarks(cli, &all_benchmarks)?;
    print!("{}", render_plan(&benchmarks));
    Ok(())
}

/// Tree view of the planned sub-benchmarks, one branch per size class
fn render_plan(benchmarks: &[&BenchmarkDef]) -> String {
    let mut groups: BTreeMap<(usize, &str), Vec<&BenchmarkDef>> = BTreeMap::new();
    for bench in benchmarks {
        groups
            .entry((bench.width_bytes, bench.group))
            .or_default()
            .push(bench);
    }

    let mut output = String::from("stackheap plan:\n");
    for ((width, group), benches) in &groups {
        let _ = writeln!(output, "├── group: {} ({})", group, format_bytes(*width));
        if let Some(regime) = benches.iter().map(|b| b.regime).find(|r| !r.is_empty()) {
            let _ = writeln!(output, "│   │   {}", regime);
        }
        for bench in benches {
            let tags = if bench.tags.is_empty() {
                String::new()
            } else {
                format!(" [{}]", bench.tags.join(", "))
            };
            let _ = writeln!(
                output,
                "│   ├── {}{} ({}:{})",
                bench.id, tags, bench.file, bench.line
            );
        }
    }

    let _ = writeln!(output, "{} sub-benchmarks found.", benchmarks.len());
    output
}

/// Build an ExecutionConfig by layering: stackheap.toml → CLI overrides.
fn build_execution_config(cli: &Cli, config: &StackheapConfig) -> anyhow::Result<ExecutionConfig> {
    let defaults = ExecutionConfig::default();
    let track_allocations = config.allocator.track && !cli.no_track_allocations;
    let pin_cpu = cli.pin_cpu.or(config.runner.pin_cpu);
    let target_samples = config.runner.target_samples;
    let outlier_method = if config.runner.outliers.is_valid() {
        config.runner.outliers
    } else {
        tracing::warn!(method = ?config.runner.outliers, "invalid outlier method, using default");
        OutlierMethod::default()
    };

    // --samples N: fixed-count mode, CLI wins, then stackheap.toml
    if let Some(n) = cli.samples.or(config.runner.samples) {
        if n == 0 {
            anyhow::bail!("Invalid sample count: 0 (at least one iteration is required)");
        }
        return Ok(ExecutionConfig {
            target_samples,
            track_allocations,
            pin_cpu,
            outlier_method,
            ..ExecutionConfig::fixed(n)
        });
    }

    let warmup_time_ns = match cli.warmup {
        Some(secs) => seconds_to_ns(secs)?,
        None => StackheapConfig::parse_duration(&config.runner.warmup_time).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "invalid warmup_time, using default");
            defaults.warmup_time_ns
        }),
    };
    let measurement_time_ns = match cli.measurement {
        Some(secs) => seconds_to_ns(secs)?,
        None => StackheapConfig::parse_duration(&config.runner.measurement_time).unwrap_or_else(
            |e| {
                tracing::warn!(error = %e, "invalid measurement_time, using default");
                defaults.measurement_time_ns
            },
        ),
    };

    Ok(ExecutionConfig {
        warmup_time_ns,
        measurement_time_ns,
        min_iterations: cli.min_iterations.or(config.runner.min_iterations),
        max_iterations: cli.max_iterations.or(config.runner.max_iterations),
        target_samples,
        track_allocations,
        pin_cpu,
        outlier_method,
    })
}

fn seconds_to_ns(secs: f64) -> anyhow::Result<u64> {
    if secs < 0.0 || !secs.is_finite() {
        return Err(anyhow::anyhow!("Invalid duration: {} seconds", secs));
    }
    Ok((secs * 1_000_000_000.0) as u64)
}

fn resolve_format(cli: &Cli, config: &StackheapConfig) -> anyhow::Result<OutputFormat> {
    cli.format
        .as_deref()
        .unwrap_or(&config.output.format)
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))
}

/// Run the selected sub-benchmarks and produce the full report.
///
/// Kept separate from output and exit handling so it can be driven directly.
pub fn execute_run(
    benchmarks: &[&BenchmarkDef],
    exec_config: &ExecutionConfig,
    expectations: Option<&ExpectationsConfig>,
    show_progress: bool,
) -> Report {
    let start_time = Instant::now();

    let mut executor = Executor::new(exec_config.clone());
    if !show_progress {
        executor = executor.without_progress();
    }
    let results = executor.execute(benchmarks);

    let stats = compute_statistics(&results, exec_config);

    let total_duration_ms = start_time.elapsed().as_secs_f64() * 1000.0;
    let mut report = build_report(&results, &stats, exec_config, total_duration_ms);

    report.pairs = compare_pairs(&report.results);
    if let Some(expectations) = expectations.filter(|e| e.enabled) {
        let settings = ExpectationSettings {
            convergence_tolerance: expectations.convergence_tolerance,
            monotonic_slack: expectations.monotonic_slack,
            track_allocations: exec_config.track_allocations,
        };
        report.expectations = evaluate_expectations(&report.results, &settings);
    }

    let expectation_summary = summarize_expectations(&report.expectations);
    report.summary.expectations_failed = expectation_summary.failed;
    report.summary.critical_failures = expectation_summary.critical_failures;

    report
}

fn run_benchmarks(cli: &Cli, config: &StackheapConfig) -> anyhow::Result<()> {
    let format = resolve_format(cli, config)?;

    // Configure Rayon thread pool for statistics computation
    if cli.threads > 0 {
        ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .ok();
    }

    let all_benchmarks = registered_benchmarks();
    let benchmarks = filter_benchmarks(cli, &all_benchmarks)?;

    if benchmarks.is_empty() {
        if all_benchmarks.is_empty() {
            eprintln!(
                "Warning: no sub-benchmarks registered. Ensure the benchmark binary links the stackheap crate."
            );
        }
        println!("No benchmarks found.");
        return Ok(());
    }

    let exec_config = build_execution_config(cli, config)?;
    tracing::info!(
        count = benchmarks.len(),
        warmup_ns = exec_config.warmup_time_ns,
        measurement_ns = exec_config.measurement_time_ns,
        "running sub-benchmarks"
    );
    if format == OutputFormat::Human {
        println!("Running {} sub-benchmarks...\n", benchmarks.len());
    }

    let report = execute_run(
        &benchmarks,
        &exec_config,
        Some(&config.expectations),
        format == OutputFormat::Human,
    );

    // Warn if allocation tracking is enabled but nothing was recorded
    if exec_config.track_allocations
        && report
            .results
            .iter()
            .filter_map(|r| r.metrics.as_ref())
            .all(|m| m.allocs_per_iter == 0.0)
        && report.results.iter().any(|r| r.metrics.is_some())
    {
        eprintln!(
            "Warning: allocation tracking enabled but no sub-benchmark recorded an allocation.\n\
             Ensure TrackingAllocator is set as #[global_allocator] in your benchmark binary."
        );
    }

    let json = generate_json_report(&report)?;
    archive_report(config, &json);

    let output = match format {
        OutputFormat::Json => json,
        OutputFormat::Human => format_human_output(&report),
    };

    if let Some(ref path) = cli.output {
        std::fs::write(path, output.as_bytes())?;
        println!("Report written to: {}", path.display());
    } else {
        print!("{}", output);
    }

    tracing::info!(
        passed = report.summary.passed,
        failed = report.summary.failed,
        crashed = report.summary.crashed,
        critical = report.summary.critical_failures,
        "run complete"
    );

    if report.summary.should_fail() {
        if report.summary.crashed > 0 || report.summary.failed > 0 {
            eprintln!(
                "\n{} sub-benchmark(s) crashed or failed during execution",
                report.summary.crashed + report.summary.failed
            );
        }
        if report.summary.critical_failures > 0 {
            eprintln!(
                "\n{} critical expectation failure(s)",
                report.summary.critical_failures
            );
        }
        std::process::exit(1);
    }

    Ok(())
}

/// Keep a JSON copy of every run under the configured output directory.
fn archive_report(config: &StackheapConfig, json: &str) {
    let path = config.output.report_path();
    let written = path
        .parent()
        .map_or(Ok(()), std::fs::create_dir_all)
        .and_then(|_| std::fs::write(&path, json));
    match written {
        Ok(()) => tracing::debug!(path = %path.display(), "report archived"),
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to archive report"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("stackheap").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults_come_from_config() {
        let cli = parse(&[]);
        let config = StackheapConfig::default();
        let exec = build_execution_config(&cli, &config).unwrap();

        assert_eq!(exec.warmup_time_ns, 1_000_000_000);
        assert_eq!(exec.measurement_time_ns, 3_000_000_000);
        assert_eq!(exec.target_samples, 100);
        assert!(exec.track_allocations);
        assert_eq!(exec.pin_cpu, None);
    }

    #[test]
    fn test_cli_flags_override_config() {
        let cli = parse(&[
            "--warmup",
            "0.5",
            "--measurement",
            "2",
            "--min-iterations",
            "10",
            "--pin-cpu",
            "3",
            "--no-track-allocations",
        ]);
        let mut config = StackheapConfig::default();
        config.runner.min_iterations = Some(1);
        config.runner.max_iterations = Some(99);
        config.runner.pin_cpu = Some(0);

        let exec = build_execution_config(&cli, &config).unwrap();
        assert_eq!(exec.warmup_time_ns, 500_000_000);
        assert_eq!(exec.measurement_time_ns, 2_000_000_000);
        assert_eq!(exec.min_iterations, Some(10));
        assert_eq!(exec.max_iterations, Some(99));
        assert_eq!(exec.pin_cpu, Some(3));
        assert!(!exec.track_allocations);
    }

    #[test]
    fn test_samples_flag_selects_fixed_mode() {
        let cli = parse(&["-n", "1000000", "--warmup", "5"]);
        let exec = build_execution_config(&cli, &StackheapConfig::default()).unwrap();
        assert_eq!(exec.warmup_time_ns, 0);
        assert_eq!(exec.min_iterations, Some(1_000_000));
        assert_eq!(exec.max_iterations, Some(1_000_000));
    }

    #[test]
    fn test_config_outlier_method_carried() {
        let mut config = StackheapConfig::default();
        config.runner.outliers = OutlierMethod::None;
        let exec = build_execution_config(&parse(&[]), &config).unwrap();
        assert_eq!(exec.outlier_method, OutlierMethod::None);
    }

    #[test]
    fn test_negative_outlier_multiplier_falls_back() {
        let config: StackheapConfig = toml::from_str(
            r#"
            [runner.outliers]
            method = "iqr"
            k = -1.0
        "#,
        )
        .unwrap();
        assert_eq!(config.runner.outliers, OutlierMethod::Iqr { k: -1.0 });

        let exec = build_execution_config(&parse(&[]), &config).unwrap();
        assert_eq!(exec.outlier_method, OutlierMethod::default());
    }

    #[test]
    fn test_zero_samples_rejected() {
        let err = build_execution_config(&parse(&["-n", "0"]), &StackheapConfig::default());
        assert!(err.is_err());

        let mut config = StackheapConfig::default();
        config.runner.samples = Some(0);
        assert!(build_execution_config(&parse(&[]), &config).is_err());
    }

    #[test]
    fn test_invalid_config_duration_falls_back() {
        let mut config = StackheapConfig::default();
        config.runner.warmup_time = "soon".to_string();
        let exec = build_execution_config(&parse(&[]), &config).unwrap();
        assert_eq!(exec.warmup_time_ns, ExecutionConfig::default().warmup_time_ns);
    }

    #[test]
    fn test_negative_cli_duration_rejected() {
        let cli = parse(&["--warmup=-1"]);
        assert!(build_execution_config(&cli, &StackheapConfig::default()).is_err());
    }

    #[test]
    fn test_strategy_and_size_flags_parse() {
        let cli = parse(&["--size", "huge", "--strategy", "heap", "list"]);
        assert_eq!(cli.size.as_deref(), Some("huge"));
        assert_eq!(cli.strategy, Some(Strategy::ByReference));
        assert!(matches!(cli.command, Some(Commands::List)));
    }

    #[test]
    fn test_cargo_bench_flag_absorbed() {
        let cli = parse(&["--bench", "small"]);
        assert!(cli.bench);
        assert_eq!(cli.filter, "small");
    }

    #[test]
    fn test_format_resolution() {
        let config = StackheapConfig::default();
        assert_eq!(resolve_format(&parse(&[]), &config).unwrap(), OutputFormat::Human);
        assert_eq!(
            resolve_format(&parse(&["--format", "json"]), &config).unwrap(),
            OutputFormat::Json
        );
        assert!(resolve_format(&parse(&["--format", "xml"]), &config).is_err());
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let path = std::env::temp_dir().join(format!("stackheap-init-{}.toml", std::process::id()));
        init_config(&path, false).unwrap();
        assert!(StackheapConfig::load(&path).is_ok());
        assert!(init_config(&path, false).is_err());
        init_config(&path, true).unwrap();
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_plan_shows_regime_per_group() {
        fn noop(_: &mut stackheap_core::Bencher) -> Result<(), stackheap_core::RunError> {
            Ok(())
        }
        let def = |id, strategy| BenchmarkDef {
            id,
            group: "large",
            strategy,
            width_bytes: 4096,
            regime: "spans a full page",
            tags: &[],
            runner_fn: noop,
            file: "pairs.rs",
            line: 1,
        };
        let stack = def("large/stack", Strategy::ByValue);
        let heap = def("large/heap", Strategy::ByReference);

        let plan = render_plan(&[&stack, &heap]);
        assert!(plan.contains("group: large (4 KiB)"));
        assert_eq!(plan.matches("spans a full page").count(), 1);
        assert!(plan.contains("large/heap (pairs.rs:1)"));
        assert!(plan.ends_with("2 sub-benchmarks found.\n"));
    }

    #[test]
    fn test_invalid_filter_is_an_error() {
        let cli = parse(&["("]);
        assert!(filter_benchmarks(&cli, &[]).is_err());
    }
}
