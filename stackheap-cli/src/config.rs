//! Configuration loading from stackheap.toml
//!
//! The configuration is discovered by walking up from the current directory.
//! Command-line flags override anything set here.

use serde::{Deserialize, Serialize};
use stackheap_stats::OutlierMethod;
use std::path::{Path, PathBuf};

/// File name looked up by [`StackheapConfig::discover`]
pub const CONFIG_FILE_NAME: &str = "stackheap.toml";

/// stackheap configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StackheapConfig {
    /// Runner configuration
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Allocator tracking configuration
    #[serde(default)]
    pub allocator: AllocatorConfig,
    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
    /// Expectation checks run over the finished report
    #[serde(default)]
    pub expectations: ExpectationsConfig,
}

/// Runner configuration for benchmark execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Warmup duration before measurement (e.g., "1s")
    #[serde(default = "default_warmup")]
    pub warmup_time: String,
    /// Measurement duration (e.g., "3s")
    #[serde(default = "default_measurement")]
    pub measurement_time: String,
    /// Fixed iteration count: skip warmup, run exactly N iterations
    #[serde(default)]
    pub samples: Option<u64>,
    /// Minimum number of iterations
    #[serde(default)]
    pub min_iterations: Option<u64>,
    /// Maximum number of iterations
    #[serde(default)]
    pub max_iterations: Option<u64>,
    /// Number of timed batches to aim for
    #[serde(default = "default_target_samples")]
    pub target_samples: usize,
    /// Pin every execution unit to this CPU
    #[serde(default)]
    pub pin_cpu: Option<usize>,
    /// Outlier detection used for mean/median/stddev
    #[serde(default)]
    pub outliers: OutlierMethod,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            warmup_time: default_warmup(),
            measurement_time: default_measurement(),
            samples: None,
            min_iterations: None,
            max_iterations: None,
            target_samples: default_target_samples(),
            pin_cpu: None,
            outliers: OutlierMethod::default(),
        }
    }
}

fn default_warmup() -> String {
    "1s".to_string()
}
fn default_measurement() -> String {
    "3s".to_string()
}
fn default_target_samples() -> usize {
    stackheap_core::DEFAULT_SAMPLE_COUNT
}

/// Allocator tracking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocatorConfig {
    /// Count allocations made inside the measured loop
    #[serde(default = "default_track")]
    pub track: bool,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            track: default_track(),
        }
    }
}

fn default_track() -> bool {
    true
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Default output format: "human" or "json"
    #[serde(default = "default_format")]
    pub format: String,
    /// Directory the JSON report of every run is archived to
    #[serde(default = "default_output_dir")]
    pub directory: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            directory: default_output_dir(),
        }
    }
}

impl OutputConfig {
    /// Path of the archived JSON report
    pub fn report_path(&self) -> PathBuf {
        Path::new(&self.directory).join("report.json")
    }
}

fn default_format() -> String {
    "human".to_string()
}
fn default_output_dir() -> String {
    "target/stackheap".to_string()
}

/// Expectation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpectationsConfig {
    /// Evaluate expectations at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Relative difference under which huge stack and heap count as converged
    #[serde(default = "default_convergence_tolerance")]
    pub convergence_tolerance: f64,
    /// Relative drop allowed between consecutive heap means
    #[serde(default = "default_monotonic_slack")]
    pub monotonic_slack: f64,
}

impl Default for ExpectationsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            convergence_tolerance: default_convergence_tolerance(),
            monotonic_slack: default_monotonic_slack(),
        }
    }
}

fn default_enabled() -> bool {
    true
}
fn default_convergence_tolerance() -> f64 {
    0.5
}
fn default_monotonic_slack() -> f64 {
    0.1
}

impl StackheapConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Walk up from the current directory looking for `stackheap.toml`.
    ///
    /// A file that exists but fails to parse is reported and ignored.
    pub fn discover() -> Option<Self> {
        let mut dir = std::env::current_dir().ok()?;
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return match Self::load(&config_path) {
                    Ok(config) => {
                        tracing::debug!(path = %config_path.display(), "loaded configuration");
                        Some(config)
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %config_path.display(),
                            error = %e,
                            "invalid configuration, using defaults"
                        );
                        None
                    }
                };
            }
            if !dir.pop() {
                break;
            }
        }
        None
    }

    /// Generate a default configuration as TOML string
    pub fn default_toml() -> String {
        r#"# stackheap configuration

[runner]
# Warmup duration before measurement
warmup_time = "1s"
# Measurement duration
measurement_time = "3s"
# Fixed iteration count: skip warmup, run exactly N iterations (uncomment to enable)
# samples = 1000000
# Minimum iterations (uncomment to enable)
# min_iterations = 100
# Maximum iterations (uncomment to enable)
# max_iterations = 1000000
# Number of timed batches per sub-benchmark
target_samples = 100
# Pin execution units to one CPU (uncomment to enable)
# pin_cpu = 0

[runner.outliers]
method = "iqr"
k = 1.5

[allocator]
# Count allocations inside the measured loop
track = true

[output]
# Default output format: human, json
format = "human"
# Directory the JSON report is archived to
directory = "target/stackheap"

[expectations]
enabled = true
# huge/stack and huge/heap converge when |stack - heap| / max <= tolerance
convergence_tolerance = 0.5
# heap means may drop by this fraction between consecutive widths
monotonic_slack = 0.1
"#
        .to_string()
    }

    /// Parse duration string (e.g., "3s", "500ms", "2m") to nanoseconds
    pub fn parse_duration(s: &str) -> anyhow::Result<u64> {
        let s = s.trim();
        if s.is_empty() {
            return Err(anyhow::anyhow!("Empty duration string"));
        }

        let (num_part, unit_part) = s
            .char_indices()
            .find(|(_, c)| c.is_alphabetic() || *c == 'µ')
            .map(|(i, _)| s.split_at(i))
            .unwrap_or((s, "s"));

        let value: f64 = num_part
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid duration number: {}", num_part))?;
        if value < 0.0 || !value.is_finite() {
            return Err(anyhow::anyhow!("Invalid duration: {}", s));
        }

        let multiplier: u64 = match unit_part.to_lowercase().as_str() {
            "ns" => 1,
            "us" | "µs" => 1_000,
            "ms" => 1_000_000,
            "s" | "" => 1_000_000_000,
            "m" | "min" => 60_000_000_000,
            _ => return Err(anyhow::anyhow!("Unknown duration unit: {}", unit_part)),
        };

        Ok((value * multiplier as f64) as u64)
    }
}
