#![warn(missing_docs)]
//! stackheap Report - Report Model and Output
//!
//! Output formats:
//! - JSON (machine-readable, also used for archived runs)
//! - Human (terminal, rendered by the CLI)

mod json;
mod report;

pub use json::{SCHEMA_VERSION, generate_json_report};
pub use report::{
    BenchmarkMetrics, BenchmarkReportResult, BenchmarkStatus, ExpectationResult,
    ExpectationStatus, FailureInfo, PairComparison, Report, ReportConfig, ReportMeta,
    ReportSummary, SystemInfo,
};

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON with full schema
    Json,
    /// Human-readable terminal output
    Human,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" | "text" => Ok(OutputFormat::Human),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}

/// Format nanoseconds with an adaptive unit
pub fn format_duration(nanos: f64) -> String {
    if nanos < 1_000.0 {
        format!("{:.2} ns", nanos)
    } else if nanos < 1_000_000.0 {
        format!("{:.2} µs", nanos / 1_000.0)
    } else if nanos < 1_000_000_000.0 {
        format!("{:.2} ms", nanos / 1_000_000.0)
    } else {
        format!("{:.2} s", nanos / 1_000_000_000.0)
    }
}

/// Format a byte width with a binary unit (8 B, 4 KiB, 1 MiB)
pub fn format_bytes(bytes: usize) -> String {
    const KIB: usize = 1024;
    const MIB: usize = 1024 * 1024;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{} MiB", bytes / MIB)
    } else if bytes >= KIB && bytes % KIB == 0 {
        format!("{} KiB", bytes / KIB)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parse() {
        assert_eq!("json".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("Text".parse::<OutputFormat>(), Ok(OutputFormat::Human));
        assert!("html".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_format_duration_units() {
        assert_eq!(format_duration(0.3), "0.30 ns");
        assert_eq!(format_duration(1_500.0), "1.50 µs");
        assert_eq!(format_duration(2_500_000.0), "2.50 ms");
        assert_eq!(format_duration(3_000_000_000.0), "3.00 s");
    }

    #[test]
    fn test_format_bytes_units() {
        assert_eq!(format_bytes(8), "8 B");
        assert_eq!(format_bytes(1024), "1 KiB");
        assert_eq!(format_bytes(4096), "4 KiB");
        assert_eq!(format_bytes(1_048_576), "1 MiB");
        assert_eq!(format_bytes(1500), "1500 B");
    }
}
