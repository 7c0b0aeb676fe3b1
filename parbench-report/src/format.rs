//! Report rendering.

use crate::report::{BenchStatus, Report};
use std::fmt::Write;
use std::str::FromStr;
use thiserror::Error;

/// Selected output rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Plain-text listing.
    #[default]
    Human,
    /// Pretty-printed JSON.
    Json,
}

/// Error for unrecognized format names.
#[derive(Debug, Error)]
#[error("unknown output format `{0}`, expected `human` or `json`")]
pub struct UnknownFormat(String);

impl FromStr for OutputFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "human" | "text" => Ok(OutputFormat::Human),
            "json" => Ok(OutputFormat::Json),
            other => Err(UnknownFormat(other.to_string())),
        }
    }
}

/// Render a report as plain text, one timing line per benchmark followed
/// by a summary block.
pub fn format_human(report: &Report) -> String {
    let mut out = String::new();
    for row in &report.results {
        match row.status {
            BenchStatus::Passed => {
                let _ = writeln!(out, "{}:{}:{:.10}", row.name, row.kind, row.time_sec);
            }
            BenchStatus::Failed => {
                let _ = writeln!(
                    out,
                    "{}:{}:FAILED ({})",
                    row.name,
                    row.kind,
                    row.error.as_deref().unwrap_or("unknown failure"),
                );
            }
            BenchStatus::TimedOut => {
                let _ = writeln!(
                    out,
                    "{}:{}:TIMEOUT ({})",
                    row.name,
                    row.kind,
                    row.error.as_deref().unwrap_or("over time budget"),
                );
            }
        }
    }
    let s = &report.summary;
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{} benchmarks: {} passed, {} failed, {} timed out ({:.1} ms, {} worker{})",
        s.total,
        s.passed,
        s.failed,
        s.timed_out,
        report.meta.duration_ms,
        report.meta.world_size,
        if report.meta.world_size == 1 { "" } else { "s" },
    );
    out
}

/// Render a report as pretty-printed JSON.
pub fn generate_json(report: &Report) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{BenchResult, ReportMeta, REPORT_SCHEMA_VERSION};
    use chrono::Utc;
    use parbench_core::Backend;

    fn sample_report() -> Report {
        Report::build(
            ReportMeta {
                schema_version: REPORT_SCHEMA_VERSION,
                timestamp: Utc::now(),
                world_size: 2,
                num_threads: Some(8),
                max_time_sec: 10.0,
                iterations: 3,
                duration_ms: 42.0,
            },
            vec![
                BenchResult {
                    name: "threads:vec_sum:seq".into(),
                    backend: Backend::Seq,
                    status: BenchStatus::Passed,
                    kind: "task_run".into(),
                    time_sec: 1.25,
                    iterations: 3,
                    error: None,
                },
                BenchResult {
                    name: "threads:vec_sum:rayon".into(),
                    backend: Backend::Rayon,
                    status: BenchStatus::TimedOut,
                    kind: "task_run".into(),
                    time_sec: 11.0,
                    iterations: 1,
                    error: Some("iteration 0 took 11.0s, over the 10s budget".into()),
                },
            ],
        )
    }

    #[test]
    fn format_parses_known_names() {
        assert_eq!("human".parse::<OutputFormat>().unwrap(), OutputFormat::Human);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn human_output_has_one_timing_line_per_pass() {
        let text = format_human(&sample_report());
        assert!(text.contains("threads:vec_sum:seq:task_run:1.2500000000"));
        assert!(text.contains("threads:vec_sum:rayon:task_run:TIMEOUT"));
        assert!(text.contains("2 benchmarks: 1 passed, 0 failed, 1 timed out"));
    }

    #[test]
    fn json_output_round_trips() {
        let json = generate_json(&sample_report()).unwrap();
        let parsed: Report = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.summary.total, 2);
        assert_eq!(parsed.results[0].name, "threads:vec_sum:seq");
    }
}
