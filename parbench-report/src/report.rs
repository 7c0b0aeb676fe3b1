//! Report data model.

use chrono::{DateTime, Utc};
use parbench_core::Backend;
use serde::{Deserialize, Serialize};

/// Schema version stamped into every report.
pub const REPORT_SCHEMA_VERSION: u32 = 1;

/// Complete result of one harness run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Run-level metadata.
    pub meta: ReportMeta,
    /// One row per executed benchmark, in execution order.
    pub results: Vec<BenchResult>,
    /// Aggregate counts.
    pub summary: Summary,
}

impl Report {
    /// Assemble a report, computing the summary from the rows.
    pub fn build(meta: ReportMeta, results: Vec<BenchResult>) -> Self {
        let mut summary = Summary {
            total: results.len(),
            ..Summary::default()
        };
        for row in &results {
            match row.status {
                BenchStatus::Passed => summary.passed += 1,
                BenchStatus::Failed => summary.failed += 1,
                BenchStatus::TimedOut => summary.timed_out += 1,
            }
        }
        Self {
            meta,
            results,
            summary,
        }
    }
}

/// Run-level metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMeta {
    /// Report schema version.
    pub schema_version: u32,
    /// When the run started.
    pub timestamp: DateTime<Utc>,
    /// Number of workers in the group.
    pub world_size: u32,
    /// Thread-pool cap, when one was configured.
    pub num_threads: Option<usize>,
    /// Per-iteration time ceiling, in seconds.
    pub max_time_sec: f64,
    /// Timed repetitions per benchmark.
    pub iterations: u32,
    /// Wall-clock duration of the whole run, in milliseconds.
    pub duration_ms: f64,
}

/// Outcome of one benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BenchStatus {
    /// Ran within budget and the output check passed.
    Passed,
    /// Validation rejected the input, a phase failed, or the output check
    /// did not pass.
    Failed,
    /// A timed iteration exceeded the per-iteration ceiling.
    TimedOut,
}

/// One benchmark's row in the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchResult {
    /// Composed benchmark name, `<tasks_type>:<task_id>:<backend>`.
    pub name: String,
    /// Backend of the measured implementation.
    pub backend: Backend,
    /// Outcome.
    pub status: BenchStatus,
    /// Measurement mode name, e.g. `task_run`.
    pub kind: String,
    /// Total measured time across completed iterations, in seconds.
    pub time_sec: f64,
    /// Iterations that completed within budget.
    pub iterations: u32,
    /// Failure diagnostic, when the status is not `Passed`.
    pub error: Option<String>,
}

/// Aggregate outcome counts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Summary {
    /// Rows in the report.
    pub total: usize,
    /// Benchmarks that passed.
    pub passed: usize,
    /// Benchmarks that failed.
    pub failed: usize,
    /// Benchmarks that blew their time budget.
    pub timed_out: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, status: BenchStatus) -> BenchResult {
        BenchResult {
            name: name.into(),
            backend: Backend::Seq,
            status,
            kind: "task_run".into(),
            time_sec: 0.25,
            iterations: 1,
            error: None,
        }
    }

    fn meta() -> ReportMeta {
        ReportMeta {
            schema_version: REPORT_SCHEMA_VERSION,
            timestamp: Utc::now(),
            world_size: 1,
            num_threads: None,
            max_time_sec: 10.0,
            iterations: 1,
            duration_ms: 12.5,
        }
    }

    #[test]
    fn summary_counts_each_status() {
        let report = Report::build(
            meta(),
            vec![
                row("threads:a:seq", BenchStatus::Passed),
                row("threads:a:rayon", BenchStatus::Passed),
                row("threads:b:seq", BenchStatus::Failed),
                row("threads:c:seq", BenchStatus::TimedOut),
            ],
        );
        assert_eq!(report.summary.total, 4);
        assert_eq!(report.summary.passed, 2);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.summary.timed_out, 1);
    }

    #[test]
    fn report_serializes_with_kebab_case_statuses() {
        let report = Report::build(meta(), vec![row("threads:a:seq", BenchStatus::TimedOut)]);
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"timed-out\""));
        assert!(json.contains("\"seq\""));
    }
}
