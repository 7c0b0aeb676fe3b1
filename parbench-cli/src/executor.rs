//! Runs registered benchmarks and assembles the report.

use crate::config::GlobalConfig;
use crate::suite::{BenchOutcome, BenchmarkParams, Suite};
use anyhow::{bail, Result};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use parbench_comm::Communicator;
use parbench_perf::{RunKind, Timer};
use parbench_report::{BenchResult, BenchStatus, Report, ReportMeta, REPORT_SCHEMA_VERSION};

/// Executes a suite over one communicator.
pub struct Executor<'c> {
    comm: &'c dyn Communicator,
    show_progress: bool,
}

impl<'c> Executor<'c> {
    /// Executor over `comm`, with progress display enabled.
    pub fn new(comm: &'c dyn Communicator) -> Self {
        Self {
            comm,
            show_progress: true,
        }
    }

    /// Disable the progress bar, for quiet or scripted runs.
    pub fn quiet(mut self) -> Self {
        self.show_progress = false;
        self
    }

    /// Run every registered benchmark in order and build the report.
    ///
    /// Per-benchmark failures become report rows; a failed worker barrier
    /// aborts the whole run, because the group can no longer agree on
    /// which timed region comes next.
    pub fn execute(
        &self,
        suite: &mut Suite,
        config: &GlobalConfig,
        params: &BenchmarkParams,
    ) -> Result<Report> {
        let timestamp = Utc::now();
        let timer = Timer::start();

        // Only the coordinator draws; other ranks would interleave.
        let bar = if self.show_progress && self.comm.is_coordinator() {
            let bar = ProgressBar::new(suite.len() as u64);
            if let Ok(style) =
                ProgressStyle::with_template("{bar:30} {pos}/{len} {msg}")
            {
                bar.set_style(style);
            }
            bar
        } else {
            ProgressBar::hidden()
        };

        let mut results = Vec::with_capacity(suite.len());
        for bench in suite.benches_mut() {
            bar.set_message(bench.name.clone());
            tracing::info!(name = %bench.name, "running benchmark");
            let outcome = bench.run(self.comm);
            results.push(into_result(bench.name.clone(), bench.backend, outcome)?);
            bar.inc(1);
        }
        bar.finish_and_clear();

        let meta = ReportMeta {
            schema_version: REPORT_SCHEMA_VERSION,
            timestamp,
            world_size: self.comm.size(),
            num_threads: config.num_threads,
            max_time_sec: params.max_time_sec,
            iterations: params.iterations,
            duration_ms: timer.elapsed_sec() * 1000.0,
        };
        Ok(Report::build(meta, results))
    }
}

fn into_result(
    name: String,
    backend: parbench_core::Backend,
    outcome: BenchOutcome,
) -> Result<BenchResult> {
    let kind = RunKind::TaskRun.name().to_string();
    let row = match outcome {
        BenchOutcome::Passed {
            time_sec,
            iterations,
        } => BenchResult {
            name,
            backend,
            status: BenchStatus::Passed,
            kind,
            time_sec,
            iterations,
            error: None,
        },
        BenchOutcome::CheckFailed {
            time_sec,
            iterations,
        } => BenchResult {
            name,
            backend,
            status: BenchStatus::Failed,
            kind,
            time_sec,
            iterations,
            error: Some("output check rejected the result".to_string()),
        },
        BenchOutcome::ValidationRejected => BenchResult {
            name,
            backend,
            status: BenchStatus::Failed,
            kind,
            time_sec: 0.0,
            iterations: 0,
            error: Some("validation rejected the input; task not run".to_string()),
        },
        BenchOutcome::PhaseFailed { phase } => BenchResult {
            name,
            backend,
            status: BenchStatus::Failed,
            kind,
            time_sec: 0.0,
            iterations: 0,
            error: Some(format!("task phase `{phase}` reported failure")),
        },
        BenchOutcome::TimedOut {
            iteration,
            elapsed_sec,
            limit_sec,
        } => BenchResult {
            name,
            backend,
            status: BenchStatus::TimedOut,
            kind,
            time_sec: elapsed_sec,
            iterations: iteration,
            error: Some(format!(
                "iteration {iteration} took {elapsed_sec:.6}s, over the {limit_sec}s budget"
            )),
        },
        BenchOutcome::SyncFailed { message } => {
            bail!("worker synchronization failed during {name}: {message}")
        }
    };
    Ok(row)
}
