//! Timing engine: pipeline and core-run measurement over fresh tasks.

use crate::clock::Timer;
use parbench_comm::{CommError, Communicator};
use parbench_core::{Task, TaskImpl};
use thiserror::Error;

/// Measurement attributes for one benchmark invocation.
#[derive(Debug, Clone)]
pub struct PerfAttr {
    /// Number of timed repetitions.
    pub num_runs: u32,
    /// Wall-clock ceiling per timed iteration, in seconds.
    pub max_time_sec: Option<f64>,
}

impl Default for PerfAttr {
    fn default() -> Self {
        Self {
            num_runs: 10,
            max_time_sec: None,
        }
    }
}

/// Which measurement mode produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunKind {
    /// No measurement has happened.
    #[default]
    None,
    /// Core-run mode: only the run phase was timed.
    TaskRun,
    /// Pipeline mode: full lifecycle cycles were timed.
    Pipeline,
}

impl RunKind {
    /// Stable name used in report rows.
    pub fn name(self) -> &'static str {
        match self {
            RunKind::None => "none",
            RunKind::TaskRun => "task_run",
            RunKind::Pipeline => "pipeline",
        }
    }
}

/// Elapsed-time result of one measurement.
#[derive(Debug, Clone, Default)]
pub struct PerfResults {
    /// Measurement mode.
    pub kind: RunKind,
    /// Total measured time across completed iterations, in seconds.
    pub time_sec: f64,
    /// Iterations that completed within the budget.
    pub iterations: u32,
}

/// Why a measurement did not complete.
#[derive(Debug, Error)]
pub enum PerfError {
    /// The task rejected its declared input/output shapes.
    #[error("task validation rejected the input")]
    ValidationFailed,

    /// A lifecycle phase reported failure.
    #[error("task phase `{0}` reported failure")]
    PhaseFailed(&'static str),

    /// A timed iteration blew the per-iteration ceiling; the remaining
    /// iterations were abandoned.
    #[error("iteration {iteration} took {elapsed_sec:.6}s, over the {limit_sec}s budget")]
    TimeBudgetExceeded {
        /// Zero-based index of the offending iteration.
        iteration: u32,
        /// Its measured time.
        elapsed_sec: f64,
        /// The configured ceiling.
        limit_sec: f64,
    },

    /// A worker-group barrier failed.
    #[error("worker synchronization failed: {0}")]
    Sync(#[from] CommError),
}

/// Drives freshly constructed tasks through timed measurements.
///
/// The factory yields a new guarded task per lifecycle cycle, so the
/// strict phase ordering holds for every measured cycle. With a
/// multi-worker communicator attached, every timed region is bracketed by
/// barriers: all workers enter together, and the clock on each worker
/// stops only after the slowest one has finished.
pub struct Perf<'c, T, F>
where
    T: TaskImpl,
    F: FnMut() -> Task<T>,
{
    factory: F,
    sync: Option<&'c dyn Communicator>,
}

impl<'c, T, F> Perf<'c, T, F>
where
    T: TaskImpl,
    F: FnMut() -> Task<T>,
{
    /// Engine over a task factory, without worker synchronization.
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            sync: None,
        }
    }

    /// Attach a communicator. Single-worker groups need no bracketing, so
    /// they stay barrier-free.
    pub fn with_sync(mut self, comm: &'c dyn Communicator) -> Self {
        if comm.size() > 1 {
            self.sync = Some(comm);
        }
        self
    }

    /// Pipeline mode: time `num_runs` full lifecycle cycles, each over a
    /// fresh task. Returns the accumulated results and the final cycle's
    /// task for output inspection.
    pub fn pipeline_run(&mut self, attr: &PerfAttr) -> Result<(Task<T>, PerfResults), PerfError> {
        let mut results = PerfResults {
            kind: RunKind::Pipeline,
            ..PerfResults::default()
        };
        let mut last = None;
        for iteration in 0..attr.num_runs.max(1) {
            let task = (self.factory)();
            self.barrier()?;
            let timer = Timer::start();
            let task = full_cycle(task)?;
            self.barrier()?;
            // Read the clock after the closing barrier: every worker then
            // sees the slowest worker's time and makes the same budget
            // decision.
            let elapsed = timer.elapsed_sec();

            results.time_sec += elapsed;
            results.iterations += 1;
            last = Some(task);
            check_budget(attr, iteration, elapsed)?;
        }
        match last {
            Some(task) => Ok((task, results)),
            None => unreachable!("at least one iteration always runs"),
        }
    }

    /// Core-run mode: validate and pre-process once, time `num_runs`
    /// repetitions of the run phase, post-process once. The timed task is
    /// then discarded and a fresh task replays the full cycle untimed, so
    /// output inspection sees a single-run result even if repeated runs
    /// corrupted the timed task's state.
    pub fn task_run(&mut self, attr: &PerfAttr) -> Result<(Task<T>, PerfResults), PerfError> {
        let mut results = PerfResults {
            kind: RunKind::TaskRun,
            ..PerfResults::default()
        };

        let mut task = (self.factory)();
        if !task.validate() {
            task.abandon();
            return Err(PerfError::ValidationFailed);
        }
        if !task.pre_process() {
            task.abandon();
            return Err(PerfError::PhaseFailed("pre_process"));
        }
        if let Err(e) = self.timed_runs(&mut task, attr, &mut results) {
            task.abandon();
            return Err(e);
        }
        if !task.post_process() {
            task.abandon();
            return Err(PerfError::PhaseFailed("post_process"));
        }
        drop(task);

        let replay = full_cycle((self.factory)())?;
        Ok((replay, results))
    }

    fn timed_runs(
        &self,
        task: &mut Task<T>,
        attr: &PerfAttr,
        results: &mut PerfResults,
    ) -> Result<(), PerfError> {
        for iteration in 0..attr.num_runs.max(1) {
            self.barrier()?;
            let timer = Timer::start();
            if !task.run() {
                return Err(PerfError::PhaseFailed("run"));
            }
            self.barrier()?;
            let elapsed = timer.elapsed_sec();

            results.time_sec += elapsed;
            results.iterations += 1;
            check_budget(attr, iteration, elapsed)?;
        }
        Ok(())
    }

    fn barrier(&self) -> Result<(), PerfError> {
        if let Some(comm) = self.sync {
            comm.barrier()?;
        }
        Ok(())
    }
}

/// Run one complete lifecycle over `task`, abandoning it on any rejected
/// or failed phase.
fn full_cycle<T: TaskImpl>(mut task: Task<T>) -> Result<Task<T>, PerfError> {
    if !task.validate() {
        task.abandon();
        return Err(PerfError::ValidationFailed);
    }
    if !task.pre_process() {
        task.abandon();
        return Err(PerfError::PhaseFailed("pre_process"));
    }
    if !task.run() {
        task.abandon();
        return Err(PerfError::PhaseFailed("run"));
    }
    if !task.post_process() {
        task.abandon();
        return Err(PerfError::PhaseFailed("post_process"));
    }
    Ok(task)
}

fn check_budget(attr: &PerfAttr, iteration: u32, elapsed_sec: f64) -> Result<(), PerfError> {
    if let Some(limit_sec) = attr.max_time_sec {
        if elapsed_sec > limit_sec {
            tracing::warn!(iteration, elapsed_sec, limit_sec, "iteration over budget");
            return Err(PerfError::TimeBudgetExceeded {
                iteration,
                elapsed_sec,
                limit_sec,
            });
        }
    }
    Ok(())
}
