//! Benchmark registration and backend dispatch.
//!
//! A task family is the set of per-backend implementations of one
//! algorithm, sharing a settings file, an input provider, and an output
//! checker. Registering a family applies the dispatch policy to each
//! backend, composes the benchmark name, and captures a runner closure
//! that performs the core-run measurement when executed.

use crate::config::GlobalConfig;
use crate::settings::{read_tasks_type, task_id, TasksType};
use parbench_comm::Communicator;
use parbench_core::{Backend, Task, TaskData, TaskImpl, TestingMode};
use parbench_perf::{Perf, PerfAttr, PerfError};
use std::path::Path;
use std::sync::Arc;

/// Repeat count and time budget for one registered benchmark.
#[derive(Debug, Clone)]
pub struct BenchmarkParams {
    /// Timed repetitions.
    pub iterations: u32,
    /// Per-iteration ceiling in seconds.
    pub max_time_sec: f64,
}

impl BenchmarkParams {
    /// Defaults for registration: a single timed repetition under the
    /// configured ceiling.
    pub fn from_config(config: &GlobalConfig) -> Self {
        Self {
            iterations: 1,
            max_time_sec: config.max_time_sec,
        }
    }
}

/// Predicate over the finished task's data; `true` means the output is
/// correct.
pub type OutputChecker<In, Out> = Arc<dyn Fn(&TaskData<In, Out>) -> bool + Send + Sync>;

/// Outcome of executing one registered benchmark.
#[derive(Debug, Clone)]
pub enum BenchOutcome {
    /// Measurement completed and the output check passed.
    Passed {
        /// Total measured seconds.
        time_sec: f64,
        /// Completed iterations.
        iterations: u32,
    },
    /// Measurement completed but the output check rejected the result.
    CheckFailed {
        /// Total measured seconds.
        time_sec: f64,
        /// Completed iterations.
        iterations: u32,
    },
    /// The task rejected its input shapes; nothing ran.
    ValidationRejected,
    /// A lifecycle phase reported failure.
    PhaseFailed {
        /// The failing phase.
        phase: &'static str,
    },
    /// A timed iteration blew the ceiling; the rest were abandoned.
    TimedOut {
        /// Offending iteration index.
        iteration: u32,
        /// Its measured seconds.
        elapsed_sec: f64,
        /// The ceiling.
        limit_sec: f64,
    },
    /// A worker barrier failed; the whole run is compromised.
    SyncFailed {
        /// Rendered communicator error.
        message: String,
    },
}

type BenchRunner = Box<dyn FnMut(&dyn Communicator) -> BenchOutcome>;

/// One registered, runnable benchmark.
pub struct RegisteredBench {
    /// Composed name, `<tasks_type>:<task_id>:<backend>`.
    pub name: String,
    /// Backend of the registered implementation.
    pub backend: Backend,
    runner: BenchRunner,
}

impl RegisteredBench {
    pub(crate) fn run(&mut self, comm: &dyn Communicator) -> BenchOutcome {
        (self.runner)(comm)
    }
}

/// Everything the dispatch policy inspects besides the backend itself.
#[derive(Debug, Clone, Copy)]
pub struct DispatchContext {
    /// Whether this process runs inside a launcher-spawned group.
    pub under_launcher: bool,
}

/// Decide whether a backend variant is applicable for a family.
///
/// Process backends need the distributed runtime and a family that is not
/// declared threads-only. The sequential baseline always applies. Thread
/// and vectorized variants are skipped for process-declared families,
/// whose timings are only meaningful across workers.
pub fn should_register(backend: Backend, tasks_type: TasksType, ctx: DispatchContext) -> bool {
    match backend {
        Backend::Proc => ctx.under_launcher && tasks_type != TasksType::Threads,
        Backend::Seq => true,
        Backend::Rayon | Backend::Threads | Backend::Simd | Backend::All => {
            tasks_type != TasksType::Processes
        }
    }
}

/// Name-based retirement sentinel: a composed name carrying one of these
/// substrings never registers.
pub fn skip_by_name(name: &str) -> bool {
    name.contains("unknown") || name.contains("disabled")
}

/// Collects registered benchmarks for one run.
pub struct Suite {
    ctx: DispatchContext,
    default_params: BenchmarkParams,
    benches: Vec<RegisteredBench>,
}

impl Suite {
    /// Empty suite with the given dispatch context and default params.
    pub fn new(ctx: DispatchContext, default_params: BenchmarkParams) -> Self {
        Self {
            ctx,
            default_params,
            benches: Vec::new(),
        }
    }

    /// Begin registering one task family.
    ///
    /// `provider` builds the fresh [`TaskData`] each measured lifecycle
    /// starts from; `checker`, when given, judges the final output.
    pub fn family<In, Out>(
        &mut self,
        settings_path: impl AsRef<Path>,
        provider: impl Fn() -> TaskData<In, Out> + Send + Sync + 'static,
        checker: Option<OutputChecker<In, Out>>,
    ) -> FamilyBuilder<'_, In, Out>
    where
        In: 'static,
        Out: 'static,
    {
        let settings_path = settings_path.as_ref();
        FamilyBuilder {
            tasks_type: read_tasks_type(settings_path),
            task_id: task_id(settings_path),
            suite: self,
            provider: Arc::new(provider),
            checker,
            params: None,
        }
    }

    /// Registered benchmarks, in registration order.
    pub fn benches(&self) -> &[RegisteredBench] {
        &self.benches
    }

    pub(crate) fn benches_mut(&mut self) -> &mut [RegisteredBench] {
        &mut self.benches
    }

    /// Drop benchmarks whose name fails the predicate.
    pub fn retain(&mut self, keep: impl Fn(&str) -> bool) {
        self.benches.retain(|bench| keep(&bench.name));
    }

    /// Number of registered benchmarks.
    pub fn len(&self) -> usize {
        self.benches.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.benches.is_empty()
    }
}

/// Registers the per-backend implementations of one task family.
pub struct FamilyBuilder<'s, In, Out> {
    suite: &'s mut Suite,
    tasks_type: TasksType,
    task_id: String,
    provider: Arc<dyn Fn() -> TaskData<In, Out> + Send + Sync>,
    checker: Option<OutputChecker<In, Out>>,
    params: Option<BenchmarkParams>,
}

impl<In: 'static, Out: 'static> FamilyBuilder<'_, In, Out> {
    /// Override the suite's default params for this family.
    pub fn params(mut self, params: BenchmarkParams) -> Self {
        self.params = Some(params);
        self
    }

    /// Offer one backend implementation for registration. The dispatch
    /// policy and the name sentinel decide whether it actually registers.
    pub fn add<T>(self) -> Self
    where
        T: TaskImpl<Input = In, Output = Out> + 'static,
    {
        let backend = T::BACKEND;
        if !should_register(backend, self.tasks_type, self.suite.ctx) {
            tracing::debug!(
                backend = backend.name(),
                task = %self.task_id,
                "skipped by dispatch policy"
            );
            return self;
        }
        let name = format!("{}:{}:{}", self.tasks_type.prefix(), self.task_id, backend);
        if skip_by_name(&name) {
            tracing::debug!(%name, "skipped by name sentinel");
            return self;
        }

        let params = self
            .params
            .clone()
            .unwrap_or_else(|| self.suite.default_params.clone());
        let provider = Arc::clone(&self.provider);
        let checker = self.checker.clone();
        let runner: BenchRunner = Box::new(move |comm| {
            run_bench::<T, In, Out>(&provider, checker.as_deref(), &params, comm)
        });
        self.suite.benches.push(RegisteredBench {
            name,
            backend,
            runner,
        });
        self
    }
}

/// Core-run measurement of one implementation, then the output check on
/// the replay task's data.
fn run_bench<T, In, Out>(
    provider: &Arc<dyn Fn() -> TaskData<In, Out> + Send + Sync>,
    checker: Option<&(dyn Fn(&TaskData<In, Out>) -> bool + Send + Sync)>,
    params: &BenchmarkParams,
    comm: &dyn Communicator,
) -> BenchOutcome
where
    T: TaskImpl<Input = In, Output = Out>,
{
    let attr = PerfAttr {
        num_runs: params.iterations.max(1),
        max_time_sec: Some(params.max_time_sec),
    };
    let mut perf = Perf::new(|| Task::<T>::with_mode(provider(), TestingMode::Perf))
        .with_sync(comm);
    match perf.task_run(&attr) {
        Ok((task, results)) => {
            let output_ok = checker.map_or(true, |check| check(task.data()));
            if output_ok {
                BenchOutcome::Passed {
                    time_sec: results.time_sec,
                    iterations: results.iterations,
                }
            } else {
                BenchOutcome::CheckFailed {
                    time_sec: results.time_sec,
                    iterations: results.iterations,
                }
            }
        }
        Err(PerfError::ValidationFailed) => BenchOutcome::ValidationRejected,
        Err(PerfError::PhaseFailed(phase)) => BenchOutcome::PhaseFailed { phase },
        Err(PerfError::TimeBudgetExceeded {
            iteration,
            elapsed_sec,
            limit_sec,
        }) => BenchOutcome::TimedOut {
            iteration,
            elapsed_sec,
            limit_sec,
        },
        Err(PerfError::Sync(e)) => BenchOutcome::SyncFailed {
            message: e.to_string(),
        },
    }
}
