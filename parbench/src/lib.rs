//! Parallel task benchmarking harness.
//!
//! A benchmarkable computation is written once per backend as a
//! [`TaskImpl`] with four lifecycle phases over shared [`TaskData`]. A
//! benchmark binary registers its task families and hands control to
//! [`run`]:
//!
//! ```no_run
//! use parbench::prelude::*;
//! # struct SumSeq;
//! # impl TaskImpl for SumSeq {
//! #     type Input = i32;
//! #     type Output = i64;
//! #     const BACKEND: Backend = Backend::Seq;
//! #     fn from_data(_: TaskData<i32, i64>) -> Self { SumSeq }
//! #     fn validate(&mut self) -> bool { true }
//! #     fn pre_process(&mut self) -> bool { true }
//! #     fn run(&mut self) -> bool { true }
//! #     fn post_process(&mut self) -> bool { true }
//! #     fn data(&self) -> &TaskData<i32, i64> { unimplemented!() }
//! # }
//!
//! fn main() -> anyhow::Result<()> {
//!     parbench::run(|suite| {
//!         suite
//!             .family(
//!                 "demos/sum_threads/settings.toml",
//!                 || {
//!                     let mut data = TaskData::new();
//!                     data.push_input(vec![1; 1 << 20]).add_output(1);
//!                     data
//!                 },
//!                 None,
//!             )
//!             .add::<SumSeq>();
//!     })
//! }
//! ```
//!
//! The same binary runs single-process, as a launcher (`--procs N`), or
//! as a launcher-spawned worker; the harness sorts out which applies.

#![warn(missing_docs)]

pub use parbench_cli::{
    run, should_register, skip_by_name, BenchOutcome, BenchmarkParams, Cli, DispatchContext,
    Executor, FamilyBuilder, GlobalConfig, OutputChecker, RegisteredBench, Suite, TasksType,
};
pub use parbench_comm::{
    under_launcher, CommError, Communicator, GroupComm, Launcher, LocalComm,
};
pub use parbench_core::{
    Backend, LifecycleState, Task, TaskData, TaskImpl, TestingMode, ORDER_VIOLATION,
};
pub use parbench_perf::{Perf, PerfAttr, PerfError, PerfResults, RunKind, Timer};
pub use parbench_report::{
    format_human, generate_json, BenchResult, BenchStatus, OutputFormat, Report, ReportMeta,
    Reporter, Summary,
};

/// The names a benchmark binary typically needs.
pub mod prelude {
    pub use crate::{
        Backend, BenchmarkParams, Suite, Task, TaskData, TaskImpl, TestingMode,
    };
}
