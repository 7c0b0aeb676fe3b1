//! Timing engine for parbench task benchmarks.
//!
//! Two measurement modes over the task lifecycle: pipeline mode times the
//! whole Validate/PreProcess/Run/PostProcess cycle per iteration, core-run
//! mode times only repeated run phases. Multi-worker runs bracket every
//! timed region with group barriers so the recorded time covers the
//! slowest worker.

#![warn(missing_docs)]

mod clock;
mod perf;

pub use clock::{pin_to_cpu, Timer};
pub use perf::{Perf, PerfAttr, PerfError, PerfResults, RunKind};
