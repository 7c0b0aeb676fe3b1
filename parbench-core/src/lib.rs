//! Core task contract for the parbench harness.
//!
//! A benchmarkable computation is written once per backend as a
//! [`TaskImpl`]: four phases over a shared [`TaskData`] description of its
//! input and output memory. The [`Task`] guard enforces the phase order at
//! runtime and makes violations fatal.

#![warn(missing_docs)]

mod backend;
mod data;
mod task;

pub use backend::Backend;
pub use data::TaskData;
pub use task::{LifecycleState, Task, TaskImpl, TestingMode, ORDER_VIOLATION};
