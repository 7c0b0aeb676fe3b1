//! Report model and output sinks for the parbench harness.

#![warn(missing_docs)]

mod format;
mod report;
mod reporter;

pub use format::{format_human, generate_json, OutputFormat, UnknownFormat};
pub use report::{
    BenchResult, BenchStatus, Report, ReportMeta, Summary, REPORT_SCHEMA_VERSION,
};
pub use reporter::{reporter_for_rank, NullReporter, Reporter, StreamReporter};
