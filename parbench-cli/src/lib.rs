//! Command-line front end for parbench benchmark binaries.
//!
//! A benchmark binary is `fn main() { parbench_cli::run(register) }` where
//! `register` adds task families to the [`Suite`]. The same binary serves
//! three roles: plain single-process run, launcher (with `--procs N`), and
//! launcher-spawned worker. Workers detect their role from the launcher
//! environment before arguments are interpreted.

#![warn(missing_docs)]

mod config;
mod executor;
mod settings;
mod suite;

pub use config::{GlobalConfig, CONFIG_FILE_NAME, ENV_MAX_TIME, ENV_NUM_THREADS};
pub use executor::Executor;
pub use settings::{read_tasks_type, task_id, TasksType};
pub use suite::{
    should_register, skip_by_name, BenchOutcome, BenchmarkParams, DispatchContext, FamilyBuilder,
    OutputChecker, RegisteredBench, Suite,
};

use anyhow::Result;
use clap::error::ErrorKind;
use clap::Parser;
use parbench_comm::{under_launcher, CommError, Communicator, GroupComm, Launcher, LocalComm};
use parbench_report::{format_human, generate_json, reporter_for_rank, OutputFormat, Reporter};
use regex::Regex;
use std::path::PathBuf;

/// Command-line arguments of a benchmark binary.
#[derive(Parser, Debug)]
#[command(name = "parbench", about = "Task benchmarking harness", version)]
pub struct Cli {
    /// Regex filter applied to composed benchmark names
    #[arg(default_value = ".*")]
    pub filter: String,

    /// Output format: human or json
    #[arg(long, default_value = "human")]
    pub format: String,

    /// Write the report to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Timed repetitions per benchmark
    #[arg(long)]
    pub iterations: Option<u32>,

    /// Per-iteration time ceiling in seconds
    #[arg(long)]
    pub max_time: Option<f64>,

    /// Re-launch as a group of N worker processes
    #[arg(long, value_name = "N")]
    pub procs: Option<u32>,

    /// Pin each worker to a CPU, starting at this index
    #[arg(long, value_name = "CPU")]
    pub pin_cpu: Option<usize>,

    /// List applicable benchmarks without running them
    #[arg(long)]
    pub list: bool,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

enum Comm {
    Local(LocalComm),
    Group(GroupComm),
}

impl Comm {
    fn as_dyn(&self) -> &dyn Communicator {
        match self {
            Comm::Local(comm) => comm,
            Comm::Group(comm) => comm,
        }
    }

    fn finalize(self) -> Result<(), CommError> {
        match self {
            Comm::Local(_) => Ok(()),
            Comm::Group(comm) => comm.finalize(),
        }
    }
}

/// Entry point for benchmark binaries.
///
/// Joins or launches the worker group, parses arguments, resolves the
/// configuration, runs the registration callback, executes the applicable
/// benchmarks, and publishes the report from the coordinator. Exits the
/// process directly for argument errors (code 1) and worker-group
/// failures (the error's exit code); per-benchmark failures only show up
/// in the report.
pub fn run<F>(register: F) -> Result<()>
where
    F: FnOnce(&mut Suite),
{
    // Join the group before anything interprets arguments: every rank
    // must know its role first, and non-coordinator ranks strip the
    // output flag so at most one process owns the sink.
    let comm = if under_launcher() {
        match GroupComm::init() {
            Ok(comm) => Comm::Group(comm),
            Err(e) => {
                eprintln!("parbench: joining worker group failed: {e}");
                std::process::exit(e.exit_code());
            }
        }
    } else {
        Comm::Local(LocalComm)
    };
    let rank = comm.as_dyn().rank();

    let args = strip_output_args(std::env::args().collect(), rank);
    let cli = match Cli::try_parse_from(&args) {
        Ok(cli) => cli,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                let _ = e.print();
                std::process::exit(0);
            }
            _ => {
                let _ = e.print();
                std::process::exit(1);
            }
        },
    };

    init_tracing(cli.verbose);

    // A plain invocation with --procs re-launches itself as the group;
    // workers skip this branch because the launcher environment is set.
    if let Some(procs) = cli.procs {
        if procs > 1 && !under_launcher() {
            let forwarded: Vec<String> = std::env::args().skip(1).collect();
            match Launcher::new(procs).run(&forwarded) {
                Ok(code) => std::process::exit(code),
                Err(e) => {
                    eprintln!("parbench: launching worker group failed: {e}");
                    std::process::exit(e.exit_code());
                }
            }
        }
    }

    if let Some(base) = cli.pin_cpu {
        let cpu = base + rank as usize;
        if let Err(e) = parbench_perf::pin_to_cpu(cpu) {
            tracing::warn!(cpu, error = %e, "could not pin to cpu");
        }
    }

    let config = GlobalConfig::resolve()?;
    if let Some(threads) = config.num_threads {
        // Later registrations would fail; first writer wins is fine here.
        let _ = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global();
    }

    let mut params = BenchmarkParams::from_config(&config);
    if let Some(iterations) = cli.iterations {
        params.iterations = iterations;
    }
    if let Some(max_time) = cli.max_time {
        params.max_time_sec = max_time;
    }

    let mut suite = Suite::new(
        DispatchContext {
            under_launcher: under_launcher(),
        },
        params.clone(),
    );
    register(&mut suite);

    let filter = Regex::new(&cli.filter)?;
    suite.retain(|name| filter.is_match(name));
    tracing::info!(
        benchmarks = suite.len(),
        world_size = comm.as_dyn().size(),
        "suite registered"
    );

    if cli.list {
        if comm.as_dyn().is_coordinator() {
            for bench in suite.benches() {
                println!("{}", bench.name);
            }
        }
        return finish(comm);
    }

    let format: OutputFormat = cli.format.parse()?;
    let report = Executor::new(comm.as_dyn()).execute(&mut suite, &config, &params)?;
    let rendered = match format {
        OutputFormat::Human => format_human(&report),
        OutputFormat::Json => generate_json(&report)?,
    };
    reporter_for_rank(rank, cli.output.clone()).publish(&rendered)?;

    finish(comm)
}

fn finish(comm: Comm) -> Result<()> {
    if let Err(e) = comm.finalize() {
        eprintln!("parbench: leaving worker group failed: {e}");
        std::process::exit(e.exit_code());
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "parbench=debug,parbench_cli=debug,parbench_comm=debug,parbench_perf=debug"
    } else {
        "parbench=info,parbench_cli=info,parbench_comm=info,parbench_perf=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Remove report-output flags from the argument vector on non-coordinator
/// ranks, before clap sees them.
fn strip_output_args(args: Vec<String>, rank: u32) -> Vec<String> {
    if rank == 0 {
        return args;
    }
    let mut stripped = Vec::with_capacity(args.len());
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        if arg == "--output" || arg == "-o" {
            iter.next();
            continue;
        }
        if arg.starts_with("--output=") || (arg.starts_with("-o") && arg.len() > 2) {
            continue;
        }
        stripped.push(arg);
    }
    stripped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn coordinator_keeps_output_args() {
        let kept = strip_output_args(args(&["bench", "--output", "report.json"]), 0);
        assert_eq!(kept, args(&["bench", "--output", "report.json"]));
    }

    #[test]
    fn workers_drop_every_output_form() {
        for form in [
            vec!["bench", "--output", "report.json", ".*"],
            vec!["bench", "--output=report.json", ".*"],
            vec!["bench", "-o", "report.json", ".*"],
            vec!["bench", "-oreport.json", ".*"],
        ] {
            let kept = strip_output_args(args(&form), 1);
            assert_eq!(kept, args(&["bench", ".*"]), "form {form:?}");
        }
    }

    #[test]
    fn cli_parses_defaults() {
        let cli = Cli::try_parse_from(["bench"]).unwrap();
        assert_eq!(cli.filter, ".*");
        assert_eq!(cli.format, "human");
        assert!(cli.output.is_none());
        assert!(!cli.list);
    }

    #[test]
    fn cli_rejects_unknown_flags() {
        assert!(Cli::try_parse_from(["bench", "--frobnicate"]).is_err());
    }

    #[test]
    fn cli_accepts_a_full_invocation() {
        let cli = Cli::try_parse_from([
            "bench",
            "threads:.*:seq",
            "--format",
            "json",
            "--output",
            "out.json",
            "--iterations",
            "5",
            "--max-time",
            "2.5",
            "--procs",
            "4",
            "--pin-cpu",
            "2",
        ])
        .unwrap();
        assert_eq!(cli.filter, "threads:.*:seq");
        assert_eq!(cli.iterations, Some(5));
        assert_eq!(cli.max_time, Some(2.5));
        assert_eq!(cli.procs, Some(4));
        assert_eq!(cli.pin_cpu, Some(2));
    }
}
