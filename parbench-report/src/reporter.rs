//! Rendered-report sinks. Only the coordinator worker writes anywhere.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

/// Destination for the rendered report.
pub trait Reporter {
    /// Deliver the rendered report.
    fn publish(&mut self, rendered: &str) -> io::Result<()>;
}

/// Writes the report to stdout or to a file.
pub struct StreamReporter {
    target: Option<PathBuf>,
}

impl StreamReporter {
    /// Reporter writing to stdout.
    pub fn stdout() -> Self {
        Self { target: None }
    }

    /// Reporter writing to a file at `path`.
    pub fn file(path: PathBuf) -> Self {
        Self { target: Some(path) }
    }
}

impl Reporter for StreamReporter {
    fn publish(&mut self, rendered: &str) -> io::Result<()> {
        match &self.target {
            Some(path) => fs::write(path, rendered),
            None => {
                let mut stdout = io::stdout().lock();
                stdout.write_all(rendered.as_bytes())?;
                stdout.flush()
            }
        }
    }
}

/// Discards everything. Installed on non-coordinator workers so exactly
/// one process in the group touches the results sink.
pub struct NullReporter;

impl Reporter for NullReporter {
    fn publish(&mut self, _rendered: &str) -> io::Result<()> {
        Ok(())
    }
}

/// Select the reporter for a worker: the coordinator rank gets a real
/// sink, every other rank gets [`NullReporter`] even if an output path
/// survived argument handling.
pub fn reporter_for_rank(rank: u32, output: Option<PathBuf>) -> Box<dyn Reporter> {
    if rank != 0 {
        return Box::new(NullReporter);
    }
    match output {
        Some(path) => Box::new(StreamReporter::file(path)),
        None => Box::new(StreamReporter::stdout()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinator_writes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        let mut reporter = reporter_for_rank(0, Some(path.clone()));
        reporter.publish("hello\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello\n");
    }

    #[test]
    fn non_coordinator_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        let mut reporter = reporter_for_rank(1, Some(path.clone()));
        reporter.publish("hello\n").unwrap();
        assert!(!path.exists());
    }
}
