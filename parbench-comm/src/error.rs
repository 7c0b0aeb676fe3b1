//! Worker-group runtime errors.

use crate::framing::FrameError;
use thiserror::Error;

/// Fallback exit code for runtime failures without an OS error code.
const RUNTIME_FAILURE_CODE: i32 = 70;

/// Errors from worker-group setup, synchronization, or teardown.
#[derive(Debug, Error)]
pub enum CommError {
    /// A worker process could not be spawned.
    #[error("failed to spawn worker: {0}")]
    Spawn(std::io::Error),

    /// Control-link I/O failure.
    #[error("control link i/o: {0}")]
    Io(#[from] std::io::Error),

    /// Control-link frame failure.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Peer sent something the protocol does not allow here.
    #[error("protocol error: expected {expected}, got {got}")]
    Protocol {
        /// What this side was waiting for.
        expected: String,
        /// What actually arrived.
        got: String,
    },

    /// Required launcher environment variable is absent.
    #[error("launcher environment incomplete: missing {0}")]
    MissingEnv(&'static str),

    /// Launcher environment variable present but unusable.
    #[error("invalid launcher environment: {0}")]
    InvalidEnv(String),

    /// A worker process exited with a failure code.
    #[error("worker {rank} exited with code {code}")]
    WorkerFailed {
        /// Rank of the failed worker.
        rank: u32,
        /// Its exit code.
        code: i32,
    },
}

impl CommError {
    /// Exit code a process should terminate with when this error aborts
    /// runtime setup or teardown. OS error codes pass through; everything
    /// else maps to a generic runtime-failure code.
    pub fn exit_code(&self) -> i32 {
        match self {
            CommError::Spawn(e) | CommError::Io(e) => {
                e.raw_os_error().unwrap_or(RUNTIME_FAILURE_CODE)
            }
            CommError::Frame(FrameError::Io(e)) => {
                e.raw_os_error().unwrap_or(RUNTIME_FAILURE_CODE)
            }
            CommError::WorkerFailed { code, .. } => *code,
            _ => RUNTIME_FAILURE_CODE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_failure_propagates_its_code() {
        let err = CommError::WorkerFailed { rank: 2, code: 3 };
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn os_errors_pass_through() {
        let io = std::io::Error::from_raw_os_error(13);
        assert_eq!(CommError::Io(io).exit_code(), 13);
    }

    #[test]
    fn protocol_errors_use_the_generic_code() {
        let err = CommError::Protocol {
            expected: "Welcome".into(),
            got: "Goodbye".into(),
        };
        assert_eq!(err.exit_code(), 70);
    }
}
