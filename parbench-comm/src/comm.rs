//! Communicator abstraction over single- and multi-process runs.

use crate::CommError;

/// Collective operations over a fixed group of workers.
///
/// The harness times barrier-bracketed regions through this trait; a
/// single-process run uses [`LocalComm`], a launcher-spawned group uses
/// [`GroupComm`](crate::GroupComm).
pub trait Communicator {
    /// This worker's rank, `0..size`.
    fn rank(&self) -> u32;

    /// Total number of workers in the group.
    fn size(&self) -> u32;

    /// Block until every worker in the group has arrived.
    fn barrier(&self) -> Result<(), CommError>;

    /// Whether this worker is the designated reporting coordinator.
    fn is_coordinator(&self) -> bool {
        self.rank() == 0
    }
}

/// Trivial communicator for a single-process run. Barriers are no-ops.
pub struct LocalComm;

impl Communicator for LocalComm {
    fn rank(&self) -> u32 {
        0
    }

    fn size(&self) -> u32 {
        1
    }

    fn barrier(&self) -> Result<(), CommError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_comm_is_a_singleton_coordinator() {
        let comm = LocalComm;
        assert_eq!(comm.rank(), 0);
        assert_eq!(comm.size(), 1);
        assert!(comm.is_coordinator());
        comm.barrier().unwrap();
    }
}
