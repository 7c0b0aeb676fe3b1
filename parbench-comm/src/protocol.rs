//! Control messages exchanged between workers and the launcher.

use serde::{Deserialize, Serialize};

/// Bumped whenever the message set changes incompatibly. The launcher
/// rejects workers with a different version.
pub const PROTOCOL_VERSION: u32 = 1;

/// Messages a worker sends to the launcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerMessage {
    /// First message on a fresh connection.
    Hello {
        /// Must equal [`PROTOCOL_VERSION`].
        protocol_version: u32,
        /// Rank assigned via the launcher environment.
        rank: u32,
    },
    /// This worker reached barrier `seq`.
    BarrierArrive {
        /// Monotonic per-worker barrier counter.
        seq: u64,
    },
    /// This worker is done and wants to leave the group.
    Finalize,
}

/// Messages the launcher sends to a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlMessage {
    /// Handshake acknowledgement.
    Welcome {
        /// Total number of workers in the group.
        world_size: u32,
    },
    /// Every worker arrived at barrier `seq`; proceed.
    BarrierRelease {
        /// Echoes the arrival counter.
        seq: u64,
    },
    /// Finalize acknowledgement; the link closes after this.
    Goodbye,
}
