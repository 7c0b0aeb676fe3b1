//! Worker-group runtime for the parbench harness.
//!
//! Distributed backends run as `world_size` copies of the same binary,
//! spawned by [`Launcher`] and synchronized over a loopback control
//! channel. Each worker joins via [`GroupComm::init`]; barriers are
//! relayed through the launcher so timed regions start and end together.

#![warn(missing_docs)]

mod comm;
mod error;
mod framing;
mod group;
mod launcher;
mod protocol;

pub use comm::{Communicator, LocalComm};
pub use error::CommError;
pub use framing::{read_frame, write_frame, FrameError, FrameReader, FrameWriter, MAX_FRAME_SIZE};
pub use group::{under_launcher, GroupComm, ENV_CONTROL_ADDR, ENV_RANK, ENV_WORLD_SIZE};
pub use launcher::Launcher;
pub use protocol::{ControlMessage, WorkerMessage, PROTOCOL_VERSION};
