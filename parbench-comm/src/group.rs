//! Worker-side view of a launcher-spawned process group.

use crate::framing::{FrameReader, FrameWriter};
use crate::protocol::{ControlMessage, WorkerMessage, PROTOCOL_VERSION};
use crate::{CommError, Communicator};
use std::net::TcpStream;
use std::sync::Mutex;

/// Rank of this worker within the group.
pub const ENV_RANK: &str = "PARBENCH_RANK";
/// Total number of workers in the group.
pub const ENV_WORLD_SIZE: &str = "PARBENCH_WORLD_SIZE";
/// Address of the launcher's control listener.
pub const ENV_CONTROL_ADDR: &str = "PARBENCH_CONTROL_ADDR";

/// True when this process was spawned by a [`Launcher`](crate::Launcher).
pub fn under_launcher() -> bool {
    std::env::var_os(ENV_WORLD_SIZE).is_some()
}

struct Link {
    reader: FrameReader<TcpStream>,
    writer: FrameWriter<TcpStream>,
    // Guarded by the link mutex so seq assignment cannot reorder
    // against send order when callers race on barrier().
    next_seq: u64,
}

/// Communicator for one worker in a launcher-spawned group.
///
/// Connects to the launcher's control listener, performs the handshake,
/// and relays barriers through it. Must be initialized before the rest of
/// process startup (argument handling included) so every rank agrees on
/// its role, and torn down with [`finalize`](GroupComm::finalize).
pub struct GroupComm {
    rank: u32,
    size: u32,
    link: Mutex<Link>,
}

impl GroupComm {
    /// Join the group described by the launcher environment variables.
    pub fn init() -> Result<Self, CommError> {
        let rank = env_u32(ENV_RANK)?;
        let size = env_u32(ENV_WORLD_SIZE)?;
        let addr =
            std::env::var(ENV_CONTROL_ADDR).map_err(|_| CommError::MissingEnv(ENV_CONTROL_ADDR))?;
        Self::connect(&addr, rank, size)
    }

    /// Join the group at an explicit control address.
    pub fn connect(addr: &str, rank: u32, size: u32) -> Result<Self, CommError> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true).ok();
        let mut reader = FrameReader::new(stream.try_clone()?);
        let mut writer = FrameWriter::new(stream);

        writer.write(&WorkerMessage::Hello {
            protocol_version: PROTOCOL_VERSION,
            rank,
        })?;
        match reader.read::<ControlMessage>()? {
            ControlMessage::Welcome { world_size } if world_size == size => {}
            other => {
                return Err(CommError::Protocol {
                    expected: format!("Welcome with world_size {size}"),
                    got: format!("{other:?}"),
                })
            }
        }
        tracing::debug!(rank, size, "joined worker group");

        Ok(Self {
            rank,
            size,
            link: Mutex::new(Link {
                reader,
                writer,
                next_seq: 0,
            }),
        })
    }

    /// Leave the group. The launcher acknowledges before the link closes;
    /// the returned error's [`exit_code`](CommError::exit_code) is what the
    /// process should exit with on failure.
    pub fn finalize(self) -> Result<(), CommError> {
        let mut link = self
            .link
            .into_inner()
            .unwrap_or_else(|poison| poison.into_inner());
        link.writer.write(&WorkerMessage::Finalize)?;
        match link.reader.read::<ControlMessage>()? {
            ControlMessage::Goodbye => Ok(()),
            other => Err(CommError::Protocol {
                expected: "Goodbye".into(),
                got: format!("{other:?}"),
            }),
        }
    }
}

impl Communicator for GroupComm {
    fn rank(&self) -> u32 {
        self.rank
    }

    fn size(&self) -> u32 {
        self.size
    }

    fn barrier(&self) -> Result<(), CommError> {
        let mut link = self
            .link
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        let seq = link.next_seq;
        link.next_seq += 1;
        link.writer.write(&WorkerMessage::BarrierArrive { seq })?;
        match link.reader.read::<ControlMessage>()? {
            ControlMessage::BarrierRelease { seq: released } if released == seq => Ok(()),
            other => Err(CommError::Protocol {
                expected: format!("BarrierRelease for seq {seq}"),
                got: format!("{other:?}"),
            }),
        }
    }
}

fn env_u32(name: &'static str) -> Result<u32, CommError> {
    let raw = std::env::var(name).map_err(|_| CommError::MissingEnv(name))?;
    raw.parse()
        .map_err(|_| CommError::InvalidEnv(format!("{name}={raw}")))
}
