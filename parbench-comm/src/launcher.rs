//! Spawns and coordinates a fixed group of worker processes.
//!
//! The launcher re-executes the current binary `world_size` times with the
//! group environment set, accepts one control connection per worker, and
//! then relays barrier rounds until every worker finalizes. Workers run
//! the same program over the same arguments (SPMD), so within any round
//! every worker sends the same kind of message; one blocking read per
//! worker per round cannot deadlock.

use crate::framing::{FrameReader, FrameWriter};
use crate::group::{ENV_CONTROL_ADDR, ENV_RANK, ENV_WORLD_SIZE};
use crate::protocol::{ControlMessage, WorkerMessage, PROTOCOL_VERSION};
use crate::CommError;
use std::ffi::OsStr;
use std::net::{TcpListener, TcpStream};
use std::process::{Child, Command};

struct WorkerLink {
    reader: FrameReader<TcpStream>,
    writer: FrameWriter<TcpStream>,
}

impl std::fmt::Debug for WorkerLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerLink").finish_non_exhaustive()
    }
}

/// Process-group launcher for the distributed backends.
pub struct Launcher {
    world_size: u32,
}

impl Launcher {
    /// Launcher for a group of `world_size` workers (at least one).
    pub fn new(world_size: u32) -> Self {
        Self {
            world_size: world_size.max(1),
        }
    }

    /// Number of workers this launcher spawns.
    pub fn world_size(&self) -> u32 {
        self.world_size
    }

    /// Spawn the group over the current executable with `args`, coordinate
    /// it to completion, and return the exit code the launching process
    /// should propagate: the first non-zero worker exit code, else zero.
    pub fn run<S: AsRef<OsStr>>(&self, args: &[S]) -> Result<i32, CommError> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?.to_string();
        let exe = std::env::current_exe().map_err(CommError::Spawn)?;
        tracing::info!(world_size = self.world_size, %addr, "launching worker group");

        let mut children: Vec<Child> = Vec::with_capacity(self.world_size as usize);
        for rank in 0..self.world_size {
            let spawned = Command::new(&exe)
                .args(args)
                .env(ENV_RANK, rank.to_string())
                .env(ENV_WORLD_SIZE, self.world_size.to_string())
                .env(ENV_CONTROL_ADDR, &addr)
                .spawn();
            match spawned {
                Ok(child) => children.push(child),
                Err(e) => {
                    kill_all(&mut children);
                    return Err(CommError::Spawn(e));
                }
            }
        }

        let coordinated = accept_workers(&listener, self.world_size).and_then(relay);
        if let Err(e) = coordinated {
            kill_all(&mut children);
            return Err(e);
        }

        let mut exit_code = 0;
        for (rank, mut child) in children.into_iter().enumerate() {
            let status = child.wait()?;
            let code = status.code().unwrap_or(1);
            if code != 0 {
                tracing::error!(rank, code, "worker exited with failure");
                if exit_code == 0 {
                    exit_code = code;
                }
            }
        }
        Ok(exit_code)
    }
}

fn kill_all(children: &mut Vec<Child>) {
    for child in children.iter_mut() {
        let _ = child.kill();
        let _ = child.wait();
    }
    children.clear();
}

/// Accept one handshaking connection per worker, in arbitrary arrival
/// order, and slot them by rank.
fn accept_workers(listener: &TcpListener, world_size: u32) -> Result<Vec<WorkerLink>, CommError> {
    let mut links: Vec<Option<WorkerLink>> = (0..world_size).map(|_| None).collect();
    for _ in 0..world_size {
        let (stream, _) = listener.accept()?;
        stream.set_nodelay(true).ok();
        let mut reader = FrameReader::new(stream.try_clone()?);
        let mut writer = FrameWriter::new(stream);
        match reader.read::<WorkerMessage>()? {
            WorkerMessage::Hello {
                protocol_version,
                rank,
            } => {
                if protocol_version != PROTOCOL_VERSION {
                    return Err(CommError::Protocol {
                        expected: format!("protocol version {PROTOCOL_VERSION}"),
                        got: format!("version {protocol_version}"),
                    });
                }
                let slot = links.get_mut(rank as usize).ok_or(CommError::Protocol {
                    expected: format!("rank below {world_size}"),
                    got: format!("rank {rank}"),
                })?;
                if slot.is_some() {
                    return Err(CommError::Protocol {
                        expected: "one Hello per rank".into(),
                        got: format!("duplicate rank {rank}"),
                    });
                }
                writer.write(&ControlMessage::Welcome { world_size })?;
                *slot = Some(WorkerLink { reader, writer });
            }
            other => {
                return Err(CommError::Protocol {
                    expected: "Hello".into(),
                    got: format!("{other:?}"),
                })
            }
        }
    }
    Ok(links.into_iter().flatten().collect())
}

/// Relay rounds until every worker finalizes: read one message from each
/// worker, then either release the barrier or say goodbye.
fn relay(mut links: Vec<WorkerLink>) -> Result<(), CommError> {
    loop {
        let mut messages = Vec::with_capacity(links.len());
        for link in links.iter_mut() {
            messages.push(link.reader.read::<WorkerMessage>()?);
        }

        let mut barrier_seq = None;
        let mut finalized = 0usize;
        for message in &messages {
            match message {
                WorkerMessage::BarrierArrive { seq } => match barrier_seq {
                    None => barrier_seq = Some(*seq),
                    Some(expected) if expected == *seq => {}
                    Some(expected) => {
                        return Err(CommError::Protocol {
                            expected: format!("BarrierArrive seq {expected}"),
                            got: format!("seq {seq}"),
                        })
                    }
                },
                WorkerMessage::Finalize => finalized += 1,
                WorkerMessage::Hello { .. } => {
                    return Err(CommError::Protocol {
                        expected: "BarrierArrive or Finalize".into(),
                        got: "Hello".into(),
                    })
                }
            }
        }

        if finalized == links.len() {
            for link in links.iter_mut() {
                link.writer.write(&ControlMessage::Goodbye)?;
            }
            tracing::debug!("worker group finalized");
            return Ok(());
        }
        match barrier_seq {
            Some(seq) if finalized == 0 => {
                for link in links.iter_mut() {
                    link.writer.write(&ControlMessage::BarrierRelease { seq })?;
                }
            }
            _ => {
                return Err(CommError::Protocol {
                    expected: "a uniform relay round".into(),
                    got: format!("{finalized} finalized among {}", links.len()),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Communicator, GroupComm};
    use std::thread;

    #[test]
    fn launcher_clamps_world_size() {
        assert_eq!(Launcher::new(0).world_size(), 1);
        assert_eq!(Launcher::new(4).world_size(), 4);
    }

    /// Full coordinator round over loopback without spawning processes:
    /// two in-process workers join, hit three barriers, and finalize.
    #[test]
    fn barriers_relay_across_a_loopback_group() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let coordinator =
            thread::spawn(move || accept_workers(&listener, 2).and_then(relay).unwrap());

        let workers: Vec<_> = (0..2u32)
            .map(|rank| {
                let addr = addr.clone();
                thread::spawn(move || {
                    let comm = GroupComm::connect(&addr, rank, 2).unwrap();
                    assert_eq!(comm.rank(), rank);
                    assert_eq!(comm.size(), 2);
                    assert_eq!(comm.is_coordinator(), rank == 0);
                    for _ in 0..3 {
                        comm.barrier().unwrap();
                    }
                    comm.finalize().unwrap();
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }
        coordinator.join().unwrap();
    }

    /// Two threads racing `barrier()` on one worker must still put their
    /// seq numbers on the wire in send order, or the relay's uniform-round
    /// check trips against the peer.
    #[test]
    fn racing_barrier_callers_keep_seq_in_send_order() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let coordinator =
            thread::spawn(move || accept_workers(&listener, 2).and_then(relay).unwrap());

        let peer_addr = addr.clone();
        let peer = thread::spawn(move || {
            let comm = GroupComm::connect(&peer_addr, 1, 2).unwrap();
            for _ in 0..8 {
                comm.barrier().unwrap();
            }
            comm.finalize().unwrap();
        });

        let comm = std::sync::Arc::new(GroupComm::connect(&addr, 0, 2).unwrap());
        let racers: Vec<_> = (0..2)
            .map(|_| {
                let comm = std::sync::Arc::clone(&comm);
                thread::spawn(move || {
                    for _ in 0..4 {
                        comm.barrier().unwrap();
                    }
                })
            })
            .collect();
        for racer in racers {
            racer.join().unwrap();
        }
        let comm = std::sync::Arc::try_unwrap(comm).ok().unwrap();
        comm.finalize().unwrap();

        peer.join().unwrap();
        coordinator.join().unwrap();
    }

    #[test]
    fn wrong_protocol_version_is_rejected() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let client = thread::spawn(move || {
            let stream = TcpStream::connect(addr).unwrap();
            let mut writer = FrameWriter::new(stream);
            writer
                .write(&WorkerMessage::Hello {
                    protocol_version: PROTOCOL_VERSION + 1,
                    rank: 0,
                })
                .unwrap();
        });

        let err = accept_workers(&listener, 1).unwrap_err();
        assert!(matches!(err, CommError::Protocol { .. }));
        client.join().unwrap();
    }
}
