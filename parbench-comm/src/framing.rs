//! Length-prefixed frame encoding for the launcher control link.
//!
//! Each frame is a 4-byte little-endian length followed by a JSON-encoded
//! message. Messages are small control records (handshakes, barrier
//! arrivals), so the codec favors debuggability over throughput.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{BufReader, BufWriter, Read, Write};
use thiserror::Error;

/// Maximum allowed frame size. Control messages are tiny; anything near
/// this limit indicates a corrupted or misaligned stream.
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

/// Errors from frame encoding or decoding.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Underlying I/O failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Message failed to serialize.
    #[error("encode error: {0}")]
    Encode(String),

    /// Frame payload failed to deserialize.
    #[error("decode error: {0}")]
    Decode(String),

    /// Declared frame length exceeds [`MAX_FRAME_SIZE`].
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge {
        /// Declared payload size.
        size: usize,
        /// The configured maximum.
        max: usize,
    },

    /// Peer closed the connection between frames.
    #[error("end of stream")]
    EndOfStream,
}

/// Write one length-prefixed frame.
pub fn write_frame<W: Write, T: Serialize>(
    writer: &mut BufWriter<W>,
    message: &T,
) -> Result<(), FrameError> {
    let payload = serde_json::to_vec(message).map_err(|e| FrameError::Encode(e.to_string()))?;
    if payload.len() > MAX_FRAME_SIZE {
        return Err(FrameError::FrameTooLarge {
            size: payload.len(),
            max: MAX_FRAME_SIZE,
        });
    }
    writer.write_all(&(payload.len() as u32).to_le_bytes())?;
    writer.write_all(&payload)?;
    writer.flush()?;
    Ok(())
}

/// Read one length-prefixed frame.
///
/// Returns [`FrameError::EndOfStream`] when the peer closed the connection
/// cleanly at a frame boundary.
pub fn read_frame<R: Read, T: DeserializeOwned>(
    reader: &mut BufReader<R>,
) -> Result<T, FrameError> {
    let mut len_bytes = [0u8; 4];
    match reader.read_exact(&mut len_bytes) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(FrameError::EndOfStream)
        }
        Err(e) => return Err(FrameError::Io(e)),
    }
    let len = u32::from_le_bytes(len_bytes) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(FrameError::FrameTooLarge {
            size: len,
            max: MAX_FRAME_SIZE,
        });
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    serde_json::from_slice(&payload).map_err(|e| FrameError::Decode(e.to_string()))
}

/// Buffered frame writer over any byte sink.
pub struct FrameWriter<W: Write> {
    writer: BufWriter<W>,
}

impl<W: Write> FrameWriter<W> {
    /// Wrap a byte sink.
    pub fn new(inner: W) -> Self {
        Self {
            writer: BufWriter::new(inner),
        }
    }

    /// Write and flush one frame.
    pub fn write<T: Serialize>(&mut self, message: &T) -> Result<(), FrameError> {
        write_frame(&mut self.writer, message)
    }
}

/// Buffered frame reader over any byte source.
pub struct FrameReader<R: Read> {
    reader: BufReader<R>,
}

impl<R: Read> FrameReader<R> {
    /// Wrap a byte source.
    pub fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
        }
    }

    /// Read one frame.
    pub fn read<T: DeserializeOwned>(&mut self) -> Result<T, FrameError> {
        read_frame(&mut self.reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    enum TestMessage {
        Ping { seq: u64 },
        Label(String),
    }

    #[test]
    fn round_trip_single_frame() {
        let mut buf = Vec::new();
        {
            let mut writer = BufWriter::new(&mut buf);
            write_frame(&mut writer, &TestMessage::Ping { seq: 7 }).unwrap();
        }
        let mut reader = BufReader::new(buf.as_slice());
        let msg: TestMessage = read_frame(&mut reader).unwrap();
        assert_eq!(msg, TestMessage::Ping { seq: 7 });
    }

    #[test]
    fn round_trip_multiple_frames() {
        let mut buf = Vec::new();
        {
            let mut writer = BufWriter::new(&mut buf);
            for seq in 0..5u64 {
                write_frame(&mut writer, &TestMessage::Ping { seq }).unwrap();
            }
            write_frame(&mut writer, &TestMessage::Label("done".into())).unwrap();
        }
        let mut reader = BufReader::new(buf.as_slice());
        for seq in 0..5u64 {
            let msg: TestMessage = read_frame(&mut reader).unwrap();
            assert_eq!(msg, TestMessage::Ping { seq });
        }
        let msg: TestMessage = read_frame(&mut reader).unwrap();
        assert_eq!(msg, TestMessage::Label("done".into()));
    }

    #[test]
    fn clean_close_is_end_of_stream() {
        let mut reader = BufReader::new(&[][..]);
        let err = read_frame::<_, TestMessage>(&mut reader).unwrap_err();
        assert!(matches!(err, FrameError::EndOfStream));
    }

    #[test]
    fn oversized_length_is_rejected() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(u32::MAX).to_le_bytes());
        let mut reader = BufReader::new(buf.as_slice());
        let err = read_frame::<_, TestMessage>(&mut reader).unwrap_err();
        assert!(matches!(err, FrameError::FrameTooLarge { .. }));
    }
}
