//! Length-prefixed frames carried over a worker process's stdin and stdout.
//!
//! ```text
//! +----------------+------------------+
//! | length (4 LE)  | JSON payload     |
//! +----------------+------------------+
//! ```

use std::io::{ErrorKind, Read, Write};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::FrameError;

/// Largest payload accepted in either direction.
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Writes `message` as one frame and flushes the writer.
///
/// # Errors
///
/// Returns an error if the message cannot be serialized, exceeds [`MAX_FRAME_SIZE`] or the
/// writer fails.
pub fn write_frame<W, T>(writer: &mut W, message: &T) -> Result<(), FrameError>
where
    W: Write,
    T: Serialize + ?Sized,
{
    let payload = serde_json::to_vec(message).map_err(FrameError::Encode)?;

    let len = u32::try_from(payload.len())
        .ok()
        .filter(|len| *len as usize <= MAX_FRAME_SIZE)
        .ok_or(FrameError::TooLarge {
            size: payload.len(),
            max: MAX_FRAME_SIZE,
        })?;

    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&payload)?;
    writer.flush()?;

    Ok(())
}

/// Reads one frame and deserializes it as `T`.
///
/// # Errors
///
/// Returns [`FrameError::EndOfStream`] if the stream ends cleanly before a frame starts. Other
/// errors signal a broken pipe, a truncated or oversized frame, or a payload that is not a `T`.
pub fn read_frame<R, T>(reader: &mut R) -> Result<T, FrameError>
where
    R: Read,
    T: DeserializeOwned,
{
    let mut len_buf = [0_u8; 4];

    match reader.read_exact(&mut len_buf) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Err(FrameError::EndOfStream),
        Err(e) => return Err(FrameError::Io(e)),
    }

    let len = u32::from_le_bytes(len_buf) as usize;

    if len > MAX_FRAME_SIZE {
        return Err(FrameError::TooLarge {
            size: len,
            max: MAX_FRAME_SIZE,
        });
    }

    if len == 0 {
        return Err(FrameError::Empty);
    }

    let mut payload = vec![0_u8; len];
    reader.read_exact(&mut payload)?;

    serde_json::from_slice(&payload).map_err(FrameError::Decode)
}
