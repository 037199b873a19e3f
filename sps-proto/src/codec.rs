//! Length-prefixed frame codec over any `Read`/`Write` stream.
//!
//! Each frame is: `[u32 big-endian length][postcard payload]`.

use std::io::{self, Read, Write};

use serde::{Deserialize, Serialize};

/// Maximum allowed frame payload (16 MiB).
pub const MAX_FRAME: u32 = 16 * 1024 * 1024;

/// Errors from reading or writing a frame.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum FrameError {
    /// The underlying stream failed or closed.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// The payload could not be encoded or decoded.
    #[error("invalid frame payload: {0}")]
    Payload(#[from] postcard::Error),

    /// The frame length exceeds [`MAX_FRAME`].
    #[error("frame of {len} bytes exceeds 16 MiB limit")]
    TooLarge {
        /// Length declared by (or computed for) the frame.
        len: u64,
    },

    /// The stream ended partway through a frame.
    #[error("stream closed mid-frame")]
    Truncated,
}

impl FrameError {
    /// Returns `true` if the peer closed the stream between frames.
    ///
    /// A stream that ends inside a frame is [`FrameError::Truncated`] instead.
    pub fn is_eof(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof)
    }
}

/// Maps end-of-stream inside a frame to [`FrameError::Truncated`].
fn mid_frame(e: io::Error) -> FrameError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        FrameError::Truncated
    } else {
        FrameError::Io(e)
    }
}

/// Reads the first header byte; zero bytes read means a clean close.
fn read_first(r: &mut impl Read, byte: &mut [u8]) -> Result<(), FrameError> {
    loop {
        match r.read(byte) {
            Ok(0) => return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into()),
            Ok(_) => return Ok(()),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
}

/// Encodes `msg` as a length-prefixed postcard frame and writes it to `w`.
pub fn encode<W: Write>(w: &mut W, msg: &impl Serialize) -> Result<(), FrameError> {
    let payload = postcard::to_allocvec(msg)?;
    let len = u32::try_from(payload.len())
        .ok()
        .filter(|&n| n <= MAX_FRAME)
        .ok_or(FrameError::TooLarge {
            len: payload.len() as u64,
        })?;
    w.write_all(&len.to_be_bytes())?;
    w.write_all(&payload)?;
    w.flush()?;
    Ok(())
}

/// Reads a length-prefixed postcard frame from `r` and decodes it.
pub fn decode<T: for<'de> Deserialize<'de>>(r: &mut impl Read) -> Result<T, FrameError> {
    let mut header = [0u8; 4];
    let (first, rest) = header.split_at_mut(1);
    read_first(r, first)?;
    r.read_exact(rest).map_err(mid_frame)?;
    let len = u32::from_be_bytes(header);
    if len > MAX_FRAME {
        return Err(FrameError::TooLarge { len: len.into() });
    }
    let mut payload = vec![0u8; len as usize];
    r.read_exact(&mut payload).map_err(mid_frame)?;
    Ok(postcard::from_bytes(&payload)?)
}
