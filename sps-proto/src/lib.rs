//! Frame protocol for carrying SPS wrapper-function calls over byte streams.
//!
//! Each frame is a 4-byte big-endian length followed by a [`postcard`]
//! payload holding one [`Request`] or [`Response`]. The argument and result
//! bytes inside those messages are opaque SPS blobs; this crate never looks
//! into them. Suitable for any reliable byte stream (Unix socket, TCP, pipe).

mod codec;
mod message;

pub use codec::{FrameError, MAX_FRAME, decode, encode};
pub use message::{Request, Response};
