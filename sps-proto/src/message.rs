//! Protocol message types exchanged between a caller and a handler host.

use serde::{Deserialize, Serialize};

/// Request sent from the calling side to the handler host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Request {
    /// Invoke the wrapper function registered under `tag`.
    Call {
        /// Function tag identifying the handler on the remote side.
        tag: u64,
        /// SPS-encoded argument list.
        args: Vec<u8>,
    },
    /// Health-check ping.
    Ping,
    /// Ask the host to stop serving.
    Shutdown,
}

/// Response sent from the handler host back to the caller.
///
/// Every [`Request::Call`] is answered by exactly one [`Response::Result`]
/// or [`Response::OutOfBandError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Response {
    /// SPS-encoded return value.
    Result(Vec<u8>),
    /// The call failed outside the in-band return encoding.
    OutOfBandError(String),
    /// Reply to [`Request::Ping`].
    Pong,
    /// Acknowledgment for [`Request::Shutdown`].
    Ok,
}
