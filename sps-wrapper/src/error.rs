//! Error types for wrapper-function calls.

use sps::CodecError;

/// Alias for `Result<T, sps_wrapper::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Out-of-band message returned when a handler cannot decode its arguments.
pub const DESERIALIZE_ARGS_ERROR: &str = "Could not deserialize arguments for wrapper function call";

/// Out-of-band message returned when a handler cannot encode its return value.
pub const SERIALIZE_RESULT_ERROR: &str = "Could not serialize return value from wrapper function";

/// Errors surfaced by the calling side of a wrapper function.
///
/// In-band failures (an `SpsError` or `SpsExpected` return carrying a
/// message) are not represented here; they decode into the call's return
/// value.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// No dispatch context has been configured.
    #[error("dispatch context not set")]
    DispatchContextNotSet,

    /// No dispatch function has been configured.
    #[error("dispatch function not set")]
    DispatchFunctionNotSet,

    /// The dispatch context was configured twice.
    #[error("dispatch context already set")]
    DispatchContextAlreadySet,

    /// The dispatch function was configured twice.
    #[error("dispatch function already set")]
    DispatchFunctionAlreadySet,

    /// The arguments could not be encoded.
    #[error("Error serializing arguments to blob in call")]
    SerializeArguments(#[source] CodecError),

    /// The returned bytes could not be decoded as the declared return type.
    #[error("Error deserializing return value from blob in call")]
    DeserializeResult(#[source] CodecError),

    /// The transport or the handler side reported an out-of-band error.
    #[error("{0}")]
    OutOfBand(String),
}
