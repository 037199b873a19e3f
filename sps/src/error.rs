//! Error types for SPS encode and decode operations.

/// Alias for `Result<T, sps::CodecError>`.
pub type Result<T> = std::result::Result<T, CodecError>;

/// Errors returned by the SPS codec.
///
/// A failed operation never consumes bytes from the buffer it was given.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum CodecError {
    /// A write needed more space than the output buffer had left.
    #[error("output buffer overflow: need {needed} bytes, {remaining} remaining")]
    Overflow {
        /// Bytes the write required.
        needed: usize,
        /// Bytes left in the buffer.
        remaining: usize,
    },

    /// A read needed more bytes than the input buffer had left.
    #[error("input buffer underflow: need {needed} bytes, {remaining} remaining")]
    Underflow {
        /// Bytes the read required.
        needed: usize,
        /// Bytes left in the buffer.
        remaining: usize,
    },

    /// A boolean byte was neither 0 nor 1.
    #[error("invalid boolean byte {0:#04x}")]
    InvalidBool(u8),

    /// A string payload was not valid UTF-8.
    #[error("string payload is not valid UTF-8")]
    InvalidUtf8,

    /// A sequence length does not fit in this host's address space.
    #[error("sequence length {0} exceeds addressable size")]
    LengthOverflow(u64),

    /// A sequence of zero-size elements declared more than
    /// [`MAX_EMPTY_ELEMENTS`](crate::MAX_EMPTY_ELEMENTS) of them.
    #[error("sequence of {0} empty elements exceeds the decode limit")]
    TooManyEmptyElements(usize),

    /// A map payload contained the same key twice.
    #[error("duplicate key in map payload")]
    DuplicateKey,

    /// A success-valued error carrier was encoded as an `Expected`.
    #[error("cannot serialize an expected from a success value")]
    ExpectedFromSuccess,
}
