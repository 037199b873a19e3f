//! In-band error carriers: the `SpsError` and `SpsExpected<T>` wire shapes.
//!
//! `SpsError` is `bool has_error` followed by a message only when set.
//! `SpsExpected<T>` is `bool has_value` followed by either a `T` or a
//! message. Rust `Result`s map onto both directly: any `E: Display` can be
//! encoded, and any `E: From<String>` can be decoded.

use std::fmt::Display;

use crate::buffer::{InputBuffer, OutputBuffer};
use crate::codec::{SpsDeserialize, SpsSerialize};
use crate::error::{CodecError, Result};
use crate::tag::{SpsError, SpsExpected, SpsString};

/// An error message received through an in-band error return.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct RemoteError {
    /// Text produced by the peer's `Display` impl.
    message: String,
}

impl RemoteError {
    /// Creates an error carrying `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The message sent by the peer.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for RemoteError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for RemoteError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Inspectable form of an error-or-success value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[allow(clippy::exhaustive_enums)]
pub enum SerializableError {
    /// No error.
    #[default]
    Success,
    /// An error with its rendered message.
    Failure(String),
}

impl SerializableError {
    /// Renders the error side of `result`, if any.
    pub fn from_result<E: Display>(result: &std::result::Result<(), E>) -> Self {
        match result {
            Ok(()) => Self::Success,
            Err(e) => Self::Failure(e.to_string()),
        }
    }

    /// Converts back to a `Result`, rebuilding the error from its message.
    pub fn into_result<E: From<String>>(self) -> std::result::Result<(), E> {
        match self {
            Self::Success => Ok(()),
            Self::Failure(msg) => Err(E::from(msg)),
        }
    }

    /// Returns `true` if this carries an error.
    pub const fn has_error(&self) -> bool {
        matches!(self, Self::Failure(_))
    }
}

impl<E: Display> From<std::result::Result<(), E>> for SerializableError {
    fn from(result: std::result::Result<(), E>) -> Self {
        Self::from_result(&result)
    }
}

/// Inspectable form of a value-or-error.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::exhaustive_enums)]
pub enum SerializableExpected<T> {
    /// A successfully produced value.
    Value(T),
    /// An error with its rendered message.
    Failure(String),
}

impl<T> SerializableExpected<T> {
    /// Converts back to a `Result`, rebuilding the error from its message.
    pub fn into_result<E: From<String>>(self) -> std::result::Result<T, E> {
        match self {
            Self::Value(v) => Ok(v),
            Self::Failure(msg) => Err(E::from(msg)),
        }
    }

    /// Returns `true` if this carries a value.
    pub const fn has_value(&self) -> bool {
        matches!(self, Self::Value(_))
    }
}

impl<T, E: Display> From<std::result::Result<T, E>> for SerializableExpected<T> {
    fn from(result: std::result::Result<T, E>) -> Self {
        match result {
            Ok(v) => Self::Value(v),
            Err(e) => Self::Failure(e.to_string()),
        }
    }
}

/// Encoded size of an error message.
fn message_size(msg: &str) -> usize {
    SpsSerialize::<SpsString>::size(msg)
}

/// Writes `flag` followed by `msg`.
fn write_failure(ob: &mut OutputBuffer<'_>, flag: bool, msg: &str) -> Result<()> {
    SpsSerialize::<bool>::serialize(&flag, ob)?;
    SpsSerialize::<SpsString>::serialize(msg, ob)
}

/// Reads the leading `bool` of an error or expected.
fn read_flag(ib: &mut InputBuffer<'_>) -> Result<bool> {
    <bool as SpsDeserialize<'_, bool>>::deserialize(ib)
}

/// Reads an error message.
fn read_message(ib: &mut InputBuffer<'_>) -> Result<String> {
    <String as SpsDeserialize<'_, SpsString>>::deserialize(ib)
}

impl SpsSerialize<SpsError> for SerializableError {
    fn size(&self) -> usize {
        match self {
            Self::Success => 1,
            Self::Failure(msg) => 1 + message_size(msg),
        }
    }

    fn serialize(&self, ob: &mut OutputBuffer<'_>) -> Result<()> {
        match self {
            Self::Success => SpsSerialize::<bool>::serialize(&false, ob),
            Self::Failure(msg) => write_failure(ob, true, msg),
        }
    }
}

impl<'de> SpsDeserialize<'de, SpsError> for SerializableError {
    fn deserialize(ib: &mut InputBuffer<'de>) -> Result<Self> {
        if read_flag(ib)? {
            read_message(ib).map(Self::Failure)
        } else {
            Ok(Self::Success)
        }
    }
}

/// A failure-only carrier encodes as the error arm of an expected.
impl<T> SpsSerialize<SpsExpected<T>> for SerializableError {
    fn size(&self) -> usize {
        match self {
            Self::Success => 1,
            Self::Failure(msg) => 1 + message_size(msg),
        }
    }

    fn serialize(&self, ob: &mut OutputBuffer<'_>) -> Result<()> {
        match self {
            Self::Success => Err(CodecError::ExpectedFromSuccess),
            Self::Failure(msg) => write_failure(ob, false, msg),
        }
    }
}

impl<T, V: SpsSerialize<T>> SpsSerialize<SpsExpected<T>> for SerializableExpected<V> {
    fn size(&self) -> usize {
        match self {
            Self::Value(v) => 1 + v.size(),
            Self::Failure(msg) => 1 + message_size(msg),
        }
    }

    fn serialize(&self, ob: &mut OutputBuffer<'_>) -> Result<()> {
        match self {
            Self::Value(v) => {
                SpsSerialize::<bool>::serialize(&true, ob)?;
                v.serialize(ob)
            }
            Self::Failure(msg) => write_failure(ob, false, msg),
        }
    }
}

impl<'de, T, V: SpsDeserialize<'de, T>> SpsDeserialize<'de, SpsExpected<T>>
    for SerializableExpected<V>
{
    fn deserialize(ib: &mut InputBuffer<'de>) -> Result<Self> {
        if read_flag(ib)? {
            V::deserialize(ib).map(Self::Value)
        } else {
            read_message(ib).map(Self::Failure)
        }
    }
}

impl<E: Display> SpsSerialize<SpsError> for std::result::Result<(), E> {
    fn size(&self) -> usize {
        SpsSerialize::<SpsError>::size(&SerializableError::from_result(self))
    }

    fn serialize(&self, ob: &mut OutputBuffer<'_>) -> Result<()> {
        SpsSerialize::<SpsError>::serialize(&SerializableError::from_result(self), ob)
    }
}

impl<'de, E: From<String>> SpsDeserialize<'de, SpsError> for std::result::Result<(), E> {
    fn deserialize(ib: &mut InputBuffer<'de>) -> Result<Self> {
        <SerializableError as SpsDeserialize<'de, SpsError>>::deserialize(ib)
            .map(SerializableError::into_result)
    }
}

/// `Ok(v)` encodes as `true` + `v`; `Err(e)` as `false` + `e.to_string()`.
///
/// Use `Result<V, Infallible>` to encode a bare success value.
impl<T, V: SpsSerialize<T>, E: Display> SpsSerialize<SpsExpected<T>> for std::result::Result<V, E> {
    fn size(&self) -> usize {
        match self {
            Ok(v) => 1 + v.size(),
            Err(e) => 1 + message_size(&e.to_string()),
        }
    }

    fn serialize(&self, ob: &mut OutputBuffer<'_>) -> Result<()> {
        match self {
            Ok(v) => {
                SpsSerialize::<bool>::serialize(&true, ob)?;
                v.serialize(ob)
            }
            Err(e) => write_failure(ob, false, &e.to_string()),
        }
    }
}

impl<'de, T, V: SpsDeserialize<'de, T>, E: From<String>> SpsDeserialize<'de, SpsExpected<T>>
    for std::result::Result<V, E>
{
    fn deserialize(ib: &mut InputBuffer<'de>) -> Result<Self> {
        <SerializableExpected<V> as SpsDeserialize<'de, SpsExpected<T>>>::deserialize(ib)
            .map(SerializableExpected::into_result)
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use super::*;
    use crate::codec::{from_bytes, to_vec};

    const NOPE: [u8; 12] = [4, 0, 0, 0, 0, 0, 0, 0, b'n', b'o', b'p', b'e'];

    #[test]
    fn error_success_is_single_zero_byte() {
        assert_eq!(to_vec::<SpsError, _>(&SerializableError::Success).unwrap(), [0]);
        assert_eq!(to_vec::<SpsError, _>(&Ok::<(), RemoteError>(())).unwrap(), [0]);
    }

    #[test]
    fn error_failure_is_flag_then_message() {
        let bytes = to_vec::<SpsError, _>(&Err::<(), _>("nope")).unwrap();
        assert_eq!(bytes[0], 1);
        assert_eq!(&bytes[1..], &NOPE);

        let back: std::result::Result<(), RemoteError> = from_bytes::<SpsError, _>(&bytes).unwrap();
        assert_eq!(back.unwrap_err().message(), "nope");
        let carrier: SerializableError = from_bytes::<SpsError, _>(&bytes).unwrap();
        assert_eq!(carrier, SerializableError::Failure("nope".into()));
    }

    #[test]
    fn expected_value_is_one_then_value() {
        let v: std::result::Result<u32, Infallible> = Ok(0xdead_beef);
        let bytes = to_vec::<SpsExpected<u32>, _>(&v).unwrap();
        assert_eq!(bytes, [1, 0xef, 0xbe, 0xad, 0xde]);

        let back: std::result::Result<u32, RemoteError> =
            from_bytes::<SpsExpected<u32>, _>(&bytes).unwrap();
        assert_eq!(back, Ok(0xdead_beef));
    }

    #[test]
    fn expected_error_is_zero_then_message() {
        let e: std::result::Result<u32, String> = Err("nope".into());
        let bytes = to_vec::<SpsExpected<u32>, _>(&e).unwrap();
        assert_eq!(bytes[0], 0);
        assert_eq!(&bytes[1..], &NOPE);

        let carrier: SerializableExpected<u32> = from_bytes::<SpsExpected<u32>, _>(&bytes).unwrap();
        assert!(!carrier.has_value());
        let back: std::result::Result<u32, RemoteError> = carrier.into_result();
        assert_eq!(back, Err(RemoteError::new("nope")));
    }

    #[test]
    fn failure_only_carrier_encodes_as_expected_error() {
        let failure = SerializableError::Failure("nope".into());
        let bytes = to_vec::<SpsExpected<u64>, _>(&failure).unwrap();
        assert_eq!(bytes[0], 0);
        assert_eq!(&bytes[1..], &NOPE);

        assert_eq!(
            to_vec::<SpsExpected<u64>, _>(&SerializableError::Success),
            Err(CodecError::ExpectedFromSuccess)
        );
    }

    #[test]
    fn carriers_convert_from_results() {
        let ok: std::result::Result<(), &str> = Ok(());
        assert!(!SerializableError::from(ok).has_error());
        let bad: std::result::Result<u8, &str> = Err("bad");
        assert_eq!(
            SerializableExpected::from(bad),
            SerializableExpected::Failure("bad".into())
        );
    }

    #[test]
    fn truncated_expected_fails() {
        assert!(from_bytes::<SpsExpected<u32>, SerializableExpected<u32>>(&[1, 0, 0]).is_err());
        assert!(from_bytes::<SpsError, SerializableError>(&[1, 4, 0]).is_err());
        assert!(from_bytes::<SpsError, SerializableError>(&[]).is_err());
    }
}
