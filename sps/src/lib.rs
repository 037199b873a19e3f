//! Simple Packed Serialization (SPS).
//!
//! SPS is a compact, deterministic, non-self-describing binary encoding.
//! The shape of the bytes is chosen entirely at compile time by a *tag*
//! type; values carry no per-value type information.
//!
//! # Wire format
//!
//! | Tag | Encoding |
//! |-----|----------|
//! | `bool` | one byte, `0` or `1` |
//! | `i8`..`i64`, `u8`..`u64`, [`SpsChar`] | little-endian two's complement |
//! | [`SpsTargetAddress`] | as `u64` |
//! | [`SpsEmpty`] | nothing |
//! | [`SpsSequence<T>`] | `u64` count, then each `T` |
//! | [`SpsString`] | `SpsSequence<SpsChar>` |
//! | [`SpsMap<K, V>`] | `SpsSequence<SpsTuple<(K, V)>>` |
//! | [`SpsTuple<(T1, ..)>`](SpsTuple) | each element in order |
//! | [`SpsError`] | `bool`, then an `SpsString` if set |
//! | [`SpsExpected<T>`] | `bool`, then `T` if set, else an `SpsString` |
//!
//! # Example
//!
//! ```
//! use sps::{SpsArgList, SpsString};
//!
//! let blob = SpsArgList::<(u32, SpsString)>::to_wrapper_function_result(&(7u32, "hi")).unwrap();
//! assert_eq!(blob.data(), [7, 0, 0, 0, 2, 0, 0, 0, 0, 0, 0, 0, b'h', b'i']);
//!
//! let (n, s): (u32, &str) = SpsArgList::<(u32, SpsString)>::from_buffer(blob.data()).unwrap();
//! assert_eq!((n, s), (7, "hi"));
//! ```

mod buffer;
mod codec;
mod error;
mod expected;
pub mod ffi;
mod result;
mod sequence;
mod tag;
mod tuple;

pub use buffer::{InputBuffer, OutputBuffer};
pub use codec::{
    SpsDeserialize, SpsDeserializeOwned, SpsSerialize, TargetAddr, from_bytes, to_vec,
};
pub use error::{CodecError, Result};
pub use expected::{RemoteError, SerializableError, SerializableExpected};
pub use result::WrapperFunctionResult;
pub use sequence::{
    MAX_EMPTY_ELEMENTS, TrivialSequence, deserialize_sequence, sequence_size, serialize_sequence,
};
pub use tag::{
    SpsChar, SpsEmpty, SpsError, SpsExpected, SpsMap, SpsSequence, SpsString, SpsTag,
    SpsTagList, SpsTargetAddress, SpsTuple,
};
pub use tuple::SpsArgList;
