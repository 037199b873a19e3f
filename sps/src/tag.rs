//! Tag types describing SPS wire shapes.
//!
//! Tags are never instantiated. They only select, at compile time, which
//! [`SpsSerialize`](crate::SpsSerialize) / [`SpsDeserialize`](crate::SpsDeserialize)
//! implementation a concrete value goes through. The primitive tags are the
//! Rust primitives themselves: `bool`, `i8`..`i64`, `u8`..`u64`.

use std::marker::PhantomData;

/// Marker for types usable as SPS tags.
pub trait SpsTag: 'static {}

/// Marks each listed primitive as a tag.
macro_rules! primitive_tags {
    ($($t:ty),* $(,)?) => {
        $(impl SpsTag for $t {})*
    };
}

primitive_tags!(bool, i8, i16, i32, i64, u8, u16, u32, u64);

/// The 8-bit character tag. Wire-identical to `u8`.
#[derive(Debug, Clone, Copy)]
#[allow(clippy::exhaustive_enums)]
pub enum SpsChar {}

/// Zero-sized placeholder, used where a return carries no value.
#[derive(Debug, Clone, Copy)]
#[allow(clippy::exhaustive_enums)]
pub enum SpsEmpty {}

/// An address in the peer's address space, encoded as a `u64`.
#[derive(Debug, Clone, Copy)]
#[allow(clippy::exhaustive_enums)]
pub enum SpsTargetAddress {}

/// A `bool` flag followed, on failure, by an [`SpsString`] message.
#[derive(Debug, Clone, Copy)]
#[allow(clippy::exhaustive_enums)]
pub enum SpsError {}

/// A `bool` flag followed by either a `T` or an [`SpsString`] message.
#[derive(Debug)]
pub struct SpsExpected<T>(PhantomData<fn() -> T>);

/// A heterogeneous product; `T` is a Rust tuple of element tags.
///
/// `SpsTuple<(u32, SpsString)>` encodes a `u32` followed by a string,
/// with no separators.
#[derive(Debug)]
pub struct SpsTuple<T>(PhantomData<fn() -> T>);

/// A `u64` element count followed by that many back-to-back `T`s.
#[derive(Debug)]
pub struct SpsSequence<T>(PhantomData<fn() -> T>);

/// Strings are sequences of characters.
pub type SpsString = SpsSequence<SpsChar>;

/// Maps are sequences of key/value tuples.
pub type SpsMap<K, V> = SpsSequence<SpsTuple<(K, V)>>;

impl SpsTag for () {}
impl SpsTag for SpsChar {}
impl SpsTag for SpsEmpty {}
impl SpsTag for SpsTargetAddress {}
impl SpsTag for SpsError {}
impl<T: SpsTag> SpsTag for SpsExpected<T> {}
impl<T: SpsTagList> SpsTag for SpsTuple<T> {}
impl<T: SpsTag> SpsTag for SpsSequence<T> {}

/// A Rust tuple whose elements are all tags: the shape of an argument list.
pub trait SpsTagList: 'static {
    /// Number of tags in the list.
    const LEN: usize;
}

/// Implements [`SpsTagList`] for tuples of each listed arity.
macro_rules! tag_lists {
    ($( ($($t:ident),*) ),* $(,)?) => {
        $(
            impl<$($t: SpsTag),*> SpsTagList for ($($t,)*) {
                const LEN: usize = tag_lists!(@count $($t)*);
            }
        )*
    };
    (@count) => { 0 };
    (@count $head:ident $($tail:ident)*) => { 1 + tag_lists!(@count $($tail)*) };
}

tag_lists!(
    (),
    (T1),
    (T1, T2),
    (T1, T2, T3),
    (T1, T2, T3, T4),
    (T1, T2, T3, T4, T5),
    (T1, T2, T3, T4, T5, T6),
    (T1, T2, T3, T4, T5, T6, T7),
    (T1, T2, T3, T4, T5, T6, T7, T8),
    (T1, T2, T3, T4, T5, T6, T7, T8, T9),
    (T1, T2, T3, T4, T5, T6, T7, T8, T9, T10),
    (T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11),
    (T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12),
);
