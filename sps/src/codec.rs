//! Serialization traits and the primitive codec.
//!
//! A (tag, concrete type) pair is bound to a codec by implementing
//! [`SpsSerialize<Tag>`] and/or [`SpsDeserialize<'de, Tag>`] for the concrete
//! type. All multi-byte integers are little-endian two's complement.

use crate::buffer::{InputBuffer, OutputBuffer};
use crate::error::{CodecError, Result};
use crate::tag::{SpsChar, SpsEmpty, SpsTargetAddress};

/// Encodes `Self` under the wire shape described by `Tag`.
pub trait SpsSerialize<Tag: ?Sized> {
    /// Exact number of bytes [`serialize`](Self::serialize) will write.
    fn size(&self) -> usize;

    /// Writes the encoding of `self` to `ob`.
    fn serialize(&self, ob: &mut OutputBuffer<'_>) -> Result<()>;
}

/// Decodes `Self` from the wire shape described by `Tag`.
///
/// The `'de` lifetime is that of the input bytes; borrowed decodes such as
/// `&'de str` alias them directly.
pub trait SpsDeserialize<'de, Tag: ?Sized>: Sized {
    /// Reads one value from `ib`.
    fn deserialize(ib: &mut InputBuffer<'de>) -> Result<Self>;
}

/// A type that decodes without borrowing from its input.
pub trait SpsDeserializeOwned<Tag: ?Sized>: for<'de> SpsDeserialize<'de, Tag> {}

impl<Tag: ?Sized, T> SpsDeserializeOwned<Tag> for T where T: for<'de> SpsDeserialize<'de, Tag> {}

impl<Tag: ?Sized, T: SpsSerialize<Tag> + ?Sized> SpsSerialize<Tag> for &T {
    fn size(&self) -> usize {
        (**self).size()
    }

    fn serialize(&self, ob: &mut OutputBuffer<'_>) -> Result<()> {
        (**self).serialize(ob)
    }
}

impl<Tag: ?Sized, T: SpsSerialize<Tag> + ?Sized> SpsSerialize<Tag> for &mut T {
    fn size(&self) -> usize {
        (**self).size()
    }

    fn serialize(&self, ob: &mut OutputBuffer<'_>) -> Result<()> {
        (**self).serialize(ob)
    }
}

impl<Tag: ?Sized, T: SpsSerialize<Tag> + ?Sized> SpsSerialize<Tag> for Box<T> {
    fn size(&self) -> usize {
        (**self).size()
    }

    fn serialize(&self, ob: &mut OutputBuffer<'_>) -> Result<()> {
        (**self).serialize(ob)
    }
}

impl<'de, Tag: ?Sized, T: SpsDeserialize<'de, Tag>> SpsDeserialize<'de, Tag> for Box<T> {
    fn deserialize(ib: &mut InputBuffer<'de>) -> Result<Self> {
        T::deserialize(ib).map(Box::new)
    }
}

/// Little-endian codecs for integers tagged by their own type.
macro_rules! integer_codec {
    ($($t:ty),* $(,)?) => {
        $(
            impl SpsSerialize<$t> for $t {
                fn size(&self) -> usize {
                    size_of::<$t>()
                }

                fn serialize(&self, ob: &mut OutputBuffer<'_>) -> Result<()> {
                    ob.write(&self.to_le_bytes())
                }
            }

            impl<'de> SpsDeserialize<'de, $t> for $t {
                fn deserialize(ib: &mut InputBuffer<'de>) -> Result<Self> {
                    ib.read_array().map(<$t>::from_le_bytes)
                }
            }
        )*
    };
}

integer_codec!(i8, i16, i32, i64, u8, u16, u32, u64);

impl SpsSerialize<bool> for bool {
    fn size(&self) -> usize {
        1
    }

    fn serialize(&self, ob: &mut OutputBuffer<'_>) -> Result<()> {
        ob.write(&[u8::from(*self)])
    }
}

impl<'de> SpsDeserialize<'de, bool> for bool {
    fn deserialize(ib: &mut InputBuffer<'de>) -> Result<Self> {
        // Peek first so a rejected byte is not consumed.
        match ib.data().first() {
            None => Err(CodecError::Underflow {
                needed: 1,
                remaining: 0,
            }),
            Some(&b) if b > 1 => Err(CodecError::InvalidBool(b)),
            Some(&b) => {
                ib.skip(1)?;
                Ok(b == 1)
            }
        }
    }
}

/// Single-byte codecs under [`SpsChar`].
macro_rules! char_codec {
    ($($t:ty),*) => {
        $(
            impl SpsSerialize<SpsChar> for $t {
                fn size(&self) -> usize {
                    1
                }

                fn serialize(&self, ob: &mut OutputBuffer<'_>) -> Result<()> {
                    SpsSerialize::<$t>::serialize(self, ob)
                }
            }

            impl<'de> SpsDeserialize<'de, SpsChar> for $t {
                fn deserialize(ib: &mut InputBuffer<'de>) -> Result<Self> {
                    <$t as SpsDeserialize<'de, $t>>::deserialize(ib)
                }
            }
        )*
    };
}

char_codec!(u8, i8);

impl SpsSerialize<SpsEmpty> for () {
    fn size(&self) -> usize {
        0
    }

    fn serialize(&self, _ob: &mut OutputBuffer<'_>) -> Result<()> {
        Ok(())
    }
}

impl<'de> SpsDeserialize<'de, SpsEmpty> for () {
    fn deserialize(_ib: &mut InputBuffer<'de>) -> Result<Self> {
        Ok(())
    }
}

// `()` as a tag is the return shape of `fn(..)` signatures.
impl SpsSerialize<()> for () {
    fn size(&self) -> usize {
        0
    }

    fn serialize(&self, _ob: &mut OutputBuffer<'_>) -> Result<()> {
        Ok(())
    }
}

impl<'de> SpsDeserialize<'de, ()> for () {
    fn deserialize(_ib: &mut InputBuffer<'de>) -> Result<Self> {
        Ok(())
    }
}

/// An address in the peer's address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[allow(clippy::exhaustive_structs)]
pub struct TargetAddr(pub u64);

impl std::fmt::Display for TargetAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

impl From<u64> for TargetAddr {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl SpsSerialize<SpsTargetAddress> for u64 {
    fn size(&self) -> usize {
        size_of::<Self>()
    }

    fn serialize(&self, ob: &mut OutputBuffer<'_>) -> Result<()> {
        SpsSerialize::<u64>::serialize(self, ob)
    }
}

impl<'de> SpsDeserialize<'de, SpsTargetAddress> for u64 {
    fn deserialize(ib: &mut InputBuffer<'de>) -> Result<Self> {
        <Self as SpsDeserialize<'de, u64>>::deserialize(ib)
    }
}

impl SpsSerialize<SpsTargetAddress> for TargetAddr {
    fn size(&self) -> usize {
        size_of::<u64>()
    }

    fn serialize(&self, ob: &mut OutputBuffer<'_>) -> Result<()> {
        SpsSerialize::<u64>::serialize(&self.0, ob)
    }
}

impl<'de> SpsDeserialize<'de, SpsTargetAddress> for TargetAddr {
    fn deserialize(ib: &mut InputBuffer<'de>) -> Result<Self> {
        <u64 as SpsDeserialize<'de, u64>>::deserialize(ib).map(Self)
    }
}

/// Encodes `value` under `Tag` into a freshly allocated vector.
pub fn to_vec<Tag: ?Sized, T: SpsSerialize<Tag> + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut out = vec![0u8; value.size()];
    let mut ob = OutputBuffer::new(&mut out);
    value.serialize(&mut ob)?;
    Ok(out)
}

/// Decodes one `T` under `Tag` from the front of `bytes`.
///
/// Trailing bytes are ignored.
pub fn from_bytes<'de, Tag: ?Sized, T: SpsDeserialize<'de, Tag>>(bytes: &'de [u8]) -> Result<T> {
    T::deserialize(&mut InputBuffer::new(bytes))
}
