//! Sequence, string and map codecs.
//!
//! Every sequence is a `u64` element count followed by the elements with no
//! padding or terminator. Strings are sequences of [`SpsChar`] and maps are
//! sequences of key/value tuples, so all three share one wire shape.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::hash::{BuildHasher, Hash};

use crate::buffer::{InputBuffer, OutputBuffer};
use crate::codec::{SpsDeserialize, SpsSerialize};
use crate::error::{CodecError, Result};
use crate::tag::{SpsChar, SpsSequence, SpsTuple};

/// Largest element count accepted for a sequence whose elements occupy no
/// bytes. Other sequences are bounded by the input length itself.
pub const MAX_EMPTY_ELEMENTS: usize = 1 << 20;

/// A container that can be rebuilt element by element from a sequence.
///
/// Implementing this for a container is enough to decode it from an
/// [`SpsSequence`] through [`deserialize_sequence`].
pub trait TrivialSequence<'de, ElemTag>: Default {
    /// The decoded element type.
    type Element: SpsDeserialize<'de, ElemTag>;

    /// Reserves room for `additional` elements.
    fn reserve(&mut self, additional: usize);

    /// Appends one decoded element.
    fn append(&mut self, element: Self::Element) -> Result<()>;
}

/// Encoded size of a sequence holding `items`.
pub fn sequence_size<E, I>(items: I) -> usize
where
    I: IntoIterator,
    I::Item: SpsSerialize<E>,
{
    size_of::<u64>() + items.into_iter().map(|e| e.size()).sum::<usize>()
}

/// Writes the element count followed by each element in iteration order.
pub fn serialize_sequence<E, I>(ob: &mut OutputBuffer<'_>, len: usize, items: I) -> Result<()>
where
    I: IntoIterator,
    I::Item: SpsSerialize<E>,
{
    SpsSerialize::<u64>::serialize(&(len as u64), ob)?;
    for e in items {
        e.serialize(ob)?;
    }
    Ok(())
}

/// Reads the element count, reserves, then decodes and appends each element.
///
/// On failure the partially built container is dropped. A sequence whose
/// elements consume no input is limited to [`MAX_EMPTY_ELEMENTS`].
pub fn deserialize_sequence<'de, E, C>(ib: &mut InputBuffer<'de>) -> Result<C>
where
    C: TrivialSequence<'de, E>,
{
    let len = read_len(ib)?;
    let mut out = C::default();
    // Every element occupies at least one byte unless it is empty, so a
    // length beyond the remaining input cannot be trusted for reservation.
    out.reserve(len.min(ib.remaining()));
    for _ in 0..len {
        let before = ib.remaining();
        let e = <C::Element as SpsDeserialize<'de, E>>::deserialize(ib)?;
        // An element that read nothing has an empty shape, as do the rest.
        if ib.remaining() == before && len > MAX_EMPTY_ELEMENTS {
            return Err(CodecError::TooManyEmptyElements(len));
        }
        out.append(e)?;
    }
    Ok(out)
}

/// Reads a `u64` element count as a host length.
fn read_len(ib: &mut InputBuffer<'_>) -> Result<usize> {
    let n = <u64 as SpsDeserialize<'_, u64>>::deserialize(ib)?;
    usize::try_from(n).map_err(|_| CodecError::LengthOverflow(n))
}

/// Reads a length-prefixed byte payload that aliases the input.
///
/// The buffer only advances if the whole payload is present.
fn read_bytes<'de>(ib: &mut InputBuffer<'de>) -> Result<&'de [u8]> {
    let mut peek = *ib;
    let len = read_len(&mut peek)?;
    let data = peek.data();
    peek.skip(len)?;
    *ib = peek;
    Ok(&data[..len])
}

impl<'de, E, T: SpsDeserialize<'de, E>> TrivialSequence<'de, E> for Vec<T> {
    type Element = T;

    fn reserve(&mut self, additional: usize) {
        Self::reserve(self, additional);
    }

    fn append(&mut self, element: T) -> Result<()> {
        self.push(element);
        Ok(())
    }
}

impl<'de, E, T: SpsDeserialize<'de, E>> TrivialSequence<'de, E> for VecDeque<T> {
    type Element = T;

    fn reserve(&mut self, additional: usize) {
        Self::reserve(self, additional);
    }

    fn append(&mut self, element: T) -> Result<()> {
        self.push_back(element);
        Ok(())
    }
}

impl<'de, KT, VT, K, V> TrivialSequence<'de, SpsTuple<(KT, VT)>> for BTreeMap<K, V>
where
    K: Ord,
    (K, V): SpsDeserialize<'de, SpsTuple<(KT, VT)>>,
{
    type Element = (K, V);

    fn reserve(&mut self, _additional: usize) {}

    fn append(&mut self, (k, v): (K, V)) -> Result<()> {
        match self.insert(k, v) {
            None => Ok(()),
            Some(_) => Err(CodecError::DuplicateKey),
        }
    }
}

impl<'de, KT, VT, K, V, S> TrivialSequence<'de, SpsTuple<(KT, VT)>> for HashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
    (K, V): SpsDeserialize<'de, SpsTuple<(KT, VT)>>,
{
    type Element = (K, V);

    fn reserve(&mut self, additional: usize) {
        HashMap::reserve(self, additional);
    }

    fn append(&mut self, (k, v): (K, V)) -> Result<()> {
        match self.insert(k, v) {
            None => Ok(()),
            Some(_) => Err(CodecError::DuplicateKey),
        }
    }
}

impl<E, T: SpsSerialize<E>> SpsSerialize<SpsSequence<E>> for [T] {
    fn size(&self) -> usize {
        sequence_size::<E, _>(self)
    }

    fn serialize(&self, ob: &mut OutputBuffer<'_>) -> Result<()> {
        serialize_sequence::<E, _>(ob, self.len(), self)
    }
}

impl<E, T: SpsSerialize<E>, const N: usize> SpsSerialize<SpsSequence<E>> for [T; N] {
    fn size(&self) -> usize {
        sequence_size::<E, _>(self)
    }

    fn serialize(&self, ob: &mut OutputBuffer<'_>) -> Result<()> {
        serialize_sequence::<E, _>(ob, N, self)
    }
}

impl<E, T: SpsSerialize<E>> SpsSerialize<SpsSequence<E>> for Vec<T> {
    fn size(&self) -> usize {
        sequence_size::<E, _>(self)
    }

    fn serialize(&self, ob: &mut OutputBuffer<'_>) -> Result<()> {
        serialize_sequence::<E, _>(ob, self.len(), self)
    }
}

impl<E, T: SpsSerialize<E>> SpsSerialize<SpsSequence<E>> for VecDeque<T> {
    fn size(&self) -> usize {
        sequence_size::<E, _>(self)
    }

    fn serialize(&self, ob: &mut OutputBuffer<'_>) -> Result<()> {
        serialize_sequence::<E, _>(ob, self.len(), self)
    }
}

impl<'de, E, T: SpsDeserialize<'de, E>> SpsDeserialize<'de, SpsSequence<E>> for Vec<T> {
    fn deserialize(ib: &mut InputBuffer<'de>) -> Result<Self> {
        deserialize_sequence::<E, _>(ib)
    }
}

impl<'de, E, T: SpsDeserialize<'de, E>> SpsDeserialize<'de, SpsSequence<E>> for VecDeque<T> {
    fn deserialize(ib: &mut InputBuffer<'de>) -> Result<Self> {
        deserialize_sequence::<E, _>(ib)
    }
}

impl<KT, VT, K, V> SpsSerialize<SpsSequence<SpsTuple<(KT, VT)>>> for BTreeMap<K, V>
where
    K: SpsSerialize<KT>,
    V: SpsSerialize<VT>,
{
    fn size(&self) -> usize {
        sequence_size::<SpsTuple<(KT, VT)>, _>(self.iter())
    }

    fn serialize(&self, ob: &mut OutputBuffer<'_>) -> Result<()> {
        serialize_sequence::<SpsTuple<(KT, VT)>, _>(ob, self.len(), self.iter())
    }
}

impl<'de, KT, VT, K, V> SpsDeserialize<'de, SpsSequence<SpsTuple<(KT, VT)>>> for BTreeMap<K, V>
where
    K: Ord,
    (K, V): SpsDeserialize<'de, SpsTuple<(KT, VT)>>,
{
    fn deserialize(ib: &mut InputBuffer<'de>) -> Result<Self> {
        deserialize_sequence::<SpsTuple<(KT, VT)>, _>(ib)
    }
}

impl<KT, VT, K, V, S> SpsSerialize<SpsSequence<SpsTuple<(KT, VT)>>> for HashMap<K, V, S>
where
    K: SpsSerialize<KT>,
    V: SpsSerialize<VT>,
{
    fn size(&self) -> usize {
        sequence_size::<SpsTuple<(KT, VT)>, _>(self.iter())
    }

    fn serialize(&self, ob: &mut OutputBuffer<'_>) -> Result<()> {
        serialize_sequence::<SpsTuple<(KT, VT)>, _>(ob, self.len(), self.iter())
    }
}

impl<'de, KT, VT, K, V, S> SpsDeserialize<'de, SpsSequence<SpsTuple<(KT, VT)>>>
    for HashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
    (K, V): SpsDeserialize<'de, SpsTuple<(KT, VT)>>,
{
    fn deserialize(ib: &mut InputBuffer<'de>) -> Result<Self> {
        deserialize_sequence::<SpsTuple<(KT, VT)>, _>(ib)
    }
}

impl SpsSerialize<SpsSequence<SpsChar>> for str {
    fn size(&self) -> usize {
        size_of::<u64>() + self.len()
    }

    fn serialize(&self, ob: &mut OutputBuffer<'_>) -> Result<()> {
        SpsSerialize::<u64>::serialize(&(self.len() as u64), ob)?;
        ob.write(self.as_bytes())
    }
}

impl SpsSerialize<SpsSequence<SpsChar>> for String {
    fn size(&self) -> usize {
        SpsSerialize::<SpsSequence<SpsChar>>::size(self.as_str())
    }

    fn serialize(&self, ob: &mut OutputBuffer<'_>) -> Result<()> {
        SpsSerialize::<SpsSequence<SpsChar>>::serialize(self.as_str(), ob)
    }
}

impl<'de> SpsDeserialize<'de, SpsSequence<SpsChar>> for String {
    fn deserialize(ib: &mut InputBuffer<'de>) -> Result<Self> {
        <&str as SpsDeserialize<'de, SpsSequence<SpsChar>>>::deserialize(ib).map(str::to_owned)
    }
}

/// Zero-copy string decode.
///
/// The returned `&str` points into the input buffer and lives as long as
/// the bytes being decoded.
impl<'de> SpsDeserialize<'de, SpsSequence<SpsChar>> for &'de str {
    fn deserialize(ib: &mut InputBuffer<'de>) -> Result<Self> {
        let mut peek = *ib;
        let bytes = read_bytes(&mut peek)?;
        let s = std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)?;
        *ib = peek;
        Ok(s)
    }
}

/// Borrowed `&[u8]` decodes for each listed byte-sized element tag.
macro_rules! borrowed_bytes {
    ($($tag:ty),*) => {
        $(
            /// Zero-copy byte decode; the slice aliases the input buffer.
            impl<'de> SpsDeserialize<'de, SpsSequence<$tag>> for &'de [u8] {
                fn deserialize(ib: &mut InputBuffer<'de>) -> Result<Self> {
                    read_bytes(ib)
                }
            }
        )*
    };
}

borrowed_bytes!(SpsChar, u8);
