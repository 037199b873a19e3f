//! Tuple codec and argument lists.
//!
//! A tuple is the concatenation of its elements' encodings in declaration
//! order. An argument list has exactly the same wire shape, so
//! [`SpsArgList`] is a thin façade over the tuple codec that also knows how
//! to produce a [`WrapperFunctionResult`].

use std::marker::PhantomData;

use crate::buffer::{InputBuffer, OutputBuffer};
use crate::codec::{SpsDeserialize, SpsSerialize};
use crate::error::Result;
use crate::result::WrapperFunctionResult;
use crate::tag::{SpsTagList, SpsTuple};

/// Concatenating tuple codecs for each listed arity.
macro_rules! tuple_codec {
    ($( ($($t:ident $v:ident $x:ident),*) ),* $(,)?) => {
        $(
            impl<$($t, $v: SpsSerialize<$t>),*> SpsSerialize<SpsTuple<($($t,)*)>> for ($($v,)*) {
                #[allow(unused_variables)]
                fn size(&self) -> usize {
                    let ($($x,)*) = self;
                    0 $(+ SpsSerialize::<$t>::size($x))*
                }

                #[allow(unused_variables)]
                fn serialize(&self, ob: &mut OutputBuffer<'_>) -> Result<()> {
                    let ($($x,)*) = self;
                    $(SpsSerialize::<$t>::serialize($x, ob)?;)*
                    Ok(())
                }
            }

            impl<'de, $($t, $v: SpsDeserialize<'de, $t>),*> SpsDeserialize<'de, SpsTuple<($($t,)*)>>
                for ($($v,)*)
            {
                #[allow(unused_variables)]
                fn deserialize(ib: &mut InputBuffer<'de>) -> Result<Self> {
                    Ok(($(<$v as SpsDeserialize<'de, $t>>::deserialize(ib)?,)*))
                }
            }
        )*
    };
}

tuple_codec!(
    (),
    (T1 V1 x1),
    (T1 V1 x1, T2 V2 x2),
    (T1 V1 x1, T2 V2 x2, T3 V3 x3),
    (T1 V1 x1, T2 V2 x2, T3 V3 x3, T4 V4 x4),
    (T1 V1 x1, T2 V2 x2, T3 V3 x3, T4 V4 x4, T5 V5 x5),
    (T1 V1 x1, T2 V2 x2, T3 V3 x3, T4 V4 x4, T5 V5 x5, T6 V6 x6),
    (T1 V1 x1, T2 V2 x2, T3 V3 x3, T4 V4 x4, T5 V5 x5, T6 V6 x6, T7 V7 x7),
    (T1 V1 x1, T2 V2 x2, T3 V3 x3, T4 V4 x4, T5 V5 x5, T6 V6 x6, T7 V7 x7, T8 V8 x8),
    (T1 V1 x1, T2 V2 x2, T3 V3 x3, T4 V4 x4, T5 V5 x5, T6 V6 x6, T7 V7 x7, T8 V8 x8, T9 V9 x9),
    (
        T1 V1 x1, T2 V2 x2, T3 V3 x3, T4 V4 x4, T5 V5 x5, T6 V6 x6, T7 V7 x7, T8 V8 x8,
        T9 V9 x9, T10 V10 x10
    ),
    (
        T1 V1 x1, T2 V2 x2, T3 V3 x3, T4 V4 x4, T5 V5 x5, T6 V6 x6, T7 V7 x7, T8 V8 x8,
        T9 V9 x9, T10 V10 x10, T11 V11 x11
    ),
    (
        T1 V1 x1, T2 V2 x2, T3 V3 x3, T4 V4 x4, T5 V5 x5, T6 V6 x6, T7 V7 x7, T8 V8 x8,
        T9 V9 x9, T10 V10 x10, T11 V11 x11, T12 V12 x12
    ),
);

/// Serializes and deserializes a list of values against a list of tags.
///
/// `Tags` is a Rust tuple of tags and the values are passed as a tuple of
/// the same arity: `SpsArgList::<(u32, SpsString)>::size(&(7u32, "x"))`.
/// Writing stops at the first element that fails.
#[derive(Debug)]
pub struct SpsArgList<Tags>(PhantomData<fn() -> Tags>);

impl<Tags: SpsTagList> SpsArgList<Tags> {
    /// Total encoded size of `args`.
    pub fn size<A>(args: &A) -> usize
    where
        A: SpsSerialize<SpsTuple<Tags>> + ?Sized,
    {
        args.size()
    }

    /// Writes each of `args` in order.
    pub fn serialize<A>(ob: &mut OutputBuffer<'_>, args: &A) -> Result<()>
    where
        A: SpsSerialize<SpsTuple<Tags>> + ?Sized,
    {
        args.serialize(ob)
    }

    /// Reads one value per tag, in order.
    pub fn deserialize<'de, A>(ib: &mut InputBuffer<'de>) -> Result<A>
    where
        A: SpsDeserialize<'de, SpsTuple<Tags>>,
    {
        A::deserialize(ib)
    }

    /// Decodes the whole argument list from `data`.
    pub fn from_buffer<'de, A>(data: &'de [u8]) -> Result<A>
    where
        A: SpsDeserialize<'de, SpsTuple<Tags>>,
    {
        Self::deserialize(&mut InputBuffer::new(data))
    }

    /// Encodes `args` into a freshly allocated result buffer.
    pub fn to_wrapper_function_result<A>(args: &A) -> Result<WrapperFunctionResult>
    where
        A: SpsSerialize<SpsTuple<Tags>> + ?Sized,
    {
        let mut result = WrapperFunctionResult::new();
        let size = Self::size(args);
        if size > 0 {
            let mut ob = OutputBuffer::new(result.allocate(size));
            Self::serialize(&mut ob, args)?;
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::to_vec;
    use crate::tag::{SpsSequence, SpsString};

    #[test]
    fn tuple_is_concatenation_of_fields() {
        let pair = (0xabcdu16, "ok".to_owned());
        let whole = to_vec::<SpsTuple<(u16, SpsString)>, _>(&pair).unwrap();
        let mut expected = to_vec::<u16, _>(&pair.0).unwrap();
        expected.extend(to_vec::<SpsString, _>(&pair.1).unwrap());
        assert_eq!(whole, expected);
    }

    #[test]
    fn empty_arg_list_is_zero_bytes() {
        assert_eq!(SpsArgList::<()>::size(&()), 0);
        let r = SpsArgList::<()>::to_wrapper_function_result(&()).unwrap();
        assert!(r.is_empty());
        let () = SpsArgList::<()>::from_buffer(&[]).unwrap();
    }

    #[test]
    fn arg_list_roundtrip_mixed_arity() {
        let args = (true, -5i64, vec![1u8, 2, 3], "tail".to_owned());
        type Tags = (bool, i64, SpsSequence<u8>, SpsString);
        let size = SpsArgList::<Tags>::size(&args);
        let r = SpsArgList::<Tags>::to_wrapper_function_result(&args).unwrap();
        assert_eq!(r.size(), size);

        let mut ib = InputBuffer::new(r.data());
        let back: (bool, i64, Vec<u8>, String) = SpsArgList::<Tags>::deserialize(&mut ib).unwrap();
        assert_eq!(back, args);
        assert_eq!(ib.remaining(), 0);
    }

    #[test]
    fn arg_list_accepts_borrowed_values() {
        let owned = (5u32, String::from("abc"));
        let borrowed = (5u32, "abc");
        assert_eq!(
            SpsArgList::<(u32, SpsString)>::to_wrapper_function_result(&owned)
                .unwrap()
                .data(),
            SpsArgList::<(u32, SpsString)>::to_wrapper_function_result(&borrowed)
                .unwrap()
                .data()
        );
    }

    #[test]
    fn twelve_element_list() {
        let args = (1u8, 2u8, 3u8, 4u8, 5u8, 6u8, 7u8, 8u8, 9u8, 10u8, 11u8, 12u8);
        type Tags = (u8, u8, u8, u8, u8, u8, u8, u8, u8, u8, u8, u8);
        let r = SpsArgList::<Tags>::to_wrapper_function_result(&args).unwrap();
        assert_eq!(r.data(), &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
        let back: (u8, u8, u8, u8, u8, u8, u8, u8, u8, u8, u8, u8) =
            SpsArgList::<Tags>::from_buffer(r.data()).unwrap();
        assert_eq!(back, args);
    }

    #[test]
    fn short_arg_buffer_fails() {
        let bytes = [1u8, 0, 0, 0];
        assert!(SpsArgList::<(u64,)>::from_buffer::<(u64,)>(&bytes).is_err());
    }
}
