//! Handler side: turns a local callable into `(arg bytes) -> result bytes`.

use sps::{SpsArgList, SpsDeserialize, SpsSerialize, SpsTuple, WrapperFunctionResult};

use crate::error::{DESERIALIZE_ARGS_ERROR, SERIALIZE_RESULT_ERROR};
use crate::wrapper::{Handler, SpsSignature, WrapperFunction};

impl<Sig: SpsSignature> WrapperFunction<Sig> {
    /// Decodes `arg_data` as `Sig`'s arguments, invokes `handler` with them,
    /// and encodes its return value.
    ///
    /// Argument types may borrow from `arg_data` (`&str`, `&[u8]`). If the
    /// arguments cannot be decoded the handler is not called and an
    /// out-of-band error result is returned instead.
    ///
    /// A handler returning `Result<(), E>` pairs with an `SpsError` return
    /// tag and one returning `Result<T, E>` with `SpsExpected<_>`; their
    /// errors travel in-band as `E`'s `Display` text.
    pub fn handle<'de, H, Args, R>(
        arg_data: &'de [u8],
        mut handler: H,
    ) -> WrapperFunctionResult
    where
        H: Handler<Args, R>,
        Args: SpsDeserialize<'de, SpsTuple<Sig::Args>>,
        R: SpsSerialize<Sig::Ret>,
    {
        Self::apply(arg_data, &mut handler)
    }

    /// Same as [`handle`](Self::handle) for a handler that outlives the call.
    pub(crate) fn apply<'de, H, Args, R>(
        arg_data: &'de [u8],
        handler: &mut H,
    ) -> WrapperFunctionResult
    where
        H: Handler<Args, R>,
        Args: SpsDeserialize<'de, SpsTuple<Sig::Args>>,
        R: SpsSerialize<Sig::Ret>,
    {
        let args: Args = match SpsArgList::<Sig::Args>::from_buffer(arg_data) {
            Ok(args) => args,
            Err(e) => {
                tracing::warn!(arg_len = arg_data.len(), error = %e, "{DESERIALIZE_ARGS_ERROR}");
                return WrapperFunctionResult::create_out_of_band_error(DESERIALIZE_ARGS_ERROR);
            }
        };
        serialize_result::<Sig::Ret, R>(&handler.invoke(args))
    }
}

/// Encodes a handler's return value under `Tag` into a fresh result buffer.
///
/// Encoding failures become an out-of-band error result.
pub fn serialize_result<Tag: sps::SpsTag, R: SpsSerialize<Tag>>(ret: &R) -> WrapperFunctionResult {
    match SpsArgList::<(Tag,)>::to_wrapper_function_result(&(ret,)) {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(error = %e, "{SERIALIZE_RESULT_ERROR}");
            WrapperFunctionResult::create_out_of_band_error(SERIALIZE_RESULT_ERROR)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use sps::{
        RemoteError, SerializableError, SpsError, SpsExpected, SpsMap, SpsString, from_bytes,
        to_vec,
    };

    use super::*;

    #[test]
    fn void_handler_returns_empty_result() {
        let r = WrapperFunction::<fn()>::handle(&[], || {});
        assert!(r.is_empty());
        assert!(r.out_of_band_error().is_none());
    }

    #[test]
    fn echo_u32_bytes() {
        let args = [0xef, 0xbe, 0xad, 0xde];
        let r = WrapperFunction::<fn(u32) -> u32>::handle(&args, |x: u32| x);
        assert_eq!(r.data(), &args);
    }

    #[test]
    fn string_reverse_bytes() {
        let args = [2, 0, 0, 0, 0, 0, 0, 0, 0x68, 0x69];
        let r = WrapperFunction::<fn(SpsString) -> SpsString>::handle(&args, |s: String| {
            s.chars().rev().collect::<String>()
        });
        assert_eq!(r.data(), &[2, 0, 0, 0, 0, 0, 0, 0, 0x69, 0x68]);
    }

    #[test]
    fn borrowed_argument_handler() {
        let args = to_vec::<SpsString, _>("borrowed").unwrap();
        let r = WrapperFunction::<fn(SpsString) -> u64>::handle(&args, |s: &str| s.len() as u64);
        assert_eq!(r.data(), &8u64.to_le_bytes());
    }

    #[test]
    fn map_handler_preserves_entries() {
        let mut m = BTreeMap::new();
        m.insert(1u32, "a".to_owned());
        m.insert(2u32, "bb".to_owned());
        let args = to_vec::<SpsMap<u32, SpsString>, _>(&m).unwrap();
        let r = WrapperFunction::<fn(SpsMap<u32, SpsString>) -> SpsMap<u32, SpsString>>::handle(
            &args,
            |m: BTreeMap<u32, String>| m,
        );
        assert_eq!(r.data(), args.as_slice());
        let back: BTreeMap<u32, String> = from_bytes::<SpsMap<u32, SpsString>, _>(r.data()).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn error_return_is_in_band() {
        let r = WrapperFunction::<fn() -> SpsError>::handle(&[], || -> Result<(), RemoteError> {
            Err(RemoteError::new("nope"))
        });
        assert_eq!(
            r.data(),
            &[1, 4, 0, 0, 0, 0, 0, 0, 0, b'n', b'o', b'p', b'e']
        );

        let ok = WrapperFunction::<fn() -> SpsError>::handle(&[], || SerializableError::Success);
        assert_eq!(ok.data(), &[0]);
    }

    #[test]
    fn expected_return_is_in_band() {
        let r = WrapperFunction::<fn(u8) -> SpsExpected<u8>>::handle(&[3], |x: u8| {
            x.checked_mul(100).ok_or_else(|| format!("{x} * 100 overflows"))
        });
        let back: Result<u8, RemoteError> = from_bytes::<SpsExpected<u8>, _>(r.data()).unwrap();
        assert_eq!(back.unwrap_err().message(), "3 * 100 overflows");

        let r = WrapperFunction::<fn(u8) -> SpsExpected<u8>>::handle(&[2], |x: u8| {
            x.checked_mul(100).ok_or_else(|| format!("{x} * 100 overflows"))
        });
        assert_eq!(r.data(), &[1, 200]);
    }

    #[test]
    fn short_arguments_give_out_of_band_error() {
        let r = WrapperFunction::<fn(u64) -> u64>::handle(&[1, 2, 3, 4], |x: u64| x);
        assert_eq!(r.out_of_band_error().unwrap().to_str().unwrap(), DESERIALIZE_ARGS_ERROR);
        assert_eq!(r.size(), 0);
    }

    #[test]
    fn unserializable_return_gives_out_of_band_error() {
        let r = WrapperFunction::<fn() -> SpsExpected<u32>>::handle(&[], || SerializableError::Success);
        assert_eq!(r.out_of_band_error().unwrap().to_str().unwrap(), SERIALIZE_RESULT_ERROR);
    }

    #[test]
    fn multi_argument_handler_and_method_adapter() {
        struct Accumulator {
            base: i64,
        }
        impl Accumulator {
            fn add(&self, a: i32, b: i64, negate: bool) -> i64 {
                let sum = self.base + i64::from(a) + b;
                if negate { -sum } else { sum }
            }
        }

        let acc = Accumulator { base: 10 };
        let args = SpsArgList::<(i32, i64, bool)>::to_wrapper_function_result(&(5i32, 7i64, true))
            .unwrap();
        let r = WrapperFunction::<fn(i32, i64, bool) -> i64>::handle(
            args.data(),
            |a: i32, b: i64, n: bool| acc.add(a, b, n),
        );
        assert_eq!(r.data(), &(-22i64).to_le_bytes());
    }

    #[test]
    fn mutable_method_handler() {
        struct Counter {
            total: u32,
        }
        impl Counter {
            fn bump(&mut self, by: u32) -> u32 {
                self.total += by;
                self.total
            }
        }

        let mut counter = Counter { total: 1 };
        let r = WrapperFunction::<fn(u32) -> u32>::handle(&[4, 0, 0, 0], |x: u32| counter.bump(x));
        assert_eq!(r.data(), &[5, 0, 0, 0]);
        assert_eq!(counter.total, 5);

        let mut calls = 0u8;
        let r = WrapperFunction::<fn() -> u8>::handle(&[], || {
            calls += 1;
            calls
        });
        assert_eq!(r.data(), &[1]);
    }
}
