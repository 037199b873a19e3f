//! Wrapper-function signatures and handler shapes.

use std::marker::PhantomData;

use sps::{SpsTag, SpsTagList};

/// A wrapper-function signature expressed as a function-pointer type over
/// tags, e.g. `fn(SpsString, u32) -> SpsExpected<u64>`.
///
/// `fn(..)` without a return type is the `void` form: the handler returns
/// `()` and the result buffer is empty.
pub trait SpsSignature: 'static {
    /// Tag of the return value.
    type Ret: SpsTag;
    /// Tags of the arguments, as a tuple.
    type Args: SpsTagList;
}

/// A callable that accepts an argument tuple `Args` and returns `R`.
///
/// Implemented for every `FnMut` of up to twelve arguments, which covers
/// free functions, function pointers and closures. Methods are adapted with
/// a closure such as `|x: u32| obj.method(x)`; the receiver may be borrowed
/// mutably.
pub trait Handler<Args, R> {
    /// Calls the handler with the arguments spread positionally.
    fn invoke(&mut self, args: Args) -> R;
}

/// Implements [`SpsSignature`] and [`Handler`] for each listed arity.
macro_rules! arities {
    ($( ($($t:ident $a:ident $x:ident),*) ),* $(,)?) => {
        $(
            impl<R: SpsTag, $($t: SpsTag),*> SpsSignature for fn($($t),*) -> R {
                type Ret = R;
                type Args = ($($t,)*);
            }

            impl<F, R, $($a),*> Handler<($($a,)*), R> for F
            where
                F: FnMut($($a),*) -> R,
            {
                fn invoke(&mut self, ($($x,)*): ($($a,)*)) -> R {
                    self($($x),*)
                }
            }
        )*
    };
}

arities!(
    (),
    (T1 A1 x1),
    (T1 A1 x1, T2 A2 x2),
    (T1 A1 x1, T2 A2 x2, T3 A3 x3),
    (T1 A1 x1, T2 A2 x2, T3 A3 x3, T4 A4 x4),
    (T1 A1 x1, T2 A2 x2, T3 A3 x3, T4 A4 x4, T5 A5 x5),
    (T1 A1 x1, T2 A2 x2, T3 A3 x3, T4 A4 x4, T5 A5 x5, T6 A6 x6),
    (T1 A1 x1, T2 A2 x2, T3 A3 x3, T4 A4 x4, T5 A5 x5, T6 A6 x6, T7 A7 x7),
    (T1 A1 x1, T2 A2 x2, T3 A3 x3, T4 A4 x4, T5 A5 x5, T6 A6 x6, T7 A7 x7, T8 A8 x8),
    (T1 A1 x1, T2 A2 x2, T3 A3 x3, T4 A4 x4, T5 A5 x5, T6 A6 x6, T7 A7 x7, T8 A8 x8, T9 A9 x9),
    (
        T1 A1 x1, T2 A2 x2, T3 A3 x3, T4 A4 x4, T5 A5 x5, T6 A6 x6, T7 A7 x7, T8 A8 x8,
        T9 A9 x9, T10 A10 x10
    ),
    (
        T1 A1 x1, T2 A2 x2, T3 A3 x3, T4 A4 x4, T5 A5 x5, T6 A6 x6, T7 A7 x7, T8 A8 x8,
        T9 A9 x9, T10 A10 x10, T11 A11 x11
    ),
    (
        T1 A1 x1, T2 A2 x2, T3 A3 x3, T4 A4 x4, T5 A5 x5, T6 A6 x6, T7 A7 x7, T8 A8 x8,
        T9 A9 x9, T10 A10 x10, T11 A11 x11, T12 A12 x12
    ),
);

/// Typed entry points for a wrapper function with signature `Sig`.
///
/// [`handle`](Self::handle) adapts a local callable to the
/// `(arg bytes) -> result bytes` convention; [`call`](Self::call) and
/// [`call_with`](Self::call_with) encode arguments, dispatch them, and decode
/// the reply.
#[derive(Debug)]
pub struct WrapperFunction<Sig>(PhantomData<fn() -> Sig>);
