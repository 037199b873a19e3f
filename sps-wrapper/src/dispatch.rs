//! The dispatch seam and the process-wide dispatch handles.
//!
//! A caller hands encoded argument bytes to a dispatcher together with the
//! target function's tag and gets result bytes back. How the bytes travel
//! (in-process table, socket, JIT controller) is up to the dispatcher.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, OnceLock};

use sps::WrapperFunctionResult;

use crate::error::{Error, Result};

/// Identifies a wrapper function on the far side of a dispatcher.
///
/// For in-process JIT use this is the target's address; over a stream
/// transport it is whatever key the server registered the handler under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(clippy::exhaustive_structs)]
pub struct FnTag(pub u64);

impl fmt::Display for FnTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl From<u64> for FnTag {
    fn from(tag: u64) -> Self {
        Self(tag)
    }
}

/// Conveys argument bytes to a wrapper function and returns its result.
///
/// Implementations report transport failures as out-of-band error results.
pub trait Dispatch {
    /// Runs the wrapper function identified by `tag` on `args`.
    fn dispatch(&self, tag: FnTag, args: &[u8]) -> WrapperFunctionResult;
}

impl<D: Dispatch + ?Sized> Dispatch for &D {
    fn dispatch(&self, tag: FnTag, args: &[u8]) -> WrapperFunctionResult {
        (**self).dispatch(tag, args)
    }
}

impl<D: Dispatch + ?Sized> Dispatch for Arc<D> {
    fn dispatch(&self, tag: FnTag, args: &[u8]) -> WrapperFunctionResult {
        (**self).dispatch(tag, args)
    }
}

/// Opaque context passed back to the dispatch function on every call.
pub type DispatchContext = Arc<dyn Any + Send + Sync>;

/// Process-wide dispatch entry point.
pub type DispatchFn = fn(&(dyn Any + Send + Sync), FnTag, &[u8]) -> WrapperFunctionResult;

/// Context handed to [`DISPATCH_FN`] on every global call.
static DISPATCH_CTX: OnceLock<DispatchContext> = OnceLock::new();
/// Entry point used by global calls.
static DISPATCH_FN: OnceLock<DispatchFn> = OnceLock::new();

/// Sets the process-wide dispatch context. May succeed only once.
pub fn set_dispatch_context(ctx: DispatchContext) -> Result<()> {
    DISPATCH_CTX
        .set(ctx)
        .map_err(|_| Error::DispatchContextAlreadySet)
}

/// Sets the process-wide dispatch function. May succeed only once.
pub fn set_dispatch_function(f: DispatchFn) -> Result<()> {
    DISPATCH_FN
        .set(f)
        .map_err(|_| Error::DispatchFunctionAlreadySet)
}

/// Installs `dispatcher` as both the process-wide context and function.
///
/// Nothing is set if the function was already set. Concurrent setup of the
/// two handles from other threads can still leave only the context set.
pub fn install<D: Dispatch + Send + Sync + 'static>(dispatcher: D) -> Result<()> {
    if DISPATCH_FN.get().is_some() {
        return Err(Error::DispatchFunctionAlreadySet);
    }
    set_dispatch_context(Arc::new(dispatcher))?;
    set_dispatch_function(trampoline::<D>)
}

/// Downcasts the context to `D` and forwards the call.
fn trampoline<D: Dispatch + 'static>(
    ctx: &(dyn Any + Send + Sync),
    tag: FnTag,
    args: &[u8],
) -> WrapperFunctionResult {
    match ctx.downcast_ref::<D>() {
        Some(d) => d.dispatch(tag, args),
        None => WrapperFunctionResult::create_out_of_band_error(
            "dispatch context does not match the installed dispatch function",
        ),
    }
}

/// The configured global handles, checked independently.
#[derive(Clone, Copy)]
pub(crate) struct GlobalDispatch {
    /// The installed context.
    ctx: &'static DispatchContext,
    /// The installed function.
    f: DispatchFn,
}

impl GlobalDispatch {
    /// Reads both process-wide handles.
    pub(crate) fn get() -> Result<Self> {
        Self::resolve(DISPATCH_CTX.get(), DISPATCH_FN.get().copied())
    }

    /// Checks the context first, then the function.
    const fn resolve(
        context: Option<&'static DispatchContext>,
        function: Option<DispatchFn>,
    ) -> Result<Self> {
        match (context, function) {
            (None, _) => Err(Error::DispatchContextNotSet),
            (Some(_), None) => Err(Error::DispatchFunctionNotSet),
            (Some(ctx), Some(f)) => Ok(Self { ctx, f }),
        }
    }
}

impl Dispatch for GlobalDispatch {
    fn dispatch(&self, tag: FnTag, args: &[u8]) -> WrapperFunctionResult {
        (self.f)(&**self.ctx, tag, args)
    }
}

impl fmt::Debug for GlobalDispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalDispatch").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl Dispatch for Echo {
        fn dispatch(&self, _tag: FnTag, args: &[u8]) -> WrapperFunctionResult {
            WrapperFunctionResult::copy_from(args)
        }
    }

    #[test]
    fn tag_displays_as_hex() {
        assert_eq!(FnTag(0x1000).to_string(), "0x1000");
        assert_eq!(FnTag::from(7), FnTag(7));
    }

    #[test]
    fn trampoline_downcasts_context() {
        let ctx: DispatchContext = Arc::new(Echo);
        let r = trampoline::<Echo>(&*ctx, FnTag(1), &[1, 2, 3]);
        assert_eq!(r.data(), &[1, 2, 3]);
    }

    #[test]
    fn trampoline_rejects_foreign_context() {
        let ctx: DispatchContext = Arc::new(42u32);
        let r = trampoline::<Echo>(&*ctx, FnTag(1), &[1]);
        assert!(r.out_of_band_error().is_some());
    }

    fn echo_fn(ctx: &(dyn Any + Send + Sync), tag: FnTag, args: &[u8]) -> WrapperFunctionResult {
        trampoline::<Echo>(ctx, tag, args)
    }

    #[test]
    fn each_handle_is_guarded() {
        static CTX: OnceLock<DispatchContext> = OnceLock::new();
        let ctx = CTX.get_or_init(|| Arc::new(Echo));
        let f: DispatchFn = echo_fn;

        assert!(matches!(
            GlobalDispatch::resolve(None, None),
            Err(Error::DispatchContextNotSet)
        ));
        assert!(matches!(
            GlobalDispatch::resolve(None, Some(f)),
            Err(Error::DispatchContextNotSet)
        ));
        assert!(matches!(
            GlobalDispatch::resolve(Some(ctx), None),
            Err(Error::DispatchFunctionNotSet)
        ));

        let global = GlobalDispatch::resolve(Some(ctx), Some(f)).unwrap();
        assert_eq!(global.dispatch(FnTag(3), &[4, 5]).data(), &[4, 5]);
    }

    #[test]
    fn references_and_arcs_dispatch() {
        let shared = Arc::new(Echo);
        assert_eq!(shared.dispatch(FnTag(0), &[9]).data(), &[9]);
        assert_eq!((&Echo).dispatch(FnTag(0), &[8]).data(), &[8]);
    }
}
