//! Caller side: encode arguments, dispatch them, decode the reply.

use sps::{SpsArgList, SpsDeserializeOwned, SpsSerialize, SpsTuple, from_bytes};

use crate::dispatch::{Dispatch, FnTag, GlobalDispatch};
use crate::error::{Error, Result};
use crate::wrapper::{SpsSignature, WrapperFunction};

impl<Sig: SpsSignature> WrapperFunction<Sig> {
    /// Calls the wrapper function `tag` through the process-wide dispatch
    /// handles.
    ///
    /// Fails with [`Error::DispatchContextNotSet`] or
    /// [`Error::DispatchFunctionNotSet`] if either handle is missing; nothing
    /// is encoded in that case.
    pub fn call<R, A>(tag: FnTag, args: A) -> Result<R>
    where
        A: SpsSerialize<SpsTuple<Sig::Args>>,
        R: SpsDeserializeOwned<Sig::Ret>,
    {
        let dispatcher = GlobalDispatch::get()?;
        Self::call_with(&dispatcher, tag, args)
    }

    /// Calls the wrapper function `tag` through `dispatcher`.
    ///
    /// Out-of-band errors from the dispatcher surface as
    /// [`Error::OutOfBand`]. In-band errors are part of `R`: with an
    /// `SpsError` or `SpsExpected<_>` return tag, use `Result<_, E>` for `R`
    /// and the outer `Result` reports only transport and codec failures.
    pub fn call_with<D, R, A>(dispatcher: &D, tag: FnTag, args: A) -> Result<R>
    where
        D: Dispatch + ?Sized,
        A: SpsSerialize<SpsTuple<Sig::Args>>,
        R: SpsDeserializeOwned<Sig::Ret>,
    {
        let arg_buf = SpsArgList::<Sig::Args>::to_wrapper_function_result(&args)
            .map_err(Error::SerializeArguments)?;

        let result = dispatcher.dispatch(tag, arg_buf.data());
        tracing::debug!(
            %tag,
            arg_len = arg_buf.size(),
            result_len = result.size(),
            "wrapper function call"
        );

        if let Some(msg) = result.out_of_band_error() {
            return Err(Error::OutOfBand(msg.to_string_lossy().into_owned()));
        }
        from_bytes::<Sig::Ret, R>(result.data()).map_err(Error::DeserializeResult)
    }
}
