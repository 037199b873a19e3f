//! Typed wrapper-function calls over an opaque byte dispatch.
//!
//! A *wrapper function* has the byte-level shape
//! `(argument bytes) -> result bytes`. This crate adapts ordinary Rust
//! callables to that shape on the handler side and turns typed calls into
//! it on the caller side, using the [`sps`] codec selected by a signature
//! such as `fn(SpsString, u32) -> SpsExpected<u64>`.
//!
//! Failures travel on two channels:
//!
//! - **in-band**: an `SpsError` or `SpsExpected<_>` return value decodes
//!   into the caller's `Result<_, E>`;
//! - **out-of-band**: argument or transport failures arrive as an
//!   [`Error`], never as a value.
//!
//! ```
//! use sps::SpsString;
//! use sps_wrapper::{FnTag, Registry, WrapperFunction};
//!
//! let mut registry = Registry::new();
//! registry.register::<fn(SpsString) -> u64, _, _, _>(FnTag(1), |s: String| s.len() as u64);
//!
//! let n: u64 = WrapperFunction::<fn(SpsString) -> u64>::call_with(&registry, FnTag(1), ("four",))
//!     .unwrap();
//! assert_eq!(n, 4);
//! ```

mod caller;
mod dispatch;
mod error;
mod handler;
mod registry;
mod transport;
mod wrapper;

pub use dispatch::{
    Dispatch, DispatchContext, DispatchFn, FnTag, install, set_dispatch_context,
    set_dispatch_function,
};
pub use error::{DESERIALIZE_ARGS_ERROR, Error, Result, SERIALIZE_RESULT_ERROR};
pub use handler::serialize_result;
pub use registry::Registry;
#[cfg(unix)]
pub use transport::serve_unix;
pub use transport::{Session, StreamClient, serve_connection};
pub use wrapper::{Handler, SpsSignature, WrapperFunction};
