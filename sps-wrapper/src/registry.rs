//! In-process table of wrapper functions keyed by [`FnTag`].

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use sps::{SpsDeserializeOwned, SpsSerialize, SpsTuple, WrapperFunctionResult};

use crate::dispatch::{Dispatch, FnTag};
use crate::wrapper::{Handler, SpsSignature, WrapperFunction};

/// A type-erased handler working on argument and result bytes.
type RawHandler = Box<dyn Fn(&[u8]) -> WrapperFunctionResult + Send + Sync>;

/// Maps tags to byte-level wrapper functions.
///
/// A registry is itself a [`Dispatch`], so it can back in-process calls,
/// the process-wide handles via [`install`](crate::install), or a stream
/// server.
#[derive(Default)]
pub struct Registry {
    /// Registered handlers by tag.
    handlers: HashMap<FnTag, RawHandler>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `tag` with signature `Sig`, replacing any
    /// previous entry.
    ///
    /// Registered handlers take owned arguments (`String`, `Vec<_>`). A
    /// handler may mutate captured state; calls to the same handler are
    /// serialized.
    pub fn register<Sig, H, Args, R>(&mut self, tag: FnTag, handler: H) -> &mut Self
    where
        Sig: SpsSignature,
        H: Handler<Args, R> + Send + 'static,
        Args: SpsDeserializeOwned<SpsTuple<Sig::Args>> + 'static,
        R: SpsSerialize<Sig::Ret> + 'static,
    {
        let cell = Mutex::new(handler);
        self.register_raw(tag, move |args: &[u8]| {
            // A handler that panicked keeps whatever state it reached.
            let mut guard = cell.lock().unwrap_or_else(PoisonError::into_inner);
            WrapperFunction::<Sig>::apply::<H, Args, R>(args, &mut *guard)
        })
    }

    /// Registers a byte-level handler under `tag`.
    pub fn register_raw<F>(&mut self, tag: FnTag, f: F) -> &mut Self
    where
        F: Fn(&[u8]) -> WrapperFunctionResult + Send + Sync + 'static,
    {
        if self.handlers.insert(tag, Box::new(f)).is_some() {
            tracing::debug!(%tag, "replaced wrapper function");
        }
        self
    }

    /// Returns `true` if a handler is registered under `tag`.
    pub fn contains(&self, tag: FnTag) -> bool {
        self.handlers.contains_key(&tag)
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Dispatch for Registry {
    fn dispatch(&self, tag: FnTag, args: &[u8]) -> WrapperFunctionResult {
        match self.handlers.get(&tag) {
            Some(f) => {
                let result = f(args);
                if let Some(msg) = result.out_of_band_error() {
                    tracing::warn!(%tag, error = %msg.to_string_lossy(), "wrapper function failed");
                }
                result
            }
            None => {
                tracing::warn!(%tag, "unknown wrapper function");
                WrapperFunctionResult::create_out_of_band_error(format!(
                    "no wrapper function registered for tag {tag}"
                ))
            }
        }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<_> = self.handlers.keys().collect();
        tags.sort();
        f.debug_struct("Registry").field("tags", &tags).finish()
    }
}

#[cfg(test)]
mod tests {
    use sps::SpsString;

    use super::*;

    #[test]
    fn register_and_dispatch() {
        let mut reg = Registry::new();
        assert!(reg.is_empty());
        reg.register::<fn(u32, u32) -> u32, _, _, _>(FnTag(1), |a: u32, b: u32| a + b)
            .register::<fn(SpsString) -> u64, _, _, _>(FnTag(2), |s: String| s.len() as u64);
        assert_eq!(reg.len(), 2);
        assert!(reg.contains(FnTag(1)));
        assert!(!reg.contains(FnTag(3)));

        let r = reg.dispatch(FnTag(1), &[2, 0, 0, 0, 3, 0, 0, 0]);
        assert_eq!(r.data(), &[5, 0, 0, 0]);
    }

    #[test]
    fn raw_handlers_see_bytes() {
        let mut reg = Registry::new();
        reg.register_raw(FnTag(7), |args: &[u8]| {
            WrapperFunctionResult::copy_from(&[args.len() as u8])
        });
        assert_eq!(reg.dispatch(FnTag(7), &[0; 9]).data(), &[9]);
    }

    #[test]
    fn stateful_handler_keeps_state_between_calls() {
        let mut reg = Registry::new();
        let mut seen = Vec::new();
        reg.register::<fn(u8) -> u64, _, _, _>(FnTag(1), move |x: u8| {
            seen.push(x);
            seen.len() as u64
        });
        assert_eq!(reg.dispatch(FnTag(1), &[7]).data(), &1u64.to_le_bytes());
        assert_eq!(reg.dispatch(FnTag(1), &[8]).data(), &2u64.to_le_bytes());
    }

    #[test]
    fn later_registration_replaces() {
        let mut reg = Registry::new();
        reg.register::<fn() -> u8, _, _, _>(FnTag(1), || 1u8);
        reg.register::<fn() -> u8, _, _, _>(FnTag(1), || 2u8);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.dispatch(FnTag(1), &[]).data(), &[2]);
    }

    #[test]
    fn unknown_tag_gives_out_of_band_error() {
        let reg = Registry::new();
        let r = reg.dispatch(FnTag(0x2a), &[]);
        assert_eq!(
            r.out_of_band_error().unwrap().to_str().unwrap(),
            "no wrapper function registered for tag 0x2a"
        );
    }

    #[test]
    fn debug_lists_tags() {
        let mut reg = Registry::new();
        reg.register_raw(FnTag(2), |_: &[u8]| WrapperFunctionResult::new());
        reg.register_raw(FnTag(1), |_: &[u8]| WrapperFunctionResult::new());
        assert_eq!(format!("{reg:?}"), "Registry { tags: [FnTag(1), FnTag(2)] }");
    }
}
