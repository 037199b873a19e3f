//! Owning wrapper-function result buffer.
//!
//! [`WrapperFunctionResult`] owns one [`CWrapperFunctionResult`] handle and
//! disposes it on drop. It is move-only: two instances never share storage.
//! A result is in one of three states: empty, holding data, or carrying an
//! out-of-band error message.

#![allow(unsafe_code)]

use std::ffi::{CStr, CString, c_char};

use crate::ffi::{self, CWrapperFunctionResult};

/// An owned result buffer returned from (or passed to) a wrapper function.
pub struct WrapperFunctionResult {
    /// The owned handle.
    raw: CWrapperFunctionResult,
}

// SAFETY: the handle exclusively owns its storage; nothing else aliases it.
unsafe impl Send for WrapperFunctionResult {}

impl WrapperFunctionResult {
    /// Creates an empty result.
    pub const fn new() -> Self {
        Self {
            raw: CWrapperFunctionResult::EMPTY,
        }
    }

    /// Takes ownership of a raw handle; it will be disposed on drop.
    ///
    /// # Safety
    ///
    /// `raw` must be an initialized handle that owns its storage and is not
    /// owned by anything else.
    pub const unsafe fn from_raw(raw: CWrapperFunctionResult) -> Self {
        Self { raw }
    }

    /// Gives up ownership of the handle, leaving `self` empty.
    ///
    /// The caller becomes responsible for disposing the returned handle.
    #[must_use = "the released handle leaks unless disposed"]
    pub const fn release(&mut self) -> CWrapperFunctionResult {
        std::mem::replace(&mut self.raw, CWrapperFunctionResult::EMPTY)
    }

    /// Consumes `self` and returns the raw handle without disposing it.
    #[must_use = "the released handle leaks unless disposed"]
    pub fn into_raw(mut self) -> CWrapperFunctionResult {
        self.release()
    }

    /// Replaces the contents with `size` zeroed bytes and returns them for
    /// writing.
    pub fn allocate(&mut self, size: usize) -> &mut [u8] {
        // SAFETY: `self.raw` is initialized and owned; it is disposed before
        // being reinitialized, and the returned region is `size` bytes long
        // and zeroed (inline storage is zeroed by the empty state).
        unsafe {
            ffi::sps_dispose_cwrapper_function_result(&raw mut self.raw);
            let p = ffi::sps_cwrapper_function_result_allocate(&raw mut self.raw, size);
            if size == 0 {
                return &mut [];
            }
            std::slice::from_raw_parts_mut(p.cast::<u8>(), size)
        }
    }

    /// Creates a result holding a copy of `bytes`.
    pub fn copy_from(bytes: &[u8]) -> Self {
        // SAFETY: `bytes` is valid for `bytes.len()` reads.
        unsafe {
            Self::from_raw(ffi::sps_create_cwrapper_function_result_from_range(
                bytes.as_ptr().cast(),
                bytes.len(),
            ))
        }
    }

    /// Creates a result holding a copy of `s` including its NUL terminator.
    pub fn copy_from_c_str(s: &CStr) -> Self {
        // SAFETY: `s` is NUL-terminated.
        unsafe { Self::from_raw(ffi::sps_create_cwrapper_function_result_from_string(s.as_ptr())) }
    }

    /// Creates a result holding `s` followed by a NUL terminator.
    pub fn copy_from_str(s: &str) -> Self {
        let mut r = Self::new();
        let buf = r.allocate(s.len() + 1);
        buf[..s.len()].copy_from_slice(s.as_bytes());
        r
    }

    /// Creates an out-of-band error result carrying `msg`.
    ///
    /// The message is cut at its first NUL byte, if any.
    pub fn create_out_of_band_error(msg: impl AsRef<str>) -> Self {
        let text = msg.as_ref();
        let end = text.find('\0').unwrap_or(text.len());
        let c = CString::new(&text[..end]).unwrap_or_default();
        // SAFETY: `c` is NUL-terminated.
        unsafe {
            Self::from_raw(ffi::sps_create_cwrapper_function_result_from_out_of_band_error(
                c.as_ptr(),
            ))
        }
    }

    /// The payload bytes. Empty for empty and out-of-band error results.
    pub const fn data(&self) -> &[u8] {
        let size = self.size();
        if size == 0 {
            return &[];
        }
        // SAFETY: a non-zero size means the data pointer covers `size`
        // initialized bytes owned by `self.raw`.
        unsafe {
            let p: *const c_char = ffi::sps_cwrapper_function_result_data(&raw const self.raw);
            std::slice::from_raw_parts(p.cast::<u8>(), size)
        }
    }

    /// Payload length in bytes.
    pub const fn size(&self) -> usize {
        self.raw.size
    }

    /// Returns `true` if this is a default-constructed (empty) result.
    pub const fn is_empty(&self) -> bool {
        // SAFETY: `self.raw` is always initialized.
        unsafe { ffi::sps_cwrapper_function_result_empty(&raw const self.raw) }
    }

    /// The out-of-band error message, if this result carries one.
    pub fn out_of_band_error(&self) -> Option<&CStr> {
        // SAFETY: a non-null error pointer refers to a NUL-terminated message
        // owned by `self.raw`.
        unsafe {
            let p = ffi::sps_cwrapper_function_result_get_out_of_band_error(&raw const self.raw);
            (!p.is_null()).then(|| CStr::from_ptr(p))
        }
    }
}

impl Default for WrapperFunctionResult {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for WrapperFunctionResult {
    fn drop(&mut self) {
        // SAFETY: `self.raw` is initialized and exclusively owned.
        unsafe { ffi::sps_dispose_cwrapper_function_result(&raw mut self.raw) };
    }
}

impl std::fmt::Debug for WrapperFunctionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.out_of_band_error() {
            Some(msg) => f
                .debug_tuple("WrapperFunctionResult::OutOfBandError")
                .field(&msg)
                .finish(),
            None => f
                .debug_struct("WrapperFunctionResult")
                .field("size", &self.size())
                .finish(),
        }
    }
}

impl From<&[u8]> for WrapperFunctionResult {
    fn from(bytes: &[u8]) -> Self {
        Self::copy_from(bytes)
    }
}
