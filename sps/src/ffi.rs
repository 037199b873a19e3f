//! C-style result-handle API.
//!
//! A [`CWrapperFunctionResult`] is the plain-old-data form of a result
//! buffer as it crosses a C ABI boundary. Payloads no larger than a pointer
//! are stored inline; larger ones live in a `malloc`ed region. An
//! out-of-band error is encoded as `size == 0` with a non-null pointer to a
//! NUL-terminated message. Every function here is exported unmangled so a
//! transport written in another language can create and dispose handles.

#![allow(unsafe_code)]

use std::ffi::{CStr, c_char};
use std::ptr;

/// Inline storage or heap pointer, discriminated by the handle's `size`.
#[repr(C)]
#[derive(Clone, Copy)]
pub union CWrapperFunctionResultData {
    /// Heap payload (or out-of-band message) when not stored inline.
    pub value_ptr: *mut c_char,
    /// Inline payload for sizes up to `size_of::<*mut c_char>()`.
    pub value: [c_char; size_of::<*mut c_char>()],
}

impl std::fmt::Debug for CWrapperFunctionResultData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The active field depends on the owning handle's size.
        f.debug_struct("CWrapperFunctionResultData").finish_non_exhaustive()
    }
}

/// Raw result handle.
#[repr(C)]
#[derive(Clone, Copy)]
#[allow(clippy::exhaustive_structs)]
pub struct CWrapperFunctionResult {
    /// Payload storage.
    pub data: CWrapperFunctionResultData,
    /// Payload length in bytes; zero for empty and out-of-band error handles.
    pub size: usize,
}

impl std::fmt::Debug for CWrapperFunctionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // SAFETY: both union fields are plain data of the same size.
        let ptr = unsafe { self.data.value_ptr };
        f.debug_struct("CWrapperFunctionResult")
            .field("size", &self.size)
            .field("inline", &is_inline(self.size))
            .field("ptr", &ptr)
            .finish()
    }
}

impl CWrapperFunctionResult {
    /// An empty handle.
    pub const EMPTY: Self = Self {
        data: CWrapperFunctionResultData {
            value_ptr: ptr::null_mut(),
        },
        size: 0,
    };
}

/// Whether a payload of `size` bytes lives in the inline storage.
const fn is_inline(size: usize) -> bool {
    size <= size_of::<*mut c_char>()
}

/// `malloc`, aborting through the global allocation error handler on null.
fn malloc_or_abort(size: usize) -> *mut c_char {
    // SAFETY: malloc has no preconditions; a null return is handled below.
    let p = unsafe { libc::malloc(size) }.cast::<c_char>();
    if p.is_null() {
        std::alloc::handle_alloc_error(std::alloc::Layout::array::<u8>(size).unwrap_or(
            std::alloc::Layout::new::<u8>(),
        ));
    }
    p
}

/// Initializes `r` to the empty state.
///
/// # Safety
///
/// `r` must be valid for writes.
#[unsafe(no_mangle)]
pub const unsafe extern "C" fn sps_cwrapper_function_result_init(r: *mut CWrapperFunctionResult) {
    // SAFETY: caller guarantees `r` is writable.
    unsafe { r.write(CWrapperFunctionResult::EMPTY) };
}

/// Sets `r` to hold `size` zeroed bytes and returns a pointer to them.
///
/// Any previous contents of `r` are overwritten without being disposed.
///
/// # Safety
///
/// `r` must be valid for writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sps_cwrapper_function_result_allocate(
    r: *mut CWrapperFunctionResult,
    size: usize,
) -> *mut c_char {
    // SAFETY: caller guarantees `r` is writable; inline storage is part of `*r`.
    unsafe {
        (*r).size = size;
        if is_inline(size) {
            (*r).data.value_ptr = ptr::null_mut();
            return ptr::addr_of_mut!((*r).data.value).cast();
        }
        let p = malloc_or_abort(size);
        ptr::write_bytes(p, 0, size);
        (*r).data.value_ptr = p;
        p
    }
}

/// Creates a handle holding a copy of `size` bytes at `data`.
///
/// # Safety
///
/// `data` must be valid for reads of `size` bytes (it may be null when
/// `size` is zero).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sps_create_cwrapper_function_result_from_range(
    data: *const c_char,
    size: usize,
) -> CWrapperFunctionResult {
    let mut r = CWrapperFunctionResult::EMPTY;
    if size == 0 {
        return r;
    }
    // SAFETY: `r` is a local; caller guarantees `data` covers `size` bytes.
    unsafe {
        let dst = sps_cwrapper_function_result_allocate(&raw mut r, size);
        ptr::copy_nonoverlapping(data, dst, size);
    }
    r
}

/// Creates a handle holding a copy of `s` including its NUL terminator.
///
/// # Safety
///
/// `s` must point to a NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sps_create_cwrapper_function_result_from_string(
    s: *const c_char,
) -> CWrapperFunctionResult {
    // SAFETY: caller guarantees `s` is NUL-terminated.
    unsafe {
        let len = CStr::from_ptr(s).to_bytes_with_nul().len();
        sps_create_cwrapper_function_result_from_range(s, len)
    }
}

/// Creates an out-of-band error handle carrying a copy of `msg`.
///
/// # Safety
///
/// `msg` must point to a NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sps_create_cwrapper_function_result_from_out_of_band_error(
    msg: *const c_char,
) -> CWrapperFunctionResult {
    // SAFETY: caller guarantees `msg` is NUL-terminated; the copy is sized to match.
    unsafe {
        let len = CStr::from_ptr(msg).to_bytes_with_nul().len();
        let p = malloc_or_abort(len);
        ptr::copy_nonoverlapping(msg, p, len);
        CWrapperFunctionResult {
            data: CWrapperFunctionResultData { value_ptr: p },
            size: 0,
        }
    }
}

/// Pointer to the payload of `r`.
///
/// # Safety
///
/// `r` must point to an initialized handle.
#[unsafe(no_mangle)]
pub const unsafe extern "C" fn sps_cwrapper_function_result_data(
    r: *const CWrapperFunctionResult,
) -> *const c_char {
    // SAFETY: caller guarantees `r` is initialized.
    unsafe {
        if is_inline((*r).size) {
            ptr::addr_of!((*r).data.value).cast()
        } else {
            (*r).data.value_ptr
        }
    }
}

/// Payload length of `r`.
///
/// # Safety
///
/// `r` must point to an initialized handle.
#[unsafe(no_mangle)]
pub const unsafe extern "C" fn sps_cwrapper_function_result_size(
    r: *const CWrapperFunctionResult,
) -> usize {
    // SAFETY: caller guarantees `r` is initialized.
    unsafe { (*r).size }
}

/// Returns `true` if `r` is in the empty state.
///
/// # Safety
///
/// `r` must point to an initialized handle.
#[unsafe(no_mangle)]
pub const unsafe extern "C" fn sps_cwrapper_function_result_empty(
    r: *const CWrapperFunctionResult,
) -> bool {
    // SAFETY: caller guarantees `r` is initialized.
    unsafe { (*r).size == 0 && (*r).data.value_ptr.is_null() }
}

/// The out-of-band error message of `r`, or null if `r` is not an error.
///
/// # Safety
///
/// `r` must point to an initialized handle.
#[unsafe(no_mangle)]
pub const unsafe extern "C" fn sps_cwrapper_function_result_get_out_of_band_error(
    r: *const CWrapperFunctionResult,
) -> *const c_char {
    // SAFETY: caller guarantees `r` is initialized.
    unsafe {
        if (*r).size == 0 {
            (*r).data.value_ptr
        } else {
            ptr::null()
        }
    }
}

/// Releases any heap storage owned by `r` and resets it to empty.
///
/// # Safety
///
/// `r` must point to an initialized handle that owns its storage.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sps_dispose_cwrapper_function_result(r: *mut CWrapperFunctionResult) {
    // SAFETY: caller guarantees `r` owns any heap pointer it holds.
    unsafe {
        let size = (*r).size;
        let p = (*r).data.value_ptr;
        if !is_inline(size) || (size == 0 && !p.is_null()) {
            libc::free(p.cast());
        }
        r.write(CWrapperFunctionResult::EMPTY);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_does_not_read_payload() {
        let r = CWrapperFunctionResult::EMPTY;
        assert_eq!(format!("{:?}", r.data), "CWrapperFunctionResultData { .. }");
        assert!(format!("{r:?}").starts_with("CWrapperFunctionResult { size: 0"));
    }

    #[test]
    fn init_is_empty() {
        let mut r = CWrapperFunctionResult::EMPTY;
        unsafe {
            sps_cwrapper_function_result_init(&mut r);
            assert!(sps_cwrapper_function_result_empty(&r));
            assert!(sps_cwrapper_function_result_get_out_of_band_error(&r).is_null());
            assert_eq!(sps_cwrapper_function_result_size(&r), 0);
        }
    }

    #[test]
    fn small_payload_is_inline_large_is_heap() {
        unsafe {
            let small = sps_create_cwrapper_function_result_from_range(b"abc".as_ptr().cast(), 3);
            let p = sps_cwrapper_function_result_data(&small);
            assert_eq!(p, ptr::addr_of!(small.data.value).cast());
            assert_eq!(std::slice::from_raw_parts(p.cast::<u8>(), 3), b"abc");

            let bytes = [7u8; 64];
            let mut large = sps_create_cwrapper_function_result_from_range(bytes.as_ptr().cast(), 64);
            let q = sps_cwrapper_function_result_data(&large);
            assert_ne!(q, ptr::addr_of!(large.data.value).cast());
            assert_eq!(std::slice::from_raw_parts(q.cast::<u8>(), 64), &bytes);
            assert!(!sps_cwrapper_function_result_empty(&large));
            sps_dispose_cwrapper_function_result(&mut large);
            assert!(sps_cwrapper_function_result_empty(&large));
        }
    }

    #[test]
    fn from_string_keeps_terminator() {
        unsafe {
            let mut r = sps_create_cwrapper_function_result_from_string(c"hello world".as_ptr());
            assert_eq!(sps_cwrapper_function_result_size(&r), 12);
            let data = sps_cwrapper_function_result_data(&r);
            assert_eq!(CStr::from_ptr(data), c"hello world");
            sps_dispose_cwrapper_function_result(&mut r);
        }
    }

    #[test]
    fn out_of_band_error_is_distinguishable() {
        unsafe {
            let mut r = sps_create_cwrapper_function_result_from_out_of_band_error(c"boom".as_ptr());
            assert_eq!(sps_cwrapper_function_result_size(&r), 0);
            assert!(!sps_cwrapper_function_result_empty(&r));
            let msg = sps_cwrapper_function_result_get_out_of_band_error(&r);
            assert_eq!(CStr::from_ptr(msg), c"boom");
            sps_dispose_cwrapper_function_result(&mut r);
            assert!(sps_cwrapper_function_result_empty(&r));
        }
    }
}
