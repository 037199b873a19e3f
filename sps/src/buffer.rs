//! Bounds-checked byte buffers used for a single encode or decode pass.
//!
//! Both buffers only ever move forward. A read or write either transfers
//! all requested bytes or leaves the buffer untouched.

use crate::error::{CodecError, Result};

/// Sequential writer over a caller-supplied byte region.
#[derive(Debug)]
pub struct OutputBuffer<'a> {
    /// The unwritten tail.
    buf: &'a mut [u8],
}

impl<'a> OutputBuffer<'a> {
    /// Wraps `buf`; every byte of it is writable.
    pub const fn new(buf: &'a mut [u8]) -> Self {
        Self { buf }
    }

    /// Copies `data` into the buffer and advances past it.
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        let remaining = self.buf.len();
        if data.len() > remaining {
            return Err(CodecError::Overflow {
                needed: data.len(),
                remaining,
            });
        }
        let (head, tail) = std::mem::take(&mut self.buf).split_at_mut(data.len());
        head.copy_from_slice(data);
        self.buf = tail;
        Ok(())
    }

    /// Bytes still available for writing.
    pub const fn remaining(&self) -> usize {
        self.buf.len()
    }
}

/// Sequential reader over a caller-supplied byte region.
///
/// Slices handed out by [`data`](Self::data) and [`take`](Self::take) borrow
/// from the underlying region for `'a`, which is what allows `&str` and
/// `&[u8]` decodes to alias the input without copying.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputBuffer<'a> {
    /// The unread tail.
    buf: &'a [u8],
}

impl<'a> InputBuffer<'a> {
    /// Wraps `buf` for reading from its first byte.
    pub const fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Copies `dst.len()` bytes into `dst` and advances past them.
    pub fn read(&mut self, dst: &mut [u8]) -> Result<()> {
        let src = self.take(dst.len())?;
        dst.copy_from_slice(src);
        Ok(())
    }

    /// Reads exactly `N` bytes into an array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        self.read(&mut out)?;
        Ok(out)
    }

    /// Advances `n` bytes without copying.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    /// Borrows the next `n` bytes and advances past them.
    pub const fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.buf.len() {
            return Err(CodecError::Underflow {
                needed: n,
                remaining: self.buf.len(),
            });
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    /// The unread bytes, starting at the current position.
    pub const fn data(&self) -> &'a [u8] {
        self.buf
    }

    /// Bytes still available for reading.
    pub const fn remaining(&self) -> usize {
        self.buf.len()
    }
}
