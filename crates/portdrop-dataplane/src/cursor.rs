//! Bounds-Checked Frame Cursor
//!
//! A read position over an untrusted frame. Every read is preceded by a
//! remaining-length check against the validated end, so a decoder can never
//! step past the bytes it was given.
//!
//! # Invariant
//!
//! `position <= end <= frame.len()` holds after every operation. A failed
//! read leaves the position untouched.

use crate::error::{DecodeError, DecodeResult};

/// Read cursor over a single frame
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    /// Frame bytes
    frame: &'a [u8],
    /// Current read offset
    pos: usize,
    /// Validated end (exclusive)
    end: usize,
}

impl<'a> Cursor<'a> {
    /// Cursor over the whole frame
    #[inline(always)]
    pub fn new(frame: &'a [u8]) -> Self {
        Self {
            frame,
            pos: 0,
            end: frame.len(),
        }
    }

    /// Cursor whose validated end is `end`, clamped to the frame length
    #[inline]
    pub fn with_end(frame: &'a [u8], end: usize) -> Self {
        Self {
            frame,
            pos: 0,
            end: end.min(frame.len()),
        }
    }

    /// Current read offset
    #[inline(always)]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Validated end
    #[inline(always)]
    pub fn end(&self) -> usize {
        self.end
    }

    /// Bytes left before the validated end
    #[inline(always)]
    pub fn remaining(&self) -> usize {
        self.end - self.pos
    }

    /// Check if nothing remains
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.pos == self.end
    }

    /// Consume the next `n` bytes
    #[inline]
    pub fn read_fixed(&mut self, n: usize) -> DecodeResult<&'a [u8]> {
        let bytes = self.peek_at(0, n)?;
        self.pos += n;
        Ok(bytes)
    }

    /// Consume the next `N` bytes as an array
    #[inline]
    pub fn read_array<const N: usize>(&mut self) -> DecodeResult<[u8; N]> {
        let bytes = self.read_fixed(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    /// Look at `n` bytes starting `offset` bytes past the position, without
    /// consuming them
    #[inline]
    pub fn peek_at(&self, offset: usize, n: usize) -> DecodeResult<&'a [u8]> {
        let remaining = self.remaining();
        let needed = offset.saturating_add(n);
        if needed > remaining {
            return Err(DecodeError::Truncated { needed, remaining });
        }
        let start = self.pos + offset;
        Ok(&self.frame[start..start + n])
    }

    /// Big-endian u16 at `offset` past the position, without consuming it
    #[inline]
    pub fn peek_u16_be(&self, offset: usize) -> DecodeResult<u16> {
        let b = self.peek_at(offset, 2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }
}
