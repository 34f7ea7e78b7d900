//! Byte cursor for big-endian primitive reads.
//!
//! All reads go through a [`BufferCursor`]: the caller owns the buffer and
//! the global offset (a buffer may hold several messages), while the cursor
//! tracks how many bytes the current message has consumed. The decoder
//! resets the cursor before each message and arms it with the message's
//! declared length, so a malformed message whose inner fields claim more
//! bytes than the frame holds fails instead of walking into the next frame.
//!
//! The `peek_*` methods read at the offset and advance it; nothing is
//! drained from the underlying buffer.

use crate::error::{Result, TapError};

/// Cursor over a byte buffer with per-message length accounting.
#[derive(Debug, Default)]
pub struct BufferCursor {
    /// Bytes consumed since the last [`reset`](Self::reset), length prefix
    /// included.
    consumed: u64,
    /// Declared message length plus the 4-byte prefix, once known.
    limit: Option<u64>,
}

impl BufferCursor {
    /// Create a new cursor with no armed limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the per-message accounting. Called before each message.
    pub fn reset(&mut self) {
        self.consumed = 0;
        self.limit = None;
    }

    /// Arm the message ceiling: `limit` is the declared body length plus
    /// the length prefix itself.
    pub fn set_limit(&mut self, limit: u64) {
        self.limit = Some(limit);
    }

    /// Whether `n` more bytes fit within the armed message ceiling.
    pub fn fits(&self, n: u64) -> bool {
        match self.limit {
            Some(limit) => self.consumed + n <= limit,
            None => true,
        }
    }

    fn advance(&mut self, n: u64) -> Result<()> {
        self.consumed += n;
        if let Some(limit) = self.limit {
            if self.consumed > limit {
                return Err(TapError::LengthOverrun { limit });
            }
        }
        Ok(())
    }

    fn ensure(data: &[u8], offset: usize, needed: usize) -> Result<()> {
        if offset + needed > data.len() {
            return Err(TapError::TruncatedRead {
                offset,
                needed,
                available: data.len().saturating_sub(offset),
            });
        }
        Ok(())
    }

    /// Read a big-endian int32 at `offset`, advancing it.
    pub fn peek_i32(&mut self, data: &[u8], offset: &mut usize) -> Result<i32> {
        Self::ensure(data, *offset, 4)?;
        self.advance(4)?;
        let value = i32::from_be_bytes([
            data[*offset],
            data[*offset + 1],
            data[*offset + 2],
            data[*offset + 3],
        ]);
        *offset += 4;
        Ok(value)
    }

    /// Read a big-endian int64 at `offset`, advancing it.
    pub fn peek_i64(&mut self, data: &[u8], offset: &mut usize) -> Result<i64> {
        Self::ensure(data, *offset, 8)?;
        self.advance(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&data[*offset..*offset + 8]);
        *offset += 8;
        Ok(i64::from_be_bytes(raw))
    }

    /// Read a bool (one byte, non-zero = true) at `offset`, advancing it.
    pub fn peek_bool(&mut self, data: &[u8], offset: &mut usize) -> Result<bool> {
        Self::ensure(data, *offset, 1)?;
        self.advance(1)?;
        let value = data[*offset] != 0;
        *offset += 1;
        Ok(value)
    }

    /// Read a length-prefixed string at `offset`, advancing it.
    ///
    /// A negative declared length is the wire encoding for null; it yields
    /// an empty string and consumes no body bytes. Invalid UTF-8 is
    /// replaced rather than rejected, since paths are only reported, never
    /// interpreted.
    pub fn peek_string(&mut self, data: &[u8], offset: &mut usize) -> Result<String> {
        let len = self.peek_i32(data, offset)?;
        if len < 0 {
            return Ok(String::new());
        }
        let len = len as usize;
        Self::ensure(data, *offset, len)?;
        self.advance(len as u64)?;
        let value = String::from_utf8_lossy(&data[*offset..*offset + len]).into_owned();
        *offset += len;
        Ok(value)
    }

    /// Skip `n` bytes, advancing `offset`.
    pub fn skip(&mut self, n: usize, data: &[u8], offset: &mut usize) -> Result<()> {
        Self::ensure(data, *offset, n)?;
        self.advance(n as u64)?;
        *offset += n;
        Ok(())
    }
}
