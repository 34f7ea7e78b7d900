//! Stream reassembly across TCP read boundaries.
//!
//! TCP delivers byte streams, not messages: a chunk handed to the filter
//! may end mid-packet, and the next chunk continues it. Each direction
//! keeps a residual buffer holding the prefix of a not-yet-complete
//! packet; new chunks are logically prepended with the residual, whole
//! packets are decoded, and any trailing partial goes back to the
//! residual.
//!
//! Between calls the residual is either empty or begins with the length
//! prefix of an incomplete packet.

use bytes::BytesMut;
use tracing::debug;

use super::cursor::BufferCursor;
use super::decoder::{DecodeType, Decoder};
use super::wire::{INT_LENGTH, XID_LENGTH, ZXID_LENGTH};
use crate::callbacks::{DecoderCallbacks, FilterStatus};
use crate::clock::TimeSource;
use crate::error::Result;

impl<C: DecoderCallbacks, T: TimeSource> Decoder<C, T> {
    /// Feed a chunk of client→server bytes.
    pub fn on_data(&mut self, data: &[u8]) -> FilterStatus {
        self.decode_and_buffer(data, DecodeType::Read)
    }

    /// Feed a chunk of server→client bytes.
    pub fn on_write(&mut self, data: &[u8]) -> FilterStatus {
        self.decode_and_buffer(data, DecodeType::Write)
    }

    fn residual_mut(&mut self, dtype: DecodeType) -> &mut BytesMut {
        match dtype {
            DecodeType::Read => &mut self.read_residual,
            DecodeType::Write => &mut self.write_residual,
        }
    }

    fn decode_and_buffer(&mut self, data: &[u8], dtype: DecodeType) -> FilterStatus {
        if self.residual_mut(dtype).is_empty() {
            self.decode_and_buffer_helper(data, dtype);
            return FilterStatus::Continue;
        }

        // The residual holds partial packet data from the previous chunk;
        // prepending it lets split packets complete. The residual is
        // drained here and repopulated by the helper if the combined
        // stream still ends mid-packet.
        let residual = self.residual_mut(dtype);
        let mut combined = BytesMut::with_capacity(residual.len() + data.len());
        combined.extend_from_slice(residual);
        combined.extend_from_slice(data);
        residual.clear();

        self.decode_and_buffer_helper(&combined, dtype);
        FilterStatus::Continue
    }

    fn decode_and_buffer_helper(&mut self, data: &[u8], dtype: DecodeType) {
        let total = data.len();

        let (offset, last_len, has_full_packets) = match self.prescan(data, dtype) {
            Ok(scan) => scan,
            Err(e) => {
                debug!("decoding error: {e}");
                self.callbacks_mut().on_decode_error();
                return;
            }
        };

        if offset == total {
            self.decode(data, dtype);
            return;
        }

        // The pre-scan overshot: the buffer ends in a partial packet.
        debug_assert!(offset > total);
        if has_full_packets {
            // Rewind to the start of the trailing partial packet, decode
            // the whole packets, and keep the rest for the next chunk.
            let split = offset - (INT_LENGTH as usize + last_len as usize);
            self.decode(&data[..split], dtype);
            self.residual_mut(dtype).extend_from_slice(&data[split..]);
        } else {
            self.residual_mut(dtype).extend_from_slice(data);
        }
    }

    /// Walk the declared frame lengths without decoding bodies. Returns
    /// the final walk offset, the last declared length, and whether at
    /// least one complete packet is present. Length-bounds violations and
    /// a chunk ending inside a length prefix are errors.
    fn prescan(&self, data: &[u8], dtype: DecodeType) -> Result<(usize, i32, bool)> {
        let total = data.len();
        let mut cursor = BufferCursor::new();
        let mut offset = 0;
        let mut len = 0i32;
        let mut has_full_packets = false;

        while offset < total {
            len = cursor.peek_i32(data, &mut offset)?;
            Self::ensure_min_length(
                len,
                match dtype {
                    DecodeType::Read => XID_LENGTH + INT_LENGTH,
                    DecodeType::Write => XID_LENGTH + ZXID_LENGTH + INT_LENGTH,
                },
            )?;
            self.ensure_max_length(len)?;
            offset += len as usize;
            if offset <= total {
                has_full_packets = true;
            }
        }

        Ok((offset, len, has_full_packets))
    }
}
