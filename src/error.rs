//! Error types for zktap.

use thiserror::Error;

/// Main error type for all zktap operations.
///
/// Decode failures are typed so that callers (and tests) can tell a framing
/// violation from a correlation failure. Every decode variant is fatal for
/// the chunk being decoded: the decoder reports it once through
/// [`DecoderCallbacks::on_decode_error`](crate::callbacks::DecoderCallbacks::on_decode_error)
/// and stops consuming the current buffer.
#[derive(Debug, Error)]
pub enum TapError {
    /// I/O error from the proxy transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration parse error.
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    /// Declared frame length is below the per-direction minimum.
    #[error("packet is too small: length {len} below minimum {min}")]
    PacketTooSmall { len: i32, min: u32 },

    /// Declared frame length exceeds the configured ceiling.
    #[error("packet is too big: length {len} exceeds maximum {max}")]
    PacketTooBig { len: i32, max: u32 },

    /// Top-level request opcode is not part of the protocol.
    #[error("unknown opcode: {0}")]
    UnknownOpcode(i32),

    /// Nested opcode inside a Multi transaction is not one of
    /// Create/SetData/Check.
    #[error("unknown opcode within a transaction: {0}")]
    UnknownTxnOpcode(i32),

    /// Create request carries a flags value outside the known set.
    #[error("unknown create flags: {0}")]
    UnknownCreateFlags(i32),

    /// Response xid has no matching inflight request.
    #[error("xid not found: {0}")]
    XidNotFound(i32),

    /// A primitive read would walk past the end of the buffer.
    #[error("truncated read: need {needed} bytes at offset {offset}, {available} available")]
    TruncatedRead {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A primitive read would walk past the message's declared length.
    #[error("message overran its declared length of {limit} bytes")]
    LengthOverrun { limit: u64 },
}

/// Result type alias using TapError.
pub type Result<T> = std::result::Result<T, TapError>;
