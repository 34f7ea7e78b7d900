//! Protocol module - wire constants, byte cursor, decoder, reassembly.
//!
//! This module implements the ZooKeeper client protocol as seen from the
//! middle of the connection:
//! - big-endian primitive reads with per-message length enforcement
//! - framed request/response decoding with xid→request correlation
//! - reassembly of packets split across TCP reads

mod cursor;
mod decoder;
mod reassembly;
#[cfg(test)]
pub(crate) mod testutil;
mod wire;

pub use cursor::BufferCursor;
pub use decoder::Decoder;
pub use wire::{
    CreateFlags, OpCode, XidCode, BOOL_LENGTH, DEFAULT_MAX_PACKET_BYTES, INT_LENGTH, LONG_LENGTH,
    MULTI_HEADER_LENGTH, OPCODE_LENGTH, PROTOCOL_VERSION_LENGTH, SERVER_HEADER_LENGTH,
    SESSION_LENGTH, TIMEOUT_LENGTH, XID_LENGTH, ZXID_LENGTH,
};
