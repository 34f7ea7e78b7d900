//! Wire-level constants and enums for the ZooKeeper client protocol.
//!
//! Every message is framed as:
//! ```text
//! ┌───────────┬──────────────────────┐
//! │ Length L  │ Body (exactly L)     │
//! │ 4 bytes   │ xid, opcode, fields… │
//! │ int32 BE  │                      │
//! └───────────┴──────────────────────┘
//! ```
//!
//! All multi-byte integers are Big Endian and signed. Strings are an int32
//! length followed by that many bytes; a negative length means null/empty
//! and carries no body bytes.

use num_derive::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoStaticStr};

/// Size of a serialized bool.
pub const BOOL_LENGTH: u32 = 1;
/// Size of a serialized int32.
pub const INT_LENGTH: u32 = 4;
/// Size of a serialized int64.
pub const LONG_LENGTH: u32 = 8;
/// Size of the xid field.
pub const XID_LENGTH: u32 = 4;
/// Size of the opcode field.
pub const OPCODE_LENGTH: u32 = 4;
/// Size of a zxid field.
pub const ZXID_LENGTH: u32 = 8;
/// Size of the session timeout field.
pub const TIMEOUT_LENGTH: u32 = 4;
/// Size of a session id field.
pub const SESSION_LENGTH: u32 = 8;
/// Size of one Multi sub-operation header (opcode + done + err).
pub const MULTI_HEADER_LENGTH: u32 = 9;
/// Size of the protocol version field in a connect response.
pub const PROTOCOL_VERSION_LENGTH: u32 = 4;
/// Size of the standard reply header (xid + zxid + err).
pub const SERVER_HEADER_LENGTH: u32 = 16;

/// Default ceiling for the declared frame length (ZooKeeper's
/// `jute.maxbuffer` default).
pub const DEFAULT_MAX_PACKET_BYTES: u32 = 1024 * 1024;

/// Reserved xid values signaling control traffic.
///
/// Positive xids correlate data requests to responses; these few negative
/// values (and zero for the connect handshake) are claimed by the protocol
/// itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum XidCode {
    /// Server-initiated watch notification; has no originating request.
    Watch = -1,
    /// Session keep-alive.
    Ping = -2,
    /// Authentication request.
    Auth = -4,
    /// Bulk watch registration after a session move.
    SetWatches = -8,
    /// Session handshake; the response carries no standard reply header.
    Connect = 0,
}

/// Operation codes carried by data requests.
///
/// Values are ZooKeeper's `ZooDefs.OpCode` constants. Anything outside this
/// set observed as an opcode is a fatal decoding error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(FromPrimitive, ToPrimitive, EnumIter, IntoStaticStr)]
#[derive(Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum OpCode {
    Connect = 0,
    Create = 1,
    Delete = 2,
    Exists = 3,
    GetData = 4,
    SetData = 5,
    GetAcl = 6,
    SetAcl = 7,
    GetChildren = 8,
    Sync = 9,
    Ping = 11,
    GetChildren2 = 12,
    Check = 13,
    Multi = 14,
    Create2 = 15,
    Reconfig = 16,
    CheckWatches = 17,
    RemoveWatches = 18,
    CreateContainer = 19,
    CreateTtl = 21,
    Close = -11,
    SetAuth = 100,
    SetWatches = 101,
    GetEphemerals = 103,
    GetAllChildrenNumber = 104,
}

impl OpCode {
    /// Lowercase name used for stats and logging.
    #[inline]
    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// Node creation semantics carried by Create/Create2/CreateContainer/CreateTtl.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(FromPrimitive, ToPrimitive, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum CreateFlags {
    Persistent = 0,
    Ephemeral = 1,
    PersistentSequential = 2,
    EphemeralSequential = 3,
    Container = 4,
    PersistentWithTtl = 5,
    PersistentSequentialWithTtl = 6,
}

impl CreateFlags {
    /// Lowercase name used for stats and logging.
    #[inline]
    pub fn name(self) -> &'static str {
        self.into()
    }

    #[inline]
    pub fn is_ephemeral(&self) -> bool {
        matches!(self, Self::Ephemeral | Self::EphemeralSequential)
    }

    #[inline]
    pub fn is_sequential(&self) -> bool {
        matches!(
            self,
            Self::PersistentSequential
                | Self::EphemeralSequential
                | Self::PersistentSequentialWithTtl
        )
    }
}
