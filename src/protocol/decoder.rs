//! Framed message decoder.
//!
//! Consumes complete ZooKeeper messages from a byte buffer, dispatches on
//! xid and opcode, correlates responses to their originating requests for
//! latency measurement, and emits one semantic callback per operation.
//!
//! The decoder assumes it is handed whole frames; reassembly of packets
//! split across TCP reads happens in [`reassembly`](super::reassembly),
//! which owns the per-direction residual buffers on this same struct.

use std::collections::HashMap;
use std::time::Duration;

use bytes::BytesMut;
use num_traits::FromPrimitive;
use tracing::trace;

use super::cursor::BufferCursor;
use super::wire::{
    CreateFlags, OpCode, XidCode, BOOL_LENGTH, INT_LENGTH, LONG_LENGTH, MULTI_HEADER_LENGTH,
    OPCODE_LENGTH, PROTOCOL_VERSION_LENGTH, SERVER_HEADER_LENGTH, SESSION_LENGTH, TIMEOUT_LENGTH,
    XID_LENGTH, ZXID_LENGTH,
};
use crate::callbacks::DecoderCallbacks;
use crate::clock::TimeSource;
use crate::error::{Result, TapError};

/// Direction a chunk of bytes is traveling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DecodeType {
    /// Client → server (requests).
    Read,
    /// Server → client (responses).
    Write,
}

/// A request awaiting its response.
#[derive(Debug, Clone, Copy)]
struct InflightRequest {
    opcode: OpCode,
    start_time: Duration,
}

/// Stateful per-connection decoder.
///
/// Owns the xid → inflight-request correlation table and both residual
/// buffers. Single-threaded per connection; decoding never blocks.
pub struct Decoder<C, T> {
    callbacks: C,
    time_source: T,
    max_packet_bytes: u32,
    cursor: BufferCursor,
    requests_by_xid: HashMap<i32, InflightRequest>,
    pub(super) read_residual: BytesMut,
    pub(super) write_residual: BytesMut,
}

impl<C: DecoderCallbacks, T: TimeSource> Decoder<C, T> {
    /// Create a decoder delivering callbacks to `callbacks`. Frames whose
    /// declared length exceeds `max_packet_bytes` are decode errors.
    pub fn new(callbacks: C, max_packet_bytes: u32, time_source: T) -> Self {
        Self {
            callbacks,
            time_source,
            max_packet_bytes,
            cursor: BufferCursor::new(),
            requests_by_xid: HashMap::new(),
            read_residual: BytesMut::new(),
            write_residual: BytesMut::new(),
        }
    }

    /// Borrow the callback sink.
    pub fn callbacks(&self) -> &C {
        &self.callbacks
    }

    /// Mutably borrow the callback sink.
    pub fn callbacks_mut(&mut self) -> &mut C {
        &mut self.callbacks
    }

    /// Consume the decoder, returning the callback sink.
    pub fn into_callbacks(self) -> C {
        self.callbacks
    }

    /// Number of requests currently awaiting a response.
    pub fn pending_requests(&self) -> usize {
        self.requests_by_xid.len()
    }

    pub(super) fn ensure_min_length(len: i32, min: u32) -> Result<()> {
        if len < min as i32 {
            return Err(TapError::PacketTooSmall { len, min });
        }
        Ok(())
    }

    pub(super) fn ensure_max_length(&self, len: i32) -> Result<()> {
        if len as u32 > self.max_packet_bytes {
            return Err(TapError::PacketTooBig {
                len,
                max: self.max_packet_bytes,
            });
        }
        Ok(())
    }

    /// Decode every message in `data`. The buffer must hold only whole
    /// frames; any failure emits a single `on_decode_error` and abandons
    /// the rest of the buffer.
    pub(super) fn decode(&mut self, data: &[u8], dtype: DecodeType) {
        let mut offset = 0;

        while offset < data.len() {
            // The cursor is reset per message: `offset` is global to the
            // buffer, the cursor's internal count is bounded by each
            // message's declared length.
            self.cursor.reset();

            let start = offset;
            let result = match dtype {
                DecodeType::Read => self.decode_on_data(data, &mut offset),
                DecodeType::Write => self.decode_on_write(data, &mut offset),
            };

            match result {
                Ok(()) => match dtype {
                    DecodeType::Read => self.callbacks.on_request_bytes(offset - start),
                    DecodeType::Write => self.callbacks.on_response_bytes(offset - start),
                },
                Err(e) => {
                    tracing::debug!("decoding error: {e}");
                    self.callbacks.on_decode_error();
                    return;
                }
            }
        }
    }

    fn decode_on_data(&mut self, data: &[u8], offset: &mut usize) -> Result<()> {
        let len = self.cursor.peek_i32(data, offset)?;
        trace!(len, offset = *offset, "decoding request");
        Self::ensure_min_length(len, XID_LENGTH + OPCODE_LENGTH)?;
        self.ensure_max_length(len)?;
        self.cursor.set_limit(len as u64 + INT_LENGTH as u64);

        let start_time = self.time_source.monotonic_time();

        // Control requests, with reserved xids: these manage session state
        // (connect, keep-alive, authenticate, set initial watches) rather
        // than data. Some clients also expose set-watches as a regular
        // data request, so that opcode appears again below.
        let xid = self.cursor.peek_i32(data, offset)?;
        trace!(xid, offset = *offset, "decoding request");
        match XidCode::from_i32(xid) {
            Some(XidCode::Connect) => {
                self.parse_connect(data, offset, len)?;
                self.record_request(xid, OpCode::Connect, start_time);
                return Ok(());
            }
            Some(XidCode::Ping) => {
                self.cursor.skip(OPCODE_LENGTH as usize, data, offset)?;
                self.callbacks.on_ping();
                self.record_request(xid, OpCode::Ping, start_time);
                return Ok(());
            }
            Some(XidCode::Auth) => {
                self.parse_auth_request(data, offset, len)?;
                self.record_request(xid, OpCode::SetAuth, start_time);
                return Ok(());
            }
            Some(XidCode::SetWatches) => {
                self.cursor.skip(OPCODE_LENGTH as usize, data, offset)?;
                self.parse_set_watches_request(data, offset, len)?;
                self.record_request(xid, OpCode::SetWatches, start_time);
                return Ok(());
            }
            // The watch xid is server-generated; seen here it carries an
            // ordinary data request.
            _ => {}
        }

        let oc = self.cursor.peek_i32(data, offset)?;
        trace!(opcode = oc, offset = *offset, "decoding request");
        let opcode = OpCode::from_i32(oc).ok_or(TapError::UnknownOpcode(oc))?;
        match opcode {
            OpCode::GetData => self.parse_get_data_request(data, offset, len)?,
            OpCode::Create | OpCode::Create2 | OpCode::CreateContainer | OpCode::CreateTtl => {
                self.parse_create_request(data, offset, len, opcode)?;
            }
            OpCode::SetData => self.parse_set_request(data, offset, len)?,
            OpCode::GetChildren => self.parse_get_children_request(data, offset, len, false)?,
            OpCode::GetChildren2 => self.parse_get_children_request(data, offset, len, true)?,
            OpCode::Delete => self.parse_delete_request(data, offset, len)?,
            OpCode::Exists => self.parse_exists_request(data, offset, len)?,
            OpCode::GetAcl => self.parse_get_acl_request(data, offset, len)?,
            OpCode::SetAcl => self.parse_set_acl_request(data, offset, len)?,
            OpCode::Sync => {
                let path = self.path_only_request(data, offset, len)?;
                self.callbacks.on_sync_request(&path);
            }
            OpCode::Check => self.parse_check_request(data, offset, len)?,
            OpCode::Multi => self.parse_multi_request(data, offset, len)?,
            OpCode::Reconfig => self.parse_reconfig_request(data, offset, len)?,
            OpCode::SetWatches => self.parse_set_watches_request(data, offset, len)?,
            OpCode::CheckWatches | OpCode::RemoveWatches => {
                self.parse_x_watches_request(data, offset, len, opcode)?;
            }
            OpCode::GetEphemerals => {
                let path = self.path_only_request(data, offset, len)?;
                self.callbacks.on_get_ephemerals_request(&path);
            }
            OpCode::GetAllChildrenNumber => {
                let path = self.path_only_request(data, offset, len)?;
                self.callbacks.on_get_all_children_number_request(&path);
            }
            OpCode::Close => self.callbacks.on_close_request(),
            // Valid enum values that are never top-level data requests
            // (Connect, Ping, SetAuth travel under reserved xids).
            _ => return Err(TapError::UnknownOpcode(oc)),
        }

        self.record_request(xid, opcode, start_time);
        Ok(())
    }

    fn decode_on_write(&mut self, data: &[u8], offset: &mut usize) -> Result<()> {
        let len = self.cursor.peek_i32(data, offset)?;
        trace!(len, offset = *offset, "decoding response");
        Self::ensure_min_length(len, XID_LENGTH + ZXID_LENGTH + INT_LENGTH)?;
        self.ensure_max_length(len)?;
        self.cursor.set_limit(len as u64 + INT_LENGTH as u64);

        let xid = self.cursor.peek_i32(data, offset)?;
        trace!(xid, offset = *offset, "decoding response");
        let xid_code = XidCode::from_i32(xid);

        // Watch events are server-initiated and never correlate.
        if xid_code == Some(XidCode::Watch) {
            let zxid = self.cursor.peek_i64(data, offset)?;
            let error = self.cursor.peek_i32(data, offset)?;
            return self.parse_watch_event(data, offset, len, zxid, error);
        }

        // Everything else must match an inflight request. A miss is either
        // a server-side bug or a malformed packet.
        let entry = self
            .requests_by_xid
            .remove(&xid)
            .ok_or(TapError::XidNotFound(xid))?;
        let latency = self
            .time_source
            .monotonic_time()
            .saturating_sub(entry.start_time);

        // Connect responses have no standard reply header: just the xid,
        // with no zxid or error fields.
        if xid_code == Some(XidCode::Connect) {
            return self.parse_connect_response(data, offset, len, latency);
        }

        let zxid = self.cursor.peek_i64(data, offset)?;
        let error = self.cursor.peek_i32(data, offset)?;
        trace!(zxid, error, offset = *offset, "decoding response");

        let opcode = match xid_code {
            Some(XidCode::Ping) => OpCode::Ping,
            Some(XidCode::Auth) => OpCode::SetAuth,
            Some(XidCode::SetWatches) => OpCode::SetWatches,
            _ => entry.opcode,
        };
        self.callbacks.on_response(opcode, xid, zxid, error, latency);

        // Skip the operation-specific body, which the tap never interprets.
        self.cursor
            .skip(len as usize - SERVER_HEADER_LENGTH as usize, data, offset)?;
        Ok(())
    }

    fn record_request(&mut self, xid: i32, opcode: OpCode, start_time: Duration) {
        // A reused pending xid overwrites; the protocol trusts the client
        // not to do this, and the previous entry could never match again.
        self.requests_by_xid
            .insert(xid, InflightRequest { opcode, start_time });
    }

    fn parse_connect(&mut self, data: &[u8], offset: &mut usize, len: i32) -> Result<()> {
        Self::ensure_min_length(
            len,
            XID_LENGTH + ZXID_LENGTH + TIMEOUT_LENGTH + SESSION_LENGTH + INT_LENGTH,
        )?;

        // Skip zxid, timeout, and session id.
        self.cursor.skip(
            (ZXID_LENGTH + TIMEOUT_LENGTH + SESSION_LENGTH) as usize,
            data,
            offset,
        )?;
        // Skip password.
        self.skip_string(data, offset)?;

        let readonly = self.maybe_read_bool(data, offset)?;
        self.callbacks.on_connect(readonly);
        Ok(())
    }

    fn parse_connect_response(
        &mut self,
        data: &[u8],
        offset: &mut usize,
        len: i32,
        latency: Duration,
    ) -> Result<()> {
        Self::ensure_min_length(
            len,
            PROTOCOL_VERSION_LENGTH + TIMEOUT_LENGTH + SESSION_LENGTH + INT_LENGTH,
        )?;

        let timeout = self.cursor.peek_i32(data, offset)?;

        // Skip session id + password.
        self.cursor.skip(SESSION_LENGTH as usize, data, offset)?;
        self.skip_string(data, offset)?;

        let readonly = self.maybe_read_bool(data, offset)?;
        self.callbacks.on_connect_response(0, timeout, readonly, latency);
        Ok(())
    }

    fn parse_auth_request(&mut self, data: &[u8], offset: &mut usize, len: i32) -> Result<()> {
        Self::ensure_min_length(len, XID_LENGTH + OPCODE_LENGTH + 3 * INT_LENGTH)?;

        // Skip opcode + type.
        self.cursor
            .skip((OPCODE_LENGTH + INT_LENGTH) as usize, data, offset)?;
        let scheme = self.cursor.peek_string(data, offset)?;
        // Skip credential.
        self.skip_string(data, offset)?;

        self.callbacks.on_auth_request(&scheme);
        Ok(())
    }

    fn parse_get_data_request(&mut self, data: &[u8], offset: &mut usize, len: i32) -> Result<()> {
        Self::ensure_min_length(len, XID_LENGTH + OPCODE_LENGTH + INT_LENGTH + BOOL_LENGTH)?;

        let path = self.cursor.peek_string(data, offset)?;
        let watch = self.cursor.peek_bool(data, offset)?;

        self.callbacks.on_get_data_request(&path, watch);
        Ok(())
    }

    fn parse_create_request(
        &mut self,
        data: &[u8],
        offset: &mut usize,
        len: i32,
        opcode: OpCode,
    ) -> Result<()> {
        Self::ensure_min_length(len, XID_LENGTH + OPCODE_LENGTH + 3 * INT_LENGTH)?;

        let path = self.cursor.peek_string(data, offset)?;
        // Skip data.
        self.skip_string(data, offset)?;
        self.skip_acls(data, offset)?;

        let raw = self.cursor.peek_i32(data, offset)?;
        let flags = CreateFlags::from_i32(raw).ok_or(TapError::UnknownCreateFlags(raw))?;
        self.callbacks.on_create_request(&path, flags, opcode);
        Ok(())
    }

    fn parse_set_request(&mut self, data: &[u8], offset: &mut usize, len: i32) -> Result<()> {
        Self::ensure_min_length(len, XID_LENGTH + OPCODE_LENGTH + 3 * INT_LENGTH)?;

        let path = self.cursor.peek_string(data, offset)?;
        // Skip data.
        self.skip_string(data, offset)?;
        // Ignore version.
        self.cursor.peek_i32(data, offset)?;

        self.callbacks.on_set_request(&path);
        Ok(())
    }

    fn parse_get_children_request(
        &mut self,
        data: &[u8],
        offset: &mut usize,
        len: i32,
        v2: bool,
    ) -> Result<()> {
        Self::ensure_min_length(len, XID_LENGTH + OPCODE_LENGTH + INT_LENGTH + BOOL_LENGTH)?;

        let path = self.cursor.peek_string(data, offset)?;
        let watch = self.cursor.peek_bool(data, offset)?;

        self.callbacks.on_get_children_request(&path, watch, v2);
        Ok(())
    }

    fn parse_delete_request(&mut self, data: &[u8], offset: &mut usize, len: i32) -> Result<()> {
        Self::ensure_min_length(len, XID_LENGTH + OPCODE_LENGTH + 2 * INT_LENGTH)?;

        let path = self.cursor.peek_string(data, offset)?;
        let version = self.cursor.peek_i32(data, offset)?;

        self.callbacks.on_delete_request(&path, version);
        Ok(())
    }

    fn parse_exists_request(&mut self, data: &[u8], offset: &mut usize, len: i32) -> Result<()> {
        Self::ensure_min_length(len, XID_LENGTH + OPCODE_LENGTH + INT_LENGTH + BOOL_LENGTH)?;

        let path = self.cursor.peek_string(data, offset)?;
        let watch = self.cursor.peek_bool(data, offset)?;

        self.callbacks.on_exists_request(&path, watch);
        Ok(())
    }

    fn parse_get_acl_request(&mut self, data: &[u8], offset: &mut usize, len: i32) -> Result<()> {
        Self::ensure_min_length(len, XID_LENGTH + OPCODE_LENGTH + INT_LENGTH)?;

        let path = self.cursor.peek_string(data, offset)?;
        self.callbacks.on_get_acl_request(&path);
        Ok(())
    }

    fn parse_set_acl_request(&mut self, data: &[u8], offset: &mut usize, len: i32) -> Result<()> {
        Self::ensure_min_length(len, XID_LENGTH + OPCODE_LENGTH + 2 * INT_LENGTH)?;

        let path = self.cursor.peek_string(data, offset)?;
        self.skip_acls(data, offset)?;
        let version = self.cursor.peek_i32(data, offset)?;

        self.callbacks.on_set_acl_request(&path, version);
        Ok(())
    }

    fn path_only_request(&mut self, data: &[u8], offset: &mut usize, len: i32) -> Result<String> {
        Self::ensure_min_length(len, XID_LENGTH + OPCODE_LENGTH + INT_LENGTH)?;
        self.cursor.peek_string(data, offset)
    }

    fn parse_check_request(&mut self, data: &[u8], offset: &mut usize, len: i32) -> Result<()> {
        Self::ensure_min_length(len, 2 * INT_LENGTH)?;

        let path = self.cursor.peek_string(data, offset)?;
        let version = self.cursor.peek_i32(data, offset)?;

        self.callbacks.on_check_request(&path, version);
        Ok(())
    }

    fn parse_multi_request(&mut self, data: &[u8], offset: &mut usize, len: i32) -> Result<()> {
        // An empty transaction is a decoding error; there must be at least
        // one sub-operation header.
        Self::ensure_min_length(len, XID_LENGTH + OPCODE_LENGTH + MULTI_HEADER_LENGTH)?;

        loop {
            let opcode = self.cursor.peek_i32(data, offset)?;
            let done = self.cursor.peek_bool(data, offset)?;
            // Ignore error field.
            self.cursor.peek_i32(data, offset)?;

            if done {
                break;
            }

            match OpCode::from_i32(opcode) {
                Some(OpCode::Create) => {
                    self.parse_create_request(data, offset, len, OpCode::Create)?;
                }
                Some(OpCode::SetData) => self.parse_set_request(data, offset, len)?,
                Some(OpCode::Check) => self.parse_check_request(data, offset, len)?,
                _ => return Err(TapError::UnknownTxnOpcode(opcode)),
            }
        }

        self.callbacks.on_multi_request();
        Ok(())
    }

    fn parse_reconfig_request(&mut self, data: &[u8], offset: &mut usize, len: i32) -> Result<()> {
        Self::ensure_min_length(len, XID_LENGTH + OPCODE_LENGTH + 3 * INT_LENGTH + LONG_LENGTH)?;

        // Skip joining, leaving, and new members.
        self.skip_string(data, offset)?;
        self.skip_string(data, offset)?;
        self.skip_string(data, offset)?;
        // Ignore config id.
        self.cursor.peek_i64(data, offset)?;

        self.callbacks.on_reconfig_request();
        Ok(())
    }

    fn parse_set_watches_request(
        &mut self,
        data: &[u8],
        offset: &mut usize,
        len: i32,
    ) -> Result<()> {
        Self::ensure_min_length(len, XID_LENGTH + OPCODE_LENGTH + 3 * INT_LENGTH)?;

        // Ignore relative zxid.
        self.cursor.peek_i64(data, offset)?;
        // Data, exist, and child watches.
        self.skip_strings(data, offset)?;
        self.skip_strings(data, offset)?;
        self.skip_strings(data, offset)?;

        self.callbacks.on_set_watches_request();
        Ok(())
    }

    fn parse_x_watches_request(
        &mut self,
        data: &[u8],
        offset: &mut usize,
        len: i32,
        opcode: OpCode,
    ) -> Result<()> {
        Self::ensure_min_length(len, XID_LENGTH + OPCODE_LENGTH + 2 * INT_LENGTH)?;

        let path = self.cursor.peek_string(data, offset)?;
        let watch_type = self.cursor.peek_i32(data, offset)?;

        if opcode == OpCode::CheckWatches {
            self.callbacks.on_check_watches_request(&path, watch_type);
        } else {
            self.callbacks.on_remove_watches_request(&path, watch_type);
        }
        Ok(())
    }

    fn parse_watch_event(
        &mut self,
        data: &[u8],
        offset: &mut usize,
        len: i32,
        zxid: i64,
        error: i32,
    ) -> Result<()> {
        Self::ensure_min_length(len, SERVER_HEADER_LENGTH + 3 * INT_LENGTH)?;

        let event_type = self.cursor.peek_i32(data, offset)?;
        let client_state = self.cursor.peek_i32(data, offset)?;
        let path = self.cursor.peek_string(data, offset)?;

        self.callbacks
            .on_watch_event(event_type, client_state, &path, zxid, error);
        Ok(())
    }

    fn skip_string(&mut self, data: &[u8], offset: &mut usize) -> Result<()> {
        let slen = self.cursor.peek_i32(data, offset)?;
        if slen < 0 {
            trace!(slen, offset = *offset, "skipping null string");
            return Ok(());
        }
        self.cursor.skip(slen as usize, data, offset)
    }

    fn skip_strings(&mut self, data: &[u8], offset: &mut usize) -> Result<()> {
        let count = self.cursor.peek_i32(data, offset)?;
        for _ in 0..count {
            self.skip_string(data, offset)?;
        }
        Ok(())
    }

    fn skip_acls(&mut self, data: &[u8], offset: &mut usize) -> Result<()> {
        let count = self.cursor.peek_i32(data, offset)?;
        for _ in 0..count {
            // Perms.
            self.cursor.peek_i32(data, offset)?;
            // Skip scheme and credential.
            self.skip_string(data, offset)?;
            self.skip_string(data, offset)?;
        }
        Ok(())
    }

    /// Read the optional trailing readonly flag, present only when the
    /// peer speaks the read-only protocol extension. Absent means false;
    /// "absent" is bounded by both the buffer and the declared message
    /// length, so a following message is never misread as the flag.
    fn maybe_read_bool(&mut self, data: &[u8], offset: &mut usize) -> Result<bool> {
        if *offset < data.len() && self.cursor.fits(BOOL_LENGTH as u64) {
            return self.cursor.peek_bool(data, offset);
        }
        Ok(false)
    }
}
