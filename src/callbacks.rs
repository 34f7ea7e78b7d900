//! Semantic callbacks emitted by the decoder.
//!
//! The decoder never interprets ZooKeeper semantics; it reports what it
//! saw through [`DecoderCallbacks`] and leaves stats, logging, and any
//! policy to the embedding filter. One callback fires per recognized
//! operation, in arrival order within each direction.

use std::time::Duration;

use crate::protocol::{CreateFlags, OpCode};

/// Status returned to the surrounding filter chain.
///
/// The decoder observes traffic but never withholds it, so it always
/// returns [`FilterStatus::Continue`]; the variant set matches what a
/// proxy filter chain expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterStatus {
    /// Keep forwarding bytes to the next filter.
    Continue,
    /// Stop iterating the filter chain.
    StopIteration,
}

/// Sink for decoded ZooKeeper operations.
///
/// Implemented by the embedding filter. Request callbacks fire while
/// decoding the client→server direction, response callbacks while decoding
/// server→client. `latency` on response callbacks is the time between the
/// originating request's decode and the response's decode.
pub trait DecoderCallbacks {
    /// A fatal decode failure; decoding of the current chunk stops.
    fn on_decode_error(&mut self);

    /// Bytes consumed by one fully decoded request.
    fn on_request_bytes(&mut self, n: usize);

    /// Bytes consumed by one fully decoded response.
    fn on_response_bytes(&mut self, n: usize);

    /// Session handshake request.
    fn on_connect(&mut self, readonly: bool);

    /// Keep-alive request.
    fn on_ping(&mut self);

    /// Authentication request for the given scheme.
    fn on_auth_request(&mut self, scheme: &str);

    fn on_get_data_request(&mut self, path: &str, watch: bool);

    /// Node creation; `opcode` distinguishes Create/Create2/CreateContainer/CreateTtl.
    fn on_create_request(&mut self, path: &str, flags: CreateFlags, opcode: OpCode);

    fn on_set_request(&mut self, path: &str);

    /// `v2` is true for GetChildren2 (the stat-carrying variant).
    fn on_get_children_request(&mut self, path: &str, watch: bool, v2: bool);

    fn on_delete_request(&mut self, path: &str, version: i32);

    fn on_exists_request(&mut self, path: &str, watch: bool);

    fn on_get_acl_request(&mut self, path: &str);

    fn on_set_acl_request(&mut self, path: &str, version: i32);

    fn on_sync_request(&mut self, path: &str);

    fn on_check_request(&mut self, path: &str, version: i32);

    /// A batched transaction finished decoding (per-sub-op callbacks have
    /// already fired).
    fn on_multi_request(&mut self);

    fn on_reconfig_request(&mut self);

    fn on_set_watches_request(&mut self);

    fn on_check_watches_request(&mut self, path: &str, watch_type: i32);

    fn on_remove_watches_request(&mut self, path: &str, watch_type: i32);

    fn on_get_ephemerals_request(&mut self, path: &str);

    fn on_get_all_children_number_request(&mut self, path: &str);

    fn on_close_request(&mut self);

    /// Handshake response. `protocol_version` is reported as observed on
    /// the wire head field (see the decoder for the exact field layout).
    fn on_connect_response(
        &mut self,
        protocol_version: i32,
        timeout: i32,
        readonly: bool,
        latency: Duration,
    );

    /// Correlated response for a data or control request.
    fn on_response(&mut self, opcode: OpCode, xid: i32, zxid: i64, error: i32, latency: Duration);

    /// Server-initiated watch notification (xid −1, never correlated).
    fn on_watch_event(
        &mut self,
        event_type: i32,
        client_state: i32,
        path: &str,
        zxid: i64,
        error: i32,
    );
}
