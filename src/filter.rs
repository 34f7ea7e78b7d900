//! Stats-emitting filter around the decoder.
//!
//! [`ZooKeeperFilter`] is the per-connection unit the proxy instantiates:
//! it owns one [`Decoder`] (and with it both residual buffers and the
//! inflight map) and translates semantic callbacks into counters and
//! structured logs. It observes traffic, it never withholds it.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::callbacks::{DecoderCallbacks, FilterStatus};
use crate::clock::SystemClock;
use crate::config::FilterConfig;
use crate::protocol::{CreateFlags, Decoder, OpCode};
use crate::stats::ProxyStats;

/// Per-connection tap filter.
pub struct ZooKeeperFilter {
    decoder: Decoder<StatsSink, SystemClock>,
}

impl ZooKeeperFilter {
    pub fn new(config: Arc<FilterConfig>, stats: Arc<ProxyStats>) -> Self {
        let max_packet_bytes = config.max_packet_bytes;
        let sink = StatsSink { config, stats };
        Self {
            decoder: Decoder::new(sink, max_packet_bytes, SystemClock::new()),
        }
    }

    /// Observe a chunk of client→server bytes.
    pub fn on_data(&mut self, data: &[u8]) -> FilterStatus {
        self.decoder.on_data(data)
    }

    /// Observe a chunk of server→client bytes.
    pub fn on_write(&mut self, data: &[u8]) -> FilterStatus {
        self.decoder.on_write(data)
    }

    /// Requests currently awaiting a response on this connection.
    pub fn pending_requests(&self) -> usize {
        self.decoder.pending_requests()
    }

    pub fn stats(&self) -> &ProxyStats {
        &self.decoder.callbacks().stats
    }
}

/// Callback sink translating decoded operations into stats and logs.
struct StatsSink {
    config: Arc<FilterConfig>,
    stats: Arc<ProxyStats>,
}

impl StatsSink {
    fn classify_latency(&self, opcode: OpCode, latency: Duration) {
        if !self.config.classifies_latency() {
            return;
        }
        let stat = self.stats.response(opcode);
        if latency <= self.config.latency_threshold(opcode) {
            stat.resp_fast.inc();
        } else {
            stat.resp_slow.inc();
        }
    }
}

impl DecoderCallbacks for StatsSink {
    fn on_decode_error(&mut self) {
        self.stats.decoder_error.inc();
        debug!(prefix = %self.config.stat_prefix, "decode error");
    }

    fn on_request_bytes(&mut self, n: usize) {
        self.stats.request_bytes.add(n as u64);
    }

    fn on_response_bytes(&mut self, n: usize) {
        self.stats.response_bytes.add(n as u64);
    }

    fn on_connect(&mut self, readonly: bool) {
        if readonly {
            self.stats.connect_readonly_rq.inc();
        } else {
            self.stats.connect_rq.inc();
        }
        debug!(opname = "connect", readonly);
    }

    fn on_ping(&mut self) {
        self.stats.request(OpCode::Ping).inc();
    }

    fn on_auth_request(&mut self, scheme: &str) {
        self.stats.auth_request(scheme).inc();
        debug!(opname = "auth", scheme);
    }

    fn on_get_data_request(&mut self, path: &str, watch: bool) {
        self.stats.request(OpCode::GetData).inc();
        debug!(opname = "getdata", path, watch);
    }

    fn on_create_request(&mut self, path: &str, flags: CreateFlags, opcode: OpCode) {
        self.stats.request(opcode).inc();
        debug!(opname = opcode.name(), path, create_type = flags.name());
    }

    fn on_set_request(&mut self, path: &str) {
        self.stats.request(OpCode::SetData).inc();
        debug!(opname = "setdata", path);
    }

    fn on_get_children_request(&mut self, path: &str, watch: bool, v2: bool) {
        let opcode = if v2 {
            OpCode::GetChildren2
        } else {
            OpCode::GetChildren
        };
        self.stats.request(opcode).inc();
        debug!(opname = opcode.name(), path, watch);
    }

    fn on_delete_request(&mut self, path: &str, version: i32) {
        self.stats.request(OpCode::Delete).inc();
        debug!(opname = "delete", path, version);
    }

    fn on_exists_request(&mut self, path: &str, watch: bool) {
        self.stats.request(OpCode::Exists).inc();
        debug!(opname = "exists", path, watch);
    }

    fn on_get_acl_request(&mut self, path: &str) {
        self.stats.request(OpCode::GetAcl).inc();
        debug!(opname = "getacl", path);
    }

    fn on_set_acl_request(&mut self, path: &str, version: i32) {
        self.stats.request(OpCode::SetAcl).inc();
        debug!(opname = "setacl", path, version);
    }

    fn on_sync_request(&mut self, path: &str) {
        self.stats.request(OpCode::Sync).inc();
        debug!(opname = "sync", path);
    }

    fn on_check_request(&mut self, _path: &str, _version: i32) {
        self.stats.request(OpCode::Check).inc();
    }

    fn on_multi_request(&mut self) {
        self.stats.request(OpCode::Multi).inc();
        debug!(opname = "multi");
    }

    fn on_reconfig_request(&mut self) {
        self.stats.request(OpCode::Reconfig).inc();
        debug!(opname = "reconfig");
    }

    fn on_set_watches_request(&mut self) {
        self.stats.request(OpCode::SetWatches).inc();
        debug!(opname = "setwatches");
    }

    fn on_check_watches_request(&mut self, path: &str, _watch_type: i32) {
        self.stats.request(OpCode::CheckWatches).inc();
        debug!(opname = "checkwatches", path);
    }

    fn on_remove_watches_request(&mut self, path: &str, _watch_type: i32) {
        self.stats.request(OpCode::RemoveWatches).inc();
        debug!(opname = "removewatches", path);
    }

    fn on_get_ephemerals_request(&mut self, path: &str) {
        self.stats.request(OpCode::GetEphemerals).inc();
        debug!(opname = "getephemerals", path);
    }

    fn on_get_all_children_number_request(&mut self, path: &str) {
        self.stats.request(OpCode::GetAllChildrenNumber).inc();
        debug!(opname = "getallchildrennumber", path);
    }

    fn on_close_request(&mut self) {
        self.stats.request(OpCode::Close).inc();
        debug!(opname = "close");
    }

    fn on_connect_response(
        &mut self,
        protocol_version: i32,
        timeout: i32,
        readonly: bool,
        latency: Duration,
    ) {
        self.stats.connect_resp.inc();
        self.classify_latency(OpCode::Connect, latency);
        debug!(
            opname = "connect_response",
            protocol_version,
            timeout,
            readonly,
            latency_ms = latency.as_millis() as u64
        );
    }

    fn on_response(&mut self, opcode: OpCode, xid: i32, zxid: i64, error: i32, latency: Duration) {
        self.stats.response(opcode).resp.inc();
        self.classify_latency(opcode, latency);
        debug!(
            opname = opcode.name(),
            xid,
            zxid,
            error,
            latency_ms = latency.as_millis() as u64
        );
    }

    fn on_watch_event(
        &mut self,
        event_type: i32,
        client_state: i32,
        path: &str,
        zxid: i64,
        error: i32,
    ) {
        self.stats.watch_event.inc();
        debug!(
            opname = "watch_event",
            event_type, client_state, path, zxid, error
        );
    }
}
