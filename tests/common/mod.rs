//! Shared fixtures for the integration tests: a recording callback sink
//! and a framed-message builder.

// Each test binary uses a different subset of these fixtures.
#![allow(dead_code)]

use std::time::Duration;

use zktap::{CreateFlags, DecoderCallbacks, OpCode};

/// One observed callback, in firing order.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    DecodeError,
    RequestBytes(usize),
    ResponseBytes(usize),
    Connect {
        readonly: bool,
    },
    Ping,
    AuthRequest {
        scheme: String,
    },
    GetData {
        path: String,
        watch: bool,
    },
    Create {
        path: String,
        flags: CreateFlags,
        opcode: OpCode,
    },
    Set {
        path: String,
    },
    GetChildren {
        path: String,
        watch: bool,
        v2: bool,
    },
    Delete {
        path: String,
        version: i32,
    },
    Exists {
        path: String,
        watch: bool,
    },
    GetAcl {
        path: String,
    },
    SetAcl {
        path: String,
        version: i32,
    },
    Sync {
        path: String,
    },
    Check {
        path: String,
        version: i32,
    },
    Multi,
    Reconfig,
    SetWatches,
    CheckWatches {
        path: String,
        watch_type: i32,
    },
    RemoveWatches {
        path: String,
        watch_type: i32,
    },
    GetEphemerals {
        path: String,
    },
    GetAllChildrenNumber {
        path: String,
    },
    Close,
    ConnectResponse {
        protocol_version: i32,
        timeout: i32,
        readonly: bool,
    },
    Response {
        opcode: OpCode,
        xid: i32,
        zxid: i64,
        error: i32,
    },
    WatchEvent {
        event_type: i32,
        client_state: i32,
        path: String,
        zxid: i64,
        error: i32,
    },
}

/// Callback sink recording every event. Latencies are recorded separately
/// so event sequences stay comparable across runs.
#[derive(Debug, Default)]
pub struct Recorder {
    pub events: Vec<Event>,
    pub latencies: Vec<Duration>,
}

impl DecoderCallbacks for Recorder {
    fn on_decode_error(&mut self) {
        self.events.push(Event::DecodeError);
    }

    fn on_request_bytes(&mut self, n: usize) {
        self.events.push(Event::RequestBytes(n));
    }

    fn on_response_bytes(&mut self, n: usize) {
        self.events.push(Event::ResponseBytes(n));
    }

    fn on_connect(&mut self, readonly: bool) {
        self.events.push(Event::Connect { readonly });
    }

    fn on_ping(&mut self) {
        self.events.push(Event::Ping);
    }

    fn on_auth_request(&mut self, scheme: &str) {
        self.events.push(Event::AuthRequest {
            scheme: scheme.into(),
        });
    }

    fn on_get_data_request(&mut self, path: &str, watch: bool) {
        self.events.push(Event::GetData {
            path: path.into(),
            watch,
        });
    }

    fn on_create_request(&mut self, path: &str, flags: CreateFlags, opcode: OpCode) {
        self.events.push(Event::Create {
            path: path.into(),
            flags,
            opcode,
        });
    }

    fn on_set_request(&mut self, path: &str) {
        self.events.push(Event::Set { path: path.into() });
    }

    fn on_get_children_request(&mut self, path: &str, watch: bool, v2: bool) {
        self.events.push(Event::GetChildren {
            path: path.into(),
            watch,
            v2,
        });
    }

    fn on_delete_request(&mut self, path: &str, version: i32) {
        self.events.push(Event::Delete {
            path: path.into(),
            version,
        });
    }

    fn on_exists_request(&mut self, path: &str, watch: bool) {
        self.events.push(Event::Exists {
            path: path.into(),
            watch,
        });
    }

    fn on_get_acl_request(&mut self, path: &str) {
        self.events.push(Event::GetAcl { path: path.into() });
    }

    fn on_set_acl_request(&mut self, path: &str, version: i32) {
        self.events.push(Event::SetAcl {
            path: path.into(),
            version,
        });
    }

    fn on_sync_request(&mut self, path: &str) {
        self.events.push(Event::Sync { path: path.into() });
    }

    fn on_check_request(&mut self, path: &str, version: i32) {
        self.events.push(Event::Check {
            path: path.into(),
            version,
        });
    }

    fn on_multi_request(&mut self) {
        self.events.push(Event::Multi);
    }

    fn on_reconfig_request(&mut self) {
        self.events.push(Event::Reconfig);
    }

    fn on_set_watches_request(&mut self) {
        self.events.push(Event::SetWatches);
    }

    fn on_check_watches_request(&mut self, path: &str, watch_type: i32) {
        self.events.push(Event::CheckWatches {
            path: path.into(),
            watch_type,
        });
    }

    fn on_remove_watches_request(&mut self, path: &str, watch_type: i32) {
        self.events.push(Event::RemoveWatches {
            path: path.into(),
            watch_type,
        });
    }

    fn on_get_ephemerals_request(&mut self, path: &str) {
        self.events.push(Event::GetEphemerals { path: path.into() });
    }

    fn on_get_all_children_number_request(&mut self, path: &str) {
        self.events.push(Event::GetAllChildrenNumber { path: path.into() });
    }

    fn on_close_request(&mut self) {
        self.events.push(Event::Close);
    }

    fn on_connect_response(
        &mut self,
        protocol_version: i32,
        timeout: i32,
        readonly: bool,
        latency: Duration,
    ) {
        self.events.push(Event::ConnectResponse {
            protocol_version,
            timeout,
            readonly,
        });
        self.latencies.push(latency);
    }

    fn on_response(&mut self, opcode: OpCode, xid: i32, zxid: i64, error: i32, latency: Duration) {
        self.events.push(Event::Response {
            opcode,
            xid,
            zxid,
            error,
        });
        self.latencies.push(latency);
    }

    fn on_watch_event(
        &mut self,
        event_type: i32,
        client_state: i32,
        path: &str,
        zxid: i64,
        error: i32,
    ) {
        self.events.push(Event::WatchEvent {
            event_type,
            client_state,
            path: path.into(),
            zxid,
            error,
        });
    }
}

/// Builder for one framed message.
#[derive(Debug, Default)]
pub struct MessageBuilder {
    body: Vec<u8>,
}

pub fn msg() -> MessageBuilder {
    MessageBuilder::default()
}

impl MessageBuilder {
    pub fn i32(mut self, v: i32) -> Self {
        self.body.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn i64(mut self, v: i64) -> Self {
        self.body.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn bool(mut self, v: bool) -> Self {
        self.body.push(v as u8);
        self
    }

    pub fn string(mut self, s: &str) -> Self {
        self.body.extend_from_slice(&(s.len() as i32).to_be_bytes());
        self.body.extend_from_slice(s.as_bytes());
        self
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(bytes);
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + self.body.len());
        out.extend_from_slice(&(self.body.len() as i32).to_be_bytes());
        out.extend_from_slice(&self.body);
        out
    }
}
