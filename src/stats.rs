//! Counters for decoded traffic.
//!
//! One [`ProxyStats`] instance is shared by all connections of a listener.
//! Counters are plain relaxed atomics; per-opcode tables are built once at
//! startup by iterating the opcode enum, so the hot path is a map lookup
//! and a fetch-add.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use strum::IntoEnumIterator;

use crate::protocol::OpCode;

/// Auth schemes that get their own counter; anything else lands on
/// `unknown_scheme_rq`.
const BUILTIN_AUTH_SCHEMES: &[&str] = &["auth", "digest", "host", "ip", "world", "x509"];

/// A monotonically increasing counter.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    #[inline]
    pub fn inc(&self) {
        self.add(1);
    }

    #[inline]
    pub fn add(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub fn value(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Response counters for one opcode: total, plus the fast/slow split when
/// latency thresholds are configured.
#[derive(Debug, Default)]
pub struct ResponseStat {
    pub resp: Counter,
    pub resp_fast: Counter,
    pub resp_slow: Counter,
}

/// All counters exposed by the filter.
#[derive(Debug)]
pub struct ProxyStats {
    pub decoder_error: Counter,
    pub request_bytes: Counter,
    pub response_bytes: Counter,
    pub connect_rq: Counter,
    pub connect_readonly_rq: Counter,
    pub connect_resp: Counter,
    pub watch_event: Counter,
    pub unknown_scheme_rq: Counter,
    requests: HashMap<OpCode, Counter>,
    responses: HashMap<OpCode, ResponseStat>,
    auth_requests: HashMap<&'static str, Counter>,
}

impl ProxyStats {
    pub fn new() -> Self {
        Self {
            decoder_error: Counter::default(),
            request_bytes: Counter::default(),
            response_bytes: Counter::default(),
            connect_rq: Counter::default(),
            connect_readonly_rq: Counter::default(),
            connect_resp: Counter::default(),
            watch_event: Counter::default(),
            unknown_scheme_rq: Counter::default(),
            requests: OpCode::iter().map(|op| (op, Counter::default())).collect(),
            responses: OpCode::iter()
                .map(|op| (op, ResponseStat::default()))
                .collect(),
            auth_requests: BUILTIN_AUTH_SCHEMES
                .iter()
                .map(|s| (*s, Counter::default()))
                .collect(),
        }
    }

    /// Request counter for an opcode.
    pub fn request(&self, opcode: OpCode) -> &Counter {
        &self.requests[&opcode]
    }

    /// Response counters for an opcode.
    pub fn response(&self, opcode: OpCode) -> &ResponseStat {
        &self.responses[&opcode]
    }

    /// Per-scheme auth request counter, falling back to the
    /// unknown-scheme counter.
    pub fn auth_request(&self, scheme: &str) -> &Counter {
        self.auth_requests
            .get(scheme)
            .unwrap_or(&self.unknown_scheme_rq)
    }
}

impl Default for ProxyStats {
    fn default() -> Self {
        Self::new()
    }
}
