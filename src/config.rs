//! Filter and proxy configuration.
//!
//! Configuration is plain serde structs loaded from JSON. Everything has
//! a sensible default so an empty object is a valid filter config.

use std::time::Duration;

use serde::Deserialize;

use crate::error::Result;
use crate::protocol::{OpCode, DEFAULT_MAX_PACKET_BYTES};

/// Threshold applied when thresholds are configured but no explicit
/// default entry is present.
const DEFAULT_LATENCY_THRESHOLD: Duration = Duration::from_millis(100);

/// Latency threshold for one opcode, or the catch-all default when
/// `opcode` is omitted.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LatencyThreshold {
    #[serde(default)]
    pub opcode: Option<OpCode>,
    pub threshold_ms: u64,
}

impl LatencyThreshold {
    pub fn threshold(&self) -> Duration {
        Duration::from_millis(self.threshold_ms)
    }
}

/// Configuration for one tap filter instance.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterConfig {
    /// Prefix for emitted stats and log spans.
    pub stat_prefix: String,
    /// Hard ceiling for a frame's declared length.
    pub max_packet_bytes: u32,
    /// Optional fast/slow response classification. Empty disables it.
    pub latency_thresholds: Vec<LatencyThreshold>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            stat_prefix: "zookeeper".to_string(),
            max_packet_bytes: DEFAULT_MAX_PACKET_BYTES,
            latency_thresholds: Vec::new(),
        }
    }
}

impl FilterConfig {
    /// Parse a config from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Whether fast/slow classification is enabled at all.
    pub fn classifies_latency(&self) -> bool {
        !self.latency_thresholds.is_empty()
    }

    /// The catch-all threshold: the explicit default entry when present,
    /// 100 ms otherwise.
    pub fn default_latency_threshold(&self) -> Duration {
        self.latency_thresholds
            .iter()
            .find(|t| t.opcode.is_none())
            .map(LatencyThreshold::threshold)
            .unwrap_or(DEFAULT_LATENCY_THRESHOLD)
    }

    /// Threshold for an opcode, falling back to the catch-all.
    pub fn latency_threshold(&self, opcode: OpCode) -> Duration {
        self.latency_thresholds
            .iter()
            .find(|t| t.opcode == Some(opcode))
            .map(LatencyThreshold::threshold)
            .unwrap_or_else(|| self.default_latency_threshold())
    }
}

/// Configuration for the embedding TCP proxy.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProxyConfig {
    /// Address to accept client connections on.
    pub listen_addr: String,
    /// ZooKeeper server to forward to.
    pub upstream_addr: String,
    #[serde(default)]
    pub filter: FilterConfig,
}

impl ProxyConfig {
    /// Parse a config from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
