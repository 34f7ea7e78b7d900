//! # zktap
//!
//! ZooKeeper wire-protocol decoder for TCP proxies.
//!
//! zktap observes both directions of a client↔server ZooKeeper session,
//! reassembles packets split across TCP reads, parses framed request and
//! response messages, correlates responses to their originating requests
//! for latency measurement, and emits a semantic callback for every
//! recognized operation. It never modifies, withholds, or originates
//! traffic.
//!
//! ## Architecture
//!
//! - [`protocol`] - wire constants, byte cursor, message decoder, and
//!   stream reassembly
//! - [`callbacks`] - the [`DecoderCallbacks`] sink the decoder reports to
//! - [`filter`] - a per-connection sink that turns callbacks into stats
//! - [`proxy`] - a tokio TCP proxy embedding the filter end to end
//!
//! ## Example
//!
//! ```ignore
//! use zktap::{ProxyConfig, ZooKeeperProxy};
//!
//! #[tokio::main]
//! async fn main() -> zktap::Result<()> {
//!     let config = ProxyConfig::from_json(
//!         r#"{ "listen_addr": "127.0.0.1:2181", "upstream_addr": "zk1:2181" }"#,
//!     )?;
//!     ZooKeeperProxy::new(config).run().await
//! }
//! ```

pub mod callbacks;
pub mod clock;
pub mod config;
pub mod error;
pub mod filter;
pub mod protocol;
pub mod proxy;
pub mod stats;

pub use callbacks::{DecoderCallbacks, FilterStatus};
pub use config::{FilterConfig, ProxyConfig};
pub use error::{Result, TapError};
pub use filter::ZooKeeperFilter;
pub use protocol::{CreateFlags, Decoder, OpCode, XidCode};
pub use proxy::ZooKeeperProxy;
pub use stats::ProxyStats;
