//! TCP proxy embedding the tap filter.
//!
//! The proxy forwards bytes verbatim in both directions and taps each
//! direction through a per-connection [`ZooKeeperFilter`]. Decoding never
//! gates forwarding: a decode error increments a counter and the bytes
//! still flow.
//!
//! Each connection runs in a single task, so a connection's decoder state
//! is never touched concurrently.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

use crate::config::{FilterConfig, ProxyConfig};
use crate::error::Result;
use crate::filter::ZooKeeperFilter;
use crate::stats::ProxyStats;

const READ_BUFFER_SIZE: usize = 16 * 1024;

/// Listener-level proxy: accepts clients, dials the upstream, and spawns
/// one forwarding task per connection.
pub struct ZooKeeperProxy {
    config: ProxyConfig,
    filter_config: Arc<FilterConfig>,
    stats: Arc<ProxyStats>,
}

impl ZooKeeperProxy {
    pub fn new(config: ProxyConfig) -> Self {
        Self {
            filter_config: Arc::new(config.filter.clone()),
            config,
            stats: Arc::new(ProxyStats::new()),
        }
    }

    /// Stats shared by every connection of this proxy.
    pub fn stats(&self) -> Arc<ProxyStats> {
        Arc::clone(&self.stats)
    }

    fn new_filter(&self) -> ZooKeeperFilter {
        ZooKeeperFilter::new(Arc::clone(&self.filter_config), Arc::clone(&self.stats))
    }

    /// Accept loop. Runs until the listener fails.
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(&self.config.listen_addr).await?;
        info!(addr = %self.config.listen_addr, upstream = %self.config.upstream_addr, "listening");

        loop {
            let (client, peer) = listener.accept().await?;
            debug!(%peer, "accepted connection");

            let upstream_addr = self.config.upstream_addr.clone();
            let filter = self.new_filter();
            tokio::spawn(async move {
                match TcpStream::connect(&upstream_addr).await {
                    Ok(upstream) => {
                        if let Err(e) = proxy_streams(client, upstream, filter).await {
                            debug!(%peer, "connection ended: {e}");
                        }
                    }
                    Err(e) => error!(%upstream_addr, "upstream connect failed: {e}"),
                }
            });
        }
    }
}

/// Forward bytes between `client` and `upstream`, tapping both directions
/// through `filter`. Returns when either side closes.
pub async fn proxy_streams<C, U>(client: C, upstream: U, mut filter: ZooKeeperFilter) -> Result<()>
where
    C: AsyncRead + AsyncWrite + Unpin,
    U: AsyncRead + AsyncWrite + Unpin,
{
    let (mut client_rd, mut client_wr) = tokio::io::split(client);
    let (mut upstream_rd, mut upstream_wr) = tokio::io::split(upstream);
    let mut request_buf = vec![0u8; READ_BUFFER_SIZE];
    let mut response_buf = vec![0u8; READ_BUFFER_SIZE];

    loop {
        tokio::select! {
            n = client_rd.read(&mut request_buf) => {
                let n = n?;
                if n == 0 {
                    break;
                }
                filter.on_data(&request_buf[..n]);
                upstream_wr.write_all(&request_buf[..n]).await?;
            }
            n = upstream_rd.read(&mut response_buf) => {
                let n = n?;
                if n == 0 {
                    break;
                }
                filter.on_write(&response_buf[..n]);
                client_wr.write_all(&response_buf[..n]).await?;
            }
        }
    }

    debug!(
        pending_requests = filter.pending_requests(),
        "closing connection"
    );
    Ok(())
}
