//! Transport module for socks5d
//!
//! Socket tuning for accepted and dialed TCP streams, and the dialer
//! abstraction used to open outbound connections.

mod tcp;

pub use tcp::TcpDialer;

use crate::config::TcpConfig;
use crate::socks::TargetAddr;
use async_trait::async_trait;
use std::fmt::Debug;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// Socket options for configuring connections
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketOpts {
    /// Enable TCP_NODELAY
    pub nodelay: bool,
    /// Idle time before the first keepalive probe, in seconds
    pub keepalive_secs: Option<u64>,
    /// Interval between keepalive probes, in seconds
    pub keepalive_interval: Option<u64>,
}

impl Default for SocketOpts {
    fn default() -> Self {
        SocketOpts::from_tcp_config(&TcpConfig::default())
    }
}

impl SocketOpts {
    /// Create socket options from TCP config
    ///
    /// A zero keepalive value disables keepalive probing.
    pub fn from_tcp_config(config: &TcpConfig) -> Self {
        let non_zero = |secs: u64| (secs > 0).then_some(secs);
        SocketOpts {
            nodelay: config.nodelay,
            keepalive_secs: non_zero(config.keepalive_secs),
            keepalive_interval: non_zero(config.keepalive_interval),
        }
    }

    /// Apply socket options to a TCP stream
    pub fn apply(&self, stream: &TcpStream) -> io::Result<()> {
        stream.set_nodelay(self.nodelay)?;

        if let (Some(timeout), Some(interval)) = (self.keepalive_secs, self.keepalive_interval) {
            let socket = socket2::SockRef::from(stream);
            let keepalive = socket2::TcpKeepalive::new()
                .with_time(Duration::from_secs(timeout))
                .with_interval(Duration::from_secs(interval));
            socket.set_tcp_keepalive(&keepalive)?;
        }

        Ok(())
    }

    /// Apply socket options, logging instead of failing
    pub fn hint(&self, stream: &TcpStream) {
        if let Err(e) = self.apply(stream) {
            tracing::warn!("Failed to apply socket options: {}", e);
        }
    }
}

/// Outbound connection capability
///
/// Implementations open a stream to a CONNECT target. Domain names are
/// resolved here, never by the request parser.
#[async_trait]
pub trait Dialer: Debug + Send + Sync + 'static {
    /// The stream type produced by this dialer
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Connect to the target
    async fn dial(&self, target: &TargetAddr) -> io::Result<Self::Stream>;

    /// Local endpoint of an established stream, reported to the client
    fn bound_addr(stream: &Self::Stream) -> io::Result<SocketAddr>;
}
