//! TCP dialer
//!
//! Opens plain TCP connections to CONNECT targets.

use super::{Dialer, SocketOpts};
use crate::config::ServerConfig;
use crate::socks::TargetAddr;
use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;

/// Dialer producing tuned [`TcpStream`]s
#[derive(Debug, Clone)]
pub struct TcpDialer {
    /// Socket options to apply to connections
    socket_opts: SocketOpts,
    /// Connection timeout, `None` waits for the OS
    connect_timeout: Option<Duration>,
}

impl TcpDialer {
    /// Create a new TCP dialer with default options
    pub fn with_defaults() -> Self {
        TcpDialer::new(&ServerConfig::default())
    }

    /// Create a dialer from the server configuration
    pub fn new(config: &ServerConfig) -> Self {
        TcpDialer {
            socket_opts: SocketOpts::from_tcp_config(&config.tcp),
            connect_timeout: config.connect_timeout(),
        }
    }

    async fn connect(target: &TargetAddr) -> io::Result<TcpStream> {
        match target {
            TargetAddr::Ip(addr) => TcpStream::connect(addr).await,
            TargetAddr::Domain(domain, port) => TcpStream::connect((domain.as_str(), *port)).await,
        }
    }
}

#[async_trait]
impl Dialer for TcpDialer {
    type Stream = TcpStream;

    async fn dial(&self, target: &TargetAddr) -> io::Result<TcpStream> {
        let stream = match self.connect_timeout {
            Some(timeout) => tokio::time::timeout(timeout, Self::connect(target))
                .await
                .map_err(|_| {
                    io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("connection to {} timed out", target),
                    )
                })??,
            None => Self::connect(target).await?,
        };

        self.socket_opts.hint(&stream);

        tracing::debug!("TCP connection established to {}", target);

        Ok(stream)
    }

    fn bound_addr(stream: &TcpStream) -> io::Result<SocketAddr> {
        stream.local_addr()
    }
}
