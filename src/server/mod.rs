//! Listening side of the proxy
//!
//! Accepts inbound TCP connections and runs one SOCKS5 handler task per
//! connection until shutdown.

use crate::config::ServerConfig;
use crate::error::ErrorCategory;
use crate::socks::handle_connection;
use crate::transport::{Dialer, SocketOpts, TcpDialer};
use anyhow::{Context, Result};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// SOCKS5 proxy server
#[derive(Debug)]
pub struct Server<D: Dialer = TcpDialer> {
    /// Bound listening socket
    listener: TcpListener,
    /// Shared outbound dialer
    dialer: Arc<D>,
    /// Options applied to every accepted stream
    socket_opts: SocketOpts,
}

impl Server<TcpDialer> {
    /// Bind the listening socket described by the configuration
    ///
    /// Fails if the address is invalid or cannot be bound.
    pub async fn bind(config: &ServerConfig) -> Result<Self> {
        let addr = config.listen_addr().map_err(|e| anyhow::anyhow!(e))?;
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to listen on {}", addr))?;

        Ok(Server::with_dialer(
            listener,
            TcpDialer::new(config),
            SocketOpts::from_tcp_config(&config.tcp),
        ))
    }
}

impl<D: Dialer> Server<D> {
    /// Create a server from an already bound listener and a custom dialer
    pub fn with_dialer(listener: TcpListener, dialer: D, socket_opts: SocketOpts) -> Self {
        Server {
            listener,
            dialer: Arc::new(dialer),
            socket_opts,
        }
    }

    /// Address the server is listening on
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until a shutdown signal is received
    ///
    /// Accept errors are logged and do not stop the loop. On shutdown all
    /// in-flight connection tasks are aborted, closing their streams.
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<bool>) -> Result<()> {
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                            continue;
                        }
                    };

                    debug!("Accepted connection from {}", peer);
                    self.socket_opts.hint(&stream);

                    let dialer = self.dialer.clone();
                    connections.spawn(async move {
                        match handle_connection(stream, &*dialer).await {
                            Ok(stats) => debug!(
                                "Connection from {} closed: {} bytes up, {} bytes down",
                                peer, stats.a_to_b, stats.b_to_a
                            ),
                            Err(e) => match e.source.category() {
                                ErrorCategory::Transport => {
                                    info!("Connection from {}: {}", peer, e)
                                }
                                category => {
                                    warn!("Connection from {} ({:?}): {}", peer, category, e)
                                }
                            },
                        }
                    });
                }
                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            error!("Connection task panicked: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping server");
                    break;
                }
            }
        }

        info!("Closing {} active connections", connections.len());
        connections.shutdown().await;

        info!("Server stopped");
        Ok(())
    }
}

/// Bind and run a server with the default TCP dialer
pub async fn run_server(
    config: &ServerConfig,
    shutdown_rx: broadcast::Receiver<bool>,
) -> Result<()> {
    let server = Server::bind(config).await?;
    info!("SOCKS5 proxy listening on {}", server.local_addr()?);
    server.run(shutdown_rx).await
}
