//! Test utilities for socks5d
//!
//! Shared helpers for integration tests: a local echo target, a running
//! proxy and a raw SOCKS5 client handshake.

#![allow(dead_code)]

use socks5d::config::ServerConfig;
use socks5d::Server;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Create a test TCP listener on an available port
pub async fn create_test_listener() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// Start a TCP echo server that half-closes after echoing to EOF
pub async fn start_echo_server() -> SocketAddr {
    let (listener, addr) = create_test_listener().await;

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (mut reader, mut writer) = stream.split();
                let _ = tokio::io::copy(&mut reader, &mut writer).await;
                let _ = writer.shutdown().await;
            });
        }
    });

    addr
}

/// A proxy running on an ephemeral loopback port
pub struct TestProxy {
    /// Listening address of the proxy
    pub addr: SocketAddr,
    shutdown_tx: broadcast::Sender<bool>,
    handle: JoinHandle<anyhow::Result<()>>,
}

impl TestProxy {
    /// Bind and start the proxy
    pub async fn start() -> Self {
        let config = ServerConfig {
            bind_addr: "127.0.0.1".to_string(),
            port: 0,
            connect_timeout: 2,
            ..Default::default()
        };
        let server = Server::bind(&config).await.unwrap();
        let addr = server.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(server.run(shutdown_rx));

        TestProxy {
            addr,
            shutdown_tx,
            handle,
        }
    }

    /// Stop the proxy and wait for it to exit
    pub async fn stop(self) {
        self.shutdown_tx.send(true).unwrap();
        self.handle.await.unwrap().unwrap();
    }
}

/// Mock SOCKS5 client messages
pub mod socks5_mock {
    use socks5d::socks::*;

    /// Create a no-auth method selection request
    pub fn create_auth_request_no_auth() -> Vec<u8> {
        vec![SOCKS5_VERSION, 1, SOCKS5_AUTH_METHOD_NONE]
    }

    /// Create a connect command to an IPv4 address
    pub fn create_connect_ipv4(ip: [u8; 4], port: u16) -> Vec<u8> {
        TargetAddr::ipv4(ip.into(), port).to_connect_request()
    }

    /// Create a connect command to a domain
    pub fn create_connect_domain(domain: &str, port: u16) -> Vec<u8> {
        TargetAddr::domain(domain, port).to_connect_request()
    }
}

/// Perform the handshake and a CONNECT, returning the raw reply
pub async fn socks5_connect(stream: &mut TcpStream, request: &[u8]) -> Vec<u8> {
    stream
        .write_all(&socks5_mock::create_auth_request_no_auth())
        .await
        .unwrap();
    let mut method = [0u8; 2];
    stream.read_exact(&mut method).await.unwrap();
    assert_eq!(method, [0x05, 0x00]);

    stream.write_all(request).await.unwrap();
    let mut header = [0u8; 4];
    stream.read_exact(&mut header).await.unwrap();
    let rest = match header[3] {
        0x04 => 16 + 2,
        _ => 4 + 2,
    };
    let mut reply = header.to_vec();
    reply.resize(4 + rest, 0);
    stream.read_exact(&mut reply[4..]).await.unwrap();
    reply
}
