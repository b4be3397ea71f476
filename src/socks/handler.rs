//! Main SOCKS5 handler
//!
//! Drives one accepted connection through negotiation, request parsing,
//! dialing, the reply and finally the relay.

use crate::error::{ConnectionError, Socks5Error, Socks5ReplyCode};
use crate::socks::auth::negotiate;
use crate::socks::command::{parse_command, send_failure, send_success};
use crate::socks::consts::DEFAULT_BUFFER_SIZE;
use crate::socks::tcp_relay::{relay_tcp, RelayStats};
use crate::socks::types::ConnectionState;
use crate::transport::Dialer;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info};

/// Handle SOCKS5 protocol on an accepted stream
///
/// # Protocol Flow
///
/// 1. `Handshaking`: method negotiation (rejection reply sent on failure)
/// 2. `ResolvingRequest`: CONNECT parsing (`GeneralFailure` reply on failure)
/// 3. `Dialing`: outbound connect (`HostUnreachable` reply on failure)
/// 4. `Replying`: success reply with the outbound local address
/// 5. `Relaying`: read-ahead client bytes go to the target first, then
///    both directions are copied until drained
///
/// Both streams are owned here and dropped on every return path. On
/// failure the returned error carries the phase that failed.
pub async fn handle_connection<S, D>(stream: S, dialer: &D) -> Result<RelayStats, ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
    D: Dialer,
{
    let mut client = BufReader::with_capacity(DEFAULT_BUFFER_SIZE, stream);

    debug!("Connection state: {}", ConnectionState::Handshaking);
    negotiate(&mut client)
        .await
        .map_err(|e| failed(ConnectionState::Handshaking, e))?;

    debug!("Connection state: {}", ConnectionState::ResolvingRequest);
    let target = match parse_command(&mut client).await {
        Ok(target) => target,
        Err(e) => {
            reply_failure(&mut client, Socks5ReplyCode::GeneralFailure).await;
            return Err(failed(ConnectionState::ResolvingRequest, e));
        }
    };

    debug!("Connection state: {} {}", ConnectionState::Dialing, target);
    let mut outbound = match dialer.dial(&target).await {
        Ok(stream) => stream,
        Err(source) => {
            reply_failure(&mut client, Socks5ReplyCode::HostUnreachable).await;
            let e = Socks5Error::Dial {
                target: target.to_string(),
                source,
            };
            return Err(failed(ConnectionState::Dialing, e));
        }
    };

    debug!("Connection state: {}", ConnectionState::Replying);
    let replied = match D::bound_addr(&outbound) {
        Ok(bound_addr) => send_success(&mut client, bound_addr)
            .await
            .map(|_| bound_addr),
        Err(e) => Err(e.into()),
    };
    let bound_addr = replied.map_err(|e| failed(ConnectionState::Replying, e))?;

    info!("SOCKS5 tunnel established to {} from {}", target, bound_addr);

    debug!("Connection state: {}", ConnectionState::Relaying);
    let pending = client.buffer();
    let pipelined = pending.len() as u64;
    if !pending.is_empty() {
        debug!("Forwarding {} pipelined bytes to {}", pipelined, target);
        outbound
            .write_all(pending)
            .await
            .map_err(|e| failed(ConnectionState::Relaying, e.into()))?;
    }

    let mut stats = relay_tcp(client.into_inner(), outbound).await;
    stats.a_to_b += pipelined;

    debug!(
        "Connection state: {} ({} bytes up, {} bytes down)",
        ConnectionState::Closed,
        stats.a_to_b,
        stats.b_to_a
    );

    Ok(stats)
}

/// Best-effort failure reply; the connection is dropped either way
async fn reply_failure<S>(client: &mut S, code: Socks5ReplyCode)
where
    S: AsyncWrite + Unpin,
{
    if let Err(e) = send_failure(client, code).await {
        debug!("Failed to send {:?} reply: {}", code, e);
    }
}

fn failed(state: ConnectionState, source: Socks5Error) -> ConnectionError {
    debug!("Connection state: {} while {}", ConnectionState::Failed, state);
    ConnectionError::new(state, source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use crate::socks::TargetAddr;
    use async_trait::async_trait;
    use std::io;
    use std::net::{Ipv4Addr, SocketAddr};
    use std::sync::{Arc, Mutex};
    use tokio::io::{duplex, AsyncReadExt, DuplexStream};

    const CONNECT_LOCALHOST_80: [u8; 10] =
        [0x05, 0x01, 0x00, 0x01, 0x7F, 0x00, 0x00, 0x01, 0x00, 0x50];

    /// Hands out one pre-connected in-memory stream
    #[derive(Debug)]
    struct MockDialer {
        upstream: Mutex<Option<DuplexStream>>,
        dialed: Mutex<Vec<TargetAddr>>,
    }

    impl MockDialer {
        fn new(upstream: DuplexStream) -> Arc<Self> {
            Arc::new(MockDialer {
                upstream: Mutex::new(Some(upstream)),
                dialed: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Dialer for MockDialer {
        type Stream = DuplexStream;

        async fn dial(&self, target: &TargetAddr) -> io::Result<DuplexStream> {
            self.dialed.lock().unwrap().push(target.clone());
            self.upstream
                .lock()
                .unwrap()
                .take()
                .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "already dialed"))
        }

        fn bound_addr(_stream: &DuplexStream) -> io::Result<SocketAddr> {
            Ok(SocketAddr::from((Ipv4Addr::LOCALHOST, 54321)))
        }
    }

    #[derive(Debug)]
    struct UnreachableDialer;

    #[async_trait]
    impl Dialer for UnreachableDialer {
        type Stream = DuplexStream;

        async fn dial(&self, _target: &TargetAddr) -> io::Result<DuplexStream> {
            Err(io::Error::new(io::ErrorKind::ConnectionRefused, "unreachable"))
        }

        fn bound_addr(_stream: &DuplexStream) -> io::Result<SocketAddr> {
            Err(io::Error::new(io::ErrorKind::NotConnected, "never connected"))
        }
    }

    #[tokio::test]
    async fn test_handle_connection_connect_and_relay() {
        let (mut client, server_side) = duplex(4096);
        let (mut target_peer, target_side) = duplex(4096);
        let dialer = MockDialer::new(target_side);

        let handler_dialer = dialer.clone();
        let handle =
            tokio::spawn(async move { handle_connection(server_side, &*handler_dialer).await });

        client.write_all(&[0x05, 0x01, 0x00]).await.unwrap();
        let mut method = [0u8; 2];
        client.read_exact(&mut method).await.unwrap();
        assert_eq!(method, [0x05, 0x00]);

        client.write_all(&CONNECT_LOCALHOST_80).await.unwrap();
        let mut reply = [0u8; 10];
        client.read_exact(&mut reply).await.unwrap();
        assert_eq!(
            reply,
            [0x05, 0x00, 0x00, 0x01, 0x7F, 0x00, 0x00, 0x01, 0xD4, 0x31]
        );

        client.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        target_peer.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");

        target_peer.write_all(b"pong!").await.unwrap();
        let mut buf = [0u8; 5];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"pong!");

        client.shutdown().await.unwrap();
        let mut rest = Vec::new();
        target_peer.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
        drop(target_peer);

        let stats = handle.await.unwrap().unwrap();
        assert_eq!(stats, RelayStats { a_to_b: 4, b_to_a: 5 });
        assert_eq!(
            dialer.dialed.lock().unwrap().as_slice(),
            &[TargetAddr::ipv4(Ipv4Addr::LOCALHOST, 80)]
        );
    }

    #[tokio::test]
    async fn test_handle_connection_forwards_pipelined_bytes() {
        let (mut client, server_side) = duplex(4096);
        let (mut target_peer, target_side) = duplex(4096);
        let dialer = MockDialer::new(target_side);

        let handle = tokio::spawn(async move { handle_connection(server_side, &*dialer).await });

        // Everything in one burst, before any reply was read
        let mut burst = vec![0x05, 0x01, 0x00];
        burst.extend_from_slice(&TargetAddr::domain("example.com", 443).to_connect_request());
        burst.extend_from_slice(b"early data");
        client.write_all(&burst).await.unwrap();

        let mut method = [0u8; 2];
        client.read_exact(&mut method).await.unwrap();
        assert_eq!(method, [0x05, 0x00]);
        let mut reply = [0u8; 10];
        client.read_exact(&mut reply).await.unwrap();
        assert_eq!(reply[1], 0x00);

        client.write_all(b" and more").await.unwrap();
        client.shutdown().await.unwrap();

        let mut received = Vec::new();
        target_peer.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"early data and more");
        drop(target_peer);

        let stats = handle.await.unwrap().unwrap();
        assert_eq!(stats.a_to_b, 19);
    }

    #[tokio::test]
    async fn test_handle_connection_rejects_auth() {
        let (mut client, server_side) = duplex(4096);
        let handle =
            tokio::spawn(async move { handle_connection(server_side, &UnreachableDialer).await });

        client.write_all(&[0x05, 0x01, 0x02]).await.unwrap();

        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        assert_eq!(response, vec![0x05, 0xFF]);

        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(err.state, ConnectionState::Handshaking);
        assert_eq!(err.source.category(), ErrorCategory::NoAcceptableMethod);
    }

    #[tokio::test]
    async fn test_handle_connection_bad_version_closes_silently() {
        let (mut client, server_side) = duplex(4096);
        let handle =
            tokio::spawn(async move { handle_connection(server_side, &UnreachableDialer).await });

        client.write_all(&[0x04, 0x01, 0x00]).await.unwrap();

        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        assert!(response.is_empty());

        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(err.state, ConnectionState::Handshaking);
        assert!(matches!(err.source, Socks5Error::UnsupportedVersion(4)));
    }

    #[tokio::test]
    async fn test_handle_connection_unsupported_command() {
        let (mut client, server_side) = duplex(4096);
        let (_target_peer, target_side) = duplex(4096);
        let dialer = MockDialer::new(target_side);

        let handler_dialer = dialer.clone();
        let handle =
            tokio::spawn(async move { handle_connection(server_side, &*handler_dialer).await });

        let mut request = CONNECT_LOCALHOST_80.to_vec();
        request[1] = 0x02;
        client.write_all(&[0x05, 0x01, 0x00]).await.unwrap();
        client.write_all(&request).await.unwrap();

        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        assert_eq!(
            response,
            vec![0x05, 0x00, 0x05, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
        );

        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(err.state, ConnectionState::ResolvingRequest);
        assert_eq!(err.source.category(), ErrorCategory::Protocol);
        assert!(dialer.dialed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_handle_connection_host_unreachable() {
        let (mut client, server_side) = duplex(4096);
        let handle =
            tokio::spawn(async move { handle_connection(server_side, &UnreachableDialer).await });

        client.write_all(&[0x05, 0x01, 0x00]).await.unwrap();
        client.write_all(&CONNECT_LOCALHOST_80).await.unwrap();

        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        assert_eq!(
            response,
            vec![0x05, 0x00, 0x05, 0x04, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
        );

        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(err.state, ConnectionState::Dialing);
        assert_eq!(err.source.category(), ErrorCategory::Transport);
    }

    #[tokio::test]
    async fn test_handle_connection_client_gone_before_reply() {
        let (mut client, server_side) = duplex(4096);
        let (mut target_peer, target_side) = duplex(4096);
        let dialer = MockDialer::new(target_side);

        let handle = tokio::spawn(async move { handle_connection(server_side, &*dialer).await });

        client.write_all(&[0x05, 0x01, 0x00]).await.unwrap();
        let mut method = [0u8; 2];
        client.read_exact(&mut method).await.unwrap();

        let mut request = CONNECT_LOCALHOST_80.to_vec();
        request.extend_from_slice(b"never relayed");
        client.write_all(&request).await.unwrap();
        drop(client);

        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(err.state, ConnectionState::Replying);

        // The outbound stream was released without receiving anything
        let mut received = Vec::new();
        target_peer.read_to_end(&mut received).await.unwrap();
        assert!(received.is_empty());
    }

    #[tokio::test]
    async fn test_handle_connection_failure_reply_to_departed_client() {
        let (mut client, server_side) = duplex(4096);
        let handle =
            tokio::spawn(async move { handle_connection(server_side, &UnreachableDialer).await });

        client.write_all(&[0x05, 0x01, 0x00]).await.unwrap();
        let mut method = [0u8; 2];
        client.read_exact(&mut method).await.unwrap();

        // Nobody is left to read the general failure reply
        let mut request = CONNECT_LOCALHOST_80.to_vec();
        request[1] = 0x03;
        client.write_all(&request).await.unwrap();
        drop(client);

        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(err.state, ConnectionState::ResolvingRequest);
        assert!(matches!(err.source, Socks5Error::UnsupportedCommand(0x03)));
    }
}
