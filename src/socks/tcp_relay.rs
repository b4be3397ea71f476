//! TCP relay for SOCKS5 CONNECT command
//!
//! Copies bytes between the client and the target until both directions
//! have drained.

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// Bytes moved by a finished relay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Bytes copied from `a` to `b`
    pub a_to_b: u64,
    /// Bytes copied from `b` to `a`
    pub b_to_a: u64,
}

/// Relay data bidirectionally between two streams
///
/// Both directions run concurrently. When one direction's source reaches
/// EOF (or fails) its destination is half-closed and the other direction
/// keeps running. Returns once both directions are done; errors are
/// per-direction and only logged.
pub async fn relay_tcp<A, B>(a: A, b: B) -> RelayStats
where
    A: AsyncRead + AsyncWrite + Unpin,
    B: AsyncRead + AsyncWrite + Unpin,
{
    let (mut a_read, mut a_write) = tokio::io::split(a);
    let (mut b_read, mut b_write) = tokio::io::split(b);

    let a_to_b = async {
        let result = tokio::io::copy(&mut a_read, &mut b_write).await;
        let _ = b_write.shutdown().await;
        match result {
            Ok(bytes) => {
                debug!("A->B finished: {} bytes", bytes);
                bytes
            }
            Err(e) => {
                debug!("A->B error: {}", e);
                0
            }
        }
    };

    let b_to_a = async {
        let result = tokio::io::copy(&mut b_read, &mut a_write).await;
        let _ = a_write.shutdown().await;
        match result {
            Ok(bytes) => {
                debug!("B->A finished: {} bytes", bytes);
                bytes
            }
            Err(e) => {
                debug!("B->A error: {}", e);
                0
            }
        }
    };

    let (a_to_b, b_to_a) = tokio::join!(a_to_b, b_to_a);

    RelayStats { a_to_b, b_to_a }
}
