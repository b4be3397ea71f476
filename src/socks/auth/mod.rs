//! SOCKS5 authentication negotiation
//!
//! Only the "no authentication required" method is offered. Clients that do
//! not list it get an explicit rejection before the connection is dropped.

use super::codec::{read_array, read_bytes};
use super::consts::*;
use crate::error::Socks5Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// Perform the method-selection handshake
///
/// ```text
/// +----+----------+----------+        +----+--------+
/// |VER | NMETHODS | METHODS  |  --->  |VER | METHOD |
/// +----+----------+----------+        +----+--------+
/// | 1  |    1     | 1 to 255 |        | 1  |   1    |
/// +----+----------+----------+        +----+--------+
/// ```
///
/// Replies `[5, 0x00]` when the client offers no-auth. Otherwise replies
/// `[5, 0xFF]` and fails with [`Socks5Error::NoAcceptableMethod`]. A wrong
/// version fails before anything is written.
pub async fn negotiate<S>(stream: &mut S) -> Result<(), Socks5Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let [version, num_methods] = read_array::<_, 2>(stream).await?;

    if version != SOCKS5_VERSION {
        return Err(Socks5Error::UnsupportedVersion(version));
    }

    let methods = read_bytes(stream, num_methods as usize).await?;
    let selected = select_auth_method(&methods);

    let written = write_selection(stream, selected).await;

    if selected == SOCKS5_AUTH_METHOD_NOT_ACCEPTABLE {
        debug!("Rejected authentication methods: {:?}", methods);
        if let Err(e) = written {
            debug!("Failed to send method rejection: {}", e);
        }
        return Err(Socks5Error::NoAcceptableMethod);
    }

    written.map_err(Socks5Error::from)
}

async fn write_selection<S>(stream: &mut S, method: u8) -> std::io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(&[SOCKS5_VERSION, method]).await?;
    stream.flush().await
}

fn select_auth_method(methods: &[u8]) -> u8 {
    if methods.contains(&SOCKS5_AUTH_METHOD_NONE) {
        SOCKS5_AUTH_METHOD_NONE
    } else {
        SOCKS5_AUTH_METHOD_NOT_ACCEPTABLE
    }
}
