//! Fixed-format readers and writers for SOCKS5 messages
//!
//! Every read either yields the exact number of bytes requested or fails
//! with [`Socks5Error::IncompleteMessage`].

use crate::error::Socks5Error;
use bytes::BufMut;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Read exactly `N` bytes into a fixed array
pub async fn read_array<S, const N: usize>(stream: &mut S) -> Result<[u8; N], Socks5Error>
where
    S: AsyncRead + Unpin,
{
    let mut buf = [0u8; N];
    stream
        .read_exact(&mut buf)
        .await
        .map_err(Socks5Error::IncompleteMessage)?;
    Ok(buf)
}

/// Read exactly `len` bytes
pub async fn read_bytes<S>(stream: &mut S, len: usize) -> Result<Vec<u8>, Socks5Error>
where
    S: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; len];
    stream
        .read_exact(&mut buf)
        .await
        .map_err(Socks5Error::IncompleteMessage)?;
    Ok(buf)
}

/// Read one length byte followed by that many raw bytes
pub async fn read_length_prefixed<S>(stream: &mut S) -> Result<Vec<u8>, Socks5Error>
where
    S: AsyncRead + Unpin,
{
    let [len] = read_array::<_, 1>(stream).await?;
    read_bytes(stream, len as usize).await
}

/// Read a big-endian port
pub async fn read_port<S>(stream: &mut S) -> Result<u16, Socks5Error>
where
    S: AsyncRead + Unpin,
{
    let buf = read_array::<_, 2>(stream).await?;
    Ok(u16::from_be_bytes(buf))
}

/// Append a port in network byte order
pub fn put_port<B: BufMut>(buf: &mut B, port: u16) {
    buf.put_u16(port);
}
