//! SOCKS5 reply builder
//!
//! Constructs SOCKS5 reply messages.

use crate::error::{Socks5Error, Socks5ReplyCode};
use crate::socks::codec::put_port;
use crate::socks::consts::*;
use bytes::{BufMut, Bytes, BytesMut};
use std::net::{IpAddr, SocketAddr};
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Encode a SOCKS5 reply
///
/// # SOCKS5 Reply Format
///
/// ```text
/// +----+-----+-------+------+----------+----------+
/// |VER | REP |  RSV  | ATYP | BND.ADDR | BND.PORT |
/// +----+-----+-------+------+----------+----------+
/// | 1  |  1  | X'00' |  1   | Variable |    2     |
/// +----+-----+-------+------+----------+----------+
/// ```
///
/// Without a bound address the reply carries the all-zero IPv4 placeholder
/// `0.0.0.0:0`. IPv4-mapped IPv6 addresses are reported as IPv4.
pub fn encode_reply(reply_code: Socks5ReplyCode, bind_addr: Option<SocketAddr>) -> Bytes {
    let Some(bind_addr) = bind_addr else {
        let mut reply = BytesMut::with_capacity(REPLY_LEN_IPV4);
        reply.put_slice(&[SOCKS5_VERSION, reply_code.into(), SOCKS5_RESERVED]);
        reply.put_u8(SOCKS5_ADDR_TYPE_IPV4);
        reply.put_bytes(0, 4 + 2);
        return reply.freeze();
    };

    let ip = match bind_addr.ip() {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(IpAddr::V6(v6)),
        v4 => v4,
    };

    let mut reply = BytesMut::with_capacity(REPLY_LEN_IPV6);
    reply.put_slice(&[SOCKS5_VERSION, reply_code.into(), SOCKS5_RESERVED]);

    match ip {
        IpAddr::V4(v4) => {
            reply.put_u8(SOCKS5_ADDR_TYPE_IPV4);
            reply.put_slice(&v4.octets());
        }
        IpAddr::V6(v6) => {
            reply.put_u8(SOCKS5_ADDR_TYPE_IPV6);
            reply.put_slice(&v6.octets());
        }
    }
    put_port(&mut reply, bind_addr.port());

    reply.freeze()
}

/// Build and send a SOCKS5 reply
pub async fn send_reply<S>(
    stream: &mut S,
    reply_code: Socks5ReplyCode,
    bind_addr: Option<SocketAddr>,
) -> Result<(), Socks5Error>
where
    S: AsyncWrite + Unpin,
{
    let reply = encode_reply(reply_code, bind_addr);

    stream.write_all(&reply).await?;
    stream.flush().await?;

    Ok(())
}

/// Send a success reply carrying the outbound connection's local address
pub async fn send_success<S>(stream: &mut S, bind_addr: SocketAddr) -> Result<(), Socks5Error>
where
    S: AsyncWrite + Unpin,
{
    send_reply(stream, Socks5ReplyCode::Succeeded, Some(bind_addr)).await
}

/// Send a failure reply with the placeholder address
pub async fn send_failure<S>(stream: &mut S, reply_code: Socks5ReplyCode) -> Result<(), Socks5Error>
where
    S: AsyncWrite + Unpin,
{
    send_reply(stream, reply_code, None).await
}
