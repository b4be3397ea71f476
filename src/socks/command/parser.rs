//! SOCKS5 command parser
//!
//! Parses SOCKS5 CONNECT requests from the client.

use crate::error::Socks5Error;
use crate::socks::codec::{read_array, read_length_prefixed, read_port};
use crate::socks::consts::*;
use crate::socks::types::{SocksCommand, TargetAddr};
use std::net::{Ipv4Addr, Ipv6Addr};
use tokio::io::AsyncRead;

/// Parse a SOCKS5 CONNECT request from the stream
///
/// # SOCKS5 Request Format
///
/// ```text
/// +----+-----+-------+------+----------+----------+
/// |VER | CMD |  RSV  | ATYP | DST.ADDR | DST.PORT |
/// +----+-----+-------+------+----------+----------+
/// | 1  |  1  | X'00' |  1   | Variable |    2     |
/// +----+-----+-------+------+----------+----------+
/// ```
///
/// Only CONNECT is accepted. Validation failures happen right after the
/// four-byte header, so nothing past the malformed field is consumed.
/// Domain names are returned unresolved.
pub async fn parse_command<S>(stream: &mut S) -> Result<TargetAddr, Socks5Error>
where
    S: AsyncRead + Unpin,
{
    let [version, cmd_byte, _reserved, addr_type] = read_array::<_, 4>(stream).await?;

    if version != SOCKS5_VERSION {
        return Err(Socks5Error::UnsupportedVersion(version));
    }

    match SocksCommand::from_byte(cmd_byte) {
        Some(SocksCommand::Connect) => {}
        _ => return Err(Socks5Error::UnsupportedCommand(cmd_byte)),
    }

    let target_addr = parse_address(stream, addr_type).await?;

    tracing::debug!("Parsed SOCKS5 {} to {}", SocksCommand::Connect, target_addr);

    Ok(target_addr)
}

/// Parse the address and port portion of a SOCKS5 request
async fn parse_address<S>(stream: &mut S, addr_type: u8) -> Result<TargetAddr, Socks5Error>
where
    S: AsyncRead + Unpin,
{
    match addr_type {
        SOCKS5_ADDR_TYPE_IPV4 => {
            let addr = read_array::<_, 4>(stream).await?;
            let port = read_port(stream).await?;
            Ok(TargetAddr::ipv4(Ipv4Addr::from(addr), port))
        }

        SOCKS5_ADDR_TYPE_DOMAIN => {
            let name = read_length_prefixed(stream).await?;
            let domain = String::from_utf8(name).map_err(|e| {
                Socks5Error::InvalidDomain(String::from_utf8_lossy(e.as_bytes()).into_owned())
            })?;
            let port = read_port(stream).await?;
            Ok(TargetAddr::domain(domain, port))
        }

        SOCKS5_ADDR_TYPE_IPV6 => {
            let addr = read_array::<_, 16>(stream).await?;
            let port = read_port(stream).await?;
            Ok(TargetAddr::ipv6(Ipv6Addr::from(addr), port))
        }

        _ => Err(Socks5Error::UnsupportedAddressType(addr_type)),
    }
}
