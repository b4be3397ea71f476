//! SOCKS5 protocol constants
//!
//! Wire values used by the handshake, request and reply messages.

/// SOCKS5 protocol version
pub const SOCKS5_VERSION: u8 = 0x05;

// Authentication methods
/// No authentication required
pub const SOCKS5_AUTH_METHOD_NONE: u8 = 0x00;
/// No acceptable methods
pub const SOCKS5_AUTH_METHOD_NOT_ACCEPTABLE: u8 = 0xFF;

// Commands
/// TCP CONNECT command
pub const SOCKS5_CMD_TCP_CONNECT: u8 = 0x01;
/// TCP BIND command (recognised, never served)
pub const SOCKS5_CMD_TCP_BIND: u8 = 0x02;
/// UDP ASSOCIATE command (recognised, never served)
pub const SOCKS5_CMD_UDP_ASSOCIATE: u8 = 0x03;

// Address types
/// IPv4 address
pub const SOCKS5_ADDR_TYPE_IPV4: u8 = 0x01;
/// Domain name
pub const SOCKS5_ADDR_TYPE_DOMAIN: u8 = 0x03;
/// IPv6 address
pub const SOCKS5_ADDR_TYPE_IPV6: u8 = 0x04;

// Reserved byte
/// Reserved byte value (always 0x00)
pub const SOCKS5_RESERVED: u8 = 0x00;

/// Maximum domain name length (bounded by the one-byte length prefix)
pub const MAX_DOMAIN_LEN: usize = 255;

/// Read-ahead buffer size for the client side of a connection
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Length of a reply carrying an IPv4 bound address
pub const REPLY_LEN_IPV4: usize = 4 + 4 + 2;

/// Length of a reply carrying an IPv6 bound address
pub const REPLY_LEN_IPV6: usize = 4 + 16 + 2;
