//! SOCKS5 module for socks5d
//!
//! This module implements the server side of the SOCKS5 protocol: the
//! no-authentication handshake, CONNECT request parsing, replies and the
//! TCP relay.

mod auth;
pub mod codec;
mod command;
mod consts;
mod handler;
mod tcp_relay;
mod types;

pub use auth::negotiate;
pub use command::{encode_reply, parse_command, send_failure, send_reply, send_success};
pub use consts::*;
pub use handler::handle_connection;
pub use tcp_relay::{relay_tcp, RelayStats};
pub use types::{ConnectionState, SocksCommand, TargetAddr};
