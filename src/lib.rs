//! # socks5d - Minimal SOCKS5 Proxy Server
//!
//! socks5d accepts inbound TCP connections, negotiates the SOCKS5 handshake
//! with the "no authentication" method, serves CONNECT requests to IPv4,
//! IPv6 and domain targets, and relays bytes in both directions with
//! half-close support.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use socks5d::config::ServerConfig;
//! use socks5d::server::run_server;
//! use tokio::sync::broadcast;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::default();
//!     let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
//!
//!     run_server(&config, shutdown_rx).await
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! SOCKS5 Client -> Server (accept) -> handle_connection -> Dialer -> Target
//! ```
//!
//! Each accepted connection runs on its own task and moves through
//! negotiation, request parsing, dialing and the reply before the relay
//! starts. BIND, UDP ASSOCIATE and authenticated methods are not served.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod server;
pub mod socks;
pub mod transport;

// Re-export commonly used items
pub use config::{load_config, Config, ServerConfig};
pub use error::{ConnectionError, Socks5Error, Socks5ReplyCode};
pub use server::{run_server, Server};

/// Version of the socks5d library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the application
pub const NAME: &str = env!("CARGO_PKG_NAME");
