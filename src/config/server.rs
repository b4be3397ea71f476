//! Server configuration types
//!
//! Defines the main configuration structures for the proxy server.

use super::TcpConfig;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Default listening address
fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

/// Default listening port
fn default_port() -> u16 {
    50440
}

/// Default outbound connect timeout in seconds
fn default_connect_timeout() -> u64 {
    10
}

/// Root configuration structure
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

/// Proxy server configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "0.0.0.0" or "::")
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Outbound connect timeout in seconds, 0 disables it
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    /// Socket options for accepted and dialed connections
    #[serde(default)]
    pub tcp: TcpConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: default_bind_addr(),
            port: default_port(),
            connect_timeout: default_connect_timeout(),
            tcp: TcpConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Socket address to bind the listener to
    pub fn listen_addr(&self) -> Result<SocketAddr, String> {
        let ip: IpAddr = self
            .bind_addr
            .parse()
            .map_err(|_| format!("Invalid bind address: {}", self.bind_addr))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Outbound connect timeout, if enabled
    pub fn connect_timeout(&self) -> Option<Duration> {
        (self.connect_timeout > 0).then(|| Duration::from_secs(self.connect_timeout))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        self.listen_addr().map(|_| ())
    }
}
