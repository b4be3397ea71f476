//! Error types for socks5d
//!
//! Protocol and transport errors raised while serving a single SOCKS5
//! connection, plus the reply codes sent back to clients.

use crate::socks::ConnectionState;
use std::io;
use thiserror::Error;

/// SOCKS5 specific errors
#[derive(Error, Debug)]
pub enum Socks5Error {
    /// Unsupported SOCKS version
    #[error("Unsupported SOCKS version: {0}")]
    UnsupportedVersion(u8),

    /// Client offered no acceptable authentication method
    #[error("No acceptable authentication method")]
    NoAcceptableMethod,

    /// Command not supported
    #[error("Command not supported: {0}")]
    UnsupportedCommand(u8),

    /// Address type not supported
    #[error("Address type not supported: {0}")]
    UnsupportedAddressType(u8),

    /// Domain name bytes are not a valid host name string
    #[error("Invalid domain name: {0}")]
    InvalidDomain(String),

    /// The stream ended or failed before a full message was read
    #[error("Incomplete message: {0}")]
    IncompleteMessage(#[source] io::Error),

    /// Outbound connection could not be established
    #[error("Failed to connect to {target}: {source}")]
    Dial {
        /// Destination that was dialed
        target: String,
        /// Underlying connect error
        #[source]
        source: io::Error,
    },

    /// IO error while writing to a stream
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Coarse classification of [`Socks5Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed or unsupported version, command or address type
    Protocol,
    /// Read, write or dial failure on either stream
    Transport,
    /// Client offered no usable authentication method
    NoAcceptableMethod,
}

impl Socks5Error {
    /// Classify the error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Socks5Error::UnsupportedVersion(_)
            | Socks5Error::UnsupportedCommand(_)
            | Socks5Error::UnsupportedAddressType(_)
            | Socks5Error::InvalidDomain(_) => ErrorCategory::Protocol,
            Socks5Error::NoAcceptableMethod => ErrorCategory::NoAcceptableMethod,
            Socks5Error::IncompleteMessage(_) | Socks5Error::Dial { .. } | Socks5Error::Io(_) => {
                ErrorCategory::Transport
            }
        }
    }
}

/// A connection that ended in the `Failed` state
#[derive(Error, Debug)]
#[error("SOCKS5 connection failed while {state}: {source}")]
pub struct ConnectionError {
    /// Phase the connection was in when it failed
    pub state: ConnectionState,
    /// What went wrong
    #[source]
    pub source: Socks5Error,
}

impl ConnectionError {
    /// Create a new connection error for the given phase
    pub fn new(state: ConnectionState, source: Socks5Error) -> Self {
        ConnectionError { state, source }
    }
}

/// Reply codes for SOCKS5 protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Socks5ReplyCode {
    /// Command succeeded
    Succeeded = 0x00,
    /// General SOCKS server failure
    GeneralFailure = 0x01,
    /// Connection not allowed by ruleset
    ConnectionNotAllowed = 0x02,
    /// Network unreachable
    NetworkUnreachable = 0x03,
    /// Host unreachable
    HostUnreachable = 0x04,
    /// Connection refused
    ConnectionRefused = 0x05,
    /// TTL expired
    TtlExpired = 0x06,
    /// Command not supported
    CommandNotSupported = 0x07,
    /// Address type not supported
    AddressTypeNotSupported = 0x08,
}

impl From<Socks5ReplyCode> for u8 {
    fn from(code: Socks5ReplyCode) -> Self {
        code as u8
    }
}
