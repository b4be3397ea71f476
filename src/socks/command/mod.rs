//! SOCKS5 command parsing module
//!
//! Handles parsing SOCKS5 requests and building replies.

mod parser;
mod reply;

pub use parser::parse_command;
pub use reply::{encode_reply, send_failure, send_reply, send_success};
