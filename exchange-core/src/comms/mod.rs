//! Transport plumbing for the two links in the system: the NUL-framed TCP
//! stream between client and router, and the one-request/one-reply UDP
//! exchange between router and backends.

pub mod framing;
pub mod udp;

use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Upper bound for a single frame or datagram.
pub const MAX_MESSAGE: usize = 64 * 1024;

#[derive(Error, Debug)]
pub enum CommsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("frame exceeds maximum size")]
    FrameTooLarge,
    #[error("send to {0} failed: {1}")]
    Send(SocketAddr, std::io::Error),
    #[error("no reply from {0} within {1:?}")]
    ReplyTimeout(SocketAddr, Duration),
}
