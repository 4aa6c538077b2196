//! Abstraction for the client side of a session (reading command frames,
//! writing reply frames). The TCP implementation is the production path;
//! tests drive the session with a scripted in-memory double.

use async_trait::async_trait;
use exchange_core::comms::framing::{read_frame, write_frame};
use exchange_core::comms::CommsError;
use tokio::io::BufReader;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

#[async_trait]
pub trait ClientTransport: Send {
    /// Receives the next frame from the client, or `None` on disconnect.
    async fn recv(&mut self) -> Result<Option<String>, CommsError>;

    /// Sends one reply frame to the client.
    async fn send(&mut self, frame: &str) -> Result<(), CommsError>;
}

/// NUL-framed TCP stream to one connected client.
pub struct TcpClientTransport {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl TcpClientTransport {
    pub fn new(stream: TcpStream) -> Self {
        let (read_half, write_half) = stream.into_split();
        Self {
            reader: BufReader::new(read_half),
            writer: write_half,
        }
    }
}

#[async_trait]
impl ClientTransport for TcpClientTransport {
    async fn recv(&mut self) -> Result<Option<String>, CommsError> {
        read_frame(&mut self.reader).await
    }

    async fn send(&mut self, frame: &str) -> Result<(), CommsError> {
        write_frame(&mut self.writer, frame).await
    }
}
