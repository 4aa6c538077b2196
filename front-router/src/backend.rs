//! The router's seam towards the three backend services.
//!
//! Every backend interaction is one request and one reply; the trait keeps
//! the orchestration in [`crate::session`] testable against recording doubles.
//! The UDP implementation binds one socket per session, so a session's
//! replies can never interleave with another session's.

use async_trait::async_trait;
use exchange_core::comms::udp::UdpRequester;
use exchange_core::comms::CommsError;
use log::debug;
use std::net::SocketAddr;
use std::time::Duration;

#[async_trait]
pub trait BackendExchange: Send + Sync {
    async fn call_credential(&self, request: &str) -> Result<String, CommsError>;
    async fn call_quote(&self, request: &str) -> Result<String, CommsError>;
    async fn call_ledger(&self, request: &str) -> Result<String, CommsError>;
}

pub struct UdpBackendExchange {
    requester: UdpRequester,
    credential_addr: SocketAddr,
    quote_addr: SocketAddr,
    ledger_addr: SocketAddr,
}

impl UdpBackendExchange {
    /// Binds a fresh requester socket for one session.
    pub async fn connect(
        credential_addr: SocketAddr,
        quote_addr: SocketAddr,
        ledger_addr: SocketAddr,
        timeout: Duration,
    ) -> Result<Self, CommsError> {
        Ok(Self {
            requester: UdpRequester::bind_ephemeral(timeout).await?,
            credential_addr,
            quote_addr,
            ledger_addr,
        })
    }

    async fn call(&self, peer: SocketAddr, request: &str) -> Result<String, CommsError> {
        debug!("-> {}: {}", peer, request);
        let reply = self.requester.call(peer, request).await?;
        debug!("<- {}: {}", peer, reply);
        Ok(reply)
    }
}

#[async_trait]
impl BackendExchange for UdpBackendExchange {
    async fn call_credential(&self, request: &str) -> Result<String, CommsError> {
        self.call(self.credential_addr, request).await
    }

    async fn call_quote(&self, request: &str) -> Result<String, CommsError> {
        self.call(self.quote_addr, request).await
    }

    async fn call_ledger(&self, request: &str) -> Result<String, CommsError> {
        self.call(self.ledger_addr, request).await
    }
}
