//! Synchronous-in-effect UDP request/reply caller for the router's backend
//! round-trips.
//!
//! One `call` sends one datagram and waits for exactly one reply with a
//! receive timeout. There is no retry and no cancellation message: a call
//! whose reply never arrives is reported as a timeout. A reply that arrives
//! after the caller gave up sits in the socket's receive buffer, so each call
//! drains the buffer before sending and accepts only datagrams from the
//! service it asked; a stale or misdirected datagram is never returned as
//! this call's reply. Each session owns its own requester socket, so replies
//! from concurrent sessions never interleave.

use super::{CommsError, MAX_MESSAGE};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::Instant;

pub struct UdpRequester {
    socket: UdpSocket,
    timeout: Duration,
}

impl UdpRequester {
    /// Binds a fresh ephemeral socket for one session's backend traffic.
    pub async fn bind_ephemeral(timeout: Duration) -> Result<Self, CommsError> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        Ok(Self { socket, timeout })
    }

    /// Sends `request` to `peer` and waits for one reply datagram from `peer`.
    pub async fn call(&self, peer: SocketAddr, request: &str) -> Result<String, CommsError> {
        // A late reply to an earlier call must not be taken as this call's.
        self.discard_pending();
        self.socket
            .send_to(request.as_bytes(), peer)
            .await
            .map_err(|e| CommsError::Send(peer, e))?;

        let deadline = Instant::now() + self.timeout;
        let mut buf = vec![0u8; MAX_MESSAGE];
        loop {
            let (len, from) = tokio::time::timeout_at(deadline, self.socket.recv_from(&mut buf))
                .await
                .map_err(|_| CommsError::ReplyTimeout(peer, self.timeout))??;
            // A datagram from anyone but the service we asked is not a reply.
            if from == peer {
                return Ok(String::from_utf8_lossy(&buf[..len]).into_owned());
            }
        }
    }

    /// Empties the receive buffer without blocking.
    fn discard_pending(&self) {
        let mut buf = vec![0u8; MAX_MESSAGE];
        while self.socket.try_recv_from(&mut buf).is_ok() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn call_gets_one_reply() {
        let responder = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let peer = responder.local_addr().unwrap();

        tokio::spawn(async move {
            let mut buf = [0u8; 128];
            let (len, from) = responder.recv_from(&mut buf).await.unwrap();
            assert_eq!(&buf[..len], b"QUOTE GOOG");
            responder.send_to(b"GOOG 100.000000", from).await.unwrap();
        });

        let requester = UdpRequester::bind_ephemeral(Duration::from_secs(2))
            .await
            .unwrap();
        let reply = requester.call(peer, "QUOTE GOOG").await.unwrap();
        assert_eq!(reply, "GOOG 100.000000");
    }

    #[tokio::test]
    async fn silent_peer_times_out() {
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let peer = silent.local_addr().unwrap();

        let requester = UdpRequester::bind_ephemeral(Duration::from_millis(50))
            .await
            .unwrap();
        let err = requester.call(peer, "QUOTE GOOG").await.unwrap_err();
        assert!(matches!(err, CommsError::ReplyTimeout(addr, _) if addr == peer));
    }

    #[tokio::test]
    async fn late_reply_from_a_timed_out_call_is_not_returned_by_the_next() {
        // Replies well after the requester's timeout has expired.
        let slow = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let slow_peer = slow.local_addr().unwrap();
        tokio::spawn(async move {
            let mut buf = [0u8; 128];
            let (_, from) = slow.recv_from(&mut buf).await.unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
            slow.send_to(b"GOOG 100.000000", from).await.unwrap();
        });

        let prompt = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let prompt_peer = prompt.local_addr().unwrap();
        tokio::spawn(async move {
            let mut buf = [0u8; 128];
            let (_, from) = prompt.recv_from(&mut buf).await.unwrap();
            prompt
                .send_to(b"BUY_CONFIRMED: 1 shares of TSLA at $250.000000", from)
                .await
                .unwrap();
        });

        let requester = UdpRequester::bind_ephemeral(Duration::from_millis(50))
            .await
            .unwrap();
        let err = requester.call(slow_peer, "QUOTE GOOG").await.unwrap_err();
        assert!(matches!(err, CommsError::ReplyTimeout(..)));

        // Let the stale reply land in the receive buffer.
        tokio::time::sleep(Duration::from_millis(150)).await;

        let reply = requester
            .call(prompt_peer, "BUY alice TSLA 1 250.000000")
            .await
            .unwrap();
        assert_eq!(reply, "BUY_CONFIRMED: 1 shares of TSLA at $250.000000");
    }

    #[tokio::test]
    async fn datagram_from_another_source_is_not_taken_as_the_reply() {
        let responder = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let peer = responder.local_addr().unwrap();
        tokio::spawn(async move {
            let mut buf = [0u8; 128];
            let (_, from) = responder.recv_from(&mut buf).await.unwrap();
            // A datagram from a different socket arrives first.
            let interloper = UdpSocket::bind("127.0.0.1:0").await.unwrap();
            interloper
                .send_to(b"ERROR: Stock not found", from)
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
            responder.send_to(b"GOOG 100.000000", from).await.unwrap();
        });

        let requester = UdpRequester::bind_ephemeral(Duration::from_secs(2))
            .await
            .unwrap();
        let reply = requester.call(peer, "QUOTE GOOG").await.unwrap();
        assert_eq!(reply, "GOOG 100.000000");
    }
}
