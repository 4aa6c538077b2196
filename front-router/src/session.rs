//! Per-session command dispatch and the trade orchestration state machines.
//!
//! One `Session` owns one client connection end to end: it reads one command
//! frame at a time, runs the backend call sequence for that command to
//! completion, and only then reads the next command. Nothing here is
//! concurrent within a session, which is what makes the confirmation
//! round-trip in the middle of a buy/sell a plain awaited read.
//!
//! Failure policy: a backend that does not reply fails only the in-progress
//! command (one error frame to the client, no retry, no rollback of the steps
//! that already completed). Backend-reported `ERROR:` replies are domain
//! outcomes and are forwarded, not treated as failures.

use crate::backend::BackendExchange;
use crate::transport::ClientTransport;
use anyhow::Result;
use exchange_core::cipher::obfuscate;
use exchange_core::comms::CommsError;
use exchange_core::protocol::{
    format_money, format_price, is_error_reply, parse_portfolio_reply, parse_quote_reply,
    BackendRequest, ProtocolError,
};
use log::{debug, info, warn};

/// Whether the session loop keeps reading commands after a handler returns.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Flow {
    Continue,
    Disconnect,
}

pub struct Session<T, B> {
    transport: T,
    backend: B,
    /// Present once an `AUTH` round-trip has succeeded.
    username: Option<String>,
}

impl<T: ClientTransport, B: BackendExchange> Session<T, B> {
    pub fn new(transport: T, backend: B) -> Self {
        Self {
            transport,
            backend,
            username: None,
        }
    }

    /// Runs the session until the client disconnects.
    pub async fn run(mut self) -> Result<()> {
        while let Some(line) = self.transport.recv().await? {
            if self.dispatch(&line).await? == Flow::Disconnect {
                break;
            }
        }
        info!(
            "session closed{}",
            self.username
                .as_deref()
                .map(|u| format!(" for {}", u))
                .unwrap_or_default()
        );
        Ok(())
    }

    async fn dispatch(&mut self, line: &str) -> Result<Flow> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.as_slice() {
            ["AUTH", username, password] => self.handle_auth(username, password).await,
            ["quote"] => self.handle_quote(None).await,
            ["quote", symbol] => self.handle_quote(Some(symbol)).await,
            ["buy", symbol, shares] => self.handle_buy(symbol, shares).await,
            ["sell", symbol, shares] => self.handle_sell(symbol, shares).await,
            ["position"] => self.handle_position().await,
            _ => {
                self.transport
                    .send("ERROR: Unknown command or incorrect format")
                    .await?;
                Ok(Flow::Continue)
            }
        }
    }

    /// Obfuscates the password and asks the credential service to verify.
    /// The session records the username only on `AUTH_SUCCESS`; on anything
    /// else (including an unreachable credential service) the client is told
    /// the authentication failed and may try again.
    async fn handle_auth(&mut self, username: &str, password: &str) -> Result<Flow> {
        info!("received credentials for {}", username);
        let request = BackendRequest::Auth {
            username: username.to_string(),
            obfuscated: obfuscate(password),
        };
        let verdict = match self.backend.call_credential(&request.to_string()).await {
            Ok(reply) if reply == "AUTH_SUCCESS" => {
                self.username = Some(username.to_string());
                info!("{} authenticated", username);
                "AUTH_SUCCESS"
            }
            Ok(_) => {
                info!("authentication failed for {}", username);
                "AUTH_FAILED"
            }
            Err(e) => {
                warn!("credential service unreachable: {}", e);
                "AUTH_FAILED"
            }
        };
        self.transport.send(verdict).await?;
        Ok(Flow::Continue)
    }

    async fn handle_quote(&mut self, symbol: Option<&str>) -> Result<Flow> {
        let Some(username) = self.authenticated().await? else {
            return Ok(Flow::Continue);
        };
        info!("quote request from {}", username);

        let request = BackendRequest::Quote {
            symbol: symbol.map(str::to_string),
        };
        match self.backend.call_quote(&request.to_string()).await {
            Ok(reply) => self.transport.send(&reply).await?,
            Err(e) => {
                warn!("quote service unreachable: {}", e);
                self.transport.send("ERROR: Failed to get quote").await?;
            }
        }
        Ok(Flow::Continue)
    }

    /// Buy: QUOTE, client confirmation, BUY, ADVANCE, relay.
    async fn handle_buy(&mut self, symbol: &str, shares: &str) -> Result<Flow> {
        let Some(username) = self.authenticated().await? else {
            return Ok(Flow::Continue);
        };
        let Some(shares) = parse_share_count(shares) else {
            self.transport
                .send("ERROR: Invalid number of shares")
                .await?;
            return Ok(Flow::Continue);
        };
        info!("buy request from {}: {} x {}", username, shares, symbol);

        // Step 1: price the trade.
        let quote_request = BackendRequest::Quote {
            symbol: Some(symbol.to_string()),
        };
        let quote_reply = match self.backend.call_quote(&quote_request.to_string()).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("quote for buy failed: {}", e);
                self.transport
                    .send("ERROR: Failed to get quote for buy")
                    .await?;
                return Ok(Flow::Continue);
            }
        };
        if is_error_reply(&quote_reply) {
            self.transport.send(&quote_reply).await?;
            return Ok(Flow::Continue);
        }
        let Ok((_, price)) = parse_quote_reply(&quote_reply) else {
            self.transport.send("ERROR: Invalid quote response").await?;
            return Ok(Flow::Continue);
        };

        // Step 2: the client is the synchronous peer for exactly one frame.
        let total = price * shares as f64;
        let prompt = format!(
            "BUY CONFIRM: {} {} shares at ${} = ${}",
            symbol,
            shares,
            format_money(price),
            format_money(total)
        );
        self.transport.send(&prompt).await?;
        let Some(answer) = self.transport.recv().await? else {
            info!("client disconnected during buy confirmation");
            return Ok(Flow::Disconnect);
        };
        if !is_affirmative(&answer) {
            info!("buy declined by {}", username);
            self.transport.send("Buy transaction cancelled").await?;
            return Ok(Flow::Continue);
        }

        // Step 3: mutate the ledger.
        let buy_request = BackendRequest::Buy {
            username,
            symbol: symbol.to_string(),
            shares,
            price,
        };
        let ledger_reply = match self.backend.call_ledger(&buy_request.to_string()).await {
            Ok(reply) => reply,
            Err(e @ CommsError::Send(..)) => {
                warn!("buy dispatch failed: {}", e);
                self.transport.send("ERROR: Failed to process buy").await?;
                return Ok(Flow::Continue);
            }
            Err(e) => {
                warn!("buy confirmation failed: {}", e);
                self.transport.send("ERROR: Failed to confirm buy").await?;
                return Ok(Flow::Continue);
            }
        };

        // Step 4: time moves forward, but only for a trade that completed.
        if !is_error_reply(&ledger_reply) {
            self.advance_cursor(symbol).await;
        }

        self.transport.send(&ledger_reply).await?;
        Ok(Flow::Continue)
    }

    /// Sell: QUOTE, CHECK, client confirmation, SELL, ADVANCE, relay.
    /// The sufficiency check runs before the prompt so the client is never
    /// asked to confirm a sale it cannot make.
    async fn handle_sell(&mut self, symbol: &str, shares: &str) -> Result<Flow> {
        let Some(username) = self.authenticated().await? else {
            return Ok(Flow::Continue);
        };
        let Some(shares) = parse_share_count(shares) else {
            self.transport
                .send("ERROR: Invalid number of shares")
                .await?;
            return Ok(Flow::Continue);
        };
        info!("sell request from {}: {} x {}", username, shares, symbol);

        let quote_request = BackendRequest::Quote {
            symbol: Some(symbol.to_string()),
        };
        let quote_reply = match self.backend.call_quote(&quote_request.to_string()).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("quote for sell failed: {}", e);
                self.transport
                    .send("ERROR: Failed to get quote for sell")
                    .await?;
                return Ok(Flow::Continue);
            }
        };
        if is_error_reply(&quote_reply) {
            self.transport.send(&quote_reply).await?;
            return Ok(Flow::Continue);
        }
        let Ok((_, price)) = parse_quote_reply(&quote_reply) else {
            self.transport.send("ERROR: Invalid quote response").await?;
            return Ok(Flow::Continue);
        };

        let check_request = BackendRequest::Check {
            username: username.clone(),
            symbol: symbol.to_string(),
            shares,
        };
        let check_reply = match self.backend.call_ledger(&check_request.to_string()).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("share check failed: {}", e);
                self.transport.send("ERROR: Failed to check shares").await?;
                return Ok(Flow::Continue);
            }
        };
        match check_reply.as_str() {
            "SUFFICIENT_SHARES" => {}
            "INSUFFICIENT_SHARES" => {
                self.transport
                    .send("ERROR: You do not have enough shares to sell")
                    .await?;
                return Ok(Flow::Continue);
            }
            other => {
                warn!("unexpected share check reply: {}", other);
                self.transport.send("ERROR: Failed to check shares").await?;
                return Ok(Flow::Continue);
            }
        }

        let total = price * shares as f64;
        let prompt = format!(
            "SELL CONFIRM: {} {} shares at ${} = ${}",
            symbol,
            shares,
            format_money(price),
            format_money(total)
        );
        self.transport.send(&prompt).await?;
        let Some(answer) = self.transport.recv().await? else {
            info!("client disconnected during sell confirmation");
            return Ok(Flow::Disconnect);
        };
        if !is_affirmative(&answer) {
            // The ledger is not told about a decline; nothing changed there.
            info!("sell declined by {}", username);
            self.transport.send("Sell transaction cancelled").await?;
            return Ok(Flow::Continue);
        }

        let sell_request = BackendRequest::Sell {
            username,
            symbol: symbol.to_string(),
            shares,
            price,
        };
        let ledger_reply = match self.backend.call_ledger(&sell_request.to_string()).await {
            Ok(reply) => reply,
            Err(e @ CommsError::Send(..)) => {
                warn!("sell dispatch failed: {}", e);
                self.transport.send("ERROR: Failed to process sell").await?;
                return Ok(Flow::Continue);
            }
            Err(e) => {
                warn!("sell confirmation failed: {}", e);
                self.transport.send("ERROR: Failed to confirm sell").await?;
                return Ok(Flow::Continue);
            }
        };

        if !is_error_reply(&ledger_reply) {
            self.advance_cursor(symbol).await;
        }

        self.transport.send(&ledger_reply).await?;
        Ok(Flow::Continue)
    }

    /// Position: PORTFOLIO snapshot, then one QUOTE per holding; a symbol
    /// whose quote cannot be obtained is skipped from the aggregate rather
    /// than failing the whole report.
    async fn handle_position(&mut self) -> Result<Flow> {
        let Some(username) = self.authenticated().await? else {
            return Ok(Flow::Continue);
        };
        info!("position request from {}", username);

        let portfolio_request = BackendRequest::Portfolio {
            username: username.clone(),
        };
        let portfolio_reply = match self
            .backend
            .call_ledger(&portfolio_request.to_string())
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!("portfolio fetch failed: {}", e);
                self.transport
                    .send("ERROR: Failed to get portfolio")
                    .await?;
                return Ok(Flow::Continue);
            }
        };
        let holdings = match parse_portfolio_reply(&portfolio_reply) {
            Ok(holdings) => holdings,
            Err(ProtocolError::Empty) => {
                self.transport
                    .send("ERROR: Empty portfolio response")
                    .await?;
                return Ok(Flow::Continue);
            }
            Err(_) => {
                self.transport
                    .send("ERROR: Invalid portfolio response")
                    .await?;
                return Ok(Flow::Continue);
            }
        };

        let mut report = String::new();
        let mut total_gain = 0.0;
        for holding in holdings {
            if holding.shares == 0 {
                continue;
            }
            let quote_request = BackendRequest::Quote {
                symbol: Some(holding.symbol.clone()),
            };
            let quote_reply = match self.backend.call_quote(&quote_request.to_string()).await {
                Ok(reply) => reply,
                Err(e) => {
                    warn!("skipping {} in position report: {}", holding.symbol, e);
                    continue;
                }
            };
            if is_error_reply(&quote_reply) {
                debug!("skipping {}: {}", holding.symbol, quote_reply);
                continue;
            }
            let Ok((symbol, current_price)) = parse_quote_reply(&quote_reply) else {
                continue;
            };
            if symbol != holding.symbol {
                continue;
            }
            total_gain += holding.shares as f64 * (current_price - holding.avg_price);
            report.push_str(&format!(
                "{} {} {}\n",
                holding.symbol,
                holding.shares,
                format_price(holding.avg_price)
            ));
        }
        report.push_str(&format!(
            "Total unrealized gain/loss: ${}",
            format_price(total_gain)
        ));

        self.transport.send(&report).await?;
        Ok(Flow::Continue)
    }

    /// Session-state guard run before every non-AUTH command. Replies and
    /// yields `None` when no authenticated username is recorded; no backend
    /// is contacted in that case.
    async fn authenticated(&mut self) -> Result<Option<String>> {
        match &self.username {
            Some(username) => Ok(Some(username.clone())),
            None => {
                self.transport.send("ERROR: Not authenticated").await?;
                Ok(None)
            }
        }
    }

    /// Fire the post-trade ADVANCE. The acknowledgement is awaited and
    /// discarded; a missing acknowledgement is logged, not surfaced, because
    /// the trade itself already completed.
    async fn advance_cursor(&mut self, symbol: &str) {
        let request = BackendRequest::Advance {
            symbol: symbol.to_string(),
        };
        match self.backend.call_quote(&request.to_string()).await {
            Ok(ack) => debug!("advance ack: {}", ack),
            Err(e) => warn!("advance for {} got no acknowledgement: {}", symbol, e),
        }
    }
}

fn parse_share_count(raw: &str) -> Option<u32> {
    match raw.parse::<u32>() {
        Ok(0) | Err(_) => None,
        Ok(shares) => Some(shares),
    }
}

fn is_affirmative(answer: &str) -> bool {
    let answer = answer.trim();
    answer.eq_ignore_ascii_case("yes") || answer.eq_ignore_ascii_case("y")
}
