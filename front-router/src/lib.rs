//! # Front Router
//!
//! The front-end of the trading simulation: accepts client sessions over TCP
//! and orchestrates the credential, quote, and ledger services over UDP to
//! serve each command. The interesting part is the per-command backend call
//! sequence in [`session`], including the client-confirmation round-trip held
//! open in the middle of a buy or sell.
//!
//! ## Modules
//! - `session`: Per-session command dispatch and the trade state machines.
//! - `backend`: The backend request/reply seam and its UDP implementation.
//! - `transport`: The client link seam and its framed-TCP implementation.

pub mod backend;
pub mod session;
pub mod transport;
