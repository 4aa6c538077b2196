//! # Exchange Core Library
//!
//! Shared foundation for the stock-trading simulation services.
//!
//! ## Modules
//! - `model`: Domain types (quote series, holdings) with identical serialization.
//! - `protocol`: Backend request/reply text codec and price formatting.
//! - `comms`: Frame codec for the client link and the UDP request/reply caller.
//! - `cipher`: The rotate-by-3 password obfuscation shared with the credential service.

pub mod cipher;
pub mod comms;
pub mod model;
pub mod protocol;
