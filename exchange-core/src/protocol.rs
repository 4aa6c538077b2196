//! Backend wire protocol: typed requests, reply parsing, price formatting.
//!
//! The router and the three backend services exchange single-datagram text
//! messages. The request grammar is fixed (it is an interop format, not a
//! serde payload), so encoding lives in `Display` and decoding in
//! [`BackendRequest::parse`]. Reply parsing helpers cover the two replies the
//! router has to look inside: a single quote and a portfolio snapshot.

use std::fmt;
use thiserror::Error;

/// First line of every portfolio snapshot reply.
pub const PORTFOLIO_MARKER: &str = "PORTFOLIO";

#[derive(Error, Debug, PartialEq)]
pub enum ProtocolError {
    #[error("empty request")]
    Empty,
    #[error("unrecognized request: {0}")]
    Unrecognized(String),
    #[error("malformed {0} request")]
    Malformed(&'static str),
    #[error("malformed reply: {0}")]
    MalformedReply(String),
}

/// One request datagram from the router to a backend service.
///
/// Each variant belongs to exactly one service: `Auth` to the credential
/// service, `Quote`/`Advance` to the quote service, the rest to the ledger.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendRequest {
    Auth {
        username: String,
        obfuscated: String,
    },
    /// `None` asks for the full listing.
    Quote {
        symbol: Option<String>,
    },
    Advance {
        symbol: String,
    },
    Buy {
        username: String,
        symbol: String,
        shares: u32,
        price: f64,
    },
    Sell {
        username: String,
        symbol: String,
        shares: u32,
        price: f64,
    },
    Check {
        username: String,
        symbol: String,
        shares: u32,
    },
    Portfolio {
        username: String,
    },
}

impl BackendRequest {
    /// Decodes one request datagram.
    ///
    /// Whitespace-separated, keyword first. Arity is strict per keyword; a
    /// request a service cannot act on is an error the caller logs and drops,
    /// mirroring how the services ignore unrecognized datagrams.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some((&keyword, args)) = parts.split_first() else {
            return Err(ProtocolError::Empty);
        };

        match keyword {
            "AUTH" => match args {
                [username, obfuscated] => Ok(Self::Auth {
                    username: username.to_string(),
                    obfuscated: obfuscated.to_string(),
                }),
                _ => Err(ProtocolError::Malformed("AUTH")),
            },
            "QUOTE" => match args {
                [] => Ok(Self::Quote { symbol: None }),
                [symbol] => Ok(Self::Quote {
                    symbol: Some(symbol.to_string()),
                }),
                _ => Err(ProtocolError::Malformed("QUOTE")),
            },
            "ADVANCE" => match args {
                [symbol] => Ok(Self::Advance {
                    symbol: symbol.to_string(),
                }),
                _ => Err(ProtocolError::Malformed("ADVANCE")),
            },
            "BUY" | "SELL" => match args {
                [username, symbol, shares, price] => {
                    let shares = shares
                        .parse()
                        .map_err(|_| ProtocolError::Malformed("BUY/SELL"))?;
                    let price = price
                        .parse()
                        .map_err(|_| ProtocolError::Malformed("BUY/SELL"))?;
                    let username = username.to_string();
                    let symbol = symbol.to_string();
                    if keyword == "BUY" {
                        Ok(Self::Buy {
                            username,
                            symbol,
                            shares,
                            price,
                        })
                    } else {
                        Ok(Self::Sell {
                            username,
                            symbol,
                            shares,
                            price,
                        })
                    }
                }
                _ => Err(ProtocolError::Malformed("BUY/SELL")),
            },
            "CHECK" => match args {
                [username, symbol, shares] => Ok(Self::Check {
                    username: username.to_string(),
                    symbol: symbol.to_string(),
                    shares: shares
                        .parse()
                        .map_err(|_| ProtocolError::Malformed("CHECK"))?,
                }),
                _ => Err(ProtocolError::Malformed("CHECK")),
            },
            "PORTFOLIO" => match args {
                [username] => Ok(Self::Portfolio {
                    username: username.to_string(),
                }),
                _ => Err(ProtocolError::Malformed("PORTFOLIO")),
            },
            _ => Err(ProtocolError::Unrecognized(line.to_string())),
        }
    }
}

impl fmt::Display for BackendRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auth {
                username,
                obfuscated,
            } => write!(f, "AUTH {} {}", username, obfuscated),
            Self::Quote { symbol: None } => write!(f, "QUOTE"),
            Self::Quote {
                symbol: Some(symbol),
            } => write!(f, "QUOTE {}", symbol),
            Self::Advance { symbol } => write!(f, "ADVANCE {}", symbol),
            Self::Buy {
                username,
                symbol,
                shares,
                price,
            } => write!(
                f,
                "BUY {} {} {} {}",
                username,
                symbol,
                shares,
                format_price(*price)
            ),
            Self::Sell {
                username,
                symbol,
                shares,
                price,
            } => write!(
                f,
                "SELL {} {} {} {}",
                username,
                symbol,
                shares,
                format_price(*price)
            ),
            Self::Check {
                username,
                symbol,
                shares,
            } => write!(f, "CHECK {} {} {}", username, symbol, shares),
            Self::Portfolio { username } => write!(f, "PORTFOLIO {}", username),
        }
    }
}

/// One holding line inside a portfolio snapshot reply.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioLine {
    pub symbol: String,
    pub shares: u32,
    pub avg_price: f64,
}

/// True for the `ERROR: ...` replies every service uses for domain failures.
pub fn is_error_reply(reply: &str) -> bool {
    reply.starts_with("ERROR")
}

/// Parses a single-symbol quote reply (`<symbol> <price>`).
pub fn parse_quote_reply(reply: &str) -> Result<(String, f64), ProtocolError> {
    let mut parts = reply.split_whitespace();
    let (Some(symbol), Some(price)) = (parts.next(), parts.next()) else {
        return Err(ProtocolError::MalformedReply(reply.to_string()));
    };
    let price = price
        .parse()
        .map_err(|_| ProtocolError::MalformedReply(reply.to_string()))?;
    Ok((symbol.to_string(), price))
}

/// Parses a portfolio snapshot reply.
///
/// The first line must be the `PORTFOLIO` marker. Holding lines that do not
/// parse as `<symbol> <shares> <avg_price>` are skipped, not fatal: the
/// aggregate position report tolerates individually bad lines.
pub fn parse_portfolio_reply(reply: &str) -> Result<Vec<PortfolioLine>, ProtocolError> {
    let mut lines = reply.lines();
    match lines.next() {
        Some(marker) if marker.trim() == PORTFOLIO_MARKER => {}
        Some(_) => return Err(ProtocolError::MalformedReply(reply.to_string())),
        None => return Err(ProtocolError::Empty),
    }

    let mut holdings = Vec::new();
    for line in lines {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let [symbol, shares, avg_price] = parts.as_slice() else {
            continue;
        };
        let (Ok(shares), Ok(avg_price)) = (shares.parse(), avg_price.parse()) else {
            continue;
        };
        holdings.push(PortfolioLine {
            symbol: symbol.to_string(),
            shares,
            avg_price,
        });
    }
    Ok(holdings)
}

/// Wire format for prices: six decimal places, e.g. `100.000000`.
pub fn format_price(price: f64) -> String {
    format!("{:.6}", price)
}

/// Human-facing money in confirmation prompts: two decimal places.
pub fn format_money(amount: f64) -> String {
    format!("{:.2}", amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_request_kind() {
        assert_eq!(
            BackendRequest::parse("AUTH alice sdvv").unwrap(),
            BackendRequest::Auth {
                username: "alice".into(),
                obfuscated: "sdvv".into()
            }
        );
        assert_eq!(
            BackendRequest::parse("QUOTE").unwrap(),
            BackendRequest::Quote { symbol: None }
        );
        assert_eq!(
            BackendRequest::parse("QUOTE GOOG").unwrap(),
            BackendRequest::Quote {
                symbol: Some("GOOG".into())
            }
        );
        assert_eq!(
            BackendRequest::parse("BUY alice GOOG 2 100.000000").unwrap(),
            BackendRequest::Buy {
                username: "alice".into(),
                symbol: "GOOG".into(),
                shares: 2,
                price: 100.0
            }
        );
        assert_eq!(
            BackendRequest::parse("CHECK alice GOOG 5").unwrap(),
            BackendRequest::Check {
                username: "alice".into(),
                symbol: "GOOG".into(),
                shares: 5
            }
        );
    }

    #[test]
    fn encode_parse_round_trip() {
        let requests = [
            BackendRequest::Auth {
                username: "bob".into(),
                obfuscated: "kxqwhu5".into(),
            },
            BackendRequest::Sell {
                username: "bob".into(),
                symbol: "TSLA".into(),
                shares: 3,
                price: 250.5,
            },
            BackendRequest::Advance {
                symbol: "GOOG".into(),
            },
            BackendRequest::Portfolio {
                username: "bob".into(),
            },
        ];
        for request in requests {
            assert_eq!(
                BackendRequest::parse(&request.to_string()).unwrap(),
                request
            );
        }
    }

    #[test]
    fn rejects_bad_arity_and_unknown_keywords() {
        assert!(BackendRequest::parse("").is_err());
        assert!(BackendRequest::parse("AUTH alice").is_err());
        assert!(BackendRequest::parse("BUY alice GOOG two 100").is_err());
        assert!(BackendRequest::parse("HELLO world").is_err());
    }

    #[test]
    fn quote_reply_parsing() {
        assert_eq!(
            parse_quote_reply("GOOG 100.000000").unwrap(),
            ("GOOG".to_string(), 100.0)
        );
        assert!(parse_quote_reply("GOOG").is_err());
        assert!(parse_quote_reply("GOOG abc").is_err());
    }

    #[test]
    fn portfolio_reply_requires_marker_and_skips_bad_lines() {
        let reply = "PORTFOLIO\nGOOG 2 100.000000\ngarbage line here extra\nTSLA 1 250.000000\n";
        let holdings = parse_portfolio_reply(reply).unwrap();
        assert_eq!(holdings.len(), 2);
        assert_eq!(holdings[0].symbol, "GOOG");
        assert_eq!(holdings[1].shares, 1);

        assert!(parse_portfolio_reply("NOT_A_MARKER\nGOOG 2 100.0").is_err());
        assert!(parse_portfolio_reply("").is_err());
    }

    #[test]
    fn price_formatting() {
        assert_eq!(format_price(100.0), "100.000000");
        assert_eq!(format_money(200.0), "200.00");
    }
}
