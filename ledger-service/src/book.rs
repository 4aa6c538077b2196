//! The portfolio ledger: username to per-symbol holdings. A holding sold
//! down to zero shares stays in the table (history) but is excluded from
//! snapshots and can no longer cover a sale.

use anyhow::{Context, Result};
use exchange_core::model::Holding;
use exchange_core::protocol::{format_price, PORTFOLIO_MARKER};
use log::info;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

type Portfolio = BTreeMap<String, Holding>;

pub struct LedgerBook {
    portfolios: HashMap<String, Portfolio>,
}

impl LedgerBook {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("could not open portfolios file {}", path.display()))?;
        Ok(Self::from_lines(&contents))
    }

    /// A bare `<username>` line starts a user; the `<symbol> <shares>
    /// <avg_price>` lines that follow are that user's holdings.
    pub fn from_lines(contents: &str) -> Self {
        let mut portfolios: HashMap<String, Portfolio> = HashMap::new();
        let mut current_user: Option<String> = None;
        for line in contents.lines() {
            let parts: Vec<&str> = line.split_whitespace().collect();
            match parts.as_slice() {
                [username] => {
                    portfolios.entry(username.to_string()).or_default();
                    current_user = Some(username.to_string());
                }
                [symbol, shares, avg_price] => {
                    let Some(user) = &current_user else {
                        continue;
                    };
                    let (Ok(shares), Ok(avg_price)) = (shares.parse(), avg_price.parse()) else {
                        continue;
                    };
                    portfolios.entry(user.clone()).or_default().insert(
                        symbol.to_string(),
                        Holding::new(*symbol, shares, avg_price),
                    );
                }
                _ => {}
            }
        }
        Self { portfolios }
    }

    pub fn user_count(&self) -> usize {
        self.portfolios.len()
    }

    pub fn holding(&self, username: &str, symbol: &str) -> Option<&Holding> {
        self.portfolios.get(username)?.get(symbol)
    }

    /// Applies a buy. A user the ledger has never seen gets a portfolio on
    /// the fly; an existing holding blends the purchase into its average.
    /// A purchase that would push the share count past what the ledger can
    /// represent is refused, leaving the holding untouched.
    pub fn buy(&mut self, username: &str, symbol: &str, shares: u32, price: f64) -> String {
        info!(
            "buy: {} x {} of {} at {}",
            username,
            shares,
            symbol,
            format_price(price)
        );
        let portfolio = self.portfolios.entry(username.to_string()).or_default();
        match portfolio.entry(symbol.to_string()) {
            Entry::Occupied(mut holding) => {
                if !holding.get_mut().apply_buy(shares, price) {
                    return "ERROR: Too many shares".to_string();
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(Holding::new(symbol, shares, price));
            }
        }
        format!(
            "BUY_CONFIRMED: {} shares of {} at ${}",
            shares,
            symbol,
            format_price(price)
        )
    }

    /// Applies a sell, reporting realized profit/loss against the pre-sale
    /// average cost. The holding itself refuses an oversell.
    pub fn sell(&mut self, username: &str, symbol: &str, shares: u32, price: f64) -> String {
        info!(
            "sell: {} x {} of {} at {}",
            username,
            shares,
            symbol,
            format_price(price)
        );
        let Some(portfolio) = self.portfolios.get_mut(username) else {
            return "ERROR: User portfolio not found".to_string();
        };
        let Some(pnl) = portfolio
            .get_mut(symbol)
            .and_then(|holding| holding.apply_sell(shares, price))
        else {
            return "ERROR: Insufficient shares".to_string();
        };
        format!(
            "SELL_CONFIRMED: {} shares of {} at ${}, profit/loss: ${}",
            shares,
            symbol,
            format_price(price),
            format_price(pnl)
        )
    }

    pub fn check(&self, username: &str, symbol: &str, shares: u32) -> String {
        let sufficient = self
            .holding(username, symbol)
            .is_some_and(|holding| holding.covers(shares));
        if sufficient {
            "SUFFICIENT_SHARES".to_string()
        } else {
            "INSUFFICIENT_SHARES".to_string()
        }
    }

    /// Snapshot reply: marker line, then one line per positive holding. An
    /// unknown user gets the marker line alone.
    pub fn snapshot(&self, username: &str) -> String {
        let mut reply = format!("{}\n", PORTFOLIO_MARKER);
        let Some(portfolio) = self.portfolios.get(username) else {
            return reply;
        };
        for holding in portfolio.values() {
            if holding.shares() == 0 {
                continue;
            }
            reply.push_str(&format!(
                "{} {} {}\n",
                holding.symbol(),
                holding.shares(),
                format_price(holding.avg_price())
            ));
        }
        reply
    }
}
