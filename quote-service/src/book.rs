//! The quote table: symbol to cyclic price series, mutated only by ADVANCE.
//! Replies are formatted here because their text is part of the wire
//! protocol, not presentation.

use anyhow::{Context, Result};
use exchange_core::model::quote::{QuoteSeries, CYCLE_LEN};
use exchange_core::protocol::format_price;
use log::info;
use std::collections::BTreeMap;
use std::path::Path;

pub struct QuoteBook {
    // BTreeMap keeps the full listing in stable symbol order.
    quotes: BTreeMap<String, QuoteSeries>,
}

impl QuoteBook {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("could not open quotes file {}", path.display()))?;
        Ok(Self::from_lines(&contents))
    }

    /// Each line is `<symbol>` followed by at least [`CYCLE_LEN`] prices;
    /// shorter or unparseable lines are skipped.
    pub fn from_lines(contents: &str) -> Self {
        let mut quotes = BTreeMap::new();
        for line in contents.lines() {
            let mut parts = line.split_whitespace();
            let Some(symbol) = parts.next() else {
                continue;
            };
            let prices: Vec<f64> = parts.take(CYCLE_LEN).filter_map(|p| p.parse().ok()).collect();
            if prices.len() < CYCLE_LEN {
                continue;
            }
            if let Some(series) = QuoteSeries::new(prices) {
                quotes.insert(symbol.to_string(), series);
            }
        }
        Self { quotes }
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn series(&self, symbol: &str) -> Option<&QuoteSeries> {
        self.quotes.get(symbol)
    }

    /// Full listing: one `<symbol> <price>` line per symbol.
    pub fn listing(&self) -> String {
        let mut reply = String::new();
        for (symbol, series) in &self.quotes {
            reply.push_str(&format!("{} {}\n", symbol, format_price(series.current())));
        }
        reply
    }

    pub fn quote(&self, symbol: &str) -> String {
        match self.quotes.get(symbol) {
            Some(series) => format!("{} {}", symbol, format_price(series.current())),
            None => "ERROR: Stock not found".to_string(),
        }
    }

    /// Moves the symbol's cursor forward one tick and acknowledges with the
    /// new index and price.
    pub fn advance(&mut self, symbol: &str) -> String {
        let Some(series) = self.quotes.get_mut(symbol) else {
            return "ERROR: Stock not found".to_string();
        };
        let new_price = series.advance();
        info!(
            "time forward for {}: index {} price {}",
            symbol,
            series.cursor(),
            format_price(new_price)
        );
        format!(
            "ADVANCED {} to index {}, new price: {}",
            symbol,
            series.cursor(),
            format_price(new_price)
        )
    }
}
