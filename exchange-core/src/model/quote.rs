//! Cyclic price series: a fixed sequence of prices and a cursor that stands
//! in for "current time". The cursor moves only on an explicit advance, one
//! tick per completed trade, wrapping at the end of the sequence.

use serde::{Deserialize, Serialize};

/// Number of prices per symbol in the reference data files.
pub const CYCLE_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteSeries {
    prices: Vec<f64>,
    cursor: usize,
}

impl QuoteSeries {
    /// Creates a series with the cursor at position 0. Returns `None` for an
    /// empty price list, which has no meaningful current price.
    pub fn new(prices: Vec<f64>) -> Option<Self> {
        if prices.is_empty() {
            return None;
        }
        Some(Self { prices, cursor: 0 })
    }

    pub fn current(&self) -> f64 {
        self.prices[self.cursor]
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Moves the cursor forward one position, wrapping, and returns the new
    /// current price.
    pub fn advance(&mut self) -> f64 {
        self.cursor = (self.cursor + 1) % self.prices.len();
        self.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_wraps_after_full_cycle() {
        let prices: Vec<f64> = (0..CYCLE_LEN).map(|i| 100.0 + i as f64).collect();
        let mut series = QuoteSeries::new(prices.clone()).unwrap();
        assert_eq!(series.current(), 100.0);

        for _ in 0..CYCLE_LEN {
            series.advance();
        }
        // A full cycle of advances returns to the original cursor and price.
        assert_eq!(series.cursor(), 0);
        assert_eq!(series.current(), 100.0);
    }

    #[test]
    fn advance_returns_new_price() {
        let mut series = QuoteSeries::new(vec![10.0, 20.0, 30.0]).unwrap();
        assert_eq!(series.advance(), 20.0);
        assert_eq!(series.advance(), 30.0);
        assert_eq!(series.advance(), 10.0);
    }

    #[test]
    fn empty_series_is_rejected() {
        assert!(QuoteSeries::new(Vec::new()).is_none());
    }
}
