//! A user's position in one symbol: share count and weighted average cost.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    symbol: String,
    shares: u32,
    avg_price: f64,
}

impl Holding {
    pub fn new(symbol: impl Into<String>, shares: u32, avg_price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            shares,
            avg_price,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn shares(&self) -> u32 {
        self.shares
    }

    pub fn avg_price(&self) -> f64 {
        self.avg_price
    }

    /// True when the holding can cover a sale of `shares`.
    pub fn covers(&self, shares: u32) -> bool {
        self.shares >= shares
    }

    /// Blends a purchase into the holding: the new average cost is the
    /// quantity-weighted mean of the prior holding and this purchase.
    /// Returns `false` when the combined share count cannot be represented,
    /// leaving the holding untouched.
    pub fn apply_buy(&mut self, shares: u32, price: f64) -> bool {
        let Some(total_shares) = self.shares.checked_add(shares) else {
            return false;
        };
        let old_value = self.shares as f64 * self.avg_price;
        let new_value = shares as f64 * price;
        self.avg_price = (old_value + new_value) / total_shares as f64;
        self.shares = total_shares;
        true
    }

    /// Decrements the share count and reports the realized profit or loss
    /// against the pre-sale average cost. The average cost of whatever
    /// remains is unchanged. Returns `None` when the holding cannot cover
    /// the sale, leaving it untouched.
    pub fn apply_sell(&mut self, shares: u32, price: f64) -> Option<f64> {
        if !self.covers(shares) {
            return None;
        }
        self.shares -= shares;
        Some(shares as f64 * (price - self.avg_price))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buy_blends_weighted_average_cost() {
        let mut holding = Holding::new("GOOG", 10, 100.0);
        assert!(holding.apply_buy(10, 200.0));
        assert_eq!(holding.shares(), 20);
        assert!((holding.avg_price() - 150.0).abs() < 1e-9);
    }

    #[test]
    fn buy_into_fresh_holding_takes_trade_price() {
        let mut holding = Holding::new("GOOG", 0, 0.0);
        assert!(holding.apply_buy(2, 100.0));
        assert_eq!(holding.shares(), 2);
        assert!((holding.avg_price() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn buy_overflowing_the_share_count_is_rejected_without_mutation() {
        let mut holding = Holding::new("GOOG", u32::MAX - 1, 100.0);
        assert!(!holding.apply_buy(2, 200.0));
        assert_eq!(holding.shares(), u32::MAX - 1);
        assert!((holding.avg_price() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn sell_reports_pnl_against_presale_average() {
        let mut holding = Holding::new("GOOG", 10, 100.0);
        let pnl = holding.apply_sell(4, 130.0).unwrap();
        assert!((pnl - 120.0).abs() < 1e-9);
        assert_eq!(holding.shares(), 6);
        // Average cost on the remainder is untouched.
        assert!((holding.avg_price() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn oversell_is_rejected_without_mutation() {
        let mut holding = Holding::new("GOOG", 2, 100.0);
        assert!(holding.apply_sell(5, 130.0).is_none());
        assert_eq!(holding.shares(), 2);
    }

    #[test]
    fn sell_to_zero_keeps_the_holding() {
        let mut holding = Holding::new("GOOG", 2, 100.0);
        holding.apply_sell(2, 100.0).unwrap();
        assert_eq!(holding.shares(), 0);
        assert!(!holding.covers(1));
    }
}
