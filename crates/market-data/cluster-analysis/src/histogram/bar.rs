//! Price bucket of a trade histogram

use common::{Trade, TradeDirection};
use serde::{Deserialize, Serialize};

/// Aggregated trades at one price bucket
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TradeHistogramBar {
    /// Bucket index: `floor(price / price_step)`
    pub price_key: i64,
    /// Number of trades
    pub trades_count: u64,
    /// Number of buy-aggressor trades
    pub ask_trades_count: u64,
    /// Number of sell-aggressor trades
    pub bid_trades_count: u64,
    /// Total quantity
    pub quantity: f64,
    /// Quantity bought at the ask
    pub ask_quantity: f64,
    /// Quantity sold at the bid
    pub bid_quantity: f64,
    /// Sum of price times quantity
    pub turnover: f64,
    /// Sum of trade prices
    pub price_sum: f64,
}

impl TradeHistogramBar {
    /// Empty bucket
    #[must_use]
    pub fn new(price_key: i64) -> Self {
        Self {
            price_key,
            ..Self::default()
        }
    }

    /// Bucket index of `price` for the given step
    #[must_use]
    pub fn price_key_of(price: f64, price_step: f64) -> i64 {
        (price / price_step).floor() as i64
    }

    /// Add one trade to the bucket
    pub fn add_trade(&mut self, trade: &Trade) {
        self.trades_count += 1;
        match trade.direction {
            TradeDirection::Buy => self.ask_trades_count += 1,
            TradeDirection::Sell => self.bid_trades_count += 1,
            TradeDirection::Unknown => {}
        }
        self.quantity += trade.quantity;
        self.ask_quantity += trade.ask_quantity();
        self.bid_quantity += trade.bid_quantity();
        self.turnover += trade.price * trade.quantity;
        self.price_sum += trade.price;
    }

    /// Sum the additive fields of `other` into `self`
    pub fn merge(&mut self, other: &Self) {
        self.trades_count += other.trades_count;
        self.ask_trades_count += other.ask_trades_count;
        self.bid_trades_count += other.bid_trades_count;
        self.quantity += other.quantity;
        self.ask_quantity += other.ask_quantity;
        self.bid_quantity += other.bid_quantity;
        self.turnover += other.turnover;
        self.price_sum += other.price_sum;
    }

    /// Ask minus bid quantity
    #[must_use]
    pub fn delta_ask_bid_quantity(&self) -> f64 {
        self.ask_quantity - self.bid_quantity
    }

    /// Delta as a percentage of total quantity, 0 for an empty bucket
    #[must_use]
    pub fn relative_delta_ask_bid_quantity_percent(&self) -> f64 {
        if self.quantity == 0.0 {
            0.0
        } else {
            self.delta_ask_bid_quantity() / self.quantity * 100.0
        }
    }

    /// Volume-weighted price. Falls back to the plain mean of trade prices
    /// when the bucket has no quantity.
    #[must_use]
    pub fn average_price(&self) -> f64 {
        if self.quantity > 0.0 {
            self.turnover / self.quantity
        } else if self.trades_count > 0 {
            self.price_sum / self.trades_count as f64
        } else {
            f64::NAN
        }
    }
}
