//! Core market data types for the cluster analysis engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// OHLCV bar
///
/// Bars are shared as `Arc<DataBar>`; the `Arc` handle is the bar's
/// identity within a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataBar {
    /// Bar open time
    pub date: DateTime<Utc>,
    /// Open price
    pub open: f64,
    /// High price
    pub high: f64,
    /// Low price
    pub low: f64,
    /// Close price
    pub close: f64,
    /// Traded volume
    pub volume: f64,
}

impl DataBar {
    /// Create a new bar
    #[must_use]
    pub const fn new(
        date: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Create a flat bar where open, high, low and close are all `price`
    #[must_use]
    pub const fn flat(date: DateTime<Utc>, price: f64) -> Self {
        Self::new(date, price, price, price, price, 0.0)
    }

    /// True when all four prices are equal (NaN bars count as flat)
    #[must_use]
    pub fn is_flat(&self) -> bool {
        let same = |a: f64, b: f64| a == b || (a.is_nan() && b.is_nan());
        same(self.open, self.close) && same(self.high, self.close) && same(self.low, self.close)
    }
}

impl fmt::Display for DataBar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} O={} H={} L={} C={} V={}",
            self.date.format("%Y-%m-%d %H:%M:%S"),
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume
        )
    }
}

/// Aggressor side of a trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeDirection {
    /// Buyer lifted the ask
    Buy,
    /// Seller hit the bid
    Sell,
    /// Side not reported by the venue
    Unknown,
}

/// A single executed trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Execution time
    pub date: DateTime<Utc>,
    /// Execution price
    pub price: f64,
    /// Executed quantity, always non-negative
    pub quantity: f64,
    /// Aggressor side
    pub direction: TradeDirection,
}

impl Trade {
    /// Create a trade. Negative quantities are stored as their absolute value.
    #[must_use]
    pub fn new(date: DateTime<Utc>, price: f64, quantity: f64, direction: TradeDirection) -> Self {
        Self {
            date,
            price,
            quantity: quantity.abs(),
            direction,
        }
    }

    /// Quantity executed against the ask
    #[must_use]
    pub fn ask_quantity(&self) -> f64 {
        match self.direction {
            TradeDirection::Buy => self.quantity,
            TradeDirection::Sell | TradeDirection::Unknown => 0.0,
        }
    }

    /// Quantity executed against the bid
    #[must_use]
    pub fn bid_quantity(&self) -> f64 {
        match self.direction {
            TradeDirection::Sell => self.quantity,
            TradeDirection::Buy | TradeDirection::Unknown => 0.0,
        }
    }
}

/// One level of an order book queue
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueueData {
    /// Level price
    pub price: f64,
    /// Resting quantity
    pub quantity: f64,
}
