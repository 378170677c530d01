//! Statistic flavours read from a histogram bucket

use crate::error::ClusterError;
use crate::histogram::TradeHistogramBar;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which bucket field a statistic reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TradeStatisticsKind {
    /// Number of trades
    TradesCount,
    /// Total quantity
    #[default]
    Quantity,
    /// Quantity bought at the ask
    AskQuantity,
    /// Quantity sold at the bid
    BidQuantity,
    /// Ask minus bid quantity
    DeltaAskBidQuantity,
    /// Delta as a percentage of quantity
    RelativeDeltaAskBidQuantityPercent,
}

impl TradeStatisticsKind {
    const ALL: [Self; 6] = [
        Self::TradesCount,
        Self::Quantity,
        Self::AskQuantity,
        Self::BidQuantity,
        Self::DeltaAskBidQuantity,
        Self::RelativeDeltaAskBidQuantityPercent,
    ];

    /// Value of this statistic for one bucket
    #[must_use]
    pub fn value(self, bar: &TradeHistogramBar) -> f64 {
        match self {
            Self::TradesCount => bar.trades_count as f64,
            Self::Quantity => bar.quantity,
            Self::AskQuantity => bar.ask_quantity,
            Self::BidQuantity => bar.bid_quantity,
            Self::DeltaAskBidQuantity => bar.delta_ask_bid_quantity(),
            Self::RelativeDeltaAskBidQuantityPercent => bar.relative_delta_ask_bid_quantity_percent(),
        }
    }

    /// Variant name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TradesCount => "TradesCount",
            Self::Quantity => "Quantity",
            Self::AskQuantity => "AskQuantity",
            Self::BidQuantity => "BidQuantity",
            Self::DeltaAskBidQuantity => "DeltaAskBidQuantity",
            Self::RelativeDeltaAskBidQuantityPercent => "RelativeDeltaAskBidQuantityPercent",
        }
    }
}

impl fmt::Display for TradeStatisticsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeStatisticsKind {
    type Err = ClusterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ClusterError::invalid_argument("TradeStatisticsKind", s))
    }
}
