//! Threshold filters applied to a selected extremum bucket

use super::price::ComparisonMode;
use crate::histogram::TradeHistogramBar;
use crate::statistics::TradeStatisticsKind;
use serde::{Deserialize, Serialize};

/// One optional threshold on a statistic
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TrimContext {
    /// Whether the filter is active
    pub use_trim_value: bool,
    /// Threshold
    pub trim_value: f64,
    /// Comparison against the threshold
    pub comparison: ComparisonMode,
}

impl TrimContext {
    /// Active filter
    #[must_use]
    pub const fn new(trim_value: f64, comparison: ComparisonMode) -> Self {
        Self {
            use_trim_value: true,
            trim_value,
            comparison,
        }
    }

    /// Active filter with a NaN threshold
    #[must_use]
    pub fn is_invalid(&self) -> bool {
        self.use_trim_value && self.trim_value.is_nan()
    }

    /// True when `value` passes the filter
    #[must_use]
    pub fn accepts(&self, value: f64) -> bool {
        !self.use_trim_value || self.comparison.compare(value, self.trim_value)
    }

    /// `{use}.{value}.{comparison}`
    #[must_use]
    pub fn state_id(&self) -> String {
        format!(
            "{}.{}.{}",
            crate::keys::format_bool(self.use_trim_value),
            self.trim_value,
            self.comparison
        )
    }
}

/// Filters for each statistic a bucket carries
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtremumTrims {
    /// Trade count filter
    pub trades_count: TrimContext,
    /// Quantity filter
    pub quantity: TrimContext,
    /// Ask quantity filter
    pub ask_quantity: TrimContext,
    /// Bid quantity filter
    pub bid_quantity: TrimContext,
    /// Delta filter
    pub delta_ask_bid_quantity: TrimContext,
    /// Relative delta filter
    pub relative_delta_ask_bid_quantity_percent: TrimContext,
}

impl ExtremumTrims {
    /// Filters paired with the statistic they read
    #[must_use]
    pub fn by_kind(&self) -> [(TradeStatisticsKind, &TrimContext); 6] {
        [
            (TradeStatisticsKind::TradesCount, &self.trades_count),
            (TradeStatisticsKind::Quantity, &self.quantity),
            (TradeStatisticsKind::AskQuantity, &self.ask_quantity),
            (TradeStatisticsKind::BidQuantity, &self.bid_quantity),
            (TradeStatisticsKind::DeltaAskBidQuantity, &self.delta_ask_bid_quantity),
            (
                TradeStatisticsKind::RelativeDeltaAskBidQuantityPercent,
                &self.relative_delta_ask_bid_quantity_percent,
            ),
        ]
    }

    /// True when any active filter has a NaN threshold
    #[must_use]
    pub fn is_invalid(&self) -> bool {
        self.by_kind().iter().any(|(_, trim)| trim.is_invalid())
    }

    /// True when `bar` passes every active filter
    #[must_use]
    pub fn accepts(&self, bar: &TradeHistogramBar) -> bool {
        self.by_kind()
            .iter()
            .all(|(kind, trim)| trim.accepts(kind.value(bar)))
    }

    /// Filter fingerprints joined with `.`
    #[must_use]
    pub fn state_id(&self) -> String {
        self.by_kind()
            .iter()
            .map(|(_, trim)| trim.state_id())
            .collect::<Vec<_>>()
            .join(".")
    }
}
