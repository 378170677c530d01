//! Buy and sell volume per bar
//!
//! Values are read from the histogram cache of the finest series the host
//! has for the instrument and summed onto the bars of the requested one.

use crate::context::Context;
use crate::error::{ClusterError, ClusterResult};
use crate::histogram::{CachedTradeHistogram, TradeHistogramsCache};
use crate::security::{Security, same_security};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Unit of a volume value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum QuantityMode {
    /// Traded quantity
    #[default]
    Quantity,
    /// Traded quantity divided by the lot size
    QuantityInLots,
    /// Number of trades
    TradesCount,
}

impl QuantityMode {
    const ALL: [Self; 3] = [Self::Quantity, Self::QuantityInLots, Self::TradesCount];

    /// Variant name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Quantity => "Quantity",
            Self::QuantityInLots => "QuantityInLots",
            Self::TradesCount => "TradesCount",
        }
    }
}

impl fmt::Display for QuantityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuantityMode {
    type Err = ClusterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ClusterError::invalid_argument("QuantityMode", s))
    }
}

/// Aggressor side counted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VolumeSide {
    /// Trades that lifted the ask
    Buys,
    /// Trades that hit the bid
    Sells,
}

impl VolumeSide {
    fn quantity(self, histogram: &CachedTradeHistogram) -> f64 {
        match self {
            Self::Buys => histogram.ask_quantity(),
            Self::Sells => histogram.bid_quantity(),
        }
    }

    fn trades_count(self, histogram: &CachedTradeHistogram) -> u64 {
        match self {
            Self::Buys => histogram.ask_trades_count(),
            Self::Sells => histogram.bid_trades_count(),
        }
    }
}

/// Buy or sell volume per bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuysSellsHandler {
    /// Side counted
    pub side: VolumeSide,
    /// Unit of the output
    #[serde(default)]
    pub quantity_mode: QuantityMode,
}

impl BuysSellsHandler {
    /// Volume handler for `side`
    #[must_use]
    pub const fn new(side: VolumeSide, quantity_mode: QuantityMode) -> Self {
        Self { side, quantity_mode }
    }

    /// Buy volume handler
    #[must_use]
    pub const fn buys(quantity_mode: QuantityMode) -> Self {
        Self::new(VolumeSide::Buys, quantity_mode)
    }

    /// Sell volume handler
    #[must_use]
    pub const fn sells(quantity_mode: QuantityMode) -> Self {
        Self::new(VolumeSide::Sells, quantity_mode)
    }

    fn value(&self, cache: &TradeHistogramsCache, lot_size: f64, index: usize) -> ClusterResult<f64> {
        let histogram = cache.histogram(index)?;
        Ok(match self.quantity_mode {
            QuantityMode::Quantity => self.side.quantity(&histogram),
            QuantityMode::QuantityInLots => self.side.quantity(&histogram) / lot_size,
            QuantityMode::TradesCount => self.side.trades_count(&histogram) as f64,
        })
    }

    /// One value per bar of `security`
    ///
    /// # Errors
    /// Bar loading and histogram cache failures.
    pub fn execute(&self, ctx: &Context, security: &Arc<dyn Security>) -> ClusterResult<Vec<f64>> {
        let compressed = security.bars()?;
        if compressed.is_empty() {
            return Ok(Vec::new());
        }

        let description_id = security.description().id().to_string();
        let decompressed = ctx
            .runtime()
            .and_then(|runtime| runtime.security_by_description_id(&description_id))
            .unwrap_or(security)
            .clone();
        let cache = ctx.histogram_cache(&decompressed, 1)?;
        let lot_size = decompressed.lot_size();
        let decompressed_bars = cache.bars();

        if same_security(&decompressed, security) {
            let mut results = ctx.get_array(decompressed_bars.len());
            for (index, result) in results.iter_mut().enumerate() {
                *result = self.value(&cache, lot_size, index)?;
            }
            return Ok(results);
        }

        debug!(
            compressed = compressed.len(),
            decompressed = decompressed_bars.len(),
            "Compressing volume"
        );
        let mut results = ctx.get_array(compressed.len());
        let mut index = 0;
        for (slot, result) in results.iter_mut().enumerate() {
            let next_date = compressed.get(slot + 1).map(|bar| bar.date);
            let mut total = 0.0;
            while index < decompressed_bars.len()
                && next_date.is_none_or(|next| decompressed_bars[index].date < next)
            {
                total += self.value(&cache, lot_size, index)?;
                index += 1;
            }
            *result = total;
        }
        Ok(results)
    }
}
