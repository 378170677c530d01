//! Per-bar trade histogram

use super::bar::TradeHistogramBar;
use super::into_sorted;
use crate::error::ClusterResult;
use crate::security::Security;
use rustc_hash::FxHashMap;
use std::sync::OnceLock;

#[derive(Debug)]
struct Calculated {
    buckets: Vec<TradeHistogramBar>,
    totals: TradeHistogramBar,
}

/// Trades of one underlying bar bucketed by price
///
/// Calculated at most once; recalculating a calculated histogram is a no-op.
#[derive(Debug)]
pub struct CachedTradeHistogram {
    bar_index: usize,
    price_step: f64,
    calculated: OnceLock<Calculated>,
}

impl CachedTradeHistogram {
    /// Uncalculated histogram for `bar_index`
    #[must_use]
    pub const fn new(bar_index: usize, price_step: f64) -> Self {
        Self {
            bar_index,
            price_step,
            calculated: OnceLock::new(),
        }
    }

    /// Underlying bar index
    #[must_use]
    pub const fn bar_index(&self) -> usize {
        self.bar_index
    }

    /// True once the buckets are available
    #[must_use]
    pub fn is_calculated(&self) -> bool {
        self.calculated.get().is_some()
    }

    /// Bucket the bar's trades.
    ///
    /// Concurrent callers may both aggregate; the first result is kept.
    ///
    /// # Errors
    /// Propagates trade lookup failures from `security`.
    pub fn recalculate(&self, security: &dyn Security) -> ClusterResult<()> {
        if self.is_calculated() {
            return Ok(());
        }

        let trades = security.trades(self.bar_index)?;
        let mut by_key: FxHashMap<i64, TradeHistogramBar> = FxHashMap::default();
        for trade in trades.iter() {
            let key = TradeHistogramBar::price_key_of(trade.price, self.price_step);
            by_key
                .entry(key)
                .or_insert_with(|| TradeHistogramBar::new(key))
                .add_trade(trade);
        }
        let buckets = into_sorted(by_key);

        let mut totals = TradeHistogramBar::default();
        for bucket in &buckets {
            totals.merge(bucket);
        }
        let _ = self.calculated.set(Calculated { buckets, totals });
        Ok(())
    }

    /// Buckets in ascending price order; empty until calculated
    #[must_use]
    pub fn buckets(&self) -> &[TradeHistogramBar] {
        self.calculated
            .get()
            .map_or(&[], |calculated| calculated.buckets.as_slice())
    }

    fn totals(&self) -> TradeHistogramBar {
        self.calculated
            .get()
            .map(|calculated| calculated.totals)
            .unwrap_or_default()
    }

    /// Total quantity
    #[must_use]
    pub fn quantity(&self) -> f64 {
        self.totals().quantity
    }

    /// Quantity bought at the ask
    #[must_use]
    pub fn ask_quantity(&self) -> f64 {
        self.totals().ask_quantity
    }

    /// Quantity sold at the bid
    #[must_use]
    pub fn bid_quantity(&self) -> f64 {
        self.totals().bid_quantity
    }

    /// Number of trades
    #[must_use]
    pub fn trades_count(&self) -> u64 {
        self.totals().trades_count
    }

    /// Number of buy-aggressor trades
    #[must_use]
    pub fn ask_trades_count(&self) -> u64 {
        self.totals().ask_trades_count
    }

    /// Number of sell-aggressor trades
    #[must_use]
    pub fn bid_trades_count(&self) -> u64 {
        self.totals().bid_trades_count
    }
}
