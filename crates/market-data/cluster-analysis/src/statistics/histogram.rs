//! Histogram spanning a range of underlying bars

use crate::error::ClusterResult;
use crate::histogram::{TradeHistogramBar, TradeHistogramsCache, merge_buckets};
use chrono::{DateTime, Utc};
use std::sync::{Arc, OnceLock};

/// Buckets merged over the cached histograms of
/// `[real_first_bar_index, last_bar_index]`
///
/// `first_bar_index` is the bar the histogram is aligned to. Only combined
/// histograms have `real_first_bar_index < first_bar_index`.
#[derive(Debug)]
pub struct TradeHistogram {
    cache: Arc<TradeHistogramsCache>,
    first_bar_index: usize,
    last_bar_index: usize,
    real_first_bar_index: usize,
    low_date: DateTime<Utc>,
    high_date: DateTime<Utc>,
    buckets: OnceLock<Arc<[TradeHistogramBar]>>,
}

impl TradeHistogram {
    /// Histogram over bars `[first_bar_index, last_bar_index]`
    #[must_use]
    pub fn new(
        cache: Arc<TradeHistogramsCache>,
        first_bar_index: usize,
        last_bar_index: usize,
        low_date: DateTime<Utc>,
        high_date: DateTime<Utc>,
    ) -> Self {
        Self::spanning(cache, first_bar_index, first_bar_index, last_bar_index, low_date, high_date)
    }

    pub(crate) fn spanning(
        cache: Arc<TradeHistogramsCache>,
        real_first_bar_index: usize,
        first_bar_index: usize,
        last_bar_index: usize,
        low_date: DateTime<Utc>,
        high_date: DateTime<Utc>,
    ) -> Self {
        Self {
            cache,
            first_bar_index,
            last_bar_index,
            real_first_bar_index,
            low_date,
            high_date,
            buckets: OnceLock::new(),
        }
    }

    /// Stack of histograms from `front` to `back`
    #[must_use]
    pub fn combined(front: &Self, back: &Self) -> Self {
        Self::spanning(
            back.cache.clone(),
            front.first_bar_index,
            back.first_bar_index,
            back.last_bar_index,
            front.low_date,
            back.high_date,
        )
    }

    /// Bar the histogram is aligned to
    #[must_use]
    pub const fn first_bar_index(&self) -> usize {
        self.first_bar_index
    }

    /// Last summarized bar
    #[must_use]
    pub const fn last_bar_index(&self) -> usize {
        self.last_bar_index
    }

    /// Earliest summarized bar
    #[must_use]
    pub const fn real_first_bar_index(&self) -> usize {
        self.real_first_bar_index
    }

    /// Start of the covered period
    #[must_use]
    pub const fn low_date(&self) -> DateTime<Utc> {
        self.low_date
    }

    /// End of the covered period
    #[must_use]
    pub const fn high_date(&self) -> DateTime<Utc> {
        self.high_date
    }

    /// Histogram cache the buckets come from
    #[must_use]
    pub fn cache(&self) -> &Arc<TradeHistogramsCache> {
        &self.cache
    }

    /// True once the merged buckets are available
    #[must_use]
    pub fn is_calculated(&self) -> bool {
        self.buckets.get().is_some()
    }

    /// Merge the underlying buckets; a no-op when already calculated.
    ///
    /// # Errors
    /// Histogram cache failures.
    pub fn recalculate(&self) -> ClusterResult<()> {
        if self.is_calculated() {
            return Ok(());
        }
        let cached = self
            .cache
            .histograms(self.real_first_bar_index, self.last_bar_index)?;
        let merged = merge_buckets(cached.iter().map(|histogram| histogram.buckets()));
        let _ = self.buckets.set(Arc::from(merged));
        Ok(())
    }

    /// Merged buckets in ascending price order
    ///
    /// # Errors
    /// Histogram cache failures.
    pub fn bars(&self) -> ClusterResult<Arc<[TradeHistogramBar]>> {
        self.recalculate()?;
        Ok(self
            .buckets
            .get()
            .cloned()
            .unwrap_or_else(|| Arc::from(Vec::new())))
    }

    /// True when no underlying bar has trades. Does not merge buckets.
    ///
    /// # Errors
    /// Histogram cache failures.
    pub fn is_empty(&self) -> ClusterResult<bool> {
        if let Some(buckets) = self.buckets.get() {
            return Ok(buckets.is_empty());
        }
        Ok(self
            .cache
            .histograms(self.real_first_bar_index, self.last_bar_index)?
            .iter()
            .all(|histogram| histogram.buckets().is_empty()))
    }
}
