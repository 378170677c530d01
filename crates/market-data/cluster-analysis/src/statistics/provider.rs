//! Per-bar accumulated buckets

use super::histogram::TradeHistogram;
use crate::error::ClusterResult;
use crate::histogram::{TradeHistogramBar, TradeHistogramsCache};
use rustc_hash::FxHashMap;
use std::sync::Arc;

struct Accumulated {
    histogram: usize,
    last_merged: usize,
    by_key: FxHashMap<i64, TradeHistogramBar>,
}

/// Buckets of the histogram covering bar `i`, accumulated from its earliest
/// bar up to `i`.
///
/// Ascending queries inside one histogram only merge the new bars.
pub struct AggregatedHistogramBarsProvider<'a> {
    histograms: &'a [Arc<TradeHistogram>],
    cache: &'a Arc<TradeHistogramsCache>,
    accumulated: Option<Accumulated>,
}

impl<'a> AggregatedHistogramBarsProvider<'a> {
    /// Provider over `histograms`, which must be ordered by bar index
    #[must_use]
    pub fn new(histograms: &'a [Arc<TradeHistogram>], cache: &'a Arc<TradeHistogramsCache>) -> Self {
        Self {
            histograms,
            cache,
            accumulated: None,
        }
    }

    /// Index of the last histogram with `first <= bar_index <= last`
    fn covering(&self, bar_index: usize) -> Option<usize> {
        let position = self
            .histograms
            .partition_point(|histogram| histogram.first_bar_index() <= bar_index);
        let candidate = position.checked_sub(1)?;
        (self.histograms[candidate].last_bar_index() >= bar_index).then_some(candidate)
    }

    /// Accumulated buckets for bar `bar_index` in ascending price order;
    /// empty when no histogram covers the bar.
    ///
    /// # Errors
    /// Histogram cache failures.
    pub fn aggregated_bars(&mut self, bar_index: usize) -> ClusterResult<Vec<TradeHistogramBar>> {
        let Some(histogram) = self.covering(bar_index) else {
            return Ok(Vec::new());
        };

        let resume = self
            .accumulated
            .as_ref()
            .filter(|acc| acc.histogram == histogram && acc.last_merged <= bar_index)
            .map(|acc| acc.last_merged + 1);
        let from = match resume {
            Some(from) => from,
            None => {
                self.accumulated = Some(Accumulated {
                    histogram,
                    last_merged: 0,
                    by_key: FxHashMap::default(),
                });
                self.histograms[histogram].real_first_bar_index()
            }
        };

        let cached = self.cache.histograms(from, bar_index)?;
        let Some(acc) = self.accumulated.as_mut() else {
            return Ok(Vec::new());
        };
        for bucket in cached.iter().flat_map(|h| h.buckets()) {
            acc.by_key
                .entry(bucket.price_key)
                .and_modify(|merged| merged.merge(bucket))
                .or_insert(*bucket);
        }
        acc.last_merged = bar_index;

        let mut buckets: Vec<_> = acc.by_key.values().copied().collect();
        buckets.sort_unstable_by_key(|bucket| bucket.price_key);
        Ok(buckets)
    }
}
