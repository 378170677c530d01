//! Trade histograms: price buckets, per-bar histograms and their cache

pub mod bar;
pub mod cache;
pub mod cached;

pub use bar::TradeHistogramBar;
pub use cache::{TradeHistogramsCache, TradeHistogramsCaches};
pub use cached::CachedTradeHistogram;

use rustc_hash::FxHashMap;

/// Bucket map into a price-ascending list
pub(crate) fn into_sorted(by_key: FxHashMap<i64, TradeHistogramBar>) -> Vec<TradeHistogramBar> {
    let mut buckets: Vec<_> = by_key.into_values().collect();
    buckets.sort_unstable_by_key(|bucket| bucket.price_key);
    buckets
}

/// Merge bucket lists by price key into one price-ascending list
pub fn merge_buckets<'a, I>(lists: I) -> Vec<TradeHistogramBar>
where
    I: IntoIterator<Item = &'a [TradeHistogramBar]>,
{
    let mut by_key: FxHashMap<i64, TradeHistogramBar> = FxHashMap::default();
    for bucket in lists.into_iter().flatten() {
        by_key
            .entry(bucket.price_key)
            .and_modify(|merged| merged.merge(bucket))
            .or_insert(*bucket);
    }
    into_sorted(by_key)
}
