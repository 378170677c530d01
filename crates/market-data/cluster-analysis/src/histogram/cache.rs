//! Histogram cache shared by every statistic built on one security

use super::cached::CachedTradeHistogram;
use crate::error::{ClusterError, ClusterResult};
use crate::keys::format_bool;
use crate::security::{BarSeries, Security, same_security};
use common::Interval;
use dashmap::DashMap;
use parking_lot::RwLock;
use rayon::prelude::*;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

static NEXT_CACHE_ID: AtomicU64 = AtomicU64::new(1);

struct CacheState {
    security: Arc<dyn Security>,
    bars: BarSeries,
    histograms: Vec<Arc<CachedTradeHistogram>>,
    generation: u64,
}

/// One [`CachedTradeHistogram`] per bar of a security
///
/// Histograms survive between recalculation passes as long as the bar
/// series only grows. `generation` changes whenever cached histograms had
/// to be thrown away.
pub struct TradeHistogramsCache {
    cache_id: u64,
    combine_prices_count: u32,
    price_step: f64,
    state_id: String,
    state: RwLock<CacheState>,
}

impl fmt::Debug for TradeHistogramsCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TradeHistogramsCache")
            .field("cache_id", &self.cache_id)
            .field("state_id", &self.state_id)
            .field("price_step", &self.price_step)
            .field("bars", &self.bars_count())
            .finish()
    }
}

impl TradeHistogramsCache {
    /// Cache for `security`, bucketing prices by `tick * combine_prices_count`
    ///
    /// # Errors
    /// [`ClusterError::InvalidArgument`] for a zero combine count; bar
    /// loading failures from `security`.
    pub fn new(security: Arc<dyn Security>, combine_prices_count: u32) -> ClusterResult<Self> {
        if combine_prices_count == 0 {
            return Err(ClusterError::invalid_argument("combine_prices_count", 0));
        }

        let tick = security.tick();
        let tick = if tick.is_finite() && tick > 0.0 { tick } else { 1.0 };
        let state_id = format!(
            "{}.{}.{}.{}",
            security.cache_name(),
            security.interval(),
            format_bool(security.is_aligned()),
            combine_prices_count
        );

        let cache = Self {
            cache_id: NEXT_CACHE_ID.fetch_add(1, Ordering::Relaxed),
            combine_prices_count,
            price_step: tick * f64::from(combine_prices_count),
            state_id,
            state: RwLock::new(CacheState {
                security,
                bars: Arc::from(Vec::new()),
                histograms: Vec::new(),
                generation: 0,
            }),
        };
        cache.sync()?;
        Ok(cache)
    }

    /// Unique id of this cache instance
    #[must_use]
    pub const fn cache_id(&self) -> u64 {
        self.cache_id
    }

    /// Changes whenever cached histograms were discarded
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.state.read().generation
    }

    /// Fingerprint of the security and bucketing
    #[must_use]
    pub fn state_id(&self) -> &str {
        &self.state_id
    }

    /// Price bucket width
    #[must_use]
    pub const fn price_step(&self) -> f64 {
        self.price_step
    }

    /// Price step multiplier
    #[must_use]
    pub const fn combine_prices_count(&self) -> u32 {
        self.combine_prices_count
    }

    /// Security the histograms are built from
    #[must_use]
    pub fn security(&self) -> Arc<dyn Security> {
        self.state.read().security.clone()
    }

    /// Bar snapshot taken at the last sync
    #[must_use]
    pub fn bars(&self) -> BarSeries {
        self.state.read().bars.clone()
    }

    /// Number of bars at the last sync
    #[must_use]
    pub fn bars_count(&self) -> usize {
        self.state.read().bars.len()
    }

    /// Point the cache at another handle of the same security and sync
    ///
    /// # Errors
    /// See [`TradeHistogramsCache::sync`].
    pub fn rebind(&self, security: Arc<dyn Security>) -> ClusterResult<()> {
        {
            let mut state = self.state.write();
            if !same_security(&state.security, &security) {
                state.security = security;
            }
        }
        self.sync()
    }

    /// Reconcile with the security's current bars.
    ///
    /// When the old first and second-to-last bars are still in place the
    /// cached histograms are kept, except the old last one which may still
    /// have been forming. Anything else discards the cache.
    ///
    /// # Errors
    /// Bar loading failures from the security.
    pub fn sync(&self) -> ClusterResult<()> {
        let security = self.security();
        let bars = security.bars()?;

        let mut state = self.state.write();
        if Arc::ptr_eq(&state.bars, &bars) {
            return Ok(());
        }

        let old_len = state.bars.len();
        let extends = old_len > 0
            && bars.len() >= old_len
            && Arc::ptr_eq(&state.bars[0], &bars[0])
            && (old_len < 2 || Arc::ptr_eq(&state.bars[old_len - 2], &bars[old_len - 2]));

        let keep = if extends {
            old_len - 1
        } else {
            if old_len > 0 {
                state.generation += 1;
                info!(
                    state_id = %self.state_id,
                    generation = state.generation,
                    "Trade histogram cache invalidated"
                );
            }
            0
        };

        state.histograms.truncate(keep);
        let price_step = self.price_step;
        state
            .histograms
            .extend((keep..bars.len()).map(|index| Arc::new(CachedTradeHistogram::new(index, price_step))));
        debug!(
            state_id = %self.state_id,
            kept = keep,
            bars = bars.len(),
            "Trade histogram cache synced"
        );
        state.bars = bars;
        Ok(())
    }

    /// Calculated histogram of bar `index`
    ///
    /// # Errors
    /// [`ClusterError::BarIndexOutOfRange`] for an unknown bar; trade lookup
    /// failures from the security.
    pub fn histogram(&self, index: usize) -> ClusterResult<Arc<CachedTradeHistogram>> {
        let (histogram, security) = {
            let state = self.state.read();
            let histogram = state
                .histograms
                .get(index)
                .cloned()
                .ok_or(ClusterError::BarIndexOutOfRange {
                    index,
                    len: state.histograms.len(),
                })?;
            (histogram, state.security.clone())
        };
        histogram.recalculate(security.as_ref())?;
        Ok(histogram)
    }

    /// Calculated histograms of bars `[first, last]`, empty when inverted.
    ///
    /// Missing histograms are calculated in parallel.
    ///
    /// # Errors
    /// Same as [`TradeHistogramsCache::histogram`].
    pub fn histograms(&self, first: usize, last: usize) -> ClusterResult<Vec<Arc<CachedTradeHistogram>>> {
        if first > last {
            return Ok(Vec::new());
        }

        let (histograms, security) = {
            let state = self.state.read();
            if last >= state.histograms.len() {
                return Err(ClusterError::BarIndexOutOfRange {
                    index: last,
                    len: state.histograms.len(),
                });
            }
            (state.histograms[first..=last].to_vec(), state.security.clone())
        };

        let pending: Vec<_> = histograms.iter().filter(|h| !h.is_calculated()).collect();
        if !pending.is_empty() {
            debug!(
                state_id = %self.state_id,
                count = pending.len(),
                "Recalculating trade histograms"
            );
            pending
                .par_iter()
                .try_for_each(|histogram| histogram.recalculate(security.as_ref()))?;
        }
        Ok(histograms)
    }
}

type CacheKey = (String, Interval, bool, u32);

/// Registry of histogram caches, one per security and bucketing
#[derive(Debug, Default)]
pub struct TradeHistogramsCaches {
    caches: DashMap<CacheKey, Arc<TradeHistogramsCache>>,
}

impl TradeHistogramsCaches {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared cache for `security`, synced with its current bars
    ///
    /// # Errors
    /// See [`TradeHistogramsCache::new`] and [`TradeHistogramsCache::sync`].
    pub fn get(
        &self,
        security: &Arc<dyn Security>,
        combine_prices_count: u32,
    ) -> ClusterResult<Arc<TradeHistogramsCache>> {
        let key = (
            security.cache_name(),
            security.interval(),
            security.is_aligned(),
            combine_prices_count,
        );
        if let Some(cache) = self.caches.get(&key).map(|entry| entry.value().clone()) {
            cache.rebind(security.clone())?;
            return Ok(cache);
        }

        let cache = Arc::new(TradeHistogramsCache::new(security.clone(), combine_prices_count)?);
        Ok(self.caches.entry(key).or_insert(cache).value().clone())
    }

    /// Number of registered caches
    #[must_use]
    pub fn len(&self) -> usize {
        self.caches.len()
    }

    /// True when no cache is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.caches.is_empty()
    }

    /// Drop every cache
    pub fn clear(&self) {
        self.caches.clear();
    }
}
