//! Cache of per-bar outputs derived from trade statistics
//!
//! Handlers store their output series under their identity together with
//! the fingerprint of what produced it. A later pass reuses the stored
//! prefix when the fingerprint, the histogram cache and its generation all
//! still match.
//!
//! Callers serialize access per identity; the cache does not lock across a
//! get, compute and set sequence.

use crate::context::Context;
use crate::error::ClusterResult;
use crate::histogram::TradeHistogramsCache;
use crate::keys::handler_id;
use crate::statistics::TradeStatisticsSource;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// Stored output of one handler
#[derive(Debug, Clone, PartialEq)]
pub struct DerivativeTradeStatisticsCacheContext {
    /// Fingerprint of parameters and statistics
    pub state_id: String,
    /// Histogram cache the values were computed from
    pub cache_id: u64,
    /// Generation of that cache at store time
    pub cache_generation: u64,
    /// Output series
    pub values: Vec<f64>,
}

impl DerivativeTradeStatisticsCacheContext {
    fn is_valid_for(&self, state_id: &str, cache: &TradeHistogramsCache) -> bool {
        self.state_id == state_id
            && self.cache_id == cache.cache_id()
            && self.cache_generation == cache.generation()
            && self.values.len() >= 2
    }
}

/// Output series keyed by handler identity
#[derive(Debug, Default)]
pub struct DerivativeTradeStatisticsCache {
    contexts: DashMap<String, DerivativeTradeStatisticsCacheContext>,
}

impl DerivativeTradeStatisticsCache {
    /// Empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the stored context of `id` if it is still valid for `state_id`
    /// over `cache`. Stale contexts are dropped.
    pub fn get_context(
        &self,
        id: &str,
        state_id: &str,
        cache: &TradeHistogramsCache,
    ) -> Option<DerivativeTradeStatisticsCacheContext> {
        let (_, context) = self.contexts.remove(id)?;
        if context.is_valid_for(state_id, cache) {
            debug!(id, cached = context.values.len(), "Derivative cache hit");
            Some(context)
        } else {
            debug!(id, state_id, stale = %context.state_id, "Derivative cache entry dropped");
            None
        }
    }

    /// Store `values` for `id`, replacing any previous context
    pub fn set_context(&self, id: &str, state_id: &str, cache: &TradeHistogramsCache, values: Vec<f64>) {
        self.contexts.insert(
            id.to_string(),
            DerivativeTradeStatisticsCacheContext {
                state_id: state_id.to_string(),
                cache_id: cache.cache_id(),
                cache_generation: cache.generation(),
                values,
            },
        );
    }

    /// Number of stored contexts
    #[must_use]
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    /// True when nothing is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Drop every context
    pub fn clear(&self) {
        self.contexts.clear();
    }
}

/// One incremental computation of a per-bar series
///
/// Starts from the reusable prefix of a cached series when caching applies,
/// otherwise from a pooled zeroed buffer.
pub struct DerivativeRun<'a> {
    ctx: Option<&'a Context>,
    cache: Arc<TradeHistogramsCache>,
    key: Option<(String, String)>,
    values: Vec<f64>,
    cached_count: usize,
    last_value: f64,
}

impl<'a> DerivativeRun<'a> {
    /// Prepare an output series for `source`.
    ///
    /// Caching applies to static timelines with more than one bar under a
    /// non-optimization runtime with the derivative cache enabled.
    #[must_use]
    pub fn begin(
        ctx: Option<&'a Context>,
        source: &dyn TradeStatisticsSource,
        variable_id: &str,
        state_id: String,
    ) -> Self {
        let cache = source.cache().clone();
        let bars_count = cache.bars_count();
        let runtime = ctx.and_then(Context::runtime);
        let eligible = source.has_static_timeline()
            && bars_count > 1
            && runtime.is_some_and(|runtime| !runtime.is_optimization)
            && ctx.is_some_and(Context::derivative_cache_enabled);

        let mut run = Self {
            ctx,
            cache,
            key: None,
            values: Vec::new(),
            cached_count: 0,
            last_value: f64::NAN,
        };

        let Some(ctx) = ctx.filter(|_| eligible) else {
            run.values = ctx.map_or_else(|| vec![0.0; bars_count], |ctx| ctx.get_array(bars_count));
            return run;
        };

        let id = handler_id(runtime, variable_id);
        match ctx.derivative_cache().get_context(&id, &state_id, &run.cache) {
            Some(context) => {
                let cached = context.values.len().min(bars_count) - 1;
                run.values = if context.values.len() == bars_count {
                    context.values
                } else {
                    let mut values = vec![0.0; bars_count];
                    values[..cached].copy_from_slice(&context.values[..cached]);
                    values
                };
                run.cached_count = cached;
                run.last_value = run.values[cached - 1];
            }
            None => run.values = vec![0.0; bars_count],
        }
        run.key = Some((id, state_id));
        run
    }

    /// Bars reused from the cache
    #[must_use]
    pub const fn cached_count(&self) -> usize {
        self.cached_count
    }

    /// Last reused value, NaN without a cache hit
    #[must_use]
    pub const fn last_value(&self) -> f64 {
        self.last_value
    }

    /// Compute bars `[first, last]` with `step`, carry the running value
    /// over the rest and store the result when caching applies.
    ///
    /// `step` receives the bar index and the running value and returns the
    /// new running value.
    ///
    /// # Errors
    /// Failures returned by `step`.
    pub fn fill<F>(mut self, range: Option<(usize, usize)>, mut step: F) -> ClusterResult<Vec<f64>>
    where
        F: FnMut(usize, f64) -> ClusterResult<f64>,
    {
        let bars_count = self.values.len();
        let mut last = self.last_value;
        let (first, end) = match range {
            Some((first, last_index)) => (first.min(bars_count), (last_index + 1).min(bars_count)),
            None => (bars_count, bars_count),
        };

        for value in self.values.iter_mut().take(first).skip(self.cached_count) {
            *value = last;
        }
        for index in self.cached_count.max(first)..end {
            last = step(index, last)?;
            self.values[index] = last;
        }
        for value in self.values.iter_mut().skip(self.cached_count.max(end)) {
            *value = last;
        }

        if let (Some(ctx), Some((id, state_id))) = (self.ctx, self.key.take()) {
            ctx.derivative_cache()
                .set_context(&id, &state_id, &self.cache, self.values.clone());
        }
        Ok(self.values)
    }
}
