//! Host-facing runtime context
//!
//! A [`CacheService`] lives as long as the host session and owns every
//! cross-pass cache. A [`Context`] is created for each recalculation pass
//! and is handed to the handlers.

use crate::config::ClusterConfig;
use crate::derivative_cache::DerivativeTradeStatisticsCache;
use crate::error::ClusterResult;
use crate::histogram::{TradeHistogramsCache, TradeHistogramsCaches};
use crate::security::Security;
use crate::statistics::TradeStatisticsSource;
use dashmap::DashMap;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Object shared through the local or global store
pub type SharedObject = Arc<dyn Any + Send + Sync>;

/// Session information supplied by the host
#[derive(Debug, Clone, Default)]
pub struct RuntimeInfo {
    /// Trading session name
    pub trade_name: String,
    /// Running as a live agent rather than in the lab
    pub is_agent_mode: bool,
    /// Running inside a parameter optimization
    pub is_optimization: bool,
    /// Securities available to the script
    pub securities: Vec<Arc<dyn Security>>,
}

impl RuntimeInfo {
    /// Lab session named `trade_name`
    pub fn new(trade_name: impl Into<String>) -> Self {
        Self {
            trade_name: trade_name.into(),
            ..Self::default()
        }
    }

    /// Set the agent mode flag
    #[must_use]
    pub const fn with_agent_mode(mut self, is_agent_mode: bool) -> Self {
        self.is_agent_mode = is_agent_mode;
        self
    }

    /// Set the optimization flag
    #[must_use]
    pub const fn with_optimization(mut self, is_optimization: bool) -> Self {
        self.is_optimization = is_optimization;
        self
    }

    /// Add a security
    #[must_use]
    pub fn with_security(mut self, security: Arc<dyn Security>) -> Self {
        self.securities.push(security);
        self
    }

    /// Security whose description id matches `id`
    #[must_use]
    pub fn security_by_description_id(&self, id: &str) -> Option<&Arc<dyn Security>> {
        self.securities
            .iter()
            .find(|security| security.description().id() == id)
    }
}

/// Caches shared across recalculation passes
#[derive(Default)]
pub struct CacheService {
    histogram_caches: TradeHistogramsCaches,
    derivative_cache: DerivativeTradeStatisticsCache,
    globals: DashMap<String, SharedObject>,
}

impl fmt::Debug for CacheService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheService")
            .field("histogram_caches", &self.histogram_caches.len())
            .field("derivative_contexts", &self.derivative_cache.len())
            .field("globals", &self.globals.len())
            .finish()
    }
}

impl CacheService {
    /// Empty service
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Histogram cache registry
    #[must_use]
    pub const fn histogram_caches(&self) -> &TradeHistogramsCaches {
        &self.histogram_caches
    }

    /// Derivative output cache
    #[must_use]
    pub const fn derivative_cache(&self) -> &DerivativeTradeStatisticsCache {
        &self.derivative_cache
    }

    /// Store an object for the whole session
    pub fn store_global(&self, key: impl Into<String>, value: SharedObject) {
        self.globals.insert(key.into(), value);
    }

    /// Load a session object
    #[must_use]
    pub fn load_global(&self, key: &str) -> Option<SharedObject> {
        self.globals.get(key).map(|entry| entry.value().clone())
    }
}

/// Reusable `f64` buffers
#[derive(Debug, Default)]
pub struct ArrayPool {
    buffers: Mutex<Vec<Vec<f64>>>,
}

impl ArrayPool {
    /// Zero-filled buffer of `len` values
    #[must_use]
    pub fn get(&self, len: usize) -> Vec<f64> {
        let mut buffer = self.buffers.lock().pop().unwrap_or_default();
        buffer.clear();
        buffer.resize(len, 0.0);
        buffer
    }

    /// Return a buffer for reuse
    pub fn release(&self, buffer: Vec<f64>) {
        self.buffers.lock().push(buffer);
    }

    /// Buffers waiting for reuse
    #[must_use]
    pub fn available(&self) -> usize {
        self.buffers.lock().len()
    }
}

/// State of one recalculation pass
pub struct Context {
    runtime: Option<RuntimeInfo>,
    services: Arc<CacheService>,
    objects: Mutex<FxHashMap<String, SharedObject>>,
    statistics: Mutex<FxHashMap<String, Arc<dyn TradeStatisticsSource>>>,
    arrays: ArrayPool,
    derivative_cache_enabled: bool,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("runtime", &self.runtime.as_ref().map(|r| &r.trade_name))
            .field("derivative_cache_enabled", &self.derivative_cache_enabled)
            .finish()
    }
}

impl Context {
    /// Pass context over `services`
    #[must_use]
    pub fn new(services: Arc<CacheService>) -> Self {
        Self {
            runtime: None,
            services,
            objects: Mutex::new(FxHashMap::default()),
            statistics: Mutex::new(FxHashMap::default()),
            arrays: ArrayPool::default(),
            derivative_cache_enabled: true,
        }
    }

    /// Pass context honoring the `cache` section of `config`
    #[must_use]
    pub fn from_config(services: Arc<CacheService>, config: &ClusterConfig) -> Self {
        Self::new(services).with_derivative_cache(config.cache.derivative_cache_enabled)
    }

    /// Attach a runtime
    #[must_use]
    pub fn with_runtime(mut self, runtime: RuntimeInfo) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Enable or disable derivative caching
    #[must_use]
    pub const fn with_derivative_cache(mut self, enabled: bool) -> Self {
        self.derivative_cache_enabled = enabled;
        self
    }

    /// Host runtime, if any
    #[must_use]
    pub const fn runtime(&self) -> Option<&RuntimeInfo> {
        self.runtime.as_ref()
    }

    /// Whether handlers may reuse cached outputs
    #[must_use]
    pub const fn derivative_cache_enabled(&self) -> bool {
        self.derivative_cache_enabled
    }

    /// Session caches
    #[must_use]
    pub fn services(&self) -> &Arc<CacheService> {
        &self.services
    }

    /// Derivative output cache
    #[must_use]
    pub fn derivative_cache(&self) -> &DerivativeTradeStatisticsCache {
        self.services.derivative_cache()
    }

    /// Shared histogram cache for `security`
    ///
    /// # Errors
    /// See [`TradeHistogramsCaches::get`].
    pub fn histogram_cache(
        &self,
        security: &Arc<dyn Security>,
        combine_prices_count: u32,
    ) -> ClusterResult<Arc<TradeHistogramsCache>> {
        self.services.histogram_caches().get(security, combine_prices_count)
    }

    /// Zero-filled buffer from the pass pool
    #[must_use]
    pub fn get_array(&self, len: usize) -> Vec<f64> {
        self.arrays.get(len)
    }

    /// Return a buffer to the pass pool
    pub fn release_array(&self, buffer: Vec<f64>) {
        self.arrays.release(buffer);
    }

    /// Statistics registered under `state_id` in this pass, built with
    /// `factory` on first request
    ///
    /// # Errors
    /// Failures returned by `factory`.
    pub fn get_trade_statistics<F>(&self, state_id: &str, factory: F) -> ClusterResult<Arc<dyn TradeStatisticsSource>>
    where
        F: FnOnce() -> ClusterResult<Arc<dyn TradeStatisticsSource>>,
    {
        if let Some(statistics) = self.statistics.lock().get(state_id) {
            debug!(state_id, "Trade statistics reused");
            return Ok(statistics.clone());
        }

        let statistics = factory()?;
        Ok(self
            .statistics
            .lock()
            .entry(state_id.to_string())
            .or_insert(statistics)
            .clone())
    }

    /// Store an object for this pass
    pub fn store_object(&self, key: impl Into<String>, value: SharedObject) {
        self.objects.lock().insert(key.into(), value);
    }

    /// Load an object stored in this pass
    #[must_use]
    pub fn load_object(&self, key: &str) -> Option<SharedObject> {
        self.objects.lock().get(key).cloned()
    }
}
