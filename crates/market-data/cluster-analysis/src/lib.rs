//! Cluster analysis engine
//!
//! Builds per-bar trade statistics for plug-in indicator handlers:
//! - Gap-filled views of sparse bar series
//! - Per-bar trade histograms cached across passes
//! - Histograms laid out on time frames and stacked into windows
//! - Extremum prices and values with incremental output caching
//! - Buy and sell volume per bar

pub mod aligned;
pub mod config;
pub mod context;
pub mod derivative_cache;
pub mod error;
pub mod extremum;
pub mod histogram;
pub mod keys;
pub mod logging;
pub mod security;
pub mod statistics;
pub mod volume;

pub use aligned::{AlignedBar, AlignedBars, AlignedDescription, AlignedSecurity, align_bars};
pub use config::ClusterConfig;
pub use context::{ArrayPool, CacheService, Context, RuntimeInfo};
pub use derivative_cache::{DerivativeTradeStatisticsCache, DerivativeTradeStatisticsCacheContext};
pub use error::{ClusterError, ClusterResult};
pub use extremum::{
    ComparisonMode, ExtremumParams, ExtremumPriceMode, ExtremumTrims, TradeStatisticsExtendedExtremumPriceHandler,
    TradeStatisticsExtremumPriceHandler, TradeStatisticsExtremumValueHandler, TrimContext,
};
pub use histogram::{CachedTradeHistogram, TradeHistogramBar, TradeHistogramsCache, TradeHistogramsCaches};
pub use security::{
    BarSeries, DataSourceSecurity, InstrumentDescription, Security, TradeList, VecSecurity, same_security,
};
pub use statistics::{
    AggregatedHistogramBarsProvider, TradeHistogram, TradeStatistics, TradeStatisticsCombine,
    TradeStatisticsCombineHandler, TradeStatisticsHandler, TradeStatisticsKind, TradeStatisticsSettings,
    TradeStatisticsSource, TradeStatisticsWithKind,
};
pub use volume::{BuysSellsHandler, QuantityMode, VolumeSide};
