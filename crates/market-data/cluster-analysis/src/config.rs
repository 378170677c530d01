//! Cluster analysis configuration

use crate::error::{ClusterError, ClusterResult};
use crate::extremum::{ExtremumParams, ExtremumPriceMode};
use crate::statistics::TradeStatisticsKind;
use chrono::{DateTime, Utc};
use common::constants::{PERCENT_MAX, PERCENT_MIN};
use common::{TimeFrameKind, TimeFrameUnit};
use serde::{Deserialize, Serialize};

/// Largest accepted histogram time frame
pub const MAX_TIME_FRAME: u32 = 365;

/// Cluster analysis configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Price bucketing
    pub histogram: HistogramConfig,

    /// Trade statistics layout
    pub statistics: StatisticsConfig,

    /// Extremum search defaults
    pub extremum: ExtremumConfig,

    /// Cross-pass caching
    pub cache: CacheConfig,

    /// Log output
    pub logging: LoggingConfig,
}

/// Price bucketing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistogramConfig {
    /// Ticks merged into one price bucket
    pub combine_prices_count: u32,
}

/// Trade statistics layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticsConfig {
    /// Histogram length in `time_frame_unit`
    pub time_frame: u32,

    /// Histogram length unit
    pub time_frame_unit: TimeFrameUnit,

    /// Histogram anchoring
    pub time_frame_kind: TimeFrameKind,

    /// Restrict bars to an explicit top period
    pub use_top_time_frame: bool,

    /// Top period length in `top_time_frame_unit`
    pub top_time_frame: u32,

    /// Top period unit
    pub top_time_frame_unit: TimeFrameUnit,

    /// Bars before this date are ignored
    pub start_time: Option<DateTime<Utc>>,

    /// Reported bucket field
    pub kind: TradeStatisticsKind,
}

/// Extremum search defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtremumConfig {
    /// Search direction
    pub price_mode: ExtremumPriceMode,

    /// Lower positional bound, percent
    pub min_bar_pct: f64,

    /// Upper positional bound, percent
    pub max_bar_pct: f64,
}

/// Cross-pass caching
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Reuse handler outputs across passes
    pub derivative_cache_enabled: bool,
}

/// Log output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset
    pub default_filter: String,
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self {
            combine_prices_count: 1,
        }
    }
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            time_frame: 1,
            time_frame_unit: TimeFrameUnit::Hour,
            time_frame_kind: TimeFrameKind::FromMidnightToNow,
            use_top_time_frame: false,
            top_time_frame: 20,
            top_time_frame_unit: TimeFrameUnit::Day,
            start_time: None,
            kind: TradeStatisticsKind::Quantity,
        }
    }
}

impl Default for ExtremumConfig {
    fn default() -> Self {
        Self {
            price_mode: ExtremumPriceMode::Minimum,
            min_bar_pct: PERCENT_MIN,
            max_bar_pct: PERCENT_MAX,
        }
    }
}

impl ExtremumConfig {
    /// Search parameters for the extremum handlers
    #[must_use]
    pub const fn params(&self) -> ExtremumParams {
        ExtremumParams::new(self.price_mode, self.min_bar_pct, self.max_bar_pct)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            derivative_cache_enabled: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_filter: "info".to_string(),
        }
    }
}

impl ClusterConfig {
    /// Load from a file, overridden by `CLUSTER__SECTION__KEY` variables
    ///
    /// # Errors
    /// Unreadable or malformed sources and values rejected by
    /// [`ClusterConfig::validate`].
    pub fn from_file(path: &str) -> ClusterResult<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(
                config::Environment::with_prefix("CLUSTER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject out-of-range values
    ///
    /// # Errors
    /// [`ClusterError::InvalidArgument`] naming the first bad field.
    pub fn validate(&self) -> ClusterResult<()> {
        if self.histogram.combine_prices_count == 0 {
            return Err(ClusterError::invalid_argument("combine_prices_count", 0));
        }
        if !(1..=MAX_TIME_FRAME).contains(&self.statistics.time_frame) {
            return Err(ClusterError::invalid_argument(
                "time_frame",
                self.statistics.time_frame,
            ));
        }
        if self.statistics.use_top_time_frame && self.statistics.top_time_frame == 0 {
            return Err(ClusterError::invalid_argument("top_time_frame", 0));
        }
        for (name, pct) in [
            ("min_bar_pct", self.extremum.min_bar_pct),
            ("max_bar_pct", self.extremum.max_bar_pct),
        ] {
            if !(PERCENT_MIN..=PERCENT_MAX).contains(&pct) {
                return Err(ClusterError::invalid_argument(name, pct));
            }
        }
        Ok(())
    }
}
