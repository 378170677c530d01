//! Entry handler building trade statistics for a security

use super::kind::TradeStatisticsKind;
use super::trade_statistics::{TradeStatistics, TradeStatisticsSettings, TradeStatisticsSource, TradeStatisticsWithKind};
use crate::config::{ClusterConfig, MAX_TIME_FRAME};
use crate::context::Context;
use crate::error::{ClusterError, ClusterResult};
use crate::keys::{format_bool, handler_id, join_key};
use crate::security::Security;
use chrono::{DateTime, Utc};
use common::constants::{DAYS_PER_MONTH, DAYS_PER_WEEK};
use common::{DataIntervals, TimeFrameFactory, TimeFrameKind, TimeFrameUnit};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 3_600;
const SECONDS_PER_DAY: i64 = 86_400;

/// Builds [`TradeStatistics`] for a security, memoized per pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeStatisticsHandler {
    /// Host variable id
    pub variable_id: String,
    /// Histograms from midnight or trailing windows
    pub time_frame_kind: TimeFrameKind,
    /// `1..=365` units of `time_frame_unit`
    pub time_frame: u32,
    /// Unit of `time_frame`
    pub time_frame_unit: TimeFrameUnit,
    /// Bars dated before this are left out
    pub start_time: Option<DateTime<Utc>>,
    /// Restrict bars to the top period holding the last bar
    pub use_top_time_frame: bool,
    /// Length of the top period
    pub top_time_frame: u32,
    /// Unit of `top_time_frame`
    pub top_time_frame_unit: TimeFrameUnit,
    /// Price step multiplier of the histogram cache
    pub combine_prices_count: u32,
    /// Statistic read by downstream handlers
    pub kind: TradeStatisticsKind,
}

impl TradeStatisticsHandler {
    /// Handler configured from the `histogram` and `statistics` sections
    #[must_use]
    pub fn from_config(variable_id: impl Into<String>, config: &ClusterConfig) -> Self {
        let statistics = &config.statistics;
        Self {
            variable_id: variable_id.into(),
            time_frame_kind: statistics.time_frame_kind,
            time_frame: statistics.time_frame,
            time_frame_unit: statistics.time_frame_unit,
            start_time: statistics.start_time,
            use_top_time_frame: statistics.use_top_time_frame,
            top_time_frame: statistics.top_time_frame,
            top_time_frame_unit: statistics.top_time_frame_unit,
            combine_prices_count: config.histogram.combine_prices_count,
            kind: statistics.kind,
        }
    }

    /// Top period as `(number, unit)`.
    ///
    /// Without an explicit top period this is the longest span expressible
    /// in `i32::MAX` seconds, rounded down to a multiple of the time frame.
    ///
    /// # Errors
    /// [`ClusterError::InvalidArgument`] for a time frame outside
    /// `1..=365`; [`ClusterError::InvalidTimeFrame`] when the top period is
    /// not a multiple of the time frame (months over weeks are allowed).
    pub fn top_time_frame(&self) -> ClusterResult<(u32, TimeFrameUnit)> {
        if !(1..=MAX_TIME_FRAME).contains(&self.time_frame) {
            return Err(ClusterError::invalid_argument("time_frame", self.time_frame));
        }
        let interval = TimeFrameFactory::get_interval(self.time_frame, self.time_frame_unit);

        if self.use_top_time_frame {
            let top = TimeFrameFactory::get_interval(self.top_time_frame, self.top_time_frame_unit);
            let divisible = top.to_seconds()? % interval.to_seconds()? == 0;
            let months_over_weeks = top.base == DataIntervals::Months && interval.base == DataIntervals::Weeks;
            if !divisible && !months_over_weeks {
                return Err(ClusterError::InvalidTimeFrame {
                    message: format!(
                        "top time frame {}:{} must be divisible by time frame {}:{}",
                        self.top_time_frame, self.top_time_frame_unit, self.time_frame, self.time_frame_unit
                    ),
                });
            }
            return Ok((self.top_time_frame, self.top_time_frame_unit));
        }

        let max_seconds = i64::from(i32::MAX);
        let number = match self.time_frame_unit {
            TimeFrameUnit::Second => max_seconds,
            TimeFrameUnit::Minute => max_seconds / SECONDS_PER_MINUTE,
            TimeFrameUnit::Hour => max_seconds / SECONDS_PER_HOUR,
            TimeFrameUnit::Day => max_seconds / SECONDS_PER_DAY,
            TimeFrameUnit::Week => max_seconds / SECONDS_PER_DAY / DAYS_PER_WEEK,
            TimeFrameUnit::Month => max_seconds / SECONDS_PER_DAY / DAYS_PER_MONTH,
        };
        let time_frame = i64::from(self.time_frame);
        let number = u32::try_from(number / time_frame * time_frame)
            .map_err(|_| ClusterError::invalid_argument("top_time_frame", number))?;
        Ok((number, self.time_frame_unit))
    }

    /// Fingerprint of the security and layout
    ///
    /// # Errors
    /// See [`TradeStatisticsHandler::top_time_frame`].
    pub fn state_id(&self, security: &dyn Security) -> ClusterResult<String> {
        let (top_number, top_unit) = self.top_time_frame()?;
        let description = security.description();
        let description_id = format!("{}-{}", description.id(), description.ds_name());
        let mut state_id = join_key(&[
            &description_id,
            &security.interval().value,
            &format_bool(security.is_aligned()),
            &self.combine_prices_count,
            &self.time_frame_kind,
            &self.time_frame,
            &self.time_frame_unit,
            &top_number,
            &top_unit,
        ]);
        if let Some(start_time) = self.start_time {
            state_id.push('.');
            state_id.push_str(&start_time.to_rfc3339());
        }
        Ok(state_id)
    }

    /// Statistics over `security`
    ///
    /// # Errors
    /// Time frame validation, interval conversion and histogram cache
    /// failures.
    pub fn execute(&self, ctx: &Context, security: &Arc<dyn Security>) -> ClusterResult<TradeStatisticsWithKind> {
        let (top_number, top_unit) = self.top_time_frame()?;
        let settings = TradeStatisticsSettings {
            time_frame: self.time_frame,
            time_frame_unit: self.time_frame_unit,
            time_frame_kind: self.time_frame_kind,
            top_interval: TimeFrameFactory::get_interval(top_number, top_unit),
            use_top_time_frame: self.use_top_time_frame,
            start_time: self.start_time,
        };
        let id = handler_id(ctx.runtime(), &self.variable_id);
        let state_id = self.state_id(security.as_ref())?;

        let statistics = ctx.get_trade_statistics(&state_id, || {
            let cache = ctx.histogram_cache(security, self.combine_prices_count)?;
            let statistics = TradeStatistics::new(id, state_id.clone(), cache, settings)?;
            Ok(Arc::new(statistics) as Arc<dyn TradeStatisticsSource>)
        })?;
        Ok(TradeStatisticsWithKind::new(statistics, self.kind))
    }
}

impl Default for TradeStatisticsHandler {
    fn default() -> Self {
        Self::from_config(String::new(), &ClusterConfig::default())
    }
}
