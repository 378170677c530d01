//! Histograms laid out on a time frame

use super::histogram::TradeHistogram;
use super::kind::TradeStatisticsKind;
use super::provider::AggregatedHistogramBarsProvider;
use crate::error::ClusterResult;
use crate::histogram::{TradeHistogramBar, TradeHistogramsCache};
use chrono::{DateTime, Duration, Utc};
use common::{DataBar, Interval, PeriodBounds, TimeFrameFactory, TimeFrameKind, TimeFrameUnit};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Anything that exposes a list of histograms over a histogram cache
pub trait TradeStatisticsSource: fmt::Debug + Send + Sync {
    /// Handler identity
    fn id(&self) -> &str;

    /// Fingerprint of the parameters and data
    fn state_id(&self) -> &str;

    /// Histograms ordered by bar index
    fn histograms(&self) -> &[Arc<TradeHistogram>];

    /// True when bar indexes stay stable across passes
    fn has_static_timeline(&self) -> bool;

    /// Cache the histograms read from
    fn cache(&self) -> &Arc<TradeHistogramsCache>;

    /// Unit of the underlying time frame
    fn time_frame_unit(&self) -> TimeFrameUnit;

    /// First and last bar covered by any histogram
    fn histograms_bar_indexes(&self) -> Option<(usize, usize)> {
        let histograms = self.histograms();
        Some((
            histograms.first()?.first_bar_index(),
            histograms.last()?.last_bar_index(),
        ))
    }

    /// Bars in the underlying cache
    fn bars_count(&self) -> usize {
        self.cache().bars_count()
    }

    /// Provider of per-bar accumulated buckets
    fn aggregated_bars_provider(&self) -> AggregatedHistogramBarsProvider<'_> {
        AggregatedHistogramBarsProvider::new(self.histograms(), self.cache())
    }

    /// True when no histogram holds trades
    ///
    /// # Errors
    /// Histogram cache failures.
    fn all_histograms_empty(&self) -> ClusterResult<bool> {
        for histogram in self.histograms() {
            if !histogram.is_empty()? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Time-frame layout of a [`TradeStatistics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeStatisticsSettings {
    /// Histogram length in `time_frame_unit`
    pub time_frame: u32,
    /// Histogram length unit
    pub time_frame_unit: TimeFrameUnit,
    /// How histograms are anchored
    pub time_frame_kind: TimeFrameKind,
    /// Only bars in the top period holding the last bar are used
    pub top_interval: Interval,
    /// Whether the top period was chosen explicitly
    pub use_top_time_frame: bool,
    /// Bars before this date are ignored
    pub start_time: Option<DateTime<Utc>>,
}

impl TradeStatisticsSettings {
    /// Histogram length
    ///
    /// # Errors
    /// Propagates interval conversion failures.
    pub fn time_frame_duration(&self) -> ClusterResult<Duration> {
        Ok(TimeFrameFactory::get_interval(self.time_frame, self.time_frame_unit).to_duration()?)
    }
}

/// Histograms of one security laid out on a time frame
#[derive(Debug)]
pub struct TradeStatistics {
    id: String,
    state_id: String,
    cache: Arc<TradeHistogramsCache>,
    settings: TradeStatisticsSettings,
    histograms: Vec<Arc<TradeHistogram>>,
}

impl TradeStatistics {
    /// Lay histograms over the cache's current bars
    ///
    /// # Errors
    /// Interval conversion failures for the time frame or top interval.
    pub fn new(
        id: impl Into<String>,
        state_id: impl Into<String>,
        cache: Arc<TradeHistogramsCache>,
        settings: TradeStatisticsSettings,
    ) -> ClusterResult<Self> {
        let bars = cache.bars();
        let time_frame = settings.time_frame_duration()?;
        let top = settings.top_interval.to_duration()?;

        let histograms = match included_from(&bars, top, settings.start_time)? {
            None => Vec::new(),
            Some(start) => match settings.time_frame_kind {
                TimeFrameKind::FromMidnightToNow => midnight_histograms(&cache, &bars, start, time_frame)?,
                TimeFrameKind::FromNowToPast => trailing_histograms(&cache, &bars, start, time_frame),
            },
        };

        let state_id = state_id.into();
        debug!(state_id = %state_id, histograms = histograms.len(), "Trade statistics laid out");
        Ok(Self {
            id: id.into(),
            state_id,
            cache,
            settings,
            histograms,
        })
    }

    /// Layout settings
    #[must_use]
    pub const fn settings(&self) -> &TradeStatisticsSettings {
        &self.settings
    }
}

/// First bar inside the top period of the last bar and not before `start_time`
fn included_from(
    bars: &[Arc<DataBar>],
    top: Duration,
    start_time: Option<DateTime<Utc>>,
) -> ClusterResult<Option<usize>> {
    let Some(last) = bars.last() else {
        return Ok(None);
    };
    let top_bounds = PeriodBounds::containing(top, last.date)?;
    let from = start_time.map_or(top_bounds.first, |start| start.max(top_bounds.first));
    Ok(bars.iter().position(|bar| bar.date >= from))
}

fn midnight_histograms(
    cache: &Arc<TradeHistogramsCache>,
    bars: &[Arc<DataBar>],
    start: usize,
    time_frame: Duration,
) -> ClusterResult<Vec<Arc<TradeHistogram>>> {
    let mut histograms = Vec::new();
    let mut bounds = PeriodBounds::containing(time_frame, bars[start].date)?;
    let mut group_start = start;

    for (index, bar) in bars.iter().enumerate().skip(start + 1) {
        if bounds.contains(bar.date) {
            continue;
        }
        histograms.push(Arc::new(TradeHistogram::new(
            cache.clone(),
            group_start,
            index - 1,
            bounds.first,
            bounds.last,
        )));
        bounds = bounds.advance(time_frame, bar.date)?;
        group_start = index;
    }
    histograms.push(Arc::new(TradeHistogram::new(
        cache.clone(),
        group_start,
        bars.len() - 1,
        bounds.first,
        bounds.last,
    )));
    Ok(histograms)
}

fn trailing_histograms(
    cache: &Arc<TradeHistogramsCache>,
    bars: &[Arc<DataBar>],
    start: usize,
    time_frame: Duration,
) -> Vec<Arc<TradeHistogram>> {
    let mut window_start = start;
    (start..bars.len())
        .map(|index| {
            let low = bars[index].date - time_frame;
            while bars[window_start].date <= low {
                window_start += 1;
            }
            Arc::new(TradeHistogram::spanning(
                cache.clone(),
                window_start,
                index,
                index,
                low,
                bars[index].date,
            ))
        })
        .collect()
}

impl TradeStatisticsSource for TradeStatistics {
    fn id(&self) -> &str {
        &self.id
    }

    fn state_id(&self) -> &str {
        &self.state_id
    }

    fn histograms(&self) -> &[Arc<TradeHistogram>] {
        &self.histograms
    }

    fn has_static_timeline(&self) -> bool {
        !self.settings.use_top_time_frame
    }

    fn cache(&self) -> &Arc<TradeHistogramsCache> {
        &self.cache
    }

    fn time_frame_unit(&self) -> TimeFrameUnit {
        self.settings.time_frame_unit
    }
}

/// A statistic source paired with the bucket field it reports
#[derive(Debug, Clone)]
pub struct TradeStatisticsWithKind {
    statistics: Arc<dyn TradeStatisticsSource>,
    kind: TradeStatisticsKind,
}

impl TradeStatisticsWithKind {
    /// Pair `statistics` with `kind`
    #[must_use]
    pub fn new(statistics: Arc<dyn TradeStatisticsSource>, kind: TradeStatisticsKind) -> Self {
        Self { statistics, kind }
    }

    /// Underlying statistics
    #[must_use]
    pub fn statistics(&self) -> &Arc<dyn TradeStatisticsSource> {
        &self.statistics
    }

    /// Reported field
    #[must_use]
    pub const fn kind(&self) -> TradeStatisticsKind {
        self.kind
    }

    /// Reported value of one bucket
    #[must_use]
    pub fn value(&self, bar: &TradeHistogramBar) -> f64 {
        self.kind.value(bar)
    }

    /// Value of one bucket for an explicit kind
    #[must_use]
    pub fn value_of(&self, bar: &TradeHistogramBar, kind: TradeStatisticsKind) -> f64 {
        kind.value(bar)
    }
}
