//! Gap-filled view over a sparse bar series
//!
//! [`AlignedSecurity`] turns an irregular bar series into a fixed-step one.
//! Missing steps are filled with flat bars at the last known close. Every
//! aligned slot remembers the index of the source bar it wraps, so trade
//! lookups can be routed back to the source security.

use crate::error::{ClusterError, ClusterResult};
use crate::security::{BarSeries, DataSourceSecurity, Security, TradeList, empty_trades};
use chrono::{DateTime, Duration, Utc};
use common::constants::ALIGNED_SUFFIX;
use common::{DataBar, Interval, PeriodBounds, QueueData, Trade};
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::info;

/// One slot of an aligned series
#[derive(Debug, Clone)]
pub struct AlignedBar {
    /// Wrapped bar. Shares the source handle for real slots.
    pub bar: Arc<DataBar>,
    /// Source index, `None` for gap-fill bars
    pub original_index: Option<usize>,
}

impl AlignedBar {
    fn real(bar: Arc<DataBar>, index: usize) -> Self {
        Self {
            bar,
            original_index: Some(index),
        }
    }

    fn synthetic(date: DateTime<Utc>, close: f64) -> Self {
        Self {
            bar: Arc::new(DataBar::flat(date, close)),
            original_index: None,
        }
    }

    /// True for gap-fill bars
    #[must_use]
    pub const fn is_synthetic(&self) -> bool {
        self.original_index.is_none()
    }
}

/// Aligned series built once per [`AlignedSecurity`]
#[derive(Debug)]
pub struct AlignedBars {
    slots: Vec<AlignedBar>,
    series: BarSeries,
}

impl AlignedBars {
    fn new(slots: Vec<AlignedBar>) -> Self {
        let series = slots.iter().map(|slot| slot.bar.clone()).collect();
        Self { slots, series }
    }

    /// Aligned slots
    #[must_use]
    pub fn slots(&self) -> &[AlignedBar] {
        &self.slots
    }

    /// Bar handles of the aligned slots
    #[must_use]
    pub fn series(&self) -> BarSeries {
        self.series.clone()
    }

    /// Number of aligned slots
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when the series is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Source index of slot `index`
    ///
    /// # Errors
    /// [`ClusterError::BarIndexOutOfRange`] for an unknown slot.
    pub fn original_index(&self, index: usize) -> ClusterResult<Option<usize>> {
        self.slots
            .get(index)
            .map(|slot| slot.original_index)
            .ok_or(ClusterError::BarIndexOutOfRange {
                index,
                len: self.slots.len(),
            })
    }

    /// Slots `[first, last]`, empty when inverted
    fn range(&self, first: usize, last: usize) -> ClusterResult<&[AlignedBar]> {
        if first > last {
            return Ok(&[]);
        }
        if last >= self.slots.len() {
            return Err(ClusterError::BarIndexOutOfRange {
                index: last,
                len: self.slots.len(),
            });
        }
        Ok(&self.slots[first..=last])
    }
}

/// First and last source index among real slots
fn real_bounds(slots: &[AlignedBar]) -> Option<(usize, usize)> {
    let first = slots.iter().find_map(|slot| slot.original_index)?;
    let last = slots.iter().rev().find_map(|slot| slot.original_index)?;
    Some((first, last))
}

/// Align `source` to a fixed `interval`, grouping bars into periods of
/// length `period`.
///
/// Each period is padded from its start up to its end. Padding stops after
/// the period holding the last source bar.
///
/// # Errors
/// [`ClusterError::InvariantViolation`] when two adjacent source entries are
/// the same handle and [`ClusterError::InvalidArgument`] for a non-positive
/// interval.
pub fn align_bars(
    source: &[Arc<DataBar>],
    interval: Duration,
    period: Duration,
) -> ClusterResult<Vec<AlignedBar>> {
    match source {
        [] => return Ok(Vec::new()),
        [single] => return Ok(vec![AlignedBar::real(single.clone(), 0)]),
        _ => {}
    }

    if let Some(index) = source.windows(2).position(|pair| Arc::ptr_eq(&pair[0], &pair[1])) {
        return Err(ClusterError::InvariantViolation {
            message: format!("same bar handle at indexes {} and {}", index, index + 1),
        });
    }
    if interval <= Duration::zero() {
        return Err(ClusterError::invalid_argument("interval", interval));
    }

    let mut aligned = Vec::with_capacity(source.len());
    let mut bounds = PeriodBounds::containing(period, source[0].date)?;
    let mut last_close = f64::NAN;
    let mut first_index = 0;

    for i in 0..=source.len() {
        if i < source.len() && source[i].date < bounds.last {
            continue;
        }

        let mut cursor = bounds.first;
        for (offset, bar) in source[first_index..i].iter().enumerate() {
            while cursor < bar.date {
                aligned.push(AlignedBar::synthetic(cursor, last_close));
                cursor += interval;
            }
            aligned.push(AlignedBar::real(bar.clone(), first_index + offset));
            cursor = bar.date + interval;
            last_close = bar.close;
        }
        while cursor < bounds.last {
            aligned.push(AlignedBar::synthetic(cursor, last_close));
            cursor += interval;
        }

        if i == source.len() {
            break;
        }
        bounds = bounds.advance(period, source[i].date)?;
        first_index = i;
    }

    Ok(aligned)
}

/// Gap-filled view over another security
///
/// The view holds a shared handle on its source; the aligned series is
/// built on first access and reused afterwards.
pub struct AlignedSecurity {
    source: Arc<dyn Security>,
    period: Duration,
    description: Arc<AlignedDescription>,
    bars: OnceLock<Arc<AlignedBars>>,
    build_lock: Mutex<()>,
}

impl fmt::Debug for AlignedSecurity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlignedSecurity")
            .field("symbol", &self.source.symbol())
            .field("period", &self.period)
            .field("loaded", &self.is_bars_loaded())
            .finish()
    }
}

impl AlignedSecurity {
    /// Wrap `source`, grouping bars into periods of length `period`
    ///
    /// # Errors
    /// [`ClusterError::InvalidArgument`] for a non-positive period.
    pub fn new(source: Arc<dyn Security>, period: Duration) -> ClusterResult<Self> {
        if period <= Duration::zero() {
            return Err(ClusterError::invalid_argument("period", period));
        }
        Ok(Self {
            description: Arc::new(AlignedDescription::new(source.description())),
            source,
            period,
            bars: OnceLock::new(),
            build_lock: Mutex::new(()),
        })
    }

    /// Wrapped security
    #[must_use]
    pub fn source(&self) -> &Arc<dyn Security> {
        &self.source
    }

    /// Grouping period
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// True once the aligned series has been published
    #[must_use]
    pub fn is_bars_loaded(&self) -> bool {
        self.bars.get().is_some()
    }

    /// Aligned series, built on first call.
    ///
    /// Concurrent first callers serialize on a lock; all of them observe
    /// the same `Arc`. A failed build is not cached.
    ///
    /// # Errors
    /// See [`align_bars`]. Also fails when the source interval has no fixed
    /// duration.
    pub fn aligned_bars(&self) -> ClusterResult<Arc<AlignedBars>> {
        if let Some(bars) = self.bars.get() {
            return Ok(bars.clone());
        }

        let _guard = self.build_lock.lock();
        if let Some(bars) = self.bars.get() {
            return Ok(bars.clone());
        }

        let built = Arc::new(self.build()?);
        info!(
            symbol = self.source.symbol(),
            aligned = built.len(),
            "Aligned bar series built"
        );
        Ok(self.bars.get_or_init(|| built).clone())
    }

    fn build(&self) -> ClusterResult<AlignedBars> {
        let source = self.source.bars()?;
        let slots = if source.len() < 2 {
            align_bars(&source, Duration::zero(), self.period)?
        } else {
            let interval = self.source.interval().to_duration()?;
            align_bars(&source, interval, self.period)?
        };
        Ok(AlignedBars::new(slots))
    }
}

impl Security for AlignedSecurity {
    fn symbol(&self) -> &str {
        self.source.symbol()
    }

    fn description(&self) -> Arc<dyn DataSourceSecurity> {
        self.description.clone()
    }

    fn interval(&self) -> Interval {
        self.source.interval()
    }

    fn lot_size(&self) -> f64 {
        self.source.lot_size()
    }

    fn tick(&self) -> f64 {
        self.source.tick()
    }

    fn cache_name(&self) -> String {
        self.source.cache_name()
    }

    fn is_aligned(&self) -> bool {
        true
    }

    fn bars(&self) -> ClusterResult<BarSeries> {
        Ok(self.aligned_bars()?.series())
    }

    fn trades(&self, bar_index: usize) -> ClusterResult<TradeList> {
        match self.aligned_bars()?.original_index(bar_index)? {
            Some(original) => self.source.trades(original),
            None => Ok(empty_trades()),
        }
    }

    fn trades_range(&self, first: usize, last: usize) -> ClusterResult<Vec<Trade>> {
        let bars = self.aligned_bars()?;
        match real_bounds(bars.range(first, last)?) {
            Some((lo, hi)) => self.source.trades_range(lo, hi),
            None => Ok(Vec::new()),
        }
    }

    fn trades_count(&self, first: usize, last: usize) -> ClusterResult<usize> {
        let bars = self.aligned_bars()?;
        match real_bounds(bars.range(first, last)?) {
            Some((lo, hi)) => self.source.trades_count(lo, hi),
            None => Ok(0),
        }
    }

    fn trades_per_bar(&self, first: usize, last: usize) -> ClusterResult<Vec<TradeList>> {
        let bars = self.aligned_bars()?;
        let slots = bars.range(first, last)?;
        let Some((lo, hi)) = real_bounds(slots) else {
            return Ok(vec![empty_trades(); slots.len()]);
        };

        let source = self.source.trades_per_bar(lo, hi)?;
        if hi - lo + 1 == slots.len() {
            return Ok(source);
        }

        slots
            .iter()
            .map(|slot| match slot.original_index {
                Some(original) => source.get(original - lo).cloned().ok_or(
                    ClusterError::BarIndexOutOfRange {
                        index: original,
                        len: hi + 1,
                    },
                ),
                None => Ok(empty_trades()),
            })
            .collect()
    }

    fn buy_queue(&self, _bar_index: usize) -> ClusterResult<Vec<QueueData>> {
        Err(ClusterError::not_supported("buy_queue"))
    }

    fn sell_queue(&self, _bar_index: usize) -> ClusterResult<Vec<QueueData>> {
        Err(ClusterError::not_supported("sell_queue"))
    }

    fn open_prices(&self) -> ClusterResult<Vec<f64>> {
        Err(ClusterError::not_supported("open_prices"))
    }

    fn high_prices(&self) -> ClusterResult<Vec<f64>> {
        Err(ClusterError::not_supported("high_prices"))
    }

    fn low_prices(&self) -> ClusterResult<Vec<f64>> {
        Err(ClusterError::not_supported("low_prices"))
    }

    fn close_prices(&self) -> ClusterResult<Vec<f64>> {
        Err(ClusterError::not_supported("close_prices"))
    }

    fn volumes(&self) -> ClusterResult<Vec<f64>> {
        Err(ClusterError::not_supported("volumes"))
    }
}

/// Description of an aligned view
///
/// Identity fields pass through; data source names carry the `.Aligned`
/// suffix so aligned and raw series never share a data source key.
#[derive(Debug)]
pub struct AlignedDescription {
    source: Arc<dyn DataSourceSecurity>,
}

impl AlignedDescription {
    /// Wrap a source description
    #[must_use]
    pub fn new(source: Arc<dyn DataSourceSecurity>) -> Self {
        Self { source }
    }
}

impl fmt::Display for AlignedDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.source, ALIGNED_SUFFIX)
    }
}

impl DataSourceSecurity for AlignedDescription {
    fn id(&self) -> &str {
        self.source.id()
    }

    fn name(&self) -> &str {
        self.source.name()
    }

    fn full_name(&self) -> &str {
        self.source.full_name()
    }

    fn currency(&self) -> &str {
        self.source.currency()
    }

    fn ds_name(&self) -> String {
        format!("{}{}", self.source.ds_name(), ALIGNED_SUFFIX)
    }

    fn provider_name(&self) -> String {
        format!("{}{}", self.source.provider_name(), ALIGNED_SUFFIX)
    }

    fn lot_size(&self) -> f64 {
        self.source.lot_size()
    }

    fn lot_tick(&self) -> f64 {
        self.source.lot_tick()
    }

    fn margin(&self) -> f64 {
        self.source.margin()
    }

    fn decimals(&self) -> u32 {
        self.source.decimals()
    }

    fn tick(&self) -> f64 {
        self.source.tick()
    }

    fn get_tick(&self, _price: f64) -> ClusterResult<f64> {
        Err(ClusterError::not_supported("get_tick"))
    }

    fn expired(&self) -> ClusterResult<bool> {
        Err(ClusterError::not_supported("expired"))
    }

    fn is_money(&self) -> ClusterResult<bool> {
        Err(ClusterError::not_supported("is_money"))
    }

    fn is_option(&self) -> ClusterResult<bool> {
        Err(ClusterError::not_supported("is_option"))
    }

    fn strike(&self) -> ClusterResult<f64> {
        Err(ClusterError::not_supported("strike"))
    }

    fn expiration_date(&self) -> ClusterResult<Option<DateTime<Utc>>> {
        Err(ClusterError::not_supported("expiration_date"))
    }

    fn base_security(&self) -> ClusterResult<Option<String>> {
        Err(ClusterError::not_supported("base_security"))
    }
}
