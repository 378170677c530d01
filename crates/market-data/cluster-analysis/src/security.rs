//! Security abstraction consumed by the engine
//!
//! The host platform owns market data. The engine only sees it through the
//! [`Security`] and [`DataSourceSecurity`] traits. [`VecSecurity`] is an
//! in-memory implementation used by host adapters and tests.

use crate::error::{ClusterError, ClusterResult};
use chrono::{DateTime, Utc};
use common::{DataBar, Interval, QueueData, Trade};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Shared, immutable snapshot of a bar series
pub type BarSeries = Arc<[Arc<DataBar>]>;

/// Shared, immutable list of trades belonging to one bar
pub type TradeList = Arc<[Trade]>;

/// Empty trade list
#[must_use]
pub fn empty_trades() -> TradeList {
    Arc::from(Vec::new())
}

/// True when both handles point at the same security object.
///
/// Compares data addresses only; vtable pointers of one object may differ
/// between codegen units.
#[must_use]
pub fn same_security(a: &Arc<dyn Security>, b: &Arc<dyn Security>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Instrument description as published by a data source
pub trait DataSourceSecurity: fmt::Debug + fmt::Display + Send + Sync {
    /// Instrument id
    fn id(&self) -> &str;
    /// Short name
    fn name(&self) -> &str;
    /// Full name
    fn full_name(&self) -> &str;
    /// Quote currency
    fn currency(&self) -> &str;
    /// Data source name
    fn ds_name(&self) -> String;
    /// Data provider name
    fn provider_name(&self) -> String;
    /// Lot size
    fn lot_size(&self) -> f64;
    /// Lot step
    fn lot_tick(&self) -> f64;
    /// Margin requirement
    fn margin(&self) -> f64;
    /// Price decimals
    fn decimals(&self) -> u32;
    /// Minimal price step
    fn tick(&self) -> f64;

    /// Price step at a given price
    ///
    /// # Errors
    /// Views that do not carry a tick table return [`ClusterError::NotSupported`].
    fn get_tick(&self, price: f64) -> ClusterResult<f64>;

    /// Whether the instrument has expired
    ///
    /// # Errors
    /// [`ClusterError::NotSupported`] on views.
    fn expired(&self) -> ClusterResult<bool>;

    /// Whether the instrument is a money position
    ///
    /// # Errors
    /// [`ClusterError::NotSupported`] on views.
    fn is_money(&self) -> ClusterResult<bool>;

    /// Whether the instrument is an option
    ///
    /// # Errors
    /// [`ClusterError::NotSupported`] on views.
    fn is_option(&self) -> ClusterResult<bool>;

    /// Option strike
    ///
    /// # Errors
    /// [`ClusterError::NotSupported`] on views and on non-options.
    fn strike(&self) -> ClusterResult<f64>;

    /// Expiration date, if any
    ///
    /// # Errors
    /// [`ClusterError::NotSupported`] on views.
    fn expiration_date(&self) -> ClusterResult<Option<DateTime<Utc>>>;

    /// Underlying security id
    ///
    /// # Errors
    /// [`ClusterError::NotSupported`] on views.
    fn base_security(&self) -> ClusterResult<Option<String>>;
}

/// Plain instrument description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentDescription {
    /// Instrument id
    pub id: String,
    /// Short name
    pub name: String,
    /// Full name
    pub full_name: String,
    /// Quote currency
    pub currency: String,
    /// Data source name
    pub ds_name: String,
    /// Provider name
    pub provider_name: String,
    /// Lot size
    pub lot_size: f64,
    /// Lot step
    pub lot_tick: f64,
    /// Margin requirement
    pub margin: f64,
    /// Price decimals
    pub decimals: u32,
    /// Minimal price step
    pub tick: f64,
    /// Expiration date for derivatives
    pub expiration: Option<DateTime<Utc>>,
    /// Strike for options
    pub strike: Option<f64>,
    /// Underlying id for derivatives
    pub base_security: Option<String>,
}

impl InstrumentDescription {
    /// Description for a plain instrument with unit lot and the given tick
    pub fn new(id: impl Into<String>, ds_name: impl Into<String>, tick: f64) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            full_name: id.clone(),
            id,
            currency: "USD".to_string(),
            ds_name: ds_name.into(),
            provider_name: "host".to_string(),
            lot_size: 1.0,
            lot_tick: 1.0,
            margin: 0.0,
            decimals: 2,
            tick,
            expiration: None,
            strike: None,
            base_security: None,
        }
    }
}

impl fmt::Display for InstrumentDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl DataSourceSecurity for InstrumentDescription {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn full_name(&self) -> &str {
        &self.full_name
    }

    fn currency(&self) -> &str {
        &self.currency
    }

    fn ds_name(&self) -> String {
        self.ds_name.clone()
    }

    fn provider_name(&self) -> String {
        self.provider_name.clone()
    }

    fn lot_size(&self) -> f64 {
        self.lot_size
    }

    fn lot_tick(&self) -> f64 {
        self.lot_tick
    }

    fn margin(&self) -> f64 {
        self.margin
    }

    fn decimals(&self) -> u32 {
        self.decimals
    }

    fn tick(&self) -> f64 {
        self.tick
    }

    fn get_tick(&self, _price: f64) -> ClusterResult<f64> {
        Ok(self.tick)
    }

    fn expired(&self) -> ClusterResult<bool> {
        Ok(self.expiration.is_some_and(|date| date <= Utc::now()))
    }

    fn is_money(&self) -> ClusterResult<bool> {
        Ok(false)
    }

    fn is_option(&self) -> ClusterResult<bool> {
        Ok(self.strike.is_some())
    }

    fn strike(&self) -> ClusterResult<f64> {
        self.strike.ok_or(ClusterError::not_supported("strike"))
    }

    fn expiration_date(&self) -> ClusterResult<Option<DateTime<Utc>>> {
        Ok(self.expiration)
    }

    fn base_security(&self) -> ClusterResult<Option<String>> {
        Ok(self.base_security.clone())
    }
}

/// Bar and trade provider
///
/// Range queries take inclusive `[first, last]` bar indexes; an inverted
/// range is empty.
pub trait Security: fmt::Debug + Send + Sync {
    /// Trading symbol
    fn symbol(&self) -> &str;

    /// Instrument description
    fn description(&self) -> Arc<dyn DataSourceSecurity>;

    /// Bar interval
    fn interval(&self) -> Interval;

    /// Lot size
    fn lot_size(&self) -> f64;

    /// Minimal price step
    fn tick(&self) -> f64;

    /// Key under which derived data for this security is cached
    fn cache_name(&self) -> String;

    /// True for gap-filled views
    fn is_aligned(&self) -> bool {
        false
    }

    /// Current bar series snapshot
    ///
    /// # Errors
    /// Implementations that derive their bars may fail on inconsistent input.
    fn bars(&self) -> ClusterResult<BarSeries>;

    /// Trades of one bar
    ///
    /// # Errors
    /// [`ClusterError::BarIndexOutOfRange`] for an unknown bar.
    fn trades(&self, bar_index: usize) -> ClusterResult<TradeList>;

    /// All trades of the bars in `[first, last]`
    ///
    /// # Errors
    /// Same as [`Security::trades`].
    fn trades_range(&self, first: usize, last: usize) -> ClusterResult<Vec<Trade>> {
        let mut trades = Vec::new();
        if first > last {
            return Ok(trades);
        }
        for index in first..=last {
            trades.extend_from_slice(&self.trades(index)?);
        }
        Ok(trades)
    }

    /// Number of trades of the bars in `[first, last]`
    ///
    /// # Errors
    /// Same as [`Security::trades`].
    fn trades_count(&self, first: usize, last: usize) -> ClusterResult<usize> {
        if first > last {
            return Ok(0);
        }
        (first..=last).try_fold(0, |acc, index| Ok(acc + self.trades(index)?.len()))
    }

    /// Trades of each bar in `[first, last]`
    ///
    /// # Errors
    /// Same as [`Security::trades`].
    fn trades_per_bar(&self, first: usize, last: usize) -> ClusterResult<Vec<TradeList>> {
        if first > last {
            return Ok(Vec::new());
        }
        (first..=last).map(|index| self.trades(index)).collect()
    }

    /// Bid queue snapshot for one bar
    ///
    /// # Errors
    /// [`ClusterError::NotSupported`] on views without order book data.
    fn buy_queue(&self, bar_index: usize) -> ClusterResult<Vec<QueueData>>;

    /// Ask queue snapshot for one bar
    ///
    /// # Errors
    /// [`ClusterError::NotSupported`] on views without order book data.
    fn sell_queue(&self, bar_index: usize) -> ClusterResult<Vec<QueueData>>;

    /// Open prices
    ///
    /// # Errors
    /// [`ClusterError::NotSupported`] on views.
    fn open_prices(&self) -> ClusterResult<Vec<f64>> {
        Ok(self.bars()?.iter().map(|bar| bar.open).collect())
    }

    /// High prices
    ///
    /// # Errors
    /// [`ClusterError::NotSupported`] on views.
    fn high_prices(&self) -> ClusterResult<Vec<f64>> {
        Ok(self.bars()?.iter().map(|bar| bar.high).collect())
    }

    /// Low prices
    ///
    /// # Errors
    /// [`ClusterError::NotSupported`] on views.
    fn low_prices(&self) -> ClusterResult<Vec<f64>> {
        Ok(self.bars()?.iter().map(|bar| bar.low).collect())
    }

    /// Close prices
    ///
    /// # Errors
    /// [`ClusterError::NotSupported`] on views.
    fn close_prices(&self) -> ClusterResult<Vec<f64>> {
        Ok(self.bars()?.iter().map(|bar| bar.close).collect())
    }

    /// Volumes
    ///
    /// # Errors
    /// [`ClusterError::NotSupported`] on views.
    fn volumes(&self) -> ClusterResult<Vec<f64>> {
        Ok(self.bars()?.iter().map(|bar| bar.volume).collect())
    }
}

#[derive(Debug)]
struct SeriesState {
    bars: BarSeries,
    trades: Vec<TradeList>,
}

/// In-memory security
///
/// Bars can be appended or the last bar replaced between recalculation
/// passes, mirroring how the host grows a live series.
#[derive(Debug)]
pub struct VecSecurity {
    symbol: String,
    description: Arc<InstrumentDescription>,
    interval: Interval,
    state: RwLock<SeriesState>,
}

impl VecSecurity {
    /// Create an empty security
    pub fn new(symbol: impl Into<String>, interval: Interval) -> Self {
        let symbol = symbol.into();
        Self {
            description: Arc::new(InstrumentDescription::new(symbol.clone(), "memory", 1.0)),
            symbol,
            interval,
            state: RwLock::new(SeriesState {
                bars: Arc::from(Vec::new()),
                trades: Vec::new(),
            }),
        }
    }

    /// Replace the instrument description
    #[must_use]
    pub fn with_description(mut self, description: InstrumentDescription) -> Self {
        self.description = Arc::new(description);
        self
    }

    /// Create a security from bar handles and their trades.
    ///
    /// Missing trade lists are treated as empty.
    pub fn from_parts(
        symbol: impl Into<String>,
        interval: Interval,
        bars: Vec<Arc<DataBar>>,
        mut trades: Vec<Vec<Trade>>,
    ) -> Self {
        trades.resize_with(bars.len(), Vec::new);
        let security = Self::new(symbol, interval);
        {
            let mut state = security.state.write();
            state.bars = Arc::from(bars);
            state.trades = trades.into_iter().map(Arc::from).collect();
        }
        security
    }

    /// Append a bar with its trades
    pub fn push_bar(&self, bar: DataBar, trades: Vec<Trade>) {
        let mut state = self.state.write();
        let mut bars = state.bars.to_vec();
        bars.push(Arc::new(bar));
        state.bars = Arc::from(bars);
        state.trades.push(Arc::from(trades));
    }

    /// Replace the last bar, e.g. while it is still forming
    pub fn replace_last_bar(&self, bar: DataBar, trades: Vec<Trade>) {
        let mut state = self.state.write();
        let mut bars = state.bars.to_vec();
        match bars.last_mut() {
            Some(last) => *last = Arc::new(bar),
            None => bars.push(Arc::new(bar)),
        }
        state.bars = Arc::from(bars);
        match state.trades.last_mut() {
            Some(last) => *last = Arc::from(trades),
            None => state.trades.push(Arc::from(trades)),
        }
    }

    /// Number of bars
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().bars.len()
    }

    /// True when the security has no bars
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Security for VecSecurity {
    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn description(&self) -> Arc<dyn DataSourceSecurity> {
        self.description.clone()
    }

    fn interval(&self) -> Interval {
        self.interval
    }

    fn lot_size(&self) -> f64 {
        self.description.lot_size
    }

    fn tick(&self) -> f64 {
        self.description.tick
    }

    fn cache_name(&self) -> String {
        self.symbol.clone()
    }

    fn bars(&self) -> ClusterResult<BarSeries> {
        Ok(self.state.read().bars.clone())
    }

    fn trades(&self, bar_index: usize) -> ClusterResult<TradeList> {
        let state = self.state.read();
        state
            .trades
            .get(bar_index)
            .cloned()
            .ok_or(ClusterError::BarIndexOutOfRange {
                index: bar_index,
                len: state.trades.len(),
            })
    }

    fn buy_queue(&self, _bar_index: usize) -> ClusterResult<Vec<QueueData>> {
        Ok(Vec::new())
    }

    fn sell_queue(&self, _bar_index: usize) -> ClusterResult<Vec<QueueData>> {
        Ok(Vec::new())
    }
}
