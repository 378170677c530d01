//! Factory patterns for generating test data

use chrono::{DateTime, Duration, TimeZone, Utc};
use cluster_analysis::{InstrumentDescription, Security, VecSecurity};
use common::{DataBar, DataIntervals, Interval, Trade, TradeDirection};
use fake::Fake;
use std::sync::Arc;

/// Trade spec: price, quantity, direction
pub type TradeSpec = (f64, f64, TradeDirection);

/// Factory for in-memory securities with customization
#[derive(Debug, Clone)]
pub struct SecurityFactory {
    symbol: String,
    interval: Interval,
    start: DateTime<Utc>,
    tick: f64,
    lot_size: f64,
}

impl Default for SecurityFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl SecurityFactory {
    pub fn new() -> Self {
        Self {
            symbol: "TEST".to_string(),
            interval: Interval::new(1, DataIntervals::Minute),
            start: session_start(),
            tick: 1.0,
            lot_size: 1.0,
        }
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = symbol.into();
        self
    }

    pub fn with_interval(mut self, interval: Interval) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_start(mut self, start: DateTime<Utc>) -> Self {
        self.start = start;
        self
    }

    pub fn with_tick(mut self, tick: f64) -> Self {
        self.tick = tick;
        self
    }

    pub fn with_lot_size(mut self, lot_size: f64) -> Self {
        self.lot_size = lot_size;
        self
    }

    /// Bar spacing of the configured interval
    pub fn step(&self) -> Duration {
        self.interval.to_duration().unwrap_or_else(|_| Duration::minutes(1))
    }

    /// Date of the bar `offset` steps after the start
    pub fn date_at(&self, offset: i64) -> DateTime<Utc> {
        self.start + self.step() * i32::try_from(offset).unwrap_or(i32::MAX)
    }

    pub fn build_empty(&self) -> VecSecurity {
        let mut description = InstrumentDescription::new(self.symbol.clone(), "memory", self.tick);
        description.lot_size = self.lot_size;
        VecSecurity::new(self.symbol.clone(), self.interval).with_description(description)
    }

    /// `count` contiguous flat bars without trades
    pub fn build_flat(&self, count: usize, price: f64) -> VecSecurity {
        let offsets: Vec<i64> = (0..count as i64).collect();
        self.build_at(&offsets, price)
    }

    /// Flat bars at the given step offsets, leaving gaps between them
    pub fn build_at(&self, offsets: &[i64], price: f64) -> VecSecurity {
        let security = self.build_empty();
        for offset in offsets {
            security.push_bar(DataBar::flat(self.date_at(*offset), price), Vec::new());
        }
        security
    }

    /// Contiguous bars with the given trades, closing at each bar's last
    /// trade price
    pub fn build_with_trades(&self, trades: Vec<Vec<TradeSpec>>) -> VecSecurity {
        let security = self.build_empty();
        let mut close = 100.0;
        for (offset, specs) in trades.into_iter().enumerate() {
            let date = self.date_at(offset as i64);
            if let Some((price, _, _)) = specs.last() {
                close = *price;
            }
            let bar_trades = specs
                .into_iter()
                .map(|(price, quantity, direction)| Trade::new(date, price, quantity, direction))
                .collect();
            security.push_bar(DataBar::flat(date, close), bar_trades);
        }
        security
    }

    /// Contiguous bars with random trades on whole-tick prices around `base`
    pub fn build_random(&self, count: usize, trades_per_bar: usize, base: f64) -> VecSecurity {
        let trades = (0..count)
            .map(|_| (0..trades_per_bar).map(|_| random_trade(base, self.tick)).collect())
            .collect();
        self.build_with_trades(trades)
    }

    /// Type-erased handle as the engine consumes it
    pub fn shared(security: VecSecurity) -> Arc<dyn Security> {
        Arc::new(security)
    }
}

/// 2024-01-02 10:00 UTC
pub fn session_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// Trade at `base + k * tick` for a random `k` in `-10..10`
pub fn random_trade(base: f64, tick: f64) -> TradeSpec {
    let offset: i32 = (-10..10).fake();
    let quantity: u32 = (1..50).fake();
    let direction = match (0..3).fake::<u8>() {
        0 => TradeDirection::Buy,
        1 => TradeDirection::Sell,
        _ => TradeDirection::Unknown,
    };
    (base + f64::from(offset) * tick, f64::from(quantity), direction)
}

/// Buy trade shorthand
pub fn buy(price: f64, quantity: f64) -> TradeSpec {
    (price, quantity, TradeDirection::Buy)
}

/// Sell trade shorthand
pub fn sell(price: f64, quantity: f64) -> TradeSpec {
    (price, quantity, TradeDirection::Sell)
}
