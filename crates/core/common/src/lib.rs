//! Common types for the cluster analysis engine
//!
//! - Bars, trades and queue levels shared by every consumer
//! - Interval and time-frame conversions
//! - Constants

pub mod constants;
pub mod interval;
pub mod types;

pub use interval::{
    DataIntervals, Interval, PeriodBounds, TimeFrameError, TimeFrameFactory, TimeFrameKind,
    TimeFrameUnit,
};
pub use types::{DataBar, QueueData, Trade, TradeDirection};
