//! Trade statistics: histograms laid out on a time frame and the handlers
//! that build them

pub mod combine;
pub mod handler;
pub mod histogram;
pub mod kind;
pub mod provider;
pub mod trade_statistics;

pub use combine::{TradeStatisticsCombine, TradeStatisticsCombineHandler};
pub use handler::TradeStatisticsHandler;
pub use histogram::TradeHistogram;
pub use kind::TradeStatisticsKind;
pub use provider::AggregatedHistogramBarsProvider;
pub use trade_statistics::{
    TradeStatistics, TradeStatisticsSettings, TradeStatisticsSource, TradeStatisticsWithKind,
};
