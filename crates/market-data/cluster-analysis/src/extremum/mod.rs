//! Extremum handlers over trade statistics

pub mod handlers;
pub mod price;
pub mod trim;
pub mod value;

pub use handlers::{TradeStatisticsExtendedExtremumPriceHandler, TradeStatisticsExtremumPriceHandler};
pub use price::{ComparisonMode, Extremum, ExtremumParams, ExtremumPriceMode, bucket_window, find_extremum};
pub use trim::{ExtremumTrims, TrimContext};
pub use value::{TradeStatisticsExtremumValueHandler, extremum_value};
