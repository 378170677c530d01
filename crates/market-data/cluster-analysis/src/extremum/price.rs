//! Extremum search over a bucket list

use crate::error::ClusterError;
use crate::histogram::TradeHistogramBar;
use crate::statistics::TradeStatisticsKind;
use common::constants::{PERCENT_MAX, PERCENT_MIN};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Search direction of the extremum scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ExtremumPriceMode {
    /// Scan from the lowest price upwards
    #[default]
    Minimum,
    /// Scan from the highest price downwards
    Maximum,
}

impl ExtremumPriceMode {
    /// Variant name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Minimum => "Minimum",
            Self::Maximum => "Maximum",
        }
    }
}

impl fmt::Display for ExtremumPriceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExtremumPriceMode {
    type Err = ClusterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::Minimum, Self::Maximum]
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ClusterError::invalid_argument("ExtremumPriceMode", s))
    }
}

/// Comparison applied by a trim filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ComparisonMode {
    /// `value > threshold`
    #[default]
    Greater,
    /// `value >= threshold`
    GreaterOrEqual,
    /// `value < threshold`
    Less,
    /// `value <= threshold`
    LessOrEqual,
    /// `value == threshold`
    AreEqual,
    /// `value != threshold`
    AreNotEqual,
}

impl ComparisonMode {
    const ALL: [Self; 6] = [
        Self::Greater,
        Self::GreaterOrEqual,
        Self::Less,
        Self::LessOrEqual,
        Self::AreEqual,
        Self::AreNotEqual,
    ];

    /// Apply the comparison
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn compare(self, value: f64, threshold: f64) -> bool {
        match self {
            Self::Greater => value > threshold,
            Self::GreaterOrEqual => value >= threshold,
            Self::Less => value < threshold,
            Self::LessOrEqual => value <= threshold,
            Self::AreEqual => value == threshold,
            Self::AreNotEqual => value != threshold,
        }
    }

    /// Variant name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Greater => "Greater",
            Self::GreaterOrEqual => "GreaterOrEqual",
            Self::Less => "Less",
            Self::LessOrEqual => "LessOrEqual",
            Self::AreEqual => "AreEqual",
            Self::AreNotEqual => "AreNotEqual",
        }
    }
}

impl fmt::Display for ComparisonMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComparisonMode {
    type Err = ClusterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ClusterError::invalid_argument("ComparisonMode", s))
    }
}

/// Direction and positional window of an extremum search
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtremumParams {
    /// Search direction
    pub price_mode: ExtremumPriceMode,
    /// Buckets below this share of the list are skipped
    pub min_bar_pct: f64,
    /// Buckets at or above this share of the list are skipped
    pub max_bar_pct: f64,
}

impl Default for ExtremumParams {
    fn default() -> Self {
        Self {
            price_mode: ExtremumPriceMode::Minimum,
            min_bar_pct: PERCENT_MIN,
            max_bar_pct: PERCENT_MAX,
        }
    }
}

impl ExtremumParams {
    /// Search parameters
    #[must_use]
    pub const fn new(price_mode: ExtremumPriceMode, min_bar_pct: f64, max_bar_pct: f64) -> Self {
        Self {
            price_mode,
            min_bar_pct,
            max_bar_pct,
        }
    }

    /// `{price_mode}.{min_bar_pct}.{max_bar_pct}`
    #[must_use]
    pub fn state_id(&self) -> String {
        format!("{}.{}.{}", self.price_mode, self.min_bar_pct, self.max_bar_pct)
    }
}

/// Positional window `[min, max)` of a list of `len` buckets
#[must_use]
pub fn bucket_window(len: usize, min_bar_pct: f64, max_bar_pct: f64) -> (usize, usize) {
    let bound = |pct: f64| ((len as f64 * pct / 100.0).trunc().max(0.0) as usize).min(len);
    (bound(min_bar_pct), bound(max_bar_pct))
}

/// Bucket selected by an extremum search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extremum {
    /// Selected bucket
    pub bar: TradeHistogramBar,
    /// Absolute statistic value of the bucket
    pub value: f64,
    /// Average price of the bucket
    pub price: f64,
}

/// Search `bars` for the bucket with the largest absolute `kind` value.
///
/// Returns the extremum, if any, and the running last price: the selected
/// bucket's average price, or `last_price` unchanged when the window is
/// empty. A lone bucket is selected whatever the window. Equal values keep
/// the bucket met first in scan order.
#[must_use]
pub fn find_extremum(
    bars: &[TradeHistogramBar],
    kind: TradeStatisticsKind,
    params: &ExtremumParams,
    last_price: f64,
) -> (Option<Extremum>, f64) {
    if let [only] = bars {
        let price = only.average_price();
        let extremum = Extremum {
            bar: *only,
            value: kind.value(only).abs(),
            price,
        };
        return (Some(extremum), price);
    }

    let (min, max) = bucket_window(bars.len(), params.min_bar_pct, params.max_bar_pct);
    if max <= min {
        return (None, last_price);
    }

    let mut window: Box<dyn Iterator<Item = &TradeHistogramBar>> = match params.price_mode {
        ExtremumPriceMode::Minimum => Box::new(bars[min..max].iter()),
        ExtremumPriceMode::Maximum => Box::new(bars[bars.len() - max..bars.len() - min].iter().rev()),
    };

    let Some(first) = window.next() else {
        return (None, last_price);
    };
    let mut best = *first;
    let mut best_value = kind.value(first).abs();
    for bar in window {
        let value = kind.value(bar).abs();
        if value > best_value {
            best = *bar;
            best_value = value;
        }
    }

    let price = best.average_price();
    (
        Some(Extremum {
            bar: best,
            value: best_value,
            price,
        }),
        price,
    )
}
