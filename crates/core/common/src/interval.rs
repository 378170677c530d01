//! Interval and time-frame utilities
//!
//! Conversions here are deliberately approximate: a month is 30 days and a
//! week is 7 days. Cached statistics are keyed on these durations, so the
//! table must not drift towards calendar-exact lengths.

use crate::constants::{DAYS_PER_MONTH, DAYS_PER_WEEK, MINS_PER_HOUR};
use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised by interval conversions
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeFrameError {
    /// The interval base has no fixed duration
    #[error("Interval base {base} has no fixed duration")]
    UnsupportedBase {
        /// Offending base
        base: DataIntervals,
    },

    /// Text did not name a known variant
    #[error("Unknown {kind} value: {value}")]
    UnknownVariant {
        /// Enum being parsed
        kind: &'static str,
        /// Text that failed to parse
        value: String,
    },

    /// Durations must be strictly positive
    #[error("Time frame must be positive, got {value}")]
    NonPositive {
        /// Offending value in milliseconds or units
        value: i64,
    },
}

/// Base unit of a bar interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataIntervals {
    /// Tick bars
    Ticks,
    /// Volume bars
    Volume,
    /// Price-range bars
    PriceRange,
    /// Second bars
    Seconds,
    /// Minute bars
    Minute,
    /// Daily bars
    Days,
    /// Weekly bars
    Weeks,
    /// Monthly bars
    Months,
}

impl DataIntervals {
    const ALL: [Self; 8] = [
        Self::Ticks,
        Self::Volume,
        Self::PriceRange,
        Self::Seconds,
        Self::Minute,
        Self::Days,
        Self::Weeks,
        Self::Months,
    ];

    /// Host name of the base
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ticks => "TICK",
            Self::Volume => "VOLUME",
            Self::PriceRange => "PRICERANGE",
            Self::Seconds => "SECONDS",
            Self::Minute => "MINUTE",
            Self::Days => "DAYS",
            Self::Weeks => "WEEKS",
            Self::Months => "MONTHS",
        }
    }
}

impl fmt::Display for DataIntervals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataIntervals {
    type Err = TimeFrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|base| base.as_str().eq_ignore_ascii_case(s) || format!("{base:?}").eq_ignore_ascii_case(s))
            .ok_or_else(|| TimeFrameError::UnknownVariant {
                kind: "DataIntervals",
                value: s.to_string(),
            })
    }
}

/// Bar interval: `value` units of `base`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    /// Number of base units
    pub value: u32,
    /// Base unit
    pub base: DataIntervals,
}

impl Interval {
    /// Create a new interval
    #[must_use]
    pub const fn new(value: u32, base: DataIntervals) -> Self {
        Self { value, base }
    }

    /// Duration of one interval
    ///
    /// # Errors
    /// Returns [`TimeFrameError::UnsupportedBase`] for ticks, volume and
    /// price-range bases and [`TimeFrameError::NonPositive`] for a zero value.
    pub fn to_duration(&self) -> Result<Duration, TimeFrameError> {
        if self.value == 0 {
            return Err(TimeFrameError::NonPositive { value: 0 });
        }
        let value = i64::from(self.value);
        match self.base {
            DataIntervals::Months => Ok(Duration::days(value * DAYS_PER_MONTH)),
            DataIntervals::Weeks => Ok(Duration::days(value * DAYS_PER_WEEK)),
            DataIntervals::Days => Ok(Duration::days(value)),
            DataIntervals::Minute => Ok(Duration::minutes(value)),
            DataIntervals::Seconds => Ok(Duration::seconds(value)),
            DataIntervals::Ticks | DataIntervals::Volume | DataIntervals::PriceRange => {
                Err(TimeFrameError::UnsupportedBase { base: self.base })
            }
        }
    }

    /// Length of one interval in whole seconds
    ///
    /// # Errors
    /// Same as [`Interval::to_duration`].
    pub fn to_seconds(&self) -> Result<i64, TimeFrameError> {
        Ok(self.to_duration()?.num_seconds())
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.base)
    }
}

/// Unit of a histogram time frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeFrameUnit {
    /// Seconds
    Second,
    /// Minutes
    Minute,
    /// Hours
    Hour,
    /// Days
    Day,
    /// Weeks (7 days)
    Week,
    /// Months (30 days)
    Month,
}

impl TimeFrameUnit {
    const ALL: [Self; 6] = [
        Self::Second,
        Self::Minute,
        Self::Hour,
        Self::Day,
        Self::Week,
        Self::Month,
    ];

    /// Variant name as used in state ids
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Second => "Second",
            Self::Minute => "Minute",
            Self::Hour => "Hour",
            Self::Day => "Day",
            Self::Week => "Week",
            Self::Month => "Month",
        }
    }
}

impl fmt::Display for TimeFrameUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeFrameUnit {
    type Err = TimeFrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|unit| unit.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| TimeFrameError::UnknownVariant {
                kind: "TimeFrameUnit",
                value: s.to_string(),
            })
    }
}

/// How a histogram window is anchored in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeFrameKind {
    /// Fixed buckets that accumulate from the bucket start to the current bar
    FromMidnightToNow,
    /// Trailing window ending at the current bar
    FromNowToPast,
}

impl TimeFrameKind {
    /// Variant name as used in state ids
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FromMidnightToNow => "FromMidnightToNow",
            Self::FromNowToPast => "FromNowToPast",
        }
    }
}

impl fmt::Display for TimeFrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeFrameKind {
    type Err = TimeFrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::FromMidnightToNow, Self::FromNowToPast]
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| TimeFrameError::UnknownVariant {
                kind: "TimeFrameKind",
                value: s.to_string(),
            })
    }
}

/// Maps a `(count, unit)` pair onto a bar interval
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeFrameFactory;

impl TimeFrameFactory {
    /// Interval for `count` units. Hours are expressed in minutes.
    #[must_use]
    pub const fn get_interval(count: u32, unit: TimeFrameUnit) -> Interval {
        match unit {
            TimeFrameUnit::Second => Interval::new(count, DataIntervals::Seconds),
            TimeFrameUnit::Minute => Interval::new(count, DataIntervals::Minute),
            TimeFrameUnit::Hour => {
                Interval::new(count.saturating_mul(MINS_PER_HOUR), DataIntervals::Minute)
            }
            TimeFrameUnit::Day => Interval::new(count, DataIntervals::Days),
            TimeFrameUnit::Week => Interval::new(count, DataIntervals::Weeks),
            TimeFrameUnit::Month => Interval::new(count, DataIntervals::Months),
        }
    }
}

/// Half-open period `[first, last)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeriodBounds {
    /// Inclusive start
    pub first: DateTime<Utc>,
    /// Exclusive end
    pub last: DateTime<Utc>,
}

impl PeriodBounds {
    /// Bounds of the period of length `period` containing `date`.
    ///
    /// Periods shorter than a day are counted from midnight of `date`'s day,
    /// longer ones from the Unix epoch.
    ///
    /// # Errors
    /// Returns [`TimeFrameError::NonPositive`] for a zero or negative period.
    pub fn containing(period: Duration, date: DateTime<Utc>) -> Result<Self, TimeFrameError> {
        let period_ms = period.num_milliseconds();
        if period_ms <= 0 {
            return Err(TimeFrameError::NonPositive { value: period_ms });
        }

        let origin = if period < Duration::days(1) {
            date - Duration::seconds(i64::from(date.num_seconds_from_midnight()))
                - Duration::nanoseconds(i64::from(date.nanosecond()))
        } else {
            DateTime::<Utc>::UNIX_EPOCH
        };

        let offset_ms = (date - origin).num_milliseconds();
        let first = origin + Duration::milliseconds(offset_ms.div_euclid(period_ms) * period_ms);
        Ok(Self {
            first,
            last: first + period,
        })
    }

    /// Bounds of the period containing `date`, never starting before the end
    /// of `self`.
    ///
    /// # Errors
    /// Same as [`PeriodBounds::containing`].
    pub fn advance(self, period: Duration, date: DateTime<Utc>) -> Result<Self, TimeFrameError> {
        if self.contains(date) {
            return Ok(self);
        }
        let next = Self::containing(period, date)?;
        if next.first < self.last && next.last > self.last {
            Ok(Self {
                first: self.last,
                last: next.last,
            })
        } else {
            Ok(next)
        }
    }

    /// True when `date` falls inside the period
    #[must_use]
    pub fn contains(&self, date: DateTime<Utc>) -> bool {
        self.first <= date && date < self.last
    }
}
