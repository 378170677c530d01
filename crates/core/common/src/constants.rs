//! Constants shared across the cluster analysis crates
//!
//! Single source of truth for time conversion factors and numeric defaults.

// Time constants
/// Minutes in one hour
pub const MINS_PER_HOUR: u32 = 60;
/// Days in one week
pub const DAYS_PER_WEEK: i64 = 7;
/// Days in one month, see [`crate::interval`]
pub const DAYS_PER_MONTH: i64 = 30;

// Percentage constants
/// Lower bound of a percentage parameter
pub const PERCENT_MIN: f64 = 0.0;
/// Upper bound of a percentage parameter
pub const PERCENT_MAX: f64 = 100.0;

// Suffixes
/// Appended to data source and provider names of aligned views
pub const ALIGNED_SUFFIX: &str = ".Aligned";
