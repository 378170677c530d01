//! Test utilities and fixtures for the cluster analysis crates
//!
//! - Security and trade factories
//! - rstest fixtures for contexts and securities
//! - Assertions for `f64` series with NaN gaps
//! - Logging setup for tests

pub mod factories;
pub mod helpers;

pub use assertions::*;
pub use factories::*;
pub use fixtures::*;
pub use helpers::*;
