//! Tracing subscriber setup for hosts embedding the engine

use crate::config::LoggingConfig;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install a global fmt subscriber filtered by `RUST_LOG`, falling back to
/// `default_filter`.
///
/// # Errors
/// Fails when a global subscriber is already installed.
pub fn init_logging(default_filter: &str) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
}

/// [`init_logging`] with the configured default filter
///
/// # Errors
/// See [`init_logging`].
pub fn init_from_config(config: &LoggingConfig) -> Result<(), TryInitError> {
    init_logging(&config.default_filter)
}
