//! Test helper functions and utilities

use chrono::{DateTime, Utc};
use cluster_analysis::Security;
use tracing_subscriber::EnvFilter;

/// Initialize test logging with environment-based configuration.
///
/// Safe to call multiple times - subsequent calls are ignored.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Bar dates of a security
///
/// # Errors
/// Bar loading failures.
pub fn bar_dates(security: &dyn Security) -> anyhow::Result<Vec<DateTime<Utc>>> {
    Ok(security.bars()?.iter().map(|bar| bar.date).collect())
}

/// Close prices of a security, read bar by bar
///
/// # Errors
/// Bar loading failures.
pub fn bar_closes(security: &dyn Security) -> anyhow::Result<Vec<f64>> {
    Ok(security.bars()?.iter().map(|bar| bar.close).collect())
}
