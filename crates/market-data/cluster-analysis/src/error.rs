//! Error types for the cluster analysis engine

use common::TimeFrameError;
use thiserror::Error;

/// Cluster analysis error types
#[derive(Debug, Error)]
pub enum ClusterError {
    /// Upstream data broke an invariant the engine relies on
    #[error("Invariant violation: {message}")]
    InvariantViolation {
        /// What was violated and where
        message: String,
    },

    /// A parameter value is not recognized or out of its domain
    #[error("Invalid argument {name}: {value}")]
    InvalidArgument {
        /// Parameter name
        name: &'static str,
        /// Rejected value
        value: String,
    },

    /// Facet intentionally not implemented by an aligned view
    #[error("Operation not supported: {operation}")]
    NotSupported {
        /// Name of the unsupported operation
        operation: &'static str,
    },

    /// Bar index outside the series
    #[error("Bar index {index} out of range for {len} bars")]
    BarIndexOutOfRange {
        /// Requested index
        index: usize,
        /// Series length
        len: usize,
    },

    /// Time frame combination rejected
    #[error("Invalid time frame: {message}")]
    InvalidTimeFrame {
        /// Details of the rejected combination
        message: String,
    },

    /// Interval conversion failed
    #[error(transparent)]
    TimeFrame(#[from] TimeFrameError),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl ClusterError {
    /// Shorthand for [`ClusterError::NotSupported`]
    #[must_use]
    pub const fn not_supported(operation: &'static str) -> Self {
        Self::NotSupported { operation }
    }

    /// Shorthand for [`ClusterError::InvalidArgument`]
    pub fn invalid_argument(name: &'static str, value: impl ToString) -> Self {
        Self::InvalidArgument {
            name,
            value: value.to_string(),
        }
    }
}

/// Type alias for cluster analysis results
pub type ClusterResult<T> = Result<T, ClusterError>;
