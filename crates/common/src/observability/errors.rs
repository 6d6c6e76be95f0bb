//! Metrics error types

use thiserror::Error;

/// Errors raised while constructing or reading metric primitives
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum MetricsError {
    /// Smoothing factor outside `(0, 1]`
    #[error("Invalid smoothing factor {factor}: must be in (0, 1]")]
    InvalidSmoothingFactor {
        /// Rejected value
        factor: f64,
    },

    /// Empty data set - cannot calculate aggregate metric
    #[error("Empty data: cannot calculate {metric}")]
    EmptyData {
        /// Metric name that failed (e.g., "average")
        metric: &'static str,
    },
}

/// Result alias for metric primitives
pub type MetricsResult<T> = Result<T, MetricsError>;
