//! Error types for the index.

use thiserror::Error;

/// Errors surfaced by index construction.
///
/// Mutating operations on a built graph are total: a missing or
/// tombstoned id is absorbed as a no-op rather than reported, because
/// the enclosing system treats its operation log as authoritative.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndexError {
    /// Invalid construction parameter.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Vector length does not match the configured dimensionality.
    #[error("dimension mismatch: index expects {expected}, vector has {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Result type alias for index operations.
pub type Result<T> = std::result::Result<T, IndexError>;
