//! Error types for ikv
//!
//! Provides a unified error type for building and reading index files.

use thiserror::Error;

/// Result type alias using IkvError
pub type Result<T> = std::result::Result<T, IkvError>;

/// Unified error type for ikv operations
#[derive(Debug, Error)]
pub enum IkvError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Build Errors
    // -------------------------------------------------------------------------
    #[error("Perfect hash construction failed: {0}")]
    HashConstruction(String),

    #[error("{field} {value} does not fit in 32 bits")]
    Overflow { field: &'static str, value: u64 },

    #[error("Index buffer size mismatch: planned {expected} bytes, wrote {actual}")]
    IndexSizeMismatch { expected: usize, actual: usize },

    // -------------------------------------------------------------------------
    // Read Errors
    // -------------------------------------------------------------------------
    #[error("Corrupted index: {0}")]
    Corrupted(String),

    #[error("Index was written without payload sizes")]
    SizeNotStored,

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
