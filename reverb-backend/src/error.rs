//! Error types for store operations.

use thiserror::Error;

/// Error raised by a cache store.
///
/// The engine treats read errors as cache misses and write errors as
/// non-fatal (the response still resolves), so store implementations should
/// prefer returning errors over panicking.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem or network I/O failure.
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored value could not be encoded or decoded.
    #[error("store serialization error: {0}")]
    Serialization(String),

    /// Any other store-internal failure.
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
}

/// Result of removing a key from a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteStatus {
    /// The given number of entries were removed.
    Deleted(u32),
    /// No entry existed for the key.
    Missing,
}
