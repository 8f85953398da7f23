//! Error types for the cache
//!
//! Unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Errors surfaced by cache mutations.
///
/// Read-side problems never appear here: a failing or corrupt read degrades
/// to a cache miss, and fire-and-forget bookkeeping failures are logged
/// rather than returned.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The key-value store rejected an operation the caller was waiting on
    #[error("store operation failed")]
    Store(#[source] anyhow::Error),

    /// A value could not be encoded into its storage envelope
    #[error("failed to encode cache envelope")]
    Encode(#[from] serde_json::Error),
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
