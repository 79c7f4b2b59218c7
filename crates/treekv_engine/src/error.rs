//! Error types for engine operations.

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors reported by a flat key-value engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The key does not exist in the bucket.
    #[error("key not found")]
    KeyNotFound,

    /// A create targeted a key that already exists.
    #[error("key already exists")]
    KeyExists,

    /// A conditional write or delete observed a revision other than the
    /// one the caller supplied.
    #[error("revision mismatch: expected {expected}, current {current}")]
    RevisionMismatch {
        /// The revision the caller believed to be current.
        expected: u64,
        /// The revision the engine actually holds.
        current: u64,
    },

    /// The connection to the engine has been closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// Any other engine or transport failure.
    #[error("engine error: {0}")]
    Other(String),
}
