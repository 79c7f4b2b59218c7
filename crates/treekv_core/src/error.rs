//! Error types for store operations.

use thiserror::Error;
use treekv_engine::EngineError;

/// Result type for store operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in store operations.
///
/// The first five variants are the normalized vocabulary callers can match
/// on regardless of which engine backs the store; everything the engine
/// reports that has no normalized meaning passes through as
/// [`CoreError::Engine`].
#[derive(Debug, Error)]
pub enum CoreError {
    /// The key or directory does not exist.
    #[error("key not found")]
    KeyNotFound,

    /// An atomic create targeted a key that already exists.
    #[error("key already exists")]
    KeyExists,

    /// An atomic operation lost an optimistic-concurrency race: the key was
    /// modified since the caller last read it.
    #[error("key modified: expected revision {expected}, current {current}")]
    KeyModified {
        /// The revision the caller supplied.
        expected: u64,
        /// The revision the engine holds.
        current: u64,
    },

    /// An atomic delete was called without a previous entry to compare
    /// against.
    #[error("previous entry not specified")]
    PreviousNotSpecified,

    /// The requested operation is not offered by this store.
    #[error("call not supported")]
    CallNotSupported,

    /// The store has been closed.
    #[error("store is closed")]
    StoreClosed,

    /// Passthrough for any other engine failure.
    #[error(transparent)]
    Engine(EngineError),
}

/// The single engine-to-store error translation.
///
/// Normalizes the engine's structured failure signals into the store
/// vocabulary; anything else passes through untouched. Engines that change
/// their error surface break here, at the trait boundary, not in scattered
/// call sites.
impl From<EngineError> for CoreError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::KeyNotFound => CoreError::KeyNotFound,
            EngineError::KeyExists => CoreError::KeyExists,
            EngineError::RevisionMismatch { expected, current } => {
                CoreError::KeyModified { expected, current }
            }
            other => CoreError::Engine(other),
        }
    }
}
