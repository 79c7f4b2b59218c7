//! Engine contract traits.

use std::sync::mpsc::Receiver;
use std::sync::Arc;

use crate::error::EngineResult;
use crate::event::EngineEntry;

/// A connected handle to a flat key-value engine.
///
/// How the connection is established (endpoint addresses, authentication,
/// transport) is the concern of the concrete engine crate; consumers receive
/// an already-connected handle and open named buckets from it.
pub trait Connection: Send + Sync {
    /// Opens the named bucket, creating it if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EngineError::ConnectionClosed`] if the connection has
    /// been closed, or any engine failure encountered while provisioning the
    /// bucket.
    fn open_bucket(&self, name: &str) -> EngineResult<Arc<dyn KvBucket>>;

    /// Closes the connection.
    ///
    /// Idempotent. Watch subscriptions on buckets obtained from this
    /// connection stop delivering updates; subsequent `open_bucket` calls
    /// fail.
    fn close(&self);

    /// Reports whether the connection is still usable.
    fn is_connected(&self) -> bool;
}

/// A flat, revision-versioned key collection.
///
/// Keys are opaque dot-delimited subjects. The engine assigns a revision to
/// every successful write; revisions for a given key are strictly increasing
/// across successive writes to that key.
///
/// # Invariants
///
/// - `create` fails if the key exists; `update` fails unless the current
///   revision equals the expected one - both with structured errors
/// - `keys` enumerates only live keys (deleted keys are absent)
/// - `watch` first replays the current value of every key matching the
///   subject, then delivers live updates in commit order
pub trait KvBucket: Send + Sync {
    /// Returns the current entry for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EngineError::KeyNotFound`] if the key is absent.
    fn get(&self, key: &str) -> EngineResult<EngineEntry>;

    /// Writes `value` under `key` unconditionally.
    ///
    /// Returns the newly assigned revision.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the write.
    fn put(&self, key: &str, value: &[u8]) -> EngineResult<u64>;

    /// Creates `key` with `value`.
    ///
    /// Returns the newly assigned revision.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EngineError::KeyExists`] if the key already exists.
    fn create(&self, key: &str, value: &[u8]) -> EngineResult<u64>;

    /// Replaces the value of `key` only if its current revision equals
    /// `expected`.
    ///
    /// Returns the newly assigned revision.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EngineError::RevisionMismatch`] if the current
    /// revision differs from `expected`, or
    /// [`crate::EngineError::KeyNotFound`] if the key is absent.
    fn update(&self, key: &str, value: &[u8], expected: u64) -> EngineResult<u64>;

    /// Removes `key`.
    ///
    /// With `Some(expected)`, the delete only succeeds if the current
    /// revision equals `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EngineError::KeyNotFound`] if the key is absent, or
    /// [`crate::EngineError::RevisionMismatch`] on a conditional delete
    /// whose expectation is stale.
    fn delete(&self, key: &str, expected: Option<u64>) -> EngineResult<()>;

    /// Lists every key currently present in the bucket.
    ///
    /// # Errors
    ///
    /// Returns an error if the enumeration fails.
    fn keys(&self) -> EngineResult<Vec<String>>;

    /// Subscribes to updates for `subject`.
    ///
    /// A subject is an encoded key, optionally ending in a `*` token which
    /// matches exactly one segment (one-level wildcard). The returned
    /// receiver first carries a replay of the current value of every
    /// matching key, then live updates. Dropping the receiver releases the
    /// subscription; the engine prunes it on the next delivery attempt.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription cannot be established.
    fn watch(&self, subject: &str) -> EngineResult<Receiver<EngineEntry>>;
}
