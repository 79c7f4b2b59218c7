//! In-memory engine for testing and ephemeral storage.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::bucket::{Connection, KvBucket};
use crate::error::{EngineError, EngineResult};
use crate::event::{EngineEntry, Operation};

/// An in-memory engine connection.
///
/// Buckets live for the lifetime of the connection. Opening the same bucket
/// name twice returns the same underlying bucket, so multiple stores sharing
/// a connection observe each other's writes.
///
/// # Example
///
/// ```rust
/// use treekv_engine::{Connection, MemoryConnection};
///
/// let conn = MemoryConnection::new();
/// let bucket = conn.open_bucket("kvstore").unwrap();
/// bucket.put("app.web", b"v1").unwrap();
/// ```
#[derive(Default)]
pub struct MemoryConnection {
    buckets: Mutex<HashMap<String, Arc<MemoryBucket>>>,
    closed: AtomicBool,
}

impl MemoryConnection {
    /// Creates a new open connection with no buckets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the bucket with the given name, if it has been opened.
    ///
    /// Useful for tests that need the concrete bucket type.
    #[must_use]
    pub fn bucket(&self, name: &str) -> Option<Arc<MemoryBucket>> {
        self.buckets.lock().get(name).cloned()
    }
}

impl Connection for MemoryConnection {
    fn open_bucket(&self, name: &str) -> EngineResult<Arc<dyn KvBucket>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(EngineError::ConnectionClosed);
        }
        let mut buckets = self.buckets.lock();
        let bucket = buckets
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryBucket::new()))
            .clone();
        Ok(bucket)
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        // Disconnect watchers so forwarding loops observe a closed stream.
        for bucket in self.buckets.lock().values() {
            bucket.disconnect_watchers();
        }
    }

    fn is_connected(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }
}

/// A stored value and the revision it was written at.
#[derive(Debug, Clone)]
struct Stored {
    value: Vec<u8>,
    revision: u64,
}

/// Map of live keys plus the bucket-wide revision counter.
///
/// The counter is guarded together with the map so a revision is assigned
/// atomically with the write it belongs to. Deletes consume a revision too,
/// which keeps per-key revisions strictly increasing across recreate cycles.
#[derive(Debug, Default)]
struct BucketState {
    entries: HashMap<String, Stored>,
    revision: u64,
}

impl BucketState {
    fn next_revision(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }
}

struct Watcher {
    subject: String,
    tx: Sender<EngineEntry>,
}

/// An in-memory flat bucket.
///
/// # Thread Safety
///
/// Thread-safe; writes are serialized on an internal lock and watchers see
/// updates in commit order.
pub struct MemoryBucket {
    state: RwLock<BucketState>,
    watchers: RwLock<Vec<Watcher>>,
}

impl MemoryBucket {
    /// Creates a new empty bucket.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(BucketState::default()),
            watchers: RwLock::new(Vec::new()),
        }
    }

    /// Returns the number of live keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    /// Returns true if the bucket holds no live keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of active watch subscriptions.
    ///
    /// Dropped receivers are pruned on the next delivery attempt, so the
    /// count may lag until a write touches a matching subject.
    #[must_use]
    pub fn watcher_count(&self) -> usize {
        self.watchers.read().len()
    }

    /// Drops every watcher, disconnecting their receivers.
    fn disconnect_watchers(&self) {
        self.watchers.write().clear();
    }

    /// Delivers `entry` to every watcher whose subject matches its key,
    /// pruning watchers whose receiver has been dropped.
    fn notify(&self, entry: &EngineEntry) {
        let mut watchers = self.watchers.write();
        watchers.retain(|watcher| {
            if !subject_matches(&watcher.subject, &entry.key) {
                return true;
            }
            watcher.tx.send(entry.clone()).is_ok()
        });
    }
}

impl Default for MemoryBucket {
    fn default() -> Self {
        Self::new()
    }
}

impl KvBucket for MemoryBucket {
    fn get(&self, key: &str) -> EngineResult<EngineEntry> {
        let state = self.state.read();
        let stored = state.entries.get(key).ok_or(EngineError::KeyNotFound)?;
        Ok(EngineEntry {
            key: key.to_string(),
            value: stored.value.clone(),
            revision: stored.revision,
            operation: Operation::Put,
        })
    }

    fn put(&self, key: &str, value: &[u8]) -> EngineResult<u64> {
        let mut state = self.state.write();
        let revision = state.next_revision();
        state.entries.insert(
            key.to_string(),
            Stored {
                value: value.to_vec(),
                revision,
            },
        );
        self.notify(&EngineEntry {
            key: key.to_string(),
            value: value.to_vec(),
            revision,
            operation: Operation::Put,
        });
        Ok(revision)
    }

    fn create(&self, key: &str, value: &[u8]) -> EngineResult<u64> {
        let mut state = self.state.write();
        if state.entries.contains_key(key) {
            return Err(EngineError::KeyExists);
        }
        let revision = state.next_revision();
        state.entries.insert(
            key.to_string(),
            Stored {
                value: value.to_vec(),
                revision,
            },
        );
        self.notify(&EngineEntry {
            key: key.to_string(),
            value: value.to_vec(),
            revision,
            operation: Operation::Put,
        });
        Ok(revision)
    }

    fn update(&self, key: &str, value: &[u8], expected: u64) -> EngineResult<u64> {
        let mut state = self.state.write();
        let current = state
            .entries
            .get(key)
            .ok_or(EngineError::KeyNotFound)?
            .revision;
        if current != expected {
            return Err(EngineError::RevisionMismatch { expected, current });
        }
        let revision = state.next_revision();
        state.entries.insert(
            key.to_string(),
            Stored {
                value: value.to_vec(),
                revision,
            },
        );
        self.notify(&EngineEntry {
            key: key.to_string(),
            value: value.to_vec(),
            revision,
            operation: Operation::Put,
        });
        Ok(revision)
    }

    fn delete(&self, key: &str, expected: Option<u64>) -> EngineResult<()> {
        let mut state = self.state.write();
        let current = state
            .entries
            .get(key)
            .ok_or(EngineError::KeyNotFound)?
            .revision;
        if let Some(expected) = expected {
            if current != expected {
                return Err(EngineError::RevisionMismatch { expected, current });
            }
        }
        state.entries.remove(key);
        let revision = state.next_revision();
        self.notify(&EngineEntry {
            key: key.to_string(),
            value: Vec::new(),
            revision,
            operation: Operation::Delete,
        });
        Ok(())
    }

    fn keys(&self) -> EngineResult<Vec<String>> {
        Ok(self.state.read().entries.keys().cloned().collect())
    }

    fn watch(&self, subject: &str) -> EngineResult<Receiver<EngineEntry>> {
        let (tx, rx) = mpsc::channel();
        // Holding the state lock across replay and registration closes the
        // window where a concurrent write could be neither replayed nor
        // delivered live.
        let state = self.state.read();
        for (key, stored) in &state.entries {
            if subject_matches(subject, key) {
                let _ = tx.send(EngineEntry {
                    key: key.clone(),
                    value: stored.value.clone(),
                    revision: stored.revision,
                    operation: Operation::Put,
                });
            }
        }
        self.watchers.write().push(Watcher {
            subject: subject.to_string(),
            tx,
        });
        drop(state);
        Ok(rx)
    }
}

/// Matches a dot-delimited subject against a key.
///
/// A `*` token matches exactly one segment; every other token must match
/// literally. Token counts must be equal.
fn subject_matches(subject: &str, key: &str) -> bool {
    let mut subject_tokens = subject.split('.');
    let mut key_tokens = key.split('.');
    loop {
        match (subject_tokens.next(), key_tokens.next()) {
            (None, None) => return true,
            (Some(pattern), Some(token)) => {
                if pattern != "*" && pattern != token {
                    return false;
                }
            }
            _ => return false,
        }
    }
}
