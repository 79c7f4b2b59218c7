//! Store facade: CRUD, directory, and atomic operations over the engine.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;
use treekv_engine::{Connection, EngineEntry, EngineError, KvBucket};

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::keys::KeyCodec;
use crate::types::Entry;
use crate::watch::{self, Watch};

/// Handle type for distributed locks.
///
/// Never constructed: this store does not offer distributed locking, and
/// [`Store::new_lock`] always fails with [`CoreError::CallNotSupported`].
pub struct Lock {
    _private: (),
}

/// A hierarchical key-value store over a flat engine bucket.
///
/// The store accepts slash-delimited hierarchical keys, translates them
/// into the engine's flat namespace, and layers directory semantics
/// (listing, recursive delete, recursive watch) and optimistic-concurrency
/// operations on top of the engine's single-key primitives.
///
/// # Consistency
///
/// Individual operations are as consistent as the engine makes them;
/// across keys there are no guarantees. [`Store::list`] observes whatever
/// keys exist at scan time, and [`Store::delete_tree`] is a sequence of
/// independent deletes that can race with concurrent writers.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use treekv_core::{Config, Store};
/// use treekv_engine::MemoryConnection;
///
/// let conn = Arc::new(MemoryConnection::new());
/// let store = Store::open(conn, Config::default()).unwrap();
/// store.put("app/web/host", b"web-1").unwrap();
/// assert_eq!(store.get("app/web/host").unwrap().value, b"web-1");
/// ```
pub struct Store {
    codec: KeyCodec,
    conn: Arc<dyn Connection>,
    bucket: Arc<dyn KvBucket>,
    config: Config,
    is_open: RwLock<bool>,
}

impl Store {
    /// Opens a store over a pre-established engine connection.
    ///
    /// Opens (creating if missing) the bucket named by
    /// [`Config::bucket`]. The key codec configuration is fixed from
    /// `config` for the lifetime of the store.
    ///
    /// # Errors
    ///
    /// Returns any engine failure encountered while opening the bucket.
    pub fn open(conn: Arc<dyn Connection>, config: Config) -> CoreResult<Self> {
        let bucket = conn.open_bucket(&config.bucket)?;
        debug!(bucket = %config.bucket, "store opened");
        Ok(Self {
            codec: KeyCodec::new(config.encode_keys),
            conn,
            bucket,
            config,
            is_open: RwLock::new(true),
        })
    }

    /// Returns the current entry for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::KeyNotFound`] if the key is absent.
    pub fn get(&self, key: &str) -> CoreResult<Entry> {
        self.check_open()?;
        let entry = self.bucket.get(&self.codec.normalize(key))?;
        Ok(self.decode_entry(entry))
    }

    /// Writes `value` under `key`, unconditionally overwriting any current
    /// value.
    ///
    /// # Errors
    ///
    /// Returns any engine failure.
    pub fn put(&self, key: &str, value: &[u8]) -> CoreResult<()> {
        self.check_open()?;
        self.bucket.put(&self.codec.normalize(key), value)?;
        Ok(())
    }

    /// Removes `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::KeyNotFound`] if the key is absent.
    pub fn delete(&self, key: &str) -> CoreResult<()> {
        self.check_open()?;
        self.bucket.delete(&self.codec.normalize(key), None)?;
        Ok(())
    }

    /// Reports whether `key` exists.
    ///
    /// Absence is a `false` result, not an error.
    ///
    /// # Errors
    ///
    /// Returns any engine failure other than the key being absent.
    pub fn exists(&self, key: &str) -> CoreResult<bool> {
        self.check_open()?;
        match self.bucket.get(&self.codec.normalize(key)) {
            Ok(_) => Ok(true),
            Err(EngineError::KeyNotFound) => Ok(false),
            Err(other) => Err(other.into()),
        }
    }

    /// Lists every entry inside `directory`, at any depth.
    ///
    /// Scans all keys in the bucket and keeps those contained in the
    /// directory; the directory's own key is never a member of the result.
    /// Order is unspecified.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::KeyNotFound`] if no key is contained in the
    /// directory.
    pub fn list(&self, directory: &str) -> CoreResult<Vec<Entry>> {
        self.check_open()?;
        let dir = self.codec.normalize(directory);
        let dir_path = self.codec.decode(&dir);
        let mut entries = Vec::new();
        for key in self.bucket.keys()? {
            if !self.codec.is_in_directory(&dir, &key) {
                continue;
            }
            let entry = self.decode_entry(self.bucket.get(&key)?);
            // A directory is never a member of its own listing.
            if entry.key == dir_path {
                continue;
            }
            entries.push(entry);
        }
        if entries.is_empty() {
            return Err(CoreError::KeyNotFound);
        }
        Ok(entries)
    }

    /// Deletes every entry inside `directory`, sequentially.
    ///
    /// Not transactional: a failure partway leaves earlier deletes applied
    /// and later keys intact.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::KeyNotFound`] if the directory is empty, or
    /// the first failure encountered while deleting.
    pub fn delete_tree(&self, directory: &str) -> CoreResult<()> {
        for entry in self.list(directory)? {
            self.delete(&entry.key)?;
        }
        Ok(())
    }

    /// Writes `value` under `key` only if the caller's view of the key is
    /// current.
    ///
    /// With `previous` absent this is a create: it fails with
    /// [`CoreError::KeyExists`] if the key is already present. With
    /// `previous` supplied it is a compare-and-swap on
    /// `previous.revision`, failing with [`CoreError::KeyModified`] if the
    /// key has been written since. On success returns the entry with its
    /// newly assigned revision.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::KeyExists`], [`CoreError::KeyModified`], or
    /// any other engine failure unmodified.
    pub fn atomic_put(
        &self,
        key: &str,
        value: &[u8],
        previous: Option<&Entry>,
    ) -> CoreResult<Entry> {
        self.check_open()?;
        let flat = self.codec.normalize(key);
        let revision = match previous {
            Some(prev) => self.bucket.update(&flat, value, prev.revision)?,
            None => self.bucket.create(&flat, value)?,
        };
        Ok(Entry {
            key: self.codec.decode(&flat),
            value: value.to_vec(),
            revision,
        })
    }

    /// Removes `key` only if the caller's view of the key is current.
    ///
    /// `previous` is required; this operation never performs an
    /// unconditional delete.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::PreviousNotSpecified`] without `previous`,
    /// [`CoreError::KeyNotFound`] if the key is absent, and
    /// [`CoreError::KeyModified`] if the key has been written since
    /// `previous` was read.
    pub fn atomic_delete(&self, key: &str, previous: Option<&Entry>) -> CoreResult<()> {
        self.check_open()?;
        let prev = previous.ok_or(CoreError::PreviousNotSpecified)?;
        let flat = self.codec.normalize(key);
        // Probe first so an absent key reports KeyNotFound, not a
        // revision conflict.
        self.bucket.get(&flat)?;
        self.bucket.delete(&flat, Some(prev.revision))?;
        Ok(())
    }

    /// Subscribes to changes of `key`.
    ///
    /// A key ending in `/*` subscribes to all immediate children of the
    /// base path instead of a single literal key. Updates older than the
    /// subscription (the engine's historical replay) are suppressed for
    /// [`Config::replay_window`]; the window is a timing heuristic, not a
    /// handshake with the engine. Deletes arrive as entries with an empty
    /// value.
    ///
    /// # Errors
    ///
    /// Returns any engine failure encountered while establishing the
    /// subscription.
    pub fn watch(&self, key: &str) -> CoreResult<Watch<Entry>> {
        self.check_open()?;
        let subject = self.watch_subject(key);
        debug!(%subject, "starting watch");
        let updates = self.bucket.watch(&subject)?;
        Ok(watch::forward(
            updates,
            self.codec,
            self.config.replay_window,
            |entry| entry,
        ))
    }

    /// Subscribes to changes of every immediate child of `directory`.
    ///
    /// Each change is delivered as its own single-element batch;
    /// near-simultaneous changes are never aggregated.
    ///
    /// # Errors
    ///
    /// Returns any engine failure encountered while establishing the
    /// subscription.
    pub fn watch_tree(&self, directory: &str) -> CoreResult<Watch<Vec<Entry>>> {
        self.check_open()?;
        let subject = format!("{}.*", self.codec.normalize(directory));
        debug!(%subject, "starting tree watch");
        let updates = self.bucket.watch(&subject)?;
        Ok(watch::forward(
            updates,
            self.codec,
            self.config.replay_window,
            |entry| vec![entry],
        ))
    }

    /// Acquires a distributed lock on `key`.
    ///
    /// # Errors
    ///
    /// Always fails with [`CoreError::CallNotSupported`]; this store does
    /// not offer distributed locking.
    pub fn new_lock(&self, _key: &str) -> CoreResult<Lock> {
        Err(CoreError::CallNotSupported)
    }

    /// Closes the store and the connection behind it.
    ///
    /// Idempotent. Subsequent operations fail with
    /// [`CoreError::StoreClosed`]; active watches end as their engine
    /// subscriptions disconnect.
    ///
    /// # Errors
    ///
    /// Currently infallible; the signature leaves room for engines whose
    /// teardown can fail.
    pub fn close(&self) -> CoreResult<()> {
        let mut is_open = self.is_open.write();
        if *is_open {
            *is_open = false;
            self.conn.close();
            debug!(bucket = %self.config.bucket, "store closed");
        }
        Ok(())
    }

    fn check_open(&self) -> CoreResult<()> {
        if *self.is_open.read() {
            Ok(())
        } else {
            Err(CoreError::StoreClosed)
        }
    }

    fn decode_entry(&self, entry: EngineEntry) -> Entry {
        Entry {
            key: self.codec.decode(&entry.key),
            value: entry.value,
            revision: entry.revision,
        }
    }

    fn watch_subject(&self, key: &str) -> String {
        match key.strip_suffix("/*") {
            Some(base) => format!("{}.*", self.codec.normalize(base)),
            None => self.codec.normalize(key),
        }
    }
}
