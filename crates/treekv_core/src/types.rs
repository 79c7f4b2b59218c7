//! Core type definitions for TreeKV.

/// A stored key/value/revision triple.
///
/// The key is in hierarchical form (slash-delimited); translation to and
/// from the engine's flat namespace happens inside the store. The revision
/// is assigned by the engine and is strictly increasing across successive
/// writes to the same key, which makes it usable as a compare-and-swap
/// token for [`crate::Store::atomic_put`] and
/// [`crate::Store::atomic_delete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Hierarchical key, slash-delimited with no empty segments.
    pub key: String,
    /// Opaque value bytes. Empty for delete notifications on watch streams.
    pub value: Vec<u8>,
    /// Engine-assigned revision.
    pub revision: u64,
}
