//! # TreeKV Engine
//!
//! Flat key-value engine contract for TreeKV.
//!
//! This crate defines the lowest-level boundary of TreeKV: the interface of
//! a flat, revision-versioned key-value engine. Engines are **flat** - they
//! store independently versioned keys with no notion of nesting. All
//! hierarchy (directories, containment, recursive operations) is layered on
//! top by `treekv_core`.
//!
//! ## Design Principles
//!
//! - Engines store opaque values under encoded (dot-delimited) keys
//! - Every successful write is assigned a revision; revisions for a given
//!   key are strictly increasing
//! - Conditional writes and deletes fail with a structured
//!   [`EngineError::RevisionMismatch`] rather than free-form error text
//! - Must be `Send + Sync` for concurrent access
//!
//! ## Available Engines
//!
//! - [`MemoryConnection`] / [`MemoryBucket`] - For testing and ephemeral
//!   storage. Adapters for networked engines live in their own crates and
//!   implement the same traits.
//!
//! ## Example
//!
//! ```rust
//! use treekv_engine::{Connection, KvBucket, MemoryConnection};
//!
//! let conn = MemoryConnection::new();
//! let bucket = conn.open_bucket("kvstore").unwrap();
//! let revision = bucket.put("app.web", b"config").unwrap();
//! let entry = bucket.get("app.web").unwrap();
//! assert_eq!(entry.revision, revision);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod bucket;
mod error;
mod event;
mod memory;

pub use bucket::{Connection, KvBucket};
pub use error::{EngineError, EngineResult};
pub use event::{EngineEntry, Operation};
pub use memory::{MemoryBucket, MemoryConnection};
