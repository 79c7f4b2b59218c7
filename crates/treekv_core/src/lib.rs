//! # TreeKV Core
//!
//! Hierarchical key namespace over a flat revision-versioned key-value
//! engine.
//!
//! Callers address keys as slash-delimited paths (`app/web/tls`), with
//! directory-style operations over them, while the underlying engine only
//! understands flat, independently versioned keys. This crate provides:
//! - Key translation between the two namespaces ([`KeyCodec`])
//! - CRUD over hierarchical keys ([`Store`])
//! - Directory listing and recursive delete
//! - Optimistic-concurrency writes and deletes (compare-and-swap on
//!   engine revisions)
//! - Single-key and directory-level watch streams ([`Watch`])
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use treekv_core::{Config, Store};
//! use treekv_engine::MemoryConnection;
//!
//! let conn = Arc::new(MemoryConnection::new());
//! let store = Store::open(conn, Config::default()).unwrap();
//!
//! store.put("app/web/host", b"web-1").unwrap();
//! store.put("app/db/host", b"db-1").unwrap();
//!
//! let entries = store.list("app").unwrap();
//! assert_eq!(entries.len(), 2);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod keys;
mod store;
mod types;
mod watch;

pub use config::Config;
pub use error::{CoreError, CoreResult};
pub use keys::KeyCodec;
pub use store::{Lock, Store};
pub use types::Entry;
pub use watch::Watch;
