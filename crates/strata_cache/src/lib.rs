//! Execution-graph cache for the Strata build tool.
//!
//! Persists resolved execution graphs between build invocations. Entries
//! are framed, compressed, and checksummed on disk; graphs are written
//! incrementally through a background session so large graphs never have
//! to be held in encoded form in memory. Every read path is fail-safe:
//! corruption of any kind is a cache miss that the caller answers by
//! rebuilding, never a build failure.

#![warn(missing_docs)]

pub mod cache;
pub mod error;
pub mod manifest;
pub mod session;
pub mod store;

pub use cache::GraphCache;
pub use error::CacheError;
pub use manifest::{CacheManifest, EntryMeta};
pub use session::{EntryInfo, WriteSession};
pub use store::{EntryWriter, GraphStore};
