//! Shared foundational types for the Strata build-graph persistence layer.
//!
//! This crate provides interned identifiers and content hashing, used by the
//! graph model, the wire codec, and the cache layer.

#![warn(missing_docs)]

pub mod hash;
pub mod ident;

pub use hash::{ContentHash, ContentHasher};
pub use ident::{Ident, Interner};
