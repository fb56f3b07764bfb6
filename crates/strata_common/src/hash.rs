//! Content hashing for cache keys and stream integrity.

use serde::{Deserialize, Serialize};
use std::fmt;
use xxhash_rust::xxh3::Xxh3;

/// A 128-bit XXH3 content hash.
///
/// Used as the cache key for persisted execution graphs, as the identity of
/// transform parameter sets, and as the integrity checksum trailing every
/// cache entry file. Two byte streams with the same `ContentHash` are
/// assumed identical.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash([u8; 16]);

impl ContentHash {
    /// Hashes a byte slice in one shot.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self(xxhash_rust::xxh3::xxh3_128(data).to_le_bytes())
    }

    /// Reconstructs a hash from its raw 16-byte little-endian form.
    pub fn from_raw(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Returns the raw 16-byte little-endian form.
    pub fn as_raw(&self) -> [u8; 16] {
        self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

/// Incremental XXH3-128 hasher for data that is produced in chunks.
///
/// The cache write session hashes the payload while streaming it to disk,
/// so the whole payload never has to sit in memory. `finish` yields the
/// same hash [`ContentHash::from_bytes`] would produce over the
/// concatenated chunks.
#[derive(Default)]
pub struct ContentHasher {
    inner: Xxh3,
}

impl ContentHasher {
    /// Creates a hasher with no data consumed yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk of data into the hash state.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Returns the hash of everything fed so far.
    pub fn finish(&self) -> ContentHash {
        ContentHash(self.inner.digest128().to_le_bytes())
    }
}
