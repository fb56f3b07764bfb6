//! Error types for cache operations.

use std::path::PathBuf;

use strata_codec::CodecError;

/// Errors that can occur while writing to or maintaining the cache.
///
/// Reads are fail-safe and never surface these: a read problem of any kind
/// is a cache miss. Write-side errors are reported to the caller, who
/// decides whether a build can proceed without a warm cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error while reading or writing a cache file.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The manifest could not be serialized.
    #[error("failed to serialize cache manifest: {reason}")]
    ManifestSerialize {
        /// Description of the failure.
        reason: String,
    },

    /// The entry header could not be serialized.
    #[error("failed to serialize entry header: {reason}")]
    HeaderSerialize {
        /// Description of the failure.
        reason: String,
    },

    /// Graph encoding failed while writing an entry.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The background write session stopped before the graph was complete.
    #[error("write session failed: {reason}")]
    SessionFailed {
        /// Description of the failure.
        reason: String,
    },
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CacheError::Io {
            path: path.into(),
            source,
        }
    }
}
