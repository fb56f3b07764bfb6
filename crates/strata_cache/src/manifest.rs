//! Cache manifest tracking the set of persisted graph entries.
//!
//! The manifest is `manifest.json` in the cache directory. It records, per
//! entry key, the payload checksum and node count, and carries the tool
//! version that produced the cache so incompatible caches start fresh.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use strata_common::ContentHash;

use crate::error::CacheError;

/// Name of the manifest file within the cache directory.
const MANIFEST_FILE: &str = "manifest.json";

/// Top-level manifest for an execution-graph cache directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheManifest {
    /// Tool version that produced this cache. Any mismatch invalidates it.
    pub tool_version: String,

    /// Per-entry metadata, keyed by the entry key (typically the hex form
    /// of the build-invocation hash).
    pub entries: HashMap<String, EntryMeta>,
}

/// Metadata recorded for one persisted graph entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryMeta {
    /// XXH3-128 checksum of the entry's compressed payload.
    pub checksum: ContentHash,

    /// Number of top-level nodes in the persisted graph.
    pub node_count: u64,
}

impl CacheManifest {
    /// Creates an empty manifest for the given tool version.
    pub fn new(tool_version: &str) -> Self {
        Self {
            tool_version: tool_version.to_string(),
            entries: HashMap::new(),
        }
    }

    /// Loads the manifest from `cache_dir`, or `None` if it is missing or
    /// unparsable. Fail-safe: any problem means starting fresh.
    pub fn load(cache_dir: &Path) -> Option<Self> {
        let path = cache_dir.join(MANIFEST_FILE);
        let content = std::fs::read_to_string(path).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Saves the manifest into `cache_dir`, creating the directory if
    /// needed.
    pub fn save(&self, cache_dir: &Path) -> Result<(), CacheError> {
        std::fs::create_dir_all(cache_dir).map_err(|e| CacheError::io(cache_dir, e))?;
        let path = cache_dir.join(MANIFEST_FILE);
        let json =
            serde_json::to_string_pretty(self).map_err(|e| CacheError::ManifestSerialize {
                reason: e.to_string(),
            })?;
        std::fs::write(&path, json).map_err(|e| CacheError::io(path, e))
    }

    /// Returns `true` if this manifest was produced by a compatible tool
    /// version.
    pub fn is_compatible(&self, current_version: &str) -> bool {
        self.tool_version == current_version
    }
}
