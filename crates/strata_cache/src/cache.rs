//! High-level cache orchestrator.
//!
//! `GraphCache` ties together the manifest, the entry store, and write
//! sessions into the interface the build pipeline uses: store a resolved
//! execution graph under an invocation key, load it back on a later
//! invocation, and garbage-collect what is no longer referenced. All reads
//! are fail-safe: any corruption or incompatibility is a cache miss, and
//! the caller rebuilds.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use strata_codec::{read_graph, write_graph, ReadContext, WriteContext};
use strata_common::Interner;
use strata_model::GraphNode;
use tracing::{debug, warn};

use crate::error::CacheError;
use crate::manifest::{CacheManifest, EntryMeta};
use crate::session::{EntryInfo, WriteSession};
use crate::store::GraphStore;

/// Cache manager for persisted execution graphs.
pub struct GraphCache {
    /// Root directory for all cache files.
    cache_dir: PathBuf,

    /// Manifest tracking live entries.
    manifest: CacheManifest,

    /// Framed entry file store.
    store: GraphStore,

    /// Tool version string for compatibility checks.
    tool_version: String,
}

impl GraphCache {
    /// Loads an existing cache or creates a fresh one.
    ///
    /// An existing manifest is kept only if it was produced by the same
    /// tool version; otherwise the cache starts empty. Fail-safe: any
    /// problem with the existing manifest means starting fresh.
    pub fn load_or_create(cache_dir: &Path, tool_version: &str) -> Self {
        let manifest = CacheManifest::load(cache_dir)
            .filter(|m| m.is_compatible(tool_version))
            .unwrap_or_else(|| CacheManifest::new(tool_version));

        Self {
            cache_dir: cache_dir.to_path_buf(),
            manifest,
            store: GraphStore::new(cache_dir),
            tool_version: tool_version.to_string(),
        }
    }

    /// Stores a complete graph under `key` in one pass.
    ///
    /// Convenience for callers that already hold the whole node sequence;
    /// producers that stream should use [`begin_session`](Self::begin_session).
    pub fn store_graph(
        &mut self,
        key: &str,
        interner: &Interner,
        nodes: &[GraphNode],
    ) -> Result<EntryInfo, CacheError> {
        let writer = self.store.begin_entry(key, &self.tool_version)?;
        let mut ctx = WriteContext::new(writer, interner);
        write_graph(&mut ctx, nodes)?;
        let writer = ctx.finish()?;
        let checksum = writer.finish()?;

        let info = EntryInfo {
            key: key.to_string(),
            checksum,
            node_count: nodes.len() as u64,
        };
        self.record_entry(&info);
        Ok(info)
    }

    /// Opens a background write session for `key`.
    ///
    /// The completed session's [`EntryInfo`] must be passed to
    /// [`record_entry`](Self::record_entry) to make the entry visible to
    /// [`load_graph`](Self::load_graph).
    pub fn begin_session(
        &self,
        key: &str,
        interner: Arc<Interner>,
    ) -> Result<WriteSession, CacheError> {
        let writer = self.store.begin_entry(key, &self.tool_version)?;
        Ok(WriteSession::spawn(writer, interner, key.to_string()))
    }

    /// Records a finished entry in the manifest.
    pub fn record_entry(&mut self, info: &EntryInfo) {
        self.manifest.entries.insert(
            info.key.clone(),
            EntryMeta {
                checksum: info.checksum,
                node_count: info.node_count,
            },
        );
    }

    /// Loads the graph stored under `key`.
    ///
    /// Returns `None` on any miss: unknown key, missing or corrupt entry
    /// file, or a payload the codec rejects. Corruption is logged and
    /// treated as a miss; the caller rebuilds and overwrites the entry.
    pub fn load_graph(&self, key: &str, interner: &Interner) -> Option<Vec<GraphNode>> {
        if !self.manifest.entries.contains_key(key) {
            debug!(key, "graph cache miss");
            return None;
        }
        let Some(payload) = self.store.read_entry(key) else {
            warn!(key, "graph entry missing or corrupt, treating as miss");
            return None;
        };

        let mut ctx = ReadContext::new(payload.as_slice(), interner);
        match read_graph(&mut ctx) {
            Ok(nodes) => {
                debug!(key, nodes = nodes.len(), "graph cache hit");
                Some(nodes)
            }
            Err(err) => {
                warn!(key, error = %err, "discarding undecodable graph entry");
                None
            }
        }
    }

    /// Removes an entry from the manifest and deletes its file.
    pub fn remove_entry(&mut self, key: &str) -> Result<(), CacheError> {
        self.manifest.entries.remove(key);
        self.store.remove_entry(key)?;
        Ok(())
    }

    /// Persists the manifest to disk.
    pub fn save(&self) -> Result<(), CacheError> {
        self.manifest.save(&self.cache_dir)
    }

    /// Returns the current manifest.
    pub fn manifest(&self) -> &CacheManifest {
        &self.manifest
    }

    /// Removes entry files not referenced by the manifest, including
    /// partials left behind by crashed sessions. Returns the number of
    /// files removed.
    pub fn gc(&self) -> Result<usize, CacheError> {
        let live: Vec<&str> = self.manifest.entries.keys().map(String::as_str).collect();
        let removed = self.store.gc(&live)?;
        if removed > 0 {
            debug!(removed, "graph cache gc");
        }
        Ok(removed)
    }
}
