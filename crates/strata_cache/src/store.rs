//! Framed on-disk storage for graph entries.
//!
//! Each entry lives at `<cache_dir>/graph/<key>.graph` and is framed as a
//! 4-byte header length, a bincode header (magic, format version, tool
//! version), the deflate-compressed codec payload, and a 16-byte XXH3-128
//! checksum of the compressed payload. The checksum trails the payload
//! because entries are written streaming: the writer hashes compressed
//! bytes as they pass through and only knows the digest at the end.
//!
//! Writes go to a `.partial` sibling that is renamed into place on finish,
//! so a crashed or aborted session never leaves a readable half-entry.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use strata_common::{ContentHash, ContentHasher};

use crate::error::CacheError;

/// Magic bytes identifying a Strata graph entry.
const ENTRY_MAGIC: [u8; 4] = *b"STRA";

/// Entry format version. Increment on breaking changes to the frame or
/// the codec wire format.
const ENTRY_FORMAT_VERSION: u32 = 1;

/// Subdirectory of the cache holding graph entries.
const ENTRY_SUBDIR: &str = "graph";

/// File extension of finished graph entries.
const ENTRY_EXT: &str = "graph";

/// Extension appended to in-flight entry files.
const PARTIAL_EXT: &str = "partial";

/// Length of the checksum trailer.
const TRAILER_LEN: usize = 16;

/// Header prepended to every graph entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EntryHeader {
    /// Must be `b"STRA"`.
    magic: [u8; 4],
    /// Entry format version.
    format_version: u32,
    /// Tool version that wrote the entry.
    tool_version: String,
}

/// On-disk store for graph entries under one cache directory.
pub struct GraphStore {
    cache_dir: PathBuf,
}

impl GraphStore {
    /// Creates a store rooted at `cache_dir`.
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            cache_dir: cache_dir.to_path_buf(),
        }
    }

    /// Returns the path of the entry file for `key`.
    pub fn entry_path(&self, key: &str) -> PathBuf {
        self.cache_dir
            .join(ENTRY_SUBDIR)
            .join(format!("{key}.{ENTRY_EXT}"))
    }

    /// Opens a streaming writer for a new entry.
    ///
    /// The writer produces the `.partial` file; nothing appears under the
    /// final path until [`EntryWriter::finish`] succeeds.
    pub fn begin_entry(&self, key: &str, tool_version: &str) -> Result<EntryWriter, CacheError> {
        let dir = self.cache_dir.join(ENTRY_SUBDIR);
        std::fs::create_dir_all(&dir).map_err(|e| CacheError::io(&dir, e))?;

        let final_path = self.entry_path(key);
        let tmp_path = final_path.with_extension(format!("{ENTRY_EXT}.{PARTIAL_EXT}"));

        let file = File::create(&tmp_path).map_err(|e| CacheError::io(&tmp_path, e))?;
        let mut out = BufWriter::new(file);

        let header = EntryHeader {
            magic: ENTRY_MAGIC,
            format_version: ENTRY_FORMAT_VERSION,
            tool_version: tool_version.to_string(),
        };
        let header_bytes = bincode::serde::encode_to_vec(&header, bincode::config::standard())
            .map_err(|e| CacheError::HeaderSerialize {
                reason: e.to_string(),
            })?;
        let header_len = header_bytes.len() as u32;
        out.write_all(&header_len.to_le_bytes())
            .and_then(|_| out.write_all(&header_bytes))
            .map_err(|e| CacheError::io(&tmp_path, e))?;

        let hashing = HashingWriter {
            inner: out,
            hasher: ContentHasher::new(),
        };
        Ok(EntryWriter {
            tmp_path,
            final_path,
            encoder: Some(ZlibEncoder::new(hashing, Compression::default())),
        })
    }

    /// Reads and validates an entry, returning the decompressed codec
    /// payload.
    ///
    /// Returns `None` if the file is missing, the frame is malformed, the
    /// magic or format version is wrong, or the checksum does not verify.
    /// Fail-safe: corruption is a cache miss.
    pub fn read_entry(&self, key: &str) -> Option<Vec<u8>> {
        let raw = std::fs::read(self.entry_path(key)).ok()?;

        if raw.len() < 4 {
            return None;
        }
        let header_len = u32::from_le_bytes(raw[..4].try_into().ok()?) as usize;
        let body_start = 4usize.checked_add(header_len)?;
        if raw.len() < body_start + TRAILER_LEN {
            return None;
        }

        let header: EntryHeader =
            bincode::serde::decode_from_slice(&raw[4..body_start], bincode::config::standard())
                .ok()?
                .0;
        if header.magic != ENTRY_MAGIC || header.format_version != ENTRY_FORMAT_VERSION {
            return None;
        }

        let compressed = &raw[body_start..raw.len() - TRAILER_LEN];
        let trailer: [u8; TRAILER_LEN] = raw[raw.len() - TRAILER_LEN..].try_into().ok()?;
        if ContentHash::from_bytes(compressed) != ContentHash::from_raw(trailer) {
            return None;
        }

        let mut payload = Vec::new();
        ZlibDecoder::new(compressed).read_to_end(&mut payload).ok()?;
        Some(payload)
    }

    /// Removes the entry file for `key`, returning whether it existed.
    pub fn remove_entry(&self, key: &str) -> Result<bool, CacheError> {
        let path = self.entry_path(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CacheError::io(path, e)),
        }
    }

    /// Removes entry files not present in `live_keys`, plus any stale
    /// `.partial` files left behind by crashed sessions. Returns the number
    /// of files removed.
    pub fn gc(&self, live_keys: &[&str]) -> Result<usize, CacheError> {
        let dir = self.cache_dir.join(ENTRY_SUBDIR);
        if !dir.exists() {
            return Ok(0);
        }

        let mut removed = 0;
        let entries = std::fs::read_dir(&dir).map_err(|e| CacheError::io(&dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| CacheError::io(&dir, e))?;
            let path = entry.path();
            let ext = path.extension().and_then(|e| e.to_str());

            let stale = match ext {
                Some(PARTIAL_EXT) => true,
                Some(ENTRY_EXT) => path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .is_none_or(|stem| !live_keys.contains(&stem)),
                _ => false,
            };
            if stale {
                std::fs::remove_file(&path).map_err(|e| CacheError::io(&path, e))?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Streaming writer for one entry: compresses and hashes the codec payload
/// on the way to disk.
///
/// Dropping the writer without calling [`finish`](Self::finish) discards
/// the partial file.
pub struct EntryWriter {
    tmp_path: PathBuf,
    final_path: PathBuf,
    encoder: Option<ZlibEncoder<HashingWriter<BufWriter<File>>>>,
}

impl EntryWriter {
    /// Completes the entry: flushes compression, appends the checksum
    /// trailer, and renames the `.partial` file into place.
    ///
    /// Returns the payload checksum recorded in the trailer.
    pub fn finish(mut self) -> Result<ContentHash, CacheError> {
        let encoder = self.encoder.take().ok_or_else(|| CacheError::SessionFailed {
            reason: "entry writer finished twice".to_string(),
        })?;
        match Self::complete(encoder, &self.tmp_path, &self.final_path) {
            Ok(checksum) => Ok(checksum),
            Err(e) => {
                let _ = std::fs::remove_file(&self.tmp_path);
                Err(e)
            }
        }
    }

    fn complete(
        encoder: ZlibEncoder<HashingWriter<BufWriter<File>>>,
        tmp_path: &Path,
        final_path: &Path,
    ) -> Result<ContentHash, CacheError> {
        let hashing = encoder.finish().map_err(|e| CacheError::io(tmp_path, e))?;
        let checksum = hashing.hasher.finish();
        let mut out = hashing.inner;
        out.write_all(&checksum.as_raw())
            .and_then(|_| out.flush())
            .map_err(|e| CacheError::io(tmp_path, e))?;
        drop(out);
        std::fs::rename(tmp_path, final_path).map_err(|e| CacheError::io(final_path, e))?;
        Ok(checksum)
    }
}

impl Write for EntryWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self.encoder.as_mut() {
            Some(encoder) => encoder.write(buf),
            None => Err(std::io::Error::other("entry writer already finished")),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self.encoder.as_mut() {
            Some(encoder) => encoder.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for EntryWriter {
    fn drop(&mut self) {
        if self.encoder.take().is_some() {
            let _ = std::fs::remove_file(&self.tmp_path);
        }
    }
}

/// Passes writes through while hashing everything written.
struct HashingWriter<W> {
    inner: W,
    hasher: ContentHasher,
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.hasher.update(&buf[..written]);
        Ok(written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_store() -> (tempfile::TempDir, GraphStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = GraphStore::new(dir.path());
        (dir, store)
    }

    fn write_entry(store: &GraphStore, key: &str, payload: &[u8]) -> ContentHash {
        let mut writer = store.begin_entry(key, "0.1.0").unwrap();
        writer.write_all(payload).unwrap();
        writer.finish().unwrap()
    }

    #[test]
    fn write_and_read_roundtrip() {
        let (_dir, store) = make_store();
        let payload = b"node stream bytes";
        write_entry(&store, "entry-a", payload);
        assert_eq!(store.read_entry("entry-a").unwrap(), payload);
    }

    #[test]
    fn empty_payload_roundtrip() {
        let (_dir, store) = make_store();
        write_entry(&store, "empty", b"");
        assert_eq!(store.read_entry("empty").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn large_payload_roundtrip() {
        let (_dir, store) = make_store();
        let payload: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
        write_entry(&store, "large", &payload);
        assert_eq!(store.read_entry("large").unwrap(), payload);
    }

    #[test]
    fn read_missing_returns_none() {
        let (_dir, store) = make_store();
        assert!(store.read_entry("nope").is_none());
    }

    #[test]
    fn read_garbage_returns_none() {
        let (_dir, store) = make_store();
        std::fs::create_dir_all(store.entry_path("x").parent().unwrap()).unwrap();
        std::fs::write(store.entry_path("garbage"), b"not an entry").unwrap();
        assert!(store.read_entry("garbage").is_none());
    }

    #[test]
    fn read_truncated_returns_none() {
        let (_dir, store) = make_store();
        write_entry(&store, "trunc", b"some payload worth keeping");
        let path = store.entry_path("trunc");
        let raw = std::fs::read(&path).unwrap();
        std::fs::write(&path, &raw[..raw.len() - 8]).unwrap();
        assert!(store.read_entry("trunc").is_none());
    }

    #[test]
    fn tampered_payload_returns_none() {
        let (_dir, store) = make_store();
        write_entry(&store, "tamper", b"payload that will be flipped");
        let path = store.entry_path("tamper");
        let mut raw = std::fs::read(&path).unwrap();
        let mid = raw.len() - TRAILER_LEN - 1;
        raw[mid] ^= 0xFF;
        std::fs::write(&path, &raw).unwrap();
        assert!(store.read_entry("tamper").is_none());
    }

    #[test]
    fn wrong_magic_returns_none() {
        let (_dir, store) = make_store();
        write_entry(&store, "magic", b"payload");
        let path = store.entry_path("magic");
        let mut raw = std::fs::read(&path).unwrap();
        // The magic is the first header field, right after the length.
        raw[4..8].copy_from_slice(b"BAAD");
        std::fs::write(&path, &raw).unwrap();
        assert!(store.read_entry("magic").is_none());
    }

    #[test]
    fn wrong_format_version_returns_none() {
        let (_dir, store) = make_store();
        let dir = store.entry_path("ver");
        std::fs::create_dir_all(dir.parent().unwrap()).unwrap();

        let header = EntryHeader {
            magic: ENTRY_MAGIC,
            format_version: ENTRY_FORMAT_VERSION + 1,
            tool_version: "0.1.0".to_string(),
        };
        let header_bytes =
            bincode::serde::encode_to_vec(&header, bincode::config::standard()).unwrap();
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"payload").unwrap();
        let compressed = encoder.finish().unwrap();

        let mut raw = (header_bytes.len() as u32).to_le_bytes().to_vec();
        raw.extend_from_slice(&header_bytes);
        raw.extend_from_slice(&compressed);
        raw.extend_from_slice(&ContentHash::from_bytes(&compressed).as_raw());
        std::fs::write(store.entry_path("ver"), &raw).unwrap();

        assert!(store.read_entry("ver").is_none());
    }

    #[test]
    fn dropped_writer_leaves_nothing() {
        let (_dir, store) = make_store();
        {
            let mut writer = store.begin_entry("aborted", "0.1.0").unwrap();
            writer.write_all(b"half a graph").unwrap();
            // Dropped without finish.
        }
        assert!(store.read_entry("aborted").is_none());
        let dir = store.entry_path("aborted").parent().unwrap().to_path_buf();
        let leftovers: Vec<_> = std::fs::read_dir(dir).unwrap().collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn remove_entry_reports_existence() {
        let (_dir, store) = make_store();
        write_entry(&store, "gone", b"payload");
        assert!(store.remove_entry("gone").unwrap());
        assert!(!store.remove_entry("gone").unwrap());
    }

    #[test]
    fn gc_removes_stale_and_partials() {
        let (_dir, store) = make_store();
        write_entry(&store, "live", b"keep");
        write_entry(&store, "stale", b"drop");
        // Simulate a crashed session's leftover.
        let partial = store
            .entry_path("crashed")
            .with_extension("graph.partial");
        std::fs::write(&partial, b"half").unwrap();

        let removed = store.gc(&["live"]).unwrap();
        assert_eq!(removed, 2);
        assert!(store.read_entry("live").is_some());
        assert!(store.read_entry("stale").is_none());
        assert!(!partial.exists());
    }

    #[test]
    fn gc_empty_dir_is_zero() {
        let (_dir, store) = make_store();
        assert_eq!(store.gc(&[]).unwrap(), 0);
    }
}
