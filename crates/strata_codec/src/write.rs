//! The generic value writer for graph streams.
//!
//! All multi-byte integers are little-endian and fixed-width. Strings are
//! length-prefixed UTF-8. One `WriteContext` spans one encode pass over one
//! contiguous stream; its identity registry must not be reused across
//! streams.

use std::io::Write;
use std::sync::Arc;

use strata_common::{ContentHash, Ident, Interner};

use crate::error::{CodecError, CodecResult};
use crate::identity::WriteIdentities;

/// Streaming writer for one encode pass.
///
/// Wraps the output stream together with the session's string interner
/// (idents are written as their resolved strings) and the shared-identity
/// registry for this pass.
pub struct WriteContext<'a, W> {
    out: W,
    interner: &'a Interner,
    identities: WriteIdentities,
}

impl<'a, W: Write> WriteContext<'a, W> {
    /// Creates a context for a fresh encode pass writing to `out`.
    pub fn new(out: W, interner: &'a Interner) -> Self {
        Self {
            out,
            interner,
            identities: WriteIdentities::new(),
        }
    }

    /// Flushes and returns the underlying stream.
    pub fn finish(mut self) -> CodecResult<W> {
        self.out.flush()?;
        Ok(self.out)
    }

    /// Writes a single byte.
    pub fn write_u8(&mut self, value: u8) -> CodecResult<()> {
        self.out.write_all(&[value])?;
        Ok(())
    }

    /// Writes a `u32`, little-endian.
    pub fn write_u32(&mut self, value: u32) -> CodecResult<()> {
        self.out.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    /// Writes a `u64`, little-endian.
    pub fn write_u64(&mut self, value: u64) -> CodecResult<()> {
        self.out.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    /// Writes a boolean as a single `0`/`1` byte.
    pub fn write_bool(&mut self, value: bool) -> CodecResult<()> {
        self.write_u8(value as u8)
    }

    /// Writes a length-prefixed UTF-8 string.
    pub fn write_str(&mut self, value: &str) -> CodecResult<()> {
        let len = u32::try_from(value.len())
            .map_err(|_| CodecError::corrupt(format!("string of {} bytes", value.len())))?;
        self.write_u32(len)?;
        self.out.write_all(value.as_bytes())?;
        Ok(())
    }

    /// Writes an ident as its resolved string.
    pub fn write_ident(&mut self, ident: Ident) -> CodecResult<()> {
        let name = self
            .interner
            .try_resolve(ident)
            .ok_or_else(|| CodecError::corrupt(format!("unresolvable ident {}", ident.as_raw())))?;
        self.write_str(name)
    }

    /// Writes a content hash as its raw 16 bytes.
    pub fn write_hash(&mut self, hash: &ContentHash) -> CodecResult<()> {
        self.out.write_all(&hash.as_raw())?;
        Ok(())
    }

    /// Writes the element count that prefixes an ordered collection.
    pub fn write_count(&mut self, count: usize) -> CodecResult<()> {
        let count = u32::try_from(count)
            .map_err(|_| CodecError::corrupt(format!("collection of {count} elements")))?;
        self.write_u32(count)
    }

    /// Writes a nullable slot: a presence flag, then the value if present.
    pub fn write_nullable<T, F>(&mut self, value: Option<&T>, body: F) -> CodecResult<()>
    where
        F: FnOnce(&mut Self, &T) -> CodecResult<()>,
    {
        match value {
            Some(value) => {
                self.write_bool(true)?;
                body(self, value)
            }
            None => self.write_bool(false),
        }
    }

    /// Encodes `value` preserving its identity within this pass.
    ///
    /// The first time a given `Arc` allocation is seen, it is assigned the
    /// next sequential token and `[token][present=true]` is written followed
    /// by the caller-supplied body. Every later encounter of the same
    /// allocation writes only `[token][present=false]`.
    pub fn encode_shared<T, F>(&mut self, value: &Arc<T>, body: F) -> CodecResult<()>
    where
        F: FnOnce(&mut Self) -> CodecResult<()>,
    {
        let identity = Arc::as_ptr(value) as usize;
        if let Some(token) = self.identities.token_of(identity) {
            self.write_u32(token)?;
            self.write_bool(false)
        } else {
            let token = self.identities.assign(identity);
            self.write_u32(token)?;
            self.write_bool(true)?;
            body(self)
        }
    }
}
