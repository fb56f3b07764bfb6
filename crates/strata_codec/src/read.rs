//! The generic value reader for graph streams.
//!
//! Mirrors [`WriteContext`](crate::write::WriteContext) exactly: fixed-width
//! little-endian integers, length-prefixed UTF-8 strings, presence-flagged
//! nullable slots. Running off the end of the stream is reported as
//! [`CodecError::FormatCorruption`], since a well-formed stream always
//! carries every byte its prefix promises.

use std::any::type_name;
use std::io::Read;
use std::sync::Arc;

use strata_common::{ContentHash, Ident, Interner};

use crate::error::{CodecError, CodecResult};
use crate::identity::ReadIdentities;

/// Longest admissible string on the wire. Names in a build graph are short;
/// a length prefix beyond this bound is treated as corruption.
const MAX_STRING_LEN: u32 = 1 << 20;

/// Largest admissible collection count. Bounds allocation before the
/// elements themselves have been validated.
const MAX_COLLECTION_LEN: u32 = 1 << 24;

/// Streaming reader for one decode pass.
///
/// Wraps the input stream together with the session's string interner
/// (strings on the wire are re-interned to idents) and the shared-identity
/// registry for this pass.
pub struct ReadContext<'a, R> {
    input: R,
    interner: &'a Interner,
    identities: ReadIdentities,
}

impl<'a, R: Read> ReadContext<'a, R> {
    /// Creates a context for a fresh decode pass reading from `input`.
    pub fn new(input: R, interner: &'a Interner) -> Self {
        Self {
            input,
            interner,
            identities: ReadIdentities::new(),
        }
    }

    fn fill(&mut self, buf: &mut [u8]) -> CodecResult<()> {
        self.input.read_exact(buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                CodecError::corrupt("unexpected end of stream")
            } else {
                CodecError::Io(e)
            }
        })
    }

    /// Reads a single byte.
    pub fn read_u8(&mut self) -> CodecResult<u8> {
        let mut buf = [0u8; 1];
        self.fill(&mut buf)?;
        Ok(buf[0])
    }

    /// Reads a little-endian `u32`.
    pub fn read_u32(&mut self) -> CodecResult<u32> {
        let mut buf = [0u8; 4];
        self.fill(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    /// Reads a little-endian `u64`.
    pub fn read_u64(&mut self) -> CodecResult<u64> {
        let mut buf = [0u8; 8];
        self.fill(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    /// Reads a boolean byte, which must be exactly `0` or `1`.
    pub fn read_bool(&mut self) -> CodecResult<bool> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            byte => Err(CodecError::corrupt(format!("invalid boolean byte {byte:#04x}"))),
        }
    }

    /// Reads a length-prefixed UTF-8 string.
    pub fn read_str(&mut self) -> CodecResult<String> {
        let len = self.read_u32()?;
        if len > MAX_STRING_LEN {
            return Err(CodecError::corrupt(format!("string length {len}")));
        }
        let mut buf = vec![0u8; len as usize];
        self.fill(&mut buf)?;
        String::from_utf8(buf).map_err(|_| CodecError::corrupt("string is not valid UTF-8"))
    }

    /// Reads a string and interns it.
    pub fn read_ident(&mut self) -> CodecResult<Ident> {
        let name = self.read_str()?;
        Ok(self.interner.intern(&name))
    }

    /// Reads a content hash from its raw 16 bytes.
    pub fn read_hash(&mut self) -> CodecResult<ContentHash> {
        let mut buf = [0u8; 16];
        self.fill(&mut buf)?;
        Ok(ContentHash::from_raw(buf))
    }

    /// Reads the element count that prefixes an ordered collection.
    pub fn read_count(&mut self) -> CodecResult<usize> {
        let count = self.read_u32()?;
        if count > MAX_COLLECTION_LEN {
            return Err(CodecError::corrupt(format!("collection count {count}")));
        }
        Ok(count as usize)
    }

    /// Reads a nullable slot: presence flag, then the value if present.
    pub fn read_nullable<T, F>(&mut self, body: F) -> CodecResult<Option<T>>
    where
        F: FnOnce(&mut Self) -> CodecResult<T>,
    {
        if self.read_bool()? {
            Ok(Some(body(self)?))
        } else {
            Ok(None)
        }
    }

    /// Reads a nullable slot whose schema requires a value.
    ///
    /// An absent value is a schema violation, reported as corruption naming
    /// the missing field.
    pub fn read_non_null<T, F>(&mut self, what: &str, body: F) -> CodecResult<T>
    where
        F: FnOnce(&mut Self) -> CodecResult<T>,
    {
        self.read_nullable(body)?
            .ok_or_else(|| CodecError::corrupt(format!("missing required {what}")))
    }

    /// Decodes a value that was encoded preserving identity.
    ///
    /// Reads `[token][present]`. For a first occurrence the token must be
    /// the next sequential one (both passes assign tokens in first-seen
    /// traversal order); the body materializes the value, which is
    /// registered before it is returned. For a reuse marker the token must
    /// already be registered and must hold a `T`.
    pub fn decode_shared<T, F>(&mut self, body: F) -> CodecResult<Arc<T>>
    where
        T: std::any::Any + Send + Sync,
        F: FnOnce(&mut Self) -> CodecResult<T>,
    {
        let token = self.read_u32()?;
        if self.read_bool()? {
            self.identities.expect_next(token)?;
            let value = Arc::new(body(self)?);
            self.identities.register(token, value.clone());
            Ok(value)
        } else {
            self.identities
                .resolve(token)?
                .downcast::<T>()
                .map_err(|_| CodecError::TypeMismatch {
                    token,
                    expected: type_name::<T>(),
                })
        }
    }
}
