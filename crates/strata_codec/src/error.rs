//! Error taxonomy for graph encoding and decoding.

/// The result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised while encoding or decoding a graph stream.
///
/// A decode-side error is fatal to the whole deserialization session; the
/// cache layer converts it into a cache miss rather than failing the build.
/// The codec itself never retries or falls back.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The stream violates the wire format: a reference to an undefined
    /// token, a missing required value, a truncated stream, or an invalid
    /// tag, boolean, or string.
    #[error("corrupt graph stream: {reason}")]
    FormatCorruption {
        /// Description of the protocol violation.
        reason: String,
    },

    /// A shared reference resolved to a value of a different runtime type
    /// than the decoder expected.
    #[error("graph reference type mismatch: token {token} is not a {expected}")]
    TypeMismatch {
        /// The identity token that was being resolved.
        token: u32,
        /// The type the decoder expected at this position.
        expected: &'static str,
    },

    /// The underlying stream failed during encoding.
    ///
    /// Decode-side end-of-stream is reported as [`FormatCorruption`]
    /// (`CodecError::FormatCorruption`), never as `Io`.
    #[error("graph stream I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CodecError {
    /// Creates a [`CodecError::FormatCorruption`] with the given reason.
    pub fn corrupt(reason: impl Into<String>) -> Self {
        CodecError::FormatCorruption {
            reason: reason.into(),
        }
    }
}
