//! Interned names with O(1) equality and cloning.

use lasso::ThreadedRodeo;
use serde::{Deserialize, Serialize};

/// An interned name: component names, variant names, attribute keys and
/// values, transform action names.
///
/// `Ident` is a `u32` index into an [`Interner`]. Equality and hashing
/// compare indices, so two idents are equal exactly when they were interned
/// from the same string in the same interner. An `Ident` is only meaningful
/// together with the interner that produced it; the wire codec resolves
/// idents to strings on encode and re-interns them on decode.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Ident(u32);

impl Ident {
    /// Reconstructs an `Ident` from its raw index.
    ///
    /// Intended for tests; real idents come from [`Interner::intern`].
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index of this ident.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

// SAFETY: the wrapped `u32` always fits in `usize` on supported platforms,
// and `try_from_usize` rejects indices that do not fit in `u32`.
unsafe impl lasso::Key for Ident {
    fn into_usize(self) -> usize {
        self.0 as usize
    }

    fn try_from_usize(int: usize) -> Option<Self> {
        u32::try_from(int).ok().map(Ident)
    }
}

/// Thread-safe string interner backed by [`lasso::ThreadedRodeo`].
///
/// One interner lives for the duration of a build invocation. Every name in
/// the graph model is interned through it, so name comparisons anywhere in
/// the pipeline are index comparisons.
pub struct Interner {
    rodeo: ThreadedRodeo<Ident>,
}

impl Interner {
    /// Creates an empty interner.
    pub fn new() -> Self {
        Self {
            rodeo: ThreadedRodeo::new(),
        }
    }

    /// Interns `name`, returning its [`Ident`]. Re-interning an already
    /// known string returns the existing ident without allocating.
    pub fn intern(&self, name: &str) -> Ident {
        self.rodeo.get_or_intern(name)
    }

    /// Resolves an ident back to its string.
    ///
    /// # Panics
    ///
    /// Panics if `ident` was not produced by this interner.
    pub fn resolve(&self, ident: Ident) -> &str {
        self.rodeo.resolve(&ident)
    }

    /// Resolves an ident if it belongs to this interner, `None` otherwise.
    pub fn try_resolve(&self, ident: Ident) -> Option<&str> {
        self.rodeo.try_resolve(&ident)
    }

    /// Number of distinct strings interned so far.
    pub fn len(&self) -> usize {
        self.rodeo.len()
    }

    /// Returns `true` if nothing has been interned yet.
    pub fn is_empty(&self) -> bool {
        self.rodeo.is_empty()
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}
