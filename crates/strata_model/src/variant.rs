//! Variant identifiers for the source and target sides of a transformation.

use strata_common::Ident;

/// Identifies a resolved variant of a component on the source side of an
/// artifact transformation.
///
/// Immutable value; compared by equality when deduplicating graph edges.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct VariantId {
    /// The component the variant belongs to (e.g. a library coordinate).
    pub component: Ident,
    /// The variant name within the component (e.g. `release`).
    pub variant: Ident,
}

impl VariantId {
    /// Creates a variant identifier.
    pub fn new(component: Ident, variant: Ident) -> Self {
        Self { component, variant }
    }
}

/// An ordered set of attribute key/value pairs describing a target variant.
///
/// Pairs are kept sorted by key so that iteration order, and therefore the
/// encoded form, is deterministic. Inserting a duplicate key replaces the
/// existing value.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct AttributeSet {
    pairs: Vec<(Ident, Ident)>,
}

impl AttributeSet {
    /// Creates an empty attribute set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an attribute set from arbitrary pairs.
    ///
    /// Pairs are sorted by key; for duplicate keys the last value wins.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Ident, Ident)>) -> Self {
        let mut set = Self::new();
        for (key, value) in pairs {
            set.insert(key, value);
        }
        set
    }

    /// Inserts a pair, replacing any existing value for `key`.
    pub fn insert(&mut self, key: Ident, value: Ident) {
        match self.pairs.binary_search_by_key(&key.as_raw(), |(k, _)| k.as_raw()) {
            Ok(pos) => self.pairs[pos].1 = value,
            Err(pos) => self.pairs.insert(pos, (key, value)),
        }
    }

    /// Looks up the value for `key`.
    pub fn get(&self, key: Ident) -> Option<Ident> {
        self.pairs
            .binary_search_by_key(&key.as_raw(), |(k, _)| k.as_raw())
            .ok()
            .map(|pos| self.pairs[pos].1)
    }

    /// Iterates pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (Ident, Ident)> + '_ {
        self.pairs.iter().copied()
    }

    /// Number of pairs in the set.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns `true` if the set has no pairs.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Identifies the target variant that artifacts are transformed into,
/// including the attributes requested by the consumer.
///
/// Immutable value.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct ComponentVariantId {
    /// The component the target variant belongs to.
    pub component: Ident,
    /// The target variant name.
    pub variant: Ident,
    /// Attributes the target variant must satisfy.
    pub attributes: AttributeSet,
}

impl ComponentVariantId {
    /// Creates a target-variant identifier.
    pub fn new(component: Ident, variant: Ident, attributes: AttributeSet) -> Self {
        Self {
            component,
            variant,
            attributes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_common::Interner;

    #[test]
    fn variant_id_equality() {
        let interner = Interner::new();
        let lib = interner.intern("lib-a");
        let rel = interner.intern("release");
        let a = VariantId::new(lib, rel);
        let b = VariantId::new(lib, rel);
        assert_eq!(a, b);
        assert_ne!(a, VariantId::new(lib, interner.intern("debug")));
    }

    #[test]
    fn attributes_sorted_by_key() {
        let interner = Interner::new();
        let k1 = interner.intern("usage");
        let k2 = interner.intern("format");
        let v = interner.intern("runtime");

        // Inserted out of raw-index order, iterated in order.
        let set = AttributeSet::from_pairs([(k2, v), (k1, v)]);
        let keys: Vec<u32> = set.iter().map(|(k, _)| k.as_raw()).collect();
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn attributes_duplicate_key_last_wins() {
        let interner = Interner::new();
        let key = interner.intern("format");
        let jar = interner.intern("jar");
        let dir = interner.intern("classes-dir");

        let set = AttributeSet::from_pairs([(key, jar), (key, dir)]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(key), Some(dir));
    }

    #[test]
    fn attributes_get_missing() {
        let interner = Interner::new();
        let set = AttributeSet::new();
        assert!(set.is_empty());
        assert!(set.get(interner.intern("usage")).is_none());
    }

    #[test]
    fn component_variant_id_equality_includes_attributes() {
        let interner = Interner::new();
        let lib = interner.intern("lib-a");
        let api = interner.intern("api");
        let key = interner.intern("usage");
        let val = interner.intern("compile");

        let plain = ComponentVariantId::new(lib, api, AttributeSet::new());
        let attributed =
            ComponentVariantId::new(lib, api, AttributeSet::from_pairs([(key, val)]));
        assert_ne!(plain, attributed);
        assert_eq!(plain, ComponentVariantId::new(lib, api, AttributeSet::new()));
    }
}
