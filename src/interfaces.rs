//! C5 — resolves `(interface, embedding-struct, package)` triples to the concrete
//! type that actually implements the interface, so that a method call on an
//! embedded interface can be followed to its real receiver.

use indexmap::IndexMap;

use crate::model::InterfaceKey;

/// Resolves interface embeddings to concrete types.
///
/// Caches both a tree-local layer (populated as the builder discovers new
/// resolutions) and reads through to a metadata-global layer seeded by the
/// ingest layer. A miss in both returns the interface type itself — resolution
/// is an identity function when nothing more specific is known, which keeps it
/// total and idempotent.
#[derive(Debug, Default)]
pub struct InterfaceResolver {
    local: IndexMap<InterfaceKey, String>,
}

impl InterfaceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `interface_type` embedded by `struct_type` in `pkg` to its concrete
    /// implementation. `metadata_resolutions` is the metadata-global cache (see
    /// [`crate::index::MetadataIndex::interface_resolutions`]); a hit there is
    /// copied into the local cache so that later lookups for the same key are free.
    pub fn resolve(
        &mut self,
        interface_type: &str,
        struct_type: &str,
        pkg: &str,
        metadata_resolutions: &IndexMap<InterfaceKey, String>,
    ) -> String {
        let key = InterfaceKey {
            interface_type: interface_type.to_string(),
            struct_type: struct_type.to_string(),
            pkg: pkg.to_string(),
        };
        if let Some(concrete) = self.local.get(&key) {
            return concrete.clone();
        }
        if let Some(concrete) = metadata_resolutions.get(&key) {
            self.local.insert(key, concrete.clone());
            return concrete.clone();
        }
        interface_type.to_string()
    }

    /// Register a resolution discovered locally while growing the tree (e.g. from
    /// an ingest-provided hint that isn't in the metadata-global cache).
    pub fn register(&mut self, interface_type: &str, struct_type: &str, pkg: &str, concrete: &str) {
        let key = InterfaceKey {
            interface_type: interface_type.to_string(),
            struct_type: struct_type.to_string(),
            pkg: pkg.to_string(),
        };
        self.local.insert(key, concrete.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_returns_interface_identity() {
        let mut resolver = InterfaceResolver::new();
        let empty = IndexMap::new();
        assert_eq!(resolver.resolve("Reader", "MyStruct", "io", &empty), "Reader");
    }

    #[test]
    fn metadata_hit_is_cached_locally() {
        let mut resolver = InterfaceResolver::new();
        let mut metadata_resolutions = IndexMap::new();
        let key = InterfaceKey {
            interface_type: "Reader".to_string(),
            struct_type: "MyStruct".to_string(),
            pkg: "io".to_string(),
        };
        metadata_resolutions.insert(key, "ConcreteReader".to_string());
        assert_eq!(
            resolver.resolve("Reader", "MyStruct", "io", &metadata_resolutions),
            "ConcreteReader"
        );
        // Still resolves after the metadata map is replaced with an empty one,
        // because the hit got cached locally.
        let empty = IndexMap::new();
        assert_eq!(resolver.resolve("Reader", "MyStruct", "io", &empty), "ConcreteReader");
    }

    #[test]
    fn resolution_is_idempotent() {
        let mut resolver = InterfaceResolver::new();
        resolver.register("Reader", "MyStruct", "io", "ConcreteReader");
        let empty = IndexMap::new();
        let once = resolver.resolve("Reader", "MyStruct", "io", &empty);
        let twice = resolver.resolve("Reader", "MyStruct", "io", &empty);
        assert_eq!(once, twice);
    }
}
