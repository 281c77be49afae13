//! Entity identifiers for spatially indexed rows.

use serde::{Deserialize, Serialize};

use super::hash::ContentHash;

/// Identifier of any entity that carries a geometric position.
///
/// This is the id type stored in the spatial index; queries return it and
/// callers resolve it against the atom table or the graph store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityId {
    /// An atom, by code point.
    Atom(u32),
    /// A composition, by content hash.
    Composition(ContentHash),
    /// A relation, by content hash.
    Relation(ContentHash),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_ids_discriminate_kind() {
        let hash = ContentHash::of_bytes(b"x");
        assert_ne!(EntityId::Composition(hash), EntityId::Relation(hash));
    }
}
