//! The content graph builder.
//!
//! Turns an ordered child stream into a content-addressed row: run-length
//! compression, canonical hashing, occurrence-weighted centroid, and
//! cascading deduplication against prior rows. Creation is idempotent
//! under concurrency because the storage boundary's insert-if-absent
//! resolves create races to a single row; the losing writer simply sees
//! `created = false` and appends evidence against the winner.

use tracing::{debug, error};

use crate::atoms::AtomStore;
use crate::error::{CoreError, CoreResult};
use crate::geometry::{distance, SpatialKeyEncoder};
use crate::store::{GraphStore, InsertOutcome};
use crate::types::{
    hash_sequence, run_length_encode, ChildRef, Composition, ContentHash, Physicality, Relation,
    SequenceDomain, SequenceEntry, StorageMode,
};

/// Result of a create-or-dedup pass.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOutcome {
    /// Content hash of the row.
    pub hash: ContentHash,
    /// Whether this call created the row (`false` = dedup hit).
    pub created: bool,
    /// The row's geometric position.
    pub physicality: Physicality,
}

/// Builder over an atom table and a graph store.
pub struct ContentGraphBuilder<'a, S: GraphStore + ?Sized> {
    atoms: &'a AtomStore,
    store: &'a S,
    encoder: SpatialKeyEncoder,
}

impl<'a, S: GraphStore + ?Sized> ContentGraphBuilder<'a, S> {
    /// Create a builder.
    pub fn new(atoms: &'a AtomStore, store: &'a S, encoder: SpatialKeyEncoder) -> Self {
        Self {
            atoms,
            store,
            encoder,
        }
    }

    /// Build (or dedup against) a composition from an ordered child stream.
    ///
    /// # Errors
    ///
    /// - `CoreError::EmptySequence` for a zero-length stream
    /// - `CoreError::ChildNotFound` when a referenced atom or composition
    ///   does not exist
    /// - `CoreError::HashCollision` when the stored row under this hash
    ///   carries a different sequence (fatal, insert aborted)
    pub fn compose(
        &self,
        children: &[ChildRef],
        mode: StorageMode,
    ) -> CoreResult<BuildOutcome> {
        if children.is_empty() {
            return Err(CoreError::EmptySequence);
        }
        let entries = run_length_encode(children.iter().copied());
        let physicality = self.sequence_physicality(&entries)?;
        let hash = hash_sequence(SequenceDomain::Composition, &entries);

        let row = Composition::new(hash, entries.clone(), physicality.clone(), mode);
        match self.store.create_composition(row)? {
            InsertOutcome::Created => {
                debug!(%hash, entries = entries.len(), "composition created");
                Ok(BuildOutcome {
                    hash,
                    created: true,
                    physicality,
                })
            }
            InsertOutcome::Existing(existing) => {
                if existing.sequence != entries {
                    error!(%hash, "content hash collision between distinct sequences");
                    return Err(CoreError::HashCollision { hash });
                }
                Ok(BuildOutcome {
                    hash,
                    created: false,
                    physicality: existing.physicality,
                })
            }
        }
    }

    /// Build (or dedup against) a relation edge over an ordered
    /// composition sequence.
    ///
    /// On creation the reference count of every distinct member
    /// composition is bumped, which is what keeps members alive until the
    /// relation is garbage-collected.
    pub fn relate(&self, members: &[ContentHash]) -> CoreResult<BuildOutcome> {
        if members.is_empty() {
            return Err(CoreError::EmptySequence);
        }
        let children: Vec<ChildRef> = members
            .iter()
            .map(|hash| ChildRef::Composition(*hash))
            .collect();
        let entries = run_length_encode(children.into_iter());
        let physicality = self.sequence_physicality(&entries)?;
        let hash = hash_sequence(SequenceDomain::Relation, &entries);

        let row = Relation::new(hash, entries.clone(), physicality.clone());
        let member_hashes = row.member_hashes();
        match self.store.create_relation(row)? {
            InsertOutcome::Created => {
                for member in &member_hashes {
                    self.store.adjust_composition_refs(member, 1)?;
                }
                debug!(%hash, members = member_hashes.len(), "relation created");
                Ok(BuildOutcome {
                    hash,
                    created: true,
                    physicality,
                })
            }
            InsertOutcome::Existing(existing) => {
                if existing.sequence != entries {
                    error!(%hash, "relation hash collision between distinct sequences");
                    return Err(CoreError::HashCollision { hash });
                }
                Ok(BuildOutcome {
                    hash,
                    created: false,
                    physicality: existing.physicality,
                })
            }
        }
    }

    /// Occurrence-weighted centroid of a sequence, renormalized to S³.
    fn sequence_physicality(&self, entries: &[SequenceEntry]) -> CoreResult<Physicality> {
        let mut weighted = Vec::with_capacity(entries.len());
        for entry in entries {
            let position = self.child_position(&entry.child)?;
            weighted.push((position, f64::from(entry.occurrences)));
        }
        let position = distance::centroid(&weighted)?;
        let spatial_key = self.encoder.encode_position(&position)?;
        Ok(Physicality::new(position, spatial_key))
    }

    /// Resolve a child reference to its position.
    fn child_position(&self, child: &ChildRef) -> CoreResult<[f64; 4]> {
        match child {
            ChildRef::Atom(codepoint) => self
                .atoms
                .get(*codepoint)
                .map(|atom| atom.physicality.position)
                .ok_or(CoreError::ChildNotFound { child: *child }),
            ChildRef::Composition(hash) => self
                .store
                .composition(hash)?
                .map(|row| row.physicality.position)
                .ok_or(CoreError::ChildNotFound { child: *child }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::AtomSeeder;
    use crate::store::MemoryGraphStore;

    fn fixture() -> (AtomStore, MemoryGraphStore) {
        let atoms = AtomSeeder::default()
            .seed_codepoint_range(' '..='~', 1)
            .unwrap();
        (atoms, MemoryGraphStore::new())
    }

    fn atom_children(text: &str) -> Vec<ChildRef> {
        text.chars().map(|c| ChildRef::Atom(u32::from(c))).collect()
    }

    #[test]
    fn test_compose_then_dedup() {
        let (atoms, store) = fixture();
        let builder = ContentGraphBuilder::new(&atoms, &store, SpatialKeyEncoder::default());

        let first = builder
            .compose(&atom_children("hello"), StorageMode::Dense)
            .unwrap();
        assert!(first.created);

        let second = builder
            .compose(&atom_children("hello"), StorageMode::Dense)
            .unwrap();
        assert!(!second.created);
        assert_eq!(first.hash, second.hash);
        assert_eq!(store.composition_count(), 1);
    }

    #[test]
    fn test_compose_empty_rejected() {
        let (atoms, store) = fixture();
        let builder = ContentGraphBuilder::new(&atoms, &store, SpatialKeyEncoder::default());
        assert!(matches!(
            builder.compose(&[], StorageMode::Dense),
            Err(CoreError::EmptySequence)
        ));
    }

    #[test]
    fn test_compose_unknown_atom_rejected() {
        let (atoms, store) = fixture();
        let builder = ContentGraphBuilder::new(&atoms, &store, SpatialKeyEncoder::default());
        // U+0394 (GREEK CAPITAL DELTA) is outside the seeded ASCII range.
        let err = builder
            .compose(&[ChildRef::Atom(0x394)], StorageMode::Dense)
            .unwrap_err();
        assert!(matches!(err, CoreError::ChildNotFound { .. }));
    }

    #[test]
    fn test_compose_centroid_is_unit() {
        let (atoms, store) = fixture();
        let builder = ContentGraphBuilder::new(&atoms, &store, SpatialKeyEncoder::default());
        let outcome = builder
            .compose(&atom_children("world"), StorageMode::Dense)
            .unwrap();
        assert!(outcome.physicality.validate().is_ok());
    }

    #[test]
    fn test_relate_bumps_member_references() {
        let (atoms, store) = fixture();
        let builder = ContentGraphBuilder::new(&atoms, &store, SpatialKeyEncoder::default());

        let a = builder
            .compose(&atom_children("salt"), StorageMode::Dense)
            .unwrap();
        let b = builder
            .compose(&atom_children("pepper"), StorageMode::Dense)
            .unwrap();

        let edge = builder.relate(&[a.hash, b.hash]).unwrap();
        assert!(edge.created);
        assert_eq!(store.composition(&a.hash).unwrap().unwrap().references, 1);
        assert_eq!(store.composition(&b.hash).unwrap().unwrap().references, 1);

        // Dedup hit does not double-count references.
        let again = builder.relate(&[a.hash, b.hash]).unwrap();
        assert!(!again.created);
        assert_eq!(store.composition(&a.hash).unwrap().unwrap().references, 1);
    }

    #[test]
    fn test_relate_repeated_member_collapses() {
        let (atoms, store) = fixture();
        let builder = ContentGraphBuilder::new(&atoms, &store, SpatialKeyEncoder::default());

        let token = builder
            .compose(&atom_children("hello"), StorageMode::Dense)
            .unwrap();
        let edge = builder.relate(&[token.hash, token.hash]).unwrap();

        let stored = store.relation(&edge.hash).unwrap().unwrap();
        assert_eq!(stored.sequence.len(), 1, "repeat must collapse via RLE");
        assert_eq!(stored.sequence[0].occurrences, 2);
        // One distinct member, one reference.
        assert_eq!(
            store.composition(&token.hash).unwrap().unwrap().references,
            1
        );
    }

    #[test]
    fn test_relate_unknown_member_rejected() {
        let (atoms, store) = fixture();
        let builder = ContentGraphBuilder::new(&atoms, &store, SpatialKeyEncoder::default());
        let ghost = ContentHash::of_bytes(b"never stored");
        assert!(matches!(
            builder.relate(&[ghost]),
            Err(CoreError::ChildNotFound { .. })
        ));
    }

    #[test]
    fn test_nested_composition() {
        let (atoms, store) = fixture();
        let builder = ContentGraphBuilder::new(&atoms, &store, SpatialKeyEncoder::default());

        let inner = builder
            .compose(&atom_children("ab"), StorageMode::Dense)
            .unwrap();
        let outer = builder
            .compose(
                &[
                    ChildRef::Composition(inner.hash),
                    ChildRef::Atom(u32::from('!')),
                ],
                StorageMode::Dense,
            )
            .unwrap();
        assert!(outer.created);
        assert_ne!(outer.hash, inner.hash);
    }
}
