//! The rating engine.
//!
//! Maintains each relation's competence score as an evidence-weighted
//! running aggregate and records append-only provenance for every sample,
//! so any single contribution can later be surgically reversed. Atomicity
//! of the `(rating, observations)` read-modify-write is delegated to the
//! storage boundary, which serializes updates per relation.

use tracing::{debug, info};

use crate::error::{CoreError, CoreResult};
use crate::store::GraphStore;
use crate::types::{ContentHash, ContentId, EvidenceId, RelationEvidence, RelationRating};

/// Result of invalidating one evidence sample.
#[derive(Debug, Clone, PartialEq)]
pub enum InvalidationOutcome {
    /// The contribution was rolled back; the relation keeps its remaining
    /// evidence.
    RolledBack(RelationRating),
    /// The rollback would have emptied the aggregate: the relation has no
    /// valid evidence left and is eligible for removal. The stored
    /// aggregate was left untouched for the caller's cascade to drop.
    RelationOrphaned {
        /// The now-unsupported relation.
        relation: ContentHash,
    },
}

/// Evidence-driven rating maintenance over a graph store.
pub struct RatingEngine<'a, S: GraphStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: GraphStore + ?Sized> RatingEngine<'a, S> {
    /// Create an engine over a store.
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Absorb one evidence sample and append its provenance row.
    ///
    /// On the relation's first sample the aggregate becomes exactly the
    /// detector's initial rating with one observation; every later sample
    /// folds in through the observation-weighted running mean. Cross-source
    /// competition is implicit: each independent source just contributes
    /// another weighted sample to the same aggregate.
    pub fn record(
        &self,
        relation: &ContentHash,
        content: ContentId,
        rating: f64,
        weight: f64,
    ) -> CoreResult<RelationEvidence> {
        let aggregate = self.store.apply_rating(relation, rating, weight)?;
        let evidence = RelationEvidence::new(*relation, content, rating, weight);
        self.store.append_evidence(evidence.clone())?;
        debug!(
            %relation,
            rating = aggregate.rating,
            observations = aggregate.observations,
            "evidence absorbed"
        );
        Ok(evidence)
    }

    /// Surgically delete one evidence sample.
    ///
    /// The row is flagged invalid first, then its contribution is rolled
    /// back with the inverse of the running mean. Underflow is not a
    /// failure here: it means the relation has no valid evidence left, and
    /// the caller is told to cascade.
    ///
    /// # Errors
    ///
    /// - `CoreError::EvidenceNotFound` for an unknown id
    /// - `CoreError::EvidenceAlreadyInvalid` when the sample was already
    ///   rolled back
    pub fn invalidate(&self, id: &EvidenceId) -> CoreResult<InvalidationOutcome> {
        let evidence = self.store.invalidate_evidence(id)?;
        match self
            .store
            .rollback_rating(&evidence.relation, evidence.rating, evidence.weight)
        {
            Ok(updated) => Ok(InvalidationOutcome::RolledBack(updated)),
            Err(CoreError::RatingUnderflow { .. }) => {
                info!(relation = %evidence.relation, "relation orphaned by invalidation");
                Ok(InvalidationOutcome::RelationOrphaned {
                    relation: evidence.relation,
                })
            }
            Err(other) => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryGraphStore;
    use uuid::Uuid;

    fn relation() -> ContentHash {
        ContentHash::of_bytes(b"edge")
    }

    #[test]
    fn test_first_record_sets_initial() {
        let store = MemoryGraphStore::new();
        let engine = RatingEngine::new(&store);

        engine.record(&relation(), Uuid::new_v4(), 1000.0, 1.0).unwrap();
        let aggregate = store.rating(&relation()).unwrap().unwrap();
        assert_eq!(aggregate.rating, 1000.0);
        assert_eq!(aggregate.observations, 1.0);
    }

    #[test]
    fn test_record_then_invalidate_restores_aggregate() {
        let store = MemoryGraphStore::new();
        let engine = RatingEngine::new(&store);
        let content = Uuid::new_v4();

        engine.record(&relation(), content, 1000.0, 1.0).unwrap();
        let second = engine.record(&relation(), content, 1200.0, 1.0).unwrap();
        assert_eq!(store.rating(&relation()).unwrap().unwrap().rating, 1100.0);

        match engine.invalidate(&second.id).unwrap() {
            InvalidationOutcome::RolledBack(aggregate) => {
                assert!((aggregate.rating - 1000.0).abs() < 1e-9);
                assert_eq!(aggregate.observations, 1.0);
            }
            other => panic!("expected rollback, got {other:?}"),
        }
    }

    #[test]
    fn test_last_evidence_orphans_relation() {
        let store = MemoryGraphStore::new();
        let engine = RatingEngine::new(&store);

        let only = engine
            .record(&relation(), Uuid::new_v4(), 1000.0, 1.0)
            .unwrap();
        match engine.invalidate(&only.id).unwrap() {
            InvalidationOutcome::RelationOrphaned { relation: hash } => {
                assert_eq!(hash, relation());
            }
            other => panic!("expected orphan, got {other:?}"),
        }
    }

    #[test]
    fn test_double_invalidation_rejected() {
        let store = MemoryGraphStore::new();
        let engine = RatingEngine::new(&store);
        let content = Uuid::new_v4();

        engine.record(&relation(), content, 1000.0, 1.0).unwrap();
        let ev = engine.record(&relation(), content, 1200.0, 1.0).unwrap();
        engine.invalidate(&ev.id).unwrap();
        assert!(matches!(
            engine.invalidate(&ev.id),
            Err(CoreError::EvidenceAlreadyInvalid { .. })
        ));
    }

    #[test]
    fn test_unknown_evidence_is_a_typed_miss() {
        let store = MemoryGraphStore::new();
        let engine = RatingEngine::new(&store);
        assert!(matches!(
            engine.invalidate(&Uuid::new_v4()),
            Err(CoreError::EvidenceNotFound { .. })
        ));
    }
}
