//! In-memory reference implementation of [`GraphStore`].
//!
//! Backed by `dashmap`: entry-level locking gives exactly the two
//! boundary guarantees the trait demands - `entry()` makes
//! insert-if-absent atomic, and holding the entry guard across the
//! read-modify-write serializes rating updates per relation.
//!
//! Used directly in tests and development; the RocksDB backend provides
//! the durable counterpart with the same contract.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::{GraphStore, InsertOutcome};
use crate::error::{CoreError, CoreResult};
use crate::types::{
    Composition, Content, ContentHash, ContentId, EvidenceId, Relation, RelationEvidence,
    RelationRating,
};

/// Concurrent in-memory graph store.
#[derive(Debug, Default)]
pub struct MemoryGraphStore {
    compositions: DashMap<ContentHash, Composition>,
    relations: DashMap<ContentHash, Relation>,
    ratings: DashMap<ContentHash, RelationRating>,
    evidence: DashMap<EvidenceId, RelationEvidence>,
    evidence_by_content: DashMap<ContentId, Vec<EvidenceId>>,
    evidence_by_relation: DashMap<ContentHash, Vec<EvidenceId>>,
    contents: DashMap<ContentId, Content>,
}

impl MemoryGraphStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored compositions.
    pub fn composition_count(&self) -> usize {
        self.compositions.len()
    }

    /// Number of stored relations.
    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }
}

impl GraphStore for MemoryGraphStore {
    fn composition(&self, hash: &ContentHash) -> CoreResult<Option<Composition>> {
        Ok(self.compositions.get(hash).map(|r| r.clone()))
    }

    fn create_composition(&self, row: Composition) -> CoreResult<InsertOutcome<Composition>> {
        match self.compositions.entry(row.hash) {
            Entry::Occupied(existing) => Ok(InsertOutcome::Existing(existing.get().clone())),
            Entry::Vacant(slot) => {
                slot.insert(row);
                Ok(InsertOutcome::Created)
            }
        }
    }

    fn remove_composition(&self, hash: &ContentHash) -> CoreResult<()> {
        self.compositions
            .remove(hash)
            .map(|_| ())
            .ok_or(CoreError::CompositionNotFound { hash: *hash })
    }

    fn adjust_composition_refs(&self, hash: &ContentHash, delta: i64) -> CoreResult<u64> {
        let mut row = self
            .compositions
            .get_mut(hash)
            .ok_or(CoreError::CompositionNotFound { hash: *hash })?;
        row.references = row.references.saturating_add_signed(delta);
        Ok(row.references)
    }

    fn relation(&self, hash: &ContentHash) -> CoreResult<Option<Relation>> {
        Ok(self.relations.get(hash).map(|r| r.clone()))
    }

    fn create_relation(&self, row: Relation) -> CoreResult<InsertOutcome<Relation>> {
        match self.relations.entry(row.hash) {
            Entry::Occupied(existing) => Ok(InsertOutcome::Existing(existing.get().clone())),
            Entry::Vacant(slot) => {
                slot.insert(row);
                Ok(InsertOutcome::Created)
            }
        }
    }

    fn remove_relation(&self, hash: &ContentHash) -> CoreResult<()> {
        self.relations
            .remove(hash)
            .map(|_| ())
            .ok_or(CoreError::RelationNotFound { hash: *hash })
    }

    fn rating(&self, relation: &ContentHash) -> CoreResult<Option<RelationRating>> {
        Ok(self.ratings.get(relation).map(|r| r.clone()))
    }

    fn apply_rating(
        &self,
        relation: &ContentHash,
        rating: f64,
        weight: f64,
    ) -> CoreResult<RelationRating> {
        // The entry guard serializes the read-modify-write per relation.
        let mut aggregate = self
            .ratings
            .entry(*relation)
            .or_insert_with(|| RelationRating::unrated(*relation));
        aggregate.absorb(rating, weight);
        Ok(aggregate.clone())
    }

    fn rollback_rating(
        &self,
        relation: &ContentHash,
        rating: f64,
        weight: f64,
    ) -> CoreResult<RelationRating> {
        let mut aggregate = self
            .ratings
            .get_mut(relation)
            .ok_or(CoreError::RelationNotFound { hash: *relation })?;
        aggregate.release(rating, weight)?;
        Ok(aggregate.clone())
    }

    fn remove_rating(&self, relation: &ContentHash) -> CoreResult<()> {
        self.ratings
            .remove(relation)
            .map(|_| ())
            .ok_or(CoreError::RelationNotFound { hash: *relation })
    }

    fn append_evidence(&self, row: RelationEvidence) -> CoreResult<()> {
        self.evidence_by_content
            .entry(row.content)
            .or_default()
            .push(row.id);
        self.evidence_by_relation
            .entry(row.relation)
            .or_default()
            .push(row.id);
        self.evidence.insert(row.id, row);
        Ok(())
    }

    fn evidence(&self, id: &EvidenceId) -> CoreResult<Option<RelationEvidence>> {
        Ok(self.evidence.get(id).map(|r| r.clone()))
    }

    fn invalidate_evidence(&self, id: &EvidenceId) -> CoreResult<RelationEvidence> {
        let mut row = self
            .evidence
            .get_mut(id)
            .ok_or(CoreError::EvidenceNotFound { id: *id })?;
        if !row.valid {
            return Err(CoreError::EvidenceAlreadyInvalid { id: *id });
        }
        row.invalidate();
        Ok(row.clone())
    }

    fn evidence_for_content(&self, content: &ContentId) -> CoreResult<Vec<RelationEvidence>> {
        let ids = self
            .evidence_by_content
            .get(content)
            .map(|v| v.clone())
            .unwrap_or_default();
        Ok(ids
            .iter()
            .filter_map(|id| self.evidence.get(id).map(|r| r.clone()))
            .collect())
    }

    fn evidence_for_relation(&self, relation: &ContentHash) -> CoreResult<Vec<RelationEvidence>> {
        let ids = self
            .evidence_by_relation
            .get(relation)
            .map(|v| v.clone())
            .unwrap_or_default();
        Ok(ids
            .iter()
            .filter_map(|id| self.evidence.get(id).map(|r| r.clone()))
            .collect())
    }

    fn content(&self, id: &ContentId) -> CoreResult<Option<Content>> {
        Ok(self.contents.get(id).map(|r| r.clone()))
    }

    fn put_content(&self, row: Content) -> CoreResult<()> {
        match self.contents.entry(row.id) {
            Entry::Occupied(_) => Err(CoreError::DuplicateContent { id: row.id }),
            Entry::Vacant(slot) => {
                slot.insert(row);
                Ok(())
            }
        }
    }

    fn remove_content(&self, id: &ContentId) -> CoreResult<()> {
        self.contents
            .remove(id)
            .map(|_| ())
            .ok_or(CoreError::ContentNotFound { id: *id })
    }
}
