//! The storage boundary.
//!
//! [`GraphStore`] is the durable-storage contract for every table except
//! the atom table (which is process-wide and read-only). The trait is
//! sync, object-safe, and `Send + Sync`; implementors guarantee the two
//! concurrency-critical contracts at their boundary:
//!
//! - **create-or-append**: `create_composition`/`create_relation` are
//!   atomic insert-if-absent. A losing writer in a create race receives
//!   the winning row and degrades to an evidence append - no duplicate
//!   rows, no lost evidence.
//! - **rating RMW**: `apply_rating`/`rollback_rating` serialize the
//!   read-modify-write per relation, so concurrent evidence arrivals never
//!   lose updates.

pub mod memory;

use crate::error::CoreResult;
use crate::types::{
    Composition, Content, ContentHash, ContentId, EvidenceId, Relation, RelationEvidence,
    RelationRating,
};

pub use memory::MemoryGraphStore;

/// Outcome of an atomic insert-if-absent.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome<T> {
    /// This writer created the row.
    Created,
    /// Another (possibly concurrent) writer already holds the row.
    Existing(T),
}

impl<T> InsertOutcome<T> {
    /// Whether this writer created the row.
    pub fn is_created(&self) -> bool {
        matches!(self, InsertOutcome::Created)
    }
}

/// Durable storage contract for the graph tables.
///
/// Gets return `Option` (a typed miss); removals of missing rows are
/// errors because they indicate a bookkeeping bug in the caller.
pub trait GraphStore: Send + Sync {
    // === Compositions ===

    /// Fetch a composition row.
    fn composition(&self, hash: &ContentHash) -> CoreResult<Option<Composition>>;

    /// Atomically insert a composition unless the hash is already present.
    fn create_composition(&self, row: Composition) -> CoreResult<InsertOutcome<Composition>>;

    /// Remove a composition row (garbage collection only).
    ///
    /// # Errors
    ///
    /// `CoreError::CompositionNotFound` when the row does not exist.
    fn remove_composition(&self, hash: &ContentHash) -> CoreResult<()>;

    /// Atomically adjust a composition's reference count, returning the
    /// new count.
    ///
    /// # Errors
    ///
    /// `CoreError::CompositionNotFound` when the row does not exist.
    fn adjust_composition_refs(&self, hash: &ContentHash, delta: i64) -> CoreResult<u64>;

    // === Relations ===

    /// Fetch a relation row.
    fn relation(&self, hash: &ContentHash) -> CoreResult<Option<Relation>>;

    /// Atomically insert a relation unless the hash is already present.
    fn create_relation(&self, row: Relation) -> CoreResult<InsertOutcome<Relation>>;

    /// Remove a relation row (invalidation cascade only).
    ///
    /// # Errors
    ///
    /// `CoreError::RelationNotFound` when the row does not exist.
    fn remove_relation(&self, hash: &ContentHash) -> CoreResult<()>;

    // === Ratings ===

    /// Fetch a relation's rating aggregate.
    fn rating(&self, relation: &ContentHash) -> CoreResult<Option<RelationRating>>;

    /// Atomically absorb one evidence sample into the relation's
    /// aggregate, creating the aggregate if absent. Returns the updated
    /// aggregate.
    fn apply_rating(
        &self,
        relation: &ContentHash,
        rating: f64,
        weight: f64,
    ) -> CoreResult<RelationRating>;

    /// Atomically roll back one previously absorbed sample.
    ///
    /// # Errors
    ///
    /// - `CoreError::RelationNotFound` when no aggregate exists
    /// - `CoreError::RatingUnderflow` when the rollback would empty the
    ///   aggregate; the stored value is left unchanged
    fn rollback_rating(
        &self,
        relation: &ContentHash,
        rating: f64,
        weight: f64,
    ) -> CoreResult<RelationRating>;

    /// Drop a relation's rating aggregate (cascade only).
    fn remove_rating(&self, relation: &ContentHash) -> CoreResult<()>;

    // === Evidence ===

    /// Append one evidence row.
    fn append_evidence(&self, row: RelationEvidence) -> CoreResult<()>;

    /// Fetch one evidence row.
    fn evidence(&self, id: &EvidenceId) -> CoreResult<Option<RelationEvidence>>;

    /// Mark an evidence row invalid, returning the updated row.
    ///
    /// # Errors
    ///
    /// - `CoreError::EvidenceNotFound` when the row does not exist
    /// - `CoreError::EvidenceAlreadyInvalid` when it was already rolled back
    fn invalidate_evidence(&self, id: &EvidenceId) -> CoreResult<RelationEvidence>;

    /// All evidence contributed by one content row.
    fn evidence_for_content(&self, content: &ContentId) -> CoreResult<Vec<RelationEvidence>>;

    /// All evidence supporting one relation.
    fn evidence_for_relation(&self, relation: &ContentHash) -> CoreResult<Vec<RelationEvidence>>;

    // === Contents ===

    /// Fetch a content row.
    fn content(&self, id: &ContentId) -> CoreResult<Option<Content>>;

    /// Insert a content row.
    ///
    /// # Errors
    ///
    /// `CoreError::DuplicateContent` when the id was already ingested.
    fn put_content(&self, row: Content) -> CoreResult<()>;

    /// Remove a content row.
    ///
    /// # Errors
    ///
    /// `CoreError::ContentNotFound` when the row does not exist.
    fn remove_content(&self, id: &ContentId) -> CoreResult<()>;
}
