//! Append-only evidence provenance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::hash::ContentHash;

/// Evidence row identifier (UUID v4).
pub type EvidenceId = Uuid;

/// Content/ingestion-event identifier, supplied by the caller.
pub type ContentId = Uuid;

/// One provenance record justifying a relation's rating contribution.
///
/// Rows are append-only: invalidation flips the validity flag and stamps
/// the time, it never deletes the row. A relation's effective rating is
/// the aggregate over its *valid* evidence only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationEvidence {
    /// Unique id of this evidence row.
    pub id: EvidenceId,
    /// The relation this evidence supports.
    pub relation: ContentHash,
    /// The ingestion event that produced it.
    pub content: ContentId,
    /// Rating value this sample contributed.
    pub rating: f64,
    /// Per-evidence signal strength (weight in the running mean).
    pub weight: f64,
    /// Whether the sample still counts toward the aggregate.
    pub valid: bool,
    /// When the sample was recorded.
    pub created_at: DateTime<Utc>,
    /// When the sample was invalidated, if ever.
    #[serde(default)]
    pub invalidated_at: Option<DateTime<Utc>>,
}

impl RelationEvidence {
    /// Record a fresh, valid sample.
    pub fn new(relation: ContentHash, content: ContentId, rating: f64, weight: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            relation,
            content,
            rating,
            weight,
            valid: true,
            created_at: Utc::now(),
            invalidated_at: None,
        }
    }

    /// Flip the validity flag for surgical deletion.
    pub fn invalidate(&mut self) {
        self.valid = false;
        self.invalidated_at = Some(Utc::now());
    }
}
