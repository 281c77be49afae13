//! Relations: content-addressed edges over composition sequences.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::hash::ContentHash;
use super::physicality::Physicality;
use super::sequence::{ChildRef, SequenceEntry};

/// A content-addressed edge over an ordered sequence of compositions.
///
/// Created the first time a composition sequence is observed; every later
/// observation contributes evidence to the same row, never a duplicate.
/// The competence rating lives in
/// [`RelationRating`](super::rating::RelationRating), not here, so the
/// relation row itself stays immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    /// Content hash over the run-length-compressed sequence
    /// (relation domain tag).
    pub hash: ContentHash,
    /// Run-length-compressed sequence; every child is a composition.
    pub sequence: Vec<SequenceEntry>,
    /// Centroid of the constituent composition positions.
    pub physicality: Physicality,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Relation {
    /// Assemble a relation row.
    pub fn new(hash: ContentHash, sequence: Vec<SequenceEntry>, physicality: Physicality) -> Self {
        Self {
            hash,
            sequence,
            physicality,
            created_at: Utc::now(),
        }
    }

    /// Distinct composition hashes this relation references.
    pub fn member_hashes(&self) -> Vec<ContentHash> {
        let mut out = Vec::with_capacity(self.sequence.len());
        for entry in &self.sequence {
            if let ChildRef::Composition(hash) = entry.child {
                if !out.contains(&hash) {
                    out.push(hash);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_hashes_deduplicates() {
        let a = ContentHash::of_bytes(b"a");
        let b = ContentHash::of_bytes(b"b");
        let seq = vec![
            SequenceEntry {
                ordinal: 0,
                child: ChildRef::Composition(a),
                occurrences: 2,
            },
            SequenceEntry {
                ordinal: 1,
                child: ChildRef::Composition(b),
                occurrences: 1,
            },
            SequenceEntry {
                ordinal: 2,
                child: ChildRef::Composition(a),
                occurrences: 1,
            },
        ];
        let hash =
            crate::types::hash::hash_sequence(crate::types::hash::SequenceDomain::Relation, &seq);
        let relation = Relation::new(hash, seq, Physicality::new([1.0, 0.0, 0.0, 0.0], 0));
        assert_eq!(relation.member_hashes(), vec![a, b]);
    }
}
