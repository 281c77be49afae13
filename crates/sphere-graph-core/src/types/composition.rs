//! Compositions: content-addressed ordered sequences.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::hash::ContentHash;
use super::physicality::Physicality;
use super::sequence::SequenceEntry;

/// Storage policy for a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageMode {
    /// The full gap-free sequence is stored; byte-exact reconstruction is
    /// required and verified against the content hash.
    Dense,
    /// Only relation-contributing fragments are stored; reconstruction is
    /// not guaranteed.
    Sparse,
}

/// A content-addressed ordered sequence of atoms and/or compositions.
///
/// # Invariant
///
/// Two compositions with identical ordered (child, occurrence) sequences
/// resolve to the same hash and the same stored row: at most one row per
/// distinct sequence. Rows are never mutated after creation except for
/// the reference count, and are deleted only by evidence-driven garbage
/// collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Composition {
    /// Content hash over the run-length-compressed sequence.
    pub hash: ContentHash,
    /// The run-length-compressed child sequence, in ordinal order.
    pub sequence: Vec<SequenceEntry>,
    /// Occurrence-weighted centroid of the children, renormalized to S³.
    pub physicality: Physicality,
    /// Storage policy this row was created under.
    pub mode: StorageMode,
    /// Number of relations and content roots referencing this row.
    ///
    /// Maintained by the storage boundary; a row whose count returns to
    /// zero is eligible for garbage collection.
    pub references: u64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Composition {
    /// Assemble a new row with zero references.
    pub fn new(
        hash: ContentHash,
        sequence: Vec<SequenceEntry>,
        physicality: Physicality,
        mode: StorageMode,
    ) -> Self {
        Self {
            hash,
            sequence,
            physicality,
            mode,
            references: 0,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::sequence::ChildRef;

    #[test]
    fn test_new_row_starts_unreferenced() {
        let seq = vec![SequenceEntry {
            ordinal: 0,
            child: ChildRef::Atom(104),
            occurrences: 1,
        }];
        let hash = crate::types::hash::hash_sequence(
            crate::types::hash::SequenceDomain::Composition,
            &seq,
        );
        let comp = Composition::new(
            hash,
            seq,
            Physicality::new([1.0, 0.0, 0.0, 0.0], 0),
            StorageMode::Dense,
        );
        assert_eq!(comp.references, 0);
        assert_eq!(comp.mode, StorageMode::Dense);
    }
}
