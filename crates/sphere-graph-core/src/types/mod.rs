//! Domain types of the sphere graph.

pub mod atom;
pub mod composition;
pub mod content;
pub mod entity;
pub mod evidence;
pub mod hash;
pub mod physicality;
pub mod rating;
pub mod relation;
pub mod sequence;

pub use atom::{validate_scalar, Atom};
pub use composition::{Composition, StorageMode};
pub use content::Content;
pub use entity::EntityId;
pub use evidence::{ContentId, EvidenceId, RelationEvidence};
pub use hash::{canonical_bytes, hash_sequence, ContentHash, SequenceDomain};
pub use physicality::{Physicality, UNIT_NORM_TOLERANCE};
pub use rating::{RatingState, RelationRating};
pub use relation::Relation;
pub use sequence::{expanded_len, run_length_encode, run_length_expand, ChildRef, SequenceEntry};
