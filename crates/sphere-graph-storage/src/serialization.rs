//! Binary serialization and key encodings.
//!
//! Values are `bincode`; keys are raw fixed-width bytes chosen so
//! lexicographic order matches the order scans want: big-endian code
//! points, raw 32-byte hashes, raw 16-byte UUIDs, and big-endian 128-bit
//! spatial keys (numeric order = byte order = curve order).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use chrono::{DateTime, Utc};
use sphere_graph_core::types::{
    Composition, ContentHash, EntityId, EvidenceId, Physicality, Relation, SequenceEntry,
    StorageMode,
};

use crate::rocksdb_backend::StorageError;

/// Composition row minus its sequence; the sequence lives in its own
/// column family so header probes (dedup, refcounts) stay small.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct CompositionHeader {
    pub physicality: Physicality,
    pub mode: StorageMode,
    pub references: u64,
    pub created_at: DateTime<Utc>,
}

impl CompositionHeader {
    pub(crate) fn split(row: Composition) -> (Self, Vec<SequenceEntry>) {
        (
            Self {
                physicality: row.physicality,
                mode: row.mode,
                references: row.references,
                created_at: row.created_at,
            },
            row.sequence,
        )
    }

    pub(crate) fn join(self, hash: ContentHash, sequence: Vec<SequenceEntry>) -> Composition {
        Composition {
            hash,
            sequence,
            physicality: self.physicality,
            mode: self.mode,
            references: self.references,
            created_at: self.created_at,
        }
    }
}

/// Relation row minus its sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct RelationHeader {
    pub physicality: Physicality,
    pub created_at: DateTime<Utc>,
}

impl RelationHeader {
    pub(crate) fn split(row: Relation) -> (Self, Vec<SequenceEntry>) {
        (
            Self {
                physicality: row.physicality,
                created_at: row.created_at,
            },
            row.sequence,
        )
    }

    pub(crate) fn join(self, hash: ContentHash, sequence: Vec<SequenceEntry>) -> Relation {
        Relation {
            hash,
            sequence,
            physicality: self.physicality,
            created_at: self.created_at,
        }
    }
}

/// Serialize a value with bincode.
pub(crate) fn to_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, StorageError> {
    bincode::serialize(value).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Deserialize a value with bincode.
pub(crate) fn from_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StorageError> {
    bincode::deserialize(bytes).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Big-endian code-point key.
pub(crate) fn codepoint_key(codepoint: u32) -> [u8; 4] {
    codepoint.to_be_bytes()
}

/// Composite key `[content uuid][evidence uuid]` for the content index.
pub(crate) fn content_evidence_key(content: &uuid::Uuid, evidence: &EvidenceId) -> [u8; 32] {
    let mut key = [0u8; 32];
    key[..16].copy_from_slice(content.as_bytes());
    key[16..].copy_from_slice(evidence.as_bytes());
    key
}

/// Composite key `[relation hash][evidence uuid]` for the relation index.
pub(crate) fn relation_evidence_key(relation: &ContentHash, evidence: &EvidenceId) -> [u8; 48] {
    let mut key = [0u8; 48];
    key[..32].copy_from_slice(relation.as_bytes());
    key[32..].copy_from_slice(evidence.as_bytes());
    key
}

/// Entity id encoding used inside spatial mirror keys: a tag byte plus
/// the natural id bytes.
fn entity_bytes(entity: &EntityId) -> Vec<u8> {
    match entity {
        EntityId::Atom(codepoint) => {
            let mut out = vec![0x00];
            out.extend_from_slice(&codepoint.to_be_bytes());
            out
        }
        EntityId::Composition(hash) => {
            let mut out = vec![0x01];
            out.extend_from_slice(hash.as_bytes());
            out
        }
        EntityId::Relation(hash) => {
            let mut out = vec![0x02];
            out.extend_from_slice(hash.as_bytes());
            out
        }
    }
}

/// Spatial mirror key: big-endian spatial key, then the entity id so
/// co-located entities stay distinct rows.
pub(crate) fn spatial_row_key(spatial_key: u128, entity: &EntityId) -> Vec<u8> {
    let mut key = Vec::with_capacity(16 + 33);
    key.extend_from_slice(&spatial_key.to_be_bytes());
    key.extend_from_slice(&entity_bytes(entity));
    key
}

/// Decode the entity id out of a spatial mirror key.
pub(crate) fn entity_from_spatial_row(key: &[u8]) -> Result<EntityId, StorageError> {
    let body = key
        .get(16..)
        .ok_or_else(|| StorageError::Corrupt("spatial row key too short".into()))?;
    match body.first() {
        Some(0x00) => {
            let bytes: [u8; 4] = body
                .get(1..5)
                .and_then(|b| b.try_into().ok())
                .ok_or_else(|| StorageError::Corrupt("truncated atom entity key".into()))?;
            Ok(EntityId::Atom(u32::from_be_bytes(bytes)))
        }
        Some(tag @ (0x01 | 0x02)) => {
            let bytes: [u8; 32] = body
                .get(1..33)
                .and_then(|b| b.try_into().ok())
                .ok_or_else(|| StorageError::Corrupt("truncated hash entity key".into()))?;
            let hash = ContentHash::from_bytes(bytes);
            Ok(if *tag == 0x01 {
                EntityId::Composition(hash)
            } else {
                EntityId::Relation(hash)
            })
        }
        _ => Err(StorageError::Corrupt("unknown entity tag".into())),
    }
}
