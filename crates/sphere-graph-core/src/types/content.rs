//! Content rows: one per ingestion event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::composition::StorageMode;
use super::evidence::ContentId;
use super::hash::ContentHash;
use super::sequence::SequenceEntry;

/// One ingestion event.
///
/// The row owns the provenance needed to delete everything the event
/// contributed (through its evidence trail) without touching unrelated
/// data. For Dense content it also owns the root sequence - the full
/// run-length stream of token compositions and separator atoms - which is
/// what byte-exact reconstruction replays. Root sequences are per-content
/// and are not content-deduplicated across rows; the content hash
/// identifies the stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// Caller-supplied identity (tenant/user/source scoped).
    pub id: ContentId,
    /// Hash of the original byte stream, used for round-trip verification.
    pub hash: ContentHash,
    /// Size of the original stream in bytes.
    pub byte_len: u64,
    /// MIME type and encoding metadata supplied by the front-end.
    pub media_type: String,
    /// Storage policy for this event.
    pub mode: StorageMode,
    /// Dense root sequence; `None` for Sparse content.
    #[serde(default)]
    pub root_sequence: Option<Vec<SequenceEntry>>,
    /// Ingestion timestamp.
    pub created_at: DateTime<Utc>,
}

impl Content {
    /// Whether this row can be replayed byte-exactly.
    pub fn is_reconstructible(&self) -> bool {
        self.mode == StorageMode::Dense && self.root_sequence.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_sparse_content_is_not_reconstructible() {
        let content = Content {
            id: Uuid::new_v4(),
            hash: ContentHash::of_bytes(b"x"),
            byte_len: 1,
            media_type: "text/plain".into(),
            mode: StorageMode::Sparse,
            root_sequence: None,
            created_at: Utc::now(),
        };
        assert!(!content.is_reconstructible());
    }
}
