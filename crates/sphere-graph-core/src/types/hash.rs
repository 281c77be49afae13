//! Content addressing.
//!
//! Every composition and relation is identified by a SHA-256 digest of the
//! canonical byte encoding of its run-length-compressed child sequence. A
//! domain-separation tag keeps a composition over children `[a, b]` from
//! colliding with a relation over the same children.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::sequence::{ChildRef, SequenceEntry};

/// A 256-bit content hash.
///
/// Cryptographic collision resistance is assumed; an observed collision
/// between distinct sequences is a fatal integrity error, not a merge.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Wrap raw digest bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The raw digest bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Digest of an arbitrary byte stream (used for whole-content
    /// identity and round-trip verification).
    pub fn of_bytes(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }
}

impl fmt::Display for ContentHash {
    /// Short hex form (first 8 bytes); enough to identify rows in logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..8] {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({self})")
    }
}

/// Domain-separation tag for sequence hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceDomain {
    /// Sequence of atoms and/or compositions forming a composition.
    Composition,
    /// Sequence of compositions forming a relation edge.
    Relation,
}

impl SequenceDomain {
    fn tag(&self) -> u8 {
        match self {
            SequenceDomain::Composition => 0x01,
            SequenceDomain::Relation => 0x02,
        }
    }
}

/// Canonical byte encoding of a run-length-compressed sequence.
///
/// Layout: domain tag, then per entry a child tag byte (0 = atom,
/// 1 = composition), the child payload (4-byte LE code point or 32 digest
/// bytes), and the occurrence count as 4-byte LE. Ordinals are implicit in
/// encoding order. The same ordered (child, occurrence) list always
/// produces the same bytes, which is what makes the hash content-defined.
pub fn canonical_bytes(domain: SequenceDomain, entries: &[SequenceEntry]) -> Vec<u8> {
    // Worst case per entry: 1 tag + 32 payload + 4 count.
    let mut out = Vec::with_capacity(1 + entries.len() * 37);
    out.push(domain.tag());
    for entry in entries {
        match entry.child {
            ChildRef::Atom(codepoint) => {
                out.push(0x00);
                out.extend_from_slice(&codepoint.to_le_bytes());
            }
            ChildRef::Composition(hash) => {
                out.push(0x01);
                out.extend_from_slice(hash.as_bytes());
            }
        }
        out.extend_from_slice(&entry.occurrences.to_le_bytes());
    }
    out
}

/// Content hash of a run-length-compressed sequence.
pub fn hash_sequence(domain: SequenceDomain, entries: &[SequenceEntry]) -> ContentHash {
    ContentHash::of_bytes(&canonical_bytes(domain, entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(children: &[(ChildRef, u32)]) -> Vec<SequenceEntry> {
        children
            .iter()
            .enumerate()
            .map(|(ordinal, (child, occurrences))| SequenceEntry {
                ordinal: ordinal as u32,
                child: *child,
                occurrences: *occurrences,
            })
            .collect()
    }

    #[test]
    fn test_same_sequence_same_hash() {
        let seq = entries(&[(ChildRef::Atom(104), 1), (ChildRef::Atom(105), 2)]);
        let a = hash_sequence(SequenceDomain::Composition, &seq);
        let b = hash_sequence(SequenceDomain::Composition, &seq);
        assert_eq!(a, b);
    }

    #[test]
    fn test_order_changes_hash() {
        let ab = entries(&[(ChildRef::Atom(104), 1), (ChildRef::Atom(105), 1)]);
        let ba = entries(&[(ChildRef::Atom(105), 1), (ChildRef::Atom(104), 1)]);
        assert_ne!(
            hash_sequence(SequenceDomain::Composition, &ab),
            hash_sequence(SequenceDomain::Composition, &ba)
        );
    }

    #[test]
    fn test_occurrence_count_changes_hash() {
        let once = entries(&[(ChildRef::Atom(104), 1)]);
        let twice = entries(&[(ChildRef::Atom(104), 2)]);
        assert_ne!(
            hash_sequence(SequenceDomain::Composition, &once),
            hash_sequence(SequenceDomain::Composition, &twice)
        );
    }

    #[test]
    fn test_domain_separation() {
        let comp = ContentHash::of_bytes(b"child");
        let seq = entries(&[(ChildRef::Composition(comp), 1)]);
        assert_ne!(
            hash_sequence(SequenceDomain::Composition, &seq),
            hash_sequence(SequenceDomain::Relation, &seq)
        );
    }

    #[test]
    fn test_display_is_short_hex() {
        let hash = ContentHash::of_bytes(b"hello");
        let display = hash.to_string();
        assert_eq!(display.len(), 16);
        assert!(display.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
