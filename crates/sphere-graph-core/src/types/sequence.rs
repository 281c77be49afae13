//! Run-length-compressed child sequences.
//!
//! A composition or relation sequence is an ordered list of entries, each
//! referencing a child and a repeat count. Consecutive repeats of the same
//! child collapse into one entry; ordinal order plus occurrence counts
//! reconstruct the original child stream exactly, which is what Dense-mode
//! reconstruction relies on.

use serde::{Deserialize, Serialize};

use super::hash::ContentHash;

/// A child reference: either an atom (by code point) or another
/// composition (by content hash).
///
/// A tagged variant rather than a type hierarchy; acyclicity holds by
/// construction because a composition can only reference compositions
/// hashed before it existed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChildRef {
    /// An atom, referenced by its Unicode code point.
    Atom(u32),
    /// A composition, referenced by its content hash.
    Composition(ContentHash),
}

/// One entry of a run-length-compressed sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceEntry {
    /// Zero-based position among the entries (not among expanded children).
    pub ordinal: u32,
    /// The repeated child.
    pub child: ChildRef,
    /// Repeat length.
    ///
    /// `Constraint: occurrences >= 1`
    pub occurrences: u32,
}

/// Collapse consecutive repeats into run-length entries.
pub fn run_length_encode<I>(children: I) -> Vec<SequenceEntry>
where
    I: IntoIterator<Item = ChildRef>,
{
    let mut entries: Vec<SequenceEntry> = Vec::new();
    for child in children {
        match entries.last_mut() {
            Some(last) if last.child == child => last.occurrences += 1,
            _ => entries.push(SequenceEntry {
                ordinal: entries.len() as u32,
                child,
                occurrences: 1,
            }),
        }
    }
    entries
}

/// Replay entries in ordinal order, expanding each repeat.
pub fn run_length_expand(entries: &[SequenceEntry]) -> Vec<ChildRef> {
    let total: usize = entries.iter().map(|e| e.occurrences as usize).sum();
    let mut out = Vec::with_capacity(total);
    for entry in entries {
        for _ in 0..entry.occurrences {
            out.push(entry.child);
        }
    }
    out
}

/// Total expanded length of a sequence.
pub fn expanded_len(entries: &[SequenceEntry]) -> usize {
    entries.iter().map(|e| e.occurrences as usize).sum()
}
