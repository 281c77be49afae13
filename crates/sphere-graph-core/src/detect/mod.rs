//! Relation detection.
//!
//! Two modes propose candidate relation sequences: windowed co-occurrence
//! over adjacent compositions, and an approximate k-NN graph over a dense
//! embedding source. Both hand their candidates to the content graph
//! builder for dedup exactly as composition sequences are handled.

pub mod cooccurrence;
pub mod similarity;

pub use cooccurrence::CooccurrenceDetector;
pub use similarity::SimilarityDetector;

use crate::types::ContentHash;

/// A proposed relation: an ordered member sequence plus the initial
/// rating the first evidence sample will carry.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationCandidate {
    /// Ordered member compositions of the candidate edge.
    pub members: Vec<ContentHash>,
    /// Initial rating for the first observation.
    pub initial_rating: f64,
}
