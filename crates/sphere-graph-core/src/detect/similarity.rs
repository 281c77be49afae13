//! Similarity-graph detection over a dense embedding source.
//!
//! Builds an approximate k-nearest-neighbor graph with `hnsw_rs` (cosine
//! distance) and turns each retained neighbor edge into a candidate
//! relation. The initial rating rewards proximity:
//! `rating = base + base * (1 - normalized_distance)`, clamped to the
//! configured range, where distances are normalized against the largest
//! distance in the neighbor set.

use hnsw_rs::prelude::*;
use tracing::debug;

use super::RelationCandidate;
use crate::error::{CoreError, CoreResult};
use crate::types::ContentHash;

/// Approximate k-NN relation detector.
#[derive(Debug, Clone, Copy)]
pub struct SimilarityDetector {
    /// Neighbors retained per element.
    k: usize,
    /// HNSW search beam width.
    ef_search: usize,
    /// Base rating; proximity adds up to one more base on top.
    base_rating: f64,
    /// Lower clamp for candidate ratings.
    rating_floor: f64,
    /// Upper clamp for candidate ratings.
    rating_ceiling: f64,
}

/// HNSW construction parameters; rule-of-thumb values for corpora up to a
/// few million vectors.
const HNSW_MAX_CONNECTIONS: usize = 16;
const HNSW_MAX_LAYER: usize = 16;
const HNSW_EF_CONSTRUCTION: usize = 200;

impl SimilarityDetector {
    /// Create a detector.
    ///
    /// # Errors
    ///
    /// `CoreError::Config` for a zero `k` or an inverted rating range.
    pub fn new(
        k: usize,
        ef_search: usize,
        base_rating: f64,
        rating_floor: f64,
        rating_ceiling: f64,
    ) -> CoreResult<Self> {
        if k == 0 {
            return Err(CoreError::Config("detector.k must be positive".into()));
        }
        if rating_floor > rating_ceiling {
            return Err(CoreError::Config(format!(
                "detector rating range is inverted: [{rating_floor}, {rating_ceiling}]"
            )));
        }
        Ok(Self {
            k,
            ef_search: ef_search.max(k),
            base_rating,
            rating_floor,
            rating_ceiling,
        })
    }

    /// Build the k-NN graph and propose one candidate per neighbor edge.
    ///
    /// # Errors
    ///
    /// `CoreError::DimensionMismatch` when the vectors disagree on
    /// dimension.
    pub fn detect(
        &self,
        embeddings: &[(ContentHash, Vec<f32>)],
    ) -> CoreResult<Vec<RelationCandidate>> {
        if embeddings.len() < 2 {
            return Ok(Vec::new());
        }
        let dimension = embeddings[0].1.len();
        for (_, vector) in embeddings {
            if vector.len() != dimension {
                return Err(CoreError::DimensionMismatch {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
        }

        let hnsw = Hnsw::<f32, DistCosine>::new(
            HNSW_MAX_CONNECTIONS,
            embeddings.len(),
            HNSW_MAX_LAYER,
            HNSW_EF_CONSTRUCTION,
            DistCosine {},
        );
        for (data_id, (_, vector)) in embeddings.iter().enumerate() {
            hnsw.insert_slice((vector.as_slice(), data_id));
        }
        debug!(
            elements = embeddings.len(),
            dimension, k = self.k, "similarity graph built"
        );

        let mut candidates = Vec::new();
        for (data_id, (source, vector)) in embeddings.iter().enumerate() {
            // Ask for one extra neighbor: the element itself comes back.
            let neighbours = hnsw.search(vector.as_slice(), self.k + 1, self.ef_search);
            let retained: Vec<&Neighbour> = neighbours
                .iter()
                .filter(|n| n.d_id != data_id)
                .take(self.k)
                .collect();
            let max_distance = retained
                .iter()
                .map(|n| f64::from(n.distance))
                .fold(0.0_f64, f64::max);

            for neighbour in retained {
                let normalized = if max_distance > 0.0 {
                    f64::from(neighbour.distance) / max_distance
                } else {
                    0.0
                };
                let rating = (self.base_rating + self.base_rating * (1.0 - normalized))
                    .clamp(self.rating_floor, self.rating_ceiling);
                candidates.push(RelationCandidate {
                    members: vec![*source, embeddings[neighbour.d_id].0],
                    initial_rating: rating,
                });
            }
        }
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector(k: usize) -> SimilarityDetector {
        SimilarityDetector::new(k, 64, 1000.0, 0.0, 2000.0).unwrap()
    }

    fn source(label: &[u8], vector: Vec<f32>) -> (ContentHash, Vec<f32>) {
        (ContentHash::of_bytes(label), vector)
    }

    #[test]
    fn test_config_validation() {
        assert!(SimilarityDetector::new(0, 64, 1000.0, 0.0, 2000.0).is_err());
        assert!(SimilarityDetector::new(5, 64, 1000.0, 2000.0, 0.0).is_err());
    }

    #[test]
    fn test_tiny_source_yields_nothing() {
        let embeddings = vec![source(b"solo", vec![1.0, 0.0])];
        assert!(detector(3).detect(&embeddings).unwrap().is_empty());
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let embeddings = vec![
            source(b"a", vec![1.0, 0.0, 0.0]),
            source(b"b", vec![1.0, 0.0]),
        ];
        assert!(matches!(
            detector(3).detect(&embeddings),
            Err(CoreError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_near_neighbors_rate_higher_than_far() {
        // Two tight pairs far apart: each element's nearest neighbor is
        // its partner, its second neighbor crosses the gap.
        let embeddings = vec![
            source(b"a1", vec![1.0, 0.0, 0.01]),
            source(b"a2", vec![1.0, 0.0, 0.02]),
            source(b"b1", vec![0.0, 1.0, 0.01]),
            source(b"b2", vec![0.0, 1.0, 0.02]),
        ];
        let candidates = detector(2).detect(&embeddings).unwrap();
        assert!(!candidates.is_empty());

        for candidate in &candidates {
            assert!(candidate.members.len() == 2);
            assert!(
                (0.0..=2000.0).contains(&candidate.initial_rating),
                "rating {} escaped the clamp",
                candidate.initial_rating
            );
        }

        // The partner edge (same cluster) must outrate the crossing edge.
        let a1 = embeddings[0].0;
        let a2 = embeddings[1].0;
        let b1 = embeddings[2].0;
        let partner = candidates
            .iter()
            .find(|c| c.members == vec![a1, a2])
            .expect("partner edge retained");
        let crossing = candidates
            .iter()
            .find(|c| c.members == vec![a1, b1])
            .expect("crossing edge retained");
        assert!(partner.initial_rating > crossing.initial_rating);
    }
}
