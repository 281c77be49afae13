//! Relation competence ratings.
//!
//! Each relation carries one `(rating, observations)` aggregate updated as
//! an observation-weighted running mean. The running mean is commutative
//! under arrival order and needs no stored history; surgical deletion of
//! one sample is the exact algebraic inverse.

use serde::{Deserialize, Serialize};

use super::hash::ContentHash;
use crate::error::{CoreError, CoreResult};

/// Lifecycle of a relation's rating.
///
/// `Unrated -> Rated -> (Invalidated || Rated)`: a relation starts unrated,
/// becomes rated on first evidence, and returns to the invalidated
/// (evidence-free) state only when every sample has been rolled back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RatingState {
    /// No evidence has been absorbed yet.
    Unrated,
    /// At least one valid evidence sample backs the rating.
    Rated,
}

/// The evidence-weighted competence aggregate for one relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationRating {
    /// The rated relation.
    pub relation: ContentHash,
    /// Current running mean over valid evidence.
    pub rating: f64,
    /// Total absorbed evidence weight.
    pub observations: f64,
    /// Multiplier applied to incoming evidence weight. 1.0 leaves the
    /// closed-form running mean untouched.
    pub damping: f64,
}

impl RelationRating {
    /// An unrated aggregate.
    pub fn unrated(relation: ContentHash) -> Self {
        Self {
            relation,
            rating: 0.0,
            observations: 0.0,
            damping: 1.0,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RatingState {
        if self.observations > 0.0 {
            RatingState::Rated
        } else {
            RatingState::Unrated
        }
    }

    /// Absorb one evidence sample of value `rating` and weight `weight`.
    ///
    /// `rating' = (rating * obs + r * w) / (obs + w)`, `obs' = obs + w`.
    /// On the first sample this reduces to `rating' = r`, the detector's
    /// initial value.
    pub fn absorb(&mut self, rating: f64, weight: f64) {
        let w = weight * self.damping;
        let obs = self.observations;
        self.rating = (self.rating * obs + rating * w) / (obs + w);
        self.observations = obs + w;
    }

    /// Roll back one previously absorbed sample (surgical deletion).
    ///
    /// `rating' = (rating * obs - r * w) / (obs - w)`, `obs' = obs - w`.
    ///
    /// # Errors
    ///
    /// `CoreError::RatingUnderflow` when the rollback would drop the
    /// observation count to zero or below; the aggregate is left
    /// unchanged and the relation is eligible for removal.
    pub fn release(&mut self, rating: f64, weight: f64) -> CoreResult<()> {
        let w = weight * self.damping;
        let obs = self.observations;
        let remaining = obs - w;
        if remaining <= 0.0 {
            return Err(CoreError::RatingUnderflow {
                observations: remaining,
            });
        }
        self.rating = (self.rating * obs - rating * w) / remaining;
        self.observations = remaining;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relation() -> ContentHash {
        ContentHash::of_bytes(b"relation")
    }

    #[test]
    fn test_first_sample_sets_initial_rating() {
        let mut r = RelationRating::unrated(relation());
        assert_eq!(r.state(), RatingState::Unrated);
        r.absorb(1000.0, 1.0);
        assert_eq!(r.rating, 1000.0);
        assert_eq!(r.observations, 1.0);
        assert_eq!(r.state(), RatingState::Rated);
    }

    #[test]
    fn test_closed_form_weighted_average() {
        // Spec-pinned: (1000, obs 1) + (1200, w 1) => exactly 1100, obs 2.
        let mut r = RelationRating::unrated(relation());
        r.absorb(1000.0, 1.0);
        r.absorb(1200.0, 1.0);
        assert_eq!(r.rating, 1100.0);
        assert_eq!(r.observations, 2.0);
    }

    #[test]
    fn test_absorb_is_commutative_under_order() {
        let samples = [(900.0, 1.0), (1100.0, 2.0), (1300.0, 0.5)];
        let mut forward = RelationRating::unrated(relation());
        for (r, w) in samples {
            forward.absorb(r, w);
        }
        let mut backward = RelationRating::unrated(relation());
        for (r, w) in samples.iter().rev() {
            backward.absorb(*r, *w);
        }
        assert!((forward.rating - backward.rating).abs() < 1e-9);
        assert!((forward.observations - backward.observations).abs() < 1e-12);
    }

    #[test]
    fn test_release_inverts_absorb() {
        let mut r = RelationRating::unrated(relation());
        r.absorb(1000.0, 1.0);
        r.absorb(1200.0, 1.0);
        r.release(1200.0, 1.0).unwrap();
        assert!((r.rating - 1000.0).abs() < 1e-9);
        assert_eq!(r.observations, 1.0);
    }

    #[test]
    fn test_release_last_sample_underflows() {
        let mut r = RelationRating::unrated(relation());
        r.absorb(1000.0, 1.0);
        let err = r.release(1000.0, 1.0).unwrap_err();
        assert!(matches!(err, CoreError::RatingUnderflow { .. }));
        // Aggregate untouched on failure.
        assert_eq!(r.rating, 1000.0);
        assert_eq!(r.observations, 1.0);
    }

    #[test]
    fn test_weighted_samples() {
        let mut r = RelationRating::unrated(relation());
        r.absorb(1000.0, 2.0);
        r.absorb(1600.0, 1.0);
        // (1000*2 + 1600*1) / 3 = 1200
        assert!((r.rating - 1200.0).abs() < 1e-12);
        assert_eq!(r.observations, 3.0);
    }
}
