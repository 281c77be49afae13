//! Leaf entries of the spatial tree.

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, IndexResult};
use crate::region::{Region, DIMS};

/// A geometric leaf entry: an entity id bound to a point on S³ and its
/// 128-bit spatial key.
///
/// The key is carried alongside the point so a host storage engine can
/// mirror leaf entries into a key-ordered table without recomputing the
/// curve mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoEntry<I> {
    /// Entity identifier (atom, composition, or relation on the caller's side).
    pub id: I,
    /// Position in R⁴; unit-norm for on-sphere entities.
    pub point: [f64; DIMS],
    /// Locality-preserving spatial key derived from the position.
    pub key: u128,
}

impl<I> GeoEntry<I> {
    /// Create an entry.
    pub fn new(id: I, point: [f64; DIMS], key: u128) -> Self {
        Self { id, point, key }
    }

    /// The degenerate region covering exactly this entry's point.
    #[inline]
    pub fn region(&self) -> Region {
        Region::point(self.point)
    }

    /// Reject non-finite coordinates before they can poison region math.
    pub fn validate(&self) -> IndexResult<()> {
        for (axis, value) in self.point.iter().enumerate() {
            if !value.is_finite() {
                return Err(IndexError::NonFiniteCoordinate {
                    axis,
                    value: *value,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_region_is_point() {
        let e = GeoEntry::new(1u32, [0.1, 0.2, 0.3, 0.4], 42);
        let r = e.region();
        assert_eq!(r.min, r.max);
        assert_eq!(r.volume(), 0.0);
    }

    #[test]
    fn test_validate_rejects_nan() {
        let e = GeoEntry::new(1u32, [0.0, f64::NAN, 0.0, 0.0], 0);
        assert!(matches!(
            e.validate(),
            Err(IndexError::NonFiniteCoordinate { axis: 1, .. })
        ));
    }
}
