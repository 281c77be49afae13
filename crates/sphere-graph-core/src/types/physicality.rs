//! Geometric position values.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Tolerance for the unit-norm invariant.
pub const UNIT_NORM_TOLERANCE: f64 = 1e-9;

/// A position value on (or derived from) the unit hypersphere S³.
///
/// Shared by atoms, compositions, and relations; the owner's lifetime is
/// the position's lifetime. Multi-point entities may additionally carry a
/// trajectory of intermediate positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Physicality {
    /// Unit S³ coordinate.
    ///
    /// `Constraint: | |position| - 1 | <= 1e-9`
    pub position: [f64; 4],

    /// 128-bit locality-preserving spatial key derived from the position.
    pub spatial_key: u128,

    /// Ordered intermediate positions for multi-point entities.
    ///
    /// Serialized unconditionally: the storage layer's binary codec needs
    /// a fixed field layout.
    #[serde(default)]
    pub trajectory: Option<Vec<[f64; 4]>>,
}

impl Physicality {
    /// Create a single-point physicality.
    pub fn new(position: [f64; 4], spatial_key: u128) -> Self {
        Self {
            position,
            spatial_key,
            trajectory: None,
        }
    }

    /// Euclidean norm of the position.
    pub fn norm(&self) -> f64 {
        self.position.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    /// Validate the unit-norm invariant and coordinate finiteness.
    pub fn validate(&self) -> CoreResult<()> {
        for (axis, value) in self.position.iter().enumerate() {
            if !value.is_finite() {
                return Err(CoreError::OutOfDomainCoordinate {
                    axis,
                    value: *value,
                });
            }
        }
        let norm = self.norm();
        if (norm - 1.0).abs() > UNIT_NORM_TOLERANCE {
            return Err(CoreError::NotUnitNorm { norm });
        }
        Ok(())
    }
}
