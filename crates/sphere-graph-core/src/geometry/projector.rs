//! Deterministic projection of code points onto S³.
//!
//! A code point's **semantic ordering key** - fixed during seeding from
//! collation metadata - ranks it among all code points. The rank indexes a
//! low-discrepancy Halton sample in the unit cube, which a Hopf-style
//! fibration lifts onto the unit hypersphere. The whole path is a pure
//! function: the same ordering key always produces the identical position
//! and spatial key, bit for bit, across calls and processes.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use super::spatial_key::SpatialKeyEncoder;
use crate::error::CoreResult;
use crate::types::Physicality;

/// Semantic ordering key of one code point.
///
/// Components are ordered most-significant first: general category groups
/// letters away from punctuation, script sub-clusters within a category,
/// collation weight orders within a script, and the CJK radical/stroke
/// class and confusable-group id refine the tail. Keys are produced by the
/// external seeding artifact; [`OrderingKey::from_codepoint_defaults`] is
/// the coarse fallback used when no collation artifact is supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderingKey {
    /// General category class.
    pub category: u8,
    /// Script identifier.
    pub script: u16,
    /// Collation weight within the script.
    pub collation_weight: u32,
    /// CJK radical/stroke class; zero outside CJK.
    pub radical_stroke: u16,
    /// Visual confusable-group id.
    pub confusable_group: u32,
}

impl OrderingKey {
    /// Lexicographic rank of this key among all possible keys.
    ///
    /// Bit layout (high to low): category 8, script 16, collation 32,
    /// radical/stroke 16, confusable group 32 - 104 bits total.
    pub fn rank(&self) -> u128 {
        (u128::from(self.category) << 96)
            | (u128::from(self.script) << 80)
            | (u128::from(self.collation_weight) << 48)
            | (u128::from(self.radical_stroke) << 32)
            | u128::from(self.confusable_group)
    }

    /// Coarse default ordering derived from the code point alone.
    ///
    /// Categories come from the standard library's Unicode tables, the
    /// 256-code-point block stands in for the script, and the code point
    /// itself stands in for the collation weight. Good enough to cluster
    /// letters, digits, and punctuation when no seed artifact is present.
    pub fn from_codepoint_defaults(codepoint: u32) -> Self {
        let category = match char::from_u32(codepoint) {
            Some(c) if c.is_whitespace() => 0,
            Some(c) if c.is_control() => 1,
            Some(c) if c.is_numeric() => 2,
            Some(c) if c.is_uppercase() => 3,
            Some(c) if c.is_lowercase() => 4,
            Some(c) if c.is_alphabetic() => 5,
            Some(_) => 6,
            None => 7,
        };
        Self {
            category,
            script: (codepoint >> 8) as u16,
            collation_weight: codepoint,
            radical_stroke: 0,
            confusable_group: codepoint,
        }
    }
}

/// Radical inverse of `index` in the given base: the digits of `index`
/// mirrored across the radix point.
fn radical_inverse(base: u64, mut index: u128) -> f64 {
    let b = base as f64;
    let base = u128::from(base);
    let mut result = 0.0;
    let mut f = 1.0 / b;
    while index > 0 {
        result += f * (index % base) as f64;
        index /= base;
        f /= b;
    }
    result
}

/// Halton sample in [0,1)³ at `index`, bases 2/3/5.
fn halton3(index: u128) -> [f64; 3] {
    [
        radical_inverse(2, index),
        radical_inverse(3, index),
        radical_inverse(5, index),
    ]
}

/// Hopf-style lift of a unit-cube sample onto S³.
///
/// `(u1, u2, u3) -> (sqrt(1-u3)·sin θ1, sqrt(1-u3)·cos θ1,
/// sqrt(u3)·sin θ2, sqrt(u3)·cos θ2)` with `θi = 2π·ui`. The image is
/// exactly unit-norm by construction, and the map is continuous in all
/// three inputs, so neighboring cube samples stay neighbors on the sphere.
fn hopf_lift(u: [f64; 3]) -> [f64; 4] {
    let theta1 = TAU * u[0];
    let theta2 = TAU * u[1];
    let r_out = (1.0 - u[2]).sqrt();
    let r_in = u[2].sqrt();
    [
        r_out * theta1.sin(),
        r_out * theta1.cos(),
        r_in * theta2.sin(),
        r_in * theta2.cos(),
    ]
}

/// Deterministic projector from ordering keys to physicalities.
#[derive(Debug, Clone, Copy, Default)]
pub struct Projector {
    encoder: SpatialKeyEncoder,
}

impl Projector {
    /// Create a projector with the given key encoder.
    pub fn new(encoder: SpatialKeyEncoder) -> Self {
        Self { encoder }
    }

    /// Project an ordering key to its permanent S³ position and key.
    pub fn project(&self, key: &OrderingKey) -> CoreResult<Physicality> {
        // Offset by one: rank zero would index the degenerate Halton
        // origin sample (0, 0, 0).
        let position = hopf_lift(halton3(key.rank() + 1));
        let spatial_key = self.encoder.encode_position(&position)?;
        let physicality = Physicality::new(position, spatial_key);
        physicality.validate()?;
        Ok(physicality)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UNIT_NORM_TOLERANCE;

    #[test]
    fn test_projection_is_bit_exact() {
        let projector = Projector::default();
        let key = OrderingKey::from_codepoint_defaults(u32::from('h'));
        let a = projector.project(&key).unwrap();
        let b = projector.project(&key).unwrap();
        assert_eq!(a.position, b.position);
        assert_eq!(a.spatial_key, b.spatial_key);
    }

    #[test]
    fn test_projection_is_unit_norm() {
        let projector = Projector::default();
        for codepoint in [0x20, 0x41, 0x68, 0x3B1, 0x4E2D, 0x1F600] {
            let key = OrderingKey::from_codepoint_defaults(codepoint);
            let p = projector.project(&key).unwrap();
            assert!(
                (p.norm() - 1.0).abs() <= UNIT_NORM_TOLERANCE,
                "U+{codepoint:X} landed off-sphere: {}",
                p.norm()
            );
        }
    }

    #[test]
    fn test_distinct_keys_distinct_positions() {
        let projector = Projector::default();
        let a = projector
            .project(&OrderingKey::from_codepoint_defaults(u32::from('a')))
            .unwrap();
        let b = projector
            .project(&OrderingKey::from_codepoint_defaults(u32::from('b')))
            .unwrap();
        assert_ne!(a.position, b.position);
    }

    #[test]
    fn test_rank_orders_by_category_first() {
        let space = OrderingKey::from_codepoint_defaults(u32::from(' '));
        let digit = OrderingKey::from_codepoint_defaults(u32::from('7'));
        let lower = OrderingKey::from_codepoint_defaults(u32::from('z'));
        assert!(space.rank() < digit.rank());
        assert!(digit.rank() < lower.rank());
    }

    #[test]
    fn test_radical_inverse_base2() {
        // index 1 -> 0.1b = 0.5, index 2 -> 0.01b = 0.25, index 3 -> 0.11b = 0.75
        assert_eq!(radical_inverse(2, 1), 0.5);
        assert_eq!(radical_inverse(2, 2), 0.25);
        assert_eq!(radical_inverse(2, 3), 0.75);
    }

    #[test]
    fn test_hopf_lift_covers_both_circles() {
        // u3 = 0 puts all mass on the first circle, u3 = 1 on the second.
        let outer = hopf_lift([0.25, 0.0, 0.0]);
        assert!((outer[2].abs() + outer[3].abs()) < 1e-12);
        let inner = hopf_lift([0.0, 0.25, 1.0]);
        assert!((inner[0].abs() + inner[1].abs()) < 1e-12);
    }
}
