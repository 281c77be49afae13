//! Locality-preserving spatial keys.
//!
//! Positions are mapped from S³ into the unit hypercube by the per-axis
//! affine `(x + 1) / 2`, discretized at a configurable bit depth, and the
//! four binary expansions are bit-interleaved (Morton order) into a single
//! key of up to 128 bits. The mapping is forward-only: no inverse is
//! exposed or needed. Points close in R⁴ are close in key order with high
//! probability; range queries exploit this, they never rely on it being
//! exact.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Spatial key discretization settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpatialKeyConfig {
    /// Quantization depth per axis.
    ///
    /// `Constraint: 1 <= bits_per_axis <= 32` (4 axes x 32 bits = 128-bit key)
    pub bits_per_axis: u8,
}

impl Default for SpatialKeyConfig {
    fn default() -> Self {
        Self { bits_per_axis: 32 }
    }
}

impl SpatialKeyConfig {
    /// Validate the depth bound.
    pub fn validate(&self) -> CoreResult<()> {
        if self.bits_per_axis == 0 || self.bits_per_axis > 32 {
            return Err(CoreError::Config(format!(
                "spatial_key.bits_per_axis must be in 1..=32, got {}",
                self.bits_per_axis
            )));
        }
        Ok(())
    }
}

/// Forward-only encoder from positions to interleaved keys.
///
/// Pure function of its input: the same position and depth always produce
/// the identical key, across calls and across processes.
#[derive(Debug, Clone, Copy)]
pub struct SpatialKeyEncoder {
    bits_per_axis: u8,
}

impl Default for SpatialKeyEncoder {
    fn default() -> Self {
        Self::new(SpatialKeyConfig::default()).expect("default config is valid")
    }
}

impl SpatialKeyEncoder {
    /// Create an encoder at the configured depth.
    pub fn new(config: SpatialKeyConfig) -> CoreResult<Self> {
        config.validate()?;
        Ok(Self {
            bits_per_axis: config.bits_per_axis,
        })
    }

    /// Quantization depth per axis.
    pub fn bits_per_axis(&self) -> u8 {
        self.bits_per_axis
    }

    /// Encode an S³ position.
    ///
    /// Coordinates are mapped into [0,1] by `(x + 1) / 2` and clamped, so
    /// slightly-off-sphere inputs still key deterministically.
    ///
    /// # Errors
    ///
    /// `CoreError::OutOfDomainCoordinate` for NaN or infinite coordinates.
    pub fn encode_position(&self, position: &[f64; 4]) -> CoreResult<u128> {
        let mut cube = [0.0; 4];
        for (axis, value) in position.iter().enumerate() {
            if !value.is_finite() {
                return Err(CoreError::OutOfDomainCoordinate {
                    axis,
                    value: *value,
                });
            }
            cube[axis] = ((value + 1.0) / 2.0).clamp(0.0, 1.0);
        }
        Ok(self.encode_cube(&cube))
    }

    /// Encode hypercube coordinates already clamped to [0,1]⁴.
    ///
    /// Bit `b` of every axis (most significant first) lands adjacent in
    /// the output, so high-order cube subdivisions dominate key order.
    pub fn encode_cube(&self, cube: &[f64; 4]) -> u128 {
        let bits = u32::from(self.bits_per_axis);
        let levels = (1u64 << bits) - 1;

        let mut cells = [0u64; 4];
        for axis in 0..4 {
            let clamped = cube[axis].clamp(0.0, 1.0);
            cells[axis] = (clamped * levels as f64).round() as u64;
        }

        let mut key: u128 = 0;
        for level in (0..bits).rev() {
            for cell in &cells {
                key = (key << 1) | u128::from((cell >> level) & 1);
            }
        }
        key
    }
}
