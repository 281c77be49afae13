//! Distance functions and the spherical centroid.
//!
//! All positions are unit vectors in R⁴. The exact geodesic distance is
//! the arccosine of the clamped dot product; the cheap form goes through
//! the Euclidean chord and the identity `d = 2·asin(chord/2)`, which
//! agrees with the exact form to well under 1e-9 everywhere except the
//! antipodal limit - and is numerically *better* than arccos near zero.

use crate::error::{CoreError, CoreResult};

/// Dot product of two R⁴ vectors.
#[inline]
pub fn dot(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Euclidean distance in R⁴.
pub fn euclidean(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Exact geodesic distance on S³: `acos(clamp(a·b))`, in [0, π].
pub fn geodesic(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    dot(a, b).clamp(-1.0, 1.0).acos()
}

/// Chord-based geodesic distance: `2·asin(‖a−b‖ / 2)`, in [0, π].
///
/// Matches [`geodesic`] within 1e-9 on unit vectors and avoids the
/// precision loss of arccos for nearly identical points.
pub fn geodesic_fast(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    2.0 * (euclidean(a, b) / 2.0).clamp(-1.0, 1.0).asin()
}

/// Renormalize a vector to unit length.
///
/// # Errors
///
/// `CoreError::DegenerateCentroid` when the norm is numerically zero.
pub fn normalize(v: &[f64; 4]) -> CoreResult<[f64; 4]> {
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm < 1e-12 {
        return Err(CoreError::DegenerateCentroid);
    }
    Ok([v[0] / norm, v[1] / norm, v[2] / norm, v[3] / norm])
}

/// Weighted mean of positions, renormalized to S³.
///
/// # Errors
///
/// - `CoreError::EmptySequence` for an empty input
/// - `CoreError::DegenerateCentroid` when the weighted mean cancels to the
///   zero vector (antipodal inputs)
pub fn centroid(positions: &[([f64; 4], f64)]) -> CoreResult<[f64; 4]> {
    if positions.is_empty() {
        return Err(CoreError::EmptySequence);
    }
    let mut acc = [0.0; 4];
    let mut total = 0.0;
    for (p, w) in positions {
        for axis in 0..4 {
            acc[axis] += p[axis] * w;
        }
        total += w;
    }
    if total <= 0.0 {
        return Err(CoreError::DegenerateCentroid);
    }
    for v in &mut acc {
        *v /= total;
    }
    normalize(&acc)
}

/// Unweighted centroid convenience.
pub fn centroid_unweighted(positions: &[[f64; 4]]) -> CoreResult<[f64; 4]> {
    let weighted: Vec<([f64; 4], f64)> = positions.iter().map(|p| (*p, 1.0)).collect();
    centroid(&weighted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const E0: [f64; 4] = [1.0, 0.0, 0.0, 0.0];
    const E1: [f64; 4] = [0.0, 1.0, 0.0, 0.0];
    const NEG_E0: [f64; 4] = [-1.0, 0.0, 0.0, 0.0];

    #[test]
    fn test_geodesic_identity_is_zero() {
        assert_eq!(geodesic(&E0, &E0), 0.0);
    }

    #[test]
    fn test_geodesic_antipodal_is_pi() {
        assert!((geodesic(&E0, &NEG_E0) - PI).abs() < 1e-12);
    }

    #[test]
    fn test_geodesic_orthogonal_is_half_pi() {
        assert!((geodesic(&E0, &E1) - PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_geodesic_range() {
        let samples = [
            [0.5, 0.5, 0.5, 0.5],
            [-0.5, 0.5, -0.5, 0.5],
            [1.0, 0.0, 0.0, 0.0],
        ];
        for a in &samples {
            for b in &samples {
                let d = geodesic(a, b);
                assert!((0.0..=PI).contains(&d));
            }
        }
    }

    #[test]
    fn test_fast_geodesic_matches_exact() {
        // Canonical vectors across the whole angular range.
        let cases: Vec<([f64; 4], [f64; 4])> = vec![
            (E0, E0),
            (E0, E1),
            (E0, NEG_E0),
            (E0, [0.6, 0.8, 0.0, 0.0]),
            ([0.5, 0.5, 0.5, 0.5], [0.5, 0.5, 0.5, -0.5]),
            ([0.5, 0.5, 0.5, 0.5], [-0.5, -0.5, -0.5, 0.5]),
        ];
        for (a, b) in cases {
            let exact = geodesic(&a, &b);
            let fast = geodesic_fast(&a, &b);
            assert!(
                (exact - fast).abs() < 1e-9,
                "exact {exact} vs fast {fast} for {a:?} / {b:?}"
            );
        }
    }

    #[test]
    fn test_euclidean_chord_bounds() {
        // On the unit sphere the chord never exceeds the diameter.
        assert!((euclidean(&E0, &NEG_E0) - 2.0).abs() < 1e-12);
        assert!((euclidean(&E0, &E1) - 2.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_centroid_renormalizes() {
        let c = centroid_unweighted(&[E0, E1]).unwrap();
        let norm: f64 = c.iter().map(|v| v * v).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-12);
        let expected = 1.0 / 2.0_f64.sqrt();
        assert!((c[0] - expected).abs() < 1e-12);
        assert!((c[1] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_centroid_weights_pull() {
        let c = centroid(&[(E0, 3.0), (E1, 1.0)]).unwrap();
        assert!(c[0] > c[1]);
    }

    #[test]
    fn test_centroid_antipodal_is_degenerate() {
        let err = centroid_unweighted(&[E0, NEG_E0]).unwrap_err();
        assert!(matches!(err, CoreError::DegenerateCentroid));
    }

    #[test]
    fn test_centroid_empty_is_rejected() {
        assert!(matches!(
            centroid_unweighted(&[]),
            Err(CoreError::EmptySequence)
        ));
    }
}
