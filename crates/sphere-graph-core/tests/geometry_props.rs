//! Randomized properties of the geometry kernel.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use sphere_graph_core::geometry::{geodesic, geodesic_fast, SpatialKeyEncoder};

fn random_unit(rng: &mut StdRng) -> [f64; 4] {
    loop {
        let mut p = [0.0; 4];
        for v in &mut p {
            *v = rng.gen_range(-1.0..1.0);
        }
        let norm: f64 = p.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 1e-3 {
            return [p[0] / norm, p[1] / norm, p[2] / norm, p[3] / norm];
        }
    }
}

#[test]
fn geodesic_stays_in_range_and_agrees_with_chord_form() {
    let mut rng = StdRng::seed_from_u64(0x9e0d);
    for _ in 0..5_000 {
        let a = random_unit(&mut rng);
        let b = random_unit(&mut rng);

        let exact = geodesic(&a, &b);
        assert!(
            (0.0..=std::f64::consts::PI + 1e-12).contains(&exact),
            "geodesic {exact} escaped [0, pi]"
        );
        assert!(geodesic(&a, &a) < 1e-7, "self-distance must vanish");

        let fast = geodesic_fast(&a, &b);
        assert!(
            (exact - fast).abs() < 1e-7,
            "chord form diverged: {exact} vs {fast}"
        );
    }
}

#[test]
fn antipode_distance_is_pi() {
    let mut rng = StdRng::seed_from_u64(0xa471);
    for _ in 0..1_000 {
        let a = random_unit(&mut rng);
        let neg = [-a[0], -a[1], -a[2], -a[3]];
        assert!((geodesic(&a, &neg) - std::f64::consts::PI).abs() < 1e-9);
    }
}

#[test]
fn spatial_keys_order_roughly_with_distance() {
    // Locality is probabilistic, not exact: verify the aggregate trend
    // that near pairs share longer key prefixes than far pairs.
    let mut rng = StdRng::seed_from_u64(0x10ca1);
    let encoder = SpatialKeyEncoder::default();

    let mut near_prefix_sum = 0u64;
    let mut far_prefix_sum = 0u64;
    let trials = 500;
    for _ in 0..trials {
        let a = random_unit(&mut rng);
        let mut near = a;
        for v in &mut near {
            *v += rng.gen_range(-1e-6..1e-6);
        }
        let b = random_unit(&mut rng);

        let key_a = encoder.encode_position(&a).unwrap();
        let key_near = encoder.encode_position(&near).unwrap();
        let key_b = encoder.encode_position(&b).unwrap();

        near_prefix_sum += u64::from((key_a ^ key_near).leading_zeros());
        far_prefix_sum += u64::from((key_a ^ key_b).leading_zeros());
    }
    assert!(
        near_prefix_sum > far_prefix_sum,
        "near pairs should share longer key prefixes on aggregate"
    );
}
