use std::f64::consts::{PI, TAU};

use ellipsim::simulation::detector::{pair_from_index, pair_index};
use ellipsim::{
    advance, normalize_angle, wrap_angle, ArcLengthMethod, CollisionOutcome, Ellipse, Particle,
    ResolutionStrategy,
};
use proptest::prelude::*;

fn curve(b: f64, ratio: f64) -> Ellipse {
    Ellipse::new(b * ratio, b).expect("valid semi-axes")
}

// Property tests: geometry holds for any admissible ellipse and angle.
proptest! {
    #[test]
    fn prop_metric_bounded_below(
        b in 0.1_f64..5.0,
        ratio in 1.0_f64..5.0,
        phi in -100.0_f64..100.0
    ) {
        let e = curve(b, ratio);
        let g = e.metric(phi);
        prop_assert!(g.is_finite());
        prop_assert!(g >= e.metric_floor() * (1.0 - 1e-12));
    }

    #[test]
    fn prop_christoffel_is_half_log_metric_derivative(
        ratio in 1.0_f64..3.0,
        phi in 0.0_f64..TAU
    ) {
        let e = curve(1.0, ratio);
        let h = 1e-3;
        let dg = (-e.metric(phi + 2.0 * h) + 8.0 * e.metric(phi + h) - 8.0 * e.metric(phi - h)
            + e.metric(phi - 2.0 * h))
            / (12.0 * h);
        let numeric = dg / (2.0 * e.metric(phi));
        prop_assert!((e.christoffel(phi) - numeric).abs() < 1e-6);
    }

    #[test]
    fn prop_velocity_round_trip(
        ratio in 1.0_f64..4.0,
        phi in 0.0_f64..TAU,
        phidot in -10.0_f64..10.0
    ) {
        let e = curve(1.0, ratio);
        let v = e.velocity(phi, phidot);
        let back = e.angular_velocity(phi, &v);
        prop_assert!((back - phidot).abs() <= 1e-12 * (1.0 + phidot.abs()));
    }

    #[test]
    fn prop_angle_reduction(x in -1.0e6_f64..1.0e6) {
        let n = normalize_angle(x);
        prop_assert!((0.0..TAU).contains(&n));
        let w = wrap_angle(x);
        prop_assert!(w > -PI && w <= PI);
    }

    #[test]
    fn prop_arc_length_symmetric_and_short(
        ratio in 1.0_f64..5.0,
        p1 in 0.0_f64..TAU,
        p2 in 0.0_f64..TAU
    ) {
        let e = curve(1.0, ratio);
        for method in [ArcLengthMethod::Quadrature, ArcLengthMethod::Midpoint] {
            let e = e.with_arc_length(method);
            let d12 = e.arc_length(p1, p2);
            let d21 = e.arc_length(p2, p1);
            prop_assert!(d12 >= 0.0, "{method:?}: negative distance {d12}");
            prop_assert!((d12 - d21).abs() < 1e-10);
        }
        let d = e.arc_length(p1, p2);
        prop_assert!(d <= 0.5 * e.perimeter() * (1.0 + 1e-5));
    }

    #[test]
    fn prop_pair_index_round_trip(j in 1_usize..1_000_000, frac in 0.0_f64..1.0) {
        let i = ((j as f64) * frac) as usize % j;
        prop_assert_eq!(pair_from_index(pair_index(i, j)), (i, j));
    }

    #[test]
    fn prop_integrator_reversible(
        ratio in 1.0_f64..3.0,
        phi in 0.0_f64..TAU,
        phidot in -3.0_f64..3.0
    ) {
        let e = curve(1.0, ratio);
        let (p1, w1) = advance(&e, phi, phidot, 1e-3);
        let (p2, w2) = advance(&e, p1, w1, -1e-3);
        prop_assert!(wrap_angle(p2 - phi).abs() < 1e-11);
        prop_assert!((w2 - phidot).abs() < 1e-11);
    }

    #[test]
    fn prop_collisions_conserve_energy(
        ratio in 1.0_f64..3.0,
        phi in 0.0_f64..TAU,
        w1 in -3.0_f64..3.0,
        w2 in -3.0_f64..3.0,
        m2 in 0.2_f64..5.0
    ) {
        let e = curve(1.0, ratio);
        for strategy in [ResolutionStrategy::CartesianImpulse, ResolutionStrategy::Intrinsic] {
            let pi = Particle::new(0, phi, w1, 1.0, 0.02);
            let pj = Particle::new(1, phi + 0.04, w2, m2, 0.02);
            let before = pi.kinetic_energy(&e) + pj.kinetic_energy(&e);
            let outcome = strategy.resolve(&e, &pi, &pj);
            if let CollisionOutcome::Resolved { phidot_i, phidot_j, .. } = outcome {
                let after = Particle { phidot: phidot_i, ..pi }.kinetic_energy(&e)
                    + Particle { phidot: phidot_j, ..pj }.kinetic_energy(&e);
                prop_assert!((after - before).abs() <= 1e-12 * before.max(1e-300));
            }
        }
    }
}
