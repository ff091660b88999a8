//! Free geodesic motion on the ellipse
//!
//! Solves `phi'' = -Gamma(phi) phidot^2` with the 4th-order, time-symmetric
//! Forest-Ruth / Yoshida composition: four drifts and three kicks.
//!
//! - drift: `phi += c_k phidot dt` (exact at frozen `phidot`)
//! - kick:  exact flow of `phidot' = -Gamma phidot^2` at frozen `phi`,
//!   `phidot / (1 + Gamma phidot d_k dt)`
//!
//! On a circle `Gamma == 0`, every kick is the identity and `phidot` stays
//! exactly constant.

use rayon::prelude::*;

use super::geometry::{normalize_angle, Ellipse};
use super::states::Particle;

// w1 = 1 / (2 - 2^(1/3)), w0 = -2^(1/3) w1
const W1: f64 = 1.351_207_191_959_657_6;
const W0: f64 = -1.702_414_383_919_315_3;

/// Drift coefficients, symmetric, summing to 1
pub const DRIFT: [f64; 4] = [0.5 * W1, 0.5 * (W0 + W1), 0.5 * (W0 + W1), 0.5 * W1];

/// Kick coefficients, symmetric, summing to 1
pub const KICK: [f64; 3] = [W1, W0, W1];

// Exact kick; the series fallback only triggers for absurdly stiff steps
fn kick(curve: &Ellipse, phi: f64, phidot: f64, tau: f64) -> f64 {
    let x = curve.christoffel(phi) * phidot * tau;
    let denom = 1.0 + x;
    if denom > 0.0 {
        phidot / denom
    } else {
        phidot * (1.0 - x)
    }
}

/// Advance one free particle by `dt`; returns `(phi', phidot')` with `phi'`
/// reduced into `[0, 2pi)`
pub fn advance(curve: &Ellipse, phi: f64, phidot: f64, dt: f64) -> (f64, f64) {
    let mut phi = phi;
    let mut phidot = phidot;

    for (c, d) in DRIFT.iter().zip(KICK.iter()) {
        phi += c * phidot * dt;
        phidot = kick(curve, phi, phidot, d * dt);
    }
    phi += DRIFT[3] * phidot * dt;

    (normalize_angle(phi), phidot)
}

/// Advance one particle in place
pub fn advance_particle(curve: &Ellipse, p: &mut Particle, dt: f64) {
    let (phi, phidot) = advance(curve, p.phi, p.phidot, dt);
    p.phi = phi;
    p.phidot = phidot;
}

/// Advance every particle by the same `dt`
pub fn advance_all(curve: &Ellipse, particles: &mut [Particle], dt: f64) {
    if dt == 0.0 {
        return;
    }
    for p in particles.iter_mut() {
        advance_particle(curve, p, dt);
    }
}

/// Same as [`advance_all`], one rayon task per particle. Call inside
/// `ThreadPool::install` to pin it to a specific pool
pub fn advance_all_parallel(curve: &Ellipse, particles: &mut [Particle], dt: f64) {
    if dt == 0.0 {
        return;
    }
    particles
        .par_iter_mut()
        .for_each(|p| advance_particle(curve, p, dt));
}
