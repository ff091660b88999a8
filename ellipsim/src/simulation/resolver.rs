//! Elastic collision response for a touching pair
//!
//! Two strategies, picked once from the configuration:
//!
//! - `CartesianImpulse`: exchange momentum along the chord normal
//!   `n = (p_i - p_j) / |p_i - p_j|` exactly as two free discs would, then
//!   put each new velocity back on the curve with
//!   `phidot' = sign(v' . T) |v'| / sqrt(g)`. The magnitude is kept, so
//!   kinetic energy is untouched by the mapping.
//! - `Intrinsic`: the same 1D elastic formula applied to the signed speeds
//!   along the curve, `u = sqrt(g) phidot`.
//!
//! Both strategies share one notion of "closing" with the detector, so a pair
//! reported in contact is never silently ignored here.

use crate::configuration::config::ResolutionStrategy;
use crate::simulation::geometry::{wrap_angle, Ellipse};
use crate::simulation::states::{NVec2, Particle};

/// Chord lengths below this are treated as coincident particles
const MIN_CHORD: f64 = 1.0e-14;

#[derive(Debug, Clone, PartialEq)]
pub enum CollisionOutcome {
    /// New angular velocities, plus the Cartesian velocities the impulse
    /// produced before they were mapped back onto the curve
    Resolved {
        phidot_i: f64,
        phidot_j: f64,
        velocity_i: NVec2,
        velocity_j: NVec2,
    },
    /// The pair is already moving apart (grazing or false positive)
    Separating,
    /// Positions coincide, no contact normal exists
    Degenerate,
}

impl CollisionOutcome {
    pub fn is_resolved(&self) -> bool {
        matches!(self, CollisionOutcome::Resolved { .. })
    }
}

// Post-collision normal speeds of a 1D elastic collision
fn elastic_1d(mi: f64, mj: f64, ui: f64, uj: f64) -> (f64, f64) {
    let m = mi + mj;
    let ui_new = ((mi - mj) * ui + 2.0 * mj * uj) / m;
    let uj_new = ((mj - mi) * uj + 2.0 * mi * ui) / m;
    (ui_new, uj_new)
}

impl ResolutionStrategy {
    /// Rate at which the pair approaches; positive means closing
    pub fn closing_speed(&self, curve: &Ellipse, pi: &Particle, pj: &Particle) -> f64 {
        match self {
            ResolutionStrategy::CartesianImpulse => {
                let d = pi.position(curve) - pj.position(curve);
                let dist = d.norm();
                if dist < MIN_CHORD {
                    return 0.0;
                }
                let n = d / dist;
                (pj.velocity(curve) - pi.velocity(curve)).dot(&n)
            }
            ResolutionStrategy::Intrinsic => {
                let delta = wrap_angle(pj.phi - pi.phi);
                if delta == 0.0 {
                    return 0.0;
                }
                // j ahead of i along increasing phi means i must be faster
                delta.signum() * (pi.tangential_speed(curve) - pj.tangential_speed(curve))
            }
        }
    }

    pub fn is_closing(&self, curve: &Ellipse, pi: &Particle, pj: &Particle) -> bool {
        self.closing_speed(curve, pi, pj) > 0.0
    }

    /// Post-collision state of a pair; does not mutate anything
    pub fn resolve(&self, curve: &Ellipse, pi: &Particle, pj: &Particle) -> CollisionOutcome {
        match self {
            ResolutionStrategy::CartesianImpulse => resolve_cartesian(curve, pi, pj),
            ResolutionStrategy::Intrinsic => resolve_intrinsic(curve, pi, pj),
        }
    }
}

fn resolve_cartesian(curve: &Ellipse, pi: &Particle, pj: &Particle) -> CollisionOutcome {
    let d = pi.position(curve) - pj.position(curve);
    let dist = d.norm();
    if dist < MIN_CHORD {
        return CollisionOutcome::Degenerate;
    }
    let n = d / dist;

    let vi = pi.velocity(curve);
    let vj = pj.velocity(curve);
    let ui = vi.dot(&n);
    let uj = vj.dot(&n);
    if uj - ui <= 0.0 {
        return CollisionOutcome::Separating;
    }

    let (ui_new, uj_new) = elastic_1d(pi.mass, pj.mass, ui, uj);
    let velocity_i = vi + n * (ui_new - ui);
    let velocity_j = vj + n * (uj_new - uj);

    CollisionOutcome::Resolved {
        phidot_i: curve.angular_velocity(pi.phi, &velocity_i),
        phidot_j: curve.angular_velocity(pj.phi, &velocity_j),
        velocity_i,
        velocity_j,
    }
}

fn resolve_intrinsic(curve: &Ellipse, pi: &Particle, pj: &Particle) -> CollisionOutcome {
    if wrap_angle(pj.phi - pi.phi) == 0.0 {
        return CollisionOutcome::Degenerate;
    }
    if !ResolutionStrategy::Intrinsic.is_closing(curve, pi, pj) {
        return CollisionOutcome::Separating;
    }

    let si = curve.metric(pi.phi).sqrt();
    let sj = curve.metric(pj.phi).sqrt();
    let (ui_new, uj_new) = elastic_1d(pi.mass, pj.mass, si * pi.phidot, sj * pj.phidot);

    let phidot_i = ui_new / si;
    let phidot_j = uj_new / sj;
    CollisionOutcome::Resolved {
        phidot_i,
        phidot_j,
        velocity_i: curve.velocity(pi.phi, phidot_i),
        velocity_j: curve.velocity(pj.phi, phidot_j),
    }
}

/// Resolve the pair `(i, j)` in place and report what happened
pub fn resolve_pair(
    strategy: ResolutionStrategy,
    curve: &Ellipse,
    particles: &mut [Particle],
    i: usize,
    j: usize,
) -> CollisionOutcome {
    let outcome = strategy.resolve(curve, &particles[i], &particles[j]);
    if let CollisionOutcome::Resolved { phidot_i, phidot_j, .. } = &outcome {
        particles[i].phidot = *phidot_i;
        particles[j].phidot = *phidot_j;
    }
    outcome
}
