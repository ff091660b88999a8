//! Energy projection
//!
//! Integration and collision round-off slowly move the total kinetic energy
//! away from its initial value. Every `interval` loop steps the projector
//! rescales all angular velocities by one common factor
//! `lambda = sqrt(E0 / E_now)`. Angles are never touched.
//!
//! This is a numerical correction and is kept out of the integrator and the
//! resolver on purpose: it only ever runs from the simulation loop.

use crate::simulation::geometry::Ellipse;
use crate::simulation::states::System;

/// What a projection did
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub scale: f64,         // lambda applied to every phidot
    pub energy_before: f64, // E_now before rescaling
    pub drift_before: f64,  // (E_now - E0) / E0 before rescaling
}

#[derive(Debug, Clone)]
pub struct EnergyProjector {
    enabled: bool,
    interval: u64,
}

impl EnergyProjector {
    pub fn new(enabled: bool, interval: u64) -> Self {
        Self { enabled, interval }
    }

    pub fn disabled() -> Self {
        Self::new(false, 0)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled && self.interval > 0
    }

    /// True when loop step `step` (1-based) ends a projection interval
    pub fn is_due(&self, step: u64) -> bool {
        self.is_enabled() && step > 0 && step % self.interval == 0
    }

    /// Project if due; `None` when not due or nothing to rescale
    pub fn apply(&self, curve: &Ellipse, system: &mut System, step: u64) -> Option<Projection> {
        if !self.is_due(step) {
            return None;
        }
        project_energy(curve, system)
    }
}

/// Rescale every `phidot` so that the total energy equals `system.e0`.
/// Skipped for a system at rest or a non-finite energy
pub fn project_energy(curve: &Ellipse, system: &mut System) -> Option<Projection> {
    let energy = system.total_energy(curve);
    if !(energy.is_finite() && energy > 0.0) || !(system.e0 > 0.0) {
        return None;
    }

    let scale = (system.e0 / energy).sqrt();
    for p in system.particles.iter_mut() {
        p.phidot *= scale;
    }

    Some(Projection {
        scale,
        energy_before: energy,
        drift_before: (energy - system.e0) / system.e0,
    })
}
