//! Core state types for the particles on the ellipse.
//!
//! - `Particle` holds the intrinsic state `(phi, phidot)` plus mass and radius
//! - `System` holds the ordered particles, the current time `t` and the
//!   reference energy `e0` fixed at t = 0
//!
//! Cartesian position and velocity are never stored; they are evaluated from
//! `(phi, phidot)` and the curve every time they are needed.

use nalgebra::Vector2;

use crate::simulation::geometry::{normalize_angle, Ellipse};

pub type NVec2 = Vector2<f64>;

#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub id: usize,   // stable identifier
    pub phi: f64,    // angular position in [0, 2pi)
    pub phidot: f64, // angular velocity
    pub mass: f64,   // mass
    pub radius: f64, // collision radius, measured along the curve
}

impl Particle {
    pub fn new(id: usize, phi: f64, phidot: f64, mass: f64, radius: f64) -> Self {
        Self {
            id,
            phi: normalize_angle(phi),
            phidot,
            mass,
            radius,
        }
    }

    pub fn position(&self, curve: &Ellipse) -> NVec2 {
        curve.position(self.phi)
    }

    pub fn velocity(&self, curve: &Ellipse) -> NVec2 {
        curve.velocity(self.phi, self.phidot)
    }

    /// Signed speed along the curve, `sqrt(g) phidot`
    pub fn tangential_speed(&self, curve: &Ellipse) -> f64 {
        curve.metric(self.phi).sqrt() * self.phidot
    }

    /// `1/2 m g phidot^2`
    pub fn kinetic_energy(&self, curve: &Ellipse) -> f64 {
        0.5 * self.mass * curve.metric(self.phi) * self.phidot * self.phidot
    }

    pub fn momentum(&self, curve: &Ellipse) -> NVec2 {
        self.velocity(curve) * self.mass
    }
}

#[derive(Debug, Clone)]
pub struct System {
    pub particles: Vec<Particle>, // ordered collection; index is the pair key
    pub t: f64,                   // time
    pub e0: f64,                  // reference kinetic energy at t = 0
}

impl System {
    /// Wrap particles at t = 0 and fix the reference energy
    pub fn new(particles: Vec<Particle>, curve: &Ellipse) -> Self {
        let e0 = particles.iter().map(|p| p.kinetic_energy(curve)).sum();
        Self { particles, t: 0.0, e0 }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn total_energy(&self, curve: &Ellipse) -> f64 {
        self.particles.iter().map(|p| p.kinetic_energy(curve)).sum()
    }

    pub fn total_momentum(&self, curve: &Ellipse) -> NVec2 {
        self.particles
            .iter()
            .fold(NVec2::zeros(), |acc, p| acc + p.momentum(curve))
    }

    /// `(E - E0) / E0`, or zero for a system at rest
    pub fn relative_drift(&self, curve: &Ellipse) -> f64 {
        if self.e0 == 0.0 {
            return 0.0;
        }
        (self.total_energy(curve) - self.e0) / self.e0
    }

    /// Geodesic separation of two particles minus their contact distance
    pub fn gap(&self, curve: &Ellipse, i: usize, j: usize) -> f64 {
        let (pi, pj) = (&self.particles[i], &self.particles[j]);
        curve.arc_length(pi.phi, pj.phi) - (pi.radius + pj.radius)
    }
}
