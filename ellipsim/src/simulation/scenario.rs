//! Build fully-initialized simulation scenarios from configuration
//!
//! Takes a `ScenarioConfig` and produces a runtime bundle containing:
//! - engine settings (`Engine`)
//! - numerical parameters (`Parameters`)
//! - the curve (`Ellipse`)
//! - system state (`System` with particles at t = 0)
//!
//! Particles are either placed explicitly from the configuration or sampled
//! uniformly (`phi` in [0, 2pi), `phidot` in [-v_max, v_max]) and rejected
//! while they overlap an already placed particle, overlap being measured by
//! geodesic distance.

use std::f64::consts::TAU;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::configuration::config::{ParticlesConfig, ScenarioConfig};
use crate::error::{SimError, SimResult};
use crate::simulation::engine::Engine;
use crate::simulation::geometry::Ellipse;
use crate::simulation::params::Parameters;
use crate::simulation::states::{Particle, System};

/// Runtime bundle built from a [`ScenarioConfig`]
#[derive(Debug, Clone)]
pub struct Scenario {
    pub engine: Engine,
    pub parameters: Parameters,
    pub curve: Ellipse,
    pub system: System,
}

impl Scenario {
    pub fn build_scenario(cfg: ScenarioConfig) -> SimResult<Self> {
        cfg.validate()?;

        // Engine (runtime) from EngineConfig
        let engine = Engine::from_config(&cfg.engine);

        // Curve: the arc-length method is part of the geometry value
        let curve = Ellipse::new(cfg.curve.a, cfg.curve.b)?.with_arc_length(engine.arc_length);

        // Parameters (runtime) from ParametersConfig + ProjectionConfig
        let parameters = Parameters::from_config(&cfg.parameters, &cfg.projection);

        let particles = match &cfg.particles.initial {
            Some(_) => place_explicit(&curve, &cfg.particles)?,
            None => sample_particles(&curve, &cfg.particles)?,
        };

        // Initial system state: particles at t = 0, E0 fixed here
        let system = System::new(particles, &curve);
        info!(
            "scenario: a = {}, b = {} (e = {:.4}), N = {}, E0 = {:.6e}",
            curve.semi_major(),
            curve.semi_minor(),
            curve.eccentricity(),
            system.len(),
            system.e0
        );

        Ok(Self {
            engine,
            parameters,
            curve,
            system,
        })
    }
}

fn overlaps(curve: &Ellipse, placed: &[Particle], candidate: &Particle) -> bool {
    placed
        .iter()
        .any(|p| curve.arc_length(p.phi, candidate.phi) <= p.radius + candidate.radius)
}

/// Uniform rejection sampling against geodesic overlap
pub fn sample_particles(curve: &Ellipse, cfg: &ParticlesConfig) -> SimResult<Vec<Particle>> {
    let n = cfg.n;
    let occupied = 2.0 * cfg.radius * n as f64;
    if occupied >= curve.perimeter() {
        return Err(SimError::config(format!(
            "{n} particles of radius {} need arc length {occupied:.6} but the perimeter is {:.6}",
            cfg.radius,
            curve.perimeter()
        )));
    }

    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let mut particles: Vec<Particle> = Vec::with_capacity(n);
    let budget = cfg.max_placement_attempts.saturating_mul(n);
    let mut attempts = 0usize;

    while particles.len() < n {
        if attempts >= budget {
            return Err(SimError::config(format!(
                "placed only {} of {n} particles without overlap after {attempts} attempts",
                particles.len()
            )));
        }
        attempts += 1;

        let phi = rng.gen_range(0.0..TAU);
        let phidot = rng.gen_range(-cfg.max_speed..=cfg.max_speed);
        let candidate = Particle::new(particles.len(), phi, phidot, cfg.mass, cfg.radius);
        if !overlaps(curve, &particles, &candidate) {
            particles.push(candidate);
        }
    }

    debug!("placed {n} particles in {attempts} attempts");
    Ok(particles)
}

/// Particles listed in the configuration, checked for overlap
pub fn place_explicit(curve: &Ellipse, cfg: &ParticlesConfig) -> SimResult<Vec<Particle>> {
    let initial = cfg.initial.as_deref().unwrap_or_default();
    let mut particles: Vec<Particle> = Vec::with_capacity(initial.len());

    for (id, pc) in initial.iter().enumerate() {
        let candidate = Particle::new(
            id,
            pc.phi,
            pc.phidot,
            pc.mass.unwrap_or(cfg.mass),
            pc.radius.unwrap_or(cfg.radius),
        );
        if overlaps(curve, &particles, &candidate) {
            return Err(SimError::config(format!(
                "particle {id} at phi = {} overlaps an earlier particle",
                pc.phi
            )));
        }
        particles.push(candidate);
    }
    Ok(particles)
}
