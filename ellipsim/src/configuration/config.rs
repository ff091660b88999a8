//! Configuration types for simulation scenarios.
//!
//! This module defines a thin, `serde`-deserializable representation of a
//! scenario. A scenario consists of:
//!
//! - [`CurveConfig`]      – semi-axes of the ellipse
//! - [`ParticlesConfig`]  – how many particles, their mass/radius and initial sampling
//! - [`ParametersConfig`] – time horizon, step bounds and safety ceilings
//! - [`ProjectionConfig`] – periodic energy projection
//! - [`EngineConfig`]     – strategy selectors and threading
//! - [`ScenarioConfig`]   – top-level wrapper
//!
//! The library never reads files; the binary loads these from YAML.
//!
//! # YAML format
//!
//! ```yaml
//! curve:
//!   a: 2.0
//!   b: 1.0
//!
//! particles:
//!   n: 64
//!   mass: 1.0
//!   radius: 0.02
//!   max_speed: 1.0
//!   seed: 42
//!
//! parameters:
//!   t_max: 50.0
//!   dt_max: 0.01
//!   dt_min: 1.0e-10
//!   save_interval: 0.5
//!
//! projection:
//!   enabled: true
//!   interval: 100
//!
//! engine:
//!   resolution: "cartesian_impulse"   # or "intrinsic"
//!   prediction: "geodesic"            # or "chord"
//!   arc_length: "quadrature"          # or "midpoint"
//!   parallel: true
//! ```
//!
//! The scenario builder maps this onto the runtime `Engine`, `Parameters`,
//! `Ellipse` and `System`.

use serde::{Deserialize, Serialize};

/// Most snapshots a run may plan for, `t_max / save_interval`
pub const MAX_SNAPSHOTS: f64 = 1.0e7;

use crate::error::{SimError, SimResult};

/// How post-collision velocities are computed
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionStrategy {
    #[default]
    // elastic impulse along the chord normal, mapped back onto the tangent
    #[serde(rename = "cartesian_impulse")]
    CartesianImpulse,

    #[serde(rename = "intrinsic")] // 1D elastic collision of the speeds measured along the curve
    Intrinsic,
}

/// How the detector extrapolates a pair towards contact
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PredictionModel {
    #[default]
    #[serde(rename = "geodesic")] // arc-length gap, bisected for the first zero
    Geodesic,

    // closed-form Euclidean contact of straight-line motion, low eccentricity only
    #[serde(rename = "chord")]
    Chord,
}

/// How geodesic distance is evaluated
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArcLengthMethod {
    #[serde(rename = "midpoint")] // sqrt(g(mid)) |dphi|, first order
    Midpoint,

    #[default]
    #[serde(rename = "quadrature")] // composite Gauss-Legendre
    Quadrature,
}

/// Semi-axes of the ellipse, `a >= b > 0`
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct CurveConfig {
    pub a: f64,
    pub b: f64,
}

/// Explicit initial state of one particle
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ParticleConfig {
    pub phi: f64,            // angle
    pub phidot: f64,         // angular velocity
    pub mass: Option<f64>,   // defaults to `particles.mass`
    pub radius: Option<f64>, // defaults to `particles.radius`
}

/// Particle population and initial sampling
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ParticlesConfig {
    pub n: usize,       // number of particles
    pub mass: f64,      // mass of every sampled particle
    pub radius: f64,    // collision radius of every sampled particle
    pub max_speed: f64, // phidot is drawn uniformly from [-max_speed, max_speed]
    pub seed: u64,      // deterministic seed to make runs reproducible
    #[serde(default)]
    pub initial: Option<Vec<ParticleConfig>>, // explicit placement instead of sampling
    #[serde(default = "default_placement_attempts")]
    pub max_placement_attempts: usize, // rejection-sampling attempts per particle
}

/// Time horizon, step bounds and safety ceilings
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ParametersConfig {
    pub t_max: f64,         // time end
    pub dt_max: f64,        // detection horizon and largest free step
    pub dt_min: f64,        // floor on the advance step
    pub save_interval: f64, // snapshot spacing
    #[serde(default)]
    pub max_steps: Option<u64>, // hard step ceiling
    #[serde(default)]
    pub max_consecutive_micro_steps: Option<u64>, // consecutive sub-dt_min events before aborting
    #[serde(default)]
    pub drift_warning: Option<f64>, // soft |dE/E0| threshold
}

/// Periodic energy projection
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ProjectionConfig {
    pub enabled: bool,
    pub interval: u64, // loop steps between projections
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: 100,
        }
    }
}

/// Strategy selectors and threading
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct EngineConfig {
    #[serde(default)]
    pub resolution: ResolutionStrategy,
    #[serde(default)]
    pub prediction: PredictionModel,
    #[serde(default)]
    pub arc_length: ArcLengthMethod,
    #[serde(default = "default_parallel")]
    pub parallel: bool, // use a worker pool for the pair scan
    #[serde(default)]
    pub workers: Option<usize>, // pool size, defaults to available parallelism
    #[serde(default)]
    pub parallel_threshold: Option<usize>, // below this N the scan stays sequential
    #[serde(default)]
    pub bisection_tolerance: Option<f64>,
    #[serde(default)]
    pub bisection_max_iterations: Option<u32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            resolution: ResolutionStrategy::default(),
            prediction: PredictionModel::default(),
            arc_length: ArcLengthMethod::default(),
            parallel: default_parallel(),
            workers: None,
            parallel_threshold: None,
            bisection_tolerance: None,
            bisection_max_iterations: None,
        }
    }
}

/// Top-level scenario configuration
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ScenarioConfig {
    pub curve: CurveConfig,
    pub particles: ParticlesConfig,
    pub parameters: ParametersConfig,
    #[serde(default)]
    pub projection: ProjectionConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

fn default_placement_attempts() -> usize {
    10_000
}

fn default_parallel() -> bool {
    true
}

fn positive(name: &str, value: f64) -> SimResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SimError::config(format!("{name} must be finite and > 0, got {value}")))
    }
}

impl ScenarioConfig {
    /// Reject configurations that cannot start; geometry and overlap are
    /// checked again by the scenario builder
    pub fn validate(&self) -> SimResult<()> {
        positive("curve.a", self.curve.a)?;
        positive("curve.b", self.curve.b)?;

        let p = &self.particles;
        if p.n == 0 {
            return Err(SimError::config("particles.n must be > 0"));
        }
        positive("particles.mass", p.mass)?;
        positive("particles.radius", p.radius)?;
        if !p.max_speed.is_finite() || p.max_speed < 0.0 {
            return Err(SimError::config(format!(
                "particles.max_speed must be finite and >= 0, got {}",
                p.max_speed
            )));
        }
        if p.max_placement_attempts == 0 {
            return Err(SimError::config("particles.max_placement_attempts must be > 0"));
        }
        if let Some(initial) = &p.initial {
            if initial.len() != p.n {
                return Err(SimError::config(format!(
                    "particles.initial lists {} particles but particles.n = {}",
                    initial.len(),
                    p.n
                )));
            }
            for (k, pc) in initial.iter().enumerate() {
                if !pc.phi.is_finite() || !pc.phidot.is_finite() {
                    return Err(SimError::config(format!("particles.initial[{k}] is not finite")));
                }
                if let Some(m) = pc.mass {
                    positive(&format!("particles.initial[{k}].mass"), m)?;
                }
                if let Some(r) = pc.radius {
                    positive(&format!("particles.initial[{k}].radius"), r)?;
                }
            }
        }

        let q = &self.parameters;
        positive("parameters.t_max", q.t_max)?;
        positive("parameters.dt_max", q.dt_max)?;
        positive("parameters.dt_min", q.dt_min)?;
        positive("parameters.save_interval", q.save_interval)?;
        let planned = q.t_max / q.save_interval;
        if planned > MAX_SNAPSHOTS {
            return Err(SimError::config(format!(
                "parameters.t_max / save_interval plans {planned:.3e} snapshots, \
                 at most {MAX_SNAPSHOTS:.0e}"
            )));
        }
        if q.dt_min > q.dt_max {
            return Err(SimError::config(format!(
                "parameters.dt_min ({}) must not exceed dt_max ({})",
                q.dt_min, q.dt_max
            )));
        }
        if let Some(w) = q.drift_warning {
            positive("parameters.drift_warning", w)?;
        }

        if self.projection.enabled && self.projection.interval == 0 {
            return Err(SimError::config("projection.interval must be > 0"));
        }

        if let Some(tol) = self.engine.bisection_tolerance {
            positive("engine.bisection_tolerance", tol)?;
        }
        if self.engine.workers == Some(0) {
            return Err(SimError::config("engine.workers must be > 0"));
        }
        Ok(())
    }
}
