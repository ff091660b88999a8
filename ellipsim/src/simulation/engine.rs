//! High-level runtime engine settings
//!
//! Selects the resolution strategy, the prediction model, the arc-length
//! method and the threading used when building and running a `Simulation`

use crate::configuration::config::{
    ArcLengthMethod, EngineConfig, PredictionModel, ResolutionStrategy,
};

pub const DEFAULT_PARALLEL_THRESHOLD: usize = 50;
pub const DEFAULT_BISECTION_TOLERANCE: f64 = 1.0e-12;
pub const DEFAULT_BISECTION_ITERATIONS: u32 = 50;

#[derive(Debug, Clone)]
pub struct Engine {
    pub resolution: ResolutionStrategy, // cartesian impulse or intrinsic
    pub prediction: PredictionModel, // geodesic bisection or chord closed form
    pub arc_length: ArcLengthMethod, // midpoint or quadrature
    pub parallel: bool, // false = sequential scan only
    pub workers: usize, // size of the fixed worker pool
    pub parallel_threshold: usize, // N below which the scan stays sequential
    pub bisection_tolerance: f64, // width of the final contact-time bracket
    pub bisection_max_iterations: u32, // bisection bound
}

impl Engine {
    pub fn from_config(e_cfg: &EngineConfig) -> Self {
        Self {
            resolution: e_cfg.resolution,
            prediction: e_cfg.prediction,
            arc_length: e_cfg.arc_length,
            parallel: e_cfg.parallel,
            workers: e_cfg.workers.unwrap_or_else(available_workers),
            parallel_threshold: e_cfg.parallel_threshold.unwrap_or(DEFAULT_PARALLEL_THRESHOLD),
            bisection_tolerance: e_cfg.bisection_tolerance.unwrap_or(DEFAULT_BISECTION_TOLERANCE),
            bisection_max_iterations: e_cfg
                .bisection_max_iterations
                .unwrap_or(DEFAULT_BISECTION_ITERATIONS),
        }
    }

    /// Single-threaded engine with default numerics
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            workers: 1,
            ..Self::default()
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

fn available_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
