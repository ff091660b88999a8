//! Numerical parameters for the simulation loop
//!
//! `Parameters` holds runtime settings:
//! - time horizon and advance-step bounds,
//! - snapshot spacing,
//! - projection schedule,
//! - safety ceilings and the soft drift threshold

use crate::configuration::config::{ParametersConfig, ProjectionConfig};

pub const DEFAULT_MAX_STEPS: u64 = 50_000_000;
pub const DEFAULT_MAX_MICRO_STEPS: u64 = 100_000;
pub const DEFAULT_DRIFT_WARNING: f64 = 1.0e-6;

#[derive(Debug, Clone)]
pub struct Parameters {
    pub t_max: f64, // time end
    pub dt_max: f64, // detection horizon, largest step
    pub dt_min: f64, // step floor
    pub save_interval: f64, // snapshot spacing
    pub max_steps: u64, // step ceiling
    pub max_consecutive_micro_steps: u64, // consecutive sub-dt_min events before aborting
    pub drift_warning: f64, // soft |dE/E0| threshold
    pub projection_enabled: bool, // energy projection on/off
    pub projection_interval: u64, // steps between projections
}

impl Parameters {
    pub fn from_config(p_cfg: &ParametersConfig, proj_cfg: &ProjectionConfig) -> Self {
        Self {
            t_max: p_cfg.t_max,
            dt_max: p_cfg.dt_max,
            dt_min: p_cfg.dt_min,
            save_interval: p_cfg.save_interval,
            max_steps: p_cfg.max_steps.unwrap_or(DEFAULT_MAX_STEPS),
            max_consecutive_micro_steps: p_cfg
                .max_consecutive_micro_steps
                .unwrap_or(DEFAULT_MAX_MICRO_STEPS),
            drift_warning: p_cfg.drift_warning.unwrap_or(DEFAULT_DRIFT_WARNING),
            projection_enabled: proj_cfg.enabled,
            projection_interval: proj_cfg.interval,
        }
    }

    /// Upper bound on the number of snapshots a run can record
    pub fn snapshot_capacity(&self) -> usize {
        ((self.t_max / self.save_interval).ceil() as usize).saturating_add(2)
    }
}
