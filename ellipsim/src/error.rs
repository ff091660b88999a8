//! Error types for the ellipse simulator
//!
//! Configuration problems are caught before the run starts. Numerical
//! instabilities abort a running simulation and carry the last valid
//! snapshot so the caller can still inspect how far the run got.

use thiserror::Error;

use crate::simulation::records::Snapshot;

pub type SimResult<T> = Result<T, SimError>;

/// What went wrong numerically during a run
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Instability {
    #[error("step ceiling of {limit} steps exceeded")]
    StepCeiling { limit: u64 },

    #[error("{count} consecutive events closer than dt_min")]
    MicroStepCascade { count: u64 },

    #[error("bisection for pair ({i}, {j}) did not converge in {iterations} iterations")]
    BisectionDiverged { i: usize, j: usize, iterations: u32 },

    #[error("particle {index} has a non-finite state")]
    NonFinite { index: usize },

    #[error("metric is not positive at particle {index}: g = {metric}")]
    NonPositiveMetric { index: usize, metric: f64 },
}

#[derive(Error, Debug)]
pub enum SimError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("numerical instability at t = {time}: {reason}")]
    NumericalInstability {
        time: f64,
        reason: Instability,
        last_snapshot: Option<Box<Snapshot>>,
    },
}

impl SimError {
    pub fn config(msg: impl Into<String>) -> Self {
        SimError::Configuration(msg.into())
    }

    /// Instability without a snapshot; pass `f64::NAN` when the time is not
    /// known where the error is raised
    pub fn instability(time: f64, reason: Instability) -> Self {
        SimError::NumericalInstability {
            time,
            reason,
            last_snapshot: None,
        }
    }

    /// Fill in the run time (if unknown) and the last valid snapshot
    pub fn with_context(self, now: f64, snapshot: Option<Snapshot>) -> Self {
        match self {
            SimError::NumericalInstability { time, reason, .. } => {
                SimError::NumericalInstability {
                    time: if time.is_nan() { now } else { time },
                    reason,
                    last_snapshot: snapshot.map(Box::new),
                }
            }
            other => other,
        }
    }
}
