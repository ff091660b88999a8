//! Records produced by a run
//!
//! - `Snapshot`: full per-particle state at one instant
//! - `SnapshotBuffer`: fixed-capacity store sized from `t_max / save_interval`
//! - `ConservationRecord`: energy / momentum time series with drift flags
//! - `RunSummary`, `RunOutput`: what `Simulation::run` hands back
//!
//! All of these derive `Serialize` so downstream writers can dump them in
//! whatever format they like.

use serde::Serialize;

use crate::simulation::geometry::Ellipse;
use crate::simulation::states::{NVec2, System};

#[derive(Debug, Clone, Serialize)]
pub struct ParticleRecord {
    pub id: usize,
    pub phi: f64,
    pub phidot: f64,
    pub position: NVec2,
    pub velocity: NVec2,
    pub kinetic_energy: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub time: f64,
    pub step: u64,
    pub particles: Vec<ParticleRecord>,
}

impl Snapshot {
    pub fn capture(curve: &Ellipse, system: &System, step: u64) -> Self {
        let particles = system
            .particles
            .iter()
            .map(|p| ParticleRecord {
                id: p.id,
                phi: p.phi,
                phidot: p.phidot,
                position: p.position(curve),
                velocity: p.velocity(curve),
                kinetic_energy: p.kinetic_energy(curve),
            })
            .collect();

        Self {
            time: system.t,
            step,
            particles,
        }
    }

    pub fn total_energy(&self) -> f64 {
        self.particles.iter().map(|p| p.kinetic_energy).sum()
    }
}

/// Snapshot store with a hard capacity fixed before the run
#[derive(Debug, Clone)]
pub struct SnapshotBuffer {
    capacity: usize,
    records: Vec<Snapshot>,
    dropped: usize,
}

impl SnapshotBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            records: Vec::with_capacity(capacity),
            dropped: 0,
        }
    }

    /// Store a snapshot; returns `false` (and counts it) when full
    pub fn push(&mut self, snapshot: Snapshot) -> bool {
        if self.records.len() >= self.capacity {
            self.dropped += 1;
            return false;
        }
        self.records.push(snapshot);
        true
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn last(&self) -> Option<&Snapshot> {
        self.records.last()
    }

    pub fn as_slice(&self) -> &[Snapshot] {
        &self.records
    }

    /// Hand the recorded snapshots over, releasing unused slots
    pub fn finish(mut self) -> Vec<Snapshot> {
        self.records.shrink_to_fit();
        self.records
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ConservationSample {
    pub time: f64,
    pub energy: f64,
    pub momentum: NVec2,
    pub relative_drift: f64,
    pub drift_warning: bool, // |relative_drift| above the soft threshold
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ConservationRecord {
    pub samples: Vec<ConservationSample>,
}

impl ConservationRecord {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
        }
    }

    /// Sample the system; flags the sample when drift exceeds `threshold`
    pub fn record(
        &mut self,
        curve: &Ellipse,
        system: &System,
        threshold: f64,
    ) -> ConservationSample {
        let relative_drift = system.relative_drift(curve);
        let sample = ConservationSample {
            time: system.t,
            energy: system.total_energy(curve),
            momentum: system.total_momentum(curve),
            relative_drift,
            drift_warning: relative_drift.abs() > threshold,
        };
        self.samples.push(sample);
        sample
    }

    pub fn warnings(&self) -> usize {
        self.samples.iter().filter(|s| s.drift_warning).count()
    }

    pub fn max_abs_drift(&self) -> f64 {
        self.samples
            .iter()
            .map(|s| s.relative_drift.abs())
            .fold(0.0, f64::max)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub collisions: u64,       // resolved collisions
    pub grazing: u64,          // events the resolver found already separating
    pub steps: u64,            // loop cycles
    pub micro_steps: u64,      // events closer than dt_min
    pub projections: u64,      // energy projections applied
    pub final_time: f64,
    pub final_energy: f64,
    pub final_drift: f64,      // (E - E0) / E0 at the end of the run
    pub drift_warnings: usize, // conservation samples over the soft threshold
    pub snapshots_dropped: usize,
    pub wall_clock_secs: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunOutput {
    pub snapshots: Vec<Snapshot>,
    pub conservation: ConservationRecord,
    pub summary: RunSummary,
}
