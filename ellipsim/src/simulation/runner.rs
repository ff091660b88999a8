//! Event-driven simulation loop
//!
//! One cycle of [`Simulation::step`]:
//!
//! 1. ask the detector for the earliest contact within `dt_max`
//! 2. advance every particle by `clamp(dt_event, dt_min, dt_max)`, never
//!    past `t_max`
//! 3. resolve the colliding pair if its contact time was reached
//! 4. apply the energy projection when the step counter hits the interval
//! 5. record a snapshot and a conservation sample when a save boundary is
//!    crossed
//!
//! The run ends at `t_max`. Exceeding the step ceiling, a cascade of
//! sub-`dt_min` events, or any non-finite state aborts it with the last
//! valid snapshot attached to the error.

use std::time::Instant;

use log::{debug, info, trace, warn};

use crate::error::{Instability, SimError, SimResult};
use crate::simulation::detector::{CollisionDetector, CollisionEvent};
use crate::simulation::engine::Engine;
use crate::simulation::geometry::Ellipse;
use crate::simulation::integrator::{advance_all, advance_all_parallel};
use crate::simulation::params::Parameters;
use crate::simulation::projector::{EnergyProjector, Projection};
use crate::simulation::records::{
    ConservationRecord, RunOutput, RunSummary, Snapshot, SnapshotBuffer,
};
use crate::simulation::resolver::{resolve_pair, CollisionOutcome};
use crate::simulation::scenario::Scenario;
use crate::simulation::states::System;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Terminal,
}

/// What one call to [`Simulation::step`] did
#[derive(Debug, Clone)]
pub struct StepReport {
    pub dt: f64,                            // time actually advanced
    pub event: Option<CollisionEvent>,      // earliest predicted contact
    pub outcome: Option<CollisionOutcome>,  // resolver result if the contact was reached
    pub projection: Option<Projection>,     // energy projection applied this step
    pub snapshot: bool,                     // a snapshot was recorded
}

#[derive(Debug, Clone, Default)]
struct Counters {
    steps: u64,
    collisions: u64,
    grazing: u64,
    micro_steps: u64,
    consecutive_micro: u64,
    projections: u64,
    saves: u64, // save boundaries passed
}

pub struct Simulation {
    curve: Ellipse,
    parameters: Parameters,
    engine: Engine,
    system: System,
    detector: CollisionDetector,
    projector: EnergyProjector,
    snapshots: SnapshotBuffer,
    conservation: ConservationRecord,
    counters: Counters,
    state: LoopState,
}

impl Simulation {
    /// Set up a run over `system`; records the t = 0 snapshot
    pub fn new(
        curve: Ellipse,
        parameters: Parameters,
        engine: Engine,
        system: System,
    ) -> SimResult<Self> {
        let detector = CollisionDetector::new(&engine)?;
        let projector =
            EnergyProjector::new(parameters.projection_enabled, parameters.projection_interval);
        let capacity = parameters.snapshot_capacity();

        let mut sim = Self {
            curve,
            parameters,
            engine,
            system,
            detector,
            projector,
            snapshots: SnapshotBuffer::with_capacity(capacity),
            conservation: ConservationRecord::with_capacity(capacity),
            counters: Counters::default(),
            state: LoopState::Running,
        };
        sim.check_state()?;
        sim.record();
        Ok(sim)
    }

    pub fn from_scenario(scenario: Scenario) -> SimResult<Self> {
        let Scenario {
            engine,
            parameters,
            curve,
            system,
        } = scenario;
        Self::new(curve, parameters, engine, system)
    }

    pub fn curve(&self) -> &Ellipse {
        &self.curve
    }

    pub fn system(&self) -> &System {
        &self.system
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        self.snapshots.as_slice()
    }

    pub fn conservation(&self) -> &ConservationRecord {
        &self.conservation
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state == LoopState::Terminal
    }

    pub fn collisions(&self) -> u64 {
        self.counters.collisions
    }

    pub fn steps(&self) -> u64 {
        self.counters.steps
    }

    /// Run one detect / advance / resolve / project / save cycle
    pub fn step(&mut self) -> SimResult<StepReport> {
        let t = self.system.t;
        self.cycle()
            .map_err(|e| e.with_context(t, self.snapshots.last().cloned()))
    }

    fn cycle(&mut self) -> SimResult<StepReport> {
        let remaining = self.parameters.t_max - self.system.t;
        if self.is_finished() || remaining <= 0.0 {
            self.finish_run();
            return Ok(StepReport {
                dt: 0.0,
                event: None,
                outcome: None,
                projection: None,
                snapshot: false,
            });
        }
        if self.counters.steps >= self.parameters.max_steps {
            return Err(SimError::instability(
                self.system.t,
                Instability::StepCeiling {
                    limit: self.parameters.max_steps,
                },
            ));
        }

        // Detect
        let dt_max = self.parameters.dt_max;
        let event = self
            .detector
            .detect(&self.curve, &self.system.particles, dt_max)?;

        // Advance, never below the floor, never past t_max
        let target = event.map_or(dt_max, |ev| ev.dt.max(self.parameters.dt_min));
        let mut dt = target.min(dt_max).min(remaining);
        self.track_micro_steps(event)?;

        // Pull the step back if the integrated motion overlaps a pair first
        let mut event = event;
        if let Some(found) = self
            .detector
            .integrated_contact(&self.curve, &self.system.particles, dt)
        {
            let refined = found.dt.max(self.parameters.dt_min.min(dt));
            debug!(
                "t = {:.9}: step {:.3e} shortened to {:.3e} for pair ({}, {})",
                self.system.t, dt, refined, found.i, found.j
            );
            dt = refined;
            event = Some(CollisionEvent { dt, ..found });
        }
        self.advance(dt);
        self.system.t = if dt >= remaining { self.parameters.t_max } else { self.system.t + dt };
        self.check_state()?;

        // Resolve
        let outcome = match event {
            Some(ev) if ev.dt <= dt => Some(self.resolve(ev)),
            _ => None,
        };

        self.counters.steps += 1;

        // Project
        let projection = self
            .projector
            .apply(&self.curve, &mut self.system, self.counters.steps);
        if let Some(p) = projection {
            self.counters.projections += 1;
            debug!(
                "projection at t = {:.6}: drift {:.3e}, scale {:.15}",
                self.system.t, p.drift_before, p.scale
            );
        }

        // Save
        let snapshot = self.save_if_due();

        if self.system.t >= self.parameters.t_max {
            self.finish_run();
        }

        Ok(StepReport {
            dt,
            event,
            outcome,
            projection,
            snapshot,
        })
    }

    /// Drive the loop to `t_max`
    pub fn run(mut self) -> SimResult<RunOutput> {
        let started = Instant::now();
        info!(
            "run: N = {}, t_max = {}, dt_max = {}, parallel scan = {}",
            self.system.len(),
            self.parameters.t_max,
            self.parameters.dt_max,
            self.detector.runs_parallel(self.system.len())
        );

        while !self.is_finished() {
            self.step()?;
        }

        let final_energy = self.system.total_energy(&self.curve);
        let summary = RunSummary {
            collisions: self.counters.collisions,
            grazing: self.counters.grazing,
            steps: self.counters.steps,
            micro_steps: self.counters.micro_steps,
            projections: self.counters.projections,
            final_time: self.system.t,
            final_energy,
            final_drift: self.system.relative_drift(&self.curve),
            drift_warnings: self.conservation.warnings(),
            snapshots_dropped: self.snapshots.dropped(),
            wall_clock_secs: started.elapsed().as_secs_f64(),
        };
        info!(
            "done: {} steps, {} collisions, final drift {:.3e}, {:.3} s",
            summary.steps, summary.collisions, summary.final_drift, summary.wall_clock_secs
        );

        Ok(RunOutput {
            snapshots: self.snapshots.finish(),
            conservation: self.conservation,
            summary,
        })
    }

    fn track_micro_steps(&mut self, event: Option<CollisionEvent>) -> SimResult<()> {
        match event {
            Some(ev) if ev.dt < self.parameters.dt_min => {
                self.counters.micro_steps += 1;
                self.counters.consecutive_micro += 1;
                if self.counters.consecutive_micro > self.parameters.max_consecutive_micro_steps {
                    return Err(SimError::instability(
                        self.system.t,
                        Instability::MicroStepCascade {
                            count: self.counters.consecutive_micro,
                        },
                    ));
                }
            }
            _ => self.counters.consecutive_micro = 0,
        }
        Ok(())
    }

    fn advance(&mut self, dt: f64) {
        let n = self.system.len();
        match self.detector.pool() {
            Some(pool) if self.detector.runs_parallel(n) => {
                let curve = &self.curve;
                let particles = &mut self.system.particles;
                pool.install(|| advance_all_parallel(curve, particles, dt));
            }
            _ => advance_all(&self.curve, &mut self.system.particles, dt),
        }
    }

    fn resolve(&mut self, ev: CollisionEvent) -> CollisionOutcome {
        let outcome = resolve_pair(
            self.engine.resolution,
            &self.curve,
            &mut self.system.particles,
            ev.i,
            ev.j,
        );
        if outcome.is_resolved() {
            self.counters.collisions += 1;
            trace!("t = {:.9}: collision ({}, {})", self.system.t, ev.i, ev.j);
        } else {
            self.counters.grazing += 1;
            trace!("t = {:.9}: pair ({}, {}) already separating", self.system.t, ev.i, ev.j);
        }
        outcome
    }

    fn check_state(&self) -> SimResult<()> {
        for (index, p) in self.system.particles.iter().enumerate() {
            if !p.phi.is_finite() || !p.phidot.is_finite() {
                return Err(SimError::instability(self.system.t, Instability::NonFinite { index }));
            }
            let metric = self.curve.metric(p.phi);
            if !(metric > 0.0) {
                return Err(SimError::instability(
                    self.system.t,
                    Instability::NonPositiveMetric { index, metric },
                ));
            }
        }
        Ok(())
    }

    fn save_if_due(&mut self) -> bool {
        let boundary = |k: u64| k as f64 * self.parameters.save_interval;
        if self.system.t < boundary(self.counters.saves + 1) {
            return false;
        }
        // skip every boundary this step jumped over
        while self.system.t >= boundary(self.counters.saves + 1) {
            self.counters.saves += 1;
        }
        self.record()
    }

    fn record(&mut self) -> bool {
        let sample = self
            .conservation
            .record(&self.curve, &self.system, self.parameters.drift_warning);
        if sample.drift_warning {
            warn!(
                "energy drift {:.3e} at t = {:.6} exceeds {:.1e}",
                sample.relative_drift, sample.time, self.parameters.drift_warning
            );
        }

        let stored = self
            .snapshots
            .push(Snapshot::capture(&self.curve, &self.system, self.counters.steps));
        if !stored {
            warn!("snapshot buffer full, dropping snapshot at t = {:.6}", self.system.t);
        }
        stored
    }

    fn finish_run(&mut self) {
        if self.state == LoopState::Terminal {
            return;
        }
        let last = self.snapshots.last().map(|s| s.time);
        if last.map_or(true, |time| time < self.system.t) {
            self.record();
        }
        self.state = LoopState::Terminal;
    }
}
