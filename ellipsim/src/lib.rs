pub mod simulation;
pub mod configuration;
pub mod benchmark;
pub mod error;

pub use simulation::geometry::{normalize_angle, wrap_angle, Ellipse};
pub use simulation::states::{Particle, System, NVec2};
pub use simulation::integrator::{advance, advance_all, advance_all_parallel};
pub use simulation::detector::{CollisionDetector, CollisionEvent};
pub use simulation::resolver::{resolve_pair, CollisionOutcome};
pub use simulation::projector::{project_energy, EnergyProjector, Projection};
pub use simulation::records::{
    ConservationRecord, ConservationSample, RunOutput, RunSummary, Snapshot,
};
pub use simulation::engine::Engine;
pub use simulation::params::Parameters;
pub use simulation::scenario::Scenario;
pub use simulation::runner::{LoopState, Simulation, StepReport};

pub use configuration::config::{
    ArcLengthMethod, CurveConfig, EngineConfig, ParametersConfig, ParticleConfig, ParticlesConfig,
    PredictionModel, ProjectionConfig, ResolutionStrategy, ScenarioConfig,
};

pub use error::{Instability, SimError, SimResult};

pub use benchmark::benchmark::{bench_detector, bench_integrator, bench_run};
