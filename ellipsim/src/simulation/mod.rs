pub mod geometry;
pub mod states;
pub mod params;
pub mod engine;
pub mod integrator;
pub mod detector;
pub mod resolver;
pub mod projector;
pub mod records;
pub mod scenario;
pub mod runner;
