use std::f64::consts::TAU;
use std::time::Instant;

use crate::simulation::detector::CollisionDetector;
use crate::simulation::engine::Engine;
use crate::simulation::geometry::Ellipse;
use crate::simulation::integrator::{advance_all, advance_all_parallel};
use crate::simulation::params::Parameters;
use crate::simulation::runner::Simulation;
use crate::simulation::states::{Particle, System};

/// Helper to build a manual System of size `n`, evenly spaced, no rand needed
fn make_system(curve: &Ellipse, n: usize, radius: f64) -> System {
    let particles = (0..n)
        .map(|i| {
            let i_f = i as f64;
            let phi = TAU * i_f / n as f64;
            let phidot = (i_f * 0.37).sin();
            Particle::new(i, phi, phidot, 1.0, radius)
        })
        .collect();

    System::new(particles, curve)
}

/// Helper to build run parameters for the sweeps
fn make_params(t_max: f64) -> Parameters {
    Parameters {
        t_max,
        dt_max: 1.0e-3,
        dt_min: 1.0e-12,
        save_interval: t_max,
        max_steps: 10_000_000,
        max_consecutive_micro_steps: 100_000,
        drift_warning: 1.0e-6,
        projection_enabled: true,
        projection_interval: 100,
    }
}

pub fn bench_integrator() {
    let Ok(curve) = Ellipse::new(2.0, 1.0) else {
        return;
    };
    let ns = [1_000, 10_000, 100_000, 1_000_000];
    let steps = 100;

    for n in ns {
        let template = make_system(&curve, n, 1.0e-6);

        let mut seq = template.clone();
        let t0 = Instant::now();
        for _ in 0..steps {
            advance_all(&curve, &mut seq.particles, 1.0e-3);
        }
        let dt_seq = t0.elapsed().as_secs_f64() / steps as f64;

        let mut par = template.clone();
        let t1 = Instant::now();
        for _ in 0..steps {
            advance_all_parallel(&curve, &mut par.particles, 1.0e-3);
        }
        let dt_par = t1.elapsed().as_secs_f64() / steps as f64;

        println!("N = {n:8}, sequential step = {dt_seq:8.6} s, parallel step = {dt_par:8.6} s");
    }
}

pub fn bench_detector() {
    let Ok(curve) = Ellipse::new(2.0, 1.0) else {
        return;
    };
    let ns = [25, 50, 100, 200, 400, 800, 1600];

    let sequential = match CollisionDetector::new(&Engine::sequential()) {
        Ok(d) => d,
        Err(e) => {
            println!("cannot build sequential detector: {e}");
            return;
        }
    };
    let parallel = match CollisionDetector::new(&Engine::default()) {
        Ok(d) => d,
        Err(e) => {
            println!("cannot build parallel detector: {e}");
            return;
        }
    };

    for n in ns {
        let sys = make_system(&curve, n, 0.1 * curve.perimeter() / (2.0 * n as f64));

        // Warm up
        let _ = parallel.detect_parallel(&curve, &sys.particles, 1.0e-2);

        let t0 = Instant::now();
        let seq = sequential.detect_sequential(&curve, &sys.particles, 1.0e-2);
        let dt_seq = t0.elapsed().as_secs_f64();

        let t1 = Instant::now();
        let par = parallel.detect_parallel(&curve, &sys.particles, 1.0e-2);
        let dt_par = t1.elapsed().as_secs_f64();

        let agree = match (&seq, &par) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        };
        println!(
            "N = {n:5}, pairs = {:8}, sequential = {dt_seq:8.6} s, \
             parallel = {dt_par:8.6} s, agree = {agree}",
            n * (n - 1) / 2
        );
    }
}

pub fn bench_run() {
    let Ok(curve) = Ellipse::new(2.0, 1.0) else {
        return;
    };
    let ns = [10, 20, 40, 80];
    let t_max = 5.0;

    for n in ns {
        let sys = make_system(&curve, n, 0.2 * curve.perimeter() / (2.0 * n as f64));
        let run = Simulation::new(curve, make_params(t_max), Engine::default(), sys)
            .and_then(|sim| sim.run());

        match run {
            Ok(out) => println!(
                "N = {n:4}, steps = {:8}, collisions = {:8}, drift = {:10.3e}, wall = {:8.4} s",
                out.summary.steps,
                out.summary.collisions,
                out.summary.final_drift,
                out.summary.wall_clock_secs
            ),
            Err(e) => println!("N = {n:4}, run failed: {e}"),
        }
    }
}
