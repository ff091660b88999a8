//! Earliest pairwise contact within a time horizon
//!
//! Every unordered pair `(i, j)` is extrapolated to first order,
//! `phi(t) = phi + phidot t`, and the first time its gap
//!
//! ```text
//! gap(t) = arc_length(phi_i(t), phi_j(t)) - (r_i + r_j)
//! ```
//!
//! reaches zero is found by bisection. The whole scan is O(N^2). Above a size
//! threshold the pair range is split statically over a fixed rayon pool; each
//! worker keeps its own minimum and the per-worker minima are reduced in
//! order afterwards. Ties are broken on `(dt, i, j)` so the sequential and the
//! parallel scans always agree.
//!
//! The first-order prediction drifts from the integrated geodesic motion on
//! strongly curved stretches. [`CollisionDetector::integrated_contact`] checks
//! a planned step against the integrator itself and returns the pair that
//! would end up overlapping, with its contact time refined by bisection.

use std::cmp::Ordering;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::configuration::config::{PredictionModel, ResolutionStrategy};
use crate::error::{Instability, SimError, SimResult};
use crate::simulation::engine::Engine;
use crate::simulation::geometry::{wrap_angle, Ellipse};
use crate::simulation::integrator::advance;
use crate::simulation::states::Particle;

/// Overlap along the curve tolerated at the end of a step
pub const CONTACT_SLACK: f64 = 1.0e-10;

// Headroom on the geodesic speed bound for the integrator's energy error
const REACH_MARGIN: f64 = 1.05;

/// Predicted contact of particles `i < j` after `dt`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionEvent {
    pub i: usize,
    pub j: usize,
    pub dt: f64,
}

impl CollisionEvent {
    /// Total order used to pick the earliest event
    pub fn cmp_order(&self, other: &Self) -> Ordering {
        self.dt
            .total_cmp(&other.dt)
            .then(self.i.cmp(&other.i))
            .then(self.j.cmp(&other.j))
    }
}

fn earliest(a: Option<CollisionEvent>, b: Option<CollisionEvent>) -> Option<CollisionEvent> {
    match (a, b) {
        (Some(x), Some(y)) => {
            if y.cmp_order(&x) == Ordering::Less {
                Some(y)
            } else {
                Some(x)
            }
        }
        (x, None) => x,
        (None, y) => y,
    }
}

/// Number of unordered pairs among `n` particles
pub fn pair_count(n: usize) -> usize {
    if n < 2 {
        0
    } else {
        n * (n - 1) / 2
    }
}

/// Linear index of the pair `i < j`: `k = j (j - 1) / 2 + i`
pub fn pair_index(i: usize, j: usize) -> usize {
    debug_assert!(i < j);
    j * (j - 1) / 2 + i
}

/// Inverse of [`pair_index`]
pub fn pair_from_index(k: usize) -> (usize, usize) {
    let mut j = ((1.0 + (1.0 + 8.0 * k as f64).sqrt()) / 2.0).floor() as usize;
    // float rounding can leave j off by one for very large k
    while j * (j - 1) / 2 > k {
        j -= 1;
    }
    while (j + 1) * j / 2 <= k {
        j += 1;
    }
    (k - j * (j - 1) / 2, j)
}

pub struct CollisionDetector {
    prediction: PredictionModel,
    strategy: ResolutionStrategy, // decides whether a touching pair is still closing
    tolerance: f64,
    max_iterations: u32,
    parallel_threshold: usize,
    workers: usize,
    pool: Option<ThreadPool>,
}

impl CollisionDetector {
    /// Build a detector; spawns the worker pool when the engine asks for one
    pub fn new(engine: &Engine) -> SimResult<Self> {
        let workers = engine.workers.max(1);
        let pool = if engine.parallel {
            let pool = ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|k| format!("ellipsim-detect-{k}"))
                .build()
                .map_err(|e| SimError::config(format!("cannot build worker pool: {e}")))?;
            Some(pool)
        } else {
            None
        };

        Ok(Self {
            prediction: engine.prediction,
            strategy: engine.resolution,
            tolerance: engine.bisection_tolerance,
            max_iterations: engine.bisection_max_iterations,
            parallel_threshold: engine.parallel_threshold,
            workers,
            pool,
        })
    }

    /// Worker pool, if the detector owns one
    pub fn pool(&self) -> Option<&ThreadPool> {
        self.pool.as_ref()
    }

    /// True when a scan over `n` particles would run on the pool
    pub fn runs_parallel(&self, n: usize) -> bool {
        self.pool.is_some() && n >= self.parallel_threshold
    }

    /// Earliest contact within `horizon`, or `None`
    pub fn detect(
        &self,
        curve: &Ellipse,
        particles: &[Particle],
        horizon: f64,
    ) -> SimResult<Option<CollisionEvent>> {
        if self.runs_parallel(particles.len()) {
            self.detect_parallel(curve, particles, horizon)
        } else {
            self.detect_sequential(curve, particles, horizon)
        }
    }

    /// Plain double loop over `i < j`
    pub fn detect_sequential(
        &self,
        curve: &Ellipse,
        particles: &[Particle],
        horizon: f64,
    ) -> SimResult<Option<CollisionEvent>> {
        let n = particles.len();
        let mut best = None;
        for i in 0..n {
            for j in (i + 1)..n {
                let event = self.predict_pair(curve, particles, i, j, horizon)?;
                best = earliest(best, event);
            }
        }
        Ok(best)
    }

    /// Static partition of the pair range over the pool, one private minimum
    /// per worker, sequential reduction. Falls back to the sequential scan
    /// when the detector has no pool
    pub fn detect_parallel(
        &self,
        curve: &Ellipse,
        particles: &[Particle],
        horizon: f64,
    ) -> SimResult<Option<CollisionEvent>> {
        let pool = match &self.pool {
            Some(pool) => pool,
            None => return self.detect_sequential(curve, particles, horizon),
        };

        let total = pair_count(particles.len());
        if total == 0 {
            return Ok(None);
        }
        let workers = self.workers.min(total);
        let chunk = total.div_ceil(workers);

        let partials: Vec<SimResult<Option<CollisionEvent>>> = pool.install(|| {
            (0..workers)
                .into_par_iter()
                .map(|w| {
                    let start = w * chunk;
                    let end = ((w + 1) * chunk).min(total);
                    self.scan_range(curve, particles, start, end, horizon)
                })
                .collect()
        });

        let mut best = None;
        for partial in partials {
            best = earliest(best, partial?);
        }
        Ok(best)
    }

    // Pairs with linear index in [start, end)
    fn scan_range(
        &self,
        curve: &Ellipse,
        particles: &[Particle],
        start: usize,
        end: usize,
        horizon: f64,
    ) -> SimResult<Option<CollisionEvent>> {
        if start >= end {
            return Ok(None);
        }
        let (mut i, mut j) = pair_from_index(start);
        let mut best = None;
        for _ in start..end {
            let event = self.predict_pair(curve, particles, i, j, horizon)?;
            best = earliest(best, event);

            // walk the column-major order: (0, j), (1, j), ..., (j - 1, j)
            i += 1;
            if i == j {
                i = 0;
                j += 1;
            }
        }
        Ok(best)
    }

    /// Prediction for a single pair `i < j`
    pub fn predict_pair(
        &self,
        curve: &Ellipse,
        particles: &[Particle],
        i: usize,
        j: usize,
        horizon: f64,
    ) -> SimResult<Option<CollisionEvent>> {
        let (pi, pj) = (&particles[i], &particles[j]);
        let dt = match self.prediction {
            PredictionModel::Geodesic => self.geodesic_contact(curve, pi, pj, i, j, horizon)?,
            PredictionModel::Chord => self.chord_contact(curve, pi, pj, horizon),
        };
        Ok(dt.map(|dt| CollisionEvent { i, j, dt }))
    }

    // Touching pair: immediate event if it is still closing
    fn contact_now(&self, curve: &Ellipse, pi: &Particle, pj: &Particle) -> Option<f64> {
        if self.strategy.is_closing(curve, pi, pj) {
            Some(0.0)
        } else {
            None
        }
    }

    fn geodesic_contact(
        &self,
        curve: &Ellipse,
        pi: &Particle,
        pj: &Particle,
        i: usize,
        j: usize,
        horizon: f64,
    ) -> SimResult<Option<f64>> {
        let contact = pi.radius + pj.radius;
        let delta0 = wrap_angle(pj.phi - pi.phi);
        let rel = pj.phidot - pi.phidot;

        // stop the bracket where the short-arc separation would hit zero
        let approaching = delta0 * rel < 0.0;
        let t_end = if approaching {
            (delta0.abs() / rel.abs()).min(horizon)
        } else {
            horizon
        };

        // arc >= b |dphi| and |dphi| shrinks at most at |rel|
        let closest = delta0.abs() - rel.abs() * t_end;
        if curve.metric_floor().sqrt() * closest > contact {
            return Ok(None);
        }

        let gap = |t: f64| {
            curve.arc_length(pi.phi + pi.phidot * t, pj.phi + pj.phidot * t) - contact
        };

        if gap(0.0) <= 0.0 {
            return Ok(self.contact_now(curve, pi, pj));
        }
        if gap(t_end) > 0.0 {
            return Ok(None);
        }

        let (mut lo, mut hi) = (0.0, t_end);
        for _ in 0..self.max_iterations {
            if hi - lo <= self.tolerance {
                break;
            }
            let mid = 0.5 * (lo + hi);
            let g = gap(mid);
            if g.is_nan() {
                break;
            }
            if g > 0.0 {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        if hi - lo > self.tolerance {
            return Err(SimError::instability(
                f64::NAN,
                Instability::BisectionDiverged {
                    i,
                    j,
                    iterations: self.max_iterations,
                },
            ));
        }
        Ok(Some(0.5 * (lo + hi)))
    }

    /// Earliest pair that starts apart but ends more than [`CONTACT_SLACK`]
    /// inside contact when every particle is integrated over `dt`. The
    /// returned `dt` is the integrated contact time, bisected to the
    /// detector's tolerance from the overlapping side.
    pub fn integrated_contact(
        &self,
        curve: &Ellipse,
        particles: &[Particle],
        dt: f64,
    ) -> Option<CollisionEvent> {
        if dt <= 0.0 || dt.is_nan() {
            return None;
        }
        // along a geodesic |phidot| <= |phidot_0| sqrt(g_0) / b, and arc >= b |dphi|
        let b = curve.metric_floor().sqrt();
        let reach: Vec<f64> = particles
            .iter()
            .map(|p| REACH_MARGIN * p.tangential_speed(curve).abs() / b * dt)
            .collect();

        let n = particles.len();
        let mut best = None;
        for i in 0..n {
            for j in (i + 1)..n {
                let (pi, pj) = (&particles[i], &particles[j]);
                let contact = pi.radius + pj.radius;
                let closest = wrap_angle(pj.phi - pi.phi).abs() - reach[i] - reach[j];
                if b * closest > contact {
                    continue;
                }

                let gap = |t: f64| {
                    let (phi_i, _) = advance(curve, pi.phi, pi.phidot, t);
                    let (phi_j, _) = advance(curve, pj.phi, pj.phidot, t);
                    curve.arc_length(phi_i, phi_j) - contact
                };
                if curve.arc_length(pi.phi, pj.phi) - contact <= 0.0 || gap(dt) >= -CONTACT_SLACK {
                    continue;
                }

                let (mut lo, mut hi) = (0.0, dt);
                for _ in 0..self.max_iterations {
                    if hi - lo <= self.tolerance {
                        break;
                    }
                    let mid = 0.5 * (lo + hi);
                    if gap(mid) > 0.0 {
                        lo = mid;
                    } else {
                        hi = mid;
                    }
                }
                best = earliest(best, Some(CollisionEvent { i, j, dt: hi }));
            }
        }
        best
    }

    // Closed form for |dp + dv t| = r_i + r_j with straight-line motion
    fn chord_contact(
        &self,
        curve: &Ellipse,
        pi: &Particle,
        pj: &Particle,
        horizon: f64,
    ) -> Option<f64> {
        let contact = pi.radius + pj.radius;
        let dp = pi.position(curve) - pj.position(curve);
        let dv = pi.velocity(curve) - pj.velocity(curve);

        let c = dp.norm_squared() - contact * contact;
        if c <= 0.0 {
            return self.contact_now(curve, pi, pj);
        }
        let b = dp.dot(&dv);
        if b >= 0.0 {
            return None;
        }
        let a = dv.norm_squared();
        let disc = b * b - a * c;
        if disc < 0.0 {
            return None;
        }
        // stable root of a t^2 + 2 b t + c = 0
        let t = c / (disc.sqrt() - b);
        if t <= horizon {
            Some(t)
        } else {
            None
        }
    }
}
