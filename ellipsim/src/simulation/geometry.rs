//! Differential geometry of the centred ellipse
//!
//! The curve is written in polar form around its centre,
//!
//! ```text
//! r(phi) = a b / sqrt(b^2 cos^2 phi + a^2 sin^2 phi)
//! gamma(phi) = (r cos phi, r sin phi)
//! ```
//!
//! and a particle at angle `phi` moving with `phidot` has physical speed
//! `sqrt(g(phi)) |phidot|` where `g = r^2 + r'^2` is the induced metric.
//! Everything here is a pure function of `phi` and the semi-axes; the
//! `Ellipse` value is passed explicitly wherever geometry is needed.

use std::f64::consts::{PI, TAU};

use crate::configuration::config::ArcLengthMethod;
use crate::error::{SimError, SimResult};
use crate::simulation::states::NVec2;

// 5-point Gauss-Legendre rule on [-1, 1]
const GL_NODES: [f64; 5] = [
    -0.906_179_845_938_664,
    -0.538_469_310_105_683_1,
    0.0,
    0.538_469_310_105_683_1,
    0.906_179_845_938_664,
];
const GL_WEIGHTS: [f64; 5] = [
    0.236_926_885_056_189_1,
    0.478_628_670_499_366_5,
    0.568_888_888_888_888_9,
    0.478_628_670_499_366_5,
    0.236_926_885_056_189_1,
];

/// Widest angular panel used by the composite quadrature
const PANEL_WIDTH: f64 = TAU / 64.0;

/// Reduce an angle into `[0, 2pi)`
pub fn normalize_angle(phi: f64) -> f64 {
    let x = phi.rem_euclid(TAU);
    // rem_euclid rounds tiny negative inputs up to exactly TAU
    if x >= TAU {
        0.0
    } else {
        x
    }
}

/// Signed angular difference reduced into `(-pi, pi]`
pub fn wrap_angle(delta: f64) -> f64 {
    let x = (delta + PI).rem_euclid(TAU) - PI;
    if x <= -PI {
        x + TAU
    } else {
        x
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipse {
    a: f64, // semi-major axis
    b: f64, // semi-minor axis
    arc_length: ArcLengthMethod,
    perimeter: f64,
}

impl Ellipse {
    /// Ellipse with semi-axes `a >= b > 0`, using quadrature arc lengths
    pub fn new(a: f64, b: f64) -> SimResult<Self> {
        if !a.is_finite() || !b.is_finite() {
            return Err(SimError::config(format!(
                "semi-axes must be finite, got a = {a}, b = {b}"
            )));
        }
        if b <= 0.0 {
            return Err(SimError::config(format!("semi-minor axis must be > 0, got b = {b}")));
        }
        if a < b {
            return Err(SimError::config(format!(
                "semi-axes must satisfy a >= b, got a = {a}, b = {b}"
            )));
        }

        let mut curve = Self {
            a,
            b,
            arc_length: ArcLengthMethod::Quadrature,
            perimeter: 0.0,
        };
        curve.perimeter = curve.integrate_speed(0.0, TAU);
        Ok(curve)
    }

    /// Circle of the given radius (the flat, zero-connection case)
    pub fn circle(radius: f64) -> SimResult<Self> {
        Self::new(radius, radius)
    }

    /// Select how `arc_length` is evaluated
    pub fn with_arc_length(mut self, method: ArcLengthMethod) -> Self {
        self.arc_length = method;
        self
    }

    pub fn semi_major(&self) -> f64 {
        self.a
    }

    pub fn semi_minor(&self) -> f64 {
        self.b
    }

    pub fn arc_length_method(&self) -> ArcLengthMethod {
        self.arc_length
    }

    pub fn eccentricity(&self) -> f64 {
        (1.0 - (self.b * self.b) / (self.a * self.a)).max(0.0).sqrt()
    }

    /// Total length of the curve
    pub fn perimeter(&self) -> f64 {
        self.perimeter
    }

    /// Global lower bound of the metric: `g >= r^2 >= b^2`
    pub fn metric_floor(&self) -> f64 {
        self.b * self.b
    }

    // D(phi) = b^2 cos^2 + a^2 sin^2 and its first two derivatives
    fn denominator(&self, phi: f64) -> (f64, f64, f64) {
        let (s, c) = phi.sin_cos();
        let k = self.a * self.a - self.b * self.b;
        let d = (self.b * c).powi(2) + (self.a * s).powi(2);
        let d1 = 2.0 * k * s * c;
        let d2 = 2.0 * k * (c * c - s * s);
        (d, d1, d2)
    }

    // r, r', r'' in one pass
    fn radius_jet(&self, phi: f64) -> (f64, f64, f64) {
        let (d, d1, d2) = self.denominator(phi);
        let r = self.a * self.b / d.sqrt();
        let r1 = -0.5 * r * d1 / d;
        let r2 = r * (0.75 * d1 * d1 / (d * d) - 0.5 * d2 / d);
        (r, r1, r2)
    }

    /// Polar radius, always within `[b, a]`
    pub fn radius(&self, phi: f64) -> f64 {
        self.radius_jet(phi).0
    }

    pub fn radius_derivative(&self, phi: f64) -> f64 {
        self.radius_jet(phi).1
    }

    pub fn radius_second_derivative(&self, phi: f64) -> f64 {
        self.radius_jet(phi).2
    }

    /// Induced metric `g = r^2 + r'^2`
    pub fn metric(&self, phi: f64) -> f64 {
        let (r, r1, _) = self.radius_jet(phi);
        r * r + r1 * r1
    }

    /// `g' = 2 r' (r + r'')`
    pub fn metric_derivative(&self, phi: f64) -> f64 {
        let (r, r1, r2) = self.radius_jet(phi);
        2.0 * r1 * (r + r2)
    }

    /// Connection coefficient `Gamma = g' / (2g)`, zero on a circle
    pub fn christoffel(&self, phi: f64) -> f64 {
        let (r, r1, r2) = self.radius_jet(phi);
        let g = r * r + r1 * r1;
        r1 * (r + r2) / g
    }

    /// Signed plane-curve curvature (positive, the ellipse is convex)
    pub fn curvature(&self, phi: f64) -> f64 {
        let (r, r1, r2) = self.radius_jet(phi);
        let g = r * r + r1 * r1;
        (r * r + 2.0 * r1 * r1 - r * r2) / (g * g.sqrt())
    }

    /// Embedding of `phi` into the plane
    pub fn position(&self, phi: f64) -> NVec2 {
        let r = self.radius(phi);
        let (s, c) = phi.sin_cos();
        NVec2::new(r * c, r * s)
    }

    /// Tangent vector `d gamma / d phi`, of length `sqrt(g)`
    pub fn tangent(&self, phi: f64) -> NVec2 {
        let (r, r1, _) = self.radius_jet(phi);
        let (s, c) = phi.sin_cos();
        NVec2::new(r1 * c - r * s, r1 * s + r * c)
    }

    /// Cartesian velocity of a particle at `phi` moving with `phidot`
    pub fn velocity(&self, phi: f64, phidot: f64) -> NVec2 {
        self.tangent(phi) * phidot
    }

    /// Inverse of [`Ellipse::velocity`]: `|v| / sqrt(g)`, signed by the
    /// projection of `v` onto the tangent at `phi`
    pub fn angular_velocity(&self, phi: f64, v: &NVec2) -> f64 {
        let speed = v.norm() / self.metric(phi).sqrt();
        if v.dot(&self.tangent(phi)) < 0.0 {
            -speed
        } else {
            speed
        }
    }

    /// Geodesic distance between two angles along the shorter arc
    ///
    /// The ellipse is symmetric under `phi -> phi + pi`, so the arc spanning
    /// the wrapped angle difference `|delta| <= pi` is always the shorter one.
    pub fn arc_length(&self, phi1: f64, phi2: f64) -> f64 {
        let delta = wrap_angle(phi2 - phi1);
        match self.arc_length {
            ArcLengthMethod::Midpoint => {
                let mid = phi1 + 0.5 * delta;
                self.metric(mid).sqrt() * delta.abs()
            }
            ArcLengthMethod::Quadrature => self.integrate_speed(phi1, phi1 + delta).abs(),
        }
    }

    // Composite Gauss-Legendre of sqrt(g) from `from` to `to` (signed)
    fn integrate_speed(&self, from: f64, to: f64) -> f64 {
        let span = to - from;
        if span == 0.0 {
            return 0.0;
        }
        let panels = (span.abs() / PANEL_WIDTH).ceil().max(1.0) as usize;
        let h = span / panels as f64;
        let half = 0.5 * h;

        let mut total = 0.0;
        for p in 0..panels {
            let centre = from + (p as f64 + 0.5) * h;
            for (x, w) in GL_NODES.iter().zip(GL_WEIGHTS.iter()) {
                total += w * self.metric(centre + half * x).sqrt();
            }
        }
        total * half
    }
}
