use crate::config::ConfigError;
use glam::DVec2;
use thiserror::Error;

/// Gravitational constant used when none is configured
pub const DEFAULT_GRAVITATIONAL_CONSTANT: f64 = 1.01;

/// Lower bound on the separation used in the force denominator
pub const DEFAULT_MIN_SEPARATION: f64 = 1e-3;

/// Smallest accepted `min_separation`, whose cube is still a normal f64
pub const MIN_SEPARATION_FLOOR: f64 = 2.9e-103;

/// Rejected body parameters
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BodyError {
    #[error("mass must be positive and finite, got {0}")]
    InvalidMass(f64),
    #[error("{field} must be finite, got ({x}, {y})")]
    NonFinite { field: &'static str, x: f64, y: f64 },
}

/// A point mass in the simulation
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    mass: f64,
    pub position: DVec2,
    pub velocity: DVec2,
    /// Force accumulated during the current step
    pub force: DVec2,
}

impl Body {
    pub fn new(mass: f64, position: DVec2, velocity: DVec2) -> Result<Self, BodyError> {
        if !(mass.is_finite() && mass > 0.0) {
            return Err(BodyError::InvalidMass(mass));
        }
        check_finite("position", position)?;
        check_finite("velocity", velocity)?;

        Ok(Self {
            mass,
            position,
            velocity,
            force: DVec2::ZERO,
        })
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn reset_force(&mut self) {
        self.force = DVec2::ZERO;
    }
}

fn check_finite(field: &'static str, v: DVec2) -> Result<(), BodyError> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(BodyError::NonFinite {
            field,
            x: v.x,
            y: v.y,
        })
    }
}

/// Inverse-square attraction between every ordered pair of bodies.
///
/// Each pair is evaluated from both sides; the antisymmetry of the force is
/// not used. Separations below `min_separation` are clamped to it, and
/// coincident bodies contribute zero force.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gravity {
    g: f64,
    min_separation: f64,
}

impl Default for Gravity {
    fn default() -> Self {
        Self {
            g: DEFAULT_GRAVITATIONAL_CONSTANT,
            min_separation: DEFAULT_MIN_SEPARATION,
        }
    }
}

impl Gravity {
    pub fn new(g: f64, min_separation: f64) -> Result<Self, ConfigError> {
        if !(g.is_finite() && g >= 0.0) {
            return Err(ConfigError::InvalidGravity(g));
        }
        let cube = min_separation * min_separation * min_separation;
        if !(min_separation > 0.0 && cube.is_normal()) {
            return Err(ConfigError::InvalidMinSeparation(min_separation));
        }
        Ok(Self { g, min_separation })
    }

    pub fn g(&self) -> f64 {
        self.g
    }

    pub fn min_separation(&self) -> f64 {
        self.min_separation
    }

    /// Force exerted on `target` by `source`
    pub fn pair_force(&self, target: &Body, source: &Body) -> DVec2 {
        let d = source.position - target.position;
        if d == DVec2::ZERO {
            return DVec2::ZERO;
        }
        let mut r = d.length();
        if r < self.min_separation {
            log::trace!("separation {r} clamped to {}", self.min_separation);
            r = self.min_separation;
        }
        let s = (self.g * target.mass / r) * (source.mass / (r * r));
        d * s
    }

    /// Upper bound on the magnitude of the net force any body of `bodies`
    /// can feel, whatever the positions.
    ///
    /// A single pair peaks at `G m_i m_j / min_separation^2`, reached at the
    /// clamp radius.
    pub fn max_net_force(&self, bodies: &[Body]) -> f64 {
        let others = bodies.len().saturating_sub(1) as f64;
        if self.g == 0.0 || others == 0.0 {
            return 0.0;
        }
        let heaviest = bodies.iter().map(Body::mass).fold(0.0, f64::max);
        (self.g * heaviest / self.min_separation) * (heaviest / self.min_separation) * others
    }

    /// Net force on body `i` from all other bodies, with the number of pair
    /// terms evaluated
    pub fn net_force(&self, bodies: &[Body], i: usize) -> (DVec2, usize) {
        let target = &bodies[i];
        let mut force = DVec2::ZERO;
        let mut evaluations = 0;

        for (j, source) in bodies.iter().enumerate() {
            if j == i {
                continue;
            }
            force += self.pair_force(target, source);
            evaluations += 1;
        }

        (force, evaluations)
    }

    /// Add the net force on body `i` into its `force` field.
    ///
    /// The caller is responsible for having reset the field this step.
    pub fn accumulate(&self, bodies: &mut [Body], i: usize) -> usize {
        let (force, evaluations) = self.net_force(bodies, i);
        bodies[i].force += force;
        evaluations
    }

    /// Accumulate forces for every body, one target at a time
    pub fn accumulate_sequential(&self, bodies: &mut [Body]) -> u64 {
        (0..bodies.len())
            .map(|i| self.accumulate(bodies, i) as u64)
            .sum()
    }

    /// Accumulate forces for every body with the targets spread over the
    /// rayon pool. Net forces are computed from a shared view of the
    /// population and only written back once all of them are known.
    #[cfg(feature = "parallel")]
    pub fn accumulate_parallel(&self, bodies: &mut [Body]) -> u64 {
        use rayon::prelude::*;

        let view: &[Body] = bodies;
        let contributions: Vec<(DVec2, usize)> = (0..view.len())
            .into_par_iter()
            .map(|i| self.net_force(view, i))
            .collect();

        let mut evaluations = 0u64;
        for (body, (force, count)) in bodies.iter_mut().zip(contributions) {
            body.force += force;
            evaluations += count as u64;
        }
        evaluations
    }

    /// Accumulate forces for every body using the pass selected at build
    /// time. Returns the number of directional pair evaluations.
    pub fn accumulate_all(&self, bodies: &mut [Body]) -> u64 {
        #[cfg(feature = "parallel")]
        {
            self.accumulate_parallel(bodies)
        }
        #[cfg(not(feature = "parallel"))]
        {
            self.accumulate_sequential(bodies)
        }
    }
}
