//! Random initial conditions
//!
//! Masses are `1 + Weibull(shape 1, scale 2)`, so always at least one and
//! right-skewed. Positions and velocities are zero-mean normals with
//! independent axes.

use crate::config::ConfigError;
use crate::engine::Body;
use glam::DVec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

pub const MASS_OFFSET: f64 = 1.0;
pub const MASS_SHAPE: f64 = 1.0;
pub const MASS_SCALE: f64 = 2.0;
pub const POSITION_SPREAD: f64 = 10.0;
pub const VELOCITY_SPREAD: f64 = 0.5;

/// Create the run's random generator.
///
/// Returns the generator along with the seed it was built from, drawing one
/// from OS entropy when none is given so the run can be repeated.
pub fn seeded_rng(seed: Option<u64>) -> (StdRng, u64) {
    let seed = seed.unwrap_or_else(rand::random);
    (StdRng::seed_from_u64(seed), seed)
}

/// Sample a Weibull distribution by inverting its CDF
fn weibull<R: Rng>(rng: &mut R, shape: f64, scale: f64) -> f64 {
    let u: f64 = rng.random();
    scale * (-(1.0 - u).ln()).powf(1.0 / shape)
}

/// Sample a normal distribution with the Box-Muller transform
fn normal<R: Rng>(rng: &mut R, mean: f64, std_dev: f64) -> f64 {
    let u1: f64 = rng.random::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.random();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
    mean + std_dev * z
}

fn normal_vec<R: Rng>(rng: &mut R, std_dev: f64) -> DVec2 {
    let x = normal(rng, 0.0, std_dev);
    let y = normal(rng, 0.0, std_dev);
    DVec2::new(x, y)
}

pub fn random_mass<R: Rng>(rng: &mut R) -> f64 {
    MASS_OFFSET + weibull(rng, MASS_SHAPE, MASS_SCALE)
}

/// Generate `count` bodies from a single generator
pub fn generate_population<R: Rng>(rng: &mut R, count: usize) -> Result<Vec<Body>, ConfigError> {
    (0..count)
        .map(|index| {
            let mass = random_mass(rng);
            let position = normal_vec(rng, POSITION_SPREAD);
            let velocity = normal_vec(rng, VELOCITY_SPREAD);
            Body::new(mass, position, velocity)
                .map_err(|source| ConfigError::InvalidBody { index, source })
        })
        .collect()
}
