use crate::engine::Body;
use glam::DVec2;

/// Velocity and position `body` would have after one step of `dt`, without
/// moving it
pub fn next_state(body: &Body, dt: f64) -> (DVec2, DVec2) {
    let velocity = body.velocity + dt * body.force / body.mass();
    let position = body.position + dt * velocity;
    (velocity, position)
}

/// Advance one body by `dt` using semi-implicit Euler integration.
///
/// The velocity is updated from the accumulated force first, and the position
/// then moves with that new velocity.
pub fn integrate(body: &mut Body, dt: f64) {
    let (velocity, position) = next_state(body, dt);
    body.velocity = velocity;
    body.position = position;
}

/// Integrate every body with the same timestep
pub fn integrate_all(bodies: &mut [Body], dt: f64) {
    for body in bodies.iter_mut() {
        integrate(body, dt);
    }
}
