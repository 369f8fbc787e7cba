use crate::config::{ConfigError, SimulationConfig};
use crate::engine::{Body, Gravity};
use crate::integrator::{integrate_all, next_state};
use crate::population::{generate_population, seeded_rng};
use glam::DVec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationState {
    Running,
    Terminal,
}

/// Read-only state of one body as seen by renderers and printers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    pub mass: f64,
    pub position: DVec2,
    pub velocity: DVec2,
}

impl From<&Body> for BodyState {
    fn from(body: &Body) -> Self {
        Self {
            mass: body.mass(),
            position: body.position,
            velocity: body.velocity,
        }
    }
}

/// State of every body after `step` completed steps, in population order
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub step: usize,
    pub bodies: Vec<BodyState>,
}

/// Summary of a completed run
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    pub steps: usize,
    /// Seed the initial conditions were drawn from, if they were random
    pub seed: Option<u64>,
    pub total_pair_evaluations: u64,
    /// The run stopped early because a body would have left the f64 range
    pub diverged: bool,
    pub final_snapshot: Snapshot,
}

/// A running simulation: the body population plus loop bookkeeping
#[derive(Debug, Clone)]
pub struct SimulationContext {
    bodies: Vec<Body>,
    gravity: Gravity,
    dt: f64,
    current_step: usize,
    max_steps: usize,
    pair_evaluations: u64,
    total_pair_evaluations: u64,
    seed: Option<u64>,
    diverged: bool,
}

impl SimulationContext {
    pub fn new(
        bodies: Vec<Body>,
        gravity: Gravity,
        dt: f64,
        max_steps: usize,
    ) -> Result<Self, ConfigError> {
        if bodies.is_empty() {
            return Err(ConfigError::EmptyPopulation);
        }
        if max_steps == 0 {
            return Err(ConfigError::NoIterations);
        }
        if !(dt.is_finite() && dt > 0.0) {
            return Err(ConfigError::InvalidTimestep(dt));
        }
        if !gravity.max_net_force(&bodies).is_finite() {
            return Err(ConfigError::UnboundedForce);
        }

        Ok(Self {
            bodies,
            gravity,
            dt,
            current_step: 0,
            max_steps,
            pair_evaluations: 0,
            total_pair_evaluations: 0,
            seed: None,
            diverged: false,
        })
    }

    pub fn state(&self) -> SimulationState {
        if !self.diverged && self.current_step < self.max_steps {
            SimulationState::Running
        } else {
            SimulationState::Terminal
        }
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn gravity(&self) -> Gravity {
        self.gravity
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Directional pair evaluations performed by the last step
    pub fn pair_evaluations(&self) -> u64 {
        self.pair_evaluations
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// True once a step was refused because it would have produced a
    /// non-finite velocity or position
    pub fn diverged(&self) -> bool {
        self.diverged
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            step: self.current_step,
            bodies: self.bodies.iter().map(BodyState::from).collect(),
        }
    }
}

/// Build a simulation from a configuration.
///
/// Uses the configured initial bodies when present, otherwise draws a random
/// population from a generator seeded once for the whole run.
pub fn build_simulation_context(config: &SimulationConfig) -> Result<SimulationContext, ConfigError> {
    config.validate()?;
    let gravity = config.gravity()?;

    let (bodies, seed) = match &config.initial_bodies {
        Some(initial) => {
            let bodies = initial
                .iter()
                .enumerate()
                .map(|(index, b)| {
                    Body::new(b.mass, DVec2::from(b.position), DVec2::from(b.velocity))
                        .map_err(|source| ConfigError::InvalidBody { index, source })
                })
                .collect::<Result<Vec<_>, _>>()?;
            (bodies, None)
        }
        None => {
            let (mut rng, seed) = seeded_rng(config.seed);
            let bodies = generate_population(&mut rng, config.population_size)?;
            (bodies, Some(seed))
        }
    };

    let mut ctx = SimulationContext::new(bodies, gravity, config.timestep, config.iteration_count)?;
    ctx.seed = seed;

    match seed {
        Some(seed) => log::info!(
            "built simulation: {} bodies, {} steps, dt = {}, seed = {}",
            ctx.bodies.len(),
            ctx.max_steps,
            ctx.dt,
            seed
        ),
        None => log::info!(
            "built simulation: {} scenario bodies, {} steps, dt = {}",
            ctx.bodies.len(),
            ctx.max_steps,
            ctx.dt
        ),
    }

    Ok(ctx)
}

/// Advance the simulation by one step.
///
/// Resets every force, accumulates the pairwise forces, integrates every body
/// and returns the resulting snapshot. Returns `None` without touching any
/// state once the configured number of steps has been taken.
///
/// A step that would move any body to a non-finite velocity or position is
/// not applied: bodies keep their last state and the simulation becomes
/// terminal.
pub fn step_simulation(ctx: &mut SimulationContext) -> Option<Snapshot> {
    if ctx.state() == SimulationState::Terminal {
        return None;
    }

    for body in ctx.bodies.iter_mut() {
        body.reset_force();
    }
    ctx.pair_evaluations = ctx.gravity.accumulate_all(&mut ctx.bodies);
    ctx.total_pair_evaluations += ctx.pair_evaluations;

    let dt = ctx.dt;
    let escaping = ctx.bodies.iter().position(|body| {
        let (velocity, position) = next_state(body, dt);
        !(velocity.is_finite() && position.is_finite())
    });
    if let Some(index) = escaping {
        log::warn!(
            "stopping before step {}: body {} would leave the f64 range",
            ctx.current_step + 1,
            index
        );
        ctx.diverged = true;
        return None;
    }

    integrate_all(&mut ctx.bodies, dt);

    ctx.current_step += 1;
    log::debug!(
        "step {}/{}: {} pair evaluations",
        ctx.current_step,
        ctx.max_steps,
        ctx.pair_evaluations
    );

    Some(ctx.snapshot())
}

/// Step until the simulation is terminal, handing every snapshot to `observer`
pub fn run_simulation<F>(ctx: &mut SimulationContext, mut observer: F) -> SimulationResult
where
    F: FnMut(&Snapshot),
{
    let first_step = ctx.current_step;
    while let Some(snapshot) = step_simulation(ctx) {
        observer(&snapshot);
    }

    log::info!(
        "simulation {} after {} steps ({} pair evaluations)",
        if ctx.diverged { "stopped" } else { "finished" },
        ctx.current_step,
        ctx.total_pair_evaluations
    );

    SimulationResult {
        steps: ctx.current_step - first_step,
        seed: ctx.seed,
        total_pair_evaluations: ctx.total_pair_evaluations,
        diverged: ctx.diverged,
        final_snapshot: ctx.snapshot(),
    }
}

/// Current state of every body
pub fn get_body_states(ctx: &SimulationContext) -> Vec<BodyState> {
    ctx.bodies.iter().map(BodyState::from).collect()
}
