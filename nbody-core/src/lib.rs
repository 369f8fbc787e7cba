pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod integrator;
pub mod population;
pub mod runtime;

pub use glam::DVec2;

pub use config::{ConfigError, InitialBody, ScenarioConfig, SimulationConfig};
pub use diagnostics::{format_diagnostic, format_runtime_error, Diagnostic, Diagnostics};
pub use engine::{Body, BodyError, Gravity};
pub use runtime::{
    build_simulation_context, get_body_states, run_simulation, step_simulation, BodyState,
    SimulationContext, SimulationResult, SimulationState, Snapshot,
};
