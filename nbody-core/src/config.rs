//! Simulation configuration
//!
//! A [`SimulationConfig`] starts from documented defaults and can be
//! overridden by a YAML scenario file and then by positional command-line
//! arguments. Positional arguments are recovered from: a malformed value is
//! reported as a warning and the previous value is kept. Everything else is
//! validated strictly.
//!
//! ```yaml
//! bodies: 2
//! iterations: 500
//! timestep: 0.05
//! gravity: 1.01
//! min_separation: 0.001
//! seed: 42
//! initial:
//!   - mass: 1.0
//!     position: [0.0, 0.0]
//!   - mass: 1.0
//!     position: [10.0, 0.0]
//!     velocity: [0.0, 0.3]
//! ```

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::engine::{BodyError, Gravity, DEFAULT_GRAVITATIONAL_CONSTANT, DEFAULT_MIN_SEPARATION};
use serde::Deserialize;
use std::fmt;
use std::num::IntErrorKind;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_POPULATION_SIZE: usize = 10;
pub const DEFAULT_ITERATION_COUNT: usize = 100;
pub const DEFAULT_TIMESTEP: f64 = 1.0;

/// Largest population accepted from any source. Each step costs
/// `N * (N - 1)` pair evaluations.
pub const MAX_POPULATION_SIZE: usize = 100_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("population size must be at least 1")]
    EmptyPopulation,
    #[error("population size {0} exceeds the limit of {max}", max = MAX_POPULATION_SIZE)]
    PopulationTooLarge(usize),
    #[error("iteration count must be at least 1")]
    NoIterations,
    #[error("timestep must be positive and finite, got {0}")]
    InvalidTimestep(f64),
    #[error("gravitational constant must be finite and non-negative, got {0}")]
    InvalidGravity(f64),
    #[error("minimum separation must be positive with a normal f64 cube, got {0}")]
    InvalidMinSeparation(f64),
    #[error("net force can exceed the f64 range for these masses, gravity and minimum separation")]
    UnboundedForce,
    #[error("scenario sets bodies = {declared} but lists {listed} initial bodies")]
    PopulationMismatch { declared: usize, listed: usize },
    #[error("initial body {index} is invalid")]
    InvalidBody {
        index: usize,
        #[source]
        source: BodyError,
    },
    #[error("failed to parse scenario: {0}")]
    Scenario(#[from] serde_yaml::Error),
}

/// Initial state of one body given explicitly in a scenario
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InitialBody {
    pub mass: f64,
    pub position: [f64; 2],
    #[serde(default)]
    pub velocity: [f64; 2],
}

/// Scenario file contents. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    pub bodies: Option<usize>,
    pub iterations: Option<usize>,
    pub timestep: Option<f64>,
    pub gravity: Option<f64>,
    pub min_separation: Option<f64>,
    pub seed: Option<u64>,
    pub initial: Option<Vec<InitialBody>>,
}

impl ScenarioConfig {
    pub fn from_yaml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(source)?)
    }
}

/// Everything needed to build a simulation
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub population_size: usize,
    pub iteration_count: usize,
    pub timestep: f64,
    pub gravitational_constant: f64,
    pub min_separation: f64,
    /// Seed for the initial conditions; drawn from entropy when absent
    pub seed: Option<u64>,
    /// Explicit initial bodies; replaces the random population when set
    pub initial_bodies: Option<Vec<InitialBody>>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            population_size: DEFAULT_POPULATION_SIZE,
            iteration_count: DEFAULT_ITERATION_COUNT,
            timestep: DEFAULT_TIMESTEP,
            gravitational_constant: DEFAULT_GRAVITATIONAL_CONSTANT,
            min_separation: DEFAULT_MIN_SEPARATION,
            seed: None,
            initial_bodies: None,
        }
    }
}

impl SimulationConfig {
    /// Override fields with the values present in `scenario`
    pub fn apply_scenario(&mut self, scenario: ScenarioConfig) -> Result<(), ConfigError> {
        if let Some(initial) = &scenario.initial {
            if let Some(declared) = scenario.bodies {
                if declared != initial.len() {
                    return Err(ConfigError::PopulationMismatch {
                        declared,
                        listed: initial.len(),
                    });
                }
            }
        }

        if let Some(bodies) = scenario.bodies {
            self.population_size = bodies;
        }
        if let Some(iterations) = scenario.iterations {
            self.iteration_count = iterations;
        }
        if let Some(timestep) = scenario.timestep {
            self.timestep = timestep;
        }
        if let Some(gravity) = scenario.gravity {
            self.gravitational_constant = gravity;
        }
        if let Some(min_separation) = scenario.min_separation {
            self.min_separation = min_separation;
        }
        if scenario.seed.is_some() {
            self.seed = scenario.seed;
        }
        if let Some(initial) = scenario.initial {
            self.population_size = initial.len();
            self.initial_bodies = Some(initial);
        }

        Ok(())
    }

    /// Apply `<bodies> <iterations> <timestep>` positional arguments.
    ///
    /// A value that does not parse, has trailing characters, is out of range
    /// or is not positive is reported and the current value is kept. A body
    /// count above [`MAX_POPULATION_SIZE`] is out of range.
    pub fn apply_positional_args<S: AsRef<str>>(&mut self, args: &[S]) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();

        if let Some(arg) = args.first() {
            let arg = arg.as_ref();
            match parse_count(arg) {
                Ok(n) if n > MAX_POPULATION_SIZE => {
                    let problem = ArgProblem::OutOfRange;
                    diagnostics.push(rejected("bodies", arg, problem, self.population_size));
                }
                Ok(n) if self.initial_bodies.as_ref().is_some_and(|b| b.len() != n) => {
                    diagnostics.push(Diagnostic::warning(format!(
                        "bodies: population is fixed by the scenario; ignoring {}",
                        arg
                    )));
                }
                Ok(n) => self.population_size = n,
                Err(problem) => diagnostics.push(rejected("bodies", arg, problem, self.population_size)),
            }
        }

        if let Some(arg) = args.get(1) {
            let arg = arg.as_ref();
            match parse_count(arg) {
                Ok(n) => self.iteration_count = n,
                Err(problem) => diagnostics.push(rejected("iterations", arg, problem, self.iteration_count)),
            }
        }

        if let Some(arg) = args.get(2) {
            let arg = arg.as_ref();
            match parse_timestep(arg) {
                Ok(dt) => self.timestep = dt,
                Err(problem) => diagnostics.push(rejected("timestep", arg, problem, self.timestep)),
            }
        }

        for extra in args.iter().skip(3) {
            diagnostics.push(Diagnostic::warning(format!(
                "ignoring extra argument: {}",
                extra.as_ref()
            )));
        }

        diagnostics
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size == 0 {
            return Err(ConfigError::EmptyPopulation);
        }
        if self.population_size > MAX_POPULATION_SIZE {
            return Err(ConfigError::PopulationTooLarge(self.population_size));
        }
        if self.iteration_count == 0 {
            return Err(ConfigError::NoIterations);
        }
        if !(self.timestep.is_finite() && self.timestep > 0.0) {
            return Err(ConfigError::InvalidTimestep(self.timestep));
        }
        if let Some(initial) = &self.initial_bodies {
            if initial.len() != self.population_size {
                return Err(ConfigError::PopulationMismatch {
                    declared: self.population_size,
                    listed: initial.len(),
                });
            }
        }
        self.gravity().map(|_| ())
    }

    /// The force law described by this configuration
    pub fn gravity(&self) -> Result<Gravity, ConfigError> {
        Gravity::new(self.gravitational_constant, self.min_separation)
    }
}

/// Why a positional argument was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgProblem {
    Invalid,
    TrailingCharacters,
    OutOfRange,
    NotPositive,
}

impl fmt::Display for ArgProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid => write!(f, "Invalid number"),
            Self::TrailingCharacters => write!(f, "Trailing characters after number"),
            Self::OutOfRange => write!(f, "Number out of range"),
            Self::NotPositive => write!(f, "Number must be positive"),
        }
    }
}

fn rejected(name: &str, arg: &str, problem: ArgProblem, kept: impl fmt::Display) -> Diagnostic {
    Diagnostic::warning(format!("{}: {}: {}; using {}", name, problem, arg, kept))
}

/// Parse a positive integer count
pub fn parse_count(arg: &str) -> Result<usize, ArgProblem> {
    let arg = arg.trim();
    match arg.parse::<i64>() {
        Ok(v) if v <= 0 => Err(ArgProblem::NotPositive),
        Ok(v) => usize::try_from(v).map_err(|_| ArgProblem::OutOfRange),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => Err(ArgProblem::OutOfRange),
            _ if has_numeric_prefix::<i64>(arg) => Err(ArgProblem::TrailingCharacters),
            _ => Err(ArgProblem::Invalid),
        },
    }
}

/// Parse a positive, finite, real-valued timestep
pub fn parse_timestep(arg: &str) -> Result<f64, ArgProblem> {
    let arg = arg.trim();
    match arg.parse::<f64>() {
        Ok(v) if !v.is_finite() => Err(ArgProblem::OutOfRange),
        Ok(v) if v <= 0.0 => Err(ArgProblem::NotPositive),
        Ok(v) => Ok(v),
        Err(_) if has_numeric_prefix::<f64>(arg) => Err(ArgProblem::TrailingCharacters),
        Err(_) => Err(ArgProblem::Invalid),
    }
}

fn has_numeric_prefix<T: FromStr>(arg: &str) -> bool {
    arg.char_indices()
        .skip(1)
        .any(|(end, _)| arg[..end].parse::<T>().is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SimulationConfig::default();
        assert_eq!(config.population_size, 10);
        assert_eq!(config.iteration_count, 100);
        assert_eq!(config.timestep, 1.0);
        assert_eq!(config.gravitational_constant, 1.01);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("12"), Ok(12));
        assert_eq!(parse_count(" 7 "), Ok(7));
        assert_eq!(parse_count("abc"), Err(ArgProblem::Invalid));
        assert_eq!(parse_count(""), Err(ArgProblem::Invalid));
        assert_eq!(parse_count("12abc"), Err(ArgProblem::TrailingCharacters));
        assert_eq!(parse_count("1.5"), Err(ArgProblem::TrailingCharacters));
        assert_eq!(parse_count("0"), Err(ArgProblem::NotPositive));
        assert_eq!(parse_count("-3"), Err(ArgProblem::NotPositive));
        assert_eq!(
            parse_count("99999999999999999999999"),
            Err(ArgProblem::OutOfRange)
        );
    }

    #[test]
    fn test_parse_timestep_keeps_fraction() {
        assert_eq!(parse_timestep("0.25"), Ok(0.25));
        assert_eq!(parse_timestep("2"), Ok(2.0));
        assert_eq!(parse_timestep("1e-2"), Ok(0.01));
        assert_eq!(parse_timestep("0"), Err(ArgProblem::NotPositive));
        assert_eq!(parse_timestep("-0.5"), Err(ArgProblem::NotPositive));
        assert_eq!(parse_timestep("1e999"), Err(ArgProblem::OutOfRange));
        assert_eq!(parse_timestep("NaN"), Err(ArgProblem::OutOfRange));
        assert_eq!(parse_timestep("0.5s"), Err(ArgProblem::TrailingCharacters));
        assert_eq!(parse_timestep("fast"), Err(ArgProblem::Invalid));
    }

    #[test]
    fn test_positional_args_partial_failure_keeps_defaults() {
        let mut config = SimulationConfig::default();
        let diagnostics = config.apply_positional_args(&["25", "lots", "0.1"]);

        assert_eq!(config.population_size, 25);
        assert_eq!(config.iteration_count, DEFAULT_ITERATION_COUNT);
        assert_eq!(config.timestep, 0.1);
        assert_eq!(diagnostics.len(), 1);

        let message = &diagnostics.iter().next().unwrap().message;
        assert_eq!(message, "iterations: Invalid number: lots; using 100");
    }

    #[test]
    fn test_positional_args_extra_are_reported() {
        let mut config = SimulationConfig::default();
        let diagnostics = config.apply_positional_args(&["3", "4", "0.5", "9"]);
        assert_eq!(config.population_size, 3);
        assert_eq!(diagnostics.len(), 1);
        assert!(!diagnostics.is_empty());
    }

    #[test]
    fn test_oversized_population_keeps_previous_value() {
        let mut config = SimulationConfig::default();
        let diagnostics = config.apply_positional_args(&["100000000000", "5"]);

        assert_eq!(config.population_size, DEFAULT_POPULATION_SIZE);
        assert_eq!(config.iteration_count, 5);
        assert_eq!(diagnostics.len(), 1);
        let message = &diagnostics.iter().next().unwrap().message;
        assert_eq!(message, "bodies: Number out of range: 100000000000; using 10");

        let diagnostics = config.apply_positional_args(&["100000"]);
        assert!(diagnostics.is_empty());
        assert_eq!(config.population_size, MAX_POPULATION_SIZE);
    }

    #[test]
    fn test_scenario_overrides() {
        let scenario = ScenarioConfig::from_yaml_str(
            "iterations: 7\ntimestep: 0.5\ngravity: 2.0\nseed: 9\n",
        )
        .unwrap();

        let mut config = SimulationConfig::default();
        config.apply_scenario(scenario).unwrap();

        assert_eq!(config.population_size, DEFAULT_POPULATION_SIZE);
        assert_eq!(config.iteration_count, 7);
        assert_eq!(config.timestep, 0.5);
        assert_eq!(config.gravitational_constant, 2.0);
        assert_eq!(config.seed, Some(9));
    }

    #[test]
    fn test_scenario_initial_bodies_fix_population() {
        let scenario = ScenarioConfig::from_yaml_str(
            r#"
initial:
  - mass: 1.0
    position: [0.0, 0.0]
  - mass: 2.0
    position: [10.0, 0.0]
    velocity: [0.0, 0.5]
"#,
        )
        .unwrap();

        let mut config = SimulationConfig::default();
        config.apply_scenario(scenario).unwrap();
        assert_eq!(config.population_size, 2);

        let initial = config.initial_bodies.as_ref().unwrap();
        assert_eq!(initial[0].velocity, [0.0, 0.0]);
        assert_eq!(initial[1].velocity, [0.0, 0.5]);

        let diagnostics = config.apply_positional_args(&["5"]);
        assert_eq!(config.population_size, 2);
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_scenario_population_mismatch() {
        let scenario = ScenarioConfig::from_yaml_str(
            "bodies: 3\ninitial:\n  - mass: 1.0\n    position: [0.0, 0.0]\n",
        )
        .unwrap();
        let err = SimulationConfig::default().apply_scenario(scenario).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::PopulationMismatch { declared: 3, listed: 1 }
        ));
    }

    #[test]
    fn test_scenario_rejects_unknown_keys() {
        let err = ScenarioConfig::from_yaml_str("timestpe: 0.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Scenario(_)));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = SimulationConfig::default();
        config.timestep = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidTimestep(_))));

        let mut config = SimulationConfig::default();
        config.population_size = 0;
        assert!(matches!(config.validate(), Err(ConfigError::EmptyPopulation)));

        let mut config = SimulationConfig::default();
        config.iteration_count = 0;
        assert!(matches!(config.validate(), Err(ConfigError::NoIterations)));

        let mut config = SimulationConfig::default();
        config.min_separation = -1.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidMinSeparation(_))
        ));

        let mut config = SimulationConfig::default();
        config.min_separation = 1e-120;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidMinSeparation(_))
        ));

        let mut config = SimulationConfig::default();
        config.population_size = MAX_POPULATION_SIZE + 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::PopulationTooLarge(_))
        ));
    }
}
