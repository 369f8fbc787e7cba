//! Tests for invalid configuration and scenario input

use nbody_core::config::{DEFAULT_ITERATION_COUNT, DEFAULT_POPULATION_SIZE, DEFAULT_TIMESTEP};
use nbody_core::{
    build_simulation_context, BodyError, ConfigError, ScenarioConfig, SimulationConfig,
};

#[test]
fn test_garbage_positional_args_fall_back_to_defaults() {
    let mut config = SimulationConfig::default();
    let diagnostics = config.apply_positional_args(&["ten", "-4", "0.5.1"]);

    assert_eq!(config.population_size, DEFAULT_POPULATION_SIZE);
    assert_eq!(config.iteration_count, DEFAULT_ITERATION_COUNT);
    assert_eq!(config.timestep, DEFAULT_TIMESTEP);
    assert_eq!(diagnostics.len(), 3);

    // The recovered config is fully usable
    assert!(build_simulation_context(&config).is_ok());
}

#[test]
fn test_scenario_with_huge_masses_is_rejected() {
    let scenario = ScenarioConfig::from_yaml_str(
        r#"
initial:
  - mass: 1.0e200
    position: [0.0, 0.0]
  - mass: 1.0e200
    position: [10.0, 0.0]
"#,
    )
    .unwrap();
    let mut config = SimulationConfig::default();
    config.apply_scenario(scenario).unwrap();

    assert!(matches!(
        build_simulation_context(&config),
        Err(ConfigError::UnboundedForce)
    ));
}

#[test]
fn test_scenario_population_above_limit_is_rejected() {
    let scenario = ScenarioConfig::from_yaml_str("bodies: 100000000000
").unwrap();
    let mut config = SimulationConfig::default();
    config.apply_scenario(scenario).unwrap();

    assert!(matches!(
        build_simulation_context(&config),
        Err(ConfigError::PopulationTooLarge(_))
    ));
}

#[test]
fn test_fractional_timestep_is_not_truncated() {
    let mut config = SimulationConfig::default();
    let diagnostics = config.apply_positional_args(&["4", "10", "0.05"]);

    assert!(diagnostics.is_empty());
    let ctx = build_simulation_context(&config).unwrap();
    assert_eq!(ctx.dt(), 0.05);
}

#[test]
fn test_scenario_with_zero_timestep_is_rejected() {
    let scenario = ScenarioConfig::from_yaml_str("timestep: 0.0\n").unwrap();
    let mut config = SimulationConfig::default();
    config.apply_scenario(scenario).unwrap();

    let err = build_simulation_context(&config).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidTimestep(_)));
}

#[test]
fn test_scenario_with_negative_mass_is_rejected() {
    let scenario = ScenarioConfig::from_yaml_str(
        r#"
initial:
  - mass: 1.0
    position: [0.0, 0.0]
  - mass: -2.0
    position: [1.0, 0.0]
"#,
    )
    .unwrap();
    let mut config = SimulationConfig::default();
    config.apply_scenario(scenario).unwrap();

    match build_simulation_context(&config) {
        Err(ConfigError::InvalidBody { index, source }) => {
            assert_eq!(index, 1);
            assert_eq!(source, BodyError::InvalidMass(-2.0));
        }
        other => panic!("expected invalid body error, got {:?}", other),
    }
}

#[test]
fn test_malformed_yaml_is_an_error() {
    let result = ScenarioConfig::from_yaml_str("bodies: [1, 2\n");
    assert!(matches!(result, Err(ConfigError::Scenario(_))));

    let result = ScenarioConfig::from_yaml_str("bodies: many\n");
    assert!(result.is_err());
}

#[test]
fn test_scenario_bodies_are_used_verbatim() {
    let scenario = ScenarioConfig::from_yaml_str(
        r#"
iterations: 1
timestep: 1.0
gravity: 1.01
initial:
  - mass: 1.0
    position: [0.0, 0.0]
  - mass: 1.0
    position: [10.0, 0.0]
"#,
    )
    .unwrap();
    let mut config = SimulationConfig::default();
    config.apply_scenario(scenario).unwrap();

    let ctx = build_simulation_context(&config).unwrap();
    assert_eq!(ctx.seed(), None);
    assert_eq!(ctx.bodies().len(), 2);
    assert_eq!(ctx.bodies()[1].position.x, 10.0);
}
