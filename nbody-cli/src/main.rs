mod viewer;

use clap::{Args, Parser, Subcommand};
use nbody_core::{
    build_simulation_context, format_diagnostic, format_runtime_error, run_simulation,
    BodyState, Diagnostics, ScenarioConfig, SimulationConfig,
};
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use viewer::ViewerApp;

#[derive(Parser)]
#[command(name = "nbody")]
#[command(about = "Brute-force gravitational N-body simulator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation and print every body at every step
    Run {
        #[command(flatten)]
        sim: SimulationArgs,
        /// Only print the final state
        #[arg(long)]
        quiet: bool,
    },
    /// Plot a simulation in a window
    View {
        #[command(flatten)]
        sim: SimulationArgs,
        /// Milliseconds between rendered frames
        #[arg(long, default_value_t = 100)]
        frame_ms: u64,
    },
}

/// Inputs shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct SimulationArgs {
    /// Number of bodies
    #[arg(allow_negative_numbers = true)]
    bodies: Option<String>,
    /// Number of iterations
    #[arg(allow_negative_numbers = true)]
    iterations: Option<String>,
    /// Integration time step
    #[arg(allow_negative_numbers = true)]
    timestep: Option<String>,
    /// YAML scenario file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Gravitational constant
    #[arg(long)]
    gravity: Option<f64>,
    /// Lower bound on the separation used in the force law
    #[arg(long)]
    min_separation: Option<f64>,
    /// Seed for the random initial conditions
    #[arg(long)]
    seed: Option<u64>,
}

impl SimulationArgs {
    fn positional(&self) -> Vec<&str> {
        [&self.bodies, &self.iterations, &self.timestep]
            .into_iter()
            .map_while(|arg| arg.as_deref())
            .collect()
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Run { sim, quiet } => run(&sim, quiet),
        Commands::View { sim, frame_ms } => view(sim, Duration::from_millis(frame_ms)),
    };

    if let Err(e) = outcome {
        eprintln!("Error: {}", format_runtime_error(e.as_ref()));
        std::process::exit(1);
    }
}

/// Merge defaults, the scenario file, positional arguments and flags
pub fn resolve_config(sim: &SimulationArgs) -> Result<(SimulationConfig, Diagnostics), Box<dyn Error>> {
    let mut config = SimulationConfig::default();

    if let Some(path) = &sim.config {
        let source = fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
        config.apply_scenario(ScenarioConfig::from_yaml_str(&source)?)?;
    }

    let diagnostics = config.apply_positional_args(sim.positional().as_slice());

    if let Some(g) = sim.gravity {
        config.gravitational_constant = g;
    }
    if let Some(min_separation) = sim.min_separation {
        config.min_separation = min_separation;
    }
    if sim.seed.is_some() {
        config.seed = sim.seed;
    }

    config.validate()?;
    Ok((config, diagnostics))
}

fn report(diagnostics: &Diagnostics) {
    for diagnostic in diagnostics {
        eprintln!("{}", format_diagnostic(diagnostic));
    }
}

fn run(sim: &SimulationArgs, quiet: bool) -> Result<(), Box<dyn Error>> {
    if sim.bodies.is_none() && sim.config.is_none() {
        println!();
        println!("  Optionally specify arguments:");
        println!("    nbody run <number-of-bodies> [<number-of-iterations> [<time-step>]]");
        println!("    nbody run --config <scenario.yaml>");
        println!();
    }

    let (config, diagnostics) = resolve_config(sim)?;
    report(&diagnostics);

    let mut ctx = build_simulation_context(&config)?;

    println!("            Bodies: {}", ctx.bodies().len());
    println!("        Iterations: {}", ctx.max_steps());
    println!("  Integration step: {}", ctx.dt());
    if let Some(seed) = ctx.seed() {
        println!("              Seed: {}", seed);
    }
    println!();

    let result = run_simulation(&mut ctx, |snapshot| {
        if quiet {
            return;
        }
        println!("step {}", snapshot.step);
        for body in &snapshot.bodies {
            println!("{}", format_body_state(body));
        }
    });

    if quiet {
        println!("final state after {} steps", result.steps);
        for body in &result.final_snapshot.bodies {
            println!("{}", format_body_state(body));
        }
    }
    if result.diverged {
        eprintln!(
            "warning: stopped after {} of {} steps, a body would have left the f64 range",
            result.steps,
            ctx.max_steps()
        );
    }

    Ok(())
}

fn view(sim: SimulationArgs, frame_interval: Duration) -> Result<(), Box<dyn Error>> {
    // Surface configuration problems before a window opens
    let (_, diagnostics) = resolve_config(&sim)?;
    report(&diagnostics);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([820.0, 860.0])
            .with_title("N-body problem"),
        ..Default::default()
    };

    eframe::run_native(
        "nbody",
        options,
        Box::new(move |cc| Ok(Box::new(ViewerApp::new(sim, frame_interval, cc)))),
    )?;

    Ok(())
}

/// One console line per body
pub fn format_body_state(body: &BodyState) -> String {
    format!(
        "  m = {:>6.3}  x = {:>8.3}  y = {:>8.3}  v = {:>7.3}  w = {:>7.3}",
        body.mass, body.position.x, body.position.y, body.velocity.x, body.velocity.y
    )
}
