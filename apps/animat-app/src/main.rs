//! Animat simulation CLI.
//!
//! Provides two modes of operation:
//! - `run`: Simulate a salamander headless on the rapier backend
//! - `info`: Print the joint and link naming table of a body plan

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use animat_control::dispatch::ControlledAnimat;
use animat_control::partition::ControlPartition;
use animat_core::config::AnimatConfig;
use animat_core::error::AnimatError;
use animat_core::types::{BASE_LINK, ControlMode};
use animat_physics::rapier::RapierBackend;
use animat_sim::{SalamanderBuilder, Simulation, salamander_controller};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

/// Articulated animat simulation.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a salamander headless and print a summary.
    Run {
        /// Number of steps. Defaults to the configured duration.
        #[arg(short = 'n', long)]
        steps: Option<u64>,

        /// Ground friction coefficient.
        #[arg(long, default_value_t = 1.0)]
        ground_friction: f32,

        /// Run without a ground plane.
        #[arg(long)]
        no_ground: bool,
    },

    /// Print the joint and link naming table.
    Info,
}

// ---------------------------------------------------------------------------
// Mode implementations
// ---------------------------------------------------------------------------

fn load_config(path: Option<&Path>) -> Result<AnimatConfig, AnimatError> {
    let config = match path {
        Some(path) => {
            info!(path = %path.display(), "Loading configuration");
            AnimatConfig::from_file(path)?
        }
        None => AnimatConfig::default(),
    };
    Ok(config)
}

fn run(
    config: &AnimatConfig,
    steps: Option<u64>,
    ground_friction: f32,
    no_ground: bool,
) -> Result<(), AnimatError> {
    let mut backend = RapierBackend::from_config(&config.simulation);
    if !no_ground {
        backend.add_ground_plane(ground_friction);
    }

    let mut sim = Simulation::new(backend, &config.simulation);
    let animat = SalamanderBuilder::from_config(config).spawn(sim.backend_mut())?;
    animat.log_information(sim.backend())?;
    animat.log_dynamics_info(sim.backend(), None)?;
    let total_mass = animat.total_mass(sim.backend())?;
    let body = animat.identity();

    let controller = salamander_controller(config)?;
    sim.add_model(ControlledAnimat::new(animat, Box::new(controller))?);

    let taken = match steps {
        Some(n) => sim.run(n)?,
        None => sim.run_to_end()?,
    };

    let head = sim.backend().link_position(body, BASE_LINK)?;
    println!("steps={taken}, time={:.3}s, mass={total_mass:.4}kg", sim.time());
    println!("head position: [{:.4}, {:.4}, {:.4}]", head.x, head.y, head.z);
    Ok(())
}

fn run_info(config: &AnimatConfig) -> Result<(), AnimatError> {
    let plan = config.body_plan.plan();
    let joints = plan.joint_names();
    let partition = ControlPartition::from_config(joints.iter().map(String::as_str), &config.control)?;

    println!("animat v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!(
        "body plan: {} body joints, {} leg pairs, {} dof per leg",
        plan.n_body_joints, plan.n_legs, plan.n_legs_dof
    );
    println!(
        "{} joints, {} links, {} oscillators",
        plan.n_joints(),
        plan.n_links(),
        plan.n_oscillators()
    );

    println!();
    println!("joints:");
    for (index, name) in joints.iter().enumerate() {
        let mode = partition.mode_of(name).unwrap_or(ControlMode::Position);
        let group = partition.joints(mode);
        let max_torque = group
            .iter()
            .position(|j| j == name)
            .map_or(0.0, |i| partition.max_torques(mode)[i]);
        println!("  {index:>3}  {name:<24} {:<8} {max_torque:>8.3}", mode.as_str());
    }

    println!();
    println!("links:");
    for (index, name) in plan.link_names().iter().enumerate() {
        #[allow(clippy::cast_possible_wrap)]
        let identity = index as i64 + i64::from(BASE_LINK);
        println!("  {identity:>3}  {name}");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let result = load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Some(Commands::Run {
            steps,
            ground_friction,
            no_ground,
        }) => run(&config, steps, ground_friction, no_ground),
        Some(Commands::Info) | None => run_info(&config),
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "animat failed");
            ExitCode::FAILURE
        }
    }
}
