//! Salamander simulation on top of the animat crates.
//!
//! [`SalamanderBuilder`] generates a body with canonical names,
//! [`Simulation`] steps control and physics together, and
//! [`AnimatSimPlugin`] drives a [`Simulation`] resource from Bevy's `Update`
//! schedule.
//!
//! # Example
//!
//! ```no_run
//! use animat_core::config::AnimatConfig;
//! use animat_control::dispatch::ControlledAnimat;
//! use animat_physics::rapier::RapierBackend;
//! use animat_sim::{AnimatSimPlugin, SalamanderBuilder, Simulation, salamander_controller};
//! use bevy::prelude::*;
//!
//! let config = AnimatConfig::default();
//! let mut sim = Simulation::new(RapierBackend::from_config(&config.simulation), &config.simulation);
//! let animat = SalamanderBuilder::from_config(&config).spawn(sim.backend_mut()).unwrap();
//! let controller = salamander_controller(&config).unwrap();
//! sim.add_model(ControlledAnimat::new(animat, Box::new(controller)).unwrap());
//!
//! App::new()
//!     .add_plugins(AnimatSimPlugin::<RapierBackend>::default())
//!     .insert_resource(sim)
//!     .run();
//! ```

pub mod builder;
pub mod simulation;

use std::marker::PhantomData;

use animat_physics::backend::PhysicsBackend;
use bevy::prelude::*;
use tracing::error;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use builder::{SalamanderBuilder, salamander_controller};
pub use simulation::Simulation;

// ---------------------------------------------------------------------------
// AnimatSimPlugin
// ---------------------------------------------------------------------------

/// Steps the [`Simulation<B>`] resource once per app update.
///
/// The resource is inserted by the caller. Without it the step system does
/// nothing. A failed step is logged and halts the simulation.
pub struct AnimatSimPlugin<B> {
    _backend: PhantomData<fn() -> B>,
}

impl<B> Default for AnimatSimPlugin<B> {
    fn default() -> Self {
        Self {
            _backend: PhantomData,
        }
    }
}

impl<B: PhysicsBackend> Plugin for AnimatSimPlugin<B> {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, simulation_step_system::<B>);
    }
}

/// Advance the simulation by one step unless it is finished or halted.
pub fn simulation_step_system<B: PhysicsBackend>(simulation: Option<ResMut<Simulation<B>>>) {
    let Some(mut simulation) = simulation else {
        return;
    };
    if simulation.is_finished() || simulation.is_halted() {
        return;
    }
    if let Err(err) = simulation.step() {
        error!(%err, iteration = simulation.iteration(), "Simulation step failed");
        simulation.halt();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
