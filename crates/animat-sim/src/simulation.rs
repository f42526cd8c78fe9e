//! Step-driven simulation driver.
//!
//! One [`Simulation::step`] is one control step followed by one physics step:
//!
//! ```text
//! scale = ramp(time)
//! dispatch(iteration, time, scale) ──► backend.step() ──► iteration += 1
//! ```

use animat_control::dispatch::{ControlDispatcher, ControlledAnimat};
use animat_control::ramp::TorqueRamp;
use animat_core::config::SimConfig;
use animat_core::error::AnimatError;
use animat_physics::backend::PhysicsBackend;
use bevy::prelude::Resource;
use tracing::info;

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// A physics backend, the bodies living in it and the clock driving them.
///
/// Bodies are dispatched in the order they were added.
#[derive(Resource)]
pub struct Simulation<B: PhysicsBackend> {
    backend: B,
    models: Vec<ControlledAnimat>,
    dispatcher: ControlDispatcher,
    ramp: TorqueRamp,
    timestep: f64,
    n_iterations: u64,
    iteration: u64,
    time: f64,
    halted: bool,
}

impl<B: PhysicsBackend> Simulation<B> {
    /// Empty simulation over `backend`, clocked by `config`.
    pub fn new(backend: B, config: &SimConfig) -> Self {
        Self {
            backend,
            models: Vec::new(),
            dispatcher: ControlDispatcher::new().with_velocity_dispatch(config.velocity_dispatch),
            ramp: TorqueRamp::new(config.torque_ramp),
            timestep: config.timestep,
            n_iterations: config.n_iterations(),
            iteration: 0,
            time: 0.0,
            halted: false,
        }
    }

    /// Add a body. Returns its position in dispatch order.
    pub fn add_model(&mut self, model: ControlledAnimat) -> usize {
        self.models.push(model);
        self.models.len() - 1
    }

    #[must_use]
    pub fn with_model(mut self, model: ControlledAnimat) -> Self {
        self.add_model(model);
        self
    }

    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable backend access, e.g. to spawn bodies before they are added.
    pub const fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn models(&self) -> &[ControlledAnimat] {
        &self.models
    }

    pub const fn dispatcher(&self) -> &ControlDispatcher {
        &self.dispatcher
    }

    /// Index of the next step.
    pub const fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Simulated time at the start of the next step (s).
    pub const fn time(&self) -> f64 {
        self.time
    }

    pub const fn timestep(&self) -> f64 {
        self.timestep
    }

    /// Steps needed to cover the configured duration.
    pub const fn n_iterations(&self) -> u64 {
        self.n_iterations
    }

    /// Whether the configured duration has been covered.
    pub const fn is_finished(&self) -> bool {
        self.iteration >= self.n_iterations
    }

    /// Whether a failed step stopped the run.
    pub const fn is_halted(&self) -> bool {
        self.halted
    }

    /// Stop the run. [`run`](Self::run) and the Bevy step system skip a
    /// halted simulation.
    pub const fn halt(&mut self) {
        self.halted = true;
    }

    /// Global torque scale applied at the next step.
    pub fn torque_scale(&self) -> f32 {
        self.ramp.scale(self.time)
    }

    /// Dispatch control for every body, then advance the backend by one step.
    ///
    /// The clock only advances when both succeed.
    #[allow(clippy::cast_precision_loss)]
    pub fn step(&mut self) -> Result<(), AnimatError> {
        let scale = self.torque_scale();
        self.dispatcher.control_models(
            &mut self.backend,
            self.iteration,
            self.time,
            self.timestep,
            &mut self.models,
            scale,
        )?;
        self.backend.step_simulation()?;
        self.iteration += 1;
        self.time = self.iteration as f64 * self.timestep;
        Ok(())
    }

    /// Run up to `steps` steps, stopping early once finished or halted.
    ///
    /// Returns the number of steps taken. A failed step halts the simulation.
    pub fn run(&mut self, steps: u64) -> Result<u64, AnimatError> {
        let mut taken = 0;
        while taken < steps && !self.is_finished() && !self.halted {
            if let Err(err) = self.step() {
                self.halted = true;
                return Err(err);
            }
            taken += 1;
        }
        Ok(taken)
    }

    /// Run until the configured duration is covered.
    pub fn run_to_end(&mut self) -> Result<u64, AnimatError> {
        info!(
            backend = self.backend.name(),
            bodies = self.models.len(),
            iterations = self.n_iterations,
            timestep = self.timestep,
            "Running simulation"
        );
        let remaining = self.n_iterations.saturating_sub(self.iteration);
        let taken = self.run(remaining)?;
        info!(iterations = self.iteration, time = self.time, "Simulation complete");
        Ok(taken)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
