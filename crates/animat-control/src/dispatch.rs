//! Per-step control dispatch.
//!
//! For every body with a controller, each step:
//!
//! ```text
//! iteration 0 ──► reset all motors (position, velocity, torque zeros)
//!             ──► position group: targets, force limit = max * scale
//!             ──► velocity group (opt-in): targets, force limit = max * scale
//!             ──► torque group: clamp(+-max) * scale
//! ```
//!
//! One batched command per mode per body. Bodies are handled in slice order.

use std::collections::HashMap;

use animat_core::error::{BackendError, ControlError};
use animat_core::types::{BodyId, ControlMode, JointIndex};
use animat_physics::animat::Animat;
use animat_physics::backend::{MotorTargets, PhysicsBackend};
use tracing::debug;

use crate::controller::MotorController;

/// Zero every motor of `body` in all three modes.
pub fn reset_controllers<B>(backend: &mut B, body: BodyId) -> Result<(), BackendError>
where
    B: PhysicsBackend + ?Sized,
{
    backend.reset_motor_controllers(body)
}

// ---------------------------------------------------------------------------
// ControlledAnimat
// ---------------------------------------------------------------------------

/// A registered body paired with its optional controller.
///
/// Joint names of every control group are resolved to backend indices once,
/// at construction.
pub struct ControlledAnimat {
    pub animat: Animat,
    controller: Option<Box<dyn MotorController>>,
    indices: [Vec<JointIndex>; 3],
}

impl ControlledAnimat {
    /// Pair `animat` with `controller`. Fails on any partitioned joint the
    /// registry does not know.
    pub fn new(
        animat: Animat,
        controller: Box<dyn MotorController>,
    ) -> Result<Self, ControlError> {
        let mut indices: [Vec<JointIndex>; 3] = Default::default();
        for mode in ControlMode::ALL {
            indices[mode.index()] = controller
                .partition()
                .joints(mode)
                .iter()
                .map(|name| animat.joint(name))
                .collect::<Result<_, _>>()?;
        }
        Ok(Self {
            animat,
            controller: Some(controller),
            indices,
        })
    }

    /// A body the dispatcher skips.
    pub fn uncontrolled(animat: Animat) -> Self {
        Self {
            animat,
            controller: None,
            indices: Default::default(),
        }
    }

    #[must_use]
    pub fn controller(&self) -> Option<&dyn MotorController> {
        self.controller.as_deref()
    }

    /// Backend indices of the `mode` group, parallel to its joint names.
    #[must_use]
    pub fn joint_indices(&self, mode: ControlMode) -> &[JointIndex] {
        &self.indices[mode.index()]
    }
}

// ---------------------------------------------------------------------------
// ControlDispatcher
// ---------------------------------------------------------------------------

/// Turns controller targets into batched backend commands.
///
/// Velocity-group joints are left undriven unless
/// [`with_velocity_dispatch`](Self::with_velocity_dispatch) is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlDispatcher {
    velocity_dispatch: bool,
}

impl ControlDispatcher {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            velocity_dispatch: false,
        }
    }

    /// Also issue velocity-mode commands each step.
    #[must_use]
    pub const fn with_velocity_dispatch(mut self, enabled: bool) -> Self {
        self.velocity_dispatch = enabled;
        self
    }

    #[must_use]
    pub const fn velocity_dispatch(&self) -> bool {
        self.velocity_dispatch
    }

    /// Run one control step over `models`.
    ///
    /// Backend errors are returned as-is and stop the step.
    pub fn control_models<B>(
        &self,
        backend: &mut B,
        iteration: u64,
        time: f64,
        timestep: f64,
        models: &mut [ControlledAnimat],
        torque_scale: f32,
    ) -> Result<(), ControlError>
    where
        B: PhysicsBackend + ?Sized,
    {
        for model in models.iter_mut() {
            let Some(controller) = model.controller.as_deref_mut() else {
                continue;
            };
            let body = model.animat.identity();
            if iteration == 0 {
                debug!(%body, "Resetting motor controllers");
                reset_controllers(backend, body)?;
            }
            controller.step(iteration, time, timestep);

            let partition = controller.partition();
            let has_position = !partition.joints(ControlMode::Position).is_empty();
            let has_velocity = !partition.joints(ControlMode::Velocity).is_empty();
            let has_torque = !partition.joints(ControlMode::Torque).is_empty();

            if has_position {
                let targets = controller.positions(iteration, time, timestep);
                let partition = controller.partition();
                let values = ordered(&targets, partition.joints(ControlMode::Position), ControlMode::Position)?;
                let forces = scaled(partition.max_torques(ControlMode::Position), torque_scale);
                backend.set_motor_targets(
                    body,
                    &MotorTargets::position(&model.indices[ControlMode::Position.index()], &values, &forces),
                )?;
            }

            if self.velocity_dispatch && has_velocity {
                let targets = controller.velocities(iteration, time, timestep);
                let partition = controller.partition();
                let values = ordered(&targets, partition.joints(ControlMode::Velocity), ControlMode::Velocity)?;
                let forces = scaled(partition.max_torques(ControlMode::Velocity), torque_scale);
                backend.set_motor_targets(
                    body,
                    &MotorTargets::velocity(&model.indices[ControlMode::Velocity.index()], &values, &forces),
                )?;
            }

            if has_torque {
                let targets = controller.torques(iteration, time, timestep);
                let partition = controller.partition();
                let values = ordered(&targets, partition.joints(ControlMode::Torque), ControlMode::Torque)?;
                let torques: Vec<f32> = values
                    .iter()
                    .zip(partition.max_torques(ControlMode::Torque))
                    .map(|(&v, &max)| v.clamp(-max, max) * torque_scale)
                    .collect();
                backend.set_motor_targets(
                    body,
                    &MotorTargets::torque(&model.indices[ControlMode::Torque.index()], &torques),
                )?;
            }
        }
        Ok(())
    }
}

/// Values of `targets` in the order of `joints`.
fn ordered(
    targets: &HashMap<String, f32>,
    joints: &[String],
    mode: ControlMode,
) -> Result<Vec<f32>, ControlError> {
    joints
        .iter()
        .map(|joint| {
            targets
                .get(joint)
                .copied()
                .ok_or_else(|| ControlError::MissingTarget {
                    mode,
                    joint: joint.clone(),
                })
        })
        .collect()
}

fn scaled(max_torques: &[f32], scale: f32) -> Vec<f32> {
    max_torques.iter().map(|max| max * scale).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
