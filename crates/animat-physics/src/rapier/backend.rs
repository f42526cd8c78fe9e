//! [`RapierBackend`]: concrete physics backend using raw `rapier3d`.

use animat_core::config::SimConfig;
use animat_core::error::BackendError;
use animat_core::types::{BodyId, ControlMode, JointIndex, JointKind, LinkIndex};
use bevy::math::Vec3;
use rapier3d::prelude::{ColliderBuilder, JointAxis, RigidBodyBuilder};
use tracing::debug;

use crate::backend::{
    DynamicsInfo, DynamicsUpdate, JointInfo, JointState, MotorTargets, PhysicsBackend,
};
use crate::model::MultiBodyModel;

use super::bridge::{interaction_groups, mass_properties, register_model};
use super::context::{RapierBody, RapierContext, RapierJoint};

/// Spring gain of the position servo.
pub const DEFAULT_POSITION_GAIN: f32 = 100.0;
/// Damping gain of the position and velocity servos.
pub const DEFAULT_VELOCITY_GAIN: f32 = 1.0;

/// Raw rapier3d physics backend.
///
/// Position and velocity modes use rapier's force-based joint motors with
/// the command's force limit. Torque mode uses the motor trick: a huge
/// target velocity clamped to the desired torque magnitude.
pub struct RapierBackend {
    context: RapierContext,
    position_gain: f32,
    velocity_gain: f32,
}

impl RapierBackend {
    /// Create an empty world with given gravity and timestep.
    pub fn new(gravity: Vec3, dt: f32) -> Self {
        Self {
            context: RapierContext::new(gravity, dt),
            position_gain: DEFAULT_POSITION_GAIN,
            velocity_gain: DEFAULT_VELOCITY_GAIN,
        }
    }

    /// Create a world from gravity and timestep in [`SimConfig`].
    pub fn from_config(config: &SimConfig) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let dt = config.timestep as f32;
        Self::new(Vec3::from_array(config.gravity), dt)
    }

    /// Servo gains used by position and velocity commands.
    #[must_use]
    pub const fn with_gains(mut self, position_gain: f32, velocity_gain: f32) -> Self {
        self.position_gain = position_gain;
        self.velocity_gain = velocity_gain;
        self
    }

    /// Add a fixed ground slab whose top face is the plane `z = 0`.
    pub fn add_ground_plane(&mut self, friction: f32) {
        let ctx = &mut self.context;
        let ground = RigidBodyBuilder::fixed()
            .translation(Vec3::new(0.0, 0.0, -0.05))
            .build();
        let handle = ctx.rigid_body_set.insert(ground);
        let collider = ColliderBuilder::cuboid(50.0, 50.0, 0.05)
            .friction(friction)
            .restitution(0.0)
            .build();
        ctx.collider_set
            .insert_with_parent(collider, handle, &mut ctx.rigid_body_set);
    }

    /// Read-only access to the rapier state.
    #[must_use]
    pub const fn context(&self) -> &RapierContext {
        &self.context
    }

    /// World position of link `link` of `body`.
    pub fn link_position(&self, body: BodyId, link: LinkIndex) -> Result<Vec3, BackendError> {
        let rb = self.body(body)?;
        let slot = rb
            .slot(link)
            .ok_or(BackendError::LinkOutOfRange { body, index: link })?;
        self.context
            .rigid_body_set
            .get(rb.bodies[slot])
            .map(|b| b.position().translation)
            .ok_or_else(|| BackendError::CommandFailed(format!("missing rigid body for {body}")))
    }

    fn body(&self, body: BodyId) -> Result<&RapierBody, BackendError> {
        usize::try_from(body.raw())
            .ok()
            .and_then(|i| self.context.bodies.get(i))
            .ok_or(BackendError::UnknownBody(body))
    }

    fn body_mut(&mut self, body: BodyId) -> Result<&mut RapierBody, BackendError> {
        usize::try_from(body.raw())
            .ok()
            .and_then(|i| self.context.bodies.get_mut(i))
            .ok_or(BackendError::UnknownBody(body))
    }

    fn joint(&self, body: BodyId, joint: JointIndex) -> Result<&RapierJoint, BackendError> {
        let rb = self.body(body)?;
        usize::try_from(joint)
            .ok()
            .and_then(|j| rb.joints.get(j))
            .ok_or(BackendError::JointOutOfRange {
                body,
                index: joint,
                count: rb.joints.len(),
            })
    }
}

impl PhysicsBackend for RapierBackend {
    fn name(&self) -> &str {
        "rapier3d"
    }

    fn create_multi_body(&mut self, model: &MultiBodyModel) -> Result<BodyId, BackendError> {
        let id = u32::try_from(self.context.bodies.len())
            .map(BodyId)
            .map_err(|_| BackendError::Unsupported("too many bodies".into()))?;
        let body = register_model(&mut self.context, model)?;
        debug!(body = %id, name = %body.name, links = body.bodies.len(), "Registered multi-body");
        self.context.bodies.push(body);
        Ok(id)
    }

    fn joint_count(&self, body: BodyId) -> Result<usize, BackendError> {
        Ok(self.body(body)?.joints.len())
    }

    fn joint_info(&self, body: BodyId, joint: JointIndex) -> Result<JointInfo, BackendError> {
        let rb = self.body(body)?;
        let j = self.joint(body, joint)?;
        let mut info = j.info.clone();
        // Joint damping lives in the child link's dynamics record.
        if let Some(slot) = rb.slot(joint) {
            info.damping = rb.dynamics[slot].joint_damping;
        }
        Ok(info)
    }

    fn dynamics_info(&self, body: BodyId, link: LinkIndex) -> Result<DynamicsInfo, BackendError> {
        let rb = self.body(body)?;
        rb.slot(link)
            .map(|slot| rb.dynamics[slot].clone())
            .ok_or(BackendError::LinkOutOfRange { body, index: link })
    }

    fn joint_state(&self, body: BodyId, joint: JointIndex) -> Result<JointState, BackendError> {
        Ok(self.joint(body, joint)?.state)
    }

    fn set_motor_targets(
        &mut self,
        body: BodyId,
        targets: &MotorTargets<'_>,
    ) -> Result<(), BackendError> {
        targets.validate()?;
        let (kp, kd) = (self.position_gain, self.velocity_gain);
        let ctx = &mut self.context;
        let rb = usize::try_from(body.raw())
            .ok()
            .and_then(|i| ctx.bodies.get_mut(i))
            .ok_or(BackendError::UnknownBody(body))?;

        // Resolve every index before touching a motor.
        let count = rb.joints.len();
        let slots = targets
            .joint_indices
            .iter()
            .map(|&index| {
                usize::try_from(index)
                    .ok()
                    .filter(|&j| j < count)
                    .ok_or(BackendError::JointOutOfRange { body, index, count })
            })
            .collect::<Result<Vec<_>, _>>()?;

        for (i, j) in slots.into_iter().enumerate() {
            let joint = &mut rb.joints[j];
            if !joint.info.kind.is_actuated() {
                continue;
            }
            let axis = if joint.info.kind == JointKind::Prismatic {
                JointAxis::LinX
            } else {
                JointAxis::AngX
            };
            let force = MotorTargets::value(targets.forces, i, 0.0);
            let joint_damping = rb.dynamics[j + 1].joint_damping;
            let Some(rapier_joint) = ctx.impulse_joint_set.get_mut(joint.handle, true) else {
                return Err(BackendError::CommandFailed(format!(
                    "missing rapier joint {}",
                    joint.info.name
                )));
            };

            match targets.mode {
                ControlMode::Position => {
                    let target = MotorTargets::value(targets.target_positions, i, 0.0);
                    let velocity = MotorTargets::value(targets.target_velocities, i, 0.0);
                    rapier_joint.data.set_motor(axis, target, velocity, kp, kd);
                    rapier_joint.data.set_motor_max_force(axis, force.abs());
                    joint.state.applied_torque = 0.0;
                }
                ControlMode::Velocity => {
                    let velocity = MotorTargets::value(targets.target_velocities, i, 0.0);
                    rapier_joint.data.set_motor(axis, 0.0, velocity, 0.0, kd);
                    rapier_joint.data.set_motor_max_force(axis, force.abs());
                    joint.state.applied_torque = 0.0;
                }
                ControlMode::Torque => {
                    // Passive joint damping opposes the last measured velocity.
                    let t = force - joint_damping * joint.state.velocity;
                    if t.abs() > 1e-10 {
                        rapier_joint.data.set_motor(axis, 0.0, t.signum() * 1e10, 0.0, 1.0);
                        rapier_joint.data.set_motor_max_force(axis, t.abs());
                    } else {
                        // Zero torque: fully disable motor so DOF is free.
                        rapier_joint.data.set_motor(axis, 0.0, 0.0, 0.0, 0.0);
                        rapier_joint.data.set_motor_max_force(axis, 0.0);
                    }
                    joint.state.applied_torque = t;
                }
            }
        }
        Ok(())
    }

    fn set_dynamics(
        &mut self,
        body: BodyId,
        link: LinkIndex,
        update: &DynamicsUpdate,
    ) -> Result<(), BackendError> {
        let ctx = &mut self.context;
        let rb = usize::try_from(body.raw())
            .ok()
            .and_then(|i| ctx.bodies.get_mut(i))
            .ok_or(BackendError::UnknownBody(body))?;
        let slot = rb
            .slot(link)
            .ok_or(BackendError::LinkOutOfRange { body, index: link })?;

        let info = &mut rb.dynamics[slot];
        if let Some(mass) = update.mass {
            // Keep the shape of the inertia tensor, rescale it with the mass.
            let ratio = if info.mass > 0.0 { mass / info.mass } else { 0.0 };
            for moment in &mut info.local_inertia_diagonal {
                *moment *= ratio;
            }
        }
        update.apply_to(info);

        if let Some(rigid_body) = ctx.rigid_body_set.get_mut(rb.bodies[slot]) {
            if update.mass.is_some() {
                rigid_body.set_additional_mass_properties(mass_properties(info), true);
            }
            if let Some(damping) = update.linear_damping {
                rigid_body.set_linear_damping(damping);
            }
            if let Some(damping) = update.angular_damping {
                rigid_body.set_angular_damping(damping);
            }
        }
        if let Some(collider) = ctx.collider_set.get_mut(rb.colliders[slot]) {
            if let Some(friction) = update.lateral_friction {
                collider.set_friction(friction);
            }
            if let Some(restitution) = update.restitution {
                collider.set_restitution(restitution);
            }
        }
        Ok(())
    }

    fn set_collision_filter(
        &mut self,
        body: BodyId,
        link: LinkIndex,
        group: u32,
        mask: u32,
    ) -> Result<(), BackendError> {
        let handle = {
            let rb = self.body_mut(body)?;
            let slot = rb
                .slot(link)
                .ok_or(BackendError::LinkOutOfRange { body, index: link })?;
            rb.colliders[slot]
        };
        let collider = self.context.collider_set.get_mut(handle).ok_or_else(|| {
            BackendError::CommandFailed(format!("missing collider for link {link} of {body}"))
        })?;
        collider.set_collision_groups(interaction_groups(group, mask));
        Ok(())
    }

    fn step_simulation(&mut self) -> Result<(), BackendError> {
        self.context.step();
        self.context.read_joint_states();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
