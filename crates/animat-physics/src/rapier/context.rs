//! Rapier3D pipeline state plus the per-body bookkeeping the backend needs.

use animat_core::types::{JointKind, LinkIndex};
use bevy::math::Vec3;
use rapier3d::prelude::{
    CCDSolver, ColliderHandle, ColliderSet, DefaultBroadPhase, ImpulseJointHandle,
    ImpulseJointSet, IntegrationParameters, IslandManager, MultibodyJointSet, NarrowPhase,
    PhysicsPipeline, RigidBodyHandle, RigidBodySet,
};

use crate::backend::{DynamicsInfo, JointInfo, JointState};

// ---------------------------------------------------------------------------
// RapierJoint
// ---------------------------------------------------------------------------

/// One joint of a registered body.
pub struct RapierJoint {
    pub handle: ImpulseJointHandle,
    pub parent_body: RigidBodyHandle,
    pub child_body: RigidBodyHandle,
    /// Joint axis in world coordinates at rest. Bodies are created
    /// world-aligned, so this is also the axis in both body frames.
    pub world_axis: Vec3,
    /// Parent-to-child offset along the axis at rest (prismatic joints).
    pub rest_offset: f32,
    pub info: JointInfo,
    pub state: JointState,
}

// ---------------------------------------------------------------------------
// RapierBody
// ---------------------------------------------------------------------------

/// Handles and mirrored dynamics of one multi-body.
///
/// Per-link vectors are indexed by `link + 1`, so slot 0 is the base.
pub struct RapierBody {
    pub name: String,
    pub bodies: Vec<RigidBodyHandle>,
    pub colliders: Vec<ColliderHandle>,
    pub dynamics: Vec<DynamicsInfo>,
    pub joints: Vec<RapierJoint>,
}

impl RapierBody {
    /// Slot of `link` in the per-link vectors.
    pub fn slot(&self, link: LinkIndex) -> Option<usize> {
        usize::try_from(link + 1)
            .ok()
            .filter(|&slot| slot < self.bodies.len())
    }
}

// ---------------------------------------------------------------------------
// RapierContext
// ---------------------------------------------------------------------------

/// The rapier world plus every multi-body registered in it.
///
/// A pipeline step borrows all sets at once, hence one owner for them.
pub struct RapierContext {
    // -- Rapier sets --
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub impulse_joint_set: ImpulseJointSet,
    pub multibody_joint_set: MultibodyJointSet,

    // -- Pipeline objects --
    pub physics_pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub ccd_solver: CCDSolver,

    // -- Parameters --
    pub integration_parameters: IntegrationParameters,
    pub gravity: Vec3,

    // -- Registered multi-bodies, indexed by `BodyId` --
    pub bodies: Vec<RapierBody>,
}

impl RapierContext {
    /// Create an empty world with given gravity and timestep.
    pub fn new(gravity: Vec3, dt: f32) -> Self {
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = dt;

        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            ccd_solver: CCDSolver::new(),
            integration_parameters,
            gravity,
            bodies: Vec::new(),
        }
    }

    /// Run one physics step.
    pub fn step(&mut self) {
        self.physics_pipeline.step(
            self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            &(),
            &(),
        );
    }

    /// Recompute every joint's position and velocity from body transforms.
    pub fn read_joint_states(&mut self) {
        let rigid_bodies = &self.rigid_body_set;
        for joint in self.bodies.iter_mut().flat_map(|b| b.joints.iter_mut()) {
            let (Some(parent), Some(child)) = (
                rigid_bodies.get(joint.parent_body),
                rigid_bodies.get(joint.child_body),
            ) else {
                continue;
            };
            let axis = joint.world_axis;

            if joint.info.kind == JointKind::Prismatic {
                // Displacement along the joint axis, minus the rest offset.
                let relative_pos = child.position().translation - parent.position().translation;
                joint.state.position = relative_pos.dot(axis) - joint.rest_offset;
                joint.state.velocity = (child.linvel() - parent.linvel()).dot(axis);
            } else {
                // Rotation around the joint axis from the relative quaternion.
                let relative = parent.position().rotation.inverse() * child.position().rotation;
                let sin_half = Vec3::new(relative.x, relative.y, relative.z).dot(axis);
                joint.state.position = 2.0 * f32::atan2(sin_half, relative.w);
                joint.state.velocity = (child.angvel() - parent.angvel()).dot(axis);
            }
        }
    }
}
