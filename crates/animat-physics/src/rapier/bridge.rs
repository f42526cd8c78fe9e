//! Model-to-Rapier bridge: converts a [`MultiBodyModel`] into rapier rigid
//! bodies, colliders and impulse joints.

use std::f32::consts::{FRAC_PI_2, PI};

use animat_core::error::BackendError;
use animat_core::types::{JointIndex, JointKind};
use bevy::math::{Quat, Vec3};
use rapier3d::prelude::{
    Collider, ColliderBuilder, FixedJointBuilder, GenericJoint, Group, InteractionGroups,
    InteractionTestMode, JointAxis, MassProperties, MotorModel, PrismaticJointBuilder,
    RevoluteJointBuilder, RigidBody, RigidBodyBuilder, SphericalJointBuilder,
};

use crate::backend::{DynamicsInfo, JointInfo, JointState};
use crate::link::{Geometry, Link, Pose};
use crate::model::MultiBodyModel;

use super::context::{RapierBody, RapierContext, RapierJoint};

// ---------------------------------------------------------------------------
// register_model
// ---------------------------------------------------------------------------

/// Create rigid bodies, colliders and joints for `model`.
///
/// Bodies are created world-aligned at their rest position. Link and frame
/// orientations are folded into the collider pose, so every joint axis is
/// expressed identically in both body frames.
pub fn register_model(
    context: &mut RapierContext,
    model: &MultiBodyModel,
) -> Result<RapierBody, BackendError> {
    let parents = model.parent_indices()?;

    // World pose of every link, base in slot 0.
    let mut world: Vec<Pose> = Vec::with_capacity(model.links.len() + 1);
    world.push(model.base.pose);
    for (link, &parent) in model.links.iter().zip(&parents) {
        let parent_world = world[slot(parent)];
        world.push(Pose::new(
            parent_world.transform_point(link.pose.position),
            parent_world.orientation * link.pose.orientation,
        ));
    }

    let mut body = RapierBody {
        name: model.name.clone(),
        bodies: Vec::with_capacity(world.len()),
        colliders: Vec::with_capacity(world.len()),
        dynamics: Vec::with_capacity(world.len()),
        joints: Vec::with_capacity(model.links.len()),
    };

    for (link, pose) in std::iter::once(&model.base).chain(&model.links).zip(&world) {
        let handle = context
            .rigid_body_set
            .insert(create_link_body(link, pose));
        let collider = create_link_collider(link, pose.orientation);
        let collider_handle =
            context
                .collider_set
                .insert_with_parent(collider, handle, &mut context.rigid_body_set);
        body.bodies.push(handle);
        body.colliders.push(collider_handle);
        body.dynamics.push(initial_dynamics(link, pose.orientation));
    }

    for (i, (link, &parent)) in model.links.iter().zip(&parents).enumerate() {
        let index = JointIndex::try_from(i)
            .map_err(|_| BackendError::Unsupported(format!("too many joints in {}", model.name)))?;
        let parent_slot = slot(parent);
        let child_slot = i + 1;
        let anchor = world[child_slot].position - world[parent_slot].position;
        let world_axis = (world[child_slot].orientation * link.joint_axis).normalize_or_zero();

        let rapier_joint = build_rapier_joint(link.joint_kind, world_axis, anchor)
            .ok_or_else(|| {
                BackendError::Unsupported(format!(
                    "{} joint for link {}",
                    link.joint_kind, link.name
                ))
            })?;
        let parent_body = body.bodies[parent_slot];
        let child_body = body.bodies[child_slot];
        let handle = context
            .impulse_joint_set
            .insert(parent_body, child_body, rapier_joint, true);

        body.joints.push(RapierJoint {
            handle,
            parent_body,
            child_body,
            world_axis,
            rest_offset: anchor.dot(world_axis),
            info: JointInfo {
                index,
                name: animat_core::convention::joint_name(&link.name),
                kind: link.joint_kind,
                axis: link.joint_axis,
                parent_index: parent,
                link_name: link.name.clone(),
                damping: 0.0,
            },
            state: JointState::default(),
        });
    }

    Ok(body)
}

/// Interaction groups from raw group and mask bits.
pub fn interaction_groups(group: u32, mask: u32) -> InteractionGroups {
    InteractionGroups::new(
        Group::from_bits_truncate(group),
        Group::from_bits_truncate(mask),
        InteractionTestMode::And,
    )
}

/// Additional mass properties of a link about its inertial frame.
pub fn mass_properties(info: &DynamicsInfo) -> MassProperties {
    MassProperties::new(
        info.local_inertial_position,
        info.mass,
        Vec3::from_array(info.local_inertia_diagonal),
    )
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn slot(link: i32) -> usize {
    usize::try_from(link + 1).unwrap_or(0)
}

fn create_link_body(link: &Link, pose: &Pose) -> RigidBody {
    let info = initial_dynamics(link, pose.orientation);
    RigidBodyBuilder::dynamic()
        .translation(pose.position)
        .can_sleep(false)
        .additional_mass_properties(mass_properties(&info))
        .build()
}

/// Collider of `link`, posed in a world-aligned body frame.
///
/// Colliders carry no density: link mass is set on the body.
fn create_link_collider(link: &Link, orientation: Quat) -> Collider {
    let frame_rotation = orientation * link.frame.orientation;
    let frame_position = orientation * link.frame.position;
    let (builder, shape_rotation) = match &link.geometry {
        Geometry::Box { half_extents } => (
            ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z),
            Quat::IDENTITY,
        ),
        Geometry::Sphere { radius } => (ColliderBuilder::ball(*radius), Quat::IDENTITY),
        // Rapier cylinders are aligned with Y.
        Geometry::Cylinder { radius, height } => (
            ColliderBuilder::cylinder(0.5 * height, *radius),
            Quat::from_rotation_x(FRAC_PI_2),
        ),
        Geometry::Capsule { radius, height } => {
            (ColliderBuilder::capsule_z(0.5 * height, *radius), Quat::IDENTITY)
        }
        // Mesh files are never loaded; collide as the sphere of equal volume.
        Geometry::Mesh(mesh) => (
            ColliderBuilder::ball((3.0 * mesh.volume / (4.0 * PI)).cbrt()),
            Quat::IDENTITY,
        ),
    };
    let (axis, angle) = (frame_rotation * shape_rotation).to_axis_angle();
    builder
        .translation(frame_position)
        .rotation(axis * angle)
        .density(0.0)
        .friction(link.collision.friction)
        .restitution(link.collision.restitution)
        .build()
}

fn initial_dynamics(link: &Link, orientation: Quat) -> DynamicsInfo {
    let inertial = link.inertial_pose();
    DynamicsInfo {
        mass: link.mass(),
        lateral_friction: link.collision.friction,
        restitution: link.collision.restitution,
        local_inertia_diagonal: link.inertia_diagonal(),
        local_inertial_position: orientation * inertial.position,
        local_inertial_orientation: orientation * inertial.orientation,
        ..DynamicsInfo::default()
    }
}

/// Build a rapier `GenericJoint`. Planar joints have no rapier counterpart.
fn build_rapier_joint(kind: JointKind, axis: Vec3, anchor: Vec3) -> Option<GenericJoint> {
    let joint = match kind {
        JointKind::Revolute => {
            let mut joint: GenericJoint = RevoluteJointBuilder::new(axis)
                .local_anchor1(anchor)
                .build()
                .into();
            joint.set_motor_model(JointAxis::AngX, MotorModel::ForceBased);
            joint.set_motor(JointAxis::AngX, 0.0, 0.0, 0.0, 0.0);
            joint
        }
        JointKind::Prismatic => {
            let mut joint: GenericJoint = PrismaticJointBuilder::new(axis)
                .local_anchor1(anchor)
                .build()
                .into();
            joint.set_motor_model(JointAxis::LinX, MotorModel::ForceBased);
            joint.set_motor(JointAxis::LinX, 0.0, 0.0, 0.0, 0.0);
            joint
        }
        JointKind::Spherical => SphericalJointBuilder::new()
            .local_anchor1(anchor)
            .build()
            .into(),
        JointKind::Fixed => FixedJointBuilder::new()
            .local_anchor1(anchor)
            .build()
            .into(),
        JointKind::Planar => return None,
    };
    Some(joint)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
