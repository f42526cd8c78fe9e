//! Salamander body builder.
//!
//! [`SalamanderBuilder`] turns a [`BodyPlan`] into a [`MultiBodyModel`] that
//! uses the canonical link and joint names, so the registry, the control
//! partition and the gait controller all agree on every joint.
//!
//! ```text
//!            leg 0                      leg 1
//!         L ──┐                       L ──┐
//! body_0 ── body_1 ── body_2 ── body_3 ── body_4 ── ... ── body_n
//!         R ──┘                       R ──┘
//! ```
//!
//! Body segments are capsules laid along -X, joined by yaw joints. Each leg
//! hangs off its parent segment: a shoulder yaw, a roll, then pitch joints
//! reaching down to the foot.
//!
//! # Example
//!
//! ```no_run
//! use animat_core::config::AnimatConfig;
//! use animat_sim::SalamanderBuilder;
//!
//! let model = SalamanderBuilder::from_config(&AnimatConfig::default()).build();
//! assert_eq!(model.joint_count(), 27);
//! ```

use std::f32::consts::FRAC_PI_2;

use animat_control::gait::GaitController;
use animat_control::partition::ControlPartition;
use animat_core::config::{AnimatConfig, FrictionConfig};
use animat_core::convention::{BodyPlan, body_link_name, leg_link_name};
use animat_core::error::{AnimatError, ControlError};
use animat_core::types::{JointKind, Side};
use animat_physics::animat::Animat;
use animat_physics::backend::{DynamicsUpdate, PhysicsBackend};
use animat_physics::link::{Geometry, Link, Pose};
use animat_physics::model::MultiBodyModel;
use bevy::math::Vec3;
use tracing::debug;

/// Default revolute joint damping (N·m·s/rad).
pub const DEFAULT_JOINT_DAMPING: f32 = 0.1;

// ---------------------------------------------------------------------------
// SalamanderBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for a salamander-like multi-body model.
#[derive(Debug, Clone, PartialEq)]
pub struct SalamanderBuilder {
    plan: BodyPlan,
    legs_parents: Vec<usize>,
    friction: FrictionConfig,
    segment_length: f32,
    body_radius: f32,
    leg_radius: f32,
    leg_segment: f32,
    joint_damping: f32,
}

impl SalamanderBuilder {
    /// Builder for `plan`. Leg pair `i` attaches to body link `i * 3 + 1`
    /// until overridden with [`with_legs_parents`](Self::with_legs_parents).
    #[must_use]
    pub fn new(plan: BodyPlan) -> Self {
        Self {
            plan,
            legs_parents: (0..plan.n_legs).map(|leg| leg * 3 + 1).collect(),
            friction: FrictionConfig::default(),
            segment_length: 0.08,
            body_radius: 0.02,
            leg_radius: 0.01,
            leg_segment: 0.03,
            joint_damping: DEFAULT_JOINT_DAMPING,
        }
    }

    /// Builder for the body plan and friction of `config`.
    #[must_use]
    pub fn from_config(config: &AnimatConfig) -> Self {
        Self::new(config.body_plan.plan())
            .with_legs_parents(config.body_plan.legs_parents.clone())
            .with_friction(config.friction.clone())
    }

    #[must_use]
    pub fn with_legs_parents(mut self, legs_parents: Vec<usize>) -> Self {
        self.legs_parents = legs_parents;
        self
    }

    #[must_use]
    pub const fn with_friction(mut self, friction: FrictionConfig) -> Self {
        self.friction = friction;
        self
    }

    /// Distance between consecutive body joints (m).
    #[must_use]
    pub const fn with_segment_length(mut self, length: f32) -> Self {
        self.segment_length = length;
        self
    }

    /// Damping applied to every joint on [`spawn`](Self::spawn). Zero skips it.
    #[must_use]
    pub const fn with_joint_damping(mut self, damping: f32) -> Self {
        self.joint_damping = damping;
        self
    }

    #[must_use]
    pub const fn plan(&self) -> &BodyPlan {
        &self.plan
    }

    /// Names of the foot links, left before right for each leg pair.
    #[must_use]
    pub fn feet(&self) -> Vec<String> {
        self.plan
            .leg_dofs()
            .filter(|dof| self.plan.is_foot(*dof))
            .map(|dof| leg_link_name(dof.leg, dof.side, dof.joint))
            .collect()
    }

    /// Generate the model.
    ///
    /// # Panics
    ///
    /// Panics if `legs_parents` does not name an existing body link for
    /// every leg pair.
    #[must_use]
    pub fn build(&self) -> MultiBodyModel {
        assert!(
            self.legs_parents.len() >= self.plan.n_legs,
            "one parent body link per leg pair"
        );
        assert!(
            self.legs_parents
                .iter()
                .all(|&parent| parent < self.plan.n_body_links()),
            "leg parent must be a body link"
        );

        let segment = Geometry::Capsule {
            radius: self.body_radius,
            height: 0.5 * self.segment_length,
        };
        // Capsules are Z-aligned; lay them along the body axis.
        let along_x = Pose::from_euler(Vec3::ZERO, [0.0, FRAC_PI_2, 0.0]);

        let base = Link::new(body_link_name(0), segment.clone())
            .with_position(Vec3::new(0.0, 0.0, self.standing_height()))
            .with_frame(along_x)
            .with_friction(self.friction.body)
            .with_color([0.1, 0.7, 0.1, 1.0]);
        let mut model = MultiBodyModel::new("salamander", base);

        for i in 1..self.plan.n_body_links() {
            model.push(
                Link::new(body_link_name(i), segment.clone())
                    .with_parent(body_link_name(i - 1))
                    .with_position(Vec3::new(-self.segment_length, 0.0, 0.0))
                    .with_frame(along_x)
                    .with_friction(self.friction.body)
                    .with_color([0.1, 0.7, 0.1, 1.0]),
            );
        }

        for dof in self.plan.leg_dofs() {
            let parent = if dof.joint == 0 {
                body_link_name(self.legs_parents[dof.leg])
            } else {
                leg_link_name(dof.leg, dof.side, dof.joint - 1)
            };
            let friction = if self.plan.is_foot(dof) {
                self.friction.feet
            } else {
                self.friction.body
            };
            model.push(
                Link::new(
                    leg_link_name(dof.leg, dof.side, dof.joint),
                    Geometry::Sphere {
                        radius: self.leg_radius,
                    },
                )
                .with_parent(parent)
                .with_position(self.leg_offset(dof.side, dof.joint))
                .with_joint(JointKind::Revolute, leg_axis(dof.joint))
                .with_friction(friction)
                .with_color([0.7, 0.5, 0.1, 1.0]),
            );
        }
        model
    }

    /// Build the model, instantiate it in `backend` and apply joint damping.
    pub fn spawn<B>(&self, backend: &mut B) -> Result<Animat, AnimatError>
    where
        B: PhysicsBackend + ?Sized,
    {
        let model = self.build();
        let animat = Animat::spawn(backend, &model)?;
        if self.joint_damping > 0.0 {
            let update = DynamicsUpdate::default().with_joint_damping(self.joint_damping);
            for joint in model.joint_names() {
                animat.set_joint_dynamics(backend, &joint, &update)?;
            }
        }
        debug!(
            body = %animat.identity(),
            links = animat.links().len(),
            feet = ?self.feet(),
            "Spawned salamander"
        );
        Ok(animat)
    }

    /// Height of the base so the feet touch `z = 0`.
    #[allow(clippy::cast_precision_loss)]
    fn standing_height(&self) -> f32 {
        if self.plan.n_legs == 0 || self.plan.n_legs_dof < 3 {
            return self.body_radius;
        }
        (self.plan.n_legs_dof - 2) as f32 * self.leg_segment + self.leg_radius
    }

    /// Position of leg link `joint` relative to its parent.
    fn leg_offset(&self, side: Side, joint: usize) -> Vec3 {
        let y = match side {
            Side::Left => 1.0,
            Side::Right => -1.0,
        };
        match joint {
            0 => Vec3::new(0.0, y * (self.body_radius + self.leg_radius), 0.0),
            1 => Vec3::new(0.0, y * self.leg_segment, 0.0),
            _ => Vec3::new(0.0, 0.0, -self.leg_segment),
        }
    }
}

/// Shoulder yaw, shoulder roll, then pitch for the rest of the leg.
const fn leg_axis(joint: usize) -> Vec3 {
    match joint {
        0 => Vec3::Z,
        1 => Vec3::X,
        _ => Vec3::Y,
    }
}

/// Gait controller for `config`, partitioned by its control tables.
pub fn salamander_controller(config: &AnimatConfig) -> Result<GaitController, ControlError> {
    let plan = config.body_plan.plan();
    let joints = plan.joint_names();
    let partition =
        ControlPartition::from_config(joints.iter().map(String::as_str), &config.control)?;
    Ok(GaitController::new(&plan, &config.gait, partition))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use animat_control::controller::MotorController;
    use animat_core::types::ControlMode;
    use animat_test_utils::{RecordedCall, RecordingBackend};

    #[test]
    fn default_plan_uses_canonical_names() {
        let builder = SalamanderBuilder::from_config(&AnimatConfig::default());
        let model = builder.build();
        let plan = builder.plan();
        assert_eq!(model.joint_count(), plan.n_joints());
        assert_eq!(model.joint_names(), plan.joint_names());
        assert_eq!(model.base.name, "link_body_0");
        model.validate().unwrap();
    }

    #[test]
    fn feet_get_feet_friction() {
        let friction = FrictionConfig {
            body: 0.2,
            feet: 0.9,
        };
        let builder = SalamanderBuilder::new(BodyPlan::default()).with_friction(friction);
        let model = builder.build();
        let feet = builder.feet();
        assert_eq!(feet.len(), 4);
        for link in &model.links {
            let expected = if feet.contains(&link.name) { 0.9 } else { 0.2 };
            assert!((link.collision.friction - expected).abs() < f32::EPSILON, "{}", link.name);
        }
    }

    #[test]
    fn legs_attach_to_configured_parents() {
        let builder = SalamanderBuilder::new(BodyPlan::new(6, 2, 2)).with_legs_parents(vec![2, 5]);
        let model = builder.build();
        let shoulder = |leg, side| {
            model
                .links
                .iter()
                .find(|l| l.name == leg_link_name(leg, side, 0))
                .and_then(|l| l.parent.clone())
        };
        assert_eq!(shoulder(0, Side::Left).as_deref(), Some("link_body_2"));
        assert_eq!(shoulder(1, Side::Right).as_deref(), Some("link_body_5"));
    }

    #[test]
    fn legless_plan_has_no_feet() {
        let builder = SalamanderBuilder::new(BodyPlan::new(8, 0, 0));
        assert!(builder.feet().is_empty());
        assert_eq!(builder.build().joint_count(), 8);
    }

    #[test]
    #[should_panic(expected = "leg parent must be a body link")]
    fn parent_past_the_tail_panics() {
        let _ = SalamanderBuilder::new(BodyPlan::new(3, 1, 2))
            .with_legs_parents(vec![4])
            .build();
    }

    #[test]
    fn spawn_applies_joint_damping() {
        let mut backend = RecordingBackend::new();
        let builder = SalamanderBuilder::new(BodyPlan::new(3, 1, 2));
        let animat = builder.spawn(&mut backend).unwrap();
        assert_eq!(animat.joint_count(&backend).unwrap(), 7);

        let damped = backend
            .calls()
            .iter()
            .filter(|call| {
                matches!(call, RecordedCall::Dynamics { update, .. }
                    if update.joint_damping == Some(DEFAULT_JOINT_DAMPING))
            })
            .count();
        assert_eq!(damped, 7);
    }

    #[test]
    fn zero_damping_skips_dynamics_calls() {
        let mut backend = RecordingBackend::new();
        SalamanderBuilder::new(BodyPlan::new(3, 0, 0))
            .with_joint_damping(0.0)
            .spawn(&mut backend)
            .unwrap();
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn controller_follows_control_tables() {
        let mut config = AnimatConfig::default();
        config
            .control
            .modes
            .insert(animat_core::convention::body_joint_name(0), ControlMode::Torque);
        let controller = salamander_controller(&config).unwrap();
        let partition = controller.partition();
        assert_eq!(partition.len(), config.body_plan.plan().n_joints());
        assert_eq!(partition.joints(ControlMode::Torque).len(), 1);
    }
}
