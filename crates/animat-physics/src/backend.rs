//! Engine-agnostic physics backend trait.
//!
//! Any physics engine (rapier, bullet, an in-memory recorder for tests)
//! implements [`PhysicsBackend`]. The rest of the workspace only sees bodies,
//! links and joints as integer indices plus the records defined here.

use std::fmt;
use std::ops::Range;

use animat_core::error::BackendError;
use animat_core::types::{BodyId, ControlMode, JointIndex, JointKind, LinkIndex};
use bevy::math::{Quat, Vec3};

use crate::model::MultiBodyModel;

// ---------------------------------------------------------------------------
// JointInfo
// ---------------------------------------------------------------------------

/// Static description of one joint, as reported by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct JointInfo {
    /// Backend index of the joint.
    pub index: JointIndex,
    /// Joint name.
    pub name: String,
    /// Kinematic type.
    pub kind: JointKind,
    /// Rotation or translation axis in the child frame.
    pub axis: Vec3,
    /// Index of the parent link (`-1` for the base).
    pub parent_index: LinkIndex,
    /// Name of the child link, whose index equals `index`.
    pub link_name: String,
    /// Viscous joint damping.
    pub damping: f32,
}

// ---------------------------------------------------------------------------
// JointState
// ---------------------------------------------------------------------------

/// Joint state feedback after the last step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JointState {
    /// Position (rad or m).
    pub position: f32,
    /// Velocity (rad/s or m/s).
    pub velocity: f32,
    /// Torque the motor applied during the last step (Nm or N).
    pub applied_torque: f32,
}

// ---------------------------------------------------------------------------
// DynamicsInfo
// ---------------------------------------------------------------------------

/// Dynamics record of one link.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicsInfo {
    pub mass: f32,
    pub lateral_friction: f32,
    pub local_inertia_diagonal: [f32; 3],
    pub local_inertial_position: Vec3,
    pub local_inertial_orientation: Quat,
    pub restitution: f32,
    pub rolling_friction: f32,
    pub spinning_friction: f32,
    pub contact_damping: f32,
    pub contact_stiffness: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub joint_damping: f32,
}

impl Default for DynamicsInfo {
    fn default() -> Self {
        Self {
            mass: 0.0,
            lateral_friction: 0.5,
            local_inertia_diagonal: [0.0; 3],
            local_inertial_position: Vec3::ZERO,
            local_inertial_orientation: Quat::IDENTITY,
            restitution: 0.0,
            rolling_friction: 0.0,
            spinning_friction: 0.0,
            contact_damping: -1.0,
            contact_stiffness: -1.0,
            linear_damping: 0.0,
            angular_damping: 0.0,
            joint_damping: 0.0,
        }
    }
}

impl fmt::Display for DynamicsInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "      mass: {}", self.mass)?;
        writeln!(f, "      lateral_friction: {}", self.lateral_friction)?;
        writeln!(f, "      local inertia diagonal: {:?}", self.local_inertia_diagonal)?;
        writeln!(f, "      local inertial pos: {}", self.local_inertial_position)?;
        writeln!(f, "      local inertial orn: {}", self.local_inertial_orientation)?;
        writeln!(f, "      restitution: {}", self.restitution)?;
        writeln!(f, "      rolling friction: {}", self.rolling_friction)?;
        writeln!(f, "      spinning friction: {}", self.spinning_friction)?;
        writeln!(f, "      contact damping: {}", self.contact_damping)?;
        write!(f, "      contact stiffness: {}", self.contact_stiffness)
    }
}

// ---------------------------------------------------------------------------
// DynamicsUpdate
// ---------------------------------------------------------------------------

/// Named dynamics overrides for one link. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DynamicsUpdate {
    pub mass: Option<f32>,
    pub lateral_friction: Option<f32>,
    pub spinning_friction: Option<f32>,
    pub rolling_friction: Option<f32>,
    pub restitution: Option<f32>,
    pub linear_damping: Option<f32>,
    pub angular_damping: Option<f32>,
    pub joint_damping: Option<f32>,
    pub contact_stiffness: Option<f32>,
    pub contact_damping: Option<f32>,
}

impl DynamicsUpdate {
    #[must_use]
    pub const fn with_mass(mut self, mass: f32) -> Self {
        self.mass = Some(mass);
        self
    }

    #[must_use]
    pub const fn with_lateral_friction(mut self, friction: f32) -> Self {
        self.lateral_friction = Some(friction);
        self
    }

    #[must_use]
    pub const fn with_spinning_friction(mut self, friction: f32) -> Self {
        self.spinning_friction = Some(friction);
        self
    }

    #[must_use]
    pub const fn with_rolling_friction(mut self, friction: f32) -> Self {
        self.rolling_friction = Some(friction);
        self
    }

    #[must_use]
    pub const fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = Some(restitution);
        self
    }

    #[must_use]
    pub const fn with_linear_damping(mut self, damping: f32) -> Self {
        self.linear_damping = Some(damping);
        self
    }

    #[must_use]
    pub const fn with_angular_damping(mut self, damping: f32) -> Self {
        self.angular_damping = Some(damping);
        self
    }

    #[must_use]
    pub const fn with_joint_damping(mut self, damping: f32) -> Self {
        self.joint_damping = Some(damping);
        self
    }

    /// Contact stiffness and damping are only meaningful together.
    #[must_use]
    pub const fn with_contact(mut self, stiffness: f32, damping: f32) -> Self {
        self.contact_stiffness = Some(stiffness);
        self.contact_damping = Some(damping);
        self
    }

    /// Whether no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Write every set field into `info`.
    pub fn apply_to(&self, info: &mut DynamicsInfo) {
        macro_rules! apply {
            ($($field:ident),*) => {
                $(if let Some(v) = self.$field { info.$field = v; })*
            };
        }
        apply!(
            mass,
            lateral_friction,
            spinning_friction,
            rolling_friction,
            restitution,
            linear_damping,
            angular_damping,
            joint_damping,
            contact_stiffness,
            contact_damping
        );
    }
}

// ---------------------------------------------------------------------------
// MotorTargets
// ---------------------------------------------------------------------------

/// One batched motor command for a set of joints of one body.
///
/// Every present slice must be as long as `joint_indices`.
/// - position mode reads `target_positions`, `target_velocities`, `forces`
///   (force limit).
/// - velocity mode reads `target_velocities`, `forces` (force limit).
/// - torque mode reads `forces` (applied torque).
#[derive(Debug, Clone, Copy)]
pub struct MotorTargets<'a> {
    pub mode: ControlMode,
    pub joint_indices: &'a [JointIndex],
    pub target_positions: Option<&'a [f32]>,
    pub target_velocities: Option<&'a [f32]>,
    pub forces: Option<&'a [f32]>,
}

impl<'a> MotorTargets<'a> {
    /// Position servo targets with per-joint force limits.
    #[must_use]
    pub const fn position(
        joint_indices: &'a [JointIndex],
        target_positions: &'a [f32],
        forces: &'a [f32],
    ) -> Self {
        Self {
            mode: ControlMode::Position,
            joint_indices,
            target_positions: Some(target_positions),
            target_velocities: None,
            forces: Some(forces),
        }
    }

    /// Velocity servo targets with per-joint force limits.
    #[must_use]
    pub const fn velocity(
        joint_indices: &'a [JointIndex],
        target_velocities: &'a [f32],
        forces: &'a [f32],
    ) -> Self {
        Self {
            mode: ControlMode::Velocity,
            joint_indices,
            target_positions: None,
            target_velocities: Some(target_velocities),
            forces: Some(forces),
        }
    }

    /// Direct torques.
    #[must_use]
    pub const fn torque(joint_indices: &'a [JointIndex], torques: &'a [f32]) -> Self {
        Self {
            mode: ControlMode::Torque,
            joint_indices,
            target_positions: None,
            target_velocities: None,
            forces: Some(torques),
        }
    }

    /// Attach target velocities (position mode feed-forward).
    #[must_use]
    pub const fn with_target_velocities(mut self, target_velocities: &'a [f32]) -> Self {
        self.target_velocities = Some(target_velocities);
        self
    }

    /// Number of joints addressed.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.joint_indices.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.joint_indices.is_empty()
    }

    /// Check that every present slice matches `joint_indices` in length.
    pub fn validate(&self) -> Result<(), BackendError> {
        let expected = self.len();
        for (field, values) in [
            ("target_positions", self.target_positions),
            ("target_velocities", self.target_velocities),
            ("forces", self.forces),
        ] {
            if let Some(values) = values
                && values.len() != expected
            {
                return Err(BackendError::LengthMismatch {
                    field,
                    expected,
                    got: values.len(),
                });
            }
        }
        Ok(())
    }

    /// Value of `slice` for the `i`-th joint, or `default` when absent.
    #[must_use]
    pub fn value(slice: Option<&[f32]>, i: usize, default: f32) -> f32 {
        slice.and_then(|s| s.get(i).copied()).unwrap_or(default)
    }
}

// ---------------------------------------------------------------------------
// PhysicsBackend
// ---------------------------------------------------------------------------

/// Trait that concrete physics engines must implement.
///
/// Queries take `&self`, commands take `&mut self`. Errors are returned
/// unmodified to the caller; nothing above this trait retries a failed call.
pub trait PhysicsBackend: Send + Sync + 'static {
    /// Human-readable engine name (e.g., "rapier3d").
    fn name(&self) -> &str;

    /// Instantiate a multi-body. Joint `i` gets the child link `model.links[i]`.
    fn create_multi_body(&mut self, model: &MultiBodyModel) -> Result<BodyId, BackendError>;

    /// Number of joints of `body`.
    fn joint_count(&self, body: BodyId) -> Result<usize, BackendError>;

    /// Static description of joint `joint` of `body`.
    fn joint_info(&self, body: BodyId, joint: JointIndex) -> Result<JointInfo, BackendError>;

    /// Dynamics record of link `link` of `body` (`-1` is the base).
    fn dynamics_info(&self, body: BodyId, link: LinkIndex) -> Result<DynamicsInfo, BackendError>;

    /// State of joint `joint` of `body` after the last step.
    fn joint_state(&self, body: BodyId, joint: JointIndex) -> Result<JointState, BackendError>;

    /// Apply one batched motor command.
    fn set_motor_targets(
        &mut self,
        body: BodyId,
        targets: &MotorTargets<'_>,
    ) -> Result<(), BackendError>;

    /// Zero every joint's motor in all three control modes.
    ///
    /// Issues one batched command per mode, position first, then velocity,
    /// then torque.
    fn reset_motor_controllers(&mut self, body: BodyId) -> Result<(), BackendError> {
        let count = self.joint_count(body)?;
        let joints: Vec<JointIndex> = joint_range(body, count)?.collect();
        let zeros = vec![0.0; count];
        self.set_motor_targets(
            body,
            &MotorTargets::position(&joints, &zeros, &zeros).with_target_velocities(&zeros),
        )?;
        self.set_motor_targets(body, &MotorTargets::velocity(&joints, &zeros, &zeros))?;
        self.set_motor_targets(body, &MotorTargets::torque(&joints, &zeros))
    }

    /// Override dynamics of link `link` of `body`.
    fn set_dynamics(
        &mut self,
        body: BodyId,
        link: LinkIndex,
        update: &DynamicsUpdate,
    ) -> Result<(), BackendError>;

    /// Set the collision filter of link `link` of `body`.
    fn set_collision_filter(
        &mut self,
        body: BodyId,
        link: LinkIndex,
        group: u32,
        mask: u32,
    ) -> Result<(), BackendError>;

    /// Advance the simulation by one timestep.
    fn step_simulation(&mut self) -> Result<(), BackendError>;
}

/// `0..count` as joint identities of `body`.
///
/// Fails when `count` does not fit the identity type.
pub fn joint_range(body: BodyId, count: usize) -> Result<Range<JointIndex>, BackendError> {
    let end = JointIndex::try_from(count).map_err(|_| {
        BackendError::Unsupported(format!("{count} joints on {body} exceed the joint index range"))
    })?;
    Ok(0..end)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Verify the trait is object-safe (can be used as `dyn PhysicsBackend`).
    #[test]
    fn trait_is_object_safe() {
        fn _accepts_boxed(_: Box<dyn PhysicsBackend>) {}
    }

    #[test]
    fn trait_is_send_sync() {
        fn _assert_send_sync<T: Send + Sync>() {}
        _assert_send_sync::<Box<dyn PhysicsBackend>>();
    }

    #[test]
    fn motor_targets_validate_lengths() {
        let joints = [0, 1, 2];
        let ok = MotorTargets::torque(&joints, &[1.0, 2.0, 3.0]);
        assert!(ok.validate().is_ok());
        assert_eq!(ok.len(), 3);

        let short = [1.0, 2.0];
        let bad = MotorTargets::position(&joints, &[0.0; 3], &short);
        assert_eq!(
            bad.validate(),
            Err(BackendError::LengthMismatch {
                field: "forces",
                expected: 3,
                got: 2
            })
        );
    }

    #[test]
    fn motor_targets_modes() {
        let joints = [4];
        assert_eq!(
            MotorTargets::position(&joints, &[0.1], &[1.0]).mode,
            ControlMode::Position
        );
        assert_eq!(
            MotorTargets::velocity(&joints, &[0.1], &[1.0]).mode,
            ControlMode::Velocity
        );
        let torque = MotorTargets::torque(&joints, &[0.5]);
        assert_eq!(torque.mode, ControlMode::Torque);
        assert!(torque.target_positions.is_none());
        assert!((MotorTargets::value(torque.forces, 0, 0.0) - 0.5).abs() < f32::EPSILON);
        assert!((MotorTargets::value(torque.target_velocities, 0, 7.0) - 7.0).abs() < f32::EPSILON);
    }

    #[test]
    fn dynamics_update_applies_only_set_fields() {
        let mut info = DynamicsInfo {
            mass: 2.0,
            ..DynamicsInfo::default()
        };
        let update = DynamicsUpdate::default()
            .with_lateral_friction(0.9)
            .with_joint_damping(0.1);
        assert!(!update.is_empty());
        update.apply_to(&mut info);
        assert!((info.mass - 2.0).abs() < f32::EPSILON);
        assert!((info.lateral_friction - 0.9).abs() < f32::EPSILON);
        assert!((info.joint_damping - 0.1).abs() < f32::EPSILON);
        assert!(DynamicsUpdate::default().is_empty());
    }

    #[test]
    fn dynamics_info_display_lists_fields() {
        let text = DynamicsInfo::default().to_string();
        assert!(text.contains("mass: 0"));
        assert!(text.contains("contact stiffness: -1"));
    }

    /// Reports more joints than a [`JointIndex`] can address.
    struct Oversized {
        commands: usize,
    }

    impl PhysicsBackend for Oversized {
        fn name(&self) -> &str {
            "oversized"
        }

        fn create_multi_body(&mut self, _: &MultiBodyModel) -> Result<BodyId, BackendError> {
            Ok(BodyId(0))
        }

        fn joint_count(&self, _: BodyId) -> Result<usize, BackendError> {
            Ok(usize::MAX)
        }

        fn joint_info(&self, body: BodyId, index: JointIndex) -> Result<JointInfo, BackendError> {
            Err(BackendError::JointOutOfRange { body, index, count: 0 })
        }

        fn dynamics_info(
            &self,
            body: BodyId,
            index: LinkIndex,
        ) -> Result<DynamicsInfo, BackendError> {
            Err(BackendError::LinkOutOfRange { body, index })
        }

        fn joint_state(&self, body: BodyId, index: JointIndex) -> Result<JointState, BackendError> {
            Err(BackendError::JointOutOfRange { body, index, count: 0 })
        }

        fn set_motor_targets(
            &mut self,
            _: BodyId,
            _: &MotorTargets<'_>,
        ) -> Result<(), BackendError> {
            self.commands += 1;
            Ok(())
        }

        fn set_dynamics(
            &mut self,
            _: BodyId,
            _: LinkIndex,
            _: &DynamicsUpdate,
        ) -> Result<(), BackendError> {
            Ok(())
        }

        fn set_collision_filter(
            &mut self,
            _: BodyId,
            _: LinkIndex,
            _: u32,
            _: u32,
        ) -> Result<(), BackendError> {
            Ok(())
        }

        fn step_simulation(&mut self) -> Result<(), BackendError> {
            Ok(())
        }
    }

    #[test]
    fn joint_range_is_contiguous() {
        assert_eq!(joint_range(BodyId(0), 3).unwrap().collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(joint_range(BodyId(0), 0).unwrap().count(), 0);
        assert!(joint_range(BodyId(0), usize::MAX).is_err());
    }

    #[test]
    fn reset_rejects_unaddressable_joints() {
        let mut backend = Oversized { commands: 0 };
        let err = backend.reset_motor_controllers(BodyId(0)).unwrap_err();
        assert!(matches!(err, BackendError::Unsupported(_)));
        assert_eq!(backend.commands, 0);
    }
}
