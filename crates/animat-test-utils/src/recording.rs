//! In-memory physics backend that records every command.
//!
//! [`RecordingBackend`] never integrates anything. It answers introspection
//! queries from the model it was given and appends each command to a call
//! log, so tests can assert on exactly what a dispatcher sent.

use animat_core::convention::joint_name;
use animat_core::error::BackendError;
use animat_core::types::{BodyId, ControlMode, JointIndex, LinkIndex};
use animat_physics::backend::{
    DynamicsInfo, DynamicsUpdate, JointInfo, JointState, MotorTargets, PhysicsBackend,
};
use animat_physics::model::MultiBodyModel;

// ---------------------------------------------------------------------------
// Call log
// ---------------------------------------------------------------------------

/// Owned copy of one [`MotorTargets`] command.
#[derive(Debug, Clone, PartialEq)]
pub struct MotorCommand {
    pub body: BodyId,
    pub mode: ControlMode,
    pub joints: Vec<JointIndex>,
    pub target_positions: Option<Vec<f32>>,
    pub target_velocities: Option<Vec<f32>>,
    pub forces: Option<Vec<f32>>,
}

impl MotorCommand {
    fn from_targets(body: BodyId, targets: &MotorTargets<'_>) -> Self {
        Self {
            body,
            mode: targets.mode,
            joints: targets.joint_indices.to_vec(),
            target_positions: targets.target_positions.map(<[f32]>::to_vec),
            target_velocities: targets.target_velocities.map(<[f32]>::to_vec),
            forces: targets.forces.map(<[f32]>::to_vec),
        }
    }

    /// Whether every value slice present is all zeros.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        [&self.target_positions, &self.target_velocities, &self.forces]
            .into_iter()
            .flatten()
            .all(|values| values.iter().all(|v| *v == 0.0))
    }
}

/// One backend call, in the order it was made.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    Motor(MotorCommand),
    Dynamics {
        body: BodyId,
        link: LinkIndex,
        update: DynamicsUpdate,
    },
    CollisionFilter {
        body: BodyId,
        link: LinkIndex,
        group: u32,
        mask: u32,
    },
    Step,
}

// ---------------------------------------------------------------------------
// RecordingBackend
// ---------------------------------------------------------------------------

struct RecordedBody {
    joints: Vec<JointInfo>,
    /// Indexed by `link + 1`.
    dynamics: Vec<DynamicsInfo>,
    states: Vec<JointState>,
}

impl RecordedBody {
    fn slot(&self, link: LinkIndex) -> Option<usize> {
        usize::try_from(link + 1)
            .ok()
            .filter(|&slot| slot < self.dynamics.len())
    }
}

/// Backend double that records commands instead of simulating.
#[derive(Default)]
pub struct RecordingBackend {
    bodies: Vec<RecordedBody>,
    calls: Vec<RecordedCall>,
    fail_next: Option<BackendError>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call recorded so far.
    pub fn calls(&self) -> &[RecordedCall] {
        &self.calls
    }

    /// Motor commands only, in call order.
    pub fn motor_commands(&self) -> Vec<&MotorCommand> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                RecordedCall::Motor(command) => Some(command),
                _ => None,
            })
            .collect()
    }

    /// Number of simulation steps taken.
    pub fn steps(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, RecordedCall::Step))
            .count()
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Make the next command (motor, dynamics, filter or step) fail with `error`.
    pub fn fail_next(&mut self, error: BackendError) {
        self.fail_next = Some(error);
    }

    fn body(&self, body: BodyId) -> Result<&RecordedBody, BackendError> {
        usize::try_from(body.raw())
            .ok()
            .and_then(|i| self.bodies.get(i))
            .ok_or(BackendError::UnknownBody(body))
    }

    fn body_mut(&mut self, body: BodyId) -> Result<&mut RecordedBody, BackendError> {
        usize::try_from(body.raw())
            .ok()
            .and_then(|i| self.bodies.get_mut(i))
            .ok_or(BackendError::UnknownBody(body))
    }

    fn check_failure(&mut self) -> Result<(), BackendError> {
        self.fail_next.take().map_or(Ok(()), Err)
    }

    fn joint_slot(&self, body: BodyId, joint: JointIndex) -> Result<usize, BackendError> {
        let count = self.body(body)?.joints.len();
        usize::try_from(joint)
            .ok()
            .filter(|&j| j < count)
            .ok_or(BackendError::JointOutOfRange {
                body,
                index: joint,
                count,
            })
    }
}

impl PhysicsBackend for RecordingBackend {
    fn name(&self) -> &str {
        "recording"
    }

    fn create_multi_body(&mut self, model: &MultiBodyModel) -> Result<BodyId, BackendError> {
        let parents = model.parent_indices()?;
        let id = u32::try_from(self.bodies.len())
            .map(BodyId)
            .map_err(|_| BackendError::Unsupported("too many bodies".into()))?;

        let joints = model
            .links
            .iter()
            .zip(parents)
            .zip(0..)
            .map(|((link, parent_index), index)| JointInfo {
                index,
                name: joint_name(&link.name),
                kind: link.joint_kind,
                axis: link.joint_axis,
                parent_index,
                link_name: link.name.clone(),
                damping: 0.0,
            })
            .collect::<Vec<_>>();
        let dynamics = std::iter::once(&model.base)
            .chain(&model.links)
            .map(|link| {
                let inertial = link.inertial_pose();
                DynamicsInfo {
                    mass: link.mass(),
                    lateral_friction: link.collision.friction,
                    restitution: link.collision.restitution,
                    local_inertia_diagonal: link.inertia_diagonal(),
                    local_inertial_position: inertial.position,
                    local_inertial_orientation: inertial.orientation,
                    ..DynamicsInfo::default()
                }
            })
            .collect();
        let states = vec![JointState::default(); joints.len()];

        self.bodies.push(RecordedBody {
            joints,
            dynamics,
            states,
        });
        Ok(id)
    }

    fn joint_count(&self, body: BodyId) -> Result<usize, BackendError> {
        Ok(self.body(body)?.joints.len())
    }

    fn joint_info(&self, body: BodyId, joint: JointIndex) -> Result<JointInfo, BackendError> {
        let slot = self.joint_slot(body, joint)?;
        let rb = self.body(body)?;
        let mut info = rb.joints[slot].clone();
        info.damping = rb.dynamics[slot + 1].joint_damping;
        Ok(info)
    }

    fn dynamics_info(&self, body: BodyId, link: LinkIndex) -> Result<DynamicsInfo, BackendError> {
        let rb = self.body(body)?;
        rb.slot(link)
            .map(|slot| rb.dynamics[slot].clone())
            .ok_or(BackendError::LinkOutOfRange { body, index: link })
    }

    fn joint_state(&self, body: BodyId, joint: JointIndex) -> Result<JointState, BackendError> {
        let slot = self.joint_slot(body, joint)?;
        Ok(self.body(body)?.states[slot])
    }

    fn set_motor_targets(
        &mut self,
        body: BodyId,
        targets: &MotorTargets<'_>,
    ) -> Result<(), BackendError> {
        self.check_failure()?;
        targets.validate()?;
        let slots = targets
            .joint_indices
            .iter()
            .map(|&j| self.joint_slot(body, j))
            .collect::<Result<Vec<_>, _>>()?;

        let rb = self.body_mut(body)?;
        for (i, slot) in slots.into_iter().enumerate() {
            let state = &mut rb.states[slot];
            match targets.mode {
                ControlMode::Position => {
                    state.position = MotorTargets::value(targets.target_positions, i, 0.0);
                    state.applied_torque = 0.0;
                }
                ControlMode::Velocity => {
                    state.velocity = MotorTargets::value(targets.target_velocities, i, 0.0);
                    state.applied_torque = 0.0;
                }
                ControlMode::Torque => {
                    state.applied_torque = MotorTargets::value(targets.forces, i, 0.0);
                }
            }
        }
        self.calls
            .push(RecordedCall::Motor(MotorCommand::from_targets(body, targets)));
        Ok(())
    }

    fn set_dynamics(
        &mut self,
        body: BodyId,
        link: LinkIndex,
        update: &DynamicsUpdate,
    ) -> Result<(), BackendError> {
        self.check_failure()?;
        let rb = self.body_mut(body)?;
        let slot = rb
            .slot(link)
            .ok_or(BackendError::LinkOutOfRange { body, index: link })?;
        update.apply_to(&mut rb.dynamics[slot]);
        self.calls.push(RecordedCall::Dynamics {
            body,
            link,
            update: update.clone(),
        });
        Ok(())
    }

    fn set_collision_filter(
        &mut self,
        body: BodyId,
        link: LinkIndex,
        group: u32,
        mask: u32,
    ) -> Result<(), BackendError> {
        self.check_failure()?;
        let rb = self.body(body)?;
        if rb.slot(link).is_none() {
            return Err(BackendError::LinkOutOfRange { body, index: link });
        }
        self.calls.push(RecordedCall::CollisionFilter {
            body,
            link,
            group,
            mask,
        });
        Ok(())
    }

    fn step_simulation(&mut self) -> Result<(), BackendError> {
        self.check_failure()?;
        self.calls.push(RecordedCall::Step);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
