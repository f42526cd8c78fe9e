//! Open-loop oscillator gait.
//!
//! Every joint is driven by an antagonistic oscillator pair laid out with
//! the body-plan convention. The right oscillator lags the left by half a
//! period, so the pair's difference is a single sinusoid in the left phase:
//!
//! ```text
//! angle = offset + A sin(wt + phase) + S sin(wt)
//! ```
//!
//! `S` is the standing-wave amplitude, non-zero on body joints of legged
//! plans only. Body phases lag along the axis by `body_phase_lag`. Leg pairs
//! alternate so diagonal legs move together.

use std::collections::HashMap;
use std::f32::consts::{FRAC_PI_2, PI, TAU};

use animat_core::config::GaitConfig;
use animat_core::convention::{BodyPlan, body_joint_name, leg_joint_name};
use animat_core::types::{ControlMode, Side};

use crate::controller::MotorController;
use crate::partition::ControlPartition;

#[derive(Debug, Clone, Copy, PartialEq)]
struct JointPattern {
    amplitude: f32,
    offset: f32,
    phase: f32,
    stand: f32,
}

impl JointPattern {
    fn angle(&self, wt: f32) -> f32 {
        self.offset + self.amplitude * (wt + self.phase).sin() + self.stand * wt.sin()
    }

    fn rate(&self, wt: f32, omega: f32) -> f32 {
        omega * (self.amplitude * (wt + self.phase).cos() + self.stand * wt.cos())
    }
}

/// Oscillator-driven gait over a [`BodyPlan`].
#[derive(Debug, Clone)]
pub struct GaitController {
    partition: ControlPartition,
    omega: f32,
    stiffness: f32,
    phases: Vec<f32>,
    patterns: HashMap<String, JointPattern>,
}

impl GaitController {
    /// Joints absent from `plan` get zero targets.
    pub fn new(plan: &BodyPlan, gait: &GaitConfig, partition: ControlPartition) -> Self {
        let phases = oscillator_phases(plan, gait.body_phase_lag);
        let mut patterns = HashMap::with_capacity(plan.n_joints());
        let stand = if plan.n_legs > 0 {
            gait.body_stand_amplitude
        } else {
            0.0
        };

        for joint in 0..plan.n_body_joints {
            let phase = phases[plan.body_joint_index(joint, Side::Left)];
            patterns.insert(
                body_joint_name(joint),
                JointPattern {
                    amplitude: gait.body_amplitude,
                    offset: 0.0,
                    phase,
                    stand,
                },
            );
        }
        for dof in plan.leg_dofs() {
            let phase = phases[plan.leg_oscillator_index(dof.leg, dof.side, dof.joint, Side::Left)];
            patterns.insert(
                leg_joint_name(dof.leg, dof.side, dof.joint),
                JointPattern {
                    amplitude: gait.legs_amplitude.get(dof.joint).copied().unwrap_or(0.0),
                    offset: gait.legs_offset.get(dof.joint).copied().unwrap_or(0.0),
                    phase,
                    stand: 0.0,
                },
            );
        }

        Self {
            partition,
            omega: TAU * gait.frequency,
            stiffness: gait.stiffness,
            phases,
            patterns,
        }
    }

    /// Phase offset of every oscillator, by flat oscillator index.
    #[must_use]
    pub fn oscillator_phases(&self) -> &[f32] {
        &self.phases
    }

    /// Pattern angle of `joint` at `time`, if the joint belongs to the plan.
    #[must_use]
    pub fn angle(&self, joint: &str, time: f64) -> Option<f32> {
        let wt = self.wt(time);
        self.patterns.get(joint).map(|p| p.angle(wt))
    }

    /// Time derivative of [`angle`](Self::angle).
    #[must_use]
    pub fn rate(&self, joint: &str, time: f64) -> Option<f32> {
        let wt = self.wt(time);
        self.patterns.get(joint).map(|p| p.rate(wt, self.omega))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn wt(&self, time: f64) -> f32 {
        (f64::from(self.omega) * time) as f32
    }

    fn targets(&self, mode: ControlMode, value: impl Fn(&JointPattern) -> f32) -> HashMap<String, f32> {
        self.partition
            .joints(mode)
            .iter()
            .map(|joint| {
                let v = self.patterns.get(joint).map_or(0.0, &value);
                (joint.clone(), v)
            })
            .collect()
    }
}

impl MotorController for GaitController {
    fn partition(&self) -> &ControlPartition {
        &self.partition
    }

    fn positions(&mut self, _iteration: u64, time: f64, _timestep: f64) -> HashMap<String, f32> {
        let wt = self.wt(time);
        self.targets(ControlMode::Position, |p| p.angle(wt))
    }

    fn velocities(&mut self, _iteration: u64, time: f64, _timestep: f64) -> HashMap<String, f32> {
        let (wt, omega) = (self.wt(time), self.omega);
        self.targets(ControlMode::Velocity, |p| p.rate(wt, omega))
    }

    fn torques(&mut self, _iteration: u64, time: f64, _timestep: f64) -> HashMap<String, f32> {
        let (wt, stiffness) = (self.wt(time), self.stiffness);
        self.targets(ControlMode::Torque, |p| stiffness * p.angle(wt))
    }
}

/// Phase offsets of all `plan.n_oscillators()` oscillators.
#[allow(clippy::cast_precision_loss)]
fn oscillator_phases(plan: &BodyPlan, body_phase_lag: f32) -> Vec<f32> {
    let mut phases = vec![0.0; plan.n_oscillators()];
    let n_body = plan.n_body_joints.max(1) as f32;
    for joint in 0..plan.n_body_joints {
        let left = -body_phase_lag * joint as f32 / n_body;
        for side in Side::BOTH {
            phases[plan.body_joint_index(joint, side)] = left + PI * side.index() as f32;
        }
    }
    for dof in plan.leg_dofs() {
        let leg_phase = PI * ((dof.leg + dof.side.index()) % 2) as f32;
        let joint_phase = if dof.joint == 0 { 0.0 } else { FRAC_PI_2 };
        for side in Side::BOTH {
            let index = plan.leg_oscillator_index(dof.leg, dof.side, dof.joint, side);
            phases[index] = leg_phase + joint_phase + PI * side.index() as f32;
        }
    }
    phases
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(plan: &BodyPlan, mode: ControlMode) -> GaitController {
        let partition = ControlPartition::from_uniform(plan.joint_names(), mode, 10.0).unwrap();
        GaitController::new(plan, &GaitConfig::default(), partition)
    }

    #[test]
    fn antagonistic_pairs_are_half_a_period_apart() {
        let plan = BodyPlan::default();
        let gait = controller(&plan, ControlMode::Position);
        let phases = gait.oscillator_phases();
        assert_eq!(phases.len(), plan.n_oscillators());
        for joint in 0..plan.n_body_joints {
            let l = phases[plan.body_joint_index(joint, Side::Left)];
            let r = phases[plan.body_joint_index(joint, Side::Right)];
            assert!((r - l - PI).abs() < 1e-6);
        }
        for dof in plan.leg_dofs() {
            let l = phases[plan.leg_oscillator_index(dof.leg, dof.side, dof.joint, Side::Left)];
            let r = phases[plan.leg_oscillator_index(dof.leg, dof.side, dof.joint, Side::Right)];
            assert!((r - l - PI).abs() < 1e-6);
        }
    }

    #[test]
    fn positions_cover_position_group_only() {
        let plan = BodyPlan::default();
        let mut gait = controller(&plan, ControlMode::Position);
        let positions = gait.positions(0, 0.25, 1e-3);
        assert_eq!(positions.len(), plan.n_joints());
        assert!(gait.torques(0, 0.25, 1e-3).is_empty());
        assert!(gait.velocities(0, 0.25, 1e-3).is_empty());
    }

    #[test]
    fn first_body_joint_follows_sine() {
        let plan = BodyPlan::new(4, 0, 0);
        let mut gait = controller(&plan, ControlMode::Position);
        // No legs, no standing wave: joint 0 is 0.3 sin(2 pi t).
        let positions = gait.positions(250, 0.25, 1e-3);
        assert!((positions[&body_joint_name(0)] - 0.3).abs() < 1e-5);
    }

    #[test]
    fn velocity_is_derivative_of_angle() {
        let plan = BodyPlan::default();
        let gait = controller(&plan, ControlMode::Velocity);
        let joint = leg_joint_name(1, Side::Right, 1);
        let (t, h) = (0.37, 1e-4);
        let numeric = (gait.angle(&joint, t + h).unwrap() - gait.angle(&joint, t - h).unwrap())
            / (2.0 * h as f32);
        assert!((numeric - gait.rate(&joint, t).unwrap()).abs() < 1e-2);
    }

    #[test]
    fn torques_scale_pattern_by_stiffness() {
        let plan = BodyPlan::default();
        let partition =
            ControlPartition::from_uniform(plan.joint_names(), ControlMode::Torque, 10.0).unwrap();
        let gait_config = GaitConfig {
            stiffness: 2.0,
            ..GaitConfig::default()
        };
        let mut gait = GaitController::new(&plan, &gait_config, partition);
        let torques = gait.torques(10, 0.1, 1e-3);
        let joint = body_joint_name(3);
        assert!((torques[&joint] - 2.0 * gait.angle(&joint, 0.1).unwrap()).abs() < 1e-6);
    }

    #[test]
    fn unknown_joints_get_zero() {
        let plan = BodyPlan::new(2, 0, 0);
        let partition =
            ControlPartition::from_uniform(["joint_tail"], ControlMode::Position, 1.0).unwrap();
        let mut gait = GaitController::new(&plan, &GaitConfig::default(), partition);
        assert_eq!(gait.positions(0, 0.3, 1e-3)["joint_tail"], 0.0);
    }
}
