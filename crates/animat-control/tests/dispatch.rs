//! Dispatcher behaviour against the recording backend.

use std::collections::HashMap;

use animat_control::prelude::*;
use animat_core::config::ControlConfig;
use animat_core::convention::{BodyPlan, body_joint_name};
use animat_core::error::{BackendError, ControlError, RegistryError};
use animat_core::types::ControlMode;
use animat_physics::prelude::*;
use animat_test_utils::{RecordingBackend, plan_model};

const DT: f64 = 1e-3;

fn spawn(backend: &mut RecordingBackend, plan: &BodyPlan) -> Animat {
    let model = plan_model(plan, &[1, 4][..plan.n_legs]);
    Animat::spawn(backend, &model).unwrap()
}

/// Fixed torque for every joint of its torque group.
struct ConstantTorque {
    partition: ControlPartition,
    value: f32,
}

impl MotorController for ConstantTorque {
    fn partition(&self) -> &ControlPartition {
        &self.partition
    }

    fn torques(&mut self, _iteration: u64, _time: f64, _timestep: f64) -> HashMap<String, f32> {
        self.partition
            .joints(ControlMode::Torque)
            .iter()
            .map(|j| (j.clone(), self.value))
            .collect()
    }
}

/// Returns nothing at all for its position group.
struct Forgetful {
    partition: ControlPartition,
}

impl MotorController for Forgetful {
    fn partition(&self) -> &ControlPartition {
        &self.partition
    }

    fn positions(&mut self, _iteration: u64, _time: f64, _timestep: f64) -> HashMap<String, f32> {
        HashMap::new()
    }
}

fn torque_body(backend: &mut RecordingBackend, value: f32, max: f32) -> ControlledAnimat {
    let plan = BodyPlan::new(4, 0, 0);
    let animat = spawn(backend, &plan);
    let partition =
        ControlPartition::from_uniform(plan.joint_names(), ControlMode::Torque, max).unwrap();
    ControlledAnimat::new(animat, Box::new(ConstantTorque { partition, value })).unwrap()
}

#[test]
fn first_step_resets_then_sends_one_torque_command() {
    let mut backend = RecordingBackend::new();
    let mut models = vec![torque_body(&mut backend, 0.5, 10.0)];

    ControlDispatcher::new()
        .control_models(&mut backend, 0, 0.0, DT, &mut models, 1.0)
        .unwrap();

    let commands = backend.motor_commands();
    assert_eq!(commands.len(), 4);
    let modes: Vec<ControlMode> = commands.iter().map(|c| c.mode).collect();
    assert_eq!(
        modes,
        [
            ControlMode::Position,
            ControlMode::Velocity,
            ControlMode::Torque,
            ControlMode::Torque
        ]
    );
    for reset in &commands[..3] {
        assert_eq!(reset.joints, vec![0, 1, 2, 3]);
        assert!(reset.is_zero());
    }
    assert_eq!(commands[3].forces.as_deref(), Some(&[0.5; 4][..]));
}

#[test]
fn later_steps_do_not_reset() {
    let mut backend = RecordingBackend::new();
    let mut models = vec![torque_body(&mut backend, 0.5, 10.0)];
    let dispatcher = ControlDispatcher::new();
    dispatcher
        .control_models(&mut backend, 0, 0.0, DT, &mut models, 1.0)
        .unwrap();
    backend.clear_calls();

    dispatcher
        .control_models(&mut backend, 1, DT, DT, &mut models, 1.0)
        .unwrap();
    let commands = backend.motor_commands();
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].mode, ControlMode::Torque);
}

#[test]
fn torques_are_clamped_then_scaled() {
    let mut backend = RecordingBackend::new();
    let mut models = vec![
        torque_body(&mut backend, 25.0, 10.0),
        torque_body(&mut backend, -25.0, 10.0),
        torque_body(&mut backend, 3.0, 10.0),
    ];
    ControlDispatcher::new()
        .control_models(&mut backend, 5, 0.005, DT, &mut models, 0.5)
        .unwrap();

    let commands = backend.motor_commands();
    assert_eq!(commands.len(), 3);
    assert_eq!(commands[0].forces.as_deref(), Some(&[5.0; 4][..]));
    assert_eq!(commands[1].forces.as_deref(), Some(&[-5.0; 4][..]));
    assert_eq!(commands[1].body, models[1].animat.identity());
    // Within the limit only the scale applies.
    assert_eq!(commands[2].forces.as_deref(), Some(&[1.5; 4][..]));
}

#[test]
fn unusable_torque_limits_fail_before_dispatch() {
    let plan = BodyPlan::new(4, 0, 0);
    for max in [-1.0, f32::NAN] {
        let err = ControlPartition::from_uniform(plan.joint_names(), ControlMode::Torque, max)
            .unwrap_err();
        assert!(matches!(err, ControlError::InvalidMaxTorque { .. }));
    }

    let mut config = ControlConfig {
        default_mode: ControlMode::Torque,
        ..ControlConfig::default()
    };
    config.max_torques.insert("joint_link_body_2".into(), -1.0);
    let joints = plan.joint_names();
    let err = ControlPartition::from_config(joints.iter().map(String::as_str), &config).unwrap_err();
    assert!(
        matches!(err, ControlError::InvalidMaxTorque { ref joint, .. } if joint == "joint_link_body_2")
    );
}

#[test]
fn position_limits_follow_torque_scale() {
    let mut backend = RecordingBackend::new();
    let plan = BodyPlan::default();
    let animat = spawn(&mut backend, &plan);
    let partition =
        ControlPartition::from_uniform(plan.joint_names(), ControlMode::Position, 8.0).unwrap();
    let gait = GaitController::new(&plan, &animat_core::config::GaitConfig::default(), partition);
    let mut models = vec![ControlledAnimat::new(animat, Box::new(gait)).unwrap()];

    ControlDispatcher::new()
        .control_models(&mut backend, 3, 0.003, DT, &mut models, 0.25)
        .unwrap();

    let commands = backend.motor_commands();
    assert_eq!(commands.len(), 1);
    let command = commands[0];
    assert_eq!(command.mode, ControlMode::Position);
    assert_eq!(command.joints.len(), plan.n_joints());
    assert_eq!(command.forces.as_deref(), Some(&vec![2.0; plan.n_joints()][..]));
    assert!(command.target_positions.is_some());
}

#[test]
fn velocity_group_needs_opt_in() {
    let plan = BodyPlan::new(3, 0, 0);
    let mut modes = HashMap::new();
    let mut torques = HashMap::new();
    for (i, name) in plan.joint_names().into_iter().enumerate() {
        let mode = if i == 0 {
            ControlMode::Velocity
        } else {
            ControlMode::Position
        };
        modes.insert(name.clone(), mode);
        torques.insert(name, 4.0);
    }

    for (enabled, expected) in [(false, 1), (true, 2)] {
        let mut backend = RecordingBackend::new();
        let animat = spawn(&mut backend, &plan);
        let partition = ControlPartition::new(plan.joint_names(), &modes, &torques).unwrap();
        let mut models =
            vec![ControlledAnimat::new(animat, Box::new(ModelController::new(partition))).unwrap()];

        ControlDispatcher::new()
            .with_velocity_dispatch(enabled)
            .control_models(&mut backend, 1, DT, DT, &mut models, 1.0)
            .unwrap();

        let commands = backend.motor_commands();
        assert_eq!(commands.len(), expected);
        if enabled {
            assert_eq!(commands[1].mode, ControlMode::Velocity);
            assert_eq!(commands[1].joints, vec![0]);
            assert_eq!(commands[1].forces.as_deref(), Some(&[4.0][..]));
        }
    }
}

#[test]
fn uncontrolled_bodies_are_skipped() {
    let mut backend = RecordingBackend::new();
    let passive = spawn(&mut backend, &BodyPlan::new(2, 0, 0));
    let mut models = vec![
        ControlledAnimat::uncontrolled(passive),
        torque_body(&mut backend, 1.0, 2.0),
    ];
    assert!(models[0].controller().is_none());

    ControlDispatcher::new()
        .control_models(&mut backend, 0, 0.0, DT, &mut models, 1.0)
        .unwrap();

    let active = models[1].animat.identity();
    assert!(backend.motor_commands().iter().all(|c| c.body == active));
}

#[test]
fn backend_errors_propagate() {
    let mut backend = RecordingBackend::new();
    let mut models = vec![torque_body(&mut backend, 1.0, 2.0)];
    backend.fail_next(BackendError::CommandFailed("link lost".into()));

    let err = ControlDispatcher::new()
        .control_models(&mut backend, 0, 0.0, DT, &mut models, 1.0)
        .unwrap_err();
    assert!(matches!(
        err,
        ControlError::Backend(BackendError::CommandFailed(ref msg)) if msg == "link lost"
    ));
    assert!(backend.motor_commands().is_empty());
}

#[test]
fn missing_controller_target_is_an_error() {
    let mut backend = RecordingBackend::new();
    let plan = BodyPlan::new(2, 0, 0);
    let animat = spawn(&mut backend, &plan);
    let partition =
        ControlPartition::from_uniform(plan.joint_names(), ControlMode::Position, 1.0).unwrap();
    let mut models = vec![ControlledAnimat::new(animat, Box::new(Forgetful { partition })).unwrap()];

    let err = ControlDispatcher::new()
        .control_models(&mut backend, 1, DT, DT, &mut models, 1.0)
        .unwrap_err();
    assert!(matches!(
        err,
        ControlError::MissingTarget { mode: ControlMode::Position, ref joint } if *joint == body_joint_name(0)
    ));
}

#[test]
fn unknown_partition_joint_fails_construction() {
    let mut backend = RecordingBackend::new();
    let animat = spawn(&mut backend, &BodyPlan::new(2, 0, 0));
    let partition =
        ControlPartition::from_uniform(["joint_tail"], ControlMode::Torque, 1.0).unwrap();
    let err = ControlledAnimat::new(animat, Box::new(ModelController::new(partition)))
        .err()
        .unwrap();
    assert!(matches!(
        err,
        ControlError::Registry(RegistryError::UnknownJoint(ref j)) if j == "joint_tail"
    ));
}

#[test]
fn resolved_indices_follow_partition_order() {
    let mut backend = RecordingBackend::new();
    let plan = BodyPlan::new(3, 0, 0);
    let animat = spawn(&mut backend, &plan);
    let names = plan.joint_names();
    let reversed: Vec<&str> = names.iter().rev().map(String::as_str).collect();
    let partition = ControlPartition::from_uniform(reversed, ControlMode::Position, 1.0).unwrap();
    let model = ControlledAnimat::new(animat, Box::new(ModelController::new(partition))).unwrap();
    assert_eq!(model.joint_indices(ControlMode::Position), [2, 1, 0]);
    assert!(model.joint_indices(ControlMode::Torque).is_empty());
}
