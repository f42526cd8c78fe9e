//! Motor controller trait and the no-op model controller.

use std::collections::HashMap;

use animat_core::types::ControlMode;

use crate::partition::ControlPartition;

// ---------------------------------------------------------------------------
// MotorController
// ---------------------------------------------------------------------------

/// Per-step target generator for one body.
///
/// Each target method returns a map restricted to the joints of its mode
/// group. The defaults return zeros, so an implementation only overrides the
/// modes it drives. `iteration` counts up from zero.
pub trait MotorController: Send + Sync {
    /// Joint groups and torque limits this controller was built with.
    fn partition(&self) -> &ControlPartition;

    /// Advance internal state. Called once per body per step, before any
    /// target query.
    fn step(&mut self, _iteration: u64, _time: f64, _timestep: f64) {}

    /// Target angles for the position group.
    fn positions(&mut self, _iteration: u64, _time: f64, _timestep: f64) -> HashMap<String, f32> {
        self.partition().zeros(ControlMode::Position)
    }

    /// Target velocities for the velocity group.
    fn velocities(&mut self, _iteration: u64, _time: f64, _timestep: f64) -> HashMap<String, f32> {
        self.partition().zeros(ControlMode::Velocity)
    }

    /// Torques for the torque group, before clamping.
    fn torques(&mut self, _iteration: u64, _time: f64, _timestep: f64) -> HashMap<String, f32> {
        self.partition().zeros(ControlMode::Torque)
    }
}

// ---------------------------------------------------------------------------
// ModelController
// ---------------------------------------------------------------------------

/// Controller that holds every joint at zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelController {
    partition: ControlPartition,
}

impl ModelController {
    pub const fn new(partition: ControlPartition) -> Self {
        Self { partition }
    }
}

impl MotorController for ModelController {
    fn partition(&self) -> &ControlPartition {
        &self.partition
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
