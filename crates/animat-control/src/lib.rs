// animat-control: Per-joint control modes, controllers and dispatch.
//
// A `ControlPartition` splits a body's joints by control mode. A
// `MotorController` produces per-step targets for each group, and the
// `ControlDispatcher` turns them into batched, clamped backend commands.

pub mod controller;
pub mod dispatch;
pub mod gait;
pub mod partition;
pub mod ramp;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        controller::{ModelController, MotorController},
        dispatch::{ControlDispatcher, ControlledAnimat, reset_controllers},
        gait::GaitController,
        partition::ControlPartition,
        ramp::TorqueRamp,
    };
}

pub use controller::MotorController;
pub use dispatch::ControlDispatcher;
