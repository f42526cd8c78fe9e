// animat-core: Types, topology convention, config and errors for animat simulation.

pub mod config;
pub mod convention;
pub mod error;
pub mod types;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        config::{AnimatConfig, BodyPlanConfig, ControlConfig, FrictionConfig, GaitConfig, SimConfig},
        convention::BodyPlan,
        error::{AnimatError, BackendError, ConfigError, ControlError, RegistryError},
        types::{BASE_LINK, BodyId, ControlMode, JointIndex, JointKind, LinkIndex, Side},
    };
}
