use thiserror::Error;

use crate::types::{BodyId, ControlMode, JointIndex, LinkIndex};

/// Top-level error type for animat crates.
#[derive(Debug, Error)]
pub enum AnimatError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Control error: {0}")]
    Control(#[from] ControlError),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid timestep: {0} (must be > 0)")]
    InvalidTimestep(f64),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

/// Errors reported by a physics backend.
///
/// The core never retries these; they are handed back to the caller as-is.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    #[error("Unknown body: {0}")]
    UnknownBody(BodyId),

    #[error("Joint index {index} out of range for {body} ({count} joints)")]
    JointOutOfRange {
        body: BodyId,
        index: JointIndex,
        count: usize,
    },

    #[error("Link index {index} out of range for {body}")]
    LinkOutOfRange { body: BodyId, index: LinkIndex },

    #[error("Length mismatch for {field}: expected {expected}, got {got}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Unknown parent link: {0}")]
    UnknownParent(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Command failed: {0}")]
    CommandFailed(String),
}

/// Name lookups that missed the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Unknown link: {0}")]
    UnknownLink(String),

    #[error("Unknown joint: {0}")]
    UnknownJoint(String),
}

/// Controller construction and dispatch errors.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("No control mode given for joint {0}")]
    MissingMode(String),

    #[error("No max torque given for joint {0}")]
    MissingMaxTorque(String),

    #[error("Invalid max torque for joint {joint}: {value} (must be finite and >= 0)")]
    InvalidMaxTorque { joint: String, value: f32 },

    #[error("Controller returned no {mode} target for joint {joint}")]
    MissingTarget { mode: ControlMode, joint: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
