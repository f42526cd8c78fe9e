use std::collections::HashMap;
use std::f32::consts::TAU;

use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::convention::{
    BodyPlan, DEFAULT_N_BODY_JOINTS, DEFAULT_N_LEGS, DEFAULT_N_LEGS_DOF,
};
use crate::error::ConfigError;
use crate::types::ControlMode;

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_timestep() -> f64 {
    1e-3
}
const fn default_duration() -> f64 {
    10.0
}
const fn default_gravity() -> [f32; 3] {
    [0.0, 0.0, -9.81]
}
const fn default_n_body_joints() -> usize {
    DEFAULT_N_BODY_JOINTS
}
const fn default_n_legs() -> usize {
    DEFAULT_N_LEGS
}
const fn default_n_legs_dof() -> usize {
    DEFAULT_N_LEGS_DOF
}
fn default_legs_parents() -> Vec<usize> {
    vec![1, 4]
}
const fn default_frequency() -> f32 {
    1.0
}
const fn default_body_amplitude() -> f32 {
    0.3
}
const fn default_body_stand_amplitude() -> f32 {
    0.2
}
const fn default_body_phase_lag() -> f32 {
    TAU
}
fn default_legs_amplitude() -> Vec<f32> {
    vec![0.6, 0.2, 0.2, 0.2]
}
fn default_legs_offset() -> Vec<f32> {
    vec![0.0, 0.3, 0.0, 0.0]
}
const fn default_stiffness() -> f32 {
    1.0
}
const fn default_mode() -> ControlMode {
    ControlMode::Position
}
const fn default_max_torque() -> f32 {
    100.0
}
const fn default_body_friction() -> f32 {
    0.5
}
const fn default_feet_friction() -> f32 {
    1.0
}

// ---------------------------------------------------------------------------
// SimConfig
// ---------------------------------------------------------------------------

/// Simulation loop settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Resource)]
pub struct SimConfig {
    /// Physics and control timestep in seconds (default: 0.001 = 1000 Hz).
    #[serde(default = "default_timestep")]
    pub timestep: f64,

    /// Simulated duration in seconds (default: 10).
    #[serde(default = "default_duration")]
    pub duration: f64,

    /// Gravity vector [x, y, z] in m/s^2.
    #[serde(default = "default_gravity")]
    pub gravity: [f32; 3],

    /// Soft-start duration in seconds over which the global torque scale
    /// ramps from 0 to 1. Zero disables the ramp.
    #[serde(default)]
    pub torque_ramp: f64,

    /// Issue velocity-mode commands each step. Off by default: velocity
    /// joints are partitioned but left undriven unless this is set.
    #[serde(default)]
    pub velocity_dispatch: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            timestep: default_timestep(),
            duration: default_duration(),
            gravity: default_gravity(),
            torque_ramp: 0.0,
            velocity_dispatch: false,
        }
    }
}

impl SimConfig {
    /// Validate configuration. Returns Err on invalid values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timestep <= 0.0 {
            return Err(ConfigError::InvalidTimestep(self.timestep));
        }
        if self.duration < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "duration".into(),
                message: format!("must be >= 0, got {}", self.duration),
            });
        }
        if self.torque_ramp < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "torque_ramp".into(),
                message: format!("must be >= 0, got {}", self.torque_ramp),
            });
        }
        Ok(())
    }

    /// Number of steps needed to cover `duration`.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn n_iterations(&self) -> u64 {
        (self.duration / self.timestep).round() as u64
    }
}

// ---------------------------------------------------------------------------
// BodyPlanConfig
// ---------------------------------------------------------------------------

/// Dimensions of the simulated body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyPlanConfig {
    #[serde(default = "default_n_body_joints")]
    pub n_body_joints: usize,

    /// Number of left/right leg pairs.
    #[serde(default = "default_n_legs")]
    pub n_legs: usize,

    #[serde(default = "default_n_legs_dof")]
    pub n_legs_dof: usize,

    /// Body link each leg pair is attached to, one entry per pair.
    #[serde(default = "default_legs_parents")]
    pub legs_parents: Vec<usize>,
}

impl Default for BodyPlanConfig {
    fn default() -> Self {
        Self {
            n_body_joints: default_n_body_joints(),
            n_legs: default_n_legs(),
            n_legs_dof: default_n_legs_dof(),
            legs_parents: default_legs_parents(),
        }
    }
}

impl BodyPlanConfig {
    pub const fn plan(&self) -> BodyPlan {
        BodyPlan::new(self.n_body_joints, self.n_legs, self.n_legs_dof)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_body_joints == 0 {
            return Err(ConfigError::InvalidValue {
                field: "n_body_joints".into(),
                message: "must be > 0".into(),
            });
        }
        if self.legs_parents.len() != self.n_legs {
            return Err(ConfigError::InvalidValue {
                field: "legs_parents".into(),
                message: format!(
                    "expected {} entries (one per leg pair), got {}",
                    self.n_legs,
                    self.legs_parents.len()
                ),
            });
        }
        if let Some(&parent) = self
            .legs_parents
            .iter()
            .find(|&&p| p > self.n_body_joints)
        {
            return Err(ConfigError::InvalidValue {
                field: "legs_parents".into(),
                message: format!("body link {parent} does not exist"),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// GaitConfig
// ---------------------------------------------------------------------------

/// Open-loop oscillator gait parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaitConfig {
    /// Oscillation frequency in Hz.
    #[serde(default = "default_frequency")]
    pub frequency: f32,

    /// Amplitude of the travelling body wave (rad).
    #[serde(default = "default_body_amplitude")]
    pub body_amplitude: f32,

    /// Amplitude of the standing body wave used while walking (rad).
    #[serde(default = "default_body_stand_amplitude")]
    pub body_stand_amplitude: f32,

    /// Total phase lag along the body axis (rad).
    #[serde(default = "default_body_phase_lag")]
    pub body_phase_lag: f32,

    /// Amplitude per leg degree of freedom (rad).
    #[serde(default = "default_legs_amplitude")]
    pub legs_amplitude: Vec<f32>,

    /// Constant offset per leg degree of freedom (rad).
    #[serde(default = "default_legs_offset")]
    pub legs_offset: Vec<f32>,

    /// Torque per radian of pattern for torque-mode joints (Nm/rad).
    #[serde(default = "default_stiffness")]
    pub stiffness: f32,
}

impl Default for GaitConfig {
    fn default() -> Self {
        Self {
            frequency: default_frequency(),
            body_amplitude: default_body_amplitude(),
            body_stand_amplitude: default_body_stand_amplitude(),
            body_phase_lag: default_body_phase_lag(),
            legs_amplitude: default_legs_amplitude(),
            legs_offset: default_legs_offset(),
            stiffness: default_stiffness(),
        }
    }
}

impl GaitConfig {
    pub fn validate(&self, n_legs_dof: usize) -> Result<(), ConfigError> {
        if self.frequency < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "frequency".into(),
                message: format!("must be >= 0, got {}", self.frequency),
            });
        }
        for (field, values) in [
            ("legs_amplitude", &self.legs_amplitude),
            ("legs_offset", &self.legs_offset),
        ] {
            if values.len() != n_legs_dof {
                return Err(ConfigError::InvalidValue {
                    field: field.into(),
                    message: format!(
                        "expected {n_legs_dof} entries (one per leg dof), got {}",
                        values.len()
                    ),
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ControlConfig
// ---------------------------------------------------------------------------

/// Per-joint control mode and torque limit tables.
///
/// Joints not listed in `modes` / `max_torques` take the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlConfig {
    #[serde(default = "default_mode")]
    pub default_mode: ControlMode,

    #[serde(default = "default_max_torque")]
    pub default_max_torque: f32,

    #[serde(default)]
    pub modes: HashMap<String, ControlMode>,

    #[serde(default)]
    pub max_torques: HashMap<String, f32>,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            default_mode: default_mode(),
            default_max_torque: default_max_torque(),
            modes: HashMap::new(),
            max_torques: HashMap::new(),
        }
    }
}

impl ControlConfig {
    /// Full `{joint -> mode}` and `{joint -> max torque}` tables for `joints`.
    pub fn tables<'a>(
        &self,
        joints: impl IntoIterator<Item = &'a str>,
    ) -> (HashMap<String, ControlMode>, HashMap<String, f32>) {
        let mut modes = HashMap::new();
        let mut max_torques = HashMap::new();
        for joint in joints {
            let mode = self.modes.get(joint).copied().unwrap_or(self.default_mode);
            let max_torque = self
                .max_torques
                .get(joint)
                .copied()
                .unwrap_or(self.default_max_torque);
            modes.insert(joint.to_owned(), mode);
            max_torques.insert(joint.to_owned(), max_torque);
        }
        (modes, max_torques)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = std::iter::once(("default", &self.default_max_torque))
            .chain(self.max_torques.iter().map(|(k, v)| (k.as_str(), v)))
            .find(|(_, v)| !(v.is_finite() && **v >= 0.0));
        if let Some((joint, value)) = invalid {
            return Err(ConfigError::InvalidValue {
                field: format!("max_torques.{joint}"),
                message: format!("must be finite and >= 0, got {value}"),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FrictionConfig
// ---------------------------------------------------------------------------

/// Lateral friction coefficients for body and feet links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrictionConfig {
    #[serde(default = "default_body_friction")]
    pub body: f32,
    #[serde(default = "default_feet_friction")]
    pub feet: f32,
}

impl Default for FrictionConfig {
    fn default() -> Self {
        Self {
            body: default_body_friction(),
            feet: default_feet_friction(),
        }
    }
}

// ---------------------------------------------------------------------------
// AnimatConfig
// ---------------------------------------------------------------------------

/// Complete configuration file for one animat experiment.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnimatConfig {
    #[serde(default)]
    pub simulation: SimConfig,
    #[serde(default)]
    pub body_plan: BodyPlanConfig,
    #[serde(default)]
    pub gait: GaitConfig,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub friction: FrictionConfig,
}

impl AnimatConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.simulation.validate()?;
        self.body_plan.validate()?;
        self.gait.validate(self.body_plan.n_legs_dof)?;
        self.control.validate()?;
        Ok(())
    }

    /// Parse from a TOML string and validate.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from TOML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        AnimatConfig::default().validate().unwrap();
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = AnimatConfig::from_toml_str("").unwrap();
        assert_eq!(config, AnimatConfig::default());
        assert_eq!(config.body_plan.plan(), BodyPlan::default());
    }

    #[test]
    fn n_iterations_covers_duration() {
        let config = SimConfig {
            timestep: 1e-3,
            duration: 2.0,
            ..SimConfig::default()
        };
        assert_eq!(config.n_iterations(), 2000);
    }

    #[test]
    fn rejects_non_positive_timestep() {
        let config = SimConfig {
            timestep: 0.0,
            ..SimConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTimestep(_))
        ));
    }

    #[test]
    fn rejects_mismatched_legs_parents() {
        let toml = r"
            [body_plan]
            n_legs = 3
        ";
        let err = AnimatConfig::from_toml_str(toml).unwrap_err();
        assert!(err.to_string().contains("legs_parents"));
    }

    #[test]
    fn rejects_legs_parent_beyond_body() {
        let plan = BodyPlanConfig {
            legs_parents: vec![1, 12],
            ..BodyPlanConfig::default()
        };
        assert!(plan.validate().is_err());
    }

    #[test]
    fn rejects_gait_vectors_of_wrong_length() {
        let toml = r"
            [gait]
            legs_amplitude = [0.1, 0.2]
        ";
        let err = AnimatConfig::from_toml_str(toml).unwrap_err();
        assert!(err.to_string().contains("legs_amplitude"));
    }

    #[test]
    fn rejects_negative_max_torque() {
        let mut control = ControlConfig::default();
        control.max_torques.insert("joint_a".into(), -1.0);
        let err = control.validate().unwrap_err();
        assert!(err.to_string().contains("joint_a"));
    }

    #[test]
    fn rejects_nan_max_torque() {
        let mut control = ControlConfig::default();
        control.max_torques.insert("joint_a".into(), f32::NAN);
        assert!(control.validate().is_err());

        let toml = r"
            [control]
            default_max_torque = nan
        ";
        let err = AnimatConfig::from_toml_str(toml).unwrap_err();
        assert!(err.to_string().contains("max_torques.default"));

        let toml = r"
            [control]
            max_torques = { joint_b = inf }
        ";
        assert!(AnimatConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn control_tables_apply_overrides() {
        let toml = r#"
            [control]
            default_mode = "position"
            default_max_torque = 5.0
            modes = { joint_b = "torque" }
            max_torques = { joint_b = 2.5 }
        "#;
        let config = AnimatConfig::from_toml_str(toml).unwrap();
        let (modes, torques) = config.control.tables(["joint_a", "joint_b"]);
        assert_eq!(modes["joint_a"], ControlMode::Position);
        assert_eq!(modes["joint_b"], ControlMode::Torque);
        assert!((torques["joint_a"] - 5.0).abs() < f32::EPSILON);
        assert!((torques["joint_b"] - 2.5).abs() < f32::EPSILON);
    }

    #[test]
    fn simulation_section_parses() {
        let toml = r"
            [simulation]
            timestep = 0.002
            duration = 1.0
            torque_ramp = 0.5
            velocity_dispatch = true
        ";
        let config = AnimatConfig::from_toml_str(toml).unwrap();
        assert!((config.simulation.timestep - 0.002).abs() < f64::EPSILON);
        assert!(config.simulation.velocity_dispatch);
        assert_eq!(config.simulation.n_iterations(), 500);
    }

    #[test]
    fn config_error_from_toml() {
        let err = AnimatConfig::from_toml_str("simulation = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }
}
