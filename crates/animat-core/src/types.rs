//! Value types shared by every animat crate.
//!
//! Backend identities are plain integers, as physics engines hand them out:
//! a [`BodyId`] per simulated body, and per body a [`LinkIndex`] per link and a
//! [`JointIndex`] per joint. Link `i` is the child of joint `i`, so the two
//! index spaces coincide except for the base link, which is always
//! [`BASE_LINK`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Backend-assigned index of a link within one body. The base link is `-1`.
pub type LinkIndex = i32;

/// Backend-assigned index of a joint within one body (0-based, contiguous).
pub type JointIndex = i32;

/// Identity of the base link of every body.
pub const BASE_LINK: LinkIndex = -1;

// ---------------------------------------------------------------------------
// BodyId
// ---------------------------------------------------------------------------

/// Backend-assigned handle of one simulated body.
///
/// Not stable across simulation restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BodyId(pub u32);

impl BodyId {
    /// Raw integer handle.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "body#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// ControlMode
// ---------------------------------------------------------------------------

/// Actuation semantics applied to a joint for one simulation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    /// Track a target angle with a force-limited servo.
    Position,
    /// Track a target angular velocity with a force-limited servo.
    Velocity,
    /// Apply a torque directly.
    Torque,
}

impl ControlMode {
    /// All modes, in partition order.
    pub const ALL: [Self; 3] = [Self::Position, Self::Velocity, Self::Torque];

    /// Slot of this mode in per-mode arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Position => 0,
            Self::Velocity => 1,
            Self::Torque => 2,
        }
    }

    /// Lowercase name, as used in configuration files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Position => "position",
            Self::Velocity => "velocity",
            Self::Torque => "torque",
        }
    }
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

/// Body side of a leg (or of a body oscillator in antagonistic pairs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Both sides, in index order.
    pub const BOTH: [Self; 2] = [Self::Left, Self::Right];

    /// `0` for left, `1` for right.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => 1,
        }
    }

    /// Single-letter tag used in canonical names.
    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Self::Left => 'L',
            Self::Right => 'R',
        }
    }
}

// ---------------------------------------------------------------------------
// JointKind
// ---------------------------------------------------------------------------

/// Kinematic type of a joint as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointKind {
    /// Rotation about one axis.
    #[default]
    Revolute,
    /// Translation along one axis.
    Prismatic,
    /// Three rotational degrees of freedom.
    Spherical,
    /// Translation in a plane.
    Planar,
    /// No relative motion.
    Fixed,
}

impl JointKind {
    /// Whether a motor can drive this joint along a single axis.
    #[must_use]
    pub const fn is_actuated(self) -> bool {
        matches!(self, Self::Revolute | Self::Prismatic)
    }

    /// Capitalised name used in diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Revolute => "Revolute",
            Self::Prismatic => "Prismatic",
            Self::Spherical => "Spherical",
            Self::Planar => "Planar",
            Self::Fixed => "Fixed",
        }
    }
}

impl fmt::Display for JointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_mode_indices_are_distinct_and_ordered() {
        let indices: Vec<usize> = ControlMode::ALL.iter().map(|m| m.index()).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn control_mode_parses_from_toml_strings() {
        #[derive(Deserialize)]
        struct Wrapper {
            mode: ControlMode,
        }
        let w: Wrapper = toml::from_str("mode = \"torque\"").unwrap();
        assert_eq!(w.mode, ControlMode::Torque);
        assert_eq!(ControlMode::Velocity.to_string(), "velocity");
    }

    #[test]
    fn side_indices_and_letters() {
        assert_eq!(Side::BOTH.map(Side::index), [0, 1]);
        assert_eq!(Side::Left.letter(), 'L');
        assert_eq!(Side::Right.letter(), 'R');
    }

    #[test]
    fn joint_kind_names() {
        assert_eq!(JointKind::Revolute.name(), "Revolute");
        assert_eq!(JointKind::Prismatic.name(), "Prismatic");
        assert_eq!(JointKind::Spherical.name(), "Spherical");
        assert_eq!(JointKind::Planar.name(), "Planar");
        assert_eq!(JointKind::Fixed.to_string(), "Fixed");
        assert!(JointKind::Revolute.is_actuated());
        assert!(!JointKind::Fixed.is_actuated());
    }

    #[test]
    fn body_id_display() {
        assert_eq!(BodyId(3).to_string(), "body#3");
        assert_eq!(BodyId(3).raw(), 3);
    }
}
