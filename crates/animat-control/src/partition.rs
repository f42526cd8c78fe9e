//! Split of a body's joints into control-mode groups.

use std::collections::{HashMap, HashSet};

use animat_core::config::ControlConfig;
use animat_core::error::ControlError;
use animat_core::types::ControlMode;

/// Joints grouped by [`ControlMode`], each group with parallel torque limits.
///
/// Every input joint lands in exactly one group. Group order follows input
/// order. An empty group is valid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControlPartition {
    joints: [Vec<String>; 3],
    max_torques: [Vec<f32>; 3],
}

impl ControlPartition {
    /// Partition `joints` using the `{joint -> mode}` and `{joint -> max torque}`
    /// tables.
    ///
    /// Repeated joint names are kept once, at their first position. A max
    /// torque must be finite and non-negative.
    pub fn new<I, S>(
        joints: I,
        modes: &HashMap<String, ControlMode>,
        max_torques: &HashMap<String, f32>,
    ) -> Result<Self, ControlError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut partition = Self::default();
        let mut seen = HashSet::new();
        for joint in joints {
            let joint = joint.as_ref();
            if !seen.insert(joint.to_owned()) {
                continue;
            }
            let mode = *modes
                .get(joint)
                .ok_or_else(|| ControlError::MissingMode(joint.to_owned()))?;
            let max_torque = *max_torques
                .get(joint)
                .ok_or_else(|| ControlError::MissingMaxTorque(joint.to_owned()))?;
            check_max_torque(joint, max_torque)?;
            partition.joints[mode.index()].push(joint.to_owned());
            partition.max_torques[mode.index()].push(max_torque);
        }
        Ok(partition)
    }

    /// Partition `joints` using the defaults and overrides of a [`ControlConfig`].
    pub fn from_config<'a, I>(joints: I, config: &ControlConfig) -> Result<Self, ControlError>
    where
        I: IntoIterator<Item = &'a str> + Clone,
    {
        let (modes, max_torques) = config.tables(joints.clone());
        Self::new(joints, &modes, &max_torques)
    }

    /// Every joint under `mode`, all sharing one torque limit.
    pub fn from_uniform<I, S>(
        joints: I,
        mode: ControlMode,
        max_torque: f32,
    ) -> Result<Self, ControlError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut partition = Self::default();
        let mut seen = HashSet::new();
        for joint in joints {
            let joint = joint.as_ref();
            if seen.insert(joint.to_owned()) {
                check_max_torque(joint, max_torque)?;
                partition.joints[mode.index()].push(joint.to_owned());
                partition.max_torques[mode.index()].push(max_torque);
            }
        }
        Ok(partition)
    }

    /// Joints in `mode`, in input order.
    #[must_use]
    pub fn joints(&self, mode: ControlMode) -> &[String] {
        &self.joints[mode.index()]
    }

    /// Torque limits parallel to [`joints`](Self::joints).
    #[must_use]
    pub fn max_torques(&self, mode: ControlMode) -> &[f32] {
        &self.max_torques[mode.index()]
    }

    /// Mode of `joint`, if partitioned.
    #[must_use]
    pub fn mode_of(&self, joint: &str) -> Option<ControlMode> {
        ControlMode::ALL
            .into_iter()
            .find(|mode| self.joints(*mode).iter().any(|j| j == joint))
    }

    /// Total number of joints across all groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.joints.iter().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `{joint -> 0.0}` for every joint in `mode`.
    #[must_use]
    pub fn zeros(&self, mode: ControlMode) -> HashMap<String, f32> {
        self.joints(mode).iter().map(|j| (j.clone(), 0.0)).collect()
    }
}

fn check_max_torque(joint: &str, value: f32) -> Result<(), ControlError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ControlError::InvalidMaxTorque {
            joint: joint.to_owned(),
            value,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn tables(entries: &[(&str, ControlMode, f32)]) -> (HashMap<String, ControlMode>, HashMap<String, f32>) {
        let modes = entries.iter().map(|(j, m, _)| ((*j).to_owned(), *m)).collect();
        let torques = entries.iter().map(|(j, _, t)| ((*j).to_owned(), *t)).collect();
        (modes, torques)
    }

    #[test]
    fn groups_preserve_input_order() {
        let (modes, torques) = tables(&[
            ("a", ControlMode::Torque, 1.0),
            ("b", ControlMode::Position, 2.0),
            ("c", ControlMode::Torque, 3.0),
            ("d", ControlMode::Velocity, 4.0),
        ]);
        let p = ControlPartition::new(["a", "b", "c", "d"], &modes, &torques).unwrap();
        assert_eq!(p.joints(ControlMode::Torque), ["a", "c"]);
        assert_eq!(p.max_torques(ControlMode::Torque), [1.0, 3.0]);
        assert_eq!(p.joints(ControlMode::Position), ["b"]);
        assert_eq!(p.joints(ControlMode::Velocity), ["d"]);
        assert_eq!(p.len(), 4);
        assert_eq!(p.mode_of("c"), Some(ControlMode::Torque));
        assert_eq!(p.mode_of("z"), None);
    }

    #[test]
    fn empty_group_is_valid() {
        let (modes, torques) = tables(&[("a", ControlMode::Position, 1.0)]);
        let p = ControlPartition::new(["a"], &modes, &torques).unwrap();
        assert!(p.joints(ControlMode::Velocity).is_empty());
        assert!(p.max_torques(ControlMode::Torque).is_empty());
    }

    #[test]
    fn completeness_over_many_tables() {
        let joints: Vec<String> = (0..27).map(|i| format!("joint_{i}")).collect();
        for seed in 0..20_usize {
            let modes: HashMap<String, ControlMode> = joints
                .iter()
                .enumerate()
                .map(|(i, j)| (j.clone(), ControlMode::ALL[(i * 7 + seed) % 3]))
                .collect();
            let torques = joints.iter().map(|j| (j.clone(), 1.0)).collect();
            let p = ControlPartition::new(&joints, &modes, &torques).unwrap();
            let mut union: Vec<&String> = ControlMode::ALL
                .iter()
                .flat_map(|m| p.joints(*m))
                .collect();
            assert_eq!(union.len(), joints.len());
            union.sort();
            union.dedup();
            assert_eq!(union.len(), joints.len());
            for mode in ControlMode::ALL {
                assert_eq!(p.joints(mode).len(), p.max_torques(mode).len());
            }
        }
    }

    #[test]
    fn duplicate_inputs_kept_once() {
        let (modes, torques) = tables(&[("a", ControlMode::Position, 1.0)]);
        let p = ControlPartition::new(["a", "a"], &modes, &torques).unwrap();
        assert_eq!(p.len(), 1);
    }

    #[test]
    fn missing_entries_are_errors() {
        let (modes, torques) = tables(&[("a", ControlMode::Position, 1.0)]);
        let err = ControlPartition::new(["a", "b"], &modes, &torques).unwrap_err();
        assert!(matches!(err, ControlError::MissingMode(ref j) if j == "b"));

        let mut modes = modes;
        modes.insert("b".into(), ControlMode::Torque);
        let err = ControlPartition::new(["a", "b"], &modes, &torques).unwrap_err();
        assert!(matches!(err, ControlError::MissingMaxTorque(ref j) if j == "b"));
    }

    #[test]
    fn from_config_applies_defaults() {
        let mut config = ControlConfig::default();
        config.modes.insert("b".into(), ControlMode::Torque);
        let p = ControlPartition::from_config(["a", "b"], &config).unwrap();
        assert_eq!(p.joints(ControlMode::Position), ["a"]);
        assert_eq!(p.joints(ControlMode::Torque), ["b"]);
        assert!((p.max_torques(ControlMode::Torque)[0] - 100.0).abs() < f32::EPSILON);
    }

    #[test]
    fn uniform_partition() {
        let p = ControlPartition::from_uniform(["a", "b"], ControlMode::Velocity, 2.0).unwrap();
        assert_eq!(p.joints(ControlMode::Velocity), ["a", "b"]);
        assert_eq!(p.zeros(ControlMode::Velocity).len(), 2);
        assert!(p.zeros(ControlMode::Torque).is_empty());
    }

    #[test]
    fn rejects_unusable_max_torques() {
        for bad in [-1.0, f32::NAN, f32::INFINITY] {
            let (modes, torques) = tables(&[("a", ControlMode::Torque, bad)]);
            let err = ControlPartition::new(["a"], &modes, &torques).unwrap_err();
            assert!(matches!(err, ControlError::InvalidMaxTorque { ref joint, .. } if joint == "a"));

            let err = ControlPartition::from_uniform(["a"], ControlMode::Torque, bad).unwrap_err();
            assert!(matches!(err, ControlError::InvalidMaxTorque { .. }));
        }
        let p = ControlPartition::from_uniform(["a"], ControlMode::Torque, 0.0).unwrap();
        assert_eq!(p.max_torques(ControlMode::Torque), [0.0]);
    }
}
