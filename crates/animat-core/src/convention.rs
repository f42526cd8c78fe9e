//! Naming and indexing convention for segmented, legged body plans.
//!
//! A body plan is a chain of `n_body_joints + 1` body links (`link_body_0` is
//! the base) plus `n_legs` left/right leg pairs with `n_legs_dof` joints each.
//! Every function here is pure. The names produced here are the keys the
//! registry and the controllers use, so no other module builds them by hand.
//!
//! Flat joint layout for the default plan (11 body joints, 2 leg pairs, 4 dof):
//!
//! ```text
//! 0..11    body joints
//! 11..15   leg 0 left      15..19  leg 0 right
//! 19..23   leg 1 left      23..27  leg 1 right
//! ```
//!
//! Oscillators come in antagonistic pairs, so their index space doubles both
//! the body block and every leg block.

use crate::types::Side;

/// Default number of body-axis joints.
pub const DEFAULT_N_BODY_JOINTS: usize = 11;
/// Default number of leg pairs.
pub const DEFAULT_N_LEGS: usize = 2;
/// Default number of degrees of freedom per leg.
pub const DEFAULT_N_LEGS_DOF: usize = 4;

// ---------------------------------------------------------------------------
// Index functions
// ---------------------------------------------------------------------------

/// Flat index of body joint `joint_i`, duplicated per `side` for paired
/// oscillators.
///
/// # Panics
///
/// Panics if `joint_i >= n_body_joints`.
#[must_use]
pub fn body_joint_index(joint_i: usize, side: Side, n_body_joints: usize) -> usize {
    assert!(
        joint_i < n_body_joints,
        "Joint must be < {n_body_joints}, got {joint_i}"
    );
    joint_i + side.index() * n_body_joints
}

/// Flat index of joint `joint_i` of leg `leg_i` on side `side_i`.
///
/// Leg joints start right after the body joints (offset `n_body_joints`).
/// Callers validate `leg_i` and `joint_i < n_legs_dof`.
#[must_use]
pub const fn leg_joint_index(
    leg_i: usize,
    side_i: Side,
    joint_i: usize,
    n_body_joints: usize,
    n_legs_dof: usize,
) -> usize {
    n_body_joints + leg_i * 2 * n_legs_dof + side_i.index() * n_legs_dof + joint_i
}

/// Flat index of the `side` oscillator driving joint `joint_i` of leg
/// `leg_i` on side `side_i`.
///
/// Two oscillators per joint, so leg blocks start after `2 * n_body_joints`
/// body oscillators and each leg block is twice as wide as in
/// [`leg_joint_index`].
#[must_use]
pub const fn leg_oscillator_index(
    leg_i: usize,
    side_i: Side,
    joint_i: usize,
    side: Side,
    n_body_joints: usize,
    n_legs_dof: usize,
) -> usize {
    2 * n_body_joints
        + leg_i * 2 * n_legs_dof * 2
        + side_i.index() * n_legs_dof * 2
        + joint_i
        + side.index() * n_legs_dof
}

/// Backend link index of leg link `joint_i` (the child of the matching leg
/// joint). Base link excluded, hence the `- 1`.
#[must_use]
pub const fn leg_link_index(
    leg_i: usize,
    side_i: Side,
    joint_i: usize,
    n_body_links: usize,
    n_legs_dof: usize,
) -> usize {
    n_body_links - 1 + leg_i * 2 * n_legs_dof + side_i.index() * n_legs_dof + joint_i
}

// ---------------------------------------------------------------------------
// Name functions
// ---------------------------------------------------------------------------

/// Name of the joint whose child is `link_name`.
#[must_use]
pub fn joint_name(link_name: &str) -> String {
    format!("joint_{link_name}")
}

/// Canonical name of body link `link_i` (`link_body_0` is the base).
#[must_use]
pub fn body_link_name(link_i: usize) -> String {
    format!("link_body_{link_i}")
}

/// Canonical name of body joint `joint_i`, which connects body link
/// `joint_i` to body link `joint_i + 1`.
#[must_use]
pub fn body_joint_name(joint_i: usize) -> String {
    joint_name(&body_link_name(joint_i + 1))
}

/// Canonical name of leg link `joint_i` of leg `leg_i` on side `side_i`.
#[must_use]
pub fn leg_link_name(leg_i: usize, side_i: Side, joint_i: usize) -> String {
    format!("link_leg_{leg_i}_{}_{joint_i}", side_i.letter())
}

/// Canonical name of the joint driving [`leg_link_name`].
#[must_use]
pub fn leg_joint_name(leg_i: usize, side_i: Side, joint_i: usize) -> String {
    joint_name(&leg_link_name(leg_i, side_i, joint_i))
}

// ---------------------------------------------------------------------------
// BodyPlan
// ---------------------------------------------------------------------------

/// Position of one degree of freedom in a leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LegDof {
    pub leg: usize,
    pub side: Side,
    pub joint: usize,
}

/// Dimensions of a segmented, legged body plan.
///
/// Bundles the sizes the free functions take as parameters, and enumerates
/// the canonical names in flat-index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyPlan {
    /// Number of joints along the body axis.
    pub n_body_joints: usize,
    /// Number of left/right leg pairs.
    pub n_legs: usize,
    /// Joints per leg.
    pub n_legs_dof: usize,
}

impl Default for BodyPlan {
    fn default() -> Self {
        Self {
            n_body_joints: DEFAULT_N_BODY_JOINTS,
            n_legs: DEFAULT_N_LEGS,
            n_legs_dof: DEFAULT_N_LEGS_DOF,
        }
    }
}

impl BodyPlan {
    #[must_use]
    pub const fn new(n_body_joints: usize, n_legs: usize, n_legs_dof: usize) -> Self {
        Self {
            n_body_joints,
            n_legs,
            n_legs_dof,
        }
    }

    /// Body links, base included.
    #[must_use]
    pub const fn n_body_links(&self) -> usize {
        self.n_body_joints + 1
    }

    /// Total joints in the body (body axis and all legs).
    #[must_use]
    pub const fn n_joints(&self) -> usize {
        self.n_body_joints + self.n_legs * 2 * self.n_legs_dof
    }

    /// Total links in the body, base included.
    #[must_use]
    pub const fn n_links(&self) -> usize {
        self.n_joints() + 1
    }

    /// Total oscillators (two per joint).
    #[must_use]
    pub const fn n_oscillators(&self) -> usize {
        2 * self.n_joints()
    }

    /// See [`body_joint_index`].
    #[must_use]
    pub fn body_joint_index(&self, joint_i: usize, side: Side) -> usize {
        body_joint_index(joint_i, side, self.n_body_joints)
    }

    /// See [`leg_joint_index`].
    #[must_use]
    pub const fn leg_joint_index(&self, leg_i: usize, side_i: Side, joint_i: usize) -> usize {
        leg_joint_index(leg_i, side_i, joint_i, self.n_body_joints, self.n_legs_dof)
    }

    /// See [`leg_oscillator_index`].
    #[must_use]
    pub const fn leg_oscillator_index(
        &self,
        leg_i: usize,
        side_i: Side,
        joint_i: usize,
        side: Side,
    ) -> usize {
        leg_oscillator_index(
            leg_i,
            side_i,
            joint_i,
            side,
            self.n_body_joints,
            self.n_legs_dof,
        )
    }

    /// See [`leg_link_index`].
    #[must_use]
    pub const fn leg_link_index(&self, leg_i: usize, side_i: Side, joint_i: usize) -> usize {
        leg_link_index(leg_i, side_i, joint_i, self.n_body_links(), self.n_legs_dof)
    }

    /// Every leg degree of freedom, in flat-index order.
    pub fn leg_dofs(&self) -> impl Iterator<Item = LegDof> + '_ {
        (0..self.n_legs).flat_map(move |leg| {
            Side::BOTH.into_iter().flat_map(move |side| {
                (0..self.n_legs_dof).map(move |joint| LegDof { leg, side, joint })
            })
        })
    }

    /// Whether `dof` is the last joint of its leg (its child link is a foot).
    #[must_use]
    pub const fn is_foot(&self, dof: LegDof) -> bool {
        dof.joint + 1 == self.n_legs_dof
    }

    /// All joint names, ordered by flat joint index.
    #[must_use]
    pub fn joint_names(&self) -> Vec<String> {
        let mut names: Vec<String> = (0..self.n_body_joints).map(body_joint_name).collect();
        names.extend(
            self.leg_dofs()
                .map(|dof| leg_joint_name(dof.leg, dof.side, dof.joint)),
        );
        names
    }

    /// All link names, base first, then ordered by link index.
    #[must_use]
    pub fn link_names(&self) -> Vec<String> {
        let mut names: Vec<String> = (0..self.n_body_links()).map(body_link_name).collect();
        names.extend(
            self.leg_dofs()
                .map(|dof| leg_link_name(dof.leg, dof.side, dof.joint)),
        );
        names
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn body_joint_index_duplicates_per_side() {
        assert_eq!(body_joint_index(0, Side::Left, 11), 0);
        assert_eq!(body_joint_index(10, Side::Left, 11), 10);
        assert_eq!(body_joint_index(0, Side::Right, 11), 11);
        assert_eq!(body_joint_index(10, Side::Right, 11), 21);
    }

    #[test]
    #[should_panic(expected = "Joint must be < 11, got 11")]
    fn body_joint_index_rejects_out_of_range() {
        let _ = body_joint_index(11, Side::Left, 11);
    }

    #[test]
    fn body_joint_index_is_injective() {
        let n = 11;
        let mut seen = HashSet::new();
        for side in Side::BOTH {
            for joint in 0..n {
                assert!(seen.insert(body_joint_index(joint, side, n)));
            }
        }
        assert_eq!(seen, (0..2 * n).collect());
    }

    #[test]
    fn leg_joint_index_scenario() {
        assert_eq!(leg_joint_index(3, Side::Right, 3, 11, 4), 42);
        assert_eq!(leg_joint_index(0, Side::Left, 0, 11, 4), 11);
    }

    #[test]
    fn leg_joint_and_link_indices_are_injective_and_contiguous() {
        let plan = BodyPlan::new(11, 4, 4);
        let mut joints = HashSet::new();
        let mut links = HashSet::new();
        for dof in plan.leg_dofs() {
            assert!(joints.insert(plan.leg_joint_index(dof.leg, dof.side, dof.joint)));
            assert!(links.insert(plan.leg_link_index(dof.leg, dof.side, dof.joint)));
        }
        let expected: HashSet<usize> = (plan.n_body_joints..plan.n_joints()).collect();
        assert_eq!(joints, expected);
        // Link i is the child of joint i.
        assert_eq!(links, expected);
    }

    #[test]
    fn leg_oscillator_index_is_bijective() {
        let plan = BodyPlan::new(11, 2, 4);
        let mut seen = HashSet::new();
        for dof in plan.leg_dofs() {
            for side in Side::BOTH {
                assert!(seen.insert(plan.leg_oscillator_index(dof.leg, dof.side, dof.joint, side)));
            }
        }
        let expected: HashSet<usize> = (2 * plan.n_body_joints..plan.n_oscillators()).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn leg_oscillators_do_not_overlap_body_oscillators() {
        let plan = BodyPlan::default();
        let body: HashSet<usize> = Side::BOTH
            .into_iter()
            .flat_map(|side| (0..plan.n_body_joints).map(move |j| (j, side)))
            .map(|(j, side)| plan.body_joint_index(j, side))
            .collect();
        for dof in plan.leg_dofs() {
            for side in Side::BOTH {
                let idx = plan.leg_oscillator_index(dof.leg, dof.side, dof.joint, side);
                assert!(!body.contains(&idx));
            }
        }
    }

    #[test]
    fn leg_names_follow_convention() {
        assert_eq!(leg_link_name(0, Side::Left, 2), "link_leg_0_L_2");
        assert_eq!(leg_link_name(1, Side::Right, 3), "link_leg_1_R_3");
        for dof in BodyPlan::default().leg_dofs() {
            assert_eq!(
                leg_joint_name(dof.leg, dof.side, dof.joint),
                format!("joint_{}", leg_link_name(dof.leg, dof.side, dof.joint))
            );
        }
    }

    #[test]
    fn body_names_follow_convention() {
        assert_eq!(body_link_name(0), "link_body_0");
        assert_eq!(body_joint_name(0), "joint_link_body_1");
        assert_eq!(body_joint_name(10), "joint_link_body_11");
    }

    #[test]
    fn names_are_ordered_by_flat_index() {
        let plan = BodyPlan::default();
        let joints = plan.joint_names();
        assert_eq!(joints.len(), plan.n_joints());
        for dof in plan.leg_dofs() {
            let idx = plan.leg_joint_index(dof.leg, dof.side, dof.joint);
            assert_eq!(joints[idx], leg_joint_name(dof.leg, dof.side, dof.joint));
        }
        let links = plan.link_names();
        assert_eq!(links.len(), plan.n_links());
        assert_eq!(links[0], "link_body_0");
        // links[i + 1] is the child of joints[i].
        for (i, joint) in joints.iter().enumerate() {
            assert_eq!(*joint, joint_name(&links[i + 1]));
        }
        let unique: HashSet<&String> = joints.iter().collect();
        assert_eq!(unique.len(), joints.len());
    }

    #[test]
    fn feet_are_last_leg_dof() {
        let plan = BodyPlan::default();
        let feet: Vec<String> = plan
            .leg_dofs()
            .filter(|dof| plan.is_foot(*dof))
            .map(|dof| leg_link_name(dof.leg, dof.side, dof.joint))
            .collect();
        assert_eq!(
            feet,
            vec!["link_leg_0_L_3", "link_leg_0_R_3", "link_leg_1_L_3", "link_leg_1_R_3"]
        );
    }
}
