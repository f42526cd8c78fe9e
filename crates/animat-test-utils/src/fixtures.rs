//! Ready-made multi-body models.

use animat_core::convention::{BodyPlan, body_link_name, leg_link_name};
use animat_core::types::Side;
use animat_physics::link::{Geometry, Link};
use animat_physics::model::MultiBodyModel;
use bevy::math::Vec3;

/// Base `base_link` plus `n` spheres `link_0 .. link_{n-1}` chained in order.
pub fn serial_chain(n: usize) -> MultiBodyModel {
    let mut model = MultiBodyModel::new(
        "chain",
        Link::new("base_link", Geometry::Sphere { radius: 0.05 }),
    );
    for i in 0..n {
        let parent = if i == 0 {
            "base_link".to_owned()
        } else {
            format!("link_{}", i - 1)
        };
        model.push(
            Link::new(format!("link_{i}"), Geometry::Sphere { radius: 0.05 })
                .with_parent(parent)
                .with_position(Vec3::new(0.1, 0.0, 0.0)),
        );
    }
    model
}

/// A body plan model using the canonical names, with leg pair `i`
/// attached to body link `legs_parents[i]`.
///
/// Mixes explicit and density-derived masses: feet carry an explicit
/// mass, every other link takes its mass from its volume.
///
/// # Panics
///
/// Panics if `legs_parents` has fewer entries than `plan.n_legs`.
pub fn plan_model(plan: &BodyPlan, legs_parents: &[usize]) -> MultiBodyModel {
    assert!(legs_parents.len() >= plan.n_legs, "one parent per leg pair");
    let segment = Geometry::Capsule {
        radius: 0.02,
        height: 0.06,
    };
    let mut model = MultiBodyModel::new("animat", Link::new(body_link_name(0), segment.clone()));
    for i in 1..plan.n_body_links() {
        model.push(
            Link::new(body_link_name(i), segment.clone())
                .with_parent(body_link_name(i - 1))
                .with_position(Vec3::new(-0.1, 0.0, 0.0)),
        );
    }
    for dof in plan.leg_dofs() {
        let parent = if dof.joint == 0 {
            body_link_name(legs_parents[dof.leg])
        } else {
            leg_link_name(dof.leg, dof.side, dof.joint - 1)
        };
        let y = if dof.side == Side::Left { 0.05 } else { -0.05 };
        let mut link = Link::new(
            leg_link_name(dof.leg, dof.side, dof.joint),
            Geometry::Sphere { radius: 0.01 },
        )
        .with_parent(parent)
        .with_position(Vec3::new(0.0, y, 0.0));
        if plan.is_foot(dof) {
            link = link.with_mass(0.01);
        }
        model.push(link);
    }
    model
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
