//! Link records: geometry, mass properties and joint attachment.
//!
//! A [`Link`] is built with a fluent builder and carries everything a backend
//! needs to instantiate one rigid body: shape, mass (explicit or derived from
//! density), link pose relative to its parent, collision frame, inertial
//! frame, and the joint connecting it to its parent.

use std::f32::consts::PI;

use animat_core::types::JointKind;
use bevy::math::{EulerRot, Quat, Vec3};

/// Default link density in kg/m^3 (water).
pub const DEFAULT_DENSITY: f32 = 1000.0;

// ---------------------------------------------------------------------------
// Pose
// ---------------------------------------------------------------------------

/// Position plus orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        orientation: Quat::IDENTITY,
    };

    #[must_use]
    pub const fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Pose from a position and `[roll, pitch, yaw]` Euler angles (rad).
    ///
    /// Rotations are about the fixed X, Y, Z axes, in that order.
    #[must_use]
    pub fn from_euler(position: Vec3, rpy: [f32; 3]) -> Self {
        Self {
            position,
            orientation: Quat::from_euler(EulerRot::ZYX, rpy[2], rpy[1], rpy[0]),
        }
    }

    /// Apply `self` to a point expressed in this pose's frame.
    #[must_use]
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.position + self.orientation * point
    }
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// Mesh shape metadata. Mesh files themselves are never read: the volume and
/// centroid are supplied by whoever generated the mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshGeometry {
    pub filename: String,
    /// Enclosed volume in m^3, already scaled.
    pub volume: f32,
    /// Centroid in the unscaled mesh frame.
    pub center_of_mass: Vec3,
    pub scale: Vec3,
}

/// Collision shape of a link. Cylinders and capsules are aligned with Z.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Box { half_extents: Vec3 },
    Sphere { radius: f32 },
    Cylinder { radius: f32, height: f32 },
    /// `height` is the length of the cylindrical part, caps excluded.
    Capsule { radius: f32, height: f32 },
    Mesh(MeshGeometry),
}

impl Geometry {
    /// Enclosed volume in m^3.
    #[must_use]
    pub fn volume(&self) -> f32 {
        match self {
            Self::Box { half_extents } => 8.0 * half_extents.x * half_extents.y * half_extents.z,
            Self::Sphere { radius } => sphere_volume(*radius),
            Self::Cylinder { radius, height } => cylinder_volume(*radius, *height),
            Self::Capsule { radius, height } => {
                sphere_volume(*radius) + cylinder_volume(*radius, *height)
            }
            Self::Mesh(mesh) => mesh.volume,
        }
    }

    /// Principal moments of inertia `[ixx, iyy, izz]` of a solid body of
    /// `mass` about its centroid.
    ///
    /// Meshes are approximated by the sphere of equal volume.
    #[must_use]
    pub fn inertia_diagonal(&self, mass: f32) -> [f32; 3] {
        match self {
            Self::Box { half_extents: h } => {
                let (x2, y2, z2) = (h.x * h.x, h.y * h.y, h.z * h.z);
                [
                    mass * (y2 + z2) / 3.0,
                    mass * (x2 + z2) / 3.0,
                    mass * (x2 + y2) / 3.0,
                ]
            }
            Self::Sphere { radius } => {
                let i = 0.4 * mass * radius * radius;
                [i, i, i]
            }
            Self::Cylinder { radius, height } => {
                let r2 = radius * radius;
                let lateral = mass * (3.0 * r2 + height * height) / 12.0;
                [lateral, lateral, 0.5 * mass * r2]
            }
            Self::Capsule { radius, height } => capsule_inertia(mass, *radius, *height),
            Self::Mesh(mesh) => {
                let radius = (3.0 * mesh.volume / (4.0 * PI)).cbrt();
                let i = 0.4 * mass * radius * radius;
                [i, i, i]
            }
        }
    }
}

fn sphere_volume(radius: f32) -> f32 {
    4.0 / 3.0 * PI * radius.powi(3)
}

fn cylinder_volume(radius: f32, height: f32) -> f32 {
    PI * radius * radius * height
}

/// Cylinder plus two hemispherical caps, mass split by volume.
fn capsule_inertia(mass: f32, radius: f32, height: f32) -> [f32; 3] {
    let v_cyl = cylinder_volume(radius, height);
    let v_caps = sphere_volume(radius);
    let total = v_cyl + v_caps;
    if total <= 0.0 {
        return [0.0; 3];
    }
    let m_cyl = mass * v_cyl / total;
    let m_caps = mass * v_caps / total;
    let r2 = radius * radius;
    let h2 = height * height;
    let lateral = m_cyl * (h2 / 12.0 + r2 / 4.0)
        + m_caps * (0.4 * r2 + h2 / 4.0 + 3.0 * height * radius / 8.0);
    let axial = 0.5 * m_cyl * r2 + 0.4 * m_caps * r2;
    [lateral, lateral, axial]
}

// ---------------------------------------------------------------------------
// CollisionOptions
// ---------------------------------------------------------------------------

/// Contact material of the link's collision shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionOptions {
    pub friction: f32,
    pub restitution: f32,
}

impl Default for CollisionOptions {
    fn default() -> Self {
        Self {
            friction: 0.5,
            restitution: 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Link
// ---------------------------------------------------------------------------

/// One rigid link of a multi-body.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub name: String,
    pub geometry: Geometry,
    /// Explicit mass; derived from `density` when `None`.
    pub mass: Option<f32>,
    pub density: f32,
    /// Link frame relative to its parent link frame (world frame for a base).
    pub pose: Pose,
    /// Collision and visual frame relative to the link frame.
    pub frame: Pose,
    /// Inertial frame relative to the link frame. Defaults to the collision
    /// frame, shifted to the centroid for meshes.
    pub inertial: Option<Pose>,
    /// Parent link name. `None` attaches to the base.
    pub parent: Option<String>,
    /// RGBA color. No visual shape is created when `None`.
    pub color: Option<[f32; 4]>,
    pub joint_kind: JointKind,
    pub joint_axis: Vec3,
    pub collision: CollisionOptions,
}

impl Link {
    pub fn new(name: impl Into<String>, geometry: Geometry) -> Self {
        Self {
            name: name.into(),
            geometry,
            mass: None,
            density: DEFAULT_DENSITY,
            pose: Pose::IDENTITY,
            frame: Pose::IDENTITY,
            inertial: None,
            parent: None,
            color: None,
            joint_kind: JointKind::default(),
            joint_axis: Vec3::Z,
            collision: CollisionOptions::default(),
        }
    }

    #[must_use]
    pub const fn with_mass(mut self, mass: f32) -> Self {
        self.mass = Some(mass);
        self
    }

    #[must_use]
    pub const fn with_density(mut self, density: f32) -> Self {
        self.density = density;
        self
    }

    #[must_use]
    pub const fn with_position(mut self, position: Vec3) -> Self {
        self.pose.position = position;
        self
    }

    /// Link orientation as `[roll, pitch, yaw]`.
    #[must_use]
    pub fn with_orientation(mut self, rpy: [f32; 3]) -> Self {
        self.pose = Pose::from_euler(self.pose.position, rpy);
        self
    }

    #[must_use]
    pub const fn with_frame(mut self, frame: Pose) -> Self {
        self.frame = frame;
        self
    }

    #[must_use]
    pub const fn with_inertial(mut self, inertial: Pose) -> Self {
        self.inertial = Some(inertial);
        self
    }

    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    #[must_use]
    pub const fn with_color(mut self, rgba: [f32; 4]) -> Self {
        self.color = Some(rgba);
        self
    }

    /// Joint connecting this link to its parent.
    #[must_use]
    pub const fn with_joint(mut self, kind: JointKind, axis: Vec3) -> Self {
        self.joint_kind = kind;
        self.joint_axis = axis;
        self
    }

    #[must_use]
    pub const fn with_collision(mut self, collision: CollisionOptions) -> Self {
        self.collision = collision;
        self
    }

    #[must_use]
    pub const fn with_friction(mut self, friction: f32) -> Self {
        self.collision.friction = friction;
        self
    }

    #[must_use]
    pub fn volume(&self) -> f32 {
        self.geometry.volume()
    }

    /// Explicit mass, or `density * volume`.
    #[must_use]
    pub fn mass(&self) -> f32 {
        self.mass.unwrap_or_else(|| self.density * self.volume())
    }

    /// Inertial frame relative to the link frame.
    #[must_use]
    pub fn inertial_pose(&self) -> Pose {
        if let Some(inertial) = self.inertial {
            return inertial;
        }
        match &self.geometry {
            Geometry::Mesh(mesh) => Pose::new(
                self.frame.position + mesh.center_of_mass * mesh.scale,
                self.frame.orientation,
            ),
            _ => self.frame,
        }
    }

    #[must_use]
    pub fn inertia_diagonal(&self) -> [f32; 3] {
        self.geometry.inertia_diagonal(self.mass())
    }

    #[must_use]
    pub const fn has_visual(&self) -> bool {
        self.color.is_some()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
