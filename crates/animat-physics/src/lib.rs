// animat-physics: Engine-agnostic physics interface and link/joint registry.
//
// The `PhysicsBackend` trait is the only way the rest of the workspace talks
// to a physics engine. `Link` and `MultiBodyModel` describe a body before it
// exists in the engine; `Animat` owns one instantiated body and maps its
// canonical link/joint names to backend indices. A raw rapier3d backend is
// provided in `rapier`.

pub mod animat;
pub mod backend;
pub mod link;
pub mod model;
pub mod rapier;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        animat::Animat,
        backend::{DynamicsInfo, DynamicsUpdate, JointInfo, JointState, MotorTargets, PhysicsBackend},
        link::{CollisionOptions, Geometry, Link, MeshGeometry, Pose},
        model::MultiBodyModel,
        rapier::RapierBackend,
    };
}

pub use animat::Animat;
pub use backend::PhysicsBackend;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
