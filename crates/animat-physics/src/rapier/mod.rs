//! Raw `rapier3d` physics backend.
//!
//! This module implements [`PhysicsBackend`](crate::backend::PhysicsBackend)
//! using the `rapier3d` crate directly. We own the
//! [`PhysicsPipeline`](rapier3d::pipeline::PhysicsPipeline), call `step()`
//! ourselves, and keep a mirror of every link's dynamics record so queries
//! never have to reconstruct them from rapier state.

pub mod backend;
pub mod bridge;
pub mod context;

pub use backend::RapierBackend;
pub use context::RapierContext;
