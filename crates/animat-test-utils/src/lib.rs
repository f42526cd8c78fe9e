//! Shared test fixtures and utilities for animat crates.
//!
//! Provides an in-memory [`RecordingBackend`] that logs every command it
//! receives, plus ready-made multi-body models.

pub mod fixtures;
pub mod recording;

// ---------------------------------------------------------------------------
// Re-exports for convenience
// ---------------------------------------------------------------------------

pub use fixtures::{plan_model, serial_chain};
pub use recording::{MotorCommand, RecordedCall, RecordingBackend};
