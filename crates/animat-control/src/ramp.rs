//! Soft-start torque scale.

/// Linear ramp of the global torque scale from 0 to 1 over `duration` seconds.
///
/// A non-positive duration disables the ramp (scale is always 1).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TorqueRamp {
    duration: f64,
}

impl TorqueRamp {
    #[must_use]
    pub const fn new(duration: f64) -> Self {
        Self { duration }
    }

    #[must_use]
    pub const fn disabled() -> Self {
        Self { duration: 0.0 }
    }

    /// Scale at `time`: `min(1, time / duration)`, never negative.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn scale(&self, time: f64) -> f32 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        (time / self.duration).clamp(0.0, 1.0) as f32
    }
}

impl Default for TorqueRamp {
    fn default() -> Self {
        Self::disabled()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_ramp_is_full_scale() {
        assert!((TorqueRamp::disabled().scale(0.0) - 1.0).abs() < f32::EPSILON);
        assert!((TorqueRamp::new(-1.0).scale(0.0) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn ramp_is_linear_then_saturates() {
        let ramp = TorqueRamp::new(2.0);
        assert!(ramp.scale(0.0).abs() < f32::EPSILON);
        assert!((ramp.scale(0.5) - 0.25).abs() < 1e-6);
        assert!((ramp.scale(2.0) - 1.0).abs() < f32::EPSILON);
        assert!((ramp.scale(10.0) - 1.0).abs() < f32::EPSILON);
    }
}
