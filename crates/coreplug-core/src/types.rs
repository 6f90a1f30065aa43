//! Shared value types passed between the controller layers.

use serde::{Deserialize, Serialize};

/// Queued-work depth observed at one sampling instant.
///
/// Always non-negative and finite. Out-of-range readings are clamped to
/// zero instead of being rejected.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct LoadSample(f64);

impl LoadSample {
    /// Wrap a raw reading, clamping negative and non-finite values to zero.
    pub fn new(raw: f64) -> Self {
        if raw.is_finite() && raw > 0.0 {
            Self(raw)
        } else {
            if raw != 0.0 {
                tracing::debug!(raw, "load sample out of range, clamped to zero");
            }
            Self(0.0)
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl From<u32> for LoadSample {
    fn from(depth: u32) -> Self {
        Self(f64::from(depth))
    }
}

/// Whether the periodic loop evaluates the ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerState {
    /// Ticks evaluate the ladder and adjust the pool.
    Active,
    /// Pool collapsed to a single unit; no evaluation until resume.
    Suspended,
}

/// Cadence of the periodic tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingInterval {
    /// Long period, used when the last tick did not add units.
    Idle,
    /// Short period, used right after a scale-up.
    Busy,
}

/// Outcome of a ladder evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleDecision {
    /// Bring the pool to exactly this many online units.
    ScaleTo(u32),
    /// The online count already matches the selected band.
    NoChange,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_and_non_finite_samples_clamp_to_zero() {
        assert_eq!(LoadSample::new(-4.0).value(), 0.0);
        assert_eq!(LoadSample::new(f64::NAN).value(), 0.0);
        assert_eq!(LoadSample::new(f64::INFINITY).value(), 0.0);
        assert_eq!(LoadSample::new(12.5).value(), 12.5);
    }

    #[test]
    fn integer_depth_converts() {
        assert_eq!(LoadSample::from(7).value(), 7.0);
    }
}
