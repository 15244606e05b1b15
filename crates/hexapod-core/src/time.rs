use std::fmt;

use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};

const NANOS_PER_SEC: f64 = 1_000_000_000.0;

// ---------------------------------------------------------------------------
// SimTime
// ---------------------------------------------------------------------------

/// Frame clock of a walking robot.
///
/// Frame deltas arrive as `f32` seconds. The running total is kept in integer
/// nanoseconds so long walks do not drift, next to the number of frames that
/// moved the clock. Gait plans are stamped with this value.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize, Resource,
)]
pub struct SimTime {
    nanos: u64,
    frames: u64,
}

impl SimTime {
    pub const fn new() -> Self {
        Self {
            nanos: 0,
            frames: 0,
        }
    }

    /// Clock reading at `secs` with no frames counted. Negative input clamps
    /// to zero.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_secs(secs: f64) -> Self {
        Self {
            nanos: (secs.max(0.0) * NANOS_PER_SEC) as u64,
            frames: 0,
        }
    }

    pub const fn nanos(&self) -> u64 {
        self.nanos
    }

    /// Elapsed milliseconds (truncated).
    pub const fn millis(&self) -> u64 {
        self.nanos / 1_000_000
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn secs_f32(&self) -> f32 {
        (self.nanos as f64 / NANOS_PER_SEC) as f32
    }

    /// Frames that advanced the clock.
    pub const fn frames(&self) -> u64 {
        self.frames
    }

    /// Advance by one frame of `dt` seconds. Non-positive and non-finite
    /// deltas leave the clock untouched.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn advance_secs(&mut self, dt: f32) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }
        let delta = (f64::from(dt) * NANOS_PER_SEC).round() as u64;
        self.nanos = self.nanos.saturating_add(delta);
        self.frames += 1;
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.nanos / 1_000_000_000;
        let millis = (self.nanos % 1_000_000_000) / 1_000_000;
        write!(f, "{secs}.{millis:03}s (frame {})", self.frames)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        assert_eq!(SimTime::new(), SimTime::default());
        assert_eq!(SimTime::new().nanos(), 0);
        assert_eq!(SimTime::new().frames(), 0);
    }

    #[test]
    fn frames_accumulate_without_drift() {
        let mut t = SimTime::new();
        for _ in 0..1000 {
            t.advance_secs(0.016);
        }
        assert_eq!(t.frames(), 1000);
        assert_eq!(t.millis(), 16_000);
        assert!((t.secs_f32() - 16.0).abs() < 1e-4);
    }

    #[test]
    fn bad_deltas_are_ignored() {
        let mut t = SimTime::from_secs(1.0);
        t.advance_secs(0.0);
        t.advance_secs(-0.5);
        t.advance_secs(f32::NAN);
        t.advance_secs(f32::INFINITY);
        assert_eq!(t, SimTime::from_secs(1.0));
        assert_eq!(SimTime::from_secs(-3.0).nanos(), 0);
    }

    #[test]
    fn display_shows_seconds_and_frame() {
        let mut t = SimTime::new();
        t.advance_secs(1.25);
        assert_eq!(t.to_string(), "1.250s (frame 1)");
    }

    #[test]
    fn toml_roundtrip() {
        let mut t = SimTime::new();
        t.advance_secs(0.5);
        let text = toml::to_string(&t).unwrap();
        let back: SimTime = toml::from_str(&text).unwrap();
        assert_eq!(t, back);
    }
}
