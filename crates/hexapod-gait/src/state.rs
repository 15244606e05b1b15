//! Per-leg gait state.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::swing::swing_offset;

/// Whether a leg is bearing weight or stepping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegPhase {
    #[default]
    Support,
    Swing,
}

/// Swing bookkeeping for one leg.
///
/// Grounded and stepping flags are derived from [`LegPhase`], so they can
/// never disagree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegGaitState {
    phase: LegPhase,
    elapsed: f32,
    start: Vector3<f32>,
    end: Vector3<f32>,
}

impl Default for LegGaitState {
    fn default() -> Self {
        Self {
            phase: LegPhase::Support,
            elapsed: 0.0,
            start: Vector3::zeros(),
            end: Vector3::zeros(),
        }
    }
}

impl LegGaitState {
    pub const fn phase(&self) -> LegPhase {
        self.phase
    }

    pub const fn is_grounded(&self) -> bool {
        matches!(self.phase, LegPhase::Support)
    }

    pub const fn is_stepping(&self) -> bool {
        matches!(self.phase, LegPhase::Swing)
    }

    /// Seconds since liftoff of the current (or last) swing.
    pub const fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub const fn start(&self) -> &Vector3<f32> {
        &self.start
    }

    pub const fn end(&self) -> &Vector3<f32> {
        &self.end
    }

    /// Swing parameter in `[0, 1]`; 0 while in support.
    pub fn progress(&self, duration: f32) -> f32 {
        if !self.is_stepping() {
            return 0.0;
        }
        if duration <= 0.0 {
            return 1.0;
        }
        (self.elapsed / duration).min(1.0)
    }

    /// Lift off, interpolating from `start` to `end` offsets.
    pub fn begin_swing(&mut self, start: Vector3<f32>, end: Vector3<f32>) {
        self.phase = LegPhase::Swing;
        self.elapsed = 0.0;
        self.start = start;
        self.end = end;
    }

    /// Advance a swinging leg by `dt`, returning its new offset and whether
    /// it touched down on this step. Support legs return `None`.
    pub fn advance(&mut self, dt: f32, duration: f32, step_height: f32) -> Option<(Vector3<f32>, bool)> {
        if !self.is_stepping() {
            return None;
        }
        self.elapsed += dt;
        let t = self.progress(duration);
        if t >= 1.0 {
            self.phase = LegPhase::Support;
            return Some((self.end, true));
        }
        Some((swing_offset(&self.start, &self.end, t, step_height), false))
    }
}
