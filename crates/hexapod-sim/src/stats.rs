//! Walk statistics.
//!
//! [`WalkStats`] accumulates per-robot counters as frames advance: frames,
//! simulated time, distance travelled and gait activity.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use hexapod_gait::GaitEvent;

use crate::HexapodRobot;

// ---------------------------------------------------------------------------
// WalkStats
// ---------------------------------------------------------------------------

/// Cumulative counters for one robot. Mirrored into a Bevy resource by
/// [`walk_stats_system`].
#[derive(Resource, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WalkStats {
    /// Frames advanced (zero-length frames are not counted).
    pub frames: u64,
    pub sim_seconds: f64,
    /// Horizontal distance covered by the body.
    pub distance: f32,
    /// Swings that touched down.
    pub steps_completed: u64,
    pub plans_completed: u64,
    /// Leg solves whose target was out of reach.
    pub stretched_solves: u64,
}

impl WalkStats {
    pub const fn new() -> Self {
        Self {
            frames: 0,
            sim_seconds: 0.0,
            distance: 0.0,
            steps_completed: 0,
            plans_completed: 0,
            stretched_solves: 0,
        }
    }

    pub fn record_frame(&mut self, dt: f32, travelled: f32) {
        self.frames += 1;
        self.sim_seconds += f64::from(dt);
        self.distance += travelled;
    }

    pub fn record_event(&mut self, event: &GaitEvent) {
        match event {
            GaitEvent::SwingCompleted { .. } => self.steps_completed += 1,
            GaitEvent::PlanCompleted { .. } => self.plans_completed += 1,
            _ => {}
        }
    }

    pub fn record_stretched(&mut self, count: u64) {
        self.stretched_solves += count;
    }

    /// Average body speed over the simulated time.
    #[allow(clippy::cast_possible_truncation)]
    pub fn mean_speed(&self) -> Option<f32> {
        if self.sim_seconds <= 0.0 {
            return None;
        }
        Some(self.distance / self.sim_seconds as f32)
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

/// Copy the robot's counters into the [`WalkStats`] resource.
#[allow(clippy::needless_pass_by_value)]
pub fn walk_stats_system(robot: Option<Res<HexapodRobot>>, mut stats: ResMut<WalkStats>) {
    if let Some(robot) = robot {
        stats.clone_from(robot.0.stats());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use hexapod_core::types::TripodGroup;

    #[test]
    fn stats_default_empty() {
        let stats = WalkStats::new();
        assert_eq!(stats, WalkStats::default());
        assert_eq!(stats.frames, 0);
        assert!(stats.mean_speed().is_none());
    }

    #[test]
    fn frames_accumulate() {
        let mut stats = WalkStats::new();
        stats.record_frame(0.5, 0.25);
        stats.record_frame(0.5, 0.25);
        assert_eq!(stats.frames, 2);
        assert!((stats.sim_seconds - 1.0).abs() < 1e-9);
        assert!((stats.mean_speed().unwrap() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn events_are_counted() {
        let mut stats = WalkStats::new();
        stats.record_event(&GaitEvent::SwingCompleted { leg: 3 });
        stats.record_event(&GaitEvent::SwingStarted {
            leg: 3,
            group: TripodGroup::B,
        });
        stats.record_event(&GaitEvent::PlanCompleted {
            id: 1,
            group: TripodGroup::B,
        });
        assert_eq!(stats.steps_completed, 1);
        assert_eq!(stats.plans_completed, 1);
    }

    #[test]
    fn reset_clears_stats() {
        let mut stats = WalkStats::new();
        stats.record_frame(0.1, 0.1);
        stats.record_stretched(4);
        stats.reset();
        assert_eq!(stats, WalkStats::new());
    }
}
