//! Shared test fixtures for the hexapod crates.
//!
//! Provides Bevy test app builders and helpers for driving a
//! [`RobotAssembly`](hexapod_sim::RobotAssembly) frame by frame.

pub mod app;
pub mod fixtures;

// ---------------------------------------------------------------------------
// Re-exports for convenience
// ---------------------------------------------------------------------------

pub use app::{minimal_test_app, sim_test_app};
pub use fixtures::{
    assert_single_group_swinging, default_robot, displace_foot, fabrik_config, run_frames,
};
