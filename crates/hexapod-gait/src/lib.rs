//! Tripod gait for the hexapod rig.
//!
//! The six legs are split into two disjoint three-leg groups. At most one
//! group swings at a time; the other keeps its feet planted. A leg steps when
//! its foot drifts farther than `max_foot_distance` (horizontally) from the
//! foot target that rides along with the body.
//!
//! - [`state`]: per-leg phase and swing bookkeeping.
//! - [`plan`]: group step plans and their queue.
//! - [`swing`]: parabolic swing arc.
//! - [`coordinator`]: the per-frame state machine driving the foot nodes.

pub mod coordinator;
pub mod plan;
pub mod state;
pub mod swing;

pub use coordinator::{GaitCoordinator, GaitEvent, GaitLeg, GaitSnapshot, LegSnapshot, PlanSnapshot};
pub use plan::{GaitPlan, PlanQueue};
pub use state::{LegGaitState, LegPhase};
pub use swing::{lift_height, swing_offset};
