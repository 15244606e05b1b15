//! Top-level Bevy plugin and robot assembly for the hexapod locomotion core.
//!
//! [`RobotAssembly`] is usable on its own: construct it from a
//! [`HexapodConfig`](hexapod_core::config::HexapodConfig) and call
//! [`advance`](RobotAssembly::advance) once per frame. [`HexapodSimPlugin`]
//! wraps it in Bevy resources and systems.
//!
//! # Example
//!
//! ```no_run
//! use bevy::prelude::*;
//! use hexapod_sim::{HexapodSimPlugin, TargetPoint};
//! use nalgebra::Vector3;
//!
//! let mut app = App::new();
//! app.add_plugins(HexapodSimPlugin)
//!     .insert_resource(TargetPoint(Vector3::new(0.0, 0.0, 2.0)));
//! app.finish();
//! app.cleanup();
//! app.update();
//! ```

pub mod body;
pub mod robot;
pub mod stats;

use bevy::prelude::*;
use nalgebra::Vector3;
use tracing::error;

use hexapod_core::config::HexapodConfig;
use hexapod_core::time::SimTime;
use hexapod_core::{HexapodCorePlugin, HexapodSet};
use hexapod_ik::{HexapodIkPlugin, IkChainMap};

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use body::{BodyController, BodyMotion, BodyPose};
pub use robot::{RobotAssembly, RobotNodes};
pub use stats::WalkStats;

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// The simulated robot.
#[derive(Resource, Debug)]
pub struct HexapodRobot(pub RobotAssembly);

/// World point the body walks toward.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Default)]
pub struct TargetPoint(pub Vector3<f32>);

// ---------------------------------------------------------------------------
// HexapodSimPlugin
// ---------------------------------------------------------------------------

/// Meta-plugin for a walking hexapod.
///
/// Includes:
/// - [`HexapodCorePlugin`]: `SimTime`, `HexapodConfig` and set ordering
/// - [`HexapodIkPlugin`]: one-shot leg solves
/// - [`TargetPoint`] and [`WalkStats`] resources
///
/// The [`HexapodRobot`] resource is built from `HexapodConfig` when the app
/// finishes, so a config inserted after adding the plugin is honored.
pub struct HexapodSimPlugin;

impl Plugin for HexapodSimPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((HexapodCorePlugin, HexapodIkPlugin))
            .init_resource::<TargetPoint>()
            .init_resource::<WalkStats>()
            .add_systems(
                Update,
                (advance_robot_system, sync_ik_chains_system)
                    .chain()
                    .in_set(HexapodSet::Plan),
            )
            .add_systems(
                Update,
                stats::walk_stats_system.in_set(HexapodSet::Report),
            );
    }

    fn finish(&self, app: &mut App) {
        if app.world().contains_resource::<HexapodRobot>() {
            return;
        }
        let config = app.world().resource::<HexapodConfig>().clone();
        match RobotAssembly::new(config) {
            Ok(robot) => {
                app.insert_resource(HexapodRobot(robot));
            }
            Err(err) => error!(%err, "invalid hexapod configuration, robot not spawned"),
        }
    }
}

// ---------------------------------------------------------------------------
// Systems
// ---------------------------------------------------------------------------

/// Advance the robot by one configured frame toward the target point.
#[allow(clippy::needless_pass_by_value)]
pub fn advance_robot_system(
    config: Res<HexapodConfig>,
    target: Res<TargetPoint>,
    robot: Option<ResMut<HexapodRobot>>,
    mut time: ResMut<SimTime>,
) {
    let Some(mut robot) = robot else {
        return;
    };
    robot.0.advance(config.frame_dt, &target.0);
    time.advance_secs(config.frame_dt);
}

/// Refresh the detached leg models used by one-shot IK requests.
#[allow(clippy::needless_pass_by_value)]
pub fn sync_ik_chains_system(robot: Option<Res<HexapodRobot>>, mut chains: ResMut<IkChainMap>) {
    let Some(robot) = robot else {
        return;
    };
    for model in robot.0.chain_models() {
        chains.insert(model);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use hexapod_ik::{IkRequests, IkResults};

    #[test]
    fn plugin_builds_without_panic() {
        let mut app = App::new();
        app.add_plugins(HexapodSimPlugin);
        app.finish();
        app.cleanup();
        app.update();

        assert!(app.world().get_resource::<HexapodRobot>().is_some());
        assert!(app.world().get_resource::<WalkStats>().is_some());
        assert!(app.world().get_resource::<SimTime>().is_some());
        assert_eq!(app.world().resource::<IkChainMap>().len(), 6);
    }

    #[test]
    fn plugin_walks_toward_target() {
        let mut app = App::new();
        app.add_plugins(HexapodSimPlugin)
            .insert_resource(TargetPoint(Vector3::new(0.0, 0.0, 2.0)));
        app.finish();
        app.cleanup();

        for _ in 0..50 {
            app.update();
        }

        let robot = &app.world().resource::<HexapodRobot>().0;
        assert!(robot.body_pose().position[2] > 0.3);
        let stats = app.world().resource::<WalkStats>();
        assert_eq!(stats.frames, 50);
        assert!(app.world().resource::<SimTime>().millis() >= 790);
    }

    #[test]
    fn invalid_config_skips_robot() {
        let mut app = App::new();
        app.add_plugins(HexapodSimPlugin);
        app.world_mut().resource_mut::<HexapodConfig>().frame_dt = -1.0;
        app.finish();
        app.cleanup();
        app.update();
        assert!(app.world().get_resource::<HexapodRobot>().is_none());
    }

    #[test]
    fn ik_requests_use_robot_legs() {
        let mut app = App::new();
        app.add_plugins(HexapodSimPlugin);
        app.finish();
        app.cleanup();
        app.update();

        let foot = app.world().resource::<HexapodRobot>().0.foot_position(1).unwrap();
        app.world_mut().resource_mut::<IkRequests>().push(1, foot);
        app.update();

        let result = *app.world().resource::<IkResults>().for_leg(1).unwrap();
        assert!((result.reached - foot).norm() < 1e-3);
    }
}
