//! Robot fixtures for gait and locomotion tests.

use hexapod_core::config::{HexapodConfig, SolverChoice};
use hexapod_scene::{TransformSlot, translation};
use hexapod_sim::RobotAssembly;
use nalgebra::Vector3;

/// A robot built from the default configuration.
pub fn default_robot() -> RobotAssembly {
    RobotAssembly::new(HexapodConfig::default()).expect("default config is valid")
}

/// Default configuration with every leg on the FABRIK solver.
pub fn fabrik_config() -> HexapodConfig {
    let mut config = HexapodConfig::default();
    config.solver.kind = SolverChoice::Fabrik;
    config
}

/// Advance `robot` `frames` times, calling `each` after every frame.
pub fn run_frames(
    robot: &mut RobotAssembly,
    frames: usize,
    dt: f32,
    target: &Vector3<f32>,
    mut each: impl FnMut(&RobotAssembly),
) {
    for _ in 0..frames {
        robot.advance(dt, target);
        each(robot);
    }
}

/// Shift `leg`'s commanded foot by `offset` without touching its target.
pub fn displace_foot(robot: &mut RobotAssembly, leg: usize, offset: Vector3<f32>) {
    let foot = robot.gait().legs()[leg].foot;
    let graph = robot.graph_mut();
    graph.set_sub_transform(
        foot,
        TransformSlot::Gait,
        translation(offset.x, offset.y, offset.z),
    );
    graph.propagate();
}

/// Panic unless every swinging leg belongs to the same tripod group.
pub fn assert_single_group_swinging(robot: &RobotAssembly) {
    let gait = robot.gait();
    let swinging = gait.swinging_legs();
    let Some(&first) = swinging.first() else {
        return;
    };
    let group = gait.groups().group_of(first);
    for &leg in &swinging {
        assert_eq!(
            gait.groups().group_of(leg),
            group,
            "legs {swinging:?} from both tripods are swinging"
        );
    }
    if let Some(active) = gait.active_group() {
        assert_eq!(active, group, "swinging group differs from the active plan");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn displace_foot_moves_only_that_foot() {
        let mut robot = default_robot();
        let before = robot.foot_position(1).unwrap();
        let other = robot.foot_position(2).unwrap();
        displace_foot(&mut robot, 1, Vector3::new(0.2, 0.0, 0.0));
        assert_relative_eq!(
            robot.foot_position(1).unwrap(),
            before + Vector3::new(0.2, 0.0, 0.0),
            epsilon = 1e-6
        );
        assert_relative_eq!(robot.foot_position(2).unwrap(), other);
    }

    #[test]
    fn run_frames_calls_back_each_frame() {
        let mut robot = default_robot();
        let mut calls = 0;
        run_frames(&mut robot, 5, 0.016, &Vector3::zeros(), |_| calls += 1);
        assert_eq!(calls, 5);
        assert_eq!(robot.stats().frames, 5);
    }

    #[test]
    fn fabrik_config_selects_fabrik() {
        let robot = RobotAssembly::new(fabrik_config()).unwrap();
        assert_eq!(robot.config().solver.kind, SolverChoice::Fabrik);
    }
}
