//! Body controller: turn toward the target, then walk to it.

use std::f32::consts::{PI, TAU};

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use hexapod_core::config::MovementConfig;
use hexapod_scene::{NodeId, SceneGraph, TransformSlot, rotation_y, translation};

/// Wrap an angle into `[0, 2π)`.
pub fn wrap_angle(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative input.
    if wrapped >= TAU { 0.0 } else { wrapped }
}

/// Wrap an angle into `[-π, π)`.
pub fn wrap_signed(angle: f32) -> f32 {
    (angle + PI).rem_euclid(TAU) - PI
}

/// Current and commanded placement of the body.
///
/// The vertical position stays at the configured clearance height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyPose {
    pub position: [f32; 3],
    /// Heading in `[0, 2π)`; zero faces +z.
    pub yaw: f32,
    pub target_position: [f32; 3],
    pub target_yaw: f32,
}

impl BodyPose {
    pub fn position(&self) -> Vector3<f32> {
        Vector3::from(self.position)
    }

    pub fn target_position(&self) -> Vector3<f32> {
        Vector3::from(self.target_position)
    }

    /// Remaining heading change toward the target, in `[-π, π)`.
    pub fn yaw_error(&self) -> f32 {
        wrap_signed(self.target_yaw - self.yaw)
    }
}

/// What one controller update did.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BodyMotion {
    /// Signed yaw change (radians).
    pub turned: f32,
    /// Horizontal distance moved.
    pub travelled: f32,
    /// The target was within the arrival threshold.
    pub arrived: bool,
}

#[derive(Debug, Clone)]
pub struct BodyController {
    config: MovementConfig,
    height: f32,
    pose: BodyPose,
}

impl BodyController {
    /// Body at the origin, `height` above it, facing +z.
    pub fn new(config: &MovementConfig, height: f32) -> Self {
        let position = [0.0, height, 0.0];
        Self {
            config: config.clone(),
            height,
            pose: BodyPose {
                position,
                yaw: 0.0,
                target_position: position,
                target_yaw: 0.0,
            },
        }
    }

    pub const fn pose(&self) -> &BodyPose {
        &self.pose
    }

    pub const fn height(&self) -> f32 {
        self.height
    }

    /// Place the body; the vertical component is replaced by the clearance height.
    pub fn set_pose(&mut self, position: Vector3<f32>, yaw: f32) {
        self.pose.position = [position.x, self.height, position.z];
        self.pose.yaw = wrap_angle(yaw);
    }

    /// Step toward `target` (only its horizontal components matter).
    ///
    /// Turns along the shortest path by at most `turn_speed · dt` and moves by
    /// at most `walk_speed · dt` once the heading is within `yaw_tolerance`.
    /// Never overshoots the target.
    pub fn update(&mut self, dt: f32, target: &Vector3<f32>) -> BodyMotion {
        if !dt.is_finite() || dt <= 0.0 {
            return BodyMotion::default();
        }
        self.pose.target_position = [target.x, self.height, target.z];

        let [px, _, pz] = self.pose.position;
        let (dx, dz) = (target.x - px, target.z - pz);
        let distance = dx.hypot(dz);
        if distance <= self.config.arrival_threshold {
            return BodyMotion {
                arrived: true,
                ..BodyMotion::default()
            };
        }

        let desired = wrap_angle(dx.atan2(dz));
        self.pose.target_yaw = desired;

        let max_turn = self.config.turn_speed * dt;
        let turned = wrap_signed(desired - self.pose.yaw).clamp(-max_turn, max_turn);
        self.pose.yaw = wrap_angle(self.pose.yaw + turned);

        let mut travelled = 0.0;
        if self.pose.yaw_error().abs() < self.config.yaw_tolerance {
            travelled = (self.config.walk_speed * dt).min(distance);
            self.pose.position[0] += dx / distance * travelled;
            self.pose.position[2] += dz / distance * travelled;
        }

        BodyMotion {
            turned,
            travelled,
            arrived: false,
        }
    }

    /// Write `base = T(position)` and `user = R_y(yaw)` into `body_root`.
    pub fn apply(&self, graph: &mut SceneGraph, body_root: NodeId) {
        let [x, y, z] = self.pose.position;
        graph.set_sub_transform(body_root, TransformSlot::Base, translation(x, y, z));
        graph.set_sub_transform(body_root, TransformSlot::User, rotation_y(self.pose.yaw));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const DT: f32 = 0.016;

    fn controller() -> BodyController {
        BodyController::new(&MovementConfig::default(), 0.5)
    }

    #[test]
    fn wrap_angle_range() {
        assert_relative_eq!(wrap_angle(-PI / 2.0), 3.0 * PI / 2.0, epsilon = 1e-6);
        assert_relative_eq!(wrap_angle(TAU + 0.25), 0.25, epsilon = 1e-5);
        assert!(wrap_angle(-1e-9) < TAU);
        assert_relative_eq!(wrap_signed(3.0 * PI / 2.0), -PI / 2.0, epsilon = 1e-6);
    }

    #[test]
    fn walks_straight_ahead() {
        let mut body = controller();
        let target = Vector3::new(0.0, 0.0, 2.0);
        let motion = body.update(DT, &target);
        assert_relative_eq!(motion.travelled, 0.6 * DT, epsilon = 1e-6);
        assert_relative_eq!(body.pose().position[2], 0.6 * DT, epsilon = 1e-6);
        assert_relative_eq!(body.pose().position[1], 0.5);
    }

    #[test]
    fn rotates_in_place_before_walking_to_target_behind() {
        let mut body = controller();
        let target = Vector3::new(0.0, 0.0, -2.0);

        // 2 rad/s needs many frames before the error drops below π/8.
        for _ in 0..10 {
            let motion = body.update(DT, &target);
            assert_relative_eq!(motion.travelled, 0.0);
            assert!(motion.turned.abs() > 0.0);
        }
        assert_relative_eq!(body.pose().position[2], 0.0);

        let mut walked = false;
        for _ in 0..200 {
            if body.update(DT, &target).travelled > 0.0 {
                walked = true;
                break;
            }
        }
        assert!(walked);
        assert!(body.pose().yaw_error().abs() < MovementConfig::default().yaw_tolerance);
    }

    #[test]
    fn turn_rate_is_bounded() {
        let mut body = controller();
        let motion = body.update(DT, &Vector3::new(2.0, 0.0, 0.0));
        assert_relative_eq!(motion.turned.abs(), 2.0 * DT, epsilon = 1e-6);
    }

    #[test]
    fn never_overshoots() {
        let mut body = controller();
        let target = Vector3::new(0.0, 0.0, 0.15);
        body.update(1.0, &target);
        assert_relative_eq!(body.pose().position[2], 0.15, epsilon = 1e-6);
        // Within the threshold now.
        assert!(body.update(1.0, &target).arrived);
    }

    #[test]
    fn arrived_body_holds_still() {
        let mut body = controller();
        let before = *body.pose();
        let motion = body.update(DT, &Vector3::new(0.05, 3.0, 0.05));
        assert!(motion.arrived);
        assert_relative_eq!(body.pose().yaw, before.yaw);
        assert_eq!(body.pose().position, before.position);
    }

    #[test]
    fn zero_dt_is_ignored() {
        let mut body = controller();
        let before = *body.pose();
        body.update(0.0, &Vector3::new(5.0, 0.0, 5.0));
        assert_eq!(*body.pose(), before);
    }

    #[test]
    fn apply_writes_body_slots() {
        let mut graph = SceneGraph::new();
        let root = graph.add_root("body_root");
        let mut body = controller();
        body.set_pose(Vector3::new(1.0, 9.0, 2.0), PI / 2.0);
        body.apply(&mut graph, root);
        graph.propagate();
        assert_relative_eq!(graph.world_position(root), Vector3::new(1.0, 0.5, 2.0));
        let forward = graph.world_isometry(root) * nalgebra::Point3::new(0.0, 0.0, 1.0);
        assert_relative_eq!(forward.x, 2.0, epsilon = 1e-6);
    }
}
