//! Closed-form leg solver: coxa yaw plus a law-of-cosines knee.

use std::f32::consts::PI;

use nalgebra::{Point3, Vector3};
use tracing::debug;

use hexapod_scene::rotation_y;

use crate::chain::{LegAngles, LegPose};
use crate::solver::{ChainSolver, LegSolution, Reach};

/// Target expressed in the femur plane of a leg.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PlanarTarget {
    /// Coxa yaw that swings the leg plane through the target.
    pub coxa: f32,
    /// Forward distance from the femur pivot.
    pub z: f32,
    /// Height above the femur pivot.
    pub y: f32,
}

impl PlanarTarget {
    /// Yaw the leg toward `target`, then measure it from the femur pivot.
    pub(crate) fn from_world(pose: &LegPose, target: &Vector3<f32>) -> Self {
        let local = pose.root_world.inverse_transform_point(&Point3::from(*target));
        let coxa = local.x.atan2(local.z);
        let in_coxa = rotation_y(-coxa) * local;
        Self {
            coxa,
            z: in_coxa.z - pose.dims.coxa,
            y: in_coxa.y,
        }
    }

    pub(crate) fn distance(&self) -> f32 {
        self.z.hypot(self.y)
    }
}

/// Closed-form three-joint leg solver.
///
/// Always picks the knee-up branch. Targets beyond reach are pulled back onto
/// the reach sphere so the leg extends straight toward them.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyticLegSolver;

impl ChainSolver for AnalyticLegSolver {
    fn solve(&self, pose: &LegPose, target: &Vector3<f32>) -> LegSolution {
        let planar = PlanarTarget::from_world(pose, target);
        let a = pose.dims.femur;
        let b = pose.dims.tibia;
        let (z, y) = (planar.z, planar.y);
        let dist = planar.distance();
        let reach = Reach::classify(dist, a, b);
        let heading = y.atan2(z);

        let (femur, tibia) = if reach == Reach::Stretched {
            debug!(
                distance = dist,
                reach = a + b,
                "leg target out of reach, extending"
            );
            // Straight leg aimed along the target heading.
            (heading, -PI)
        } else {
            let cos_knee = ((a * a + b * b - dist * dist) / (2.0 * a * b)).clamp(-1.0, 1.0);
            let delta = if dist > 0.0 {
                ((a * a + dist * dist - b * b) / (2.0 * a * dist))
                    .clamp(-1.0, 1.0)
                    .acos()
            } else {
                0.0
            };
            let femur = if reach == Reach::TooClose {
                heading - delta
            } else {
                heading + delta
            };
            (femur, -cos_knee.acos())
        };

        LegSolution {
            angles: LegAngles::new(planar.coxa, femur, tibia),
            reach,
            limited: [false; 3],
            iterations: 0,
        }
    }

    fn name(&self) -> &'static str {
        "analytic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::LegDimensions;
    use approx::assert_relative_eq;
    use hexapod_scene::translation;
    use nalgebra::Isometry3;

    fn pose(root: Isometry3<f32>) -> LegPose {
        LegPose {
            root_world: root,
            dims: LegDimensions {
                coxa: 0.15,
                femur: 0.45,
                tibia: 0.65,
            },
            current: LegAngles::default(),
        }
    }

    #[test]
    fn reachable_targets_round_trip_through_forward_kinematics() {
        let root = translation(0.3, 0.5, 0.2) * rotation_y(0.7);
        let pose = pose(root);
        let targets = [
            Vector3::new(0.8, 0.0, 0.6),
            Vector3::new(0.3, 0.0, 1.0),
            Vector3::new(-0.1, 0.2, 0.9),
            Vector3::new(1.0, 0.4, 0.2),
            Vector3::new(0.6, -0.2, -0.3),
        ];
        for target in targets {
            let solution = AnalyticLegSolver.solve(&pose, &target);
            assert_eq!(solution.reach, Reach::Reachable, "target {target:?}");
            let fk = pose.forward_foot(&solution.angles);
            assert_relative_eq!(fk, target, epsilon = 1e-3);
        }
    }

    #[test]
    fn unreachable_target_fully_extends() {
        let pose = pose(Isometry3::identity());
        let target = Vector3::new(0.0, 0.0, 5.0);
        let solution = AnalyticLegSolver.solve(&pose, &target);
        assert_eq!(solution.reach, Reach::Stretched);
        assert_eq!(solution.angles.tibia, -PI);

        let foot = pose.forward_foot(&solution.angles);
        let pivot = pose.femur_pivot(solution.angles.coxa);
        assert_relative_eq!((foot - pivot).norm(), 1.1, epsilon = 1e-4);
        // Points straight at the target.
        let toward = (target - pivot).normalize();
        assert_relative_eq!((foot - pivot).normalize(), toward, epsilon = 1e-4);
    }

    #[test]
    fn barely_out_of_reach_is_exactly_straight() {
        let pose = pose(Isometry3::identity());
        // Just past 1.1 from the femur pivot at z = 0.15.
        let target = Vector3::new(0.0, -0.3, 0.15 + (1.1001_f32 * 1.1001 - 0.09).sqrt());
        let solution = AnalyticLegSolver.solve(&pose, &target);
        assert_eq!(solution.reach, Reach::Stretched);
        assert_eq!(solution.angles.tibia, -PI);
        let heading = (-0.3_f32).atan2(target.z - 0.15);
        assert_relative_eq!(solution.angles.femur, heading, epsilon = 1e-5);
    }

    #[test]
    fn coxa_follows_target_bearing() {
        let pose = pose(Isometry3::identity());
        let solution = AnalyticLegSolver.solve(&pose, &Vector3::new(0.6, -0.3, 0.6));
        assert_relative_eq!(solution.angles.coxa, PI / 4.0, epsilon = 1e-5);
    }

    #[test]
    fn knee_is_up() {
        let pose = pose(Isometry3::identity());
        let target = Vector3::new(0.0, -0.5, 0.7);
        let solution = AnalyticLegSolver.solve(&pose, &target);
        let frames = pose.joint_frames(&solution.angles);
        let knee = frames[2].translation.vector;
        let pivot = frames[1].translation.vector;
        // Knee sits above the straight line from pivot to foot.
        let t = (knee.z - pivot.z) / (target.z - pivot.z);
        let line_y = pivot.y + t * (target.y - pivot.y);
        assert!(knee.y > line_y);
    }

    #[test]
    fn target_at_femur_pivot_is_finite() {
        let pose = pose(Isometry3::identity());
        let solution = AnalyticLegSolver.solve(&pose, &Vector3::new(0.0, 0.0, 0.15));
        assert_eq!(solution.reach, Reach::TooClose);
        assert!(solution.angles.to_array().iter().all(|a| a.is_finite()));
    }

    #[test]
    fn target_on_coxa_axis_is_finite() {
        let pose = pose(Isometry3::identity());
        let solution = AnalyticLegSolver.solve(&pose, &Vector3::new(0.0, -0.8, 0.0));
        assert_relative_eq!(solution.angles.coxa, 0.0);
        assert!(solution.angles.to_array().iter().all(|a| a.is_finite()));
    }
}
