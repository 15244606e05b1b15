//! FABRIK (Forward And Backward Reaching Inverse Kinematics).
//!
//! [`FabrikChain`] solves positions for a chain of any length. The leg
//! strategy [`FabrikLegSolver`] reuses the analytic coxa yaw and runs FABRIK
//! on the femur/tibia pair in the leg plane.

use std::f32::consts::{FRAC_PI_4, PI};

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analytic::PlanarTarget;
use crate::chain::{LegAngles, LegPose};
use crate::solver::{ChainSolver, LegSolution, Reach};

const fn default_tolerance() -> f32 {
    1e-4
}

const fn default_max_iterations() -> u32 {
    32
}

/// Largest segment length error accepted in a seed before it is re-laid.
const SEED_TOLERANCE: f32 = 1e-4;

/// Configuration for FABRIK passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FabrikConfig {
    /// End-effector distance at which iteration stops.
    #[serde(default = "default_tolerance")]
    pub tolerance: f32,
    /// Maximum backward/forward passes.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
}

impl Default for FabrikConfig {
    fn default() -> Self {
        Self {
            tolerance: default_tolerance(),
            max_iterations: default_max_iterations(),
        }
    }
}

/// Result of [`FabrikChain::solve`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FabrikOutcome {
    pub iterations: u32,
    /// Final end-effector distance to the target.
    pub error: f32,
    pub converged: bool,
    /// The target was at or beyond total reach; the chain was laid straight.
    pub extended: bool,
}

/// Unit vector, or zero for (near) zero input.
fn normalize_or_zero(v: Vector3<f32>) -> Vector3<f32> {
    v.try_normalize(f32::EPSILON).unwrap_or_else(Vector3::zeros)
}

// ---------------------------------------------------------------------------
// FabrikChain
// ---------------------------------------------------------------------------

/// Base anchor plus ordered joint positions; `joints[0]` is the base and the
/// last entry is the end effector.
#[derive(Debug, Clone, PartialEq)]
pub struct FabrikChain {
    joints: Vec<Vector3<f32>>,
    lengths: Vec<f32>,
}

impl FabrikChain {
    /// Chain through `joints`, keeping the segment lengths between them.
    pub fn from_points(joints: Vec<Vector3<f32>>) -> Self {
        let lengths = joints.windows(2).map(|w| (w[1] - w[0]).norm()).collect();
        Self { joints, lengths }
    }

    /// Chain with explicit segment lengths, seeded at `joints`.
    ///
    /// Returns `None` unless `joints` holds exactly one more entry than
    /// `lengths` and every length is finite and non-negative. Seeds whose
    /// spacing disagrees with `lengths` are re-laid on the next solve.
    pub fn with_lengths(joints: Vec<Vector3<f32>>, lengths: Vec<f32>) -> Option<Self> {
        let valid_lengths = lengths.iter().all(|l| l.is_finite() && *l >= 0.0);
        (joints.len() == lengths.len() + 1 && valid_lengths).then_some(Self { joints, lengths })
    }

    pub fn joints(&self) -> &[Vector3<f32>] {
        &self.joints
    }

    pub fn lengths(&self) -> &[f32] {
        &self.lengths
    }

    pub fn base(&self) -> Vector3<f32> {
        self.joints.first().copied().unwrap_or_else(Vector3::zeros)
    }

    pub fn end_effector(&self) -> Vector3<f32> {
        self.joints.last().copied().unwrap_or_else(Vector3::zeros)
    }

    pub fn total_length(&self) -> f32 {
        self.lengths.iter().sum()
    }

    /// Move the end effector toward `target`, keeping the base pinned.
    pub fn solve(&mut self, target: &Vector3<f32>, config: &FabrikConfig) -> FabrikOutcome {
        if self.joints.len() < 2 {
            let error = (self.end_effector() - target).norm();
            return FabrikOutcome {
                iterations: 0,
                error,
                converged: error <= config.tolerance,
                extended: false,
            };
        }

        let base = self.base();
        if !self.spacing_matches(SEED_TOLERANCE) {
            self.forward(&base);
        }
        let span = (target - base).norm();
        if span >= self.total_length() {
            self.extend_toward(target);
            let error = (self.end_effector() - target).norm();
            return FabrikOutcome {
                iterations: 0,
                error,
                converged: error <= config.tolerance,
                extended: true,
            };
        }

        let mut error = (self.end_effector() - target).norm();
        let mut iterations = 0;
        while error > config.tolerance && iterations < config.max_iterations {
            self.backward(target);
            self.forward(&base);
            iterations += 1;
            error = (self.end_effector() - target).norm();
        }

        FabrikOutcome {
            iterations,
            error,
            converged: error <= config.tolerance,
            extended: false,
        }
    }

    /// Whether every joint pair sits its segment length apart.
    pub fn spacing_matches(&self, tolerance: f32) -> bool {
        self.joints
            .windows(2)
            .zip(&self.lengths)
            .all(|(w, &len)| ((w[1] - w[0]).norm() - len).abs() <= tolerance)
    }

    /// Pin the end effector to `target` and pull each joint toward its successor.
    fn backward(&mut self, target: &Vector3<f32>) {
        let last = self.joints.len() - 1;
        self.joints[last] = *target;
        for i in (0..last).rev() {
            let dir = normalize_or_zero(self.joints[i] - self.joints[i + 1]);
            self.joints[i] = self.joints[i + 1] + dir * self.lengths[i];
        }
    }

    /// Re-pin the base and push each joint out from its predecessor.
    ///
    /// A coincident pair keeps the previous segment's direction (`+Y` for
    /// the first) so every segment ends up at its full length.
    fn forward(&mut self, base: &Vector3<f32>) {
        self.joints[0] = *base;
        let mut previous = Vector3::y();
        for i in 0..self.lengths.len() {
            let dir = (self.joints[i + 1] - self.joints[i])
                .try_normalize(f32::EPSILON)
                .unwrap_or(previous);
            self.joints[i + 1] = self.joints[i] + dir * self.lengths[i];
            previous = dir;
        }
    }

    /// Lay the chain straight from the base toward `target`.
    fn extend_toward(&mut self, target: &Vector3<f32>) {
        let dir = normalize_or_zero(target - self.base());
        for i in 0..self.lengths.len() {
            self.joints[i + 1] = self.joints[i] + dir * self.lengths[i];
        }
    }
}

// ---------------------------------------------------------------------------
// FabrikLegSolver
// ---------------------------------------------------------------------------

/// Wrap an angle into `[-π, π]`.
fn wrap_pi(angle: f32) -> f32 {
    (angle + PI).rem_euclid(2.0 * PI) - PI
}

/// Leg strategy: analytic coxa yaw, planar FABRIK for femur and tibia.
///
/// The leg plane is embedded as `(0, y, z)` with the femur pivot at the
/// origin. The knee is seeded from the current femur angle; a seed that does
/// not lie above the pivot-to-target line is replaced by a raised one so the
/// knee stays up. The foot is seeded a tibia length from the knee toward the
/// target, so the passes start from a chain with its true proportions.
#[derive(Debug, Clone, Default)]
pub struct FabrikLegSolver {
    config: FabrikConfig,
}

impl FabrikLegSolver {
    pub const fn new(config: FabrikConfig) -> Self {
        Self { config }
    }

    pub const fn config(&self) -> &FabrikConfig {
        &self.config
    }

    fn knee_seed(femur: f32, a: f32, target: &Vector3<f32>) -> Vector3<f32> {
        let (sin, cos) = femur.sin_cos();
        let current = Vector3::new(0.0, a * sin, a * cos);
        // Positive when the knee lies counter-clockwise (above) the target line.
        let side = target.z * current.y - target.y * current.z;
        if side > 1e-4 * a {
            return current;
        }
        let heading = if target.norm() > f32::EPSILON {
            target.y.atan2(target.z)
        } else {
            0.0
        };
        let (sin, cos) = (heading + FRAC_PI_4).sin_cos();
        Vector3::new(0.0, a * sin, a * cos)
    }
}

impl ChainSolver for FabrikLegSolver {
    fn solve(&self, pose: &LegPose, target: &Vector3<f32>) -> LegSolution {
        let planar = PlanarTarget::from_world(pose, target);
        let a = pose.dims.femur;
        let b = pose.dims.tibia;
        let reach = Reach::classify(planar.distance(), a, b);
        let goal = Vector3::new(0.0, planar.y, planar.z);

        let knee = Self::knee_seed(pose.current.femur, a, &goal);
        let foot = knee + normalize_or_zero(goal - knee) * b;
        let Some(mut chain) = FabrikChain::with_lengths(vec![Vector3::zeros(), knee, foot], vec![a, b])
        else {
            debug!(femur = a, tibia = b, "invalid leg segment lengths, keeping current angles");
            return LegSolution {
                angles: pose.current,
                reach,
                limited: [false; 3],
                iterations: 0,
            };
        };
        let outcome = chain.solve(&goal, &self.config);
        if !outcome.converged {
            debug!(
                error = outcome.error,
                iterations = outcome.iterations,
                ?reach,
                "fabrik leg solve did not converge"
            );
        }

        let joints = chain.joints();
        let (knee, foot) = (joints[1], joints[2]);
        let femur = knee.y.atan2(knee.z);
        let shin = foot - knee;
        let tibia_heading = shin.y.atan2(shin.z);
        let tibia = wrap_pi(femur - tibia_heading - PI);

        LegSolution {
            angles: LegAngles::new(planar.coxa, femur, tibia),
            reach,
            limited: [false; 3],
            iterations: outcome.iterations,
        }
    }

    fn name(&self) -> &'static str {
        "fabrik"
    }
}
