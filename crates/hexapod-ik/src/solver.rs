//! Solver abstraction shared by the analytic and FABRIK leg strategies.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use hexapod_core::config::{LimitPolicy, SolverChoice, SolverConfig};
use hexapod_core::types::JointKind;

use crate::analytic::AnalyticLegSolver;
use crate::chain::{JointLimits, LegAngles, LegPose};
use crate::fabrik::{FabrikConfig, FabrikLegSolver};

/// Slack on the inner reach boundary.
pub(crate) const REACH_EPSILON: f32 = 1e-6;

/// How the target related to the leg's workspace.
///
/// Out-of-reach targets are never an error: the leg points at them as far as
/// it can and the solution says so.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reach {
    #[default]
    Reachable,
    /// Farther than femur + tibia; the leg is fully extended toward it.
    Stretched,
    /// Closer than |femur - tibia| to the femur pivot.
    TooClose,
}

impl Reach {
    /// Classify a planar femur-pivot distance for segments `a` and `b`.
    pub fn classify(dist: f32, a: f32, b: f32) -> Self {
        if dist > a + b {
            Self::Stretched
        } else if dist < (a - b).abs() + REACH_EPSILON {
            Self::TooClose
        } else {
            Self::Reachable
        }
    }

    pub const fn is_reachable(self) -> bool {
        matches!(self, Self::Reachable)
    }
}

// ---------------------------------------------------------------------------
// LegSolution
// ---------------------------------------------------------------------------

/// Output of one leg solve.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LegSolution {
    pub angles: LegAngles,
    pub reach: Reach,
    /// Joints (coxa, femur, tibia) whose angle was clamped to its limits.
    pub limited: [bool; 3],
    /// Iterations used (zero for closed-form solves).
    pub iterations: u32,
}

impl LegSolution {
    pub fn is_limited(&self) -> bool {
        self.limited.iter().any(|&l| l)
    }

    /// Enforce joint limits under `policy`, recording which joints moved.
    pub fn apply_limits(&mut self, limits: &[JointLimits; 3], policy: LimitPolicy) {
        if policy == LimitPolicy::Ignore {
            return;
        }
        for joint in JointKind::ALL {
            let i = joint.index();
            let raw = self.angles.get(joint);
            let clamped = limits[i].clamp(raw);
            if (clamped - raw).abs() > f32::EPSILON {
                self.angles.set(joint, clamped);
                self.limited[i] = true;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ChainSolver
// ---------------------------------------------------------------------------

/// A leg IK strategy.
pub trait ChainSolver {
    /// Solve for a world-space foot target.
    fn solve(&self, pose: &LegPose, target: &Vector3<f32>) -> LegSolution;

    /// Human-readable strategy name.
    fn name(&self) -> &str;
}

/// Strategy selection, configurable per chain.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SolverKind {
    #[default]
    Analytic,
    Fabrik(FabrikConfig),
}

impl SolverKind {
    pub fn from_config(config: &SolverConfig) -> Self {
        match config.kind {
            SolverChoice::Analytic => Self::Analytic,
            SolverChoice::Fabrik => Self::Fabrik(FabrikConfig {
                tolerance: config.tolerance,
                max_iterations: config.max_iterations,
            }),
        }
    }
}

impl From<&SolverConfig> for SolverKind {
    fn from(config: &SolverConfig) -> Self {
        Self::from_config(config)
    }
}

impl ChainSolver for SolverKind {
    fn solve(&self, pose: &LegPose, target: &Vector3<f32>) -> LegSolution {
        match self {
            Self::Analytic => AnalyticLegSolver.solve(pose, target),
            Self::Fabrik(config) => FabrikLegSolver::new(config.clone()).solve(pose, target),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Analytic => "analytic",
            Self::Fabrik(_) => "fabrik",
        }
    }
}
