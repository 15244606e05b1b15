//! Leg inverse kinematics for the hexapod rig.
//!
//! Each leg is a three-joint [`LimbChain`] (coxa yaw, femur pitch, tibia
//! pitch) living in a [`SceneGraph`](hexapod_scene::SceneGraph). Solving a
//! leg takes the world-space foot target and produces [`LegAngles`], which
//! are written back into the joints' `ik` sub-transforms.
//!
//! # Architecture
//!
//! ```text
//! LimbChain ──► ChainModel (pose, limits, SolverKind) ──► ChainSolver ──► LegSolution
//!                                                   ├── AnalyticLegSolver
//!                                                   └── FabrikLegSolver ──► FabrikChain
//! ```
//!
//! Two strategies sit behind the [`ChainSolver`] trait and are selected per
//! chain through [`SolverKind`].

pub mod analytic;
pub mod chain;
pub mod fabrik;
pub mod plugin;
pub mod solver;

pub use analytic::AnalyticLegSolver;
pub use chain::{
    ChainModel, JointLimits, JointSpec, LegAngles, LegDimensions, LegNodes, LegPose, LimbChain,
    joint_axis, joint_rotation,
};
pub use fabrik::{FabrikChain, FabrikConfig, FabrikLegSolver, FabrikOutcome};
pub use plugin::{HexapodIkPlugin, IkChainMap, IkRequest, IkRequests, IkResult, IkResults};
pub use solver::{ChainSolver, LegSolution, Reach, SolverKind};
