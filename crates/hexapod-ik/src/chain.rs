//! Leg chain topology, joint conventions and forward evaluation.
//!
//! A leg is built under a body node as
//!
//! ```text
//! root ─► coxa ─► coxa_segment ─► femur ─► femur_segment ─► tibia ─► tibia_segment ─► foot_end
//! ```
//!
//! Segments extend along their joint's local +y; the coxa arm runs along +z.
//! Joint angles map onto `ik` sub-transforms through [`joint_rotation`].

use std::f32::consts::{FRAC_PI_2, PI};

use nalgebra::{Isometry3, Point3, Unit, Vector3};
use serde::{Deserialize, Serialize};

use hexapod_core::config::{JointLimitConfig, LegConfig, LegMount, LimitPolicy};
use hexapod_core::types::JointKind;
use hexapod_scene::{NodeId, SceneGraph, TransformSlot, rotation_y, translation};

use crate::solver::{ChainSolver, LegSolution, SolverKind};

/// Map a joint angle to the rotation stored in that joint's `ik` slot.
///
/// Coxa yaws about +y. Femur and tibia pitch about +x, with the femur
/// measured up from the horizontal and the tibia measured relative to the
/// femur, so a straight leg has `tibia = -π`.
pub fn joint_rotation(kind: JointKind, angle: f32) -> Isometry3<f32> {
    rotation_about(&joint_axis(kind), kind, angle)
}

/// Rotation axis of a joint, in the joint node's parent frame.
pub fn joint_axis(kind: JointKind) -> Unit<Vector3<f32>> {
    match kind {
        JointKind::Coxa => Vector3::y_axis(),
        JointKind::Femur | JointKind::Tibia => Vector3::x_axis(),
    }
}

fn rotation_about(axis: &Unit<Vector3<f32>>, kind: JointKind, angle: f32) -> Isometry3<f32> {
    let turn = match kind {
        JointKind::Coxa => angle,
        JointKind::Femur => FRAC_PI_2 - angle,
        JointKind::Tibia => angle + PI,
    };
    Isometry3::rotation(axis.into_inner() * turn)
}

// ---------------------------------------------------------------------------
// LegAngles / LegDimensions
// ---------------------------------------------------------------------------

/// Solved joint angles of one leg (radians).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LegAngles {
    pub coxa: f32,
    pub femur: f32,
    pub tibia: f32,
}

impl LegAngles {
    pub const fn new(coxa: f32, femur: f32, tibia: f32) -> Self {
        Self { coxa, femur, tibia }
    }

    pub const fn get(&self, joint: JointKind) -> f32 {
        match joint {
            JointKind::Coxa => self.coxa,
            JointKind::Femur => self.femur,
            JointKind::Tibia => self.tibia,
        }
    }

    pub const fn set(&mut self, joint: JointKind, angle: f32) {
        match joint {
            JointKind::Coxa => self.coxa = angle,
            JointKind::Femur => self.femur = angle,
            JointKind::Tibia => self.tibia = angle,
        }
    }

    pub const fn to_array(self) -> [f32; 3] {
        [self.coxa, self.femur, self.tibia]
    }
}

/// Segment lengths of one leg. Fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LegDimensions {
    pub coxa: f32,
    pub femur: f32,
    pub tibia: f32,
}

impl LegDimensions {
    pub const fn from_config(leg: &LegConfig) -> Self {
        Self {
            coxa: leg.coxa_length,
            femur: leg.femur_length,
            tibia: leg.tibia_length,
        }
    }

    /// Reach of the femur/tibia pair from the femur pivot.
    pub fn max_reach(&self) -> f32 {
        self.femur + self.tibia
    }

    /// Fixed offset of `joint` from its parent node.
    pub fn joint_offset(&self, joint: JointKind) -> Vector3<f32> {
        match joint {
            JointKind::Coxa => Vector3::zeros(),
            JointKind::Femur => Vector3::new(0.0, 0.0, self.coxa),
            JointKind::Tibia => Vector3::new(0.0, self.femur, 0.0),
        }
    }

    /// Offset of the foot end from the tibia segment.
    pub fn foot_offset(&self) -> Vector3<f32> {
        Vector3::new(0.0, self.tibia, 0.0)
    }
}

// ---------------------------------------------------------------------------
// JointSpec
// ---------------------------------------------------------------------------

/// Inclusive angle range of one joint (radians).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointLimits {
    pub min: f32,
    pub max: f32,
}

impl JointLimits {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, angle: f32) -> bool {
        (self.min..=self.max).contains(&angle)
    }

    pub fn clamp(&self, angle: f32) -> f32 {
        angle.clamp(self.min, self.max)
    }
}

impl From<JointLimitConfig> for JointLimits {
    fn from(config: JointLimitConfig) -> Self {
        Self::new(config.min, config.max)
    }
}

/// One revolute joint of a leg.
#[derive(Debug, Clone, Copy)]
pub struct JointSpec {
    pub kind: JointKind,
    pub node: NodeId,
    pub axis: Unit<Vector3<f32>>,
    /// Fixed offset from the parent node, stored in the joint's `base` slot.
    pub offset: Vector3<f32>,
    pub limits: JointLimits,
}

impl JointSpec {
    /// `ik` sub-transform that turns this joint to `angle`.
    pub fn rotation(&self, angle: f32) -> Isometry3<f32> {
        rotation_about(&self.axis, self.kind, angle)
    }
}

// ---------------------------------------------------------------------------
// LegPose
// ---------------------------------------------------------------------------

/// Everything a solver needs about a leg at solve time.
#[derive(Debug, Clone, Copy)]
pub struct LegPose {
    /// World transform of the leg root (the coxa pivot frame).
    pub root_world: Isometry3<f32>,
    pub dims: LegDimensions,
    /// Angles currently applied to the joints, used as a warm start.
    pub current: LegAngles,
}

impl LegPose {
    /// World frames of coxa, femur, tibia and foot end for `angles`.
    pub fn joint_frames(&self, angles: &LegAngles) -> [Isometry3<f32>; 4] {
        let offset = |kind| {
            let v = self.dims.joint_offset(kind);
            translation(v.x, v.y, v.z)
        };
        let coxa = self.root_world * joint_rotation(JointKind::Coxa, angles.coxa);
        let femur = coxa * offset(JointKind::Femur) * joint_rotation(JointKind::Femur, angles.femur);
        let tibia = femur * offset(JointKind::Tibia) * joint_rotation(JointKind::Tibia, angles.tibia);
        let foot = tibia * translation(0.0, self.dims.tibia, 0.0);
        [coxa, femur, tibia, foot]
    }

    /// Forward kinematics: world position of the foot end.
    pub fn forward_foot(&self, angles: &LegAngles) -> Vector3<f32> {
        self.joint_frames(angles)[3].translation.vector
    }

    /// World position of the femur pivot for a given coxa yaw.
    pub fn femur_pivot(&self, coxa: f32) -> Vector3<f32> {
        let p = (self.root_world * joint_rotation(JointKind::Coxa, coxa))
            * Point3::new(0.0, 0.0, self.dims.coxa);
        p.coords
    }
}

// ---------------------------------------------------------------------------
// ChainModel
// ---------------------------------------------------------------------------

/// A detached snapshot of one leg: pose, limits, policy and strategy.
///
/// Solving a model never touches the scene graph.
#[derive(Debug, Clone)]
pub struct ChainModel {
    pub index: usize,
    pub pose: LegPose,
    pub limits: [JointLimits; 3],
    pub policy: LimitPolicy,
    pub solver: SolverKind,
}

impl ChainModel {
    /// Solve for a world-space target and apply the limit policy.
    pub fn solve(&self, target: &Vector3<f32>) -> LegSolution {
        let mut solution = self.solver.solve(&self.pose, target);
        solution.apply_limits(&self.limits, self.policy);
        solution
    }

    pub fn forward_foot(&self, angles: &LegAngles) -> Vector3<f32> {
        self.pose.forward_foot(angles)
    }
}

// ---------------------------------------------------------------------------
// LimbChain
// ---------------------------------------------------------------------------

/// Scene nodes of one leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegNodes {
    pub root: NodeId,
    pub coxa: NodeId,
    pub coxa_segment: NodeId,
    pub femur: NodeId,
    pub femur_segment: NodeId,
    pub tibia: NodeId,
    pub tibia_segment: NodeId,
    pub foot_end: NodeId,
}

/// One leg: its nodes in the scene graph, joint specs and solver strategy.
#[derive(Debug, Clone)]
pub struct LimbChain {
    index: usize,
    nodes: LegNodes,
    joints: [JointSpec; 3],
    dims: LegDimensions,
    solver: SolverKind,
    policy: LimitPolicy,
    angles: LegAngles,
    last_solution: Option<LegSolution>,
}

impl LimbChain {
    /// Create the leg's nodes under `parent` and place the root at `mount`.
    pub fn build(
        graph: &mut SceneGraph,
        parent: NodeId,
        index: usize,
        mount: &LegMount,
        leg: &LegConfig,
        solver: SolverKind,
    ) -> Self {
        let dims = LegDimensions::from_config(leg);
        let name = |part: &str| format!("leg{index}.{part}");

        let root = graph.add_child(parent, name("root"));
        let [mx, my, mz] = mount.position;
        graph.set_sub_transform(
            root,
            TransformSlot::Base,
            translation(mx, my, mz) * rotation_y(mount.yaw),
        );

        let place = |graph: &mut SceneGraph, node: NodeId, offset: Vector3<f32>| {
            graph.set_sub_transform(
                node,
                TransformSlot::Base,
                translation(offset.x, offset.y, offset.z),
            );
        };

        let coxa = graph.add_child(root, name("coxa"));
        let coxa_segment = graph.add_child(coxa, name("coxa_segment"));
        let femur = graph.add_child(coxa_segment, name("femur"));
        place(graph, femur, dims.joint_offset(JointKind::Femur));
        let femur_segment = graph.add_child(femur, name("femur_segment"));
        let tibia = graph.add_child(femur_segment, name("tibia"));
        place(graph, tibia, dims.joint_offset(JointKind::Tibia));
        let tibia_segment = graph.add_child(tibia, name("tibia_segment"));
        let foot_end = graph.add_child(tibia_segment, name("foot_end"));
        place(graph, foot_end, dims.foot_offset());

        let spec = |kind: JointKind, node: NodeId, limits: JointLimitConfig| JointSpec {
            kind,
            node,
            axis: joint_axis(kind),
            offset: dims.joint_offset(kind),
            limits: limits.into(),
        };
        let joints = [
            spec(JointKind::Coxa, coxa, leg.coxa_limits),
            spec(JointKind::Femur, femur, leg.femur_limits),
            spec(JointKind::Tibia, tibia, leg.tibia_limits),
        ];

        let mut chain = Self {
            index,
            nodes: LegNodes {
                root,
                coxa,
                coxa_segment,
                femur,
                femur_segment,
                tibia,
                tibia_segment,
                foot_end,
            },
            joints,
            dims,
            solver,
            policy: leg.limit_policy,
            angles: LegAngles::default(),
            last_solution: None,
        };
        chain.write_angles(graph, LegAngles::default());
        chain
    }

    pub const fn index(&self) -> usize {
        self.index
    }

    pub const fn nodes(&self) -> &LegNodes {
        &self.nodes
    }

    pub const fn joints(&self) -> &[JointSpec; 3] {
        &self.joints
    }

    pub const fn dims(&self) -> &LegDimensions {
        &self.dims
    }

    pub const fn solver(&self) -> &SolverKind {
        &self.solver
    }

    pub fn set_solver(&mut self, solver: SolverKind) {
        self.solver = solver;
    }

    pub const fn limit_policy(&self) -> LimitPolicy {
        self.policy
    }

    pub const fn set_limit_policy(&mut self, policy: LimitPolicy) {
        self.policy = policy;
    }

    /// Angles currently written into the joints.
    pub const fn angles(&self) -> LegAngles {
        self.angles
    }

    pub const fn last_solution(&self) -> Option<&LegSolution> {
        self.last_solution.as_ref()
    }

    /// Requires a propagated graph.
    pub fn pose(&self, graph: &SceneGraph) -> LegPose {
        LegPose {
            root_world: *graph.world_isometry(self.nodes.root),
            dims: self.dims,
            current: self.angles,
        }
    }

    pub fn model(&self, graph: &SceneGraph) -> ChainModel {
        ChainModel {
            index: self.index,
            pose: self.pose(graph),
            limits: self.joints.map(|j| j.limits),
            policy: self.policy,
            solver: self.solver.clone(),
        }
    }

    /// Solve for a world target without touching the graph.
    pub fn solve(&self, graph: &SceneGraph, target: &Vector3<f32>) -> LegSolution {
        self.model(graph).solve(target)
    }

    /// Write a solution into the joints' `ik` slots. The caller propagates.
    pub fn apply(&mut self, graph: &mut SceneGraph, solution: LegSolution) {
        self.write_angles(graph, solution.angles);
        self.last_solution = Some(solution);
    }

    /// Solve for `target` and apply the result.
    pub fn solve_and_apply(&mut self, graph: &mut SceneGraph, target: &Vector3<f32>) -> LegSolution {
        let solution = self.solve(graph, target);
        self.apply(graph, solution);
        solution
    }

    fn write_angles(&mut self, graph: &mut SceneGraph, angles: LegAngles) {
        for joint in &self.joints {
            graph.set_sub_transform(
                joint.node,
                TransformSlot::Ik,
                joint.rotation(angles.get(joint.kind)),
            );
        }
        self.angles = angles;
    }

    /// Forward kinematics from the leg root's current world transform.
    pub fn forward_foot(&self, graph: &SceneGraph, angles: &LegAngles) -> Vector3<f32> {
        self.pose(graph).forward_foot(angles)
    }

    /// World position of the foot end node (last propagation).
    pub fn foot_end_position(&self, graph: &SceneGraph) -> Vector3<f32> {
        graph.world_position(self.nodes.foot_end)
    }

    /// World position of the femur pivot (last propagation).
    pub fn femur_pivot_position(&self, graph: &SceneGraph) -> Vector3<f32> {
        graph.world_position(self.nodes.femur)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::Reach;
    use approx::assert_relative_eq;

    fn leg_in_graph(policy: LimitPolicy) -> (SceneGraph, LimbChain) {
        let mut graph = SceneGraph::new();
        let body = graph.add_root("body");
        graph.set_sub_transform(body, TransformSlot::Base, translation(0.0, 0.5, 0.0));
        let leg = LegConfig {
            limit_policy: policy,
            ..LegConfig::default()
        };
        let mount = LegMount {
            position: [0.25, 0.0, 0.45],
            yaw: std::f32::consts::FRAC_PI_4,
        };
        let chain = LimbChain::build(&mut graph, body, 0, &mount, &leg, SolverKind::Analytic);
        graph.propagate();
        (graph, chain)
    }

    #[test]
    fn build_creates_fixed_topology() {
        let (graph, chain) = leg_in_graph(LimitPolicy::Ignore);
        let root = chain.nodes().root;
        assert_eq!(
            graph.names(root),
            [
                "leg0.root",
                "leg0.coxa",
                "leg0.coxa_segment",
                "leg0.femur",
                "leg0.femur_segment",
                "leg0.tibia",
                "leg0.tibia_segment",
                "leg0.foot_end",
            ]
        );
    }

    #[test]
    fn joints_turn_about_their_axes() {
        let (_, chain) = leg_in_graph(LimitPolicy::Ignore);
        let [coxa, femur, tibia] = chain.joints();
        assert_eq!(coxa.axis, Vector3::y_axis());
        assert_eq!(femur.axis, Vector3::x_axis());
        assert_eq!(tibia.axis, Vector3::x_axis());
        for joint in chain.joints() {
            let turned = joint.rotation(0.4);
            assert_relative_eq!(turned, joint_rotation(joint.kind, 0.4), epsilon = 1e-6);
            // The axis itself is left in place by its own rotation.
            assert_relative_eq!(
                turned * joint.axis.into_inner(),
                joint.axis.into_inner(),
                epsilon = 1e-6
            );
        }
    }

    #[test]
    fn graph_matches_forward_kinematics() {
        let (mut graph, mut chain) = leg_in_graph(LimitPolicy::Ignore);
        let angles = LegAngles::new(0.3, 0.2, -1.4);
        chain.apply(
            &mut graph,
            LegSolution {
                angles,
                reach: Reach::Reachable,
                limited: [false; 3],
                iterations: 0,
            },
        );
        graph.propagate();
        let fk = chain.forward_foot(&graph, &angles);
        assert_relative_eq!(chain.foot_end_position(&graph), fk, epsilon = 1e-5);
    }

    #[test]
    fn straight_leg_reaches_full_length() {
        let (graph, chain) = leg_in_graph(LimitPolicy::Ignore);
        let pose = chain.pose(&graph);
        let angles = LegAngles::new(0.0, 0.0, -PI);
        let foot = pose.forward_foot(&angles);
        let pivot = pose.femur_pivot(0.0);
        assert_relative_eq!((foot - pivot).norm(), pose.dims.max_reach(), epsilon = 1e-5);
        // Horizontal femur at zero: foot stays at pivot height.
        assert_relative_eq!(foot.y, pivot.y, epsilon = 1e-5);
    }

    #[test]
    fn solve_and_apply_lands_foot_on_target() {
        let (mut graph, mut chain) = leg_in_graph(LimitPolicy::Ignore);
        let target = Vector3::new(0.75, 0.0, 0.8);
        let solution = chain.solve_and_apply(&mut graph, &target);
        graph.propagate();
        assert_eq!(solution.reach, Reach::Reachable);
        assert_relative_eq!(chain.foot_end_position(&graph), target, epsilon = 1e-3);
        assert_eq!(chain.angles(), solution.angles);
    }

    #[test]
    fn clamp_policy_marks_limited_joints() {
        let (graph, chain) = leg_in_graph(LimitPolicy::Clamp);
        // Directly behind the leg root: coxa wants about ±π, beyond ±π/2.
        let pose = chain.pose(&graph);
        let behind = pose.root_world * Point3::new(0.0, -0.4, -0.6);
        let solution = chain.solve(&graph, &behind.coords);
        assert!(solution.limited[0]);
        assert!(solution.angles.coxa.abs() <= FRAC_PI_2 + 1e-6);
    }

    #[test]
    fn ignore_policy_leaves_angles_alone() {
        let (graph, chain) = leg_in_graph(LimitPolicy::Ignore);
        let pose = chain.pose(&graph);
        let behind = pose.root_world * Point3::new(0.0, -0.4, -0.6);
        let solution = chain.solve(&graph, &behind.coords);
        assert_eq!(solution.limited, [false; 3]);
        assert!(solution.angles.coxa.abs() > FRAC_PI_2);
    }

    #[test]
    fn joint_limits_from_config() {
        let limits: JointLimits = JointLimitConfig { min: -1.0, max: 0.5 }.into();
        assert!(limits.contains(0.0));
        assert!(!limits.contains(0.6));
        assert_relative_eq!(limits.clamp(-3.0), -1.0);
    }
}
