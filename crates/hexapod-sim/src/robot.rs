//! The assembled robot and its per-frame pipeline.
//!
//! ```text
//! scene
//! ├── body_root            base = T(position), user = R_y(yaw)
//! │   ├── body             (mesh)
//! │   ├── leg{i}.root ─► coxa ─► … ─► foot_end
//! │   └── foot_target{i}   rides with the body, pinned to the ground
//! ├── foot{i}              commanded foot, moved by the gait
//! └── target_marker
//! ```
//!
//! Each [`advance`](RobotAssembly::advance):
//! body update → propagate → gait update → propagate → leg solves → propagate.

use nalgebra::{Matrix4, Vector3};
use tracing::{debug, info};

use hexapod_core::config::{HexapodConfig, LEG_COUNT};
use hexapod_core::error::{ConfigError, HexapodError};
use hexapod_gait::{GaitCoordinator, GaitEvent, GaitSnapshot};
use hexapod_ik::{ChainModel, ChainSolver, LegAngles, LegSolution, LimbChain, Reach, SolverKind};
use hexapod_scene::{MeshHandle, NodeId, SceneGraph, TransformSlot, translation};

use crate::body::{BodyController, BodyPose};
use crate::stats::WalkStats;

/// Top-level nodes of the assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RobotNodes {
    pub scene_root: NodeId,
    pub body_root: NodeId,
    pub body: NodeId,
    pub target_marker: NodeId,
}

/// Scene graph, legs, gait and body controller of one hexapod.
///
/// Owns all of its state, so several robots can run side by side.
#[derive(Debug, Clone)]
pub struct RobotAssembly {
    config: HexapodConfig,
    graph: SceneGraph,
    nodes: RobotNodes,
    legs: Vec<LimbChain>,
    gait: GaitCoordinator,
    body: BodyController,
    stats: WalkStats,
    events: Vec<GaitEvent>,
}

impl RobotAssembly {
    /// Validate `config`, build the rig and settle the legs onto their feet.
    pub fn new(config: HexapodConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut graph = SceneGraph::new();
        let scene_root = graph.add_root("scene");
        let body_root = graph.add_child(scene_root, "body_root");
        let body_node = graph.add_child(body_root, "body");
        graph.set_mesh(body_node, Some(MeshHandle(0)));

        let body = BodyController::new(&config.movement, config.body.ground_height);
        body.apply(&mut graph, body_root);

        let solver = SolverKind::from_config(&config.solver);
        let mut mesh = 1;
        let legs: Vec<LimbChain> = config
            .mounts()
            .iter()
            .enumerate()
            .map(|(i, mount)| {
                let chain =
                    LimbChain::build(&mut graph, body_root, i, mount, &config.leg, solver.clone());
                let n = chain.nodes();
                for segment in [n.coxa_segment, n.femur_segment, n.tibia_segment] {
                    graph.set_mesh(segment, Some(MeshHandle(mesh)));
                    mesh += 1;
                }
                chain
            })
            .collect();

        let rest: Vec<[f32; 3]> = (0..LEG_COUNT).map(|i| config.rest_foot_position(i)).collect();
        let gait = GaitCoordinator::build(
            &mut graph,
            scene_root,
            body_root,
            &rest,
            &config.gait,
            config.body.ground_level,
        );

        let target_marker = graph.add_child(scene_root, "target_marker");
        graph.set_mesh(target_marker, Some(MeshHandle(mesh)));

        let mut robot = Self {
            config,
            graph,
            nodes: RobotNodes {
                scene_root,
                body_root,
                body: body_node,
                target_marker,
            },
            legs,
            gait,
            body,
            stats: WalkStats::new(),
            events: Vec::new(),
        };
        robot.graph.propagate();
        robot.solve_legs();
        robot.graph.propagate();

        info!(
            legs = robot.legs.len(),
            nodes = robot.graph.len(),
            solver = robot.legs.first().map_or("none", |l| l.solver().name()),
            "hexapod assembled"
        );
        Ok(robot)
    }

    /// Run one frame toward `target` (only x and z matter).
    ///
    /// Non-positive or non-finite `dt` is ignored.
    pub fn advance(&mut self, dt: f32, target: &Vector3<f32>) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }

        let motion = self.body.update(dt, target);
        self.body.apply(&mut self.graph, self.nodes.body_root);
        self.graph.set_sub_transform(
            self.nodes.target_marker,
            TransformSlot::Base,
            translation(target.x, self.config.body.ground_level, target.z),
        );
        self.graph.propagate();

        self.gait.update(&mut self.graph, dt);
        self.graph.propagate();

        let stretched = self.solve_legs();
        self.graph.propagate();

        self.stats.record_frame(dt, motion.travelled);
        self.stats.record_stretched(stretched);
        for event in self.gait.drain_events() {
            self.stats.record_event(&event);
            self.events.push(event);
        }
    }

    /// Solve every leg toward its commanded foot. Returns the number of
    /// out-of-reach solves.
    fn solve_legs(&mut self) -> u64 {
        let mut stretched = 0;
        for (leg, gait_leg) in self.legs.iter_mut().zip(self.gait.legs()) {
            let target = self.graph.world_position(gait_leg.foot);
            let solution = leg.solve_and_apply(&mut self.graph, &target);
            if solution.reach == Reach::Stretched {
                stretched += 1;
                debug!(leg = leg.index(), "foot target beyond leg reach");
            }
        }
        stretched
    }

    // -- configuration -----------------------------------------------------

    pub const fn config(&self) -> &HexapodConfig {
        &self.config
    }

    /// Switch every leg to `solver` and re-solve in place.
    pub fn set_solver(&mut self, solver: &SolverKind) {
        for leg in &mut self.legs {
            leg.set_solver(solver.clone());
        }
        self.solve_legs();
        self.graph.propagate();
    }

    // -- queries -----------------------------------------------------------

    pub const fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    /// Mutable graph access, e.g. to displace a foot. Call
    /// [`SceneGraph::propagate`] before reading world positions.
    pub const fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    pub const fn nodes(&self) -> &RobotNodes {
        &self.nodes
    }

    pub fn legs(&self) -> &[LimbChain] {
        &self.legs
    }

    pub const fn gait(&self) -> &GaitCoordinator {
        &self.gait
    }

    pub const fn body_pose(&self) -> &BodyPose {
        self.body.pose()
    }

    pub const fn stats(&self) -> &WalkStats {
        &self.stats
    }

    pub fn gait_debug_snapshot(&self) -> GaitSnapshot {
        self.gait.snapshot()
    }

    pub fn world_transform(&self, node: NodeId) -> Matrix4<f32> {
        self.graph.world_transform(node)
    }

    pub fn world_position(&self, node: NodeId) -> Vector3<f32> {
        self.graph.world_position(node)
    }

    pub fn find(&self, name: &str) -> Result<NodeId, HexapodError> {
        self.graph
            .find(name)
            .ok_or_else(|| HexapodError::UnknownNode(name.to_owned()))
    }

    fn leg(&self, index: usize) -> Result<&LimbChain, HexapodError> {
        self.legs.get(index).ok_or(HexapodError::LegOutOfRange {
            index,
            count: self.legs.len(),
        })
    }

    pub fn leg_angles(&self, index: usize) -> Result<LegAngles, HexapodError> {
        self.leg(index).map(LimbChain::angles)
    }

    pub fn last_solution(&self, index: usize) -> Result<Option<LegSolution>, HexapodError> {
        self.leg(index).map(|l| l.last_solution().copied())
    }

    /// World position of `index`'s commanded foot.
    pub fn foot_position(&self, index: usize) -> Result<Vector3<f32>, HexapodError> {
        self.leg(index)?;
        Ok(self.graph.world_position(self.gait.legs()[index].foot))
    }

    /// World position of `index`'s foot end (where the leg actually reaches).
    pub fn foot_end_position(&self, index: usize) -> Result<Vector3<f32>, HexapodError> {
        Ok(self.leg(index)?.foot_end_position(&self.graph))
    }

    /// Detached solver models of every leg, for one-shot solves.
    pub fn chain_models(&self) -> Vec<ChainModel> {
        self.legs.iter().map(|l| l.model(&self.graph)).collect()
    }

    /// Solve `index` toward `target` without applying the result.
    pub fn solve_leg(
        &self,
        index: usize,
        target: &Vector3<f32>,
    ) -> Result<LegSolution, HexapodError> {
        Ok(self.leg(index)?.solve(&self.graph, target))
    }

    /// Take gait events recorded since the last drain.
    pub fn drain_events(&mut self) -> Vec<GaitEvent> {
        std::mem::take(&mut self.events)
    }
}
