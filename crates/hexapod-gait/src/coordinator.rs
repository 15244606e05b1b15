//! Tripod gait coordinator.
//!
//! Owns one foot node per leg (a child of the scene root, so planted feet do
//! not move with the body) and one foot-target node per leg (a child of the
//! body root, so targets ride along with it). Each frame it decides which
//! group may step and moves swinging feet through their `gait` slot.
//!
//! Frame order:
//!
//! 1. Pin foot targets to the ground under the body.
//! 2. Plan: with no active plan and nothing queued, emit one plan per group
//!    that has legs over threshold, alternating which group goes first.
//! 3. Retire the active plan once its whole group is in support, then
//!    activate the next queued plan.
//! 4. Advance swinging legs and lift off legs that may start.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracing::debug;

use hexapod_core::config::GaitConfig;
use hexapod_core::time::SimTime;
use hexapod_core::types::{TripodGroup, TripodGroups};
use hexapod_scene::{NodeId, SceneGraph, TransformSlot, translation};

use crate::plan::{GaitPlan, PlanQueue};
use crate::state::{LegGaitState, LegPhase};

fn horizontal_distance(a: &Vector3<f32>, b: &Vector3<f32>) -> f32 {
    (a.x - b.x).hypot(a.z - b.z)
}

fn set_offset(graph: &mut SceneGraph, node: NodeId, offset: &Vector3<f32>) {
    graph.set_sub_transform(
        node,
        TransformSlot::Gait,
        translation(offset.x, offset.y, offset.z),
    );
}

// ---------------------------------------------------------------------------
// Events & snapshots
// ---------------------------------------------------------------------------

/// Gait transitions, drained by the owner each frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GaitEvent {
    PlanCreated {
        id: u64,
        group: TripodGroup,
        legs: Vec<usize>,
    },
    PlanStarted {
        id: u64,
        group: TripodGroup,
    },
    PlanCompleted {
        id: u64,
        group: TripodGroup,
    },
    SwingStarted {
        leg: usize,
        group: TripodGroup,
    },
    SwingCompleted {
        leg: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegSnapshot {
    pub index: usize,
    pub group: TripodGroup,
    pub phase: LegPhase,
    pub grounded: bool,
    pub stepping: bool,
    /// Whether the leg's group currently allows it to lift off.
    pub can_start: bool,
    /// Swing parameter in `[0, 1]`.
    pub progress: f32,
    /// Horizontal foot-to-target distance at the last update.
    pub distance: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSnapshot {
    pub id: u64,
    pub group: TripodGroup,
    pub target_count: usize,
}

/// Read-only diagnostic view of the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaitSnapshot {
    pub time: SimTime,
    pub legs: Vec<LegSnapshot>,
    pub active_group: Option<TripodGroup>,
    pub current_plan: Option<PlanSnapshot>,
    pub queue_len: usize,
    pub plans_completed: u64,
}

// ---------------------------------------------------------------------------
// GaitCoordinator
// ---------------------------------------------------------------------------

/// Scene nodes and rest pose of one leg, as seen by the gait.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaitLeg {
    /// Commanded foot (IK target), child of the scene root.
    pub foot: NodeId,
    /// Where the foot would like to be, child of the body root.
    pub target: NodeId,
    /// Initial world position of the foot; gait offsets are relative to it.
    pub rest: Vector3<f32>,
    pub group: TripodGroup,
}

#[derive(Debug, Clone)]
pub struct GaitCoordinator {
    config: GaitConfig,
    ground_level: f32,
    body_root: NodeId,
    legs: Vec<GaitLeg>,
    states: Vec<LegGaitState>,
    distances: Vec<f32>,
    current_plan: Option<GaitPlan>,
    queue: PlanQueue,
    last_group: Option<TripodGroup>,
    next_plan_id: u64,
    plans_completed: u64,
    steps_completed: u64,
    clock: SimTime,
    events: Vec<GaitEvent>,
}

impl GaitCoordinator {
    /// Create foot and foot-target nodes and settle them on the ground.
    ///
    /// `rest_local` holds each leg's resting foot position in the body frame.
    /// The body root must already carry its initial placement.
    pub fn build(
        graph: &mut SceneGraph,
        scene_root: NodeId,
        body_root: NodeId,
        rest_local: &[[f32; 3]],
        config: &GaitConfig,
        ground_level: f32,
    ) -> Self {
        let targets: Vec<NodeId> = rest_local
            .iter()
            .enumerate()
            .map(|(i, &[x, y, z])| {
                let node = graph.add_child(body_root, format!("foot_target{i}"));
                graph.set_sub_transform(node, TransformSlot::Base, translation(x, y, z));
                node
            })
            .collect();

        let mut coordinator = Self {
            config: config.clone(),
            ground_level,
            body_root,
            legs: Vec::with_capacity(targets.len()),
            states: vec![LegGaitState::default(); targets.len()],
            distances: vec![0.0; targets.len()],
            current_plan: None,
            queue: PlanQueue::default(),
            last_group: None,
            next_plan_id: 1,
            plans_completed: 0,
            steps_completed: 0,
            clock: SimTime::new(),
            events: Vec::new(),
        };

        graph.propagate();
        coordinator.track_ground(graph, &targets);
        graph.propagate();

        for (i, &target) in targets.iter().enumerate() {
            let rest = graph.world_position(target);
            let foot = graph.add_child(scene_root, format!("foot{i}"));
            graph.set_sub_transform(foot, TransformSlot::Base, translation(rest.x, rest.y, rest.z));
            coordinator.legs.push(GaitLeg {
                foot,
                target,
                rest,
                group: config.groups.group_of(i),
            });
        }
        graph.propagate();
        coordinator
    }

    // -- accessors ---------------------------------------------------------

    pub fn legs(&self) -> &[GaitLeg] {
        &self.legs
    }

    pub fn states(&self) -> &[LegGaitState] {
        &self.states
    }

    pub fn state(&self, leg: usize) -> Option<&LegGaitState> {
        self.states.get(leg)
    }

    pub const fn groups(&self) -> &TripodGroups {
        &self.config.groups
    }

    pub const fn current_plan(&self) -> Option<&GaitPlan> {
        self.current_plan.as_ref()
    }

    pub const fn queue(&self) -> &PlanQueue {
        &self.queue
    }

    /// Group of the active plan. Only that group may lift off.
    pub fn active_group(&self) -> Option<TripodGroup> {
        self.current_plan.as_ref().map(|p| p.group)
    }

    /// Group whose plan completed most recently.
    pub const fn last_group(&self) -> Option<TripodGroup> {
        self.last_group
    }

    pub const fn plans_completed(&self) -> u64 {
        self.plans_completed
    }

    pub const fn steps_completed(&self) -> u64 {
        self.steps_completed
    }

    pub const fn time(&self) -> SimTime {
        self.clock
    }

    /// Indices of legs currently in swing.
    pub fn swinging_legs(&self) -> Vec<usize> {
        self.states
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_stepping())
            .map(|(i, _)| i)
            .collect()
    }

    /// Current gait offset of `leg`'s foot, or `None` for an unknown leg.
    pub fn foot_offset(&self, graph: &SceneGraph, leg: usize) -> Option<Vector3<f32>> {
        let foot = self.legs.get(leg)?.foot;
        Some(graph.sub_transform(foot, TransformSlot::Gait).translation.vector)
    }

    /// Take the events emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<GaitEvent> {
        std::mem::take(&mut self.events)
    }

    // -- update ------------------------------------------------------------

    /// Run one gait frame. The caller propagates the graph afterwards.
    ///
    /// Non-positive or non-finite `dt` leaves everything untouched.
    pub fn update(&mut self, graph: &mut SceneGraph, dt: f32) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }
        self.clock.advance_secs(dt);

        let targets: Vec<NodeId> = self.legs.iter().map(|l| l.target).collect();
        self.track_ground(graph, &targets);
        graph.propagate();
        self.measure(graph);

        if self.current_plan.is_none() && self.queue.is_empty() {
            self.plan(graph);
        }
        self.transition();

        for leg in 0..self.legs.len() {
            if self.states[leg].is_stepping() {
                self.advance_swing(graph, leg, dt);
            } else if self.may_start(leg) {
                self.start_swing(graph, leg);
            }
        }
    }

    /// Hold every foot target at ground level below the body.
    fn track_ground(&self, graph: &mut SceneGraph, targets: &[NodeId]) {
        let body_height = graph.world_position(self.body_root).y;
        let drop = -(body_height - self.ground_level);
        for &target in targets {
            graph.set_sub_transform(target, TransformSlot::User, translation(0.0, drop, 0.0));
        }
    }

    fn measure(&mut self, graph: &SceneGraph) {
        for (i, leg) in self.legs.iter().enumerate() {
            self.distances[i] = horizontal_distance(
                &graph.world_position(leg.foot),
                &graph.world_position(leg.target),
            );
        }
    }

    fn over_threshold(&self, leg: usize) -> bool {
        self.distances[leg] > self.config.max_foot_distance
    }

    fn group_allows(&self, group: TripodGroup) -> bool {
        self.active_group().is_none_or(|active| active == group)
    }

    fn may_start(&self, leg: usize) -> bool {
        !self.states[leg].is_stepping()
            && self.over_threshold(leg)
            && self.group_allows(self.legs[leg].group)
    }

    fn new_plan(&mut self, group: TripodGroup, targets: Vec<(usize, Vector3<f32>)>) -> GaitPlan {
        let plan = GaitPlan {
            id: self.next_plan_id,
            group,
            targets,
            created_at: self.clock,
        };
        self.next_plan_id += 1;
        let legs: Vec<usize> = plan.legs().collect();
        debug!(id = plan.id, %group, ?legs, "gait plan created");
        self.events.push(GaitEvent::PlanCreated {
            id: plan.id,
            group,
            legs,
        });
        plan
    }

    fn activate(&mut self, plan: GaitPlan) {
        debug!(id = plan.id, group = %plan.group, "gait plan started");
        self.events.push(GaitEvent::PlanStarted {
            id: plan.id,
            group: plan.group,
        });
        self.current_plan = Some(plan);
    }

    fn plan(&mut self, graph: &SceneGraph) {
        let first = self.last_group.map_or(TripodGroup::A, TripodGroup::other);
        for group in [first, first.other()] {
            let targets: Vec<(usize, Vector3<f32>)> = (0..self.legs.len())
                .filter(|&i| self.legs[i].group == group)
                .filter(|&i| self.over_threshold(i) && !self.states[i].is_stepping())
                .map(|i| (i, graph.world_position(self.legs[i].target)))
                .collect();
            if !targets.is_empty() {
                let plan = self.new_plan(group, targets);
                self.queue.push(plan);
            }
        }
    }

    fn transition(&mut self) {
        if let Some(plan) = &self.current_plan {
            let group = plan.group;
            let settled = self
                .legs
                .iter()
                .zip(&self.states)
                .filter(|(leg, _)| leg.group == group)
                .all(|(_, state)| state.is_grounded());
            if settled {
                let id = plan.id;
                debug!(id, %group, "gait plan completed");
                self.events.push(GaitEvent::PlanCompleted { id, group });
                self.last_group = Some(group);
                self.plans_completed += 1;
                self.current_plan = None;
            }
        }
        if self.current_plan.is_none() {
            if let Some(next) = self.queue.pop() {
                self.activate(next);
            }
        }
    }

    fn start_swing(&mut self, graph: &SceneGraph, leg: usize) {
        let GaitLeg {
            foot,
            target,
            rest,
            group,
        } = self.legs[leg];
        let target_world = graph.world_position(target);

        if self.current_plan.is_none() {
            let plan = self.new_plan(group, vec![(leg, target_world)]);
            self.activate(plan);
        }

        let start = graph.sub_transform(foot, TransformSlot::Gait).translation.vector;
        let end = Vector3::new(
            target_world.x - rest.x,
            self.ground_level - rest.y,
            target_world.z - rest.z,
        );
        self.states[leg].begin_swing(start, end);
        debug!(leg, %group, distance = self.distances[leg], "swing started");
        self.events.push(GaitEvent::SwingStarted { leg, group });
    }

    fn advance_swing(&mut self, graph: &mut SceneGraph, leg: usize, dt: f32) {
        let Some((offset, landed)) = self.states[leg].advance(
            dt,
            self.config.swing_duration,
            self.config.step_height,
        ) else {
            return;
        };
        set_offset(graph, self.legs[leg].foot, &offset);
        if landed {
            self.steps_completed += 1;
            debug!(leg, "swing completed");
            self.events.push(GaitEvent::SwingCompleted { leg });
        }
    }

    // -- diagnostics -------------------------------------------------------

    pub fn snapshot(&self) -> GaitSnapshot {
        let duration = self.config.swing_duration;
        let legs = self
            .legs
            .iter()
            .zip(&self.states)
            .enumerate()
            .map(|(index, (leg, state))| LegSnapshot {
                index,
                group: leg.group,
                phase: state.phase(),
                grounded: state.is_grounded(),
                stepping: state.is_stepping(),
                can_start: !state.is_stepping() && self.group_allows(leg.group),
                progress: state.progress(duration),
                distance: self.distances[index],
            })
            .collect();
        GaitSnapshot {
            time: self.clock,
            legs,
            active_group: self.active_group(),
            current_plan: self.current_plan.as_ref().map(|p| PlanSnapshot {
                id: p.id,
                group: p.group,
                target_count: p.len(),
            }),
            queue_len: self.queue.len(),
            plans_completed: self.plans_completed,
        }
    }
}
