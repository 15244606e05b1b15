//! Bevy ECS integration for one-shot leg solves.
//!
//! Provides [`HexapodIkPlugin`], which drains [`IkRequests`] each frame and
//! writes [`IkResults`].
//!
//! # Usage
//!
//! 1. Add [`HexapodIkPlugin`] to your app.
//! 2. Register leg models in [`IkChainMap`] (the sim plugin keeps them in
//!    sync with the robot).
//! 3. Push an [`IkRequest`] for a leg and read the result after the update.
//!
//! The solve system runs in [`HexapodSet::Solve`], after the robot has
//! advanced in [`HexapodSet::Plan`].

use std::collections::BTreeMap;

use bevy::prelude::*;
use nalgebra::Vector3;
use tracing::warn;

use hexapod_core::HexapodSet;

use crate::chain::ChainModel;
use crate::solver::LegSolution;

/// Bevy plugin that serves one-shot leg IK requests.
pub struct HexapodIkPlugin;

impl Plugin for HexapodIkPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<IkChainMap>()
            .init_resource::<IkRequests>()
            .init_resource::<IkResults>()
            .add_systems(Update, ik_solve_system.in_set(HexapodSet::Solve));
    }
}

/// Resource mapping leg index to a detached [`ChainModel`].
#[derive(Resource, Debug, Default)]
pub struct IkChainMap {
    chains: BTreeMap<usize, ChainModel>,
}

impl IkChainMap {
    /// Insert or replace the model for `model.index`.
    pub fn insert(&mut self, model: ChainModel) {
        self.chains.insert(model.index, model);
    }

    pub fn get(&self, leg: usize) -> Option<&ChainModel> {
        self.chains.get(&leg)
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

/// Solve `leg` for a world-space `target`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IkRequest {
    pub leg: usize,
    pub target: Vector3<f32>,
}

/// Pending requests, drained by the solve system.
#[derive(Resource, Debug, Default)]
pub struct IkRequests(pub Vec<IkRequest>);

impl IkRequests {
    pub fn push(&mut self, leg: usize, target: Vector3<f32>) {
        self.0.push(IkRequest { leg, target });
    }
}

/// Outcome of one request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IkResult {
    pub request: IkRequest,
    /// Foot position the solved angles reach.
    pub reached: Vector3<f32>,
    pub solution: LegSolution,
}

/// Results of the requests served in the most recent frame that had any.
#[derive(Resource, Debug, Default)]
pub struct IkResults(pub Vec<IkResult>);

impl IkResults {
    pub fn for_leg(&self, leg: usize) -> Option<&IkResult> {
        self.0.iter().rev().find(|r| r.request.leg == leg)
    }
}

#[allow(clippy::needless_pass_by_value)]
fn ik_solve_system(
    chains: Res<IkChainMap>,
    mut requests: ResMut<IkRequests>,
    mut results: ResMut<IkResults>,
) {
    if requests.0.is_empty() {
        return;
    }
    results.0.clear();
    for request in requests.0.drain(..) {
        let Some(model) = chains.get(request.leg) else {
            warn!(leg = request.leg, "ik request for unregistered leg");
            continue;
        };
        let solution = model.solve(&request.target);
        results.0.push(IkResult {
            request,
            reached: model.forward_foot(&solution.angles),
            solution,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{JointLimits, LegAngles, LegDimensions, LegPose};
    use crate::solver::{Reach, SolverKind};
    use approx::assert_relative_eq;
    use hexapod_core::HexapodCorePlugin;
    use hexapod_core::config::LimitPolicy;
    use nalgebra::Isometry3;

    fn model(index: usize) -> ChainModel {
        ChainModel {
            index,
            pose: LegPose {
                root_world: Isometry3::translation(0.0, 0.5, 0.0),
                dims: LegDimensions {
                    coxa: 0.15,
                    femur: 0.45,
                    tibia: 0.65,
                },
                current: LegAngles::default(),
            },
            limits: [JointLimits::new(-3.2, 3.2); 3],
            policy: LimitPolicy::Ignore,
            solver: SolverKind::Analytic,
        }
    }

    fn build_app() -> App {
        let mut app = App::new();
        app.add_plugins((HexapodCorePlugin, HexapodIkPlugin));
        app.finish();
        app.cleanup();
        app
    }

    #[test]
    fn plugin_registers_resources() {
        let mut app = build_app();
        app.update();
        assert!(app.world().get_resource::<IkChainMap>().is_some());
        assert!(app.world().get_resource::<IkRequests>().is_some());
        assert!(app.world().get_resource::<IkResults>().is_some());
    }

    #[test]
    fn request_is_solved_and_drained() {
        let mut app = build_app();
        app.world_mut().resource_mut::<IkChainMap>().insert(model(2));
        let target = Vector3::new(0.3, 0.0, 0.5);
        app.world_mut().resource_mut::<IkRequests>().push(2, target);
        app.update();

        assert!(app.world().resource::<IkRequests>().0.is_empty());
        let results = app.world().resource::<IkResults>();
        let result = results.for_leg(2).unwrap();
        assert_eq!(result.solution.reach, Reach::Reachable);
        assert_relative_eq!(result.reached, target, epsilon = 1e-3);
    }

    #[test]
    fn unknown_leg_is_skipped() {
        let mut app = build_app();
        app.world_mut()
            .resource_mut::<IkRequests>()
            .push(5, Vector3::zeros());
        app.update();
        assert!(app.world().resource::<IkResults>().0.is_empty());
    }

    #[test]
    fn results_persist_until_next_batch() {
        let mut app = build_app();
        app.world_mut().resource_mut::<IkChainMap>().insert(model(0));
        app.world_mut()
            .resource_mut::<IkRequests>()
            .push(0, Vector3::new(0.0, 0.0, 0.6));
        app.update();
        app.update();
        assert_eq!(app.world().resource::<IkResults>().0.len(), 1);
    }
}
