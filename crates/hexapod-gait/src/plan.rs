//! Group step plans.

use std::collections::VecDeque;

use nalgebra::Vector3;

use hexapod_core::time::SimTime;
use hexapod_core::types::TripodGroup;

/// A request for one tripod group to step.
///
/// Only legs of `group` are listed. The plan stays active until every leg of
/// the group, listed or not, is back in support.
#[derive(Debug, Clone, PartialEq)]
pub struct GaitPlan {
    pub id: u64,
    pub group: TripodGroup,
    /// Leg index and the world-space target it was planned toward.
    pub targets: Vec<(usize, Vector3<f32>)>,
    pub created_at: SimTime,
}

impl GaitPlan {
    pub fn legs(&self) -> impl Iterator<Item = usize> + '_ {
        self.targets.iter().map(|(leg, _)| *leg)
    }

    pub fn contains(&self, leg: usize) -> bool {
        self.targets.iter().any(|(l, _)| *l == leg)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// FIFO of plans waiting for the active one to retire.
#[derive(Debug, Clone, Default)]
pub struct PlanQueue {
    plans: VecDeque<GaitPlan>,
}

impl PlanQueue {
    pub fn push(&mut self, plan: GaitPlan) {
        self.plans.push_back(plan);
    }

    pub fn pop(&mut self) -> Option<GaitPlan> {
        self.plans.pop_front()
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}
