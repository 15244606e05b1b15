//! A single scene-graph node and its four-part local transform.

use nalgebra::Isometry3;
use serde::{Deserialize, Serialize};

use crate::graph::NodeId;

/// Opaque handle to a renderable owned by the rendering collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MeshHandle(pub u64);

/// Names one of the four sub-transforms of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformSlot {
    /// Static placement relative to the parent.
    Base,
    /// Offset written by the gait coordinator.
    Gait,
    /// Joint rotation written by the leg solver.
    Ik,
    /// Override written by input handling or the body controller.
    User,
}

// ---------------------------------------------------------------------------
// LocalTransforms
// ---------------------------------------------------------------------------

/// The four sub-transforms of a node, combined by [`compose`](Self::compose).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalTransforms {
    pub base: Isometry3<f32>,
    pub gait: Isometry3<f32>,
    pub ik: Isometry3<f32>,
    pub user: Isometry3<f32>,
}

impl Default for LocalTransforms {
    fn default() -> Self {
        Self::identity()
    }
}

impl LocalTransforms {
    pub fn identity() -> Self {
        Self {
            base: Isometry3::identity(),
            gait: Isometry3::identity(),
            ik: Isometry3::identity(),
            user: Isometry3::identity(),
        }
    }

    /// All identity except `base`.
    pub fn with_base(base: Isometry3<f32>) -> Self {
        Self {
            base,
            ..Self::identity()
        }
    }

    pub const fn get(&self, slot: TransformSlot) -> &Isometry3<f32> {
        match slot {
            TransformSlot::Base => &self.base,
            TransformSlot::Gait => &self.gait,
            TransformSlot::Ik => &self.ik,
            TransformSlot::User => &self.user,
        }
    }

    pub const fn get_mut(&mut self, slot: TransformSlot) -> &mut Isometry3<f32> {
        match slot {
            TransformSlot::Base => &mut self.base,
            TransformSlot::Gait => &mut self.gait,
            TransformSlot::Ik => &mut self.ik,
            TransformSlot::User => &mut self.user,
        }
    }

    /// `base × gait × ik × user`, applied to child-local points right to left.
    pub fn compose(&self) -> Isometry3<f32> {
        self.base * self.gait * self.ik * self.user
    }
}

// ---------------------------------------------------------------------------
// TransformNode
// ---------------------------------------------------------------------------

/// A node in the [`SceneGraph`](crate::SceneGraph) arena.
///
/// `local` and `world` are caches refreshed by the graph; they are only
/// meaningful after the graph has been propagated at least once.
#[derive(Debug, Clone)]
pub struct TransformNode {
    pub(crate) name: String,
    pub(crate) mesh: Option<MeshHandle>,
    pub(crate) transforms: LocalTransforms,
    pub(crate) local: Isometry3<f32>,
    pub(crate) world: Isometry3<f32>,
    pub(crate) visible: bool,
    pub(crate) children: Vec<NodeId>,
    pub(crate) parent: Option<NodeId>,
}

impl TransformNode {
    pub(crate) fn new(name: String, parent: Option<NodeId>) -> Self {
        Self {
            name,
            mesh: None,
            transforms: LocalTransforms::identity(),
            local: Isometry3::identity(),
            world: Isometry3::identity(),
            visible: true,
            children: Vec::new(),
            parent,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn mesh(&self) -> Option<MeshHandle> {
        self.mesh
    }

    pub const fn transforms(&self) -> &LocalTransforms {
        &self.transforms
    }

    /// Cached local transform (last [`recompute_local`](crate::SceneGraph::recompute_local)).
    pub const fn local(&self) -> &Isometry3<f32> {
        &self.local
    }

    /// Cached world transform (last world propagation).
    pub const fn world(&self) -> &Isometry3<f32> {
        &self.world
    }

    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    /// Children in insertion order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Parent handle, `None` for roots. Used for frame lookups only.
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{rotation_y, translation};
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    #[test]
    fn identity_composes_to_identity() {
        let t = LocalTransforms::identity();
        assert_eq!(t.compose(), Isometry3::identity());
    }

    #[test]
    fn compose_order_is_base_outermost() {
        // base translates, user rotates: a child point is rotated first,
        // then translated.
        let mut t = LocalTransforms::with_base(translation(1.0, 0.0, 0.0));
        t.user = rotation_y(std::f32::consts::FRAC_PI_2);
        let p = t.compose() * Point3::new(0.0, 0.0, 1.0);
        assert_relative_eq!(p.x, 2.0, epsilon = 1e-6);
        assert_relative_eq!(p.y, 0.0, epsilon = 1e-6);
        assert_relative_eq!(p.z, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn compose_matches_explicit_product() {
        let t = LocalTransforms {
            base: translation(0.0, 1.0, 0.0),
            gait: translation(0.5, 0.0, 0.0),
            ik: rotation_y(0.3),
            user: translation(0.0, 0.0, -2.0),
        };
        let expected = t.base * (t.gait * (t.ik * t.user));
        let got = t.compose();
        assert_relative_eq!(got.translation.vector, expected.translation.vector, epsilon = 1e-6);
        assert_relative_eq!(got.rotation.angle(), expected.rotation.angle(), epsilon = 1e-6);
    }

    #[test]
    fn slot_accessors_address_distinct_fields() {
        let mut t = LocalTransforms::identity();
        *t.get_mut(TransformSlot::Gait) = translation(0.0, 0.0, 3.0);
        assert_eq!(t.get(TransformSlot::Base), &Isometry3::identity());
        assert_relative_eq!(t.get(TransformSlot::Gait).translation.z, 3.0);
        assert_relative_eq!(t.gait.translation.z, 3.0);
    }
}
