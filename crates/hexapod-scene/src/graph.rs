//! Arena-backed transform hierarchy.

use nalgebra::{Isometry3, Matrix4, Vector3};
use serde::{Deserialize, Serialize};

use crate::node::{MeshHandle, TransformNode, TransformSlot};

/// Handle to a node inside one [`SceneGraph`].
///
/// Handles are only minted by the graph that owns the node; using a handle
/// from another graph is a logic error and panics on out-of-range access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

// ---------------------------------------------------------------------------
// SceneGraph
// ---------------------------------------------------------------------------

/// Owns every [`TransformNode`] of the rig.
///
/// World transforms are caches: mutate sub-transforms freely, then call
/// [`propagate`](Self::propagate) (or the scoped
/// [`recompute_world`](Self::recompute_world)) before reading positions.
#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    nodes: Vec<TransformNode>,
    roots: Vec<NodeId>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Root nodes in insertion order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    fn push(&mut self, name: impl Into<String>, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.nodes.push(TransformNode::new(name.into(), parent));
        id
    }

    /// Add a parentless node.
    pub fn add_root(&mut self, name: impl Into<String>) -> NodeId {
        let id = self.push(name, None);
        self.roots.push(id);
        id
    }

    /// Create a node as the last child of `parent`.
    pub fn add_child(&mut self, parent: NodeId, name: impl Into<String>) -> NodeId {
        let id = self.push(name, Some(parent));
        self.nodes[parent.index()].children.push(id);
        id
    }

    pub fn node(&self, id: NodeId) -> &TransformNode {
        &self.nodes[id.index()]
    }

    pub fn get(&self, id: NodeId) -> Option<&TransformNode> {
        self.nodes.get(id.index())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn set_mesh(&mut self, id: NodeId, mesh: Option<MeshHandle>) {
        self.nodes[id.index()].mesh = mesh;
    }

    pub fn set_visible(&mut self, id: NodeId, visible: bool) {
        self.nodes[id.index()].visible = visible;
    }

    // -- transforms --------------------------------------------------------

    /// Replace one sub-transform. Cached local/world values are left stale.
    pub fn set_sub_transform(&mut self, id: NodeId, slot: TransformSlot, value: Isometry3<f32>) {
        *self.nodes[id.index()].transforms.get_mut(slot) = value;
    }

    pub fn sub_transform(&self, id: NodeId, slot: TransformSlot) -> &Isometry3<f32> {
        self.node(id).transforms.get(slot)
    }

    /// Refresh the cached local transform of `id` from its four sub-transforms.
    pub fn recompute_local(&mut self, id: NodeId) {
        let node = &mut self.nodes[id.index()];
        node.local = node.transforms.compose();
    }

    /// Recompute `id` and its whole subtree given the parent's world transform.
    ///
    /// Each visited node gets its local refreshed first, then
    /// `world = parent_world × local`.
    pub fn recompute_world(&mut self, id: NodeId, parent_world: &Isometry3<f32>) {
        let mut stack = vec![(id, *parent_world)];
        while let Some((current, parent)) = stack.pop() {
            self.recompute_local(current);
            let node = &mut self.nodes[current.index()];
            node.world = parent * node.local;
            let world = node.world;
            for &child in node.children.iter().rev() {
                stack.push((child, world));
            }
        }
    }

    /// Recompute every root subtree from identity.
    pub fn propagate(&mut self) {
        let identity = Isometry3::identity();
        for i in 0..self.roots.len() {
            let root = self.roots[i];
            self.recompute_world(root, &identity);
        }
    }

    /// Translation part of the cached world transform.
    pub fn world_position(&self, id: NodeId) -> Vector3<f32> {
        self.node(id).world.translation.vector
    }

    pub fn world_isometry(&self, id: NodeId) -> &Isometry3<f32> {
        &self.node(id).world
    }

    /// Cached world transform as a homogeneous 4×4 matrix.
    pub fn world_transform(&self, id: NodeId) -> Matrix4<f32> {
        self.node(id).world.to_homogeneous()
    }

    /// World transform of the parent frame, identity for roots.
    pub fn parent_world(&self, id: NodeId) -> Isometry3<f32> {
        self.parent(id)
            .map_or_else(Isometry3::identity, |p| self.node(p).world)
    }

    // -- queries -----------------------------------------------------------

    /// Depth-first pre-order walk over `root` and its descendants, children
    /// in insertion order.
    pub fn traverse<F>(&self, root: NodeId, mut visit: F)
    where
        F: FnMut(NodeId, &TransformNode),
    {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = self.node(id);
            visit(id, node);
            stack.extend(node.children.iter().rev().copied());
        }
    }

    /// First node named `name` in pre-order across all roots.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        let mut found = None;
        for &root in &self.roots {
            self.traverse(root, |id, node| {
                if found.is_none() && node.name == name {
                    found = Some(id);
                }
            });
            if found.is_some() {
                break;
            }
        }
        found
    }

    /// Names of `root`'s subtree in traversal order.
    pub fn names(&self, root: NodeId) -> Vec<String> {
        let mut out = Vec::new();
        self.traverse(root, |_, node| out.push(node.name.clone()));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{rotation_y, translation};
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    fn chain() -> (SceneGraph, NodeId, NodeId, NodeId) {
        let mut g = SceneGraph::new();
        let root = g.add_root("root");
        let a = g.add_child(root, "a");
        let b = g.add_child(a, "b");
        (g, root, a, b)
    }

    #[test]
    fn identity_graph_round_trips_to_origin() {
        let (mut g, root, a, b) = chain();
        g.propagate();
        for id in [root, a, b] {
            assert_relative_eq!(g.world_position(id), Vector3::zeros());
            assert_eq!(g.world_transform(id), Matrix4::identity());
        }
    }

    #[test]
    fn world_is_parent_times_local() {
        let (mut g, root, a, b) = chain();
        g.set_sub_transform(root, TransformSlot::Base, translation(1.0, 0.0, 0.0));
        g.set_sub_transform(a, TransformSlot::User, rotation_y(FRAC_PI_2));
        g.set_sub_transform(b, TransformSlot::Base, translation(0.0, 0.0, 2.0));
        g.propagate();

        // b sits 2 along +z of a, which is rotated so +z maps to +x.
        let p = g.world_position(b);
        assert_relative_eq!(p.x, 3.0, epsilon = 1e-6);
        assert_relative_eq!(p.y, 0.0, epsilon = 1e-6);
        assert_relative_eq!(p.z, 0.0, epsilon = 1e-6);

        let expected = g.world_isometry(a) * g.node(b).local();
        assert_relative_eq!(
            g.world_isometry(b).translation.vector,
            expected.translation.vector,
            epsilon = 1e-6
        );
    }

    #[test]
    fn stale_until_propagated() {
        let (mut g, _root, a, _b) = chain();
        g.propagate();
        g.set_sub_transform(a, TransformSlot::Gait, translation(0.0, 5.0, 0.0));
        assert_relative_eq!(g.world_position(a).y, 0.0);
        g.propagate();
        assert_relative_eq!(g.world_position(a).y, 5.0);
    }

    #[test]
    fn recompute_world_scopes_to_subtree() {
        let (mut g, root, a, b) = chain();
        g.propagate();
        g.set_sub_transform(root, TransformSlot::Base, translation(9.0, 0.0, 0.0));
        g.set_sub_transform(b, TransformSlot::Base, translation(0.0, 1.0, 0.0));
        let parent = g.parent_world(a);
        g.recompute_world(a, &parent);
        // root untouched, b updated relative to the old root world.
        assert_relative_eq!(g.world_position(root).x, 0.0);
        assert_relative_eq!(g.world_position(b).y, 1.0);
        assert_relative_eq!(g.world_position(b).x, 0.0);
    }

    #[test]
    fn matrix_export_carries_translation_column() {
        let mut g = SceneGraph::new();
        let root = g.add_root("root");
        g.set_sub_transform(root, TransformSlot::Base, translation(1.0, 2.0, 3.0));
        g.propagate();
        let m = g.world_transform(root);
        assert_relative_eq!(m[(0, 3)], 1.0);
        assert_relative_eq!(m[(1, 3)], 2.0);
        assert_relative_eq!(m[(2, 3)], 3.0);
        assert_relative_eq!(m[(3, 3)], 1.0);
    }

    #[test]
    fn traverse_is_preorder_in_insertion_order() {
        let mut g = SceneGraph::new();
        let root = g.add_root("root");
        let l = g.add_child(root, "l");
        g.add_child(l, "l0");
        g.add_child(l, "l1");
        let r = g.add_child(root, "r");
        g.add_child(r, "r0");
        assert_eq!(g.names(root), ["root", "l", "l0", "l1", "r", "r0"]);
    }

    #[test]
    fn find_by_name() {
        let (g, _root, a, b) = chain();
        assert_eq!(g.find("a"), Some(a));
        assert_eq!(g.find("b"), Some(b));
        assert_eq!(g.find("missing"), None);
    }

    #[test]
    fn parent_links_and_roots() {
        let (g, root, a, b) = chain();
        assert_eq!(g.roots(), &[root]);
        assert_eq!(g.parent(root), None);
        assert_eq!(g.parent(b), Some(a));
        assert_eq!(g.children(root), &[a]);
        assert_eq!(g.len(), 3);
    }

    #[test]
    fn mesh_and_visibility() {
        let (mut g, root, _, _) = chain();
        assert!(g.node(root).is_visible());
        g.set_visible(root, false);
        g.set_mesh(root, Some(MeshHandle(7)));
        assert!(!g.node(root).is_visible());
        assert_eq!(g.node(root).mesh(), Some(MeshHandle(7)));
    }
}
