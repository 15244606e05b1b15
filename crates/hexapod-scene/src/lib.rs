//! Transform scene graph for the hexapod rig.
//!
//! Every node carries four named sub-transforms that different subsystems
//! own:
//!
//! ```text
//! local = base × gait × ik × user
//!          │      │     │     └── input / body yaw
//!          │      │     └──────── leg solver joint rotation
//!          │      └────────────── gait swing offset
//!          └───────────────────── static placement
//! ```
//!
//! Nodes live in an arena owned by [`SceneGraph`] and are referenced by
//! [`NodeId`]. A node is created directly under its parent, so the structure
//! is always a forest: no node can be attached twice and no cycle can form.

pub mod graph;
pub mod node;

pub use graph::{NodeId, SceneGraph};
pub use node::{LocalTransforms, MeshHandle, TransformNode, TransformSlot};

use nalgebra::{Isometry3, Vector3};

/// Pure translation.
pub fn translation(x: f32, y: f32, z: f32) -> Isometry3<f32> {
    Isometry3::translation(x, y, z)
}

/// Rotation about the local x axis (radians).
pub fn rotation_x(angle: f32) -> Isometry3<f32> {
    Isometry3::rotation(Vector3::x() * angle)
}

/// Rotation about the local y (vertical) axis (radians).
pub fn rotation_y(angle: f32) -> Isometry3<f32> {
    Isometry3::rotation(Vector3::y() * angle)
}
