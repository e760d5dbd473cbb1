//! Scene nodes - the building blocks of the AR scene.

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::scale::ScaleState;

/// Unique identifier for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(Uuid);

impl NodeId {
    /// Create a new unique node ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What part a node plays in the AR scene.
///
/// Only [`NodeRole::Placed`] nodes are ever registered as user plants;
/// decorations and scaffolding are invisible to selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    /// World anchor holding placed content at a fixed pose.
    Anchor,
    /// Root of a user-placed object.
    Placed,
    /// Sub-node of a placed object (meshes, groups inside a model).
    Content,
    /// Visual decoration such as the selection box.
    Decoration,
    /// Session scaffolding (coaching overlays, plane visualizations).
    Scaffolding,
}

/// Primitive or imported mesh geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum MeshShape {
    /// Axis-aligned box centred on the origin.
    Box {
        /// Edge lengths.
        size: Vec3,
    },
    /// Sphere centred on the origin.
    Sphere {
        /// Radius.
        radius: f32,
    },
    /// Imported triangle geometry, described by its bounds.
    Triangles {
        /// Number of vertices.
        vertex_count: usize,
        /// Local bounding box.
        bounds: Aabb,
    },
}

impl MeshShape {
    /// Bounding box of the shape in its own space.
    #[must_use]
    pub fn local_bounds(&self) -> Aabb {
        match self {
            Self::Box { size } => Aabb::from_center_extents(Vec3::ZERO, *size),
            Self::Sphere { radius } => Aabb::from_center_extents(Vec3::ZERO, Vec3::splat(radius * 2.0)),
            Self::Triangles { bounds, .. } => *bounds,
        }
    }
}

/// Surface material.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Linear RGBA colour.
    pub color: [f32; 4],
    /// Whether the material ignores scene lighting.
    pub unlit: bool,
    /// Whether the material is metallic.
    pub metallic: bool,
}

impl Material {
    /// Opaque lit material.
    #[must_use]
    pub const fn simple(r: f32, g: f32, b: f32) -> Self {
        Self {
            color: [r, g, b, 1.0],
            unlit: false,
            metallic: false,
        }
    }

    /// Unlit material with transparency.
    #[must_use]
    pub const fn unlit(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self {
            color: [r, g, b, a],
            unlit: true,
            metallic: false,
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::simple(0.8, 0.8, 0.8)
    }
}

/// The renderable content of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum NodeKind {
    /// Transform-only node (groups, anchors).
    Empty,
    /// A mesh with materials.
    Model {
        /// Geometry.
        mesh: MeshShape,
        /// Materials, one per primitive.
        materials: Vec<Material>,
    },
}

/// Local transform of a node relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Translation.
    pub position: Vec3,
    /// Orientation.
    pub rotation: Quat,
    /// Non-uniform scale.
    pub scale: Vec3,
}

impl Transform {
    /// Identity transform.
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Identity rotation and scale at the given position.
    #[must_use]
    pub const fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }

    /// Affine matrix of this transform.
    #[must_use]
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl Aabb {
    /// Box from explicit corners.
    #[must_use]
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: max.max(min),
        }
    }

    /// Box centred on `center` with full edge lengths `extents`.
    #[must_use]
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        let half = extents.abs() * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Full edge lengths.
    #[must_use]
    pub fn extents(&self) -> Vec3 {
        self.max - self.min
    }

    /// Centre point.
    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Smallest box containing both.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Bounds of this box after an affine transform.
    #[must_use]
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        let corners = [
            Vec3::new(self.min.x, self.min.y, self.min.z),
            Vec3::new(self.max.x, self.min.y, self.min.z),
            Vec3::new(self.min.x, self.max.y, self.min.z),
            Vec3::new(self.max.x, self.max.y, self.min.z),
            Vec3::new(self.min.x, self.min.y, self.max.z),
            Vec3::new(self.max.x, self.min.y, self.max.z),
            Vec3::new(self.min.x, self.max.y, self.max.z),
            Vec3::new(self.max.x, self.max.y, self.max.z),
        ];
        let first = matrix.transform_point3(corners[0]);
        let (min, max) = corners[1..]
            .iter()
            .map(|c| matrix.transform_point3(*c))
            .fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p)));
        Self { min, max }
    }

    /// Distance along the ray to the first intersection, if any.
    ///
    /// `direction` does not need to be normalized; the result is in units of
    /// `direction`. A ray starting inside the box hits at `0.0`.
    #[must_use]
    pub fn ray_intersection(&self, origin: Vec3, direction: Vec3) -> Option<f32> {
        let inv = direction.recip();
        let t1 = (self.min - origin) * inv;
        let t2 = (self.max - origin) * inv;
        let t_near = t1.min(t2).max_element();
        let t_far = t1.max(t2).min_element();
        if t_near.is_nan() || t_far.is_nan() || t_far < t_near.max(0.0) {
            return None;
        }
        Some(t_near.max(0.0))
    }
}

/// A node in the scene arena.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier.
    pub id: NodeId,
    /// Debug name (`selectionBox`, `trunk`, mesh names from the model file).
    pub name: String,
    /// Renderable content.
    pub kind: NodeKind,
    /// Role in the AR scene.
    pub role: NodeRole,
    /// Local transform relative to the parent.
    pub transform: Transform,
    /// Parent node, `None` for anchors.
    pub parent: Option<NodeId>,
    /// Children in insertion order.
    pub children: Vec<NodeId>,
    /// Whether collision geometry has been generated (hit-testable).
    pub collision: bool,
    /// Double-tap/pinch scale bookkeeping for placed roots.
    pub scale_state: Option<ScaleState>,
}

impl Node {
    /// Local bounds of this node's own mesh, if it has one.
    #[must_use]
    pub fn mesh_bounds(&self) -> Option<Aabb> {
        match &self.kind {
            NodeKind::Model { mesh, .. } => Some(mesh.local_bounds()),
            NodeKind::Empty => None,
        }
    }
}

/// A detached node tree that can be instantiated into a scene any number of times.
///
/// Templates are plain data and `Send`, so they can be produced by background
/// loaders and handed to the session owner for insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelTemplate {
    /// Node name.
    pub name: String,
    /// Renderable content.
    pub kind: NodeKind,
    /// Local transform.
    pub transform: Transform,
    /// Child templates.
    pub children: Vec<ModelTemplate>,
}

impl ModelTemplate {
    /// Empty group node.
    #[must_use]
    pub fn group(name: impl Into<String>, children: Vec<ModelTemplate>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Empty,
            transform: Transform::IDENTITY,
            children,
        }
    }

    /// Mesh node with a single material.
    #[must_use]
    pub fn mesh(name: impl Into<String>, mesh: MeshShape, material: Material) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Model {
                mesh,
                materials: vec![material],
            },
            transform: Transform::IDENTITY,
            children: Vec::new(),
        }
    }

    /// Set the local position.
    #[must_use]
    pub fn at(mut self, position: Vec3) -> Self {
        self.transform.position = position;
        self
    }

    /// Total number of nodes in this tree.
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Self::node_count).sum::<usize>()
    }

    /// Whether any node in the tree carries a mesh.
    #[must_use]
    pub fn has_mesh(&self) -> bool {
        matches!(self.kind, NodeKind::Model { .. }) || self.children.iter().any(Self::has_mesh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_transformed_by_scale_and_translation() {
        let aabb = Aabb::from_center_extents(Vec3::ZERO, Vec3::ONE);
        let m = Mat4::from_scale_rotation_translation(
            Vec3::splat(2.0),
            Quat::IDENTITY,
            Vec3::new(1.0, 0.0, 0.0),
        );
        let t = aabb.transformed(&m);
        assert!((t.extents() - Vec3::splat(2.0)).length() < 1e-5);
        assert!((t.center() - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_ray_hits_box_in_front() {
        let aabb = Aabb::from_center_extents(Vec3::new(0.0, 0.0, -5.0), Vec3::ONE);
        let t = aabb
            .ray_intersection(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0))
            .expect("should hit");
        assert!((t - 4.5).abs() < 1e-5);
    }

    #[test]
    fn test_ray_misses_box_behind() {
        let aabb = Aabb::from_center_extents(Vec3::new(0.0, 0.0, 5.0), Vec3::ONE);
        assert!(aabb
            .ray_intersection(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0))
            .is_none());
    }

    #[test]
    fn test_template_counts() {
        let t = ModelTemplate::group(
            "root",
            vec![
                ModelTemplate::mesh("a", MeshShape::Sphere { radius: 1.0 }, Material::default()),
                ModelTemplate::group("b", vec![]),
            ],
        );
        assert_eq!(t.node_count(), 3);
        assert!(t.has_mesh());
        assert!(!ModelTemplate::group("empty", vec![]).has_mesh());
    }
}
