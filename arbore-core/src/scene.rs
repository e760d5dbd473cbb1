//! Scene graph for the AR session.
//!
//! Nodes live in an arena keyed by [`NodeId`]. Anchors are the only roots;
//! everything else hangs below an anchor. Deep clones are explicit: a
//! [`ModelTemplate`] is instantiated into fresh nodes with fresh IDs.

use std::collections::HashMap;

use glam::{Mat4, Vec3};

use crate::host::Pose;
use crate::node::{Aabb, ModelTemplate, Node, NodeId, NodeKind, NodeRole, Transform};
use crate::{ArError, ArResult};

/// Upper bound on parent hops when walking towards a root.
///
/// Anchors sit at depth 0, so any chain longer than this indicates a cycle.
const MAX_DEPTH: usize = 256;

/// A scene containing all AR nodes.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    /// All nodes in the scene, indexed by ID.
    nodes: HashMap<NodeId, Node>,
    /// Anchor IDs in insertion order.
    anchors: Vec<NodeId>,
}

impl Scene {
    /// Create a new empty scene.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a world anchor at the given pose.
    pub fn add_anchor(&mut self, pose: &Pose) -> NodeId {
        let id = NodeId::new();
        self.nodes.insert(
            id,
            Node {
                id,
                name: "anchor".to_string(),
                kind: NodeKind::Empty,
                role: NodeRole::Anchor,
                transform: Transform {
                    position: pose.position,
                    rotation: pose.rotation,
                    scale: Vec3::ONE,
                },
                parent: None,
                children: Vec::new(),
                collision: false,
                scale_state: None,
            },
        );
        self.anchors.push(id);
        id
    }

    /// Deep-clone a template under `parent`.
    ///
    /// The root of the new subtree gets `role`; every descendant is
    /// [`NodeRole::Content`] unless `role` is a decoration, in which case the
    /// whole subtree is decoration.
    ///
    /// # Errors
    ///
    /// Returns an error if `parent` is not in the scene.
    pub fn instantiate(
        &mut self,
        template: &ModelTemplate,
        parent: NodeId,
        role: NodeRole,
    ) -> ArResult<NodeId> {
        if !self.nodes.contains_key(&parent) {
            return Err(ArError::NodeNotFound(parent.to_string()));
        }
        let child_role = match role {
            NodeRole::Decoration | NodeRole::Scaffolding => role,
            _ => NodeRole::Content,
        };
        let id = self.insert_tree(template, parent, role, child_role);
        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.push(id);
        }
        Ok(id)
    }

    fn insert_tree(
        &mut self,
        template: &ModelTemplate,
        parent: NodeId,
        role: NodeRole,
        child_role: NodeRole,
    ) -> NodeId {
        let id = NodeId::new();
        let children = template
            .children
            .iter()
            .map(|child| self.insert_tree(child, id, child_role, child_role))
            .collect();
        self.nodes.insert(
            id,
            Node {
                id,
                name: template.name.clone(),
                kind: template.kind.clone(),
                role,
                transform: template.transform,
                parent: Some(parent),
                children,
                collision: false,
                scale_state: None,
            },
        );
        id
    }

    /// Remove a node and its whole subtree.
    ///
    /// # Errors
    ///
    /// Returns an error if the node is not found.
    pub fn remove_subtree(&mut self, id: NodeId) -> ArResult<()> {
        let node = self
            .nodes
            .get(&id)
            .ok_or_else(|| ArError::NodeNotFound(id.to_string()))?;
        if let Some(parent) = node.parent {
            if let Some(p) = self.nodes.get_mut(&parent) {
                p.children.retain(|c| *c != id);
            }
        } else {
            self.anchors.retain(|a| *a != id);
        }
        for n in self.descendants(id) {
            self.nodes.remove(&n);
        }
        Ok(())
    }

    /// Get a node by ID.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Get a mutable reference to a node by ID.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// Check whether a node exists.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// All nodes in the scene.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Anchor nodes in insertion order.
    pub fn anchors(&self) -> impl Iterator<Item = &Node> {
        self.anchors.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the scene is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Parent of a node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    /// Ancestors of a node, nearest first, excluding the node itself.
    #[must_use]
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(p) = current {
            if out.len() >= MAX_DEPTH {
                tracing::warn!("Ancestor walk from {id} exceeded {MAX_DEPTH} levels");
                break;
            }
            out.push(p);
            current = self.parent(p);
        }
        out
    }

    /// The node and all of its descendants, depth first.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            if let Some(node) = self.nodes.get(&n) {
                out.push(n);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    /// Children of `id` with the given name.
    #[must_use]
    pub fn children_named(&self, id: NodeId, name: &str) -> Vec<NodeId> {
        self.nodes
            .get(&id)
            .map(|n| {
                n.children
                    .iter()
                    .filter(|c| self.nodes.get(c).is_some_and(|child| child.name == name))
                    .copied()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// World matrix of a node.
    ///
    /// # Errors
    ///
    /// Returns an error if the node is not found.
    pub fn world_matrix(&self, id: NodeId) -> ArResult<Mat4> {
        let node = self
            .nodes
            .get(&id)
            .ok_or_else(|| ArError::NodeNotFound(id.to_string()))?;
        let local = node.transform.matrix();
        match node.parent {
            Some(parent) => Ok(self.world_matrix(parent)? * local),
            None => Ok(local),
        }
    }

    /// World position of a node.
    ///
    /// # Errors
    ///
    /// Returns an error if the node is not found.
    pub fn world_position(&self, id: NodeId) -> ArResult<Vec3> {
        Ok(self.world_matrix(id)?.transform_point3(Vec3::ZERO))
    }

    /// Move a node so that its origin lands at `position` in world space.
    ///
    /// # Errors
    ///
    /// Returns an error if the node or its parent is not found.
    pub fn set_world_position(&mut self, id: NodeId, position: Vec3) -> ArResult<()> {
        let local = match self.parent(id) {
            Some(parent) => self.world_matrix(parent)?.inverse().transform_point3(position),
            None => position,
        };
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or_else(|| ArError::NodeNotFound(id.to_string()))?;
        node.transform.position = local;
        Ok(())
    }

    /// Accumulated scale of a node relative to world space.
    ///
    /// # Errors
    ///
    /// Returns an error if the node is not found.
    pub fn world_scale(&self, id: NodeId) -> ArResult<Vec3> {
        let node = self
            .nodes
            .get(&id)
            .ok_or_else(|| ArError::NodeNotFound(id.to_string()))?;
        match node.parent {
            Some(parent) => Ok(self.world_scale(parent)? * node.transform.scale),
            None => Ok(node.transform.scale),
        }
    }

    /// Set a node's scale relative to world space.
    ///
    /// # Errors
    ///
    /// Returns an error if the node is not found or a parent has zero scale.
    pub fn set_world_scale(&mut self, id: NodeId, scale: Vec3) -> ArResult<()> {
        let parent_scale = match self.parent(id) {
            Some(parent) => self.world_scale(parent)?,
            None => Vec3::ONE,
        };
        if parent_scale.cmpeq(Vec3::ZERO).any() {
            return Err(ArError::InvalidOperation(format!(
                "cannot scale {id} under a zero-scaled parent"
            )));
        }
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or_else(|| ArError::NodeNotFound(id.to_string()))?;
        node.transform.scale = scale / parent_scale;
        Ok(())
    }

    /// World-space bounds of a single node's own mesh.
    #[must_use]
    pub fn mesh_world_bounds(&self, id: NodeId) -> Option<Aabb> {
        let bounds = self.nodes.get(&id)?.mesh_bounds()?;
        let matrix = self.world_matrix(id).ok()?;
        Some(bounds.transformed(&matrix))
    }

    /// World-space bounds of every mesh in the subtree, decorations excluded.
    #[must_use]
    pub fn visual_bounds(&self, id: NodeId) -> Option<Aabb> {
        self.descendants(id)
            .into_iter()
            .filter(|n| {
                self.nodes
                    .get(n)
                    .is_some_and(|node| node.role != NodeRole::Decoration)
            })
            .filter_map(|n| self.mesh_world_bounds(n))
            .reduce(|a, b| a.union(&b))
    }

    /// Bounds of every mesh in the subtree expressed in `id`'s own frame,
    /// decorations excluded.
    #[must_use]
    pub fn local_visual_bounds(&self, id: NodeId) -> Option<Aabb> {
        let to_local = self.world_matrix(id).ok()?.inverse();
        self.descendants(id)
            .into_iter()
            .filter_map(|n| {
                let node = self.nodes.get(&n)?;
                if node.role == NodeRole::Decoration {
                    return None;
                }
                let bounds = node.mesh_bounds()?;
                let matrix = to_local * self.world_matrix(n).ok()?;
                Some(bounds.transformed(&matrix))
            })
            .reduce(|a, b| a.union(&b))
    }

    /// Mark a node (and optionally its subtree) as hit-testable.
    ///
    /// Decorations are skipped so they can never be picked.
    pub fn generate_collision(&mut self, id: NodeId, recursive: bool) {
        let targets = if recursive {
            self.descendants(id)
        } else {
            vec![id]
        };
        for n in targets {
            if let Some(node) = self.nodes.get_mut(&n) {
                if node.role != NodeRole::Decoration {
                    node.collision = true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Material, MeshShape};
    use crate::primitives;
    use glam::Quat;

    fn anchor_at(scene: &mut Scene, p: Vec3) -> NodeId {
        scene.add_anchor(&Pose::from_position(p))
    }

    #[test]
    fn test_instantiate_creates_independent_clones() {
        let mut scene = Scene::new();
        let anchor = anchor_at(&mut scene, Vec3::ZERO);
        let template = primitives::placeholder_plant();

        let a = scene
            .instantiate(&template, anchor, NodeRole::Placed)
            .expect("instantiate");
        let b = scene
            .instantiate(&template, anchor, NodeRole::Placed)
            .expect("instantiate");

        assert_ne!(a, b);
        assert_eq!(scene.len(), 1 + 2 * template.node_count());
        scene.generate_collision(a, true);
        assert!(scene.descendants(a).iter().all(|n| scene.get(*n).is_some_and(|x| x.collision)));
        assert!(scene.descendants(b).iter().all(|n| scene.get(*n).is_some_and(|x| !x.collision)));
    }

    #[test]
    fn test_instantiate_under_missing_parent_fails() {
        let mut scene = Scene::new();
        let err = scene.instantiate(&primitives::placeholder_plant(), NodeId::new(), NodeRole::Placed);
        assert!(matches!(err, Err(ArError::NodeNotFound(_))));
    }

    #[test]
    fn test_world_position_round_trip_under_rotated_anchor() {
        let mut scene = Scene::new();
        let anchor = scene.add_anchor(&Pose {
            position: Vec3::new(1.0, 0.0, -2.0),
            rotation: Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
        });
        let node = scene
            .instantiate(&ModelTemplate::group("g", vec![]), anchor, NodeRole::Placed)
            .expect("instantiate");

        let target = Vec3::new(3.0, 0.5, -1.0);
        scene.set_world_position(node, target).expect("move");
        let got = scene.world_position(node).expect("position");
        assert!((got - target).length() < 1e-4);
    }

    #[test]
    fn test_world_scale_is_relative_to_world() {
        let mut scene = Scene::new();
        let anchor = anchor_at(&mut scene, Vec3::ZERO);
        let parent = scene
            .instantiate(&ModelTemplate::group("p", vec![]), anchor, NodeRole::Placed)
            .expect("instantiate");
        scene.set_world_scale(parent, Vec3::splat(0.5)).expect("scale");
        let child = scene
            .instantiate(&ModelTemplate::group("c", vec![]), parent, NodeRole::Decoration)
            .expect("instantiate");

        scene.set_world_scale(child, Vec3::splat(2.0)).expect("scale");
        assert!((scene.world_scale(child).expect("scale") - Vec3::splat(2.0)).length() < 1e-6);
        assert!((scene.get(child).expect("child").transform.scale - Vec3::splat(4.0)).length() < 1e-6);
    }

    #[test]
    fn test_visual_bounds_ignores_decorations() {
        let mut scene = Scene::new();
        let anchor = anchor_at(&mut scene, Vec3::ZERO);
        let cube = ModelTemplate::mesh(
            "cube",
            MeshShape::Box { size: Vec3::ONE },
            Material::default(),
        );
        let root = scene
            .instantiate(&cube, anchor, NodeRole::Placed)
            .expect("instantiate");
        let big = ModelTemplate::mesh(
            "selectionBox",
            MeshShape::Box {
                size: Vec3::splat(10.0),
            },
            Material::default(),
        );
        scene
            .instantiate(&big, root, NodeRole::Decoration)
            .expect("instantiate");

        let bounds = scene.visual_bounds(root).expect("bounds");
        assert!((bounds.extents() - Vec3::ONE).length() < 1e-5);
        assert_eq!(scene.children_named(root, "selectionBox").len(), 1);
    }

    #[test]
    fn test_remove_subtree() {
        let mut scene = Scene::new();
        let anchor = anchor_at(&mut scene, Vec3::ZERO);
        let root = scene
            .instantiate(&primitives::placeholder_plant(), anchor, NodeRole::Placed)
            .expect("instantiate");
        scene.remove_subtree(root).expect("remove");
        assert_eq!(scene.len(), 1);
        assert!(scene.get(anchor).is_some_and(|a| a.children.is_empty()));
        assert!(scene.remove_subtree(root).is_err());
    }
}
