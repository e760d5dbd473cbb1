//! Registry of user-placed objects.
//!
//! Hit-tests return whatever sub-mesh was under the finger; the registry maps
//! that back to the placed root. Every node inside a placed model is indexed
//! when the model is registered, so the lookup is a single map probe. Nodes
//! attached later fall back to a short ancestor walk.

use std::collections::HashMap;

use crate::node::{NodeId, NodeRole};
use crate::scene::Scene;

/// Parent hops tried for nodes that were not indexed at registration.
pub const MAX_ANCESTOR_WALK: usize = 16;

/// Ordered set of placed roots plus a reverse index from sub-nodes.
#[derive(Debug, Clone, Default)]
pub struct PlacedRegistry {
    /// Placed roots in placement order.
    roots: Vec<NodeId>,
    /// Every indexed node to its placed root.
    owner: HashMap<NodeId, NodeId>,
}

impl PlacedRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly placed root and index its current subtree.
    ///
    /// Decorations inside the subtree are never indexed.
    pub fn register(&mut self, scene: &Scene, root: NodeId) {
        if self.owner.get(&root) == Some(&root) {
            return;
        }
        self.roots.push(root);
        for node in scene.descendants(root) {
            if scene
                .get(node)
                .is_some_and(|n| n.role != NodeRole::Decoration)
            {
                self.owner.insert(node, root);
            }
        }
    }

    /// Whether `id` is a registered root.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.owner.get(&id) == Some(&id)
    }

    /// The placed root that owns `node`, if any.
    #[must_use]
    pub fn root_of(&self, scene: &Scene, node: NodeId) -> Option<NodeId> {
        if let Some(root) = self.owner.get(&node) {
            return Some(*root);
        }
        if !scene
            .get(node)
            .is_some_and(|n| n.role != NodeRole::Decoration)
        {
            return None;
        }
        scene
            .ancestors(node)
            .into_iter()
            .take(MAX_ANCESTOR_WALK)
            .find_map(|a| self.owner.get(&a).copied())
    }

    /// Placed roots in placement order.
    #[must_use]
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Number of placed objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// Whether nothing has been placed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}
