//! Active selection and its visual indicator.
//!
//! At most one placed object is selected. Selecting another object moves the
//! indicator; there is no transition back to [`Selection::Idle`].

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::node::{NodeId, NodeRole};
use crate::primitives::{self, SELECTION_BOX_NAME};
use crate::scene::Scene;
use crate::{ArError, ArResult};

/// Sizing rules for the selection indicator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectionStyle {
    /// Multiplier applied to the object's visual extents.
    pub margin: f32,
    /// Minimum edge length in world units, so tiny objects stay visible.
    pub min_edge: f32,
}

impl Default for SelectionStyle {
    fn default() -> Self {
        Self {
            margin: 1.2,
            min_edge: 0.05,
        }
    }
}

impl SelectionStyle {
    /// Edge lengths of the indicator for an object of `extents`, both
    /// measured at world scale along the object's own axes.
    #[must_use]
    pub fn indicator_size(&self, extents: Vec3) -> Vec3 {
        (extents * self.margin).max(Vec3::splat(self.min_edge))
    }
}

/// Selection state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Selection {
    /// Nothing selected yet.
    #[default]
    Idle,
    /// One placed object is active.
    Selected {
        /// The selected placed root.
        node: NodeId,
        /// Its indicator decoration.
        indicator: NodeId,
    },
}

impl Selection {
    /// The selected object, if any.
    #[must_use]
    pub const fn selected(&self) -> Option<NodeId> {
        match self {
            Self::Idle => None,
            Self::Selected { node, .. } => Some(*node),
        }
    }

    /// The indicator node, if any.
    #[must_use]
    pub const fn indicator(&self) -> Option<NodeId> {
        match self {
            Self::Idle => None,
            Self::Selected { indicator, .. } => Some(*indicator),
        }
    }

    /// Make `node` the active object.
    ///
    /// Removes the indicator from the previous selection first, then attaches
    /// a new indicator as a child of `node` sized to its visual bounds in the
    /// node's own frame, so it follows the object's orientation.
    ///
    /// # Errors
    ///
    /// Returns an error if `node` is not in the scene.
    pub fn select(&mut self, scene: &mut Scene, node: NodeId, style: &SelectionStyle) -> ArResult<NodeId> {
        if !scene.contains(node) {
            return Err(ArError::NodeNotFound(node.to_string()));
        }

        if let Self::Selected { node: previous, .. } = *self {
            for decoration in scene.children_named(previous, SELECTION_BOX_NAME) {
                scene.remove_subtree(decoration)?;
            }
        }
        *self = Self::Idle;

        let (local_center, local_extents) = scene
            .local_visual_bounds(node)
            .map_or((Vec3::ZERO, Vec3::ZERO), |b| (b.center(), b.extents()));

        let world_scale = scene.world_scale(node)?.abs();
        let local_size = if world_scale.cmpeq(Vec3::ZERO).any() {
            style.indicator_size(local_extents)
        } else {
            style.indicator_size(local_extents * world_scale) / world_scale
        };
        let size = local_size * world_scale;

        let template = primitives::selection_box(local_size).at(local_center);
        let indicator = scene.instantiate(&template, node, NodeRole::Decoration)?;

        tracing::info!(
            "Selected {node} with indicator {:.3}x{:.3}x{:.3}",
            size.x,
            size.y,
            size.z
        );
        *self = Self::Selected { node, indicator };
        Ok(indicator)
    }
}
