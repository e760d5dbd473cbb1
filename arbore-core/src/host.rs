//! Capabilities the AR platform must provide.
//!
//! Camera tracking, surface detection, ray casting and entity hit-testing are
//! owned by the host platform. The core only talks to them through [`ArHost`].

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::event::ScreenPoint;
use crate::node::NodeId;
use crate::scene::Scene;

/// A position and orientation in the session's stabilized world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// World position.
    pub position: Vec3,
    /// World orientation.
    pub rotation: Quat,
}

impl Pose {
    /// Pose at a position with identity orientation.
    #[must_use]
    pub const fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }
}

/// Confidence tier of a detected surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceTier {
    /// Geometry the tracker has committed to; stable across frames.
    ExistingGeometry,
    /// Statistically inferred plane, available before geometry is confirmed.
    EstimatedPlane,
}

/// Surface orientation filter for ray casts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    /// Floors, tables.
    Horizontal,
    /// Walls.
    Vertical,
    /// Either orientation.
    Any,
}

impl Alignment {
    /// Whether a surface with alignment `surface` passes this filter.
    #[must_use]
    pub fn accepts(self, surface: Self) -> bool {
        match self {
            Self::Any => true,
            _ => self == surface,
        }
    }
}

/// Plane detection options for the tracking session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Detect horizontal planes.
    pub horizontal: bool,
    /// Detect vertical planes.
    pub vertical: bool,
}

impl TrackingConfig {
    /// Whether planes of this alignment are being detected.
    #[must_use]
    pub fn detects(&self, alignment: Alignment) -> bool {
        match alignment {
            Alignment::Horizontal => self.horizontal,
            Alignment::Vertical => self.vertical,
            Alignment::Any => self.horizontal || self.vertical,
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            horizontal: true,
            vertical: true,
        }
    }
}

/// The AR platform as seen by the interaction core.
///
/// All queries are synchronous and bounded; none of them may block on I/O.
pub trait ArHost {
    /// (Re)start world tracking with the given plane detection options.
    fn run(&mut self, config: TrackingConfig);

    /// Cast a ray from a screen point against surfaces of one tier.
    fn ray_cast(&self, point: ScreenPoint, tier: SurfaceTier, alignment: Alignment)
        -> Option<Pose>;

    /// Nearest hit-testable node under a screen point.
    fn entity_at(&self, scene: &Scene, point: ScreenPoint) -> Option<NodeId>;

    /// Every hit-testable node under a screen point, nearest first.
    fn hit_test(&self, scene: &Scene, point: ScreenPoint) -> Vec<NodeId>;
}
