//! Screen point to world pose resolution.
//!
//! Confirmed geometry is tried before estimated planes: it does not drift as
//! tracking refines, while estimated planes let placement work on the very
//! first frames. Which tiers and alignments are probed is configurable per
//! feature.

use serde::{Deserialize, Serialize};

use crate::event::ScreenPoint;
use crate::host::{Alignment, ArHost, Pose, SurfaceTier};

/// One ray-cast attempt: a surface tier and an orientation filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceQuery {
    /// Surface confidence tier.
    pub tier: SurfaceTier,
    /// Orientation filter.
    pub alignment: Alignment,
}

impl SurfaceQuery {
    /// Create a query.
    #[must_use]
    pub const fn new(tier: SurfaceTier, alignment: Alignment) -> Self {
        Self { tier, alignment }
    }
}

/// Ordered list of ray-cast attempts; the first hit wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceProbe {
    queries: Vec<SurfaceQuery>,
}

impl SurfaceProbe {
    /// Probe with explicit queries, tried in order.
    #[must_use]
    pub fn new(queries: Vec<SurfaceQuery>) -> Self {
        Self { queries }
    }

    /// Confirmed geometry then estimated planes, both alignments.
    #[must_use]
    pub fn any_surface() -> Self {
        Self::new(vec![
            SurfaceQuery::new(SurfaceTier::ExistingGeometry, Alignment::Any),
            SurfaceQuery::new(SurfaceTier::EstimatedPlane, Alignment::Any),
        ])
    }

    /// Estimated horizontal planes only ("place on tables and floors").
    #[must_use]
    pub fn horizontal_estimate() -> Self {
        Self::new(vec![SurfaceQuery::new(
            SurfaceTier::EstimatedPlane,
            Alignment::Horizontal,
        )])
    }

    /// Queries in the order they are tried.
    #[must_use]
    pub fn queries(&self) -> &[SurfaceQuery] {
        &self.queries
    }
}

/// Per-feature probe configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Probe used when placing a new object.
    pub placement: SurfaceProbe,
    /// Probe used while dragging the selected object.
    pub drag: SurfaceProbe,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            placement: SurfaceProbe::any_surface(),
            drag: SurfaceProbe::horizontal_estimate(),
        }
    }
}

/// Resolves screen points to world poses through the host's ray casts.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoseResolver;

impl PoseResolver {
    /// First pose produced by the probe's queries, or `None` when no surface
    /// lies under the point.
    ///
    /// `None` is a soft miss: callers skip the action without surfacing an
    /// error.
    pub fn resolve(host: &dyn ArHost, point: ScreenPoint, probe: &SurfaceProbe) -> Option<Pose> {
        for query in probe.queries() {
            if let Some(pose) = host.ray_cast(point, query.tier, query.alignment) {
                tracing::trace!(
                    "Resolved ({}, {}) via {:?}/{:?}",
                    point.x,
                    point.y,
                    query.tier,
                    query.alignment
                );
                return Some(pose);
            }
        }
        tracing::debug!("No surface under ({}, {})", point.x, point.y);
        None
    }
}
