//! Geometric stand-in for an AR platform.
//!
//! A pinhole camera looks into a world made of a handful of detected planes.
//! Ray casts intersect those planes; entity hit-tests intersect the world
//! bounding boxes of collidable scene nodes. Good enough to drive the whole
//! interaction core from tests and scripted scenarios without a device.

use glam::{EulerRot, Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::event::ScreenPoint;
use crate::host::{Alignment, ArHost, Pose, SurfaceTier, TrackingConfig};
use crate::node::NodeId;
use crate::scene::Scene;

/// Pinhole camera with yaw/pitch orientation.
///
/// With zero yaw and pitch the camera looks down `-Z` with `+Y` up. Screen
/// coordinates grow right and down from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Camera {
    /// Camera position in world space.
    pub position: Vec3,
    /// Rotation about +Y, radians.
    pub yaw: f32,
    /// Rotation about the camera's X axis, radians (negative looks down).
    pub pitch: f32,
    /// Vertical field of view, degrees.
    pub fov_y_degrees: f32,
    /// Viewport width in points.
    pub width: f32,
    /// Viewport height in points.
    pub height: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 1.5, 0.0),
            yaw: 0.0,
            pitch: -0.6,
            fov_y_degrees: 60.0,
            width: 390.0,
            height: 844.0,
        }
    }
}

impl Camera {
    /// Camera orientation.
    #[must_use]
    pub fn rotation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0)
    }

    fn tan_half_fov(&self) -> f32 {
        (self.fov_y_degrees.to_radians() * 0.5).tan()
    }

    fn aspect(&self) -> f32 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }

    /// World-space ray through a screen point: origin and unit direction.
    #[must_use]
    pub fn ray(&self, point: ScreenPoint) -> (Vec3, Vec3) {
        let nx = 2.0 * point.x / self.width.max(1.0) - 1.0;
        let ny = 1.0 - 2.0 * point.y / self.height.max(1.0);
        let t = self.tan_half_fov();
        let local = Vec3::new(nx * t * self.aspect(), ny * t, -1.0);
        (self.position, (self.rotation() * local).normalize())
    }

    /// Screen point a world position projects to, if it is in front of the camera.
    #[must_use]
    pub fn project(&self, world: Vec3) -> Option<ScreenPoint> {
        let p = self.rotation().inverse() * (world - self.position);
        if p.z >= -f32::EPSILON {
            return None;
        }
        let t = self.tan_half_fov();
        let nx = p.x / -p.z / (t * self.aspect());
        let ny = p.y / -p.z / t;
        Some(ScreenPoint::new(
            (nx + 1.0) * 0.5 * self.width,
            (1.0 - ny) * 0.5 * self.height,
        ))
    }
}

/// A surface the simulated tracker has found.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectedPlane {
    /// Confidence tier.
    pub tier: SurfaceTier,
    /// Orientation class.
    pub alignment: Alignment,
    /// A point on the plane.
    pub center: Vec3,
    /// Plane normal.
    pub normal: Vec3,
    /// Half extents in the plane; `None` means unbounded.
    #[serde(default)]
    pub half_extents: Option<Vec2>,
}

impl DetectedPlane {
    /// Bounded horizontal floor or table top.
    #[must_use]
    pub fn horizontal(tier: SurfaceTier, height: f32, half_extents: Option<Vec2>) -> Self {
        Self {
            tier,
            alignment: Alignment::Horizontal,
            center: Vec3::new(0.0, height, 0.0),
            normal: Vec3::Y,
            half_extents,
        }
    }

    /// Vertical wall facing `normal`.
    #[must_use]
    pub fn vertical(tier: SurfaceTier, center: Vec3, normal: Vec3) -> Self {
        Self {
            tier,
            alignment: Alignment::Vertical,
            center,
            normal,
            half_extents: None,
        }
    }

    /// Distance along the ray to the plane, within its extents.
    #[must_use]
    pub fn intersect(&self, origin: Vec3, direction: Vec3) -> Option<f32> {
        let normal = self.normal.normalize_or_zero();
        let denom = direction.dot(normal);
        if denom.abs() < 1e-6 {
            return None;
        }
        let t = (self.center - origin).dot(normal) / denom;
        if t < 0.0 {
            return None;
        }
        if let Some(half) = self.half_extents {
            let up = if normal.y.abs() > 0.9 { Vec3::Z } else { Vec3::Y };
            let u = up.cross(normal).normalize();
            let v = normal.cross(u);
            let d = origin + direction * t - self.center;
            if d.dot(u).abs() > half.x || d.dot(v).abs() > half.y {
                return None;
            }
        }
        Some(t)
    }
}

/// In-process [`ArHost`] built from a camera and a list of planes.
#[derive(Debug, Clone, Default)]
pub struct SimulatedHost {
    camera: Camera,
    planes: Vec<DetectedPlane>,
    tracking: Option<TrackingConfig>,
    runs: usize,
}

impl SimulatedHost {
    /// Create a host with the given camera and no planes.
    #[must_use]
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            ..Self::default()
        }
    }

    /// Add a detected plane (builder style).
    #[must_use]
    pub fn with_plane(mut self, plane: DetectedPlane) -> Self {
        self.planes.push(plane);
        self
    }

    /// Add a detected plane.
    pub fn add_plane(&mut self, plane: DetectedPlane) {
        self.planes.push(plane);
    }

    /// The camera.
    #[must_use]
    pub const fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Move the camera.
    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
    }

    /// Current tracking configuration, `None` before the first run.
    #[must_use]
    pub const fn tracking(&self) -> Option<TrackingConfig> {
        self.tracking
    }

    /// How many times tracking has been (re)started.
    #[must_use]
    pub const fn run_count(&self) -> usize {
        self.runs
    }

    fn ranked_hits(&self, scene: &Scene, point: ScreenPoint) -> Vec<(f32, NodeId)> {
        let (origin, direction) = self.camera.ray(point);
        let mut hits: Vec<(f32, NodeId)> = scene
            .nodes()
            .filter(|n| n.collision)
            .filter_map(|n| {
                let bounds = scene.mesh_world_bounds(n.id)?;
                bounds.ray_intersection(origin, direction).map(|t| (t, n.id))
            })
            .collect();
        hits.sort_by(|a, b| a.0.total_cmp(&b.0));
        hits
    }
}

impl ArHost for SimulatedHost {
    fn run(&mut self, config: TrackingConfig) {
        tracing::info!(
            "Tracking started (horizontal: {}, vertical: {})",
            config.horizontal,
            config.vertical
        );
        self.tracking = Some(config);
        self.runs += 1;
    }

    fn ray_cast(&self, point: ScreenPoint, tier: SurfaceTier, alignment: Alignment) -> Option<Pose> {
        let config = self.tracking?;
        let (origin, direction) = self.camera.ray(point);
        self.planes
            .iter()
            .filter(|p| p.tier == tier && alignment.accepts(p.alignment) && config.detects(p.alignment))
            .filter_map(|p| p.intersect(origin, direction).map(|t| (t, p)))
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(t, plane)| Pose {
                position: origin + direction * t,
                rotation: Quat::from_rotation_arc(Vec3::Y, plane.normal.normalize_or_zero()),
            })
    }

    fn entity_at(&self, scene: &Scene, point: ScreenPoint) -> Option<NodeId> {
        self.ranked_hits(scene, point).first().map(|(_, id)| *id)
    }

    fn hit_test(&self, scene: &Scene, point: ScreenPoint) -> Vec<NodeId> {
        self.ranked_hits(scene, point).into_iter().map(|(_, id)| id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeRole;
    use crate::primitives;

    fn looking_down() -> Camera {
        Camera {
            position: Vec3::new(0.0, 2.0, 0.0),
            pitch: -std::f32::consts::FRAC_PI_2,
            ..Camera::default()
        }
    }

    #[test]
    fn test_center_ray_hits_floor_below() {
        let mut host = SimulatedHost::new(looking_down())
            .with_plane(DetectedPlane::horizontal(SurfaceTier::EstimatedPlane, 0.0, None));
        host.run(TrackingConfig::default());
        let center = ScreenPoint::new(195.0, 422.0);
        let pose = host
            .ray_cast(center, SurfaceTier::EstimatedPlane, Alignment::Any)
            .expect("floor hit");
        assert!(pose.position.length() < 1e-3);
    }

    #[test]
    fn test_no_hits_before_tracking_runs() {
        let host = SimulatedHost::new(looking_down())
            .with_plane(DetectedPlane::horizontal(SurfaceTier::EstimatedPlane, 0.0, None));
        assert!(host
            .ray_cast(ScreenPoint::new(195.0, 422.0), SurfaceTier::EstimatedPlane, Alignment::Any)
            .is_none());
    }

    #[test]
    fn test_bounded_plane_misses_outside_extents() {
        let plane = DetectedPlane::horizontal(SurfaceTier::ExistingGeometry, 0.0, Some(Vec2::splat(0.5)));
        assert!(plane.intersect(Vec3::new(0.0, 1.0, 0.0), -Vec3::Y).is_some());
        assert!(plane.intersect(Vec3::new(2.0, 1.0, 0.0), -Vec3::Y).is_none());
    }

    #[test]
    fn test_project_and_ray_agree() {
        let camera = Camera::default();
        let target = Vec3::new(0.3, 0.0, -2.0);
        let screen = camera.project(target).expect("in front");
        let (origin, dir) = camera.ray(screen);
        let to_target = (target - origin).normalize();
        assert!(dir.dot(to_target) > 0.9999);
    }

    #[test]
    fn test_hit_test_orders_by_distance_and_skips_non_collidable() {
        let mut scene = Scene::new();
        let near_anchor = scene.add_anchor(&Pose::from_position(Vec3::new(0.0, 1.0, 0.0)));
        let far_anchor = scene.add_anchor(&Pose::from_position(Vec3::ZERO));
        let ghost_anchor = scene.add_anchor(&Pose::from_position(Vec3::new(0.0, 1.5, 0.0)));
        let cube = primitives::box_mesh("cube", Vec3::splat(0.2), crate::node::Material::default());
        let near = scene.instantiate(&cube, near_anchor, NodeRole::Placed).expect("near");
        let far = scene.instantiate(&cube, far_anchor, NodeRole::Placed).expect("far");
        scene.instantiate(&cube, ghost_anchor, NodeRole::Placed).expect("ghost");
        scene.generate_collision(near, true);
        scene.generate_collision(far, true);

        let host = SimulatedHost::new(looking_down());
        let center = ScreenPoint::new(195.0, 422.0);
        assert_eq!(host.hit_test(&scene, center), vec![near, far]);
        assert_eq!(host.entity_at(&scene, center), Some(near));
    }
}
