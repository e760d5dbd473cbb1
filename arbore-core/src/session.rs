//! The placement session.
//!
//! [`PlacementSession`] owns everything the AR interaction mutates: the
//! scene, the placed-object registry, the selection, the asset cache and the
//! in-flight load bookkeeping. It is driven from one thread. Loads that need
//! I/O leave the session as [`LoadRequest`]s and come back as
//! [`LoadCompletion`]s through [`PlacementSession::complete_load`].
//!
//! ```text
//! gesture ──► GestureInterpreter ──► Intent ──► apply ──► Outcome
//!                                               │
//!                       cache miss ─────────────┘──► LoadRequest ──► loader task
//!                                                                       │
//!                    complete_load ◄── LoadCompletion ◄── channel ◄─────┘
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::cache::AssetCache;
use crate::event::{Gesture, InputEvent};
use crate::host::{ArHost, Pose, TrackingConfig};
use crate::interpreter::{GestureInterpreter, Intent};
use crate::node::{ModelTemplate, NodeId, NodeRole};
use crate::placement::ProbeConfig;
use crate::primitives;
use crate::recognizer::{GestureRecognizer, RecognizerConfig};
use crate::registry::PlacedRegistry;
use crate::scale::{ScaleRegime, ScaleState};
use crate::scene::Scene;
use crate::selection::{Selection, SelectionStyle};
use crate::source::{LoadCompletion, LoadRequest, LoadResult, LoadToken, ModelSource};
use crate::{ArError, ArResult};

/// Uniform scale given to freshly loaded models.
pub const DEFAULT_INITIAL_SCALE: f32 = 0.01;

/// Session configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Model placed by a tap on an empty surface.
    pub model_source: ModelSource,
    /// Surface probes for placement and dragging.
    pub probes: ProbeConfig,
    /// Pinch clamp range.
    pub regime: ScaleRegime,
    /// Selection indicator sizing.
    pub selection: SelectionStyle,
    /// Uniform scale of newly loaded models.
    pub initial_scale: f32,
    /// Plane detection options.
    pub tracking: TrackingConfig,
    /// Raw touch recognition timings.
    pub recognizer: RecognizerConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            model_source: ModelSource::Fallback,
            probes: ProbeConfig::default(),
            regime: ScaleRegime::default(),
            selection: SelectionStyle::default(),
            initial_scale: DEFAULT_INITIAL_SCALE,
            tracking: TrackingConfig::default(),
            recognizer: RecognizerConfig::default(),
        }
    }
}

/// Result of applying one intent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// A new object is in the scene.
    Placed {
        /// Placed root.
        node: NodeId,
        /// Whether it is the placeholder plant.
        placeholder: bool,
    },
    /// The model must be loaded first; hand the request to a loader.
    LoadRequested {
        /// Token of the request.
        token: LoadToken,
        /// Source to load.
        source: String,
    },
    /// Selection moved to a placed object.
    Selected {
        /// Selected root.
        node: NodeId,
    },
    /// Dragging started.
    DragStarted {
        /// Dragged root.
        node: NodeId,
    },
    /// The selection moved.
    Moved {
        /// Moved root.
        node: NodeId,
        /// New world position.
        position: Vec3,
    },
    /// Dragging stopped.
    DragEnded,
    /// The selection or a tapped object changed scale.
    Scaled {
        /// Scaled root.
        node: NodeId,
        /// New uniform world scale.
        scale: f32,
    },
    /// Nothing happened.
    Ignored {
        /// Why.
        reason: String,
    },
}

impl Outcome {
    fn ignored(reason: impl Into<String>) -> Self {
        Self::Ignored {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct DragState {
    node: NodeId,
    offset: Vec3,
}

#[derive(Debug, Clone)]
struct PendingLoad {
    pose: Pose,
    source: ModelSource,
}

/// Snapshot of one placed object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedSummary {
    /// Placed root.
    pub id: NodeId,
    /// Root node name.
    pub name: String,
    /// World position.
    pub position: Vec3,
    /// Uniform world scale (x component).
    pub scale: f32,
    /// Whether it is the active selection.
    pub selected: bool,
    /// Whether it is the placeholder plant.
    pub placeholder: bool,
}

/// Serializable snapshot of the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Placed objects in placement order.
    pub placed: Vec<PlacedSummary>,
    /// Cache key of the cached model.
    pub cached_source: Option<String>,
    /// Loads still in flight.
    pub pending_loads: usize,
}

impl SessionSummary {
    /// Pretty JSON rendering.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> ArResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// AR placement and manipulation state for one session.
#[derive(Debug)]
pub struct PlacementSession {
    config: SessionConfig,
    scene: Scene,
    registry: PlacedRegistry,
    selection: Selection,
    cache: AssetCache,
    recognizer: GestureRecognizer,
    drag: Option<DragState>,
    pending: HashMap<LoadToken, PendingLoad>,
    placeholders: HashSet<NodeId>,
}

impl Default for PlacementSession {
    fn default() -> Self {
        Self::new()
    }
}

impl PlacementSession {
    /// Session with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    /// Session with custom configuration.
    #[must_use]
    pub fn with_config(config: SessionConfig) -> Self {
        Self {
            recognizer: GestureRecognizer::with_config(config.recognizer),
            config,
            scene: Scene::new(),
            registry: PlacedRegistry::new(),
            selection: Selection::Idle,
            cache: AssetCache::new(),
            drag: None,
            pending: HashMap::new(),
            placeholders: HashSet::new(),
        }
    }

    /// Start tracking on the host with the configured plane detection.
    pub fn start(&self, host: &mut dyn ArHost) {
        host.run(self.config.tracking);
    }

    /// Configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Change the model placed by subsequent taps.
    pub fn set_model_source(&mut self, source: ModelSource) {
        tracing::info!("Model source set to {source}");
        self.config.model_source = source;
    }

    /// The scene.
    #[must_use]
    pub const fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Placed-object registry.
    #[must_use]
    pub const fn registry(&self) -> &PlacedRegistry {
        &self.registry
    }

    /// Current selection.
    #[must_use]
    pub const fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Asset cache.
    #[must_use]
    pub const fn cache(&self) -> &AssetCache {
        &self.cache
    }

    /// Whether a drag is in progress.
    #[must_use]
    pub const fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Number of loads awaiting completion.
    #[must_use]
    pub fn pending_loads(&self) -> usize {
        self.pending.len()
    }

    /// Whether `node` is a placeholder plant.
    #[must_use]
    pub fn is_placeholder(&self, node: NodeId) -> bool {
        self.placeholders.contains(&node)
    }

    /// Feed raw input. Touch events go through the gesture recognizer first.
    pub fn handle_input(&mut self, host: &dyn ArHost, event: &InputEvent) -> Vec<Outcome> {
        let gestures = match event {
            InputEvent::Touch(touch) => self.recognizer.process(touch),
            InputEvent::Gesture(gesture) => vec![*gesture],
        };
        gestures
            .iter()
            .map(|g| self.handle_gesture(host, g))
            .collect()
    }

    /// Advance recognizer time, flushing timed-out taps and long presses.
    pub fn poll(&mut self, host: &dyn ArHost, now_ms: u64) -> Vec<Outcome> {
        let gestures = self.recognizer.poll(now_ms);
        gestures
            .iter()
            .map(|g| self.handle_gesture(host, g))
            .collect()
    }

    /// Interpret and apply one recognized gesture.
    pub fn handle_gesture(&mut self, host: &dyn ArHost, gesture: &Gesture) -> Outcome {
        let intent = GestureInterpreter::interpret(self, host, gesture);
        self.apply(intent)
    }

    /// Apply an intent.
    ///
    /// Failures are logged and reported as [`Outcome::Ignored`]; nothing
    /// escapes as an error.
    pub fn apply(&mut self, intent: Intent) -> Outcome {
        let result = match intent {
            Intent::Place { pose } => Ok(self.place_at(pose)),
            Intent::Select { node } => self.select(node),
            Intent::BeginDrag { pose } => self.begin_drag(pose),
            Intent::Drag { pose } => self.drag_to(pose),
            Intent::EndDrag => {
                self.drag = None;
                Ok(Outcome::DragEnded)
            }
            Intent::Scale { factor } => self.pinch(factor),
            Intent::CycleScale { node } => self.cycle_scale(node),
            Intent::Ignore { reason } => {
                tracing::debug!("Gesture ignored: {reason}");
                Ok(Outcome::ignored(reason))
            }
        };
        result.unwrap_or_else(|e| {
            tracing::warn!("Gesture dropped: {e}");
            Outcome::ignored(e.to_string())
        })
    }

    /// Place the configured model at `pose`.
    ///
    /// The placeholder and cached models are inserted immediately. Anything
    /// else becomes a [`LoadRequest`]; the object appears once the matching
    /// completion is passed to [`Self::complete_load`].
    pub fn place_at(&mut self, pose: Pose) -> Outcome {
        let source = self.config.model_source.clone();
        if !source.needs_io() {
            return self.insert_placeholder(pose);
        }
        if let Some(template) = self.cache.lookup(&source) {
            tracing::debug!("Cache hit for {source}");
            return self.insert_loaded(&template, pose);
        }
        let token = self.cache.issue_token();
        tracing::info!("Loading {source} ({token})");
        self.pending.insert(
            token,
            PendingLoad {
                pose,
                source: source.clone(),
            },
        );
        Outcome::LoadRequested {
            token,
            source: source.to_string(),
        }
    }

    /// The load request behind an [`Outcome::LoadRequested`].
    #[must_use]
    pub fn load_request(&self, token: LoadToken) -> Option<LoadRequest> {
        self.pending.get(&token).map(|p| LoadRequest {
            token,
            source: p.source.clone(),
        })
    }

    /// Apply a loader completion: cache and place a renderable model, or fall
    /// back to the placeholder at the pose captured when the request was made.
    pub fn complete_load(&mut self, completion: LoadCompletion) -> Outcome {
        let Some(pending) = self.pending.remove(&completion.token) else {
            tracing::warn!("Completion for unknown load {}", completion.token);
            return Outcome::ignored("unknown load token");
        };
        match completion.result {
            LoadResult::Renderable(template) => {
                self.cache
                    .offer(completion.token, &completion.source, Arc::clone(&template));
                self.insert_loaded(&template, pending.pose)
            }
            failure => {
                tracing::warn!(
                    "Model {} unavailable ({}), placing placeholder",
                    pending.source,
                    failure.describe()
                );
                self.insert_placeholder(pending.pose)
            }
        }
    }

    /// Serializable snapshot of placed objects.
    #[must_use]
    pub fn summary(&self) -> SessionSummary {
        let selected = self.selection.selected();
        let placed = self
            .registry
            .roots()
            .iter()
            .filter_map(|&id| {
                let node = self.scene.get(id)?;
                Some(PlacedSummary {
                    id,
                    name: node.name.clone(),
                    position: self.scene.world_position(id).ok()?,
                    scale: self.scene.world_scale(id).ok()?.x,
                    selected: selected == Some(id),
                    placeholder: self.placeholders.contains(&id),
                })
            })
            .collect();
        SessionSummary {
            placed,
            cached_source: self.cache.cached_key().map(str::to_string),
            pending_loads: self.pending.len(),
        }
    }

    fn insert_placeholder(&mut self, pose: Pose) -> Outcome {
        match self.insert(&primitives::placeholder_plant(), pose, 1.0) {
            Ok(node) => {
                self.placeholders.insert(node);
                tracing::info!("Placed placeholder {node} at {:?}", pose.position);
                Outcome::Placed {
                    node,
                    placeholder: true,
                }
            }
            Err(e) => {
                tracing::warn!("Placeholder insertion failed: {e}");
                Outcome::ignored(e.to_string())
            }
        }
    }

    fn insert_loaded(&mut self, template: &ModelTemplate, pose: Pose) -> Outcome {
        match self.insert(template, pose, self.config.initial_scale) {
            Ok(node) => {
                tracing::info!("Placed '{}' {node} at {:?}", template.name, pose.position);
                Outcome::Placed {
                    node,
                    placeholder: false,
                }
            }
            Err(e) => {
                tracing::warn!("Model insertion failed: {e}, placing placeholder");
                self.insert_placeholder(pose)
            }
        }
    }

    fn insert(&mut self, template: &ModelTemplate, pose: Pose, scale: f32) -> ArResult<NodeId> {
        let anchor = self.scene.add_anchor(&pose);
        let root = match self.scene.instantiate(template, anchor, NodeRole::Placed) {
            Ok(root) => root,
            Err(e) => {
                self.scene.remove_subtree(anchor)?;
                return Err(e);
            }
        };
        self.scene.generate_collision(root, true);
        let scale = Vec3::splat(scale);
        self.scene.set_world_scale(root, scale)?;
        if let Some(node) = self.scene.get_mut(root) {
            node.scale_state = Some(ScaleState::new(scale));
        }
        self.registry.register(&self.scene, root);
        Ok(root)
    }

    fn select(&mut self, node: NodeId) -> ArResult<Outcome> {
        if !self.registry.contains(node) {
            return Err(ArError::InvalidOperation(format!("{node} is not a placed object")));
        }
        self.drag = None;
        self.selection
            .select(&mut self.scene, node, &self.config.selection)?;
        Ok(Outcome::Selected { node })
    }

    fn selected(&self) -> ArResult<NodeId> {
        self.selection
            .selected()
            .ok_or_else(|| ArError::InvalidOperation("nothing selected".to_string()))
    }

    fn begin_drag(&mut self, pose: Pose) -> ArResult<Outcome> {
        let node = self.selected()?;
        let offset = self.scene.world_position(node)? - pose.position;
        self.drag = Some(DragState { node, offset });
        tracing::debug!("Drag started on {node}");
        Ok(Outcome::DragStarted { node })
    }

    fn drag_to(&mut self, pose: Pose) -> ArResult<Outcome> {
        let drag = self
            .drag
            .ok_or_else(|| ArError::InvalidOperation("no drag in progress".to_string()))?;
        let position = pose.position + drag.offset;
        self.scene.set_world_position(drag.node, position)?;
        Ok(Outcome::Moved {
            node: drag.node,
            position,
        })
    }

    fn pinch(&mut self, factor: f32) -> ArResult<Outcome> {
        let node = self.selected()?;
        let current = self.scene.world_scale(node)?.x;
        let scale = self.config.regime.apply_pinch(current, factor);
        let uniform = Vec3::splat(scale);
        self.scene.set_world_scale(node, uniform)?;
        if let Some(state) = self
            .scene
            .get_mut(node)
            .and_then(|n| n.scale_state.as_mut())
        {
            state.rebase(uniform);
        }
        Ok(Outcome::Scaled { node, scale })
    }

    fn cycle_scale(&mut self, node: NodeId) -> ArResult<Outcome> {
        let next = self
            .scene
            .get_mut(node)
            .and_then(|n| n.scale_state.as_mut())
            .map(ScaleState::advance)
            .ok_or_else(|| ArError::InvalidOperation(format!("{node} has no scale state")))?;
        self.scene.set_world_scale(node, next)?;
        tracing::info!("Cycled scale of {node} to {:.4}", next.x);
        Ok(Outcome::Scaled { node, scale: next.x })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::SELECTION_BOX_NAME;
    use std::path::PathBuf;

    fn remote_config() -> SessionConfig {
        SessionConfig {
            model_source: ModelSource::Local(PathBuf::from("/bundle/plant2.glb")),
            ..SessionConfig::default()
        }
    }

    fn at(x: f32) -> Pose {
        Pose::from_position(Vec3::new(x, 0.0, -1.0))
    }

    fn placed(outcome: &Outcome) -> NodeId {
        match outcome {
            Outcome::Placed { node, .. } => *node,
            other => panic!("expected placement, got {other:?}"),
        }
    }

    #[test]
    fn test_fallback_places_placeholder_without_touching_cache() {
        let mut session = PlacementSession::new();
        let node = placed(&session.apply(Intent::Place { pose: at(0.0) }));
        assert!(session.is_placeholder(node));
        assert!(session.cache().is_empty());
        assert_eq!(session.pending_loads(), 0);
        assert_eq!(session.registry().len(), 1);
    }

    #[test]
    fn test_load_then_cache_hit() {
        let mut session = PlacementSession::with_config(remote_config());
        let Outcome::LoadRequested { token, .. } = session.place_at(at(0.0)) else {
            panic!("expected load request");
        };
        let request = session.load_request(token).expect("pending request");
        let template = Arc::new(primitives::box_mesh(
            "plant",
            Vec3::ONE,
            crate::node::Material::default(),
        ));
        let first = placed(&session.complete_load(LoadCompletion {
            token,
            source: request.source,
            result: LoadResult::Renderable(template),
        }));
        assert!(!session.is_placeholder(first));
        assert!((session.scene().world_scale(first).expect("scale").x - 0.01).abs() < 1e-6);

        let second = placed(&session.place_at(at(1.0)));
        assert_ne!(first, second);
        assert_eq!(session.cache().stats().writes, 1);
        assert_eq!(session.cache().stats().hits, 1);
    }

    #[test]
    fn test_failed_load_places_placeholder_at_requested_pose() {
        let mut session = PlacementSession::with_config(remote_config());
        let Outcome::LoadRequested { token, .. } = session.place_at(at(2.0)) else {
            panic!("expected load request");
        };
        let node = placed(&session.complete_load(LoadCompletion {
            token,
            source: remote_config().model_source,
            result: LoadResult::ParseError("truncated".into()),
        }));
        assert!(session.is_placeholder(node));
        let position = session.scene().world_position(node).expect("position");
        assert!((position - at(2.0).position).length() < 1e-6);
        assert!(session.cache().is_empty());
    }

    #[test]
    fn test_unknown_completion_is_ignored() {
        let mut session = PlacementSession::new();
        let outcome = session.complete_load(LoadCompletion {
            token: LoadToken(42),
            source: ModelSource::Fallback,
            result: LoadResult::FetchError("offline".into()),
        });
        assert!(matches!(outcome, Outcome::Ignored { .. }));
        assert!(session.registry().is_empty());
    }

    #[test]
    fn test_drag_keeps_grab_offset() {
        let mut session = PlacementSession::new();
        let node = placed(&session.apply(Intent::Place { pose: at(0.0) }));
        session.apply(Intent::Select { node });

        session.apply(Intent::BeginDrag {
            pose: Pose::from_position(Vec3::new(0.1, 0.0, -1.0)),
        });
        let moved = session.apply(Intent::Drag {
            pose: Pose::from_position(Vec3::new(0.6, 0.0, -1.5)),
        });
        let Outcome::Moved { position, .. } = moved else {
            panic!("expected move, got {moved:?}");
        };
        assert!((position - Vec3::new(0.5, 0.0, -1.5)).length() < 1e-5);
        assert_eq!(session.apply(Intent::EndDrag), Outcome::DragEnded);
        assert!(!session.is_dragging());
    }

    #[test]
    fn test_pinch_rebases_cycle() {
        let mut session = PlacementSession::new();
        let node = placed(&session.apply(Intent::Place { pose: at(0.0) }));
        session.apply(Intent::Select { node });
        session.apply(Intent::Scale { factor: 2.0 });
        let Outcome::Scaled { scale, .. } = session.apply(Intent::CycleScale { node }) else {
            panic!("expected scale");
        };
        assert!((scale - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_selection_indicator_survives_in_summary() {
        let mut session = PlacementSession::new();
        let a = placed(&session.apply(Intent::Place { pose: at(0.0) }));
        let b = placed(&session.apply(Intent::Place { pose: at(1.0) }));
        session.apply(Intent::Select { node: a });
        session.apply(Intent::Select { node: b });

        let summary = session.summary();
        assert_eq!(summary.placed.len(), 2);
        assert!(summary.placed.iter().any(|p| p.id == b && p.selected));
        assert!(summary.placed.iter().all(|p| p.placeholder));
        let boxes = session
            .scene()
            .nodes()
            .filter(|n| n.name == SELECTION_BOX_NAME)
            .count();
        assert_eq!(boxes, 1);
        assert!(summary.to_json().expect("json").contains("\"placed\""));
    }

    #[test]
    fn test_intents_without_selection_are_ignored() {
        let mut session = PlacementSession::new();
        assert!(matches!(session.apply(Intent::Scale { factor: 2.0 }), Outcome::Ignored { .. }));
        assert!(matches!(
            session.apply(Intent::Drag {
                pose: Pose::from_position(Vec3::ZERO)
            }),
            Outcome::Ignored { .. }
        ));
    }
}
