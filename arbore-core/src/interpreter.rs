//! Gesture classification.
//!
//! The interpreter looks at a recognized gesture and the current session
//! state and decides what the user meant. It never mutates anything; the
//! resulting [`Intent`] is applied by [`PlacementSession::apply`].
//!
//! ```text
//! Tap        ── placed object under finger? ── yes ─► Select
//!                                             └ no ─► surface? ─► Place / Ignore
//! DoubleTap  ── placed object under finger? ─────────► CycleScale / Ignore
//! LongPress  ── Began + placed object? ──────────────► Select / Ignore
//! Pan        ── selection? ─ Began ──► BeginDrag   Changed ──► Drag   Ended ──► EndDrag
//! Pinch      ── selection? ─ Changed ────────► Scale(factor)
//! ```
//!
//! [`PlacementSession::apply`]: crate::session::PlacementSession::apply

use serde::Serialize;

use crate::event::{Gesture, GesturePhase, ScreenPoint};
use crate::host::{ArHost, Pose};
use crate::node::NodeId;
use crate::placement::PoseResolver;
use crate::session::PlacementSession;

/// What the user meant by a gesture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    /// Place a new object at a resolved pose.
    Place {
        /// Resolved surface pose.
        pose: Pose,
    },
    /// Make a placed object the active selection.
    Select {
        /// Placed root.
        node: NodeId,
    },
    /// Start moving the selection; the pose is the surface under the finger.
    BeginDrag {
        /// Surface pose under the finger.
        pose: Pose,
    },
    /// Continue moving the selection.
    Drag {
        /// Surface pose under the finger.
        pose: Pose,
    },
    /// Stop moving the selection.
    EndDrag,
    /// Scale the selection by a pinch delta factor.
    Scale {
        /// Delta since the previous pinch event.
        factor: f32,
    },
    /// Advance the double-tap scale cycle of a placed object.
    CycleScale {
        /// Placed root.
        node: NodeId,
    },
    /// Nothing to do.
    Ignore {
        /// Why the gesture was dropped.
        reason: &'static str,
    },
}

impl Intent {
    const fn ignore(reason: &'static str) -> Self {
        Self::Ignore { reason }
    }
}

/// Stateless gesture classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct GestureInterpreter;

impl GestureInterpreter {
    /// Classify `gesture` against the session and host.
    #[must_use]
    pub fn interpret(session: &PlacementSession, host: &dyn ArHost, gesture: &Gesture) -> Intent {
        let intent = match *gesture {
            Gesture::Tap { point } => match Self::pick(session, host, point) {
                Some(node) => Intent::Select { node },
                None => PoseResolver::resolve(host, point, &session.config().probes.placement)
                    .map_or(Intent::ignore("no surface under tap"), |pose| Intent::Place { pose }),
            },
            Gesture::DoubleTap { point } => Self::pick(session, host, point)
                .map_or(Intent::ignore("double tap missed placed objects"), |node| {
                    Intent::CycleScale { node }
                }),
            Gesture::LongPress {
                point,
                phase: GesturePhase::Began,
            } => Self::pick(session, host, point)
                .map_or(Intent::ignore("long press missed placed objects"), |node| {
                    Intent::Select { node }
                }),
            Gesture::LongPress { .. } => Intent::ignore("long press already handled"),
            Gesture::Pan { point, phase } => Self::interpret_pan(session, host, point, phase),
            Gesture::Pinch { .. } if session.selection().selected().is_none() => {
                Intent::ignore("pinch without selection")
            }
            Gesture::Pinch {
                scale,
                phase: GesturePhase::Changed,
                ..
            } => Intent::Scale { factor: scale },
            Gesture::Pinch {
                phase: GesturePhase::Began,
                ..
            } => Intent::ignore("pinch started"),
            Gesture::Pinch { .. } => Intent::ignore("pinch finished"),
        };
        tracing::debug!("{gesture:?} -> {intent:?}");
        intent
    }

    fn interpret_pan(
        session: &PlacementSession,
        host: &dyn ArHost,
        point: ScreenPoint,
        phase: GesturePhase,
    ) -> Intent {
        if session.selection().selected().is_none() {
            return Intent::ignore("pan without selection");
        }
        match phase {
            GesturePhase::Ended | GesturePhase::Cancelled => Intent::EndDrag,
            GesturePhase::Began | GesturePhase::Changed => {
                match PoseResolver::resolve(host, point, &session.config().probes.drag) {
                    None => Intent::ignore("no surface under drag"),
                    Some(pose) if session.is_dragging() && phase == GesturePhase::Changed => {
                        Intent::Drag { pose }
                    }
                    Some(pose) => Intent::BeginDrag { pose },
                }
            }
        }
    }

    /// Placed object under a screen point.
    ///
    /// The nearest entity is tried first; if it does not belong to a placed
    /// object, every entity along the ray is checked in order.
    #[must_use]
    pub fn pick(session: &PlacementSession, host: &dyn ArHost, point: ScreenPoint) -> Option<NodeId> {
        let scene = session.scene();
        let registry = session.registry();
        if let Some(root) = host
            .entity_at(scene, point)
            .and_then(|hit| registry.root_of(scene, hit))
        {
            return Some(root);
        }
        host.hit_test(scene, point)
            .into_iter()
            .find_map(|hit| registry.root_of(scene, hit))
    }
}
