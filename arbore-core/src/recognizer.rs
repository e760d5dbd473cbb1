//! # Gesture Recognition
//!
//! Turns raw timestamped touch events into the five gestures the AR view
//! understands: tap, double tap, long press, pan and pinch.
//!
//! ```text
//! finger down ──┬── lifts within slop ──► pending tap ──┬── 2nd tap in window ──► DoubleTap
//!               │                                       └── window expires ─────► Tap
//!               ├── held ≥ long_press_ms ──► LongPress(Began) ... LongPress(Ended)
//!               ├── moves beyond slop ────► Pan(Began) → Pan(Changed)* → Pan(Ended)
//!               └── 2nd finger lands ─────► Pinch(Began) → Pinch(Changed)* → Pinch(Ended)
//! ```
//!
//! A single tap is held back until a double tap has been ruled out, so the
//! two never fire for the same physical tap. Pinch `scale` values are deltas
//! since the previous pinch event, so consumers compose them against the
//! scale they already applied.
//!
//! Time only advances through event timestamps and [`GestureRecognizer::poll`];
//! the recognizer never reads a clock.

use std::collections::BTreeMap;

use crate::event::{Gesture, GesturePhase, ScreenPoint, TouchEvent, TouchPhase};

/// Configuration for gesture recognition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecognizerConfig {
    /// Maximum delay between the first tap's release and the second press.
    pub double_tap_window_ms: u64,
    /// Hold time before a press becomes a long press.
    pub long_press_ms: u64,
    /// Movement allowed before a press becomes a pan.
    pub tap_slop_px: f32,
    /// Maximum distance between the two taps of a double tap.
    pub double_tap_slop_px: f32,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            double_tap_window_ms: 300,
            long_press_ms: 500,
            tap_slop_px: 10.0,
            double_tap_slop_px: 40.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingTap {
    point: ScreenPoint,
    released_ms: u64,
}

#[derive(Debug, Clone, Copy)]
enum Contact {
    /// No finger down.
    Idle,
    /// One finger down, not yet classified beyond "press".
    Pressing {
        start: ScreenPoint,
        started_ms: u64,
        last: ScreenPoint,
        long_press_fired: bool,
        double_tap_candidate: bool,
    },
    /// One finger dragging.
    Panning { last: ScreenPoint },
    /// Two fingers down.
    Pinching {
        last_distance: f32,
        center: ScreenPoint,
    },
    /// Fingers still down after a gesture ended; ignored until all lift.
    Suppressed,
}

/// Stateful touch-to-gesture recognizer.
#[derive(Debug)]
pub struct GestureRecognizer {
    config: RecognizerConfig,
    fingers: BTreeMap<u32, ScreenPoint>,
    contact: Contact,
    pending_tap: Option<PendingTap>,
}

impl GestureRecognizer {
    /// Create a recognizer with default config.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RecognizerConfig::default())
    }

    /// Create with custom configuration.
    #[must_use]
    pub fn with_config(config: RecognizerConfig) -> Self {
        Self {
            config,
            fingers: BTreeMap::new(),
            contact: Contact::Idle,
            pending_tap: None,
        }
    }

    /// Get the current configuration.
    #[must_use]
    pub const fn config(&self) -> &RecognizerConfig {
        &self.config
    }

    /// Whether a single tap is being held back waiting for a possible second tap.
    #[must_use]
    pub fn has_pending_tap(&self) -> bool {
        self.pending_tap.is_some()
    }

    /// Advance time without a touch event.
    ///
    /// Emits an expired pending tap and fires a long press whose threshold has
    /// elapsed. Hosts call this from their frame loop.
    pub fn poll(&mut self, now_ms: u64) -> Vec<Gesture> {
        let mut out = Vec::new();
        self.advance_time(now_ms, &mut out);
        out
    }

    /// Process a raw touch event.
    pub fn process(&mut self, event: &TouchEvent) -> Vec<Gesture> {
        let mut out = Vec::new();
        self.advance_time(event.timestamp_ms, &mut out);

        match event.phase {
            TouchPhase::Start => self.on_start(event, &mut out),
            TouchPhase::Move => self.on_move(event, &mut out),
            TouchPhase::End => self.on_end(event, false, &mut out),
            TouchPhase::Cancel => self.on_end(event, true, &mut out),
        }

        out
    }

    fn advance_time(&mut self, now_ms: u64, out: &mut Vec<Gesture>) {
        let candidate_active = matches!(
            self.contact,
            Contact::Pressing {
                double_tap_candidate: true,
                ..
            }
        );
        if !candidate_active {
            if let Some(pending) = self.pending_tap {
                if now_ms.saturating_sub(pending.released_ms) > self.config.double_tap_window_ms {
                    self.flush_pending(out);
                }
            }
        }

        if let Contact::Pressing {
            start,
            started_ms,
            long_press_fired: false,
            ..
        } = self.contact
        {
            if now_ms.saturating_sub(started_ms) >= self.config.long_press_ms {
                self.flush_pending(out);
                out.push(Gesture::LongPress {
                    point: start,
                    phase: GesturePhase::Began,
                });
                if let Contact::Pressing {
                    long_press_fired,
                    double_tap_candidate,
                    ..
                } = &mut self.contact
                {
                    *long_press_fired = true;
                    *double_tap_candidate = false;
                }
            }
        }
    }

    fn flush_pending(&mut self, out: &mut Vec<Gesture>) {
        if let Some(pending) = self.pending_tap.take() {
            out.push(Gesture::Tap {
                point: pending.point,
            });
        }
    }

    fn on_start(&mut self, event: &TouchEvent, out: &mut Vec<Gesture>) {
        for t in &event.touches {
            self.fingers.insert(t.id, t.point());
        }

        match self.fingers.len() {
            0 => {}
            1 => {
                if matches!(self.contact, Contact::Idle) {
                    let start = self.first_finger();
                    let double_tap_candidate = self.pending_tap.is_some_and(|p| {
                        event.timestamp_ms.saturating_sub(p.released_ms)
                            <= self.config.double_tap_window_ms
                            && p.point.distance(&start) <= self.config.double_tap_slop_px
                    });
                    if !double_tap_candidate {
                        self.flush_pending(out);
                    }
                    self.contact = Contact::Pressing {
                        start,
                        started_ms: event.timestamp_ms,
                        last: start,
                        long_press_fired: false,
                        double_tap_candidate,
                    };
                }
            }
            _ => {
                if matches!(self.contact, Contact::Pinching { .. }) {
                    return;
                }
                self.end_single_finger(false, out);
                self.flush_pending(out);
                let (distance, center) = self.pinch_geometry();
                self.contact = Contact::Pinching {
                    last_distance: distance,
                    center,
                };
                out.push(Gesture::Pinch {
                    center,
                    scale: 1.0,
                    phase: GesturePhase::Began,
                });
            }
        }
    }

    fn on_move(&mut self, event: &TouchEvent, out: &mut Vec<Gesture>) {
        for t in &event.touches {
            if let Some(p) = self.fingers.get_mut(&t.id) {
                *p = t.point();
            }
        }

        match self.contact {
            Contact::Pressing {
                start,
                long_press_fired,
                ..
            } => {
                let current = self.first_finger();
                if long_press_fired {
                    if let Contact::Pressing { last, .. } = &mut self.contact {
                        *last = current;
                    }
                    out.push(Gesture::LongPress {
                        point: current,
                        phase: GesturePhase::Changed,
                    });
                } else if start.distance(&current) > self.config.tap_slop_px {
                    self.flush_pending(out);
                    self.contact = Contact::Panning { last: current };
                    out.push(Gesture::Pan {
                        point: current,
                        phase: GesturePhase::Began,
                    });
                } else if let Contact::Pressing { last, .. } = &mut self.contact {
                    *last = current;
                }
            }
            Contact::Panning { .. } => {
                let current = self.first_finger();
                self.contact = Contact::Panning { last: current };
                out.push(Gesture::Pan {
                    point: current,
                    phase: GesturePhase::Changed,
                });
            }
            Contact::Pinching { last_distance, .. } => {
                if self.fingers.len() < 2 {
                    return;
                }
                let (distance, center) = self.pinch_geometry();
                if last_distance > f32::EPSILON && distance > f32::EPSILON {
                    out.push(Gesture::Pinch {
                        center,
                        scale: distance / last_distance,
                        phase: GesturePhase::Changed,
                    });
                }
                self.contact = Contact::Pinching {
                    last_distance: distance,
                    center,
                };
            }
            Contact::Idle | Contact::Suppressed => {}
        }
    }

    fn on_end(&mut self, event: &TouchEvent, cancelled: bool, out: &mut Vec<Gesture>) {
        for t in &event.touches {
            self.fingers.remove(&t.id);
        }
        let released_at = event
            .primary_touch()
            .map(crate::event::TouchPoint::point);

        match self.contact {
            Contact::Pressing {
                last,
                long_press_fired: false,
                double_tap_candidate,
                ..
            } if !cancelled => {
                let point = released_at.unwrap_or(last);
                if double_tap_candidate {
                    self.pending_tap = None;
                    out.push(Gesture::DoubleTap { point });
                } else {
                    self.flush_pending(out);
                    self.pending_tap = Some(PendingTap {
                        point,
                        released_ms: event.timestamp_ms,
                    });
                }
                self.contact = Contact::Idle;
            }
            Contact::Pinching { center, .. } => {
                if self.fingers.len() < 2 {
                    out.push(Gesture::Pinch {
                        center,
                        scale: 1.0,
                        phase: if cancelled {
                            GesturePhase::Cancelled
                        } else {
                            GesturePhase::Ended
                        },
                    });
                    self.contact = Contact::Suppressed;
                }
            }
            _ => self.end_single_finger(cancelled, out),
        }

        if self.fingers.is_empty() && matches!(self.contact, Contact::Suppressed) {
            self.contact = Contact::Idle;
        }
    }

    /// Close out a one-finger gesture (pan or long press).
    fn end_single_finger(&mut self, cancelled: bool, out: &mut Vec<Gesture>) {
        let phase = if cancelled {
            GesturePhase::Cancelled
        } else {
            GesturePhase::Ended
        };
        match self.contact {
            Contact::Panning { last } => out.push(Gesture::Pan { point: last, phase }),
            Contact::Pressing {
                last,
                long_press_fired: true,
                ..
            } => out.push(Gesture::LongPress { point: last, phase }),
            _ => {}
        }
        self.contact = if self.fingers.is_empty() {
            Contact::Idle
        } else {
            Contact::Suppressed
        };
    }

    fn first_finger(&self) -> ScreenPoint {
        self.fingers.values().next().copied().unwrap_or_default()
    }

    fn pinch_geometry(&self) -> (f32, ScreenPoint) {
        let mut it = self.fingers.values();
        match (it.next(), it.next()) {
            (Some(a), Some(b)) => (a.distance(b), a.midpoint(b)),
            (Some(a), None) => (0.0, *a),
            _ => (0.0, ScreenPoint::default()),
        }
    }
}

impl Default for GestureRecognizer {
    fn default() -> Self {
        Self::new()
    }
}
