//! Input events for AR interaction.

use serde::{Deserialize, Serialize};

/// A point in screen coordinates (pixels, origin top-left).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenPoint {
    /// X position in pixels.
    pub x: f32,
    /// Y position in pixels.
    pub y: f32,
}

impl ScreenPoint {
    /// Create a new screen point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(&self, other: &Self) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Midpoint between two points.
    #[must_use]
    pub fn midpoint(&self, other: &Self) -> Self {
        Self::new((self.x + other.x) * 0.5, (self.y + other.y) * 0.5)
    }
}

/// Phase of a raw touch event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TouchPhase {
    /// Touch started (finger down).
    Start,
    /// Touch moved (finger dragging).
    Move,
    /// Touch ended (finger up).
    End,
    /// Touch cancelled (e.g., palm rejection).
    Cancel,
}

/// A single touch point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TouchPoint {
    /// Touch identifier (for multi-touch).
    pub id: u32,
    /// X position in screen coordinates.
    pub x: f32,
    /// Y position in screen coordinates.
    pub y: f32,
}

impl TouchPoint {
    /// Position as a screen point.
    #[must_use]
    pub const fn point(&self) -> ScreenPoint {
        ScreenPoint::new(self.x, self.y)
    }
}

/// A touch event with one or more touch points.
///
/// `touches` lists every finger currently on the screen; for `End` and
/// `Cancel` it lists the fingers that lifted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TouchEvent {
    /// Phase of this touch event.
    pub phase: TouchPhase,
    /// Touch points.
    pub touches: Vec<TouchPoint>,
    /// Timestamp in milliseconds since session start.
    pub timestamp_ms: u64,
}

impl TouchEvent {
    /// Create a new touch event.
    #[must_use]
    pub fn new(phase: TouchPhase, touches: Vec<TouchPoint>, timestamp_ms: u64) -> Self {
        Self {
            phase,
            touches,
            timestamp_ms,
        }
    }

    /// Single-finger event at a point.
    #[must_use]
    pub fn single(phase: TouchPhase, x: f32, y: f32, timestamp_ms: u64) -> Self {
        Self::new(phase, vec![TouchPoint { id: 0, x, y }], timestamp_ms)
    }

    /// Get the primary (first) touch point.
    #[must_use]
    pub fn primary_touch(&self) -> Option<&TouchPoint> {
        self.touches.first()
    }

    /// Check if this is a multi-touch event.
    #[must_use]
    pub fn is_multi_touch(&self) -> bool {
        self.touches.len() > 1
    }
}

/// Phase of a continuous gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GesturePhase {
    /// Gesture recognized.
    Began,
    /// Gesture updated.
    Changed,
    /// Gesture finished normally.
    Ended,
    /// Gesture aborted by the system.
    Cancelled,
}

/// Recognized gestures from touch input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "gesture", rename_all = "snake_case")]
pub enum Gesture {
    /// Single tap (only delivered once a double tap has been ruled out).
    Tap {
        /// Tap location.
        point: ScreenPoint,
    },

    /// Two taps in quick succession at the same place.
    DoubleTap {
        /// Location of the second tap.
        point: ScreenPoint,
    },

    /// Press held past the long-press threshold.
    LongPress {
        /// Press location.
        point: ScreenPoint,
        /// Gesture phase.
        phase: GesturePhase,
    },

    /// One-finger drag.
    Pan {
        /// Current finger location.
        point: ScreenPoint,
        /// Gesture phase.
        phase: GesturePhase,
    },

    /// Two-finger pinch.
    Pinch {
        /// Midpoint between the fingers.
        center: ScreenPoint,
        /// Scale delta since the previous pinch event (1.0 = no change).
        scale: f32,
        /// Gesture phase.
        phase: GesturePhase,
    },
}

impl Gesture {
    /// Screen location of the gesture.
    #[must_use]
    pub const fn point(&self) -> ScreenPoint {
        match self {
            Self::Tap { point }
            | Self::DoubleTap { point }
            | Self::LongPress { point, .. }
            | Self::Pan { point, .. } => *point,
            Self::Pinch { center, .. } => *center,
        }
    }
}

/// All input events the AR view can receive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum InputEvent {
    /// Raw touch event, run through the gesture recognizer.
    Touch(TouchEvent),

    /// Already-recognized gesture from a platform recognizer.
    Gesture(Gesture),
}
