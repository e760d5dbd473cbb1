//! Scripted placement scenarios.
//!
//! A scenario describes the simulated world (camera and detected planes) and
//! a list of steps fed to the session in order:
//!
//! ```json
//! {
//!   "camera": { "position": [0, 2, 0], "pitch": -1.5707964 },
//!   "planes": [{ "tier": "estimated_plane", "alignment": "horizontal",
//!                "center": [0, 0, 0], "normal": [0, 1, 0] }],
//!   "steps": [
//!     { "step": "gesture", "gesture": { "gesture": "tap", "point": { "x": 195, "y": 422 } } },
//!     { "step": "settle" }
//!   ]
//! }
//! ```

use std::path::{Path, PathBuf};

use arbore_core::{Camera, DetectedPlane, Gesture, SimulatedHost, TouchEvent, TrackingConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reading a scenario file.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// The file could not be read.
    #[error("failed to read scenario {path}: {source}")]
    Io {
        /// Scenario path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not a valid scenario.
    #[error("invalid scenario: {0}")]
    Json(#[from] serde_json::Error),
}

/// One scripted input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Raw touch, run through the gesture recognizer.
    Touch {
        /// The touch event.
        event: TouchEvent,
    },
    /// Already-recognized gesture.
    Gesture {
        /// The gesture.
        gesture: Gesture,
    },
    /// Advance recognizer time so pending taps and long presses fire.
    Poll {
        /// Current time in milliseconds.
        now_ms: u64,
    },
    /// Wait until every outstanding model load has been applied.
    Settle,
    /// Move the camera.
    Camera {
        /// New camera.
        camera: Camera,
    },
}

/// A simulated world plus the input to replay in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Initial camera.
    #[serde(default)]
    pub camera: Camera,
    /// Surfaces the tracker reports.
    #[serde(default)]
    pub planes: Vec<DetectedPlane>,
    /// Plane detection options.
    #[serde(default)]
    pub tracking: TrackingConfig,
    /// Input steps.
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Parse a scenario from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Json`] if the text is not a valid scenario.
    pub fn from_json(json: &str) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a scenario file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let json = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Simulated host showing this scenario's world.
    #[must_use]
    pub fn host(&self) -> SimulatedHost {
        self.planes
            .iter()
            .fold(SimulatedHost::new(self.camera), |host, &plane| {
                host.with_plane(plane)
            })
    }
}
