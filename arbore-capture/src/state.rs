//! Capture session states and the primary action button.

use serde::{Deserialize, Serialize};

/// State of an object-capture session.
///
/// ```text
/// Initializing → Ready → Detecting → Capturing → Finishing → Completed
///      └──────────┴─────────┴───────────┴────────────┴──► Failed(reason)
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "lowercase")]
pub enum CaptureState {
    /// Session created, not yet started.
    Initializing,
    /// Started; waiting for the user to begin detection.
    Ready,
    /// Looking for the object's bounding box.
    Detecting,
    /// Taking pictures.
    Capturing,
    /// Flushing images to disk.
    Finishing,
    /// All images written; reconstruction can run.
    Completed,
    /// The session failed and must be replaced.
    Failed(String),
}

impl CaptureState {
    /// Status text shown to the user.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Initializing => "initializing".to_string(),
            Self::Ready => "ready".to_string(),
            Self::Detecting => "detecting".to_string(),
            Self::Capturing => "capturing".to_string(),
            Self::Finishing => "finishing".to_string(),
            Self::Completed => "completed".to_string(),
            Self::Failed(reason) => format!("failed: {reason}"),
        }
    }

    /// Whether the session is still working towards completion.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !matches!(self, Self::Completed | Self::Failed(_))
    }

    /// What the single capture button does in this state, if anything.
    #[must_use]
    pub const fn primary_action(&self) -> Option<PrimaryAction> {
        match self {
            Self::Ready => Some(PrimaryAction::StartDetecting),
            Self::Detecting => Some(PrimaryAction::StartCapturing),
            _ => None,
        }
    }
}

impl std::fmt::Display for CaptureState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

/// Action bound to the capture button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryAction {
    /// Ready → Detecting.
    StartDetecting,
    /// Detecting → Capturing.
    StartCapturing,
}

impl PrimaryAction {
    /// Button text.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::StartDetecting => "Start detecting",
            Self::StartCapturing => "Start capturing",
        }
    }
}
