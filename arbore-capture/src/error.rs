//! Capture pipeline error types.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for capture operations.
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Errors that can occur while capturing or reconstructing.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// A scan directory could not be created. No session is started.
    #[error("Failed to create scan directory {path}: {source}")]
    Storage {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The capture session refused to start.
    #[error("Capture session failed to start: {0}")]
    SessionStart(String),

    /// The photogrammetry engine could not be started.
    #[error("Photogrammetry failed to start: {0}")]
    Reconstruction(String),

    /// The operation needs an active capture session.
    #[error("No capture session is running")]
    NoSession,

    /// The capture session is not in a state that allows the operation.
    #[error("Action unavailable while {0}")]
    InvalidState(String),
}
