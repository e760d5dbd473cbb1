//! Error types for scene and session operations.

use thiserror::Error;

/// Result type for AR core operations.
pub type ArResult<T> = Result<T, ArError>;

/// Errors that can occur in scene graph and session operations.
///
/// None of these cross the gesture boundary: gesture handlers resolve every
/// failure to a logged no-op.
#[derive(Debug, Error)]
pub enum ArError {
    /// Node not found in the scene.
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// Invalid scene graph operation (cycles, detached roots, ...).
    #[error("Invalid operation on node: {0}")]
    InvalidOperation(String),

    /// Scene summary serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
