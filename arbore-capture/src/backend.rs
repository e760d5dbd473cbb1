//! Capture hardware and reconstruction engine seams.
//!
//! The device camera session and the photogrammetry algorithm are platform
//! services. The pipeline only talks to them through these traits.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::CaptureResult;
use crate::state::CaptureState;

/// Something the capture session reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    /// The session moved to a new state.
    StateChanged(CaptureState),
    /// The user walked all the way around the object.
    ScanPassCompleted,
}

/// A live guided-capture session writing photos to a directory.
#[async_trait]
pub trait CaptureSession: Send {
    /// Current state.
    fn state(&self) -> CaptureState;

    /// Begin the session, writing photos to `images`.
    ///
    /// # Errors
    ///
    /// Returns an error if the device session cannot start.
    fn start(&mut self, images: &Path) -> CaptureResult<()>;

    /// Ready → Detecting. Returns whether detection started.
    fn start_detecting(&mut self) -> bool;

    /// Detecting → Capturing.
    fn start_capturing(&mut self);

    /// Stop capturing and flush images (→ Finishing → Completed).
    fn finish(&mut self);

    /// Abandon the session.
    fn cancel(&mut self);

    /// Next event, or `None` once the session has nothing more to report.
    async fn next_event(&mut self) -> Option<CaptureEvent>;
}

/// Factory for capture sessions.
pub trait CaptureBackend: Send + Sync {
    /// A new session in [`CaptureState::Initializing`].
    fn new_session(&self) -> Box<dyn CaptureSession>;
}

/// Progress report from a reconstruction job.
#[derive(Debug, Clone, PartialEq)]
pub enum PhotogrammetryOutput {
    /// Fraction complete, 0.0 to 1.0.
    Progress(f64),
    /// The model-file request produced a file.
    RequestComplete(PathBuf),
    /// All requests are done.
    ProcessingComplete,
    /// The model-file request failed.
    RequestError(String),
    /// The job was cancelled.
    ProcessingCancelled,
}

/// Black-box reconstruction from a folder of photos to a model file.
#[async_trait]
pub trait PhotogrammetryEngine: Send + Sync {
    /// Start reconstructing `images` into `output`.
    ///
    /// # Errors
    ///
    /// Returns an error if the job cannot be started.
    async fn process(
        &self,
        images: &Path,
        output: &Path,
    ) -> CaptureResult<BoxStream<'static, PhotogrammetryOutput>>;
}
