//! Capture → reconstruction pipeline with retry-by-restart.
//!
//! ```text
//!  start ──► new dir ──► session.start(Images/)
//!                             │ primary action: Ready → Detecting → Capturing
//!                             ▼
//!                     ScanPassCompleted ──► finish()
//!                             │
//!              Completed ─────┴───── Failed ──────────────┐
//!                 │                                       │
//!      drop session, reconstruct Images/ → Models/model.glb
//!                 │                                       │
//!      ProcessingComplete ── RequestError / Cancelled ────┤
//!                 │                                       ▼
//!         Preview(model) ── dismiss ─────────────► new dir + new session
//! ```
//!
//! Failures never end the pipeline: the attempt is abandoned and a fresh one
//! starts in a fresh directory. Only storage failures surface as errors.

use std::path::PathBuf;
use std::sync::Arc;

use futures::StreamExt;

use crate::backend::{CaptureBackend, CaptureEvent, CaptureSession, PhotogrammetryEngine, PhotogrammetryOutput};
use crate::error::{CaptureError, CaptureResult};
use crate::state::{CaptureState, PrimaryAction};
use crate::storage::{ScanDirectory, ScanStorage};

/// Pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Documents root; scans go to `{documents}/Scans`.
    pub documents_dir: PathBuf,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            documents_dir: std::env::temp_dir().join("arbore-documents"),
        }
    }
}

/// How a capture pass ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    /// Reconstruction produced a model ready for preview.
    Preview(PathBuf),
    /// The attempt failed; a new session is running in this directory.
    Restarted(ScanDirectory),
}

/// Drives one capture attempt at a time.
pub struct CapturePipeline {
    backend: Arc<dyn CaptureBackend>,
    engine: Arc<dyn PhotogrammetryEngine>,
    storage: ScanStorage,
    directory: ScanDirectory,
    session: Option<Box<dyn CaptureSession>>,
    preview: Option<PathBuf>,
    restarts: usize,
    halted: Option<String>,
}

impl std::fmt::Debug for CapturePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapturePipeline")
            .field("directory", &self.directory)
            .field("state", &self.state())
            .field("preview", &self.preview)
            .field("restarts", &self.restarts)
            .finish_non_exhaustive()
    }
}

impl CapturePipeline {
    /// Create the first scan directory and start a capture session in it.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::Storage`] if the directory cannot be created,
    /// or the backend's error if the session refuses to start.
    pub fn start(
        backend: Arc<dyn CaptureBackend>,
        engine: Arc<dyn PhotogrammetryEngine>,
        config: &CaptureConfig,
    ) -> CaptureResult<Self> {
        let storage = ScanStorage::new(&config.documents_dir);
        let directory = storage.create_session_dir()?;
        let session = Self::open_session(backend.as_ref(), &directory)?;
        Ok(Self {
            backend,
            engine,
            storage,
            directory,
            session: Some(session),
            preview: None,
            restarts: 0,
            halted: None,
        })
    }

    fn open_session(
        backend: &dyn CaptureBackend,
        directory: &ScanDirectory,
    ) -> CaptureResult<Box<dyn CaptureSession>> {
        let mut session = backend.new_session();
        session.start(&directory.images)?;
        tracing::info!("Capture session started in {}", directory.root.display());
        Ok(session)
    }

    /// Current scan directory, or the last one opened if a restart could
    /// not create its successor.
    #[must_use]
    pub const fn directory(&self) -> &ScanDirectory {
        &self.directory
    }

    /// Number of restarts so far.
    #[must_use]
    pub const fn restarts(&self) -> usize {
        self.restarts
    }

    /// Model waiting for the user to dismiss the preview.
    #[must_use]
    pub fn preview(&self) -> Option<&PathBuf> {
        self.preview.as_ref()
    }

    /// State of the running session ([`CaptureState::Completed`] while a
    /// reconstruction or preview is pending, [`CaptureState::Failed`] once a
    /// restart could not open a new attempt).
    #[must_use]
    pub fn state(&self) -> CaptureState {
        if let Some(reason) = &self.halted {
            return CaptureState::Failed(reason.clone());
        }
        self.session
            .as_ref()
            .map_or(CaptureState::Completed, |s| s.state())
    }

    /// Status text for the current state.
    #[must_use]
    pub fn status_label(&self) -> String {
        self.state().label()
    }

    /// What the capture button would do now.
    #[must_use]
    pub fn primary_action(&self) -> Option<PrimaryAction> {
        self.state().primary_action()
    }

    /// Press the capture button.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no session or the button is unavailable
    /// in the current state.
    pub fn trigger_primary(&mut self) -> CaptureResult<PrimaryAction> {
        let session = self.session.as_mut().ok_or(CaptureError::NoSession)?;
        let state = session.state();
        match state.primary_action() {
            Some(PrimaryAction::StartDetecting) => {
                if !session.start_detecting() {
                    tracing::warn!("Detection did not start");
                    return Err(CaptureError::InvalidState(state.label()));
                }
                tracing::info!("Detection started");
                Ok(PrimaryAction::StartDetecting)
            }
            Some(PrimaryAction::StartCapturing) => {
                session.start_capturing();
                tracing::info!("Capturing started");
                Ok(PrimaryAction::StartCapturing)
            }
            None => Err(CaptureError::InvalidState(state.label())),
        }
    }

    /// Follow the session to completion, then reconstruct.
    ///
    /// # Errors
    ///
    /// Returns an error only if a restart cannot create its directory or
    /// session.
    pub async fn run_pass(&mut self) -> CaptureResult<PassOutcome> {
        let Some(session) = self.session.as_mut() else {
            return Err(CaptureError::NoSession);
        };

        loop {
            match session.next_event().await {
                Some(CaptureEvent::ScanPassCompleted) => {
                    tracing::debug!("Scan pass completed, finishing");
                    session.finish();
                }
                Some(CaptureEvent::StateChanged(CaptureState::Completed)) => break,
                Some(CaptureEvent::StateChanged(CaptureState::Failed(reason))) => {
                    tracing::warn!("Capture failed: {reason}");
                    return self.restart();
                }
                Some(CaptureEvent::StateChanged(state)) => {
                    tracing::debug!("Capture state: {}", state.label());
                }
                None => {
                    tracing::warn!(
                        "Capture session ended while {}",
                        session.state().label()
                    );
                    return self.restart();
                }
            }
        }

        self.session = None;
        self.reconstruct().await
    }

    async fn reconstruct(&mut self) -> CaptureResult<PassOutcome> {
        let output = self.directory.model_output();
        tracing::info!(
            "Reconstructing {} into {}",
            self.directory.images.display(),
            output.display()
        );
        let mut outputs = match self.engine.process(&self.directory.images, &output).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!("{e}");
                return self.restart();
            }
        };

        let mut produced: Option<PathBuf> = None;
        while let Some(event) = outputs.next().await {
            match event {
                PhotogrammetryOutput::Progress(fraction) => {
                    tracing::debug!("Reconstruction {:.0}%", fraction * 100.0);
                }
                PhotogrammetryOutput::RequestComplete(path) => produced = Some(path),
                PhotogrammetryOutput::ProcessingComplete => {
                    let model = produced.unwrap_or(output);
                    tracing::info!("Reconstruction complete: {}", model.display());
                    self.preview = Some(model.clone());
                    return Ok(PassOutcome::Preview(model));
                }
                PhotogrammetryOutput::RequestError(reason) => {
                    tracing::warn!("Reconstruction failed: {reason}");
                    return self.restart();
                }
                PhotogrammetryOutput::ProcessingCancelled => {
                    tracing::warn!("Reconstruction cancelled");
                    return self.restart();
                }
            }
        }
        tracing::warn!("Reconstruction stream ended without completing");
        self.restart()
    }

    /// Close the preview; capture starts over in a new directory whether
    /// or not the model was kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the new directory or session cannot be created.
    pub fn dismiss_preview(&mut self) -> CaptureResult<&ScanDirectory> {
        self.preview = None;
        self.restart()?;
        Ok(&self.directory)
    }

    fn restart(&mut self) -> CaptureResult<PassOutcome> {
        let next = self.storage.create_session_dir().and_then(|directory| {
            Self::open_session(self.backend.as_ref(), &directory).map(|session| (directory, session))
        });
        if let Some(mut old) = self.session.take() {
            old.cancel();
        }
        let (directory, session) = match next {
            Ok(next) => next,
            Err(e) => {
                tracing::error!("Capture cannot restart: {e}");
                self.halted = Some(e.to_string());
                return Err(e);
            }
        };
        tracing::info!(
            "Restarting capture: {} -> {}",
            self.directory.name(),
            directory.name()
        );
        self.directory = directory;
        self.session = Some(session);
        self.halted = None;
        self.restarts += 1;
        Ok(PassOutcome::Restarted(self.directory.clone()))
    }
}
