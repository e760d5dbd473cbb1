//! Scripted capture backend and reconstruction engine.
//!
//! Each new session or job takes the next script from a queue; once the
//! queue is empty, everything succeeds. Sessions write placeholder photos
//! and the engine writes a one-triangle glTF document, so a successful run
//! leaves a loadable model behind.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};

use crate::backend::{CaptureBackend, CaptureEvent, CaptureSession, PhotogrammetryEngine, PhotogrammetryOutput};
use crate::error::{CaptureError, CaptureResult};
use crate::state::CaptureState;

/// Photos written per simulated capture.
pub const SIMULATED_PHOTO_COUNT: usize = 3;

const TRIANGLE_GLTF: &str = r#"{"asset":{"version":"2.0","generator":"arbore-capture simulator"},"scene":0,"scenes":[{"nodes":[0]}],"nodes":[{"name":"scan","mesh":0}],"meshes":[{"primitives":[{"attributes":{"POSITION":0}}]}],"buffers":[{"uri":"data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAA","byteLength":36}],"bufferViews":[{"buffer":0,"byteLength":36}],"accessors":[{"bufferView":0,"componentType":5126,"count":3,"type":"VEC3","min":[0,0,0],"max":[1,1,0]}]}"#;

/// How a simulated capture session behaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionScript {
    /// Detect, capture, complete a scan pass, finish.
    Succeed,
    /// Fail with this reason once capturing starts.
    FailWhileCapturing(String),
}

/// How a simulated reconstruction job behaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineScript {
    /// Report progress and write the model.
    Succeed,
    /// Report a request error.
    RequestError(String),
    /// Report cancellation.
    Cancel,
    /// Refuse to start.
    FailToStart(String),
}

fn pop_or<T>(queue: &Mutex<VecDeque<T>>, default: T) -> T {
    queue
        .lock()
        .map(|mut q| q.pop_front())
        .ok()
        .flatten()
        .unwrap_or(default)
}

/// Backend handing out [`SimulatedSession`]s.
#[derive(Debug, Default)]
pub struct SimulatedBackend {
    scripts: Mutex<VecDeque<SessionScript>>,
}

impl SimulatedBackend {
    /// Backend whose sessions follow `scripts` in order, then succeed.
    #[must_use]
    pub fn with_scripts(scripts: impl IntoIterator<Item = SessionScript>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into_iter().collect()),
        }
    }
}

impl CaptureBackend for SimulatedBackend {
    fn new_session(&self) -> Box<dyn CaptureSession> {
        Box::new(SimulatedSession::new(pop_or(&self.scripts, SessionScript::Succeed)))
    }
}

/// Capture session driven by a script instead of a camera.
#[derive(Debug)]
pub struct SimulatedSession {
    script: SessionScript,
    state: CaptureState,
    images: Option<PathBuf>,
    events: VecDeque<CaptureEvent>,
}

impl SimulatedSession {
    /// Session in [`CaptureState::Initializing`].
    #[must_use]
    pub fn new(script: SessionScript) -> Self {
        Self {
            script,
            state: CaptureState::Initializing,
            images: None,
            events: VecDeque::new(),
        }
    }

    fn transition(&mut self, state: CaptureState) {
        self.state = state.clone();
        self.events.push_back(CaptureEvent::StateChanged(state));
    }

    fn write_photos(&self) {
        let Some(dir) = &self.images else { return };
        for i in 0..SIMULATED_PHOTO_COUNT {
            let path = dir.join(format!("IMG_{i:04}.HEIC"));
            if let Err(e) = std::fs::write(&path, b"simulated photo") {
                tracing::warn!("Could not write {}: {e}", path.display());
            }
        }
    }
}

#[async_trait]
impl CaptureSession for SimulatedSession {
    fn state(&self) -> CaptureState {
        self.state.clone()
    }

    fn start(&mut self, images: &Path) -> CaptureResult<()> {
        if self.state != CaptureState::Initializing {
            return Err(CaptureError::SessionStart(format!(
                "session already {}",
                self.state.label()
            )));
        }
        self.images = Some(images.to_path_buf());
        self.transition(CaptureState::Ready);
        Ok(())
    }

    fn start_detecting(&mut self) -> bool {
        if self.state != CaptureState::Ready {
            return false;
        }
        self.transition(CaptureState::Detecting);
        true
    }

    fn start_capturing(&mut self) {
        if self.state != CaptureState::Detecting {
            return;
        }
        self.transition(CaptureState::Capturing);
        match self.script.clone() {
            SessionScript::Succeed => {
                self.write_photos();
                self.events.push_back(CaptureEvent::ScanPassCompleted);
            }
            SessionScript::FailWhileCapturing(reason) => {
                self.transition(CaptureState::Failed(reason));
            }
        }
    }

    fn finish(&mut self) {
        if self.state != CaptureState::Capturing {
            return;
        }
        self.transition(CaptureState::Finishing);
        self.transition(CaptureState::Completed);
    }

    fn cancel(&mut self) {
        self.events.clear();
        if self.state.is_active() {
            self.state = CaptureState::Failed("cancelled".to_string());
        }
    }

    async fn next_event(&mut self) -> Option<CaptureEvent> {
        self.events.pop_front()
    }
}

/// Reconstruction engine following scripts, then succeeding.
#[derive(Debug, Default)]
pub struct SimulatedPhotogrammetry {
    scripts: Mutex<VecDeque<EngineScript>>,
}

impl SimulatedPhotogrammetry {
    /// Engine whose jobs follow `scripts` in order, then succeed.
    #[must_use]
    pub fn with_scripts(scripts: impl IntoIterator<Item = EngineScript>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into_iter().collect()),
        }
    }
}

#[async_trait]
impl PhotogrammetryEngine for SimulatedPhotogrammetry {
    async fn process(
        &self,
        images: &Path,
        output: &Path,
    ) -> CaptureResult<BoxStream<'static, PhotogrammetryOutput>> {
        let script = pop_or(&self.scripts, EngineScript::Succeed);
        let events = match script {
            EngineScript::FailToStart(reason) => return Err(CaptureError::Reconstruction(reason)),
            EngineScript::RequestError(reason) => vec![
                PhotogrammetryOutput::Progress(0.3),
                PhotogrammetryOutput::RequestError(reason),
            ],
            EngineScript::Cancel => vec![
                PhotogrammetryOutput::Progress(0.1),
                PhotogrammetryOutput::ProcessingCancelled,
            ],
            EngineScript::Succeed => {
                let photos = std::fs::read_dir(images).map(Iterator::count).unwrap_or(0);
                if photos == 0 {
                    vec![PhotogrammetryOutput::RequestError(format!(
                        "no photos in {}",
                        images.display()
                    ))]
                } else {
                    std::fs::write(output, TRIANGLE_GLTF)
                        .map_err(|e| CaptureError::Reconstruction(e.to_string()))?;
                    vec![
                        PhotogrammetryOutput::Progress(0.5),
                        PhotogrammetryOutput::Progress(1.0),
                        PhotogrammetryOutput::RequestComplete(output.to_path_buf()),
                        PhotogrammetryOutput::ProcessingComplete,
                    ]
                }
            }
        };
        Ok(stream::iter(events).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_session_script_succeeds() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut session = SimulatedSession::new(SessionScript::Succeed);
        session.start(dir.path()).expect("start");
        assert!(session.start_detecting());
        session.start_capturing();

        let mut seen = Vec::new();
        while let Some(event) = session.next_event().await {
            if event == CaptureEvent::ScanPassCompleted {
                session.finish();
            }
            seen.push(event);
        }
        assert_eq!(seen.last(), Some(&CaptureEvent::StateChanged(CaptureState::Completed)));
        assert_eq!(
            std::fs::read_dir(dir.path()).expect("read").count(),
            SIMULATED_PHOTO_COUNT
        );
    }

    #[test]
    fn test_detecting_requires_ready() {
        let mut session = SimulatedSession::new(SessionScript::Succeed);
        assert!(!session.start_detecting());
    }

    #[tokio::test]
    async fn test_engine_without_photos_reports_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let engine = SimulatedPhotogrammetry::default();
        let outputs: Vec<_> = engine
            .process(dir.path(), &dir.path().join("model.glb"))
            .await
            .expect("stream")
            .collect()
            .await;
        assert!(matches!(outputs.as_slice(), [PhotogrammetryOutput::RequestError(_)]));
    }
}
