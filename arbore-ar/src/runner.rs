//! Drivers for the `place` and `capture` commands.
//!
//! The placement runner is the single owner of the [`PlacementSession`].
//! Model loads run on tokio tasks and report back over an unbounded channel;
//! completions are applied here, one at a time, between input steps.
//!
//! ```text
//! Step ──► session ──► Outcome::LoadRequested ──► AssetLoader::spawn ──┐
//!            ▲                                                         │
//!            └──────────── complete_load ◄──── LoadCompletion ◄────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use arbore_assets::AssetLoader;
use arbore_capture::{
    CaptureConfig, CapturePipeline, CaptureResult, EngineScript, PassOutcome, SessionScript,
    SimulatedBackend, SimulatedPhotogrammetry,
};
use arbore_core::{
    InputEvent, LoadCompletion, Outcome, PlacementSession, SessionConfig, SessionSummary,
    SimulatedHost,
};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::scenario::{Scenario, Step};

/// What a scenario run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Every outcome, in the order it happened.
    pub outcomes: Vec<Outcome>,
    /// Final scene.
    pub summary: SessionSummary,
}

/// Replays scenario steps against a session and its model loads.
#[derive(Debug)]
pub struct PlacementRunner {
    session: PlacementSession,
    host: SimulatedHost,
    loader: AssetLoader,
    completions_tx: mpsc::UnboundedSender<LoadCompletion>,
    completions_rx: mpsc::UnboundedReceiver<LoadCompletion>,
    in_flight: usize,
    outcomes: Vec<Outcome>,
}

impl PlacementRunner {
    /// Start a session in the scenario's world.
    #[must_use]
    pub fn new(mut config: SessionConfig, scenario: &Scenario, loader: AssetLoader) -> Self {
        config.tracking = scenario.tracking;
        let session = PlacementSession::with_config(config);
        let mut host = scenario.host();
        session.start(&mut host);
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            session,
            host,
            loader,
            completions_tx,
            completions_rx,
            in_flight: 0,
            outcomes: Vec::new(),
        }
    }

    /// The session.
    #[must_use]
    pub const fn session(&self) -> &PlacementSession {
        &self.session
    }

    /// Loads spawned but not yet applied.
    #[must_use]
    pub const fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Apply one step.
    pub async fn step(&mut self, step: &Step) {
        // Completions that already arrived are applied before new input.
        self.drain_ready();
        let outcomes = match step {
            Step::Touch { event } => self
                .session
                .handle_input(&self.host, &InputEvent::Touch(event.clone())),
            Step::Gesture { gesture } => vec![self.session.handle_gesture(&self.host, gesture)],
            Step::Poll { now_ms } => self.session.poll(&self.host, *now_ms),
            Step::Settle => {
                self.settle().await;
                Vec::new()
            }
            Step::Camera { camera } => {
                self.host.set_camera(*camera);
                Vec::new()
            }
        };
        for outcome in outcomes {
            self.record(outcome);
        }
    }

    /// Wait for every spawned load and apply it.
    pub async fn settle(&mut self) {
        while self.in_flight > 0 {
            let Some(completion) = self.completions_rx.recv().await else {
                break;
            };
            self.apply_completion(completion);
        }
    }

    /// Run all steps, settle outstanding loads and report.
    pub async fn run(mut self, steps: &[Step]) -> RunReport {
        for step in steps {
            self.step(step).await;
        }
        self.settle().await;
        RunReport {
            summary: self.session.summary(),
            outcomes: self.outcomes,
        }
    }

    fn drain_ready(&mut self) {
        while let Ok(completion) = self.completions_rx.try_recv() {
            self.apply_completion(completion);
        }
    }

    fn apply_completion(&mut self, completion: LoadCompletion) {
        self.in_flight = self.in_flight.saturating_sub(1);
        tracing::debug!(
            "Load {} finished: {}",
            completion.token,
            completion.result.describe()
        );
        let outcome = self.session.complete_load(completion);
        self.record(outcome);
    }

    fn record(&mut self, outcome: Outcome) {
        if let Outcome::LoadRequested { token, .. } = &outcome {
            if let Some(request) = self.session.load_request(*token) {
                drop(self.loader.spawn(request, self.completions_tx.clone()));
                self.in_flight += 1;
            }
        }
        self.outcomes.push(outcome);
    }
}

/// How many capture attempts to run and how many of them fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapturePlan {
    /// Previews to produce.
    pub passes: u32,
    /// Capture sessions that fail first.
    pub session_failures: u32,
    /// Reconstructions that fail first.
    pub reconstruction_failures: u32,
}

impl Default for CapturePlan {
    fn default() -> Self {
        Self {
            passes: 1,
            session_failures: 0,
            reconstruction_failures: 0,
        }
    }
}

/// What a capture run produced.
#[derive(Debug, Clone, Serialize)]
pub struct CaptureReport {
    /// Reconstructed models, one per successful pass.
    pub previews: Vec<PathBuf>,
    /// Attempts abandoned and restarted.
    pub restarts: usize,
    /// Scan directory of the session left running.
    pub directory: PathBuf,
    /// Status label of that session.
    pub status: String,
}

/// Run simulated capture passes until `plan.passes` previews exist.
///
/// Every preview is dismissed, which starts the next attempt.
///
/// # Errors
///
/// Returns an error if a scan directory cannot be created.
pub async fn run_capture(config: &CaptureConfig, plan: CapturePlan) -> CaptureResult<CaptureReport> {
    let backend = SimulatedBackend::with_scripts(
        (0..plan.session_failures)
            .map(|i| SessionScript::FailWhileCapturing(format!("simulated failure {}", i + 1))),
    );
    let engine = SimulatedPhotogrammetry::with_scripts(
        (0..plan.reconstruction_failures)
            .map(|i| EngineScript::RequestError(format!("simulated failure {}", i + 1))),
    );
    let mut pipeline = CapturePipeline::start(Arc::new(backend), Arc::new(engine), config)?;

    let mut previews = Vec::new();
    let wanted = usize::try_from(plan.passes).unwrap_or(usize::MAX);
    while previews.len() < wanted {
        tracing::info!("Capture status: {}", pipeline.status_label());
        while pipeline.primary_action().is_some() {
            let action = pipeline.trigger_primary()?;
            tracing::info!("Pressed \"{}\"", action.label());
        }
        match pipeline.run_pass().await? {
            PassOutcome::Preview(model) => {
                tracing::info!("Preview ready: {}", model.display());
                previews.push(model);
                pipeline.dismiss_preview()?;
            }
            PassOutcome::Restarted(dir) => {
                tracing::info!("Retrying in {}", dir.root.display());
            }
        }
    }

    Ok(CaptureReport {
        previews,
        restarts: pipeline.restarts(),
        directory: pipeline.directory().root.clone(),
        status: pipeline.status_label(),
    })
}
