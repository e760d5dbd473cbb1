//! Capture Pipeline Integration Tests
//!
//! Runs whole capture attempts against the scripted backend and engine:
//! - Successful capture and reconstruction ends in a preview
//! - Session failures restart in a fresh timestamped directory
//! - Reconstruction failures restart the same way
//! - Dismissing the preview starts a new attempt
//! - A restart that cannot create its directory leaves the pipeline failed

use std::sync::Arc;

use arbore_capture::{
    CaptureConfig, CaptureError, CapturePipeline, CaptureState, EngineScript, PassOutcome,
    PrimaryAction, SessionScript, SimulatedBackend, SimulatedPhotogrammetry,
};

fn pipeline(
    docs: &std::path::Path,
    sessions: Vec<SessionScript>,
    jobs: Vec<EngineScript>,
) -> CapturePipeline {
    let config = CaptureConfig {
        documents_dir: docs.to_path_buf(),
    };
    CapturePipeline::start(
        Arc::new(SimulatedBackend::with_scripts(sessions)),
        Arc::new(SimulatedPhotogrammetry::with_scripts(jobs)),
        &config,
    )
    .expect("pipeline starts")
}

fn press_twice(pipeline: &mut CapturePipeline) {
    assert_eq!(
        pipeline.trigger_primary().expect("detect"),
        PrimaryAction::StartDetecting
    );
    assert_eq!(
        pipeline.trigger_primary().expect("capture"),
        PrimaryAction::StartCapturing
    );
}

fn scan_count(docs: &std::path::Path) -> usize {
    std::fs::read_dir(docs.join("Scans")).expect("scans").count()
}

// ============================================================================
// Happy path
// ============================================================================

#[tokio::test]
async fn test_successful_pass_shows_preview() {
    let docs = tempfile::tempdir().expect("tempdir");
    let mut pipeline = pipeline(docs.path(), vec![], vec![]);
    assert_eq!(pipeline.status_label(), "ready");
    assert_eq!(pipeline.primary_action(), Some(PrimaryAction::StartDetecting));

    press_twice(&mut pipeline);
    assert_eq!(pipeline.state(), CaptureState::Capturing);

    let outcome = pipeline.run_pass().await.expect("pass");
    let expected = pipeline.directory().model_output();
    assert_eq!(outcome, PassOutcome::Preview(expected.clone()));
    assert!(expected.is_file());
    assert_eq!(pipeline.preview(), Some(&expected));
    assert_eq!(pipeline.restarts(), 0);
    assert_eq!(scan_count(docs.path()), 1);
}

#[tokio::test]
async fn test_button_unavailable_while_capturing() {
    let docs = tempfile::tempdir().expect("tempdir");
    let mut pipeline = pipeline(docs.path(), vec![], vec![]);
    press_twice(&mut pipeline);

    assert_eq!(pipeline.primary_action(), None);
    assert!(matches!(
        pipeline.trigger_primary(),
        Err(CaptureError::InvalidState(_))
    ));
}

#[tokio::test]
async fn test_dismiss_preview_starts_new_attempt() {
    let docs = tempfile::tempdir().expect("tempdir");
    let mut pipeline = pipeline(docs.path(), vec![], vec![]);
    press_twice(&mut pipeline);
    pipeline.run_pass().await.expect("pass");
    let first = pipeline.directory().clone();

    let next = pipeline.dismiss_preview().expect("dismiss").clone();
    assert_ne!(next.root, first.root);
    assert!(first.model_output().is_file());
    assert!(pipeline.preview().is_none());
    assert_eq!(pipeline.status_label(), "ready");
    assert_eq!(pipeline.restarts(), 1);
}

// ============================================================================
// Restart on failure
// ============================================================================

#[tokio::test]
async fn test_session_failure_restarts_in_new_directory() {
    let docs = tempfile::tempdir().expect("tempdir");
    let mut pipeline = pipeline(
        docs.path(),
        vec![SessionScript::FailWhileCapturing("tracking lost".to_string())],
        vec![],
    );
    let first = pipeline.directory().clone();
    press_twice(&mut pipeline);

    let outcome = pipeline.run_pass().await.expect("pass");
    let PassOutcome::Restarted(second) = outcome else {
        panic!("expected restart, got {outcome:?}");
    };
    assert_ne!(second.root, first.root);
    assert!(first.images.is_dir());
    assert_eq!(std::fs::read_dir(&first.images).expect("images").count(), 0);
    assert_eq!(pipeline.state(), CaptureState::Ready);
    assert_eq!(pipeline.restarts(), 1);
    assert_eq!(scan_count(docs.path()), 2);

    // The replacement session runs normally.
    press_twice(&mut pipeline);
    let outcome = pipeline.run_pass().await.expect("second pass");
    assert_eq!(outcome, PassOutcome::Preview(second.model_output()));
}

#[tokio::test]
async fn test_reconstruction_failures_restart() {
    for script in [
        EngineScript::FailToStart("engine unavailable".to_string()),
        EngineScript::RequestError("not enough overlap".to_string()),
        EngineScript::Cancel,
    ] {
        let docs = tempfile::tempdir().expect("tempdir");
        let mut pipeline = pipeline(docs.path(), vec![], vec![script.clone()]);
        let first = pipeline.directory().clone();
        press_twice(&mut pipeline);

        let outcome = pipeline.run_pass().await.expect("pass");
        assert!(
            matches!(&outcome, PassOutcome::Restarted(dir) if dir.root != first.root),
            "{script:?} gave {outcome:?}"
        );
        assert!(pipeline.preview().is_none());
        assert_eq!(pipeline.restarts(), 1);
    }
}

#[tokio::test]
async fn test_run_pass_without_capturing_restarts() {
    let docs = tempfile::tempdir().expect("tempdir");
    let mut pipeline = pipeline(docs.path(), vec![], vec![]);

    // Only the Ready event is queued; the session then goes quiet.
    let outcome = pipeline.run_pass().await.expect("pass");
    assert!(matches!(outcome, PassOutcome::Restarted(_)));
    assert_eq!(pipeline.status_label(), "ready");
}

// ============================================================================
// Storage failures
// ============================================================================

#[tokio::test]
async fn test_restart_without_storage_reports_failure() {
    let docs = tempfile::tempdir().expect("tempdir");
    let mut pipeline = pipeline(docs.path(), vec![], vec![]);
    press_twice(&mut pipeline);
    assert!(matches!(
        pipeline.run_pass().await.expect("pass"),
        PassOutcome::Preview(_)
    ));
    let last = pipeline.directory().clone();

    let scans = docs.path().join("Scans");
    std::fs::remove_dir_all(&scans).expect("remove scans");
    std::fs::write(&scans, b"not a directory").expect("block scans");

    assert!(matches!(
        pipeline.dismiss_preview(),
        Err(CaptureError::Storage { .. })
    ));
    assert!(matches!(pipeline.state(), CaptureState::Failed(_)));
    assert!(pipeline.status_label().starts_with("failed"));
    assert_eq!(pipeline.primary_action(), None);
    assert_eq!(pipeline.directory(), &last);
    assert_eq!(pipeline.restarts(), 0);
    assert!(matches!(
        pipeline.run_pass().await,
        Err(CaptureError::NoSession)
    ));
}
