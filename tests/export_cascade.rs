//! Export pipeline cascade, re-entrancy and timeout behaviour.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use invitecard_core::{
    artifact::{DirectorySink, MemorySink},
    config::SessionConfig,
    fields::{Field, InvitationFields},
    pipeline::{AttemptOutcome, ExportPipeline, FailureKind, PipelineError, StrategyError, StrategyKind, EXHAUSTED_GUIDANCE},
    print::SpoolSurface,
    session::{InvitationSession, SessionError},
    ArtifactFormat, Severity,
};

use common::{
    blocked_surface, standard_session, CaptureBehaviour, FailingStrategy, FakeCapability, RecordingSurface,
    SlowStrategy, PNG_MAGIC,
};

async fn generated(h: &common::Harness, guest: &str) {
    h.session.set_field(Field::GuestName, guest);
    h.session.generate().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn capture_success_delivers_png() {
    let capability = FakeCapability::new(CaptureBehaviour::Succeed);
    let h = standard_session(Some(capability.clone()), MemorySink::new(), blocked_surface());
    generated(&h, "Asha  Rao").await;

    let report = h.session.download().await.unwrap();
    assert_eq!(report.strategy, StrategyKind::SnapshotCapture);
    assert_eq!(report.attempts.len(), 1);
    assert_eq!(report.delivered.filename, "Satya_Narayana_Pooja_Asha_Rao.png");
    assert_eq!(report.delivered.format, ArtifactFormat::Png);

    let delivered = h.sink.delivered();
    assert_eq!(delivered[0].bytes, PNG_MAGIC.to_vec());
    assert_eq!(capability.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn capture_failure_cascades_to_document() {
    let capability = FakeCapability::new(CaptureBehaviour::Fail);
    let h = standard_session(Some(capability.clone()), MemorySink::new(), blocked_surface());
    generated(&h, "Asha").await;

    let report = h.session.download().await.unwrap();
    assert_eq!(report.strategy, StrategyKind::StandaloneDocument);
    assert!(matches!(
        report.attempts[0].outcome,
        AttemptOutcome::Failure { kind: FailureKind::DeliveryFailure, .. }
    ));

    // Both strategies consumed the same document.
    let captured = capability.seen_html.lock()[0].clone();
    assert_eq!(captured.as_bytes(), h.sink.delivered()[0].bytes.as_slice());
}

#[tokio::test(start_paused = true)]
async fn hanging_capture_times_out_and_cascades() {
    let capability = FakeCapability::new(CaptureBehaviour::Hang);
    let h = standard_session(Some(capability), MemorySink::new(), blocked_surface());
    generated(&h, "Asha").await;

    let report = h.session.download().await.unwrap();
    assert_eq!(report.strategy, StrategyKind::StandaloneDocument);
    match &report.attempts[0].outcome {
        AttemptOutcome::Failure { kind, .. } => assert_eq!(*kind, FailureKind::TimedOut),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(report.attempts[0].elapsed_ms >= 10_000);
}

#[tokio::test(start_paused = true)]
async fn document_refusal_falls_through_to_print() {
    let surface = RecordingSurface::default();
    let h = standard_session(None, MemorySink::refusing(), Arc::new(surface.clone()));
    generated(&h, "Asha Rao").await;

    let report = h.session.download().await.unwrap();
    assert_eq!(report.strategy, StrategyKind::PrintDialog);
    assert_eq!(
        report.attempts.iter().map(|a| a.strategy).collect::<Vec<_>>(),
        vec![StrategyKind::SnapshotCapture, StrategyKind::StandaloneDocument, StrategyKind::PrintDialog]
    );
    assert_eq!(surface.printed(), 1);
    assert_eq!(surface.closed.load(Ordering::SeqCst), 1);
    assert_eq!(surface.opened.lock()[0], "Satya_Narayana_Pooja_Asha_Rao.pdf");
    let written = surface.written.lock()[0].clone();
    assert!(written.contains("Dear Asha Rao"));
    assert!(written.contains("window.print()"));
    assert_eq!(report.delivered.size_bytes, written.len());
}

#[tokio::test(start_paused = true)]
async fn blocked_print_surface_exhausts_and_reenables_download() {
    let h = standard_session(None, MemorySink::refusing(), blocked_surface());
    generated(&h, "Asha").await;

    let err = h.session.download().await.unwrap_err();
    match &err {
        SessionError::Export(PipelineError::Exhausted { attempts }) => {
            assert_eq!(attempts.len(), 3);
            assert!(attempts.iter().all(|a| !a.succeeded()));
        }
        other => panic!("unexpected error {other:?}"),
    }

    assert!(h.session.controls().download_enabled);
    assert!(!h.session.pipeline().is_in_flight());

    let note = h.session.notifier().current().unwrap();
    assert_eq!(note.notification.severity, Severity::Error);
    assert_eq!(note.notification.message, EXHAUSTED_GUIDANCE);

    // A retry is possible straight away.
    assert!(matches!(h.session.download().await, Err(SessionError::Export(PipelineError::Exhausted { .. }))));
}

#[tokio::test(start_paused = true)]
async fn overlapping_downloads_are_refused() {
    let log = Arc::new(Mutex::new(vec![]));
    let pipeline = ExportPipeline::new(vec![Box::new(SlowStrategy {
        delay: Duration::from_secs(1),
        log: Arc::clone(&log),
    })]);
    let session = InvitationSession::new(SessionConfig::default(), pipeline);
    session.set_field(Field::GuestName, "Asha");
    session.generate().await.unwrap();

    let (first, second) = tokio::join!(session.download(), session.download());
    assert!(first.is_ok());
    assert!(matches!(second, Err(SessionError::Busy)));
    assert_eq!(log.lock().len(), 1);
    assert!(session.controls().download_enabled);
}

#[tokio::test(start_paused = true)]
async fn pipeline_guard_refuses_concurrent_runs() {
    let log = Arc::new(Mutex::new(vec![]));
    let pipeline = ExportPipeline::new(vec![Box::new(SlowStrategy {
        delay: Duration::from_secs(1),
        log: Arc::clone(&log),
    })]);
    let fields = InvitationFields::new("Asha", "", "");

    let (first, second) = tokio::join!(pipeline.run(&fields), pipeline.run(&fields));
    assert!(first.is_ok());
    assert!(matches!(second, Err(PipelineError::Busy)));
    assert!(!pipeline.is_in_flight());
}

#[tokio::test(start_paused = true)]
async fn strategies_run_strictly_in_order() {
    let log = Arc::new(Mutex::new(vec![]));
    let pipeline = ExportPipeline::new(vec![
        Box::new(FailingStrategy {
            kind: StrategyKind::SnapshotCapture,
            error: StrategyError::CapabilityUnavailable("absent".into()),
            delay: Duration::ZERO,
            log: Arc::clone(&log),
        }),
        Box::new(FailingStrategy {
            kind: StrategyKind::StandaloneDocument,
            error: StrategyError::DeliveryFailure("no download".into()),
            delay: Duration::ZERO,
            log: Arc::clone(&log),
        }),
        Box::new(SlowStrategy { delay: Duration::from_millis(5), log: Arc::clone(&log) }),
    ]);

    let report = pipeline.run(&InvitationFields::new("Asha", "", "")).await.unwrap();
    assert_eq!(report.attempts.len(), 3);
    assert_eq!(
        *log.lock(),
        vec![StrategyKind::SnapshotCapture, StrategyKind::StandaloneDocument, StrategyKind::StandaloneDocument]
    );
}

#[tokio::test(start_paused = true)]
async fn cancellation_is_observed_between_attempts() {
    let log = Arc::new(Mutex::new(vec![]));
    let pipeline = Arc::new(ExportPipeline::new(vec![
        Box::new(FailingStrategy {
            kind: StrategyKind::SnapshotCapture,
            error: StrategyError::TimedOut(1000),
            delay: Duration::from_secs(1),
            log: Arc::clone(&log),
        }),
        Box::new(SlowStrategy { delay: Duration::from_millis(5), log: Arc::clone(&log) }),
    ]));

    let runner = {
        let pipeline = Arc::clone(&pipeline);
        tokio::spawn(async move { pipeline.run(&InvitationFields::new("Asha", "", "")).await })
    };
    // Let the run reach its first attempt before cancelling.
    tokio::task::yield_now().await;
    assert!(pipeline.is_in_flight());
    pipeline.cancel_handle().cancel();

    let err = runner.await.unwrap().unwrap_err();
    assert!(matches!(err, PipelineError::Cancelled { ref attempts } if attempts.len() == 1));
    assert_eq!(*log.lock(), vec![StrategyKind::SnapshotCapture]);
    assert!(!pipeline.is_in_flight());
}

#[tokio::test(start_paused = true)]
async fn cancelled_download_posts_info_and_releases_control() {
    let log = Arc::new(Mutex::new(vec![]));
    let pipeline = ExportPipeline::new(vec![
        Box::new(FailingStrategy {
            kind: StrategyKind::SnapshotCapture,
            error: StrategyError::CapabilityUnavailable("absent".into()),
            delay: Duration::from_secs(1),
            log: Arc::clone(&log),
        }),
        Box::new(SlowStrategy { delay: Duration::from_millis(5), log: Arc::clone(&log) }),
    ]);
    let session = Arc::new(InvitationSession::new(SessionConfig::default(), pipeline));
    session.set_field(Field::GuestName, "Asha");
    session.generate().await.unwrap();

    let runner = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.download().await })
    };
    tokio::task::yield_now().await;
    assert!(!session.controls().download_enabled);
    session.cancel_download();

    let result = runner.await.unwrap();
    assert!(matches!(result, Err(SessionError::Export(PipelineError::Cancelled { .. }))));
    assert!(session.controls().download_enabled);
    assert_eq!(session.notifier().current().unwrap().notification.severity, Severity::Info);
}

fn directory_session(out: &std::path::Path) -> InvitationSession {
    let config = SessionConfig::default();
    let pipeline = ExportPipeline::standard(
        None,
        Arc::new(DirectorySink::new(out)),
        Arc::new(SpoolSurface::new(out)),
        &config,
    );
    InvitationSession::new(config, pipeline)
}

#[tokio::test(start_paused = true)]
async fn separator_in_guest_name_still_delivers_document() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let session = directory_session(&out);
    session.set_field(Field::GuestName, "AC/DC");
    session.generate().await.unwrap();

    let report = session.download().await.unwrap();
    assert_eq!(report.strategy, StrategyKind::StandaloneDocument);
    assert_eq!(report.delivered.filename, "Satya_Narayana_Pooja_AC_DC.html");

    let written = out.join("Satya_Narayana_Pooja_AC_DC.html");
    assert!(written.is_file());
    assert_eq!(report.delivered.location.as_deref(), Some(written.display().to_string().as_str()));
}

#[tokio::test(start_paused = true)]
async fn traversal_in_guest_name_stays_inside_out_dir() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let session = directory_session(&out);
    session.set_field(Field::GuestName, "x/../../escaped");
    session.generate().await.unwrap();

    let report = session.download().await.unwrap();
    assert_eq!(report.strategy, StrategyKind::StandaloneDocument);

    let entries: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(entries, vec![std::ffi::OsString::from("out")]);
    assert!(out.join(&report.delivered.filename).is_file());
}
