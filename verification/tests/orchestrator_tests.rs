//! End-to-end orchestrator scenarios driven by nullable collaborators.

use std::sync::Arc;
use std::time::Duration;

use kyc_nullables::{NullBridge, NullCaptureSource, NullScheduler, NullTransport, RecordingObserver};
use kyc_transport::{
    AuthSpec, NativeBridgeTransport, RequestTemplate, TransportError, VendorTransport,
    WebViewChannel, WebViewTransport,
};
use kyc_types::{
    CaptureKind, DocumentType, FailureKind, RawResponse, RecoveryAction, SessionReference,
    VerificationStatus,
};
use kyc_verification::{
    CaptureResult, FlowOptions, GuardConfig, OrchestratorSettings, SessionEnd, SessionStep,
    VerificationError, VerificationObserver, VerificationOrchestrator, FORCED_TIMEOUT_MESSAGE,
    TIMEOUT_MESSAGE,
};

struct Harness {
    transport: Arc<NullTransport>,
    scheduler: Arc<NullScheduler>,
    observer: Arc<RecordingObserver>,
    orchestrator: VerificationOrchestrator,
}

fn settings(fixed_reference: Option<&str>) -> OrchestratorSettings {
    OrchestratorSettings {
        guards: GuardConfig::for_native(),
        flow: FlowOptions {
            choose_document_type: true,
            default_document_type: DocumentType::Passport,
        },
        template: RequestTemplate::new(AuthSpec::basic("client", "secret")),
        fixed_reference: fixed_reference.map(SessionReference::new),
    }
}

fn harness_with(transport: NullTransport, observer: RecordingObserver, fixed: Option<&str>) -> Harness {
    let transport = Arc::new(transport);
    let scheduler = Arc::new(NullScheduler::new());
    let observer = Arc::new(observer);
    let orchestrator = VerificationOrchestrator::new(
        transport.clone(),
        scheduler.clone(),
        observer.clone(),
        settings(fixed),
    )
    .unwrap();
    Harness {
        transport,
        scheduler,
        observer,
        orchestrator,
    }
}

fn harness() -> Harness {
    harness_with(NullTransport::new(), RecordingObserver::new(), Some("REF-1"))
}

/// intro → document_type → front → (back) → selfie → review → processing
fn run_to_processing(h: &Harness, document_type: DocumentType) {
    assert_eq!(submit_flow(h, document_type), SessionStep::Processing);
}

/// Walk the whole flow and return the step after the final advance.
fn submit_flow(h: &Harness, document_type: DocumentType) -> SessionStep {
    let o = &h.orchestrator;
    o.start().unwrap();
    assert_eq!(o.advance().unwrap(), SessionStep::DocumentType);
    o.select_document_type(document_type).unwrap();
    assert_eq!(o.advance().unwrap(), SessionStep::DocumentFront);
    o.capture("file:///front.jpg").unwrap();
    let next = o.advance().unwrap();
    if document_type.requires_back() {
        assert_eq!(next, SessionStep::DocumentBack);
        o.capture("file:///back.jpg").unwrap();
        assert_eq!(o.advance().unwrap(), SessionStep::Selfie);
    } else {
        assert_eq!(next, SessionStep::Selfie);
    }
    o.capture("file:///selfie.jpg").unwrap();
    assert_eq!(o.advance().unwrap(), SessionStep::Review);
    o.advance().unwrap()
}

#[test]
fn passport_flow_delivers_verified_exactly_once() {
    let h = harness();
    run_to_processing(&h, DocumentType::Passport);

    assert_eq!(h.transport.submission_count(), 1);
    let submission = h.transport.last_submission().unwrap();
    assert_eq!(submission.reference, "REF-1");
    assert_eq!(submission.assets.len(), 2);
    assert_eq!(submission.verification.document.backside_proof_required, 0);

    h.transport
        .respond_json(r#"{"event":"verification.accepted","reference":"REF-1"}"#);

    let completed = h.observer.completed();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].status, VerificationStatus::Verified);
    assert_eq!(completed[0].reference, "REF-1");
    assert_eq!(h.observer.count(), 1);
    assert_eq!(h.orchestrator.step(), Some(SessionStep::Result));

    // Only the force-kill survives, and it does nothing once it fires.
    assert_eq!(h.scheduler.pending(), vec!["force_kill"]);
    h.scheduler.advance(Duration::from_secs(30));
    assert_eq!(h.scheduler.fire_count("force_kill"), 1);
    assert_eq!(h.observer.count(), 1);
}

#[test]
fn explicit_event_beats_legacy_status_code() {
    let h = harness();
    run_to_processing(&h, DocumentType::Passport);
    h.transport
        .respond_json(r#"{"event":"verification.declined","status_code":1000}"#);

    let errors = h.observer.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].status, VerificationStatus::Declined);
    assert_eq!(errors[0].recovery(), Some(RecoveryAction::RetryOrCancel));
}

#[test]
fn primary_timeout_fires_before_force_kill() {
    let h = harness();
    run_to_processing(&h, DocumentType::Passport);

    h.scheduler.advance(Duration::from_secs(15));
    assert_eq!(
        h.scheduler.fired(),
        vec!["early_checkpoint", "mid_checkpoint", "primary_timeout"]
    );
    let errors = h.observer.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].failure, Some(FailureKind::Timeout));
    assert_eq!(errors[0].message.as_deref(), Some(TIMEOUT_MESSAGE));

    h.scheduler.advance(Duration::from_secs(10));
    assert_eq!(
        h.scheduler.fired(),
        vec!["early_checkpoint", "mid_checkpoint", "primary_timeout", "force_kill"]
    );
    assert_eq!(h.observer.count(), 1);
}

#[test]
fn panicking_observer_sees_a_single_timeout() {
    let h = harness_with(NullTransport::new(), RecordingObserver::panicking(), Some("REF-1"));
    run_to_processing(&h, DocumentType::Passport);

    h.scheduler.advance(Duration::from_secs(60));

    assert_eq!(h.scheduler.fire_count("primary_timeout"), 1);
    assert_eq!(h.scheduler.fire_count("force_kill"), 1);
    assert_eq!(h.observer.count(), 1);
    assert_eq!(
        h.orchestrator.outcome().and_then(|o| o.failure),
        Some(FailureKind::Timeout)
    );
}

#[test]
fn stalled_callback_is_terminated_by_force_kill() {
    let h = harness();
    run_to_processing(&h, DocumentType::Passport);

    // The bridge called back but never delivered a payload.
    h.transport.stall();
    assert_eq!(h.scheduler.pending(), vec!["force_kill"]);

    h.scheduler.advance(Duration::from_secs(25));
    assert_eq!(h.scheduler.fire_count("primary_timeout"), 0);
    let errors = h.observer.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message.as_deref(), Some(FORCED_TIMEOUT_MESSAGE));
    assert_eq!(h.orchestrator.step(), Some(SessionStep::Result));
}

#[test]
fn duplicate_and_late_callbacks_are_ignored() {
    let h = harness();
    run_to_processing(&h, DocumentType::Passport);

    h.transport.respond_json(r#"{"event":"verification.accepted"}"#);
    h.transport.respond_json(r#"{"event":"verification.accepted"}"#);
    h.transport.respond_json(r#"{"event":"verification.declined"}"#);
    h.transport.fail(TransportError::Unavailable("late".into()));

    assert_eq!(h.observer.count(), 1);
    assert_eq!(
        h.orchestrator.outcome().map(|o| o.status),
        Some(VerificationStatus::Verified)
    );
}

#[test]
fn callback_after_timeout_is_ignored() {
    let h = harness();
    run_to_processing(&h, DocumentType::Passport);
    h.scheduler.advance(Duration::from_secs(16));
    h.transport.respond_json(r#"{"event":"verification.accepted"}"#);

    assert_eq!(h.observer.count(), 1);
    assert_eq!(h.observer.errors().len(), 1);
}

#[test]
fn id_card_submits_back_side() {
    let h = harness();
    run_to_processing(&h, DocumentType::IdCard);

    let submission = h.transport.last_submission().unwrap();
    assert_eq!(submission.assets.len(), 3);
    let document = &submission.verification.document;
    assert_eq!(document.backside_proof_required, 1);
    assert_eq!(document.additional_proof, "file:///back.jpg");
}

#[test]
fn pending_is_a_soft_success() {
    let h = harness();
    run_to_processing(&h, DocumentType::Passport);
    h.transport.respond_json(r#"{"event":"request.received"}"#);

    let completed = h.observer.completed();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].status, VerificationStatus::Pending);
}

#[test]
fn malformed_callback_is_an_error_outcome() {
    let h = harness();
    run_to_processing(&h, DocumentType::Passport);
    h.transport.respond_json("{{{");

    let errors = h.observer.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].failure, Some(FailureKind::MalformedResponse));
    assert_eq!(errors[0].reference, "REF-1");
}

#[test]
fn synchronous_response_completes_inside_advance() {
    let h = harness_with(
        NullTransport::responding_with(RawResponse::json(r#"{"event":"verification.approved"}"#)),
        RecordingObserver::new(),
        Some("REF-1"),
    );
    let o = &h.orchestrator;
    o.start().unwrap();
    o.advance().unwrap();
    o.advance().unwrap();
    o.capture("front").unwrap();
    o.advance().unwrap();
    o.capture("selfie").unwrap();
    o.advance().unwrap();
    assert_eq!(o.advance().unwrap(), SessionStep::Result);
    assert_eq!(h.observer.completed().len(), 1);
}

#[test]
fn unavailable_transport_fails_and_allows_retry() {
    let h = harness_with(NullTransport::unavailable(), RecordingObserver::new(), None);
    assert_eq!(submit_flow(&h, DocumentType::Passport), SessionStep::Result);

    let errors = h.observer.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].failure, Some(FailureKind::TransportUnavailable));
    let first_reference = h.orchestrator.reference().unwrap();

    h.transport.set_unavailable(false);
    let second_reference = h.orchestrator.retry().unwrap();
    assert_ne!(first_reference, second_reference);
    assert!(second_reference.as_str().starts_with("REF-"));

    let snapshot = h.orchestrator.snapshot().unwrap();
    assert_eq!(snapshot.step, SessionStep::DocumentFront);
    assert_eq!(snapshot.document_type, DocumentType::Passport);
    assert!(snapshot.assets.is_empty());
    assert!(snapshot.outcome.is_none());

    let o = &h.orchestrator;
    o.capture("front").unwrap();
    o.advance().unwrap();
    o.capture("selfie").unwrap();
    o.advance().unwrap();
    o.advance().unwrap();
    h.transport.respond_json(r#"{"event":"verification.accepted"}"#);

    assert_eq!(h.observer.count(), 2);
    assert_eq!(
        h.observer.completed()[0].reference,
        second_reference.as_str()
    );
}

#[test]
fn retry_is_refused_while_in_flight() {
    let h = harness();
    run_to_processing(&h, DocumentType::Passport);
    assert!(matches!(h.orchestrator.retry(), Err(VerificationError::NotFinished)));
    assert!(matches!(
        h.orchestrator.start(),
        Err(VerificationError::AlreadyInProgress(r)) if r == "REF-1"
    ));
}

#[test]
fn cancel_before_submission_aborts_session() {
    let h = harness();
    let o = &h.orchestrator;
    o.start().unwrap();
    o.advance().unwrap();
    o.advance().unwrap();
    o.capture("front").unwrap();

    assert!(o.cancel().unwrap());
    assert_eq!(h.observer.ends(), vec![SessionEnd::Cancelled]);
    assert_eq!(o.step(), None);
    assert_eq!(h.transport.submission_count(), 0);
    assert!(h.scheduler.pending().is_empty());
    assert!(matches!(o.cancel(), Err(VerificationError::NoActiveSession)));
}

#[test]
fn cancel_during_processing_is_best_effort() {
    let h = harness();
    run_to_processing(&h, DocumentType::Passport);

    assert!(!h.orchestrator.cancel().unwrap());
    assert_eq!(h.transport.cancelled(), vec!["REF-1".to_string()]);
    assert_eq!(h.orchestrator.step(), Some(SessionStep::Processing));
    assert_eq!(h.observer.count(), 0);

    h.scheduler.advance(Duration::from_secs(15));
    assert_eq!(h.observer.errors().len(), 1);
}

#[test]
fn back_navigation_is_locked_after_submission() {
    let h = harness();
    run_to_processing(&h, DocumentType::Passport);
    assert!(!h.orchestrator.go_back().unwrap());
    assert!(h.orchestrator.retake(CaptureKind::Selfie).is_err());
    assert_eq!(h.orchestrator.step(), Some(SessionStep::Processing));
}

#[tokio::test]
async fn permission_denied_ends_flow_without_retry() {
    let h = harness();
    let o = &h.orchestrator;
    o.start().unwrap();
    o.advance().unwrap();
    o.advance().unwrap();

    let camera = NullCaptureSource::scripted([
        CaptureResult::Captured("file:///front.jpg".into()),
        CaptureResult::PermissionDenied,
    ]);
    assert_eq!(
        o.capture_with(&camera).await.unwrap(),
        CaptureResult::Captured("file:///front.jpg".into())
    );
    o.advance().unwrap();
    assert_eq!(o.capture_with(&camera).await.unwrap(), CaptureResult::PermissionDenied);

    assert_eq!(camera.requested(), vec![CaptureKind::DocumentFront, CaptureKind::Selfie]);
    let errors = h.observer.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].failure, Some(FailureKind::PermissionDenied));
    assert_eq!(errors[0].recovery(), Some(RecoveryAction::Dismiss));
    assert_eq!(o.step(), Some(SessionStep::Result));
    assert!(matches!(o.retry(), Err(VerificationError::NotRetryable)));
    assert_eq!(h.transport.submission_count(), 0);
}

#[tokio::test]
async fn cancelled_capture_stays_on_step() {
    let h = harness();
    let o = &h.orchestrator;
    o.start().unwrap();
    o.advance().unwrap();
    o.advance().unwrap();

    let camera = NullCaptureSource::scripted([CaptureResult::Cancelled]);
    assert_eq!(o.capture_with(&camera).await.unwrap(), CaptureResult::Cancelled);
    assert_eq!(o.advance().unwrap(), SessionStep::DocumentFront);
    assert_eq!(h.observer.count(), 0);
}

#[test]
fn native_bridge_round_trip() {
    let bridge = Arc::new(NullBridge::new());
    let transport: Arc<dyn VendorTransport> = Arc::new(NativeBridgeTransport::new(bridge.clone()));
    let scheduler = Arc::new(NullScheduler::new());
    let observer = Arc::new(RecordingObserver::new());
    let orchestrator = VerificationOrchestrator::new(
        transport,
        scheduler.clone(),
        observer.clone() as Arc<dyn VerificationObserver>,
        settings(Some("REF-9")),
    )
    .unwrap();

    orchestrator.start().unwrap();
    orchestrator.advance().unwrap();
    orchestrator.advance().unwrap();
    orchestrator.capture("front").unwrap();
    orchestrator.advance().unwrap();
    orchestrator.capture("selfie").unwrap();
    orchestrator.advance().unwrap();
    orchestrator.advance().unwrap();

    let payload = &bridge.payloads()[0];
    assert!(payload.verification_json.contains("REF-9"));
    assert!(payload.config_json.contains("\"verification_timeout\":15"));

    bridge.invoke(r#"{"event":"verification.accepted"}"#);
    bridge.invoke(r#"{"event":"verification.accepted"}"#);
    assert_eq!(observer.completed().len(), 1);
    assert_eq!(observer.completed()[0].reference, "REF-9");
}

#[test]
fn web_view_progress_messages_do_not_end_the_session() {
    let channel = WebViewChannel::new();
    let transport = Arc::new(
        WebViewTransport::for_journey(
            "https://app.shuftipro.com/verification/journey/REF-1",
            channel.clone(),
        )
        .unwrap(),
    );
    let scheduler = Arc::new(NullScheduler::new());
    let observer = Arc::new(RecordingObserver::new());
    let orchestrator = VerificationOrchestrator::new(
        transport,
        scheduler.clone(),
        observer.clone() as Arc<dyn VerificationObserver>,
        settings(Some("REF-1")),
    )
    .unwrap();

    orchestrator.start().unwrap();
    orchestrator.advance().unwrap();
    orchestrator.advance().unwrap();
    orchestrator.capture("front").unwrap();
    orchestrator.advance().unwrap();
    orchestrator.capture("selfie").unwrap();
    orchestrator.advance().unwrap();
    assert_eq!(orchestrator.advance().unwrap(), SessionStep::Processing);

    assert!(!channel.on_message("page loaded"));
    assert!(!channel.on_message(r#"{"event":"verification.status.changed"}"#));
    assert_eq!(observer.count(), 0);
    assert_eq!(orchestrator.step(), Some(SessionStep::Processing));

    assert!(channel.on_message(r#"{"event":"verification.accepted"}"#));
    let completed = observer.completed();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].status, VerificationStatus::Verified);
    assert_eq!(observer.count(), 1);
}

#[test]
fn primary_timeout_stops_the_transport() {
    let h = harness();
    run_to_processing(&h, DocumentType::Passport);

    h.scheduler.advance(Duration::from_secs(15));
    assert_eq!(h.observer.errors().len(), 1);
    assert_eq!(h.transport.cancelled(), vec!["REF-1".to_string()]);

    h.scheduler.advance(Duration::from_secs(10));
    assert_eq!(h.transport.cancelled().len(), 1);
}

#[test]
fn force_kill_stops_the_transport() {
    let h = harness();
    run_to_processing(&h, DocumentType::Passport);
    h.transport.stall();

    h.scheduler.advance(Duration::from_secs(25));
    assert_eq!(h.observer.errors()[0].message.as_deref(), Some(FORCED_TIMEOUT_MESSAGE));
    assert_eq!(h.transport.cancelled(), vec!["REF-1".to_string()]);
}

#[test]
fn vendor_answer_does_not_cancel_the_transport() {
    let h = harness();
    run_to_processing(&h, DocumentType::Passport);
    h.transport.respond_json(r#"{"event":"verification.accepted"}"#);

    h.scheduler.advance(Duration::from_secs(60));
    assert!(h.transport.cancelled().is_empty());
}
