//! Host-level scenarios: persistence, metrics and transport selection.

use std::sync::Arc;
use std::time::Duration;

use kyc_app::{AppConfig, AppError, HostBindings, KycApp, TransportKind};
use kyc_nullables::{NullBridge, NullPreferenceStore, NullScheduler, NullTransport, RecordingObserver};
use kyc_store::record::{
    KEY_STORAGE_VERSION, KEY_VERIFICATION_REFERENCE, KEY_VERIFICATION_STATUS, KEY_VERIFIED_EMAIL,
};
use kyc_store::{RecordStatus, CURRENT_SCHEMA_VERSION};
use kyc_verification::{SessionStep, VerificationOrchestrator};

struct Host {
    app: KycApp,
    store: Arc<NullPreferenceStore>,
    transport: Arc<NullTransport>,
    scheduler: Arc<NullScheduler>,
    observer: Arc<RecordingObserver>,
    orchestrator: VerificationOrchestrator,
}

fn config() -> AppConfig {
    let mut config = AppConfig::default();
    config.vendor.access_token = Some("token".into());
    config.vendor.email = Some("user@example.com".into());
    config.flow.choose_document_type = false;
    config
}

fn host_with(store: NullPreferenceStore) -> Host {
    let store = Arc::new(store);
    let app = KycApp::with_store(config(), store.clone()).unwrap();
    let transport = Arc::new(NullTransport::new());
    let scheduler = Arc::new(NullScheduler::new());
    let observer = Arc::new(RecordingObserver::new());
    let orchestrator = app
        .orchestrator(transport.clone(), scheduler.clone(), observer.clone())
        .unwrap();
    Host {
        app,
        store,
        transport,
        scheduler,
        observer,
        orchestrator,
    }
}

fn host() -> Host {
    host_with(NullPreferenceStore::new())
}

/// intro → front → selfie → review → processing (passport, no type choice)
fn submit(host: &Host) -> String {
    let reference = host.app.start_session(&host.orchestrator).unwrap();
    let o = &host.orchestrator;
    assert_eq!(o.advance().unwrap(), SessionStep::DocumentFront);
    o.capture("file:///front.jpg").unwrap();
    o.advance().unwrap();
    o.capture("file:///selfie.jpg").unwrap();
    o.advance().unwrap();
    assert_eq!(o.advance().unwrap(), SessionStep::Processing);
    reference.into_string()
}

#[test]
fn verified_outcome_is_persisted_with_email() {
    let host = host();
    let reference = submit(&host);
    host.transport.respond_json(r#"{"event":"verification.accepted"}"#);

    let record = host.app.record().unwrap();
    assert!(record.is_verified());
    assert_eq!(record.verification_reference.as_deref(), Some(reference.as_str()));
    assert_eq!(record.verified_email.as_deref(), Some("user@example.com"));

    let metrics = host.app.metrics();
    assert_eq!(metrics.sessions_started.get(), 1);
    assert_eq!(metrics.outcomes.with_label_values(&["verified"]).get(), 1);
    assert_eq!(metrics.records_written.get(), 1);
    assert_eq!(host.observer.completed().len(), 1);
}

#[test]
fn declined_outcome_is_persisted_as_failed() {
    let host = host();
    submit(&host);
    host.transport
        .respond_json(r#"{"event":"verification.declined","reference":"VENDOR-7"}"#);

    let snapshot = host.store.snapshot();
    assert_eq!(snapshot.get(KEY_VERIFICATION_STATUS).map(String::as_str), Some("failed"));
    assert_eq!(
        snapshot.get(KEY_VERIFICATION_REFERENCE).map(String::as_str),
        Some("VENDOR-7")
    );
    assert!(!snapshot.contains_key(KEY_VERIFIED_EMAIL));
    assert_eq!(host.observer.errors().len(), 1);
}

#[test]
fn pending_outcome_writes_reference_only() {
    let host = host();
    let reference = submit(&host);
    host.transport.respond_json(r#"{"event":"request.received"}"#);

    let record = host.app.record().unwrap();
    assert_eq!(record.verification_status, None);
    assert_eq!(record.verification_reference, Some(reference));
    assert_eq!(host.observer.completed().len(), 1);
}

#[test]
fn timeout_is_counted_and_persisted() {
    let host = host();
    submit(&host);
    host.scheduler.advance(Duration::from_secs(30));

    let record = host.app.record().unwrap();
    assert_eq!(record.verification_status, Some(RecordStatus::Failed));
    assert_eq!(host.app.metrics().timeouts.get(), 1);
    assert_eq!(host.observer.count(), 1);
}

#[test]
fn cancel_is_counted_and_not_persisted() {
    let host = host();
    host.app.start_session(&host.orchestrator).unwrap();
    let writes = host.store.write_count();

    assert!(host.orchestrator.cancel().unwrap());
    assert_eq!(host.app.metrics().sessions_cancelled.get(), 1);
    assert_eq!(host.store.write_count(), writes);
    assert_eq!(host.observer.cancels(), 1);
}

#[test]
fn stale_schema_is_erased_on_open() {
    let store = NullPreferenceStore::with_entries(&[
        (KEY_VERIFIED_EMAIL, "old@example.com"),
        (KEY_VERIFICATION_REFERENCE, "REF-OLD"),
        (KEY_VERIFICATION_STATUS, "completed"),
        (KEY_STORAGE_VERSION, "0.1"),
    ]);
    let host = host_with(store);

    let snapshot = host.store.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(
        snapshot.get(KEY_STORAGE_VERSION).map(String::as_str),
        Some(CURRENT_SCHEMA_VERSION)
    );
    assert!(!host.app.record().unwrap().is_verified());
}

#[test]
fn clear_record_keeps_version() {
    let host = host();
    submit(&host);
    host.transport.respond_json(r#"{"event":"verification.accepted"}"#);
    host.app.clear_record().unwrap();

    let record = host.app.record().unwrap();
    assert_eq!(record.verification_status, None);
    assert_eq!(record.verified_email, None);
    assert_eq!(record.storage_schema_version, CURRENT_SCHEMA_VERSION);
}

#[test]
fn json_file_record_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config();
    config.storage.path = dir.path().join("prefs.json");

    {
        let app = KycApp::open(config.clone()).unwrap();
        let transport = Arc::new(NullTransport::responding_with(
            kyc_types::RawResponse::json(r#"{"event":"verification.accepted"}"#),
        ));
        let orchestrator = app
            .orchestrator(
                transport,
                Arc::new(NullScheduler::new()),
                Arc::new(RecordingObserver::new()),
            )
            .unwrap();
        app.start_session(&orchestrator).unwrap();
        orchestrator.advance().unwrap();
        orchestrator.capture("front").unwrap();
        orchestrator.advance().unwrap();
        orchestrator.capture("selfie").unwrap();
        orchestrator.advance().unwrap();
        assert_eq!(orchestrator.advance().unwrap(), SessionStep::Result);
    }

    let reopened = KycApp::open(config).unwrap();
    assert!(reopened.record().unwrap().is_verified());
}

#[tokio::test]
async fn transport_selection_follows_config() {
    let runtime = tokio::runtime::Handle::current();
    let host = host();

    assert!(matches!(
        host.app.transport(&runtime, HostBindings::default()),
        Err(AppError::NoNativeBridge)
    ));
    let native = host
        .app
        .transport(
            &runtime,
            HostBindings {
                bridge: Some(Arc::new(NullBridge::new())),
                webview: None,
            },
        )
        .unwrap();
    assert_eq!(native.name(), "native");

    let mut http = config();
    http.vendor.transport = TransportKind::Http;
    let app = KycApp::with_store(http, Arc::new(NullPreferenceStore::new())).unwrap();
    assert_eq!(
        app.transport(&runtime, HostBindings::default()).unwrap().name(),
        "http"
    );

    let mut webview = config();
    webview.vendor.transport = TransportKind::Webview;
    let app = KycApp::with_store(webview.clone(), Arc::new(NullPreferenceStore::new())).unwrap();
    assert!(matches!(
        app.transport(&runtime, HostBindings::default()),
        Err(AppError::Config(_))
    ));

    webview.vendor.journey_url =
        Some("https://app.shuftipro.com/verification/journey/j-42".into());
    let app = KycApp::with_store(webview, Arc::new(NullPreferenceStore::new())).unwrap();
    assert_eq!(
        app.transport(&runtime, HostBindings::default()).unwrap().name(),
        "webview"
    );
}
