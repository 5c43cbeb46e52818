//! Verification orchestrator: drives a [`VerificationSession`], submits it
//! through a [`VendorTransport`], and races the vendor's answer against the
//! guard ladder.
//!
//! Every attempt (the initial run and each retry) ends in exactly one call
//! on the [`VerificationObserver`]. Two latches enforce this:
//!
//! - `claimed` is taken by the first of {vendor response, transport failure,
//!   primary timeout, cancel, permission denial}. Later signals are dropped.
//! - `delivered` is taken right before the observer is called. The
//!   force-kill guard only checks this one, so it still terminates an
//!   attempt whose claimant stalled before delivering.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use kyc_transport::{
    RequestTemplate, ResponseSink, Submission, TransportError, VendorResponder, VendorTransport,
};
use kyc_types::{
    CaptureKind, CapturedAsset, DocumentType, FailureKind, RawResponse, RecoveryAction,
    SessionReference, Timestamp, VerificationOutcome,
};
use kyc_utils::format_duration;

use crate::capture::{CaptureResult, CaptureSource};
use crate::guard::{ArmedLadder, GuardConfig, GuardLadder, GuardStage};
use crate::normalizer::normalize;
use crate::observer::VerificationObserver;
use crate::scheduler::Scheduler;
use crate::session::{Advance, FlowOptions, SessionStep, VerificationSession};
use crate::VerificationError;

pub const TIMEOUT_MESSAGE: &str = "verification timeout";
pub const FORCED_TIMEOUT_MESSAGE: &str =
    "verification timeout - forced termination to prevent hanging";

/// Host settings for one orchestrator.
#[derive(Clone, Debug)]
pub struct OrchestratorSettings {
    pub guards: GuardConfig,
    pub flow: FlowOptions,
    pub template: RequestTemplate,
    /// Reference reused by every attempt (a journey token). When absent a
    /// fresh reference is generated per attempt.
    pub fixed_reference: Option<SessionReference>,
}

impl OrchestratorSettings {
    pub fn new(template: RequestTemplate) -> Self {
        Self {
            guards: GuardConfig::default(),
            flow: FlowOptions::default(),
            template,
            fixed_reference: None,
        }
    }
}

/// Read-only view of the current session.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionSnapshot {
    pub reference: SessionReference,
    pub step: SessionStep,
    pub document_type: DocumentType,
    pub assets: Vec<CapturedAsset>,
    pub started_at: Timestamp,
    pub outcome: Option<VerificationOutcome>,
}

enum Terminal {
    Outcome(VerificationOutcome),
    Cancelled,
}

fn failure_kind_for(error: &TransportError) -> FailureKind {
    match error {
        TransportError::Unauthorized(_) => FailureKind::Unauthorized,
        TransportError::Timeout(_) => FailureKind::Timeout,
        TransportError::InvalidResponse(_) | TransportError::Serialization(_) => {
            FailureKind::MalformedResponse
        }
        TransportError::Unavailable(_)
        | TransportError::RequestFailed(_)
        | TransportError::Other(_) => FailureKind::TransportUnavailable,
    }
}

// ---------------------------------------------------------------------------
// Attempt latch
// ---------------------------------------------------------------------------

struct Attempt {
    id: u64,
    reference: String,
    guards: GuardConfig,
    owner: Weak<Shared>,
    claimed: AtomicBool,
    delivered: AtomicBool,
    ladder: Mutex<Option<ArmedLadder>>,
}

impl Attempt {
    fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::SeqCst)
    }

    fn arm(&self, ladder: ArmedLadder) {
        *self.ladder.lock().unwrap_or_else(|e| e.into_inner()) = Some(ladder);
    }

    fn cancel_guards(&self) {
        if let Some(ladder) = self.ladder.lock().unwrap_or_else(|e| e.into_inner()).as_ref() {
            ladder.cancel_pending();
        }
    }

    /// Take the `claimed` latch and stop the cancellable guards. Returns
    /// false if the attempt was already settled.
    fn claim(&self) -> bool {
        if self.claimed.swap(true, Ordering::SeqCst) {
            tracing::debug!(reference = %self.reference, "attempt already settled, ignoring");
            return false;
        }
        self.cancel_guards();
        true
    }

    /// First claimant wins; returns false if the attempt was already settled.
    fn settle(&self, terminal: Terminal) -> bool {
        self.claim() && self.deliver(terminal)
    }

    fn deliver(&self, terminal: Terminal) -> bool {
        if self.delivered.swap(true, Ordering::SeqCst) {
            return false;
        }
        match self.owner.upgrade() {
            Some(shared) => shared.finish(self.id, terminal),
            None => tracing::debug!(reference = %self.reference, "orchestrator gone, outcome dropped"),
        }
        true
    }

    fn timeout(&self, message: &str) -> Terminal {
        Terminal::Outcome(VerificationOutcome::failure(
            self.reference.as_str(),
            FailureKind::Timeout,
            message,
        ))
    }

    fn on_guard(&self, stage: GuardStage) {
        let elapsed = format_duration(self.guards.delay(stage));
        match stage {
            GuardStage::EarlyCheckpoint | GuardStage::MidCheckpoint => {
                if !self.is_claimed() {
                    tracing::info!(
                        reference = %self.reference,
                        stage = stage.label(),
                        elapsed = %elapsed,
                        "still waiting for vendor"
                    );
                }
            }
            GuardStage::PrimaryTimeout => {
                if self.claim() {
                    tracing::warn!(reference = %self.reference, elapsed = %elapsed, "verification timed out");
                    self.stop_transport();
                    self.deliver(self.timeout(TIMEOUT_MESSAGE));
                }
            }
            GuardStage::ForceKill => {
                if self.delivered.load(Ordering::SeqCst) {
                    tracing::debug!(reference = %self.reference, "force-kill: attempt already resolved");
                    return;
                }
                tracing::warn!(reference = %self.reference, elapsed = %elapsed, "force-kill guard terminating attempt");
                self.claimed.store(true, Ordering::SeqCst);
                self.cancel_guards();
                self.stop_transport();
                self.deliver(self.timeout(FORCED_TIMEOUT_MESSAGE));
            }
        }
    }

    /// The vendor never answered; tell the transport to stop listening.
    fn stop_transport(&self) {
        if let Some(shared) = self.owner.upgrade() {
            shared.transport.cancel(&self.reference);
        }
    }
}

impl ResponseSink for Attempt {
    fn acknowledge(&self) {
        if !self.is_claimed() {
            tracing::debug!(reference = %self.reference, "vendor acknowledged");
        }
        self.cancel_guards();
    }

    fn respond(&self, response: RawResponse) {
        if self.is_claimed() {
            tracing::debug!(
                reference = %self.reference,
                kind = response.kind(),
                "ignoring vendor response for settled attempt"
            );
            return;
        }
        let outcome = normalize(&response).into_outcome(&self.reference);
        tracing::info!(
            reference = %outcome.reference,
            status = %outcome.status,
            "vendor responded"
        );
        self.settle(Terminal::Outcome(outcome));
    }

    fn fail(&self, error: TransportError) {
        let kind = failure_kind_for(&error);
        tracing::warn!(reference = %self.reference, error = %error, "vendor transport failed");
        self.settle(Terminal::Outcome(VerificationOutcome::failure(
            self.reference.as_str(),
            kind,
            kind.default_message(),
        )));
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

#[derive(Default)]
struct State {
    session: Option<VerificationSession>,
    attempt: Option<Arc<Attempt>>,
    outcome: Option<VerificationOutcome>,
    attempts: u64,
}

struct Shared {
    transport: Arc<dyn VendorTransport>,
    scheduler: Arc<dyn Scheduler>,
    observer: Arc<dyn VerificationObserver>,
    ladder: GuardLadder,
    settings: OrchestratorSettings,
    state: Mutex<State>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn next_reference(&self) -> Result<SessionReference, VerificationError> {
        match &self.settings.fixed_reference {
            Some(reference) => Ok(reference.clone()),
            None => Ok(SessionReference::generate(Timestamp::now())?),
        }
    }

    /// Record the terminal result, then call the observer with no lock held.
    fn finish(&self, attempt_id: u64, terminal: Terminal) {
        {
            let mut state = self.lock();
            if state.attempt.as_ref().map(|a| a.id) != Some(attempt_id) {
                tracing::debug!(attempt_id, "terminal result for a superseded attempt");
                return;
            }
            match &terminal {
                Terminal::Outcome(outcome) => {
                    if let Some(session) = state.session.as_mut() {
                        session.finish();
                    }
                    state.outcome = Some(outcome.clone());
                }
                Terminal::Cancelled => {
                    if let Some(mut session) = state.session.take() {
                        session.abort();
                    }
                    state.attempt = None;
                    state.outcome = None;
                }
            }
        }

        let observer = Arc::clone(&self.observer);
        let delivery = catch_unwind(AssertUnwindSafe(|| match &terminal {
            Terminal::Outcome(outcome) if outcome.status.is_success() => {
                observer.on_complete(outcome)
            }
            Terminal::Outcome(outcome) => observer.on_error(outcome),
            Terminal::Cancelled => observer.on_cancel(),
        }));
        if delivery.is_err() {
            tracing::error!(attempt_id, "verification observer panicked");
        }
    }
}

/// Runs one verification session at a time.
pub struct VerificationOrchestrator {
    shared: Arc<Shared>,
}

impl VerificationOrchestrator {
    pub fn new(
        transport: Arc<dyn VendorTransport>,
        scheduler: Arc<dyn Scheduler>,
        observer: Arc<dyn VerificationObserver>,
        settings: OrchestratorSettings,
    ) -> Result<Self, VerificationError> {
        let ladder = GuardLadder::new(settings.guards)?;
        Ok(Self {
            shared: Arc::new(Shared {
                transport,
                scheduler,
                observer,
                ladder,
                settings,
                state: Mutex::new(State::default()),
            }),
        })
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.shared.settings
    }

    fn new_attempt(&self, state: &mut State, reference: &SessionReference) -> Arc<Attempt> {
        state.attempts += 1;
        Arc::new(Attempt {
            id: state.attempts,
            reference: reference.to_string(),
            guards: *self.shared.ladder.config(),
            owner: Arc::downgrade(&self.shared),
            claimed: AtomicBool::new(false),
            delivered: AtomicBool::new(false),
            ladder: Mutex::new(None),
        })
    }

    fn with_session<T>(
        &self,
        f: impl FnOnce(&mut VerificationSession) -> Result<T, VerificationError>,
    ) -> Result<T, VerificationError> {
        let mut state = self.shared.lock();
        let session = state
            .session
            .as_mut()
            .ok_or(VerificationError::NoActiveSession)?;
        f(session)
    }

    /// Begin a session at `intro`. A finished session is replaced.
    pub fn start(&self) -> Result<SessionReference, VerificationError> {
        let mut state = self.shared.lock();
        if let Some(session) = &state.session {
            if session.step() != SessionStep::Result {
                return Err(VerificationError::AlreadyInProgress(
                    session.reference().to_string(),
                ));
            }
        }

        let reference = self.shared.next_reference()?;
        let attempt = self.new_attempt(&mut state, &reference);
        state.session = Some(VerificationSession::new(
            reference.clone(),
            self.shared.settings.flow,
            Timestamp::now(),
        ));
        state.attempt = Some(attempt);
        state.outcome = None;

        tracing::info!(
            reference = %reference,
            transport = self.shared.transport.name(),
            "verification session started"
        );
        Ok(reference)
    }

    pub fn select_document_type(&self, document_type: DocumentType) -> Result<(), VerificationError> {
        self.with_session(|s| s.select_document_type(document_type))
    }

    /// Stage a photo for the current capture step.
    pub fn capture(&self, location_ref: impl Into<String>) -> Result<CaptureKind, VerificationError> {
        let location_ref = location_ref.into();
        self.with_session(|s| s.capture(location_ref))
    }

    /// Run `source` for the current capture step and apply its result.
    pub async fn capture_with(
        &self,
        source: &dyn CaptureSource,
    ) -> Result<CaptureResult, VerificationError> {
        let kind = self.with_session(|s| {
            s.step()
                .capture_kind()
                .ok_or(VerificationError::InvalidStep(s.step()))
        })?;

        let result = source.capture(kind).await;
        match &result {
            CaptureResult::Captured(location) => {
                self.capture(location.clone())?;
            }
            CaptureResult::Cancelled => {
                tracing::debug!(kind = %kind, "capture cancelled by user");
            }
            CaptureResult::PermissionDenied => self.permission_denied()?,
        }
        Ok(result)
    }

    /// Move forward; entering `processing` submits to the vendor.
    pub fn advance(&self) -> Result<SessionStep, VerificationError> {
        let (submission, attempt) = {
            let mut state = self.shared.lock();
            let session = state
                .session
                .as_mut()
                .ok_or(VerificationError::NoActiveSession)?;
            match session.advance() {
                Advance::Blocked => {
                    tracing::debug!(step = %session.step(), "advance blocked");
                    return Ok(session.step());
                }
                Advance::Moved(step) => return Ok(step),
                Advance::EnteredProcessing => {}
            }
            let submission = self.shared.settings.template.build(
                session.reference().as_str(),
                session.document_type(),
                &session.assets(),
            );
            let attempt = state
                .attempt
                .clone()
                .ok_or(VerificationError::NoActiveSession)?;
            (submission, attempt)
        };

        self.submit(submission, attempt);
        Ok(self.step().unwrap_or(SessionStep::Processing))
    }

    fn submit(&self, submission: Submission, attempt: Arc<Attempt>) {
        let guard_attempt = Arc::clone(&attempt);
        let armed = self.shared.ladder.arm(
            self.shared.scheduler.as_ref(),
            Arc::new(move |stage| guard_attempt.on_guard(stage)),
        );
        attempt.arm(armed);

        let reference = submission.reference.clone();
        tracing::info!(
            reference = %reference,
            transport = self.shared.transport.name(),
            document_type = %submission.document_type,
            assets = submission.assets.len(),
            "submitting verification"
        );

        let sink: Arc<dyn ResponseSink> = attempt.clone();
        if let Err(e) = self.shared.transport.submit(submission, VendorResponder::new(sink)) {
            attempt.fail(e);
        }
    }

    /// Returns false when nothing moved.
    pub fn go_back(&self) -> Result<bool, VerificationError> {
        self.with_session(|s| Ok(s.go_back()))
    }

    pub fn retake(&self, kind: CaptureKind) -> Result<(), VerificationError> {
        self.with_session(|s| s.retake(kind))
    }

    /// Cancel the session. Before submission this aborts it and reports
    /// `on_cancel`; during processing it only asks the transport to stop and
    /// the guards still bound the wait. Returns whether the session ended.
    pub fn cancel(&self) -> Result<bool, VerificationError> {
        let (step, reference, attempt) = {
            let state = self.shared.lock();
            let session = state
                .session
                .as_ref()
                .ok_or(VerificationError::NoActiveSession)?;
            (
                session.step(),
                session.reference().clone(),
                state.attempt.clone(),
            )
        };

        match step {
            SessionStep::Result => Err(VerificationError::InvalidStep(step)),
            SessionStep::Processing => {
                tracing::info!(reference = %reference, "cancel requested during processing");
                self.shared.transport.cancel(reference.as_str());
                Ok(false)
            }
            _ => {
                let attempt = attempt.ok_or(VerificationError::NoActiveSession)?;
                tracing::info!(reference = %reference, step = %step, "verification cancelled");
                Ok(attempt.settle(Terminal::Cancelled))
            }
        }
    }

    /// End the flow with a permission-denied error.
    pub fn permission_denied(&self) -> Result<(), VerificationError> {
        let attempt = {
            let state = self.shared.lock();
            let session = state
                .session
                .as_ref()
                .ok_or(VerificationError::NoActiveSession)?;
            if session.step().is_locked() {
                return Err(VerificationError::InvalidStep(session.step()));
            }
            state
                .attempt
                .clone()
                .ok_or(VerificationError::NoActiveSession)?
        };
        tracing::warn!(reference = %attempt.reference, "capture permission denied");
        let kind = FailureKind::PermissionDenied;
        attempt.settle(Terminal::Outcome(VerificationOutcome::failure(
            attempt.reference.as_str(),
            kind,
            kind.default_message(),
        )));
        Ok(())
    }

    /// Start a new attempt at the first capture step after a retryable failure.
    pub fn retry(&self) -> Result<SessionReference, VerificationError> {
        let mut state = self.shared.lock();
        let recovery = state
            .outcome
            .as_ref()
            .ok_or(VerificationError::NotFinished)?
            .recovery();
        if !matches!(
            recovery,
            Some(RecoveryAction::Retry | RecoveryAction::RetryOrCancel)
        ) {
            return Err(VerificationError::NotRetryable);
        }

        let reference = self.shared.next_reference()?;
        state
            .session
            .as_mut()
            .ok_or(VerificationError::NoActiveSession)?
            .reset_for_retry(reference.clone(), Timestamp::now())?;
        let attempt = self.new_attempt(&mut state, &reference);
        state.attempt = Some(attempt);
        state.outcome = None;

        tracing::info!(reference = %reference, attempt = state.attempts, "retrying verification");
        Ok(reference)
    }

    pub fn step(&self) -> Option<SessionStep> {
        self.shared.lock().session.as_ref().map(|s| s.step())
    }

    pub fn reference(&self) -> Option<SessionReference> {
        self.shared
            .lock()
            .session
            .as_ref()
            .map(|s| s.reference().clone())
    }

    /// The terminal outcome of the current attempt, once there is one.
    pub fn outcome(&self) -> Option<VerificationOutcome> {
        self.shared.lock().outcome.clone()
    }

    pub fn snapshot(&self) -> Option<SessionSnapshot> {
        let state = self.shared.lock();
        state.session.as_ref().map(|s| SessionSnapshot {
            reference: s.reference().clone(),
            step: s.step(),
            document_type: s.document_type(),
            assets: s.assets(),
            started_at: s.started_at(),
            outcome: state.outcome.clone(),
        })
    }
}
