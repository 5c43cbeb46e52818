//! Recording observer: remembers every terminal callback.

use std::sync::Mutex;

use kyc_types::VerificationOutcome;
use kyc_verification::{SessionEnd, VerificationObserver};

/// An observer that records every callback it receives.
#[derive(Default)]
pub struct RecordingObserver {
    ends: Mutex<Vec<SessionEnd>>,
    panic_after_record: bool,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// An observer that records, then panics. Simulates a host handler
    /// that throws while processing the outcome.
    pub fn panicking() -> Self {
        Self {
            ends: Mutex::new(Vec::new()),
            panic_after_record: true,
        }
    }

    fn record(&self, end: SessionEnd) {
        self.ends.lock().unwrap().push(end);
        if self.panic_after_record {
            panic!("observer failed while handling the outcome");
        }
    }

    pub fn ends(&self) -> Vec<SessionEnd> {
        self.ends.lock().unwrap().clone()
    }

    /// Total number of terminal callbacks.
    pub fn count(&self) -> usize {
        self.ends.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<SessionEnd> {
        self.ends.lock().unwrap().last().cloned()
    }

    /// Outcomes passed to `on_complete`.
    pub fn completed(&self) -> Vec<VerificationOutcome> {
        self.ends
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                SessionEnd::Completed(o) => Some(o.clone()),
                _ => None,
            })
            .collect()
    }

    /// Outcomes passed to `on_error`.
    pub fn errors(&self) -> Vec<VerificationOutcome> {
        self.ends
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                SessionEnd::Failed(o) => Some(o.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn cancels(&self) -> usize {
        self.ends
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, SessionEnd::Cancelled))
            .count()
    }
}

impl VerificationObserver for RecordingObserver {
    fn on_complete(&self, outcome: &VerificationOutcome) {
        self.record(SessionEnd::Completed(outcome.clone()));
    }

    fn on_cancel(&self) {
        self.record(SessionEnd::Cancelled);
    }

    fn on_error(&self, outcome: &VerificationOutcome) {
        self.record(SessionEnd::Failed(outcome.clone()));
    }
}
