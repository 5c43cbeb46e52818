//! Nullable transport: record submissions, answer on demand.

use std::sync::Mutex;

use kyc_transport::{Submission, TransportError, VendorResponder, VendorTransport};
use kyc_types::RawResponse;

#[derive(Default)]
struct State {
    submissions: Vec<Submission>,
    responders: Vec<VendorResponder>,
    cancelled: Vec<String>,
    unavailable: bool,
    auto_response: Option<RawResponse>,
}

/// A vendor transport that never talks to a vendor.
///
/// Submissions are recorded; the test decides when (and whether) the
/// vendor answers by calling [`respond`](Self::respond),
/// [`stall`](Self::stall) or [`fail`](Self::fail).
#[derive(Default)]
pub struct NullTransport {
    state: Mutex<State>,
}

impl NullTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport whose vendor module is missing.
    pub fn unavailable() -> Self {
        let transport = Self::new();
        transport.set_unavailable(true);
        transport
    }

    /// A transport that answers every submission synchronously with `response`.
    pub fn responding_with(response: RawResponse) -> Self {
        let transport = Self::new();
        transport.state.lock().unwrap().auto_response = Some(response);
        transport
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unwrap().unavailable = unavailable;
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.state.lock().unwrap().submissions.clone()
    }

    pub fn submission_count(&self) -> usize {
        self.state.lock().unwrap().submissions.len()
    }

    pub fn last_submission(&self) -> Option<Submission> {
        self.state.lock().unwrap().submissions.last().cloned()
    }

    /// References passed to `cancel`.
    pub fn cancelled(&self) -> Vec<String> {
        self.state.lock().unwrap().cancelled.clone()
    }

    fn last_responder(&self) -> Option<VendorResponder> {
        self.state.lock().unwrap().responders.last().cloned()
    }

    /// Deliver a vendor response for the latest submission.
    /// Returns false if nothing was submitted yet.
    pub fn respond(&self, response: RawResponse) -> bool {
        match self.last_responder() {
            Some(responder) => {
                responder.respond(response);
                true
            }
            None => false,
        }
    }

    pub fn respond_json(&self, json: &str) -> bool {
        self.respond(RawResponse::json(json))
    }

    /// The vendor calls back but the payload never arrives.
    pub fn stall(&self) -> bool {
        match self.last_responder() {
            Some(responder) => {
                responder.acknowledge();
                true
            }
            None => false,
        }
    }

    pub fn fail(&self, error: TransportError) -> bool {
        match self.last_responder() {
            Some(responder) => {
                responder.fail(error);
                true
            }
            None => false,
        }
    }
}

impl VendorTransport for NullTransport {
    fn name(&self) -> &'static str {
        "null"
    }

    fn submit(
        &self,
        submission: Submission,
        responder: VendorResponder,
    ) -> Result<(), TransportError> {
        let auto = {
            let mut state = self.state.lock().unwrap();
            if state.unavailable {
                return Err(TransportError::Unavailable("null transport offline".into()));
            }
            state.submissions.push(submission);
            state.responders.push(responder.clone());
            state.auto_response.clone()
        };
        if let Some(response) = auto {
            responder.respond(response);
        }
        Ok(())
    }

    fn cancel(&self, reference: &str) {
        self.state.lock().unwrap().cancelled.push(reference.to_string());
    }
}
