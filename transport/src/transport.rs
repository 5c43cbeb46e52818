//! The transport seam between the orchestrator and the vendor.

use std::sync::Arc;

use kyc_types::RawResponse;

use crate::{Submission, TransportError};

/// Receives whatever a transport hears back from the vendor.
///
/// Implemented by the orchestrator. Implementations must tolerate any number
/// of calls, including none at all and calls after the session has ended.
pub trait ResponseSink: Send + Sync {
    /// The vendor answered; stop any guard that only exists to detect silence.
    fn acknowledge(&self);

    /// A vendor response to normalize.
    fn respond(&self, response: RawResponse);

    /// The transport itself failed before a usable response arrived.
    fn fail(&self, error: TransportError);
}

/// Cloneable handle given to a transport on submission.
#[derive(Clone)]
pub struct VendorResponder {
    sink: Arc<dyn ResponseSink>,
}

impl VendorResponder {
    pub fn new(sink: Arc<dyn ResponseSink>) -> Self {
        Self { sink }
    }

    /// Acknowledge and deliver a vendor response.
    pub fn respond(&self, response: RawResponse) {
        self.sink.acknowledge();
        self.sink.respond(response);
    }

    /// Acknowledge only: the vendor called back but the payload never made it
    /// through (a bridge that locks up after invoking the callback).
    pub fn acknowledge(&self) {
        self.sink.acknowledge();
    }

    pub fn fail(&self, error: TransportError) {
        self.sink.fail(error);
    }
}

/// One way of reaching the identity-verification vendor.
pub trait VendorTransport: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Start a verification. The transport reports back through `responder`,
    /// possibly synchronously before `submit` returns.
    ///
    /// Returning `Err` means nothing was started.
    fn submit(&self, submission: Submission, responder: VendorResponder)
        -> Result<(), TransportError>;

    /// Ask the vendor to abandon a verification. Best effort: transports that
    /// cannot cancel simply ignore the request.
    fn cancel(&self, reference: &str) {
        tracing::debug!(transport = self.name(), reference, "cancel not supported by transport");
    }
}
