//! Native SDK bridge transport.
//!
//! The vendor's mobile SDK is exposed to us as a single `verify` call taking
//! three JSON strings and a completion callback. The bridge is contracted to
//! invoke the callback exactly once; in practice it may never call back, or
//! call back more than once. Both are the orchestrator's problem, not ours.

use std::sync::Arc;

use kyc_types::RawResponse;

use crate::payload::BridgePayload;
use crate::{Submission, TransportError, VendorResponder, VendorTransport};

/// Completion callback invoked by the bridge with the vendor's response JSON.
pub type BridgeCallback = Box<dyn Fn(String) + Send + Sync>;

/// The host platform's handle to the vendor SDK.
pub trait NativeBridge: Send + Sync {
    /// Whether the vendor module is linked into this build.
    fn is_available(&self) -> bool {
        true
    }

    fn verify(&self, payload: BridgePayload, callback: BridgeCallback)
        -> Result<(), TransportError>;
}

/// Transport that drives the vendor SDK through a [`NativeBridge`].
pub struct NativeBridgeTransport {
    bridge: Arc<dyn NativeBridge>,
}

impl NativeBridgeTransport {
    pub fn new(bridge: Arc<dyn NativeBridge>) -> Self {
        Self { bridge }
    }
}

impl VendorTransport for NativeBridgeTransport {
    fn name(&self) -> &'static str {
        "native"
    }

    fn submit(
        &self,
        submission: Submission,
        responder: VendorResponder,
    ) -> Result<(), TransportError> {
        if !self.bridge.is_available() {
            return Err(TransportError::Unavailable(
                "vendor SDK module not found".to_string(),
            ));
        }
        if !submission.auth.is_complete() {
            return Err(TransportError::Unauthorized(
                "vendor credentials not configured".to_string(),
            ));
        }

        let payload = submission.to_bridge_payload()?;
        tracing::debug!(
            reference = %submission.reference,
            auth = ?submission.auth,
            config = %payload.config_json,
            "launching vendor SDK"
        );

        let reference = submission.reference;
        let callback: BridgeCallback = Box::new(move |response| {
            tracing::debug!(reference = %reference, bytes = response.len(), "vendor SDK callback");
            responder.respond(RawResponse::Json(response));
        });
        self.bridge.verify(payload, callback)
    }
}
