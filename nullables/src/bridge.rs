//! Nullable native bridge: capture the three JSON blobs, fire callbacks by hand.

use std::sync::{Arc, Mutex};

use kyc_transport::{BridgeCallback, BridgePayload, NativeBridge, TransportError};

type SharedCallback = Arc<dyn Fn(String) + Send + Sync>;

struct State {
    available: bool,
    payloads: Vec<BridgePayload>,
    callbacks: Vec<SharedCallback>,
}

/// A vendor SDK bridge for testing.
pub struct NullBridge {
    state: Mutex<State>,
}

impl NullBridge {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                available: true,
                payloads: Vec::new(),
                callbacks: Vec::new(),
            }),
        }
    }

    /// A bridge whose vendor module is not linked.
    pub fn missing() -> Self {
        let bridge = Self::new();
        bridge.state.lock().unwrap().available = false;
        bridge
    }

    pub fn payloads(&self) -> Vec<BridgePayload> {
        self.state.lock().unwrap().payloads.clone()
    }

    /// Invoke the latest completion callback with `response`.
    /// Returns false if `verify` was never called.
    pub fn invoke(&self, response: &str) -> bool {
        let callback = self.state.lock().unwrap().callbacks.last().cloned();
        match callback {
            Some(callback) => {
                callback(response.to_string());
                true
            }
            None => false,
        }
    }
}

impl Default for NullBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeBridge for NullBridge {
    fn is_available(&self) -> bool {
        self.state.lock().unwrap().available
    }

    fn verify(&self, payload: BridgePayload, callback: BridgeCallback) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        state.payloads.push(payload);
        state.callbacks.push(Arc::from(callback));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kyc_transport::{
        AuthSpec, NativeBridgeTransport, RequestTemplate, ResponseSink, VendorResponder,
        VendorTransport,
    };
    use kyc_types::{DocumentType, RawResponse};

    #[derive(Default)]
    struct Sink(Mutex<Vec<RawResponse>>);

    impl ResponseSink for Sink {
        fn acknowledge(&self) {}
        fn respond(&self, response: RawResponse) {
            self.0.lock().unwrap().push(response);
        }
        fn fail(&self, _error: TransportError) {}
    }

    fn submission(auth: AuthSpec) -> kyc_transport::Submission {
        RequestTemplate::new(auth).build("REF-1", DocumentType::Passport, &[])
    }

    #[test]
    fn bridge_transport_forwards_callback_json() {
        let bridge = Arc::new(NullBridge::new());
        let transport = NativeBridgeTransport::new(bridge.clone());
        let sink = Arc::new(Sink::default());

        transport
            .submit(submission(AuthSpec::basic("id", "key")), VendorResponder::new(sink.clone()))
            .unwrap();
        assert_eq!(bridge.payloads().len(), 1);
        assert!(bridge.payloads()[0].auth_json.contains("basic_auth"));

        assert!(bridge.invoke(r#"{"event":"verification.accepted"}"#));
        assert_eq!(
            *sink.0.lock().unwrap(),
            vec![RawResponse::json(r#"{"event":"verification.accepted"}"#)]
        );
    }

    #[test]
    fn missing_module_is_unavailable() {
        let transport = NativeBridgeTransport::new(Arc::new(NullBridge::missing()));
        let err = transport
            .submit(submission(AuthSpec::basic("id", "key")), VendorResponder::new(Arc::new(Sink::default())))
            .unwrap_err();
        assert!(matches!(err, TransportError::Unavailable(_)));
    }

    #[test]
    fn empty_credentials_are_rejected() {
        let bridge = Arc::new(NullBridge::new());
        let transport = NativeBridgeTransport::new(bridge.clone());
        let err = transport
            .submit(submission(AuthSpec::token("")), VendorResponder::new(Arc::new(Sink::default())))
            .unwrap_err();
        assert!(matches!(err, TransportError::Unauthorized(_)));
        assert!(bridge.payloads().is_empty());
    }
}
