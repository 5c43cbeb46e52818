//! Vendor-hosted page transport.
//!
//! The host UI loads the journey page in a web view and forwards two kinds
//! of signal into a [`WebViewChannel`]: JSON messages posted by the page, and
//! top-level navigations. Navigations only count when the URL carries a
//! known success or failure marker; everything else is ordinary page traffic.

use std::sync::{Arc, Mutex, MutexGuard};

use kyc_types::{classify_navigation_url, RawResponse};
use serde_json::Value;

use crate::http::is_in_flight_event;
use crate::{Submission, TransportError, VendorResponder, VendorTransport};

/// Prefix every vendor journey URL starts with.
pub const JOURNEY_URL_PREFIX: &str = "https://app.shuftipro.com/verification/journey/";

#[derive(Default)]
struct ChannelState {
    responder: Option<VendorResponder>,
    reference: Option<String>,
}

/// Hand-off point between the host web view and the active session.
#[derive(Clone, Default)]
pub struct WebViewChannel {
    state: Arc<Mutex<ChannelState>>,
}

impl WebViewChannel {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ChannelState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn attach(&self, reference: String, responder: VendorResponder) {
        let mut state = self.lock();
        state.reference = Some(reference);
        state.responder = Some(responder);
    }

    fn detach(&self, reference: &str) -> bool {
        let mut state = self.lock();
        if state.reference.as_deref() == Some(reference) {
            *state = ChannelState::default();
            true
        } else {
            false
        }
    }

    fn responder(&self) -> Option<VendorResponder> {
        self.lock().responder.clone()
    }

    /// Whether a session is listening.
    pub fn is_attached(&self) -> bool {
        self.lock().responder.is_some()
    }

    /// A message posted by the page. Returns true if it was forwarded as a
    /// verification result.
    ///
    /// Text that is not JSON and events that only report progress are page
    /// chatter and are dropped.
    pub fn on_message(&self, data: &str) -> bool {
        let Some(responder) = self.responder() else {
            tracing::debug!("web view message with no active session");
            return false;
        };
        let message: Value = match serde_json::from_str(data) {
            Ok(message) => message,
            Err(e) => {
                tracing::trace!(bytes = data.len(), error = %e, "ignoring non-JSON page message");
                return false;
            }
        };
        if let Some(event) = message.get("event").and_then(Value::as_str) {
            if is_in_flight_event(event) {
                tracing::trace!(event, "verification still in flight");
                return false;
            }
        }
        tracing::debug!(bytes = data.len(), "web view message");
        responder.respond(RawResponse::Value(message));
        true
    }

    /// A top-level navigation. Returns true if the URL was forwarded as a
    /// verification result.
    pub fn on_navigation(&self, url: &str) -> bool {
        if classify_navigation_url(url).is_none() {
            tracing::trace!(url, "ignoring navigation");
            return false;
        }
        match self.responder() {
            Some(responder) => {
                tracing::debug!(url, "web view reached a result page");
                responder.respond(RawResponse::NavigationUrl(url.to_string()));
                true
            }
            None => false,
        }
    }

    /// The page failed to load.
    pub fn on_load_error(&self, description: &str) {
        if let Some(responder) = self.responder() {
            responder.fail(TransportError::Unavailable(format!(
                "verification page failed to load: {description}"
            )));
        }
    }
}

/// Transport backed by a vendor-hosted journey page.
pub struct WebViewTransport {
    page_url: String,
    channel: WebViewChannel,
}

impl WebViewTransport {
    pub fn new(page_url: impl Into<String>, channel: WebViewChannel) -> Self {
        Self {
            page_url: page_url.into(),
            channel,
        }
    }

    /// A transport for a pre-created vendor journey. Rejects URLs that do
    /// not point at the vendor's journey host.
    pub fn for_journey(url: &str, channel: WebViewChannel) -> Result<Self, TransportError> {
        if !url.starts_with(JOURNEY_URL_PREFIX) || url.len() == JOURNEY_URL_PREFIX.len() {
            return Err(TransportError::Other(format!("not a vendor journey URL: {url}")));
        }
        Ok(Self::new(url, channel))
    }

    pub fn page_url(&self) -> &str {
        &self.page_url
    }

    pub fn channel(&self) -> &WebViewChannel {
        &self.channel
    }
}

impl VendorTransport for WebViewTransport {
    fn name(&self) -> &'static str {
        "webview"
    }

    fn submit(
        &self,
        submission: Submission,
        responder: VendorResponder,
    ) -> Result<(), TransportError> {
        if self.page_url.is_empty() {
            return Err(TransportError::Unavailable("no verification page configured".into()));
        }
        tracing::info!(
            reference = %submission.reference,
            page = %self.page_url,
            "opening verification page"
        );
        self.channel.attach(submission.reference, responder);
        Ok(())
    }

    fn cancel(&self, reference: &str) {
        if self.channel.detach(reference) {
            tracing::info!(reference, "closed verification page");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AuthSpec, RequestTemplate, ResponseSink};
    use kyc_types::DocumentType;

    #[derive(Default)]
    struct Captured(Mutex<Vec<RawResponse>>);

    impl ResponseSink for Captured {
        fn acknowledge(&self) {}
        fn respond(&self, response: RawResponse) {
            self.0.lock().unwrap().push(response);
        }
        fn fail(&self, _error: TransportError) {}
    }

    fn submitted() -> (WebViewTransport, Arc<Captured>) {
        let channel = WebViewChannel::new();
        let transport = WebViewTransport::for_journey(
            "https://app.shuftipro.com/verification/journey/abc123",
            channel,
        )
        .unwrap();
        let sink = Arc::new(Captured::default());
        let submission = RequestTemplate::new(AuthSpec::token("abc123")).build(
            "abc123",
            DocumentType::Passport,
            &[],
        );
        transport
            .submit(submission, VendorResponder::new(sink.clone()))
            .unwrap();
        (transport, sink)
    }

    #[test]
    fn rejects_foreign_journey_urls() {
        assert!(WebViewTransport::for_journey("https://evil.example/x", WebViewChannel::new()).is_err());
        assert!(WebViewTransport::for_journey(JOURNEY_URL_PREFIX, WebViewChannel::new()).is_err());
    }

    #[test]
    fn ordinary_navigation_is_ignored() {
        let (transport, sink) = submitted();
        assert!(!transport.channel().on_navigation("https://app.shuftipro.com/verification/journey/abc123/step/2"));
        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[test]
    fn result_navigation_is_forwarded() {
        let (transport, sink) = submitted();
        assert!(transport.channel().on_navigation("https://app.shuftipro.com/verification/success"));
        assert_eq!(sink.0.lock().unwrap().len(), 1);
    }

    #[test]
    fn messages_stop_after_cancel() {
        let (transport, sink) = submitted();
        assert!(transport.channel().on_message(r#"{"event":"verification.accepted"}"#));
        transport.cancel("abc123");
        assert!(!transport.channel().is_attached());
        assert!(!transport.channel().on_message(r#"{"event":"verification.accepted"}"#));
        assert_eq!(sink.0.lock().unwrap().len(), 1);
    }

    #[test]
    fn page_chatter_is_not_forwarded() {
        let (transport, sink) = submitted();
        let channel = transport.channel();
        assert!(!channel.on_message("page loaded"));
        assert!(!channel.on_message(r#"{"event":"verification.status.changed"}"#));
        assert!(!channel.on_message(r#"{"event":"request.pending"}"#));
        assert!(sink.0.lock().unwrap().is_empty());

        assert!(channel.on_message(r#"{"event":"request.received"}"#));
        assert_eq!(sink.0.lock().unwrap().len(), 1);
    }
}
