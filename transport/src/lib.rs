//! Vendor transports for identity verification.
//!
//! The vendor is reachable three ways, all behind [`VendorTransport`]:
//! - a native SDK bridge taking three JSON blobs and a completion callback,
//! - an HTTP API that is polled until a terminal event or a cutoff,
//! - a vendor-hosted page in a web view that posts JSON events and navigates
//!   to success/failure URLs.
//!
//! Every transport reports back through a [`VendorResponder`]; none of them
//! interpret the vendor's response.

pub mod auth;
pub mod error;
pub mod http;
pub mod native;
pub mod payload;
pub mod transport;
pub mod webview;

pub use auth::AccessTokenService;
pub use error::TransportError;
pub use http::{
    is_in_flight_event, HttpApiClient, HttpPollingTransport, PollingConfig, TokenSource,
    DEFAULT_BASE_URL,
};
pub use native::{BridgeCallback, NativeBridge, NativeBridgeTransport};
pub use payload::{AuthSpec, BridgePayload, RequestTemplate, Submission, UiConfig, VerificationSpec};
pub use transport::{ResponseSink, VendorResponder, VendorTransport};
pub use webview::{WebViewChannel, WebViewTransport};
