//! Vendor HTTP API client and the polling transport built on it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use kyc_types::RawResponse;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;

use crate::{
    AccessTokenService, AuthSpec, Submission, TransportError, VendorResponder, VendorTransport,
    VerificationSpec,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Vendor events that mean "keep waiting".
const IN_FLIGHT_EVENTS: [&str; 3] = [
    "request.pending",
    "verification.pending",
    "verification.status.changed",
];

/// Whether a vendor event means the verification has not finished yet.
pub fn is_in_flight_event(event: &str) -> bool {
    IN_FLIGHT_EVENTS.contains(&event)
}

fn event_of(body: &Value) -> Option<&str> {
    body.get("event").and_then(Value::as_str)
}

/// Where bearer tokens come from.
pub enum TokenSource {
    /// A token handed to us up front (e.g. a journey token).
    Static(String),
    /// Client credentials exchanged for a cached token.
    Exchange(AccessTokenService),
}

impl TokenSource {
    async fn token(&self) -> Result<String, TransportError> {
        match self {
            Self::Static(token) => Ok(token.clone()),
            Self::Exchange(service) => service.access_token().await,
        }
    }

    async fn invalidate(&self) {
        if let Self::Exchange(service) = self {
            service.clear().await;
        }
    }
}

impl TokenSource {
    /// Token source for `auth`; client credentials are exchanged at `base_url`.
    pub fn for_auth(auth: AuthSpec, base_url: &str) -> Self {
        match auth {
            AuthSpec::AccessToken { access_token } => Self::Static(access_token),
            AuthSpec::BasicAuth {
                client_id,
                secret_key,
            } => Self::Exchange(AccessTokenService::new(base_url, client_id, secret_key)),
        }
    }
}

/// Production vendor endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.shuftipro.com";

#[derive(Debug, Deserialize)]
struct VerificationUrlResponse {
    #[serde(default)]
    verification_url: Option<String>,
}

#[derive(Serialize)]
struct ReferenceRequest<'a> {
    reference: &'a str,
}

/// Thin client over the vendor's REST endpoints.
pub struct HttpApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: TokenSource,
}

impl HttpApiClient {
    pub fn new(base_url: impl Into<String>, tokens: TokenSource) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `POST /api/request/verification`
    pub async fn create_verification(
        &self,
        spec: &VerificationSpec,
    ) -> Result<Value, TransportError> {
        self.post("/api/request/verification", spec).await
    }

    /// `POST /api/status`
    pub async fn status(&self, reference: &str) -> Result<Value, TransportError> {
        self.post("/api/status", &ReferenceRequest { reference }).await
    }

    /// `POST /api/verification/url`
    pub async fn verification_url(&self, reference: &str) -> Result<String, TransportError> {
        let body = self
            .post("/api/verification/url", &ReferenceRequest { reference })
            .await?;
        let parsed: VerificationUrlResponse = serde_json::from_value(body)
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;
        parsed
            .verification_url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| TransportError::InvalidResponse("no verification_url in response".into()))
    }

    /// Authenticated POST returning the JSON body.
    ///
    /// A non-success status whose body still carries a vendor `event` is
    /// returned as `Ok`: the vendor is describing a failure, and the
    /// normalizer knows how to read it.
    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Value, TransportError> {
        let token = self.tokens.token().await?;
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            self.tokens.invalidate().await;
            return Err(TransportError::Unauthorized(format!("{path}: HTTP status {status}")));
        }

        let text = response.text().await?;
        let body: Option<Value> = serde_json::from_str(&text).ok();
        match body {
            Some(body) if status.is_success() => Ok(body),
            Some(body) if event_of(&body).is_some() => {
                tracing::debug!(path, %status, "vendor returned an error event");
                Ok(body)
            }
            Some(_) | None if status.is_success() => Err(TransportError::InvalidResponse(format!(
                "{path}: body is not JSON"
            ))),
            _ => Err(TransportError::RequestFailed(format!(
                "{path}: HTTP status {status}"
            ))),
        }
    }
}

/// Polling cadence for the HTTP transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollingConfig {
    pub interval: Duration,
    /// Give up after this long without a terminal event.
    pub cutoff: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            cutoff: Duration::from_secs(300),
        }
    }
}

type TaskMap = Arc<Mutex<HashMap<String, AbortHandle>>>;

/// Transport that creates a verification over HTTP and polls its status.
pub struct HttpPollingTransport {
    client: Arc<HttpApiClient>,
    polling: PollingConfig,
    runtime: Handle,
    tasks: TaskMap,
}

impl HttpPollingTransport {
    pub fn new(client: Arc<HttpApiClient>, polling: PollingConfig, runtime: Handle) -> Self {
        Self {
            client,
            polling,
            runtime,
            tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of verifications currently being polled.
    pub fn active(&self) -> usize {
        self.tasks.lock().map(|t| t.len()).unwrap_or(0)
    }
}

impl VendorTransport for HttpPollingTransport {
    fn name(&self) -> &'static str {
        "http"
    }

    fn submit(
        &self,
        submission: Submission,
        responder: VendorResponder,
    ) -> Result<(), TransportError> {
        let client = Arc::clone(&self.client);
        let polling = self.polling;
        let tasks = Arc::clone(&self.tasks);
        let reference = submission.reference.clone();

        let mut map = self
            .tasks
            .lock()
            .map_err(|_| TransportError::Other("polling task map poisoned".into()))?;
        if map.contains_key(&reference) {
            return Err(TransportError::Other(format!(
                "verification {reference} is already being polled"
            )));
        }

        let task_ref = reference.clone();
        let handle = self.runtime.spawn(async move {
            run_verification(&client, &submission, polling, &responder).await;
            if let Ok(mut tasks) = tasks.lock() {
                tasks.remove(&task_ref);
            }
        });
        map.insert(reference, handle.abort_handle());
        Ok(())
    }

    fn cancel(&self, reference: &str) {
        let handle = self.tasks.lock().ok().and_then(|mut t| t.remove(reference));
        match handle {
            Some(handle) => {
                handle.abort();
                tracing::info!(reference, "stopped polling vendor status");
            }
            None => tracing::debug!(reference, "no polling task to cancel"),
        }
    }
}

async fn run_verification(
    client: &HttpApiClient,
    submission: &Submission,
    polling: PollingConfig,
    responder: &VendorResponder,
) {
    let reference = submission.reference.as_str();

    let created = match client.create_verification(&submission.verification).await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(reference, error = %e, "failed to create verification");
            responder.fail(e);
            return;
        }
    };

    match event_of(&created) {
        Some(event) if !is_in_flight_event(event) && event != "request.received" => {
            responder.respond(RawResponse::Value(created));
            return;
        }
        event => {
            tracing::debug!(reference, event = event.unwrap_or("<none>"), "verification created");
        }
    }

    let started = tokio::time::Instant::now();
    let mut ticker = tokio::time::interval(polling.interval);
    ticker.tick().await;

    loop {
        ticker.tick().await;
        if started.elapsed() >= polling.cutoff {
            tracing::warn!(reference, cutoff_secs = polling.cutoff.as_secs(), "polling cutoff reached");
            responder.fail(TransportError::Timeout(polling.cutoff.as_secs()));
            return;
        }

        match client.status(reference).await {
            Ok(body) => match event_of(&body) {
                Some(event) if is_in_flight_event(event) || event == "request.received" => {
                    tracing::trace!(reference, event, "verification still in flight");
                }
                _ => {
                    responder.respond(RawResponse::Value(body));
                    return;
                }
            },
            Err(e) if e.is_retryable() => {
                tracing::warn!(reference, error = %e, "status poll failed, retrying");
            }
            Err(e) => {
                responder.fail(e);
                return;
            }
        }
    }
}
