//! Access-token exchange for the vendor HTTP API.

use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::Mutex;

use crate::TransportError;

/// Tokens are issued for an hour; refresh a little early.
pub const TOKEN_TTL: Duration = Duration::from_secs(55 * 60);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    #[serde(default)]
    access_token: Option<String>,
}

#[derive(Clone, Debug)]
struct CachedToken {
    token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Exchanges client credentials for a bearer token and caches it.
pub struct AccessTokenService {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    secret_key: String,
    cached: Mutex<Option<CachedToken>>,
}

impl AccessTokenService {
    pub fn new(
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self::with_client(http, base_url, client_id, secret_key)
    }

    pub fn with_client(
        http: reqwest::Client,
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client_id: client_id.into(),
            secret_key: secret_key.into(),
            cached: Mutex::new(None),
        }
    }

    /// Endpoint the token exchange is sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// A valid bearer token, fetching a new one if the cached token expired.
    ///
    /// `POST {base}/get/access/token` with basic auth.
    pub async fn access_token(&self) -> Result<String, TransportError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(Instant::now())) {
            tracing::trace!("using cached access token");
            return Ok(token.token.clone());
        }

        tracing::debug!(base_url = %self.base_url, "fetching vendor access token");
        let url = format!("{}/get/access/token", self.base_url);
        let response = self
            .http
            .post(&url)
            .basic_auth(&self.client_id, Some(&self.secret_key))
            .json(&serde_json::json!({}))
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(TransportError::Unauthorized(format!(
                "token exchange rejected: HTTP status {status}"
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::RequestFailed(format!(
                "token exchange failed: HTTP status {status} - {body}"
            )));
        }

        let body: AccessTokenResponse = response.json().await.map_err(|e| {
            TransportError::InvalidResponse(format!("failed to parse token response: {e}"))
        })?;
        let token = body
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| TransportError::InvalidResponse("no access token in response".into()))?;

        *cached = Some(CachedToken {
            token: token.clone(),
            expires_at: Instant::now() + TOKEN_TTL,
        });
        Ok(token)
    }

    /// Drop the cached token; the next call fetches a fresh one.
    pub async fn clear(&self) {
        *self.cached.lock().await = None;
    }
}

impl std::fmt::Debug for AccessTokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessTokenService")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cached_token_expires() {
        let now = Instant::now();
        let token = CachedToken {
            token: "t".into(),
            expires_at: now + Duration::from_secs(1),
        };
        assert!(token.is_fresh(now));
        assert!(!token.is_fresh(now + Duration::from_secs(2)));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let service = AccessTokenService::new("https://api.example.com/", "id", "key");
        assert_eq!(service.base_url, "https://api.example.com");
    }

    #[test]
    fn debug_omits_secret() {
        let service = AccessTokenService::new("https://api.example.com", "id", "hunter2");
        assert!(!format!("{service:?}").contains("hunter2"));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_unavailable() {
        let service = AccessTokenService::new("http://127.0.0.1:9", "id", "key");
        let err = service.access_token().await.unwrap_err();
        assert!(err.is_retryable(), "unexpected error: {err}");
    }
}
