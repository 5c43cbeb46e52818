//! Raw vendor responses, before normalization.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::VerificationStatus;

/// Navigation URL fragments that mean the vendor-hosted page finished successfully.
pub const SUCCESS_URL_MARKERS: &[&str] = &[
    "verification/success",
    "verification/complete",
    "verification/accepted",
    "verification/approved",
    "verification/status/success",
];

/// Navigation URL fragments that mean the vendor-hosted page failed or was abandoned.
pub const FAILURE_URL_MARKERS: &[&str] = &[
    "verification/failed",
    "verification/error",
    "verification/declined",
    "verification/cancelled",
    "verification/status/failure",
];

/// Classify a navigation URL by its success/failure markers.
///
/// Returns `None` for ordinary in-flow navigation.
pub fn classify_navigation_url(url: &str) -> Option<VerificationStatus> {
    if SUCCESS_URL_MARKERS.iter().any(|m| url.contains(m)) {
        Some(VerificationStatus::Verified)
    } else if FAILURE_URL_MARKERS.iter().any(|m| url.contains(m)) {
        Some(VerificationStatus::Declined)
    } else {
        None
    }
}

/// Legacy numeric/string status code emitted by older vendor code paths.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusCode {
    Numeric(i64),
    Text(String),
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(code) => write!(f, "{code}"),
            Self::Text(code) => f.write_str(code),
        }
    }
}

/// One signal received from a vendor transport.
#[derive(Clone, Debug, PartialEq)]
pub enum RawResponse {
    /// JSON text as delivered by the native bridge callback or a web-view message.
    Json(String),
    /// Already-decoded JSON (HTTP API bodies).
    Value(serde_json::Value),
    /// A bare status code.
    StatusCode(StatusCode),
    /// A navigation URL observed in the vendor-hosted page.
    NavigationUrl(String),
}

impl RawResponse {
    pub fn json(text: impl Into<String>) -> Self {
        Self::Json(text.into())
    }

    pub fn url(url: impl Into<String>) -> Self {
        Self::NavigationUrl(url.into())
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Json(_) => "json",
            Self::Value(_) => "value",
            Self::StatusCode(_) => "status_code",
            Self::NavigationUrl(_) => "navigation_url",
        }
    }
}
