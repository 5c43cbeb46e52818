//! Response normalizer.
//!
//! Collapses every vendor response shape onto one [`VerificationStatus`].
//! Rules are applied in a fixed order and the first match wins:
//!
//! 1. event `verification.accepted` / `verification.approved` → verified
//! 2. event `verification.declined` / `verification.cancelled` → declined
//! 3. event `request.received`, or `status: "pending"` → pending
//! 4. event `error`, or a payload that does not parse → error
//! 5. status code `1000` / `"SP1000"` → verified, `1001` / `"SP1001"` → declined
//! 6. a navigation URL with a success or failure marker
//! 7. anything else → error
//!
//! [`normalize`] is pure and total: it does no I/O and never panics.

use kyc_types::{
    classify_navigation_url, FailureKind, RawResponse, StatusCode, VerificationOutcome,
    VerificationStatus,
};
use serde_json::{json, Value};

use crate::messages::user_message;

const VERIFIED_EVENTS: [&str; 2] = ["verification.accepted", "verification.approved"];
const DECLINED_EVENTS: [&str; 2] = ["verification.declined", "verification.cancelled"];
const PENDING_EVENT: &str = "request.received";
const ERROR_EVENT: &str = "error";

/// The normalizer's verdict on one raw response.
#[derive(Clone, Debug, PartialEq)]
pub struct Normalized {
    pub status: VerificationStatus,
    /// Set for declined and error verdicts.
    pub failure: Option<FailureKind>,
    /// The vendor event, when the payload carried one.
    pub event: Option<String>,
    /// The vendor reference, when the payload carried one.
    pub reference: Option<String>,
    pub message: Option<String>,
    /// Decoded payload kept for diagnostics.
    pub raw: Value,
}

impl Normalized {
    fn new(status: VerificationStatus, failure: Option<FailureKind>, raw: Value) -> Self {
        let message = failure.map(|kind| user_message(&raw, kind));
        let event = raw.get("event").and_then(Value::as_str).map(str::to_string);
        let reference = raw
            .get("reference")
            .and_then(Value::as_str)
            .filter(|r| !r.is_empty())
            .map(str::to_string);
        Self {
            status,
            failure,
            event,
            reference,
            message,
            raw,
        }
    }

    fn verified(raw: Value) -> Self {
        Self::new(VerificationStatus::Verified, None, raw)
    }

    fn declined(raw: Value) -> Self {
        Self::new(
            VerificationStatus::Declined,
            Some(FailureKind::VendorDeclined),
            raw,
        )
    }

    fn pending(raw: Value) -> Self {
        Self::new(VerificationStatus::Pending, None, raw)
    }

    fn error(kind: FailureKind, raw: Value) -> Self {
        Self::new(VerificationStatus::Error, Some(kind), raw)
    }

    /// Turn the verdict into an outcome. The vendor's reference wins over
    /// `session_reference` when the payload carries one.
    pub fn into_outcome(self, session_reference: &str) -> VerificationOutcome {
        VerificationOutcome {
            status: self.status,
            reference: self
                .reference
                .unwrap_or_else(|| session_reference.to_string()),
            raw_vendor_payload: self.raw,
            message: self.message,
            failure: self.failure,
        }
    }
}

/// Normalize one raw vendor response.
pub fn normalize(response: &RawResponse) -> Normalized {
    match response {
        RawResponse::Json(text) => match serde_json::from_str::<Value>(text) {
            Ok(value) => normalize_value(value),
            Err(_) => Normalized::error(
                FailureKind::MalformedResponse,
                Value::String(text.clone()),
            ),
        },
        RawResponse::Value(value) => normalize_value(value.clone()),
        RawResponse::StatusCode(code) => {
            let raw = json!({ "status_code": code });
            let verdict = match code {
                StatusCode::Numeric(n) => from_numeric_code(*n, raw.clone()),
                StatusCode::Text(s) => from_text_code(s, raw.clone()),
            };
            verdict.unwrap_or_else(|| Normalized::error(FailureKind::UnknownEvent, raw))
        }
        RawResponse::NavigationUrl(url) => from_url(url, json!({ "url": url }))
            .unwrap_or_else(|| Normalized::error(FailureKind::UnknownEvent, json!({ "url": url }))),
    }
}

fn normalize_value(value: Value) -> Normalized {
    if value.is_object() {
        return normalize_object(value);
    }
    if value.is_null() || value.is_boolean() || value.is_array() {
        return Normalized::error(FailureKind::MalformedResponse, value);
    }

    // Bare scalars: a legacy status code, or a URL posted as a plain string.
    let verdict = if let Some(code) = value.as_i64() {
        from_numeric_code(code, json!({ "status_code": code }))
    } else if let Some(text) = value.as_str() {
        from_text_code(text, json!({ "status_code": text }))
            .or_else(|| from_url(text, json!({ "url": text })))
    } else {
        None
    };
    verdict.unwrap_or_else(|| Normalized::error(FailureKind::UnknownEvent, value))
}

fn normalize_object(raw: Value) -> Normalized {
    let event = raw.get("event").and_then(Value::as_str).unwrap_or_default();

    if VERIFIED_EVENTS.contains(&event) {
        return Normalized::verified(raw);
    }
    if DECLINED_EVENTS.contains(&event) {
        return Normalized::declined(raw);
    }
    if event == PENDING_EVENT || raw.get("status").and_then(Value::as_str) == Some("pending") {
        return Normalized::pending(raw);
    }
    if event == ERROR_EVENT {
        return Normalized::error(FailureKind::VendorReported, raw);
    }

    let by_code = match raw.get("status_code") {
        Some(Value::Number(n)) => n.as_i64().and_then(|code| from_numeric_code(code, raw.clone())),
        Some(Value::String(s)) => from_text_code(s, raw.clone()),
        _ => None,
    };
    if let Some(verdict) = by_code {
        return verdict;
    }

    if let Some(url) = raw.get("url").and_then(Value::as_str) {
        if let Some(verdict) = from_url(url, raw.clone()) {
            return verdict;
        }
    }

    let kind = match event {
        "request.unauthorized" => FailureKind::Unauthorized,
        "request.timeout" => FailureKind::Timeout,
        _ => FailureKind::UnknownEvent,
    };
    tracing::debug!(event, "unrecognized vendor response");
    Normalized::error(kind, raw)
}

fn from_numeric_code(code: i64, raw: Value) -> Option<Normalized> {
    match code {
        1000 => Some(Normalized::verified(raw)),
        1001 => Some(Normalized::declined(raw)),
        _ => None,
    }
}

fn from_text_code(code: &str, raw: Value) -> Option<Normalized> {
    match code.trim() {
        "SP1000" | "1000" => Some(Normalized::verified(raw)),
        "SP1001" | "1001" => Some(Normalized::declined(raw)),
        _ => None,
    }
}

fn from_url(url: &str, raw: Value) -> Option<Normalized> {
    match classify_navigation_url(url)? {
        VerificationStatus::Verified => Some(Normalized::verified(raw)),
        _ => Some(Normalized::declined(raw)),
    }
}
