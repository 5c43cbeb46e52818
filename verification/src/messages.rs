//! User-facing message extraction.
//!
//! Vendors bury error text at different depths. The rules below are tried in
//! order and the first non-empty string wins.

use kyc_types::FailureKind;
use serde_json::Value;

type Rule = fn(&Value) -> Option<&str>;

/// `{"error": {"message": ..}}`
fn error_message(payload: &Value) -> Option<&str> {
    payload.get("error")?.get("message")?.as_str()
}

/// `{"verification_result": {"error": {"message": ..}}}`
fn verification_result_error_message(payload: &Value) -> Option<&str> {
    payload
        .get("verification_result")?
        .get("error")?
        .get("message")?
        .as_str()
}

/// `{"error": ".."}`
fn bare_error(payload: &Value) -> Option<&str> {
    payload.get("error")?.as_str()
}

const RULES: [(&str, Rule); 3] = [
    ("error.message", error_message),
    ("verification_result.error.message", verification_result_error_message),
    ("error", bare_error),
];

/// The first message found by the extraction rules, if any.
pub fn extract_message(payload: &Value) -> Option<String> {
    RULES.iter().find_map(|(path, rule)| {
        let message = rule(payload).map(str::trim).filter(|m| !m.is_empty())?;
        tracing::trace!(path, "extracted vendor message");
        Some(message.to_string())
    })
}

/// Extracted message, or the generic message for `kind`.
pub fn user_message(payload: &Value, kind: FailureKind) -> String {
    extract_message(payload).unwrap_or_else(|| kind.default_message().to_string())
}
