//! Terminal verification outcomes.
//!
//! Every session ends in exactly one [`VerificationOutcome`]. The vendor's
//! many response shapes collapse onto four [`VerificationStatus`] values; the
//! finer-grained [`FailureKind`] only exists to pick a user-facing message and
//! a recovery affordance.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::KycError;

/// The public status of a finished verification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// The vendor accepted the identity.
    Verified,
    /// The vendor declined the identity, or the user cancelled inside the vendor UI.
    Declined,
    /// The vendor received the request but has not decided yet (soft success).
    Pending,
    /// Anything else: timeouts, transport failures, unparseable payloads.
    Error,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verified => "verified",
            Self::Declined => "declined",
            Self::Pending => "pending",
            Self::Error => "error",
        }
    }

    /// Whether the caller's `on_complete` (rather than `on_error`) receives this outcome.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Verified | Self::Pending)
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerificationStatus {
    type Err = KycError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "verified" => Ok(Self::Verified),
            "declined" => Ok(Self::Declined),
            "pending" => Ok(Self::Pending),
            "error" => Ok(Self::Error),
            other => Err(KycError::UnknownStatus(other.to_string())),
        }
    }
}

/// Why a session did not end in `verified` or `pending`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The vendor module or network was not reachable.
    TransportUnavailable,
    /// Camera or storage permission was refused.
    PermissionDenied,
    /// The primary or force-kill guard fired.
    Timeout,
    /// The vendor payload could not be parsed.
    MalformedResponse,
    /// The vendor explicitly declined or the user cancelled in the vendor UI.
    VendorDeclined,
    /// The vendor reported an `error` event.
    VendorReported,
    /// The vendor rejected our credentials or journey token.
    Unauthorized,
    /// An event or status code we do not recognise.
    UnknownEvent,
}

impl FailureKind {
    /// Generic message used when the vendor payload carries none.
    pub fn default_message(&self) -> &'static str {
        match self {
            Self::TransportUnavailable => "verification service is unavailable",
            Self::PermissionDenied => "camera or storage permission was denied",
            Self::Timeout => "verification timeout",
            Self::MalformedResponse => "failed to parse verification response",
            Self::VendorDeclined => "verification was declined",
            Self::VendorReported => "verification error",
            Self::Unauthorized => "verification link has expired or is invalid",
            Self::UnknownEvent => "unexpected response from verification",
        }
    }

    /// The affordance the host UI offers for this failure.
    pub fn recovery(&self) -> RecoveryAction {
        match self {
            Self::PermissionDenied => RecoveryAction::Dismiss,
            Self::VendorDeclined => RecoveryAction::RetryOrCancel,
            _ => RecoveryAction::Retry,
        }
    }
}

/// What the host screen offers after a failed session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    /// End the flow with a dismissible message.
    Dismiss,
    /// Offer a retry that resets to the first capture step.
    Retry,
    /// Offer either retry or cancel.
    RetryOrCancel,
}

/// The single terminal result of a verification session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub status: VerificationStatus,
    /// Session reference (caller- or vendor-generated).
    pub reference: String,
    /// The vendor payload the outcome was derived from, kept for diagnostics.
    pub raw_vendor_payload: serde_json::Value,
    /// User-facing message, present for declined and error outcomes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

impl VerificationOutcome {
    /// Build a locally synthesised error outcome (no vendor payload involved).
    pub fn failure(
        reference: impl Into<String>,
        kind: FailureKind,
        message: impl Into<String>,
    ) -> Self {
        let message = message.into();
        Self {
            status: VerificationStatus::Error,
            reference: reference.into(),
            raw_vendor_payload: serde_json::json!({ "event": "error", "error": message }),
            message: Some(message),
            failure: Some(kind),
        }
    }

    /// The recovery affordance for this outcome, if it is a failure.
    pub fn recovery(&self) -> Option<RecoveryAction> {
        self.failure.map(|kind| kind.recovery())
    }
}
