//! Top-level error type shared across crates.

use thiserror::Error;

/// Common error type for parsing and validating KYC value types.
#[derive(Debug, Error)]
pub enum KycError {
    #[error("unknown document type: {0}")]
    UnknownDocumentType(String),

    #[error("unknown capture kind: {0}")]
    UnknownCaptureKind(String),

    #[error("unknown verification status: {0}")]
    UnknownStatus(String),

    #[error("unknown theme: {0}")]
    UnknownTheme(String),

    #[error("invalid journey URL: {0}")]
    InvalidJourneyUrl(String),

    #[error("random source unavailable: {0}")]
    Randomness(String),

    #[error("{0}")]
    Other(String),
}
