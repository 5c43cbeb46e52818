//! Fundamental types for the KYC verification flow.
//!
//! This crate defines the value types shared across every other crate in the
//! workspace: outcomes and their statuses, document and capture kinds,
//! session references, raw vendor responses, timestamps, and the appearance
//! settings forwarded to the vendor UI.

pub mod appearance;
pub mod document;
pub mod error;
pub mod outcome;
pub mod reference;
pub mod response;
pub mod time;

pub use appearance::{vendor_language_code, Theme};
pub use document::{CaptureKind, CapturedAsset, DocumentType};
pub use error::KycError;
pub use outcome::{FailureKind, RecoveryAction, VerificationOutcome, VerificationStatus};
pub use reference::SessionReference;
pub use response::{classify_navigation_url, RawResponse, StatusCode};
pub use time::Timestamp;
