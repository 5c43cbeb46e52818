//! Identity documents and captured assets.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::KycError;

/// Document types accepted by the vendor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Passport,
    IdCard,
    DrivingLicense,
    CreditOrDebitCard,
}

impl DocumentType {
    pub const ALL: [DocumentType; 4] = [
        Self::Passport,
        Self::IdCard,
        Self::DrivingLicense,
        Self::CreditOrDebitCard,
    ];

    /// Vendor wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passport => "passport",
            Self::IdCard => "id_card",
            Self::DrivingLicense => "driving_license",
            Self::CreditOrDebitCard => "credit_or_debit_card",
        }
    }

    /// Whether a photo of the back side must be captured.
    ///
    /// Passports carry everything on the data page.
    pub fn requires_back(&self) -> bool {
        !matches!(self, Self::Passport)
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = KycError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| KycError::UnknownDocumentType(s.to_string()))
    }
}

/// Which photo a capture step produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureKind {
    DocumentFront,
    DocumentBack,
    Selfie,
}

impl CaptureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DocumentFront => "document_front",
            Self::DocumentBack => "document_back",
            Self::Selfie => "selfie",
        }
    }
}

impl fmt::Display for CaptureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaptureKind {
    type Err = KycError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "document_front" => Ok(Self::DocumentFront),
            "document_back" => Ok(Self::DocumentBack),
            "selfie" => Ok(Self::Selfie),
            other => Err(KycError::UnknownCaptureKind(other.to_string())),
        }
    }
}

/// A photo taken during a capture step.
///
/// The location is an opaque handle owned by the host (usually a file URI);
/// the session never reads the bytes behind it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedAsset {
    pub kind: CaptureKind,
    pub location_ref: String,
}

impl CapturedAsset {
    pub fn new(kind: CaptureKind, location_ref: impl Into<String>) -> Self {
        Self {
            kind,
            location_ref: location_ref.into(),
        }
    }
}
