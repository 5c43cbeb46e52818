//! Session state machine.
//!
//! ```text
//! intro → [document_type] → document_front → [document_back] → selfie → review → processing → result
//! ```
//!
//! `document_type` only appears when the host lets the user choose;
//! `document_back` only when the selected document has a back side.
//! Nothing moves backwards out of `processing` or `result`.

use std::collections::BTreeMap;
use std::fmt;

use kyc_types::{CaptureKind, CapturedAsset, DocumentType, SessionReference, Timestamp};
use serde::{Deserialize, Serialize};

use crate::VerificationError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStep {
    Intro,
    DocumentType,
    DocumentFront,
    DocumentBack,
    Selfie,
    Review,
    Processing,
    Result,
}

impl SessionStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intro => "intro",
            Self::DocumentType => "document_type",
            Self::DocumentFront => "document_front",
            Self::DocumentBack => "document_back",
            Self::Selfie => "selfie",
            Self::Review => "review",
            Self::Processing => "processing",
            Self::Result => "result",
        }
    }

    /// The photo this step produces, if it is a capture step.
    pub fn capture_kind(&self) -> Option<CaptureKind> {
        match self {
            Self::DocumentFront => Some(CaptureKind::DocumentFront),
            Self::DocumentBack => Some(CaptureKind::DocumentBack),
            Self::Selfie => Some(CaptureKind::Selfie),
            _ => None,
        }
    }

    /// Whether submission has begun.
    pub fn is_locked(&self) -> bool {
        matches!(self, Self::Processing | Self::Result)
    }

    fn for_capture(kind: CaptureKind) -> Self {
        match kind {
            CaptureKind::DocumentFront => Self::DocumentFront,
            CaptureKind::DocumentBack => Self::DocumentBack,
            CaptureKind::Selfie => Self::Selfie,
        }
    }
}

impl fmt::Display for SessionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host-level flow settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowOptions {
    /// Show the document-type picker after the intro.
    pub choose_document_type: bool,
    pub default_document_type: DocumentType,
}

impl Default for FlowOptions {
    fn default() -> Self {
        Self {
            choose_document_type: true,
            default_document_type: DocumentType::Passport,
        }
    }
}

/// Result of [`VerificationSession::advance`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Advance {
    /// A required input is missing, or the step is locked. Nothing changed.
    Blocked,
    Moved(SessionStep),
    /// The session just entered `processing`; submit exactly once.
    EnteredProcessing,
}

/// One verification session.
#[derive(Clone, Debug)]
pub struct VerificationSession {
    reference: SessionReference,
    step: SessionStep,
    started_at: Timestamp,
    flow: FlowOptions,
    document_type: DocumentType,
    assets: BTreeMap<CaptureKind, CapturedAsset>,
    /// Captured on the current step but not yet committed by `advance`.
    staged: Option<CapturedAsset>,
}

impl VerificationSession {
    pub fn new(reference: SessionReference, flow: FlowOptions, started_at: Timestamp) -> Self {
        Self {
            reference,
            step: SessionStep::Intro,
            started_at,
            flow,
            document_type: flow.default_document_type,
            assets: BTreeMap::new(),
            staged: None,
        }
    }

    pub fn reference(&self) -> &SessionReference {
        &self.reference
    }

    pub fn step(&self) -> SessionStep {
        self.step
    }

    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    pub fn document_type(&self) -> DocumentType {
        self.document_type
    }

    /// Committed assets, in capture order.
    pub fn assets(&self) -> Vec<CapturedAsset> {
        self.assets.values().cloned().collect()
    }

    pub fn asset(&self, kind: CaptureKind) -> Option<&CapturedAsset> {
        self.assets.get(&kind)
    }

    pub fn staged(&self) -> Option<&CapturedAsset> {
        self.staged.as_ref()
    }

    fn requires(&self, kind: CaptureKind) -> bool {
        kind != CaptureKind::DocumentBack || self.document_type.requires_back()
    }

    /// Stage a photo for the current capture step.
    pub fn capture(&mut self, location_ref: impl Into<String>) -> Result<CaptureKind, VerificationError> {
        let kind = self
            .step
            .capture_kind()
            .ok_or(VerificationError::InvalidStep(self.step))?;
        self.staged = Some(CapturedAsset::new(kind, location_ref));
        Ok(kind)
    }

    /// Move forward. Leaving a capture step commits its photo; without one
    /// the call is a no-op.
    pub fn advance(&mut self) -> Advance {
        if let Some(kind) = self.step.capture_kind() {
            match self.staged.take() {
                Some(asset) => {
                    self.assets.insert(kind, asset);
                }
                None if self.assets.contains_key(&kind) => {}
                None => return Advance::Blocked,
            }
        }

        let next = match self.step {
            SessionStep::Intro if self.flow.choose_document_type => SessionStep::DocumentType,
            SessionStep::Intro | SessionStep::DocumentType => SessionStep::DocumentFront,
            SessionStep::DocumentFront if self.document_type.requires_back() => {
                SessionStep::DocumentBack
            }
            SessionStep::DocumentFront | SessionStep::DocumentBack => SessionStep::Selfie,
            SessionStep::Selfie => SessionStep::Review,
            SessionStep::Review => {
                if !self.has_required_assets() {
                    return Advance::Blocked;
                }
                self.step = SessionStep::Processing;
                return Advance::EnteredProcessing;
            }
            SessionStep::Processing | SessionStep::Result => return Advance::Blocked,
        };
        self.step = next;
        Advance::Moved(next)
    }

    /// Move to the previous logical step, discarding any staged photo.
    /// Returns false when nothing moved.
    pub fn go_back(&mut self) -> bool {
        let previous = match self.step {
            SessionStep::Intro | SessionStep::Processing | SessionStep::Result => return false,
            SessionStep::DocumentType => SessionStep::Intro,
            SessionStep::DocumentFront if self.flow.choose_document_type => {
                SessionStep::DocumentType
            }
            SessionStep::DocumentFront => SessionStep::Intro,
            SessionStep::DocumentBack => SessionStep::DocumentFront,
            SessionStep::Selfie if self.document_type.requires_back() => SessionStep::DocumentBack,
            SessionStep::Selfie => SessionStep::DocumentFront,
            SessionStep::Review => SessionStep::Selfie,
        };
        self.staged = None;
        self.step = previous;
        true
    }

    /// Change the document type. A back-side photo that is no longer
    /// required is dropped.
    pub fn select_document_type(&mut self, document_type: DocumentType) -> Result<(), VerificationError> {
        if self.step.is_locked() {
            return Err(VerificationError::InvalidStep(self.step));
        }
        self.document_type = document_type;
        if !document_type.requires_back() {
            self.assets.remove(&CaptureKind::DocumentBack);
            if self.step == SessionStep::DocumentBack {
                self.staged = None;
                self.step = SessionStep::DocumentFront;
            }
        }
        Ok(())
    }

    /// Throw away the photo of `kind` and return to its capture step.
    pub fn retake(&mut self, kind: CaptureKind) -> Result<(), VerificationError> {
        if self.step.is_locked() {
            return Err(VerificationError::InvalidStep(self.step));
        }
        if !self.requires(kind) {
            return Err(VerificationError::CaptureNotRequired(kind.to_string()));
        }
        self.assets.remove(&kind);
        self.staged = None;
        self.step = SessionStep::for_capture(kind);
        Ok(())
    }

    fn has_required_assets(&self) -> bool {
        [
            CaptureKind::DocumentFront,
            CaptureKind::DocumentBack,
            CaptureKind::Selfie,
        ]
        .into_iter()
        .filter(|kind| self.requires(*kind))
        .all(|kind| self.assets.contains_key(&kind))
    }

    /// Enter `result`. Normally from `processing`; a permission denial
    /// ends the flow from a capture step.
    pub fn finish(&mut self) -> bool {
        if self.step == SessionStep::Result {
            return false;
        }
        self.staged = None;
        self.step = SessionStep::Result;
        true
    }

    /// Start over at the first capture step under a new reference, keeping
    /// the document type.
    pub fn reset_for_retry(
        &mut self,
        reference: SessionReference,
        now: Timestamp,
    ) -> Result<(), VerificationError> {
        if self.step != SessionStep::Result {
            return Err(VerificationError::NotFinished);
        }
        self.reference = reference;
        self.started_at = now;
        self.assets.clear();
        self.staged = None;
        self.step = SessionStep::DocumentFront;
        Ok(())
    }

    /// Release every captured asset.
    pub fn abort(&mut self) {
        self.assets.clear();
        self.staged = None;
    }
}
