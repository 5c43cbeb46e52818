//! Capture sources.
//!
//! A capture step suspends until the host's camera or gallery returns one
//! photo or gives up.

use async_trait::async_trait;
use kyc_types::CaptureKind;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CaptureResult {
    /// Opaque location of the photo (usually a file URI).
    Captured(String),
    /// The user backed out of the camera or picker.
    Cancelled,
    /// Camera or storage permission was refused.
    PermissionDenied,
}

#[async_trait]
pub trait CaptureSource: Send + Sync {
    async fn capture(&self, kind: CaptureKind) -> CaptureResult;
}
