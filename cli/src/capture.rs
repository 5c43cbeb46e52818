//! Capture source backed by image files on disk.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use kyc_types::CaptureKind;
use kyc_verification::{CaptureResult, CaptureSource};

/// Serves each capture step from a file, encoded as a data URI.
pub struct FileCaptureSource {
    front: PathBuf,
    back: Option<PathBuf>,
    selfie: PathBuf,
}

impl FileCaptureSource {
    pub fn new(front: PathBuf, back: Option<PathBuf>, selfie: PathBuf) -> Self {
        Self {
            front,
            back,
            selfie,
        }
    }

    fn path_for(&self, kind: CaptureKind) -> Option<&Path> {
        match kind {
            CaptureKind::DocumentFront => Some(&self.front),
            CaptureKind::DocumentBack => self.back.as_deref(),
            CaptureKind::Selfie => Some(&self.selfie),
        }
    }
}

fn mime_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}

#[async_trait]
impl CaptureSource for FileCaptureSource {
    async fn capture(&self, kind: CaptureKind) -> CaptureResult {
        let Some(path) = self.path_for(kind) else {
            tracing::warn!(kind = %kind, "no image given for this step");
            return CaptureResult::Cancelled;
        };
        match tokio::fs::read(path).await {
            Ok(bytes) => {
                tracing::debug!(kind = %kind, path = %path.display(), bytes = bytes.len(), "image loaded");
                CaptureResult::Captured(format!(
                    "data:{};base64,{}",
                    mime_type(path),
                    STANDARD.encode(bytes)
                ))
            }
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                tracing::warn!(path = %path.display(), "image not readable");
                CaptureResult::PermissionDenied
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "image could not be loaded");
                CaptureResult::Cancelled
            }
        }
    }
}
