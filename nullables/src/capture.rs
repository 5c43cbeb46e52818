//! Nullable capture source: scripted camera results.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use kyc_types::CaptureKind;
use kyc_verification::{CaptureResult, CaptureSource};

/// A camera that returns scripted results.
///
/// Once the script runs out every capture succeeds with
/// `null://<kind>`.
#[derive(Default)]
pub struct NullCaptureSource {
    script: Mutex<VecDeque<CaptureResult>>,
    requested: Mutex<Vec<CaptureKind>>,
}

impl NullCaptureSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scripted(results: impl IntoIterator<Item = CaptureResult>) -> Self {
        Self {
            script: Mutex::new(results.into_iter().collect()),
            requested: Mutex::new(Vec::new()),
        }
    }

    /// Kinds requested so far, in order.
    pub fn requested(&self) -> Vec<CaptureKind> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl CaptureSource for NullCaptureSource {
    async fn capture(&self, kind: CaptureKind) -> CaptureResult {
        self.requested.lock().unwrap().push(kind);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| CaptureResult::Captured(format!("null://{kind}")))
    }
}
