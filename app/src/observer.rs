//! Observer that persists and counts outcomes before handing them to the host.

use std::sync::Arc;

use kyc_store::{save_outcome, PreferenceStore};
use kyc_types::VerificationOutcome;
use kyc_verification::VerificationObserver;

use crate::KycMetrics;

/// Wraps the host's observer. Every terminal outcome is written to the
/// preference store and counted first; a storage failure is logged and the
/// host still gets its callback.
pub struct PersistingObserver {
    store: Arc<dyn PreferenceStore>,
    metrics: Arc<KycMetrics>,
    email: Option<String>,
    inner: Arc<dyn VerificationObserver>,
}

impl PersistingObserver {
    pub fn new(
        store: Arc<dyn PreferenceStore>,
        metrics: Arc<KycMetrics>,
        email: Option<String>,
        inner: Arc<dyn VerificationObserver>,
    ) -> Self {
        Self {
            store,
            metrics,
            email,
            inner,
        }
    }

    fn persist(&self, outcome: &VerificationOutcome) {
        self.metrics.record_outcome(outcome);
        match save_outcome(self.store.as_ref(), outcome, self.email.as_deref()) {
            Ok(status) => {
                self.metrics.records_written.inc();
                tracing::info!(
                    reference = %outcome.reference,
                    status = %outcome.status,
                    persisted = status.map(|s| s.as_str()).unwrap_or("reference only"),
                    "verification record saved"
                );
            }
            Err(e) => {
                tracing::error!(reference = %outcome.reference, error = %e, "failed to save verification record");
            }
        }
    }
}

impl VerificationObserver for PersistingObserver {
    fn on_complete(&self, outcome: &VerificationOutcome) {
        self.persist(outcome);
        self.inner.on_complete(outcome);
    }

    fn on_cancel(&self) {
        self.metrics.sessions_cancelled.inc();
        self.inner.on_cancel();
    }

    fn on_error(&self, outcome: &VerificationOutcome) {
        self.persist(outcome);
        self.inner.on_error(outcome);
    }
}
