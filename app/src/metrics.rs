//! Prometheus metrics for the KYC host.
//!
//! [`KycMetrics`] owns a dedicated [`Registry`] so several hosts (or tests)
//! in one process never collide on metric names.

use prometheus::{
    register_int_counter_vec_with_registry, register_int_counter_with_registry, Encoder,
    IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

use kyc_types::{FailureKind, VerificationOutcome};

use crate::AppError;

pub struct KycMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    pub sessions_started: IntCounter,
    pub sessions_cancelled: IntCounter,
    /// Terminal outcomes, labelled by status.
    pub outcomes: IntCounterVec,
    /// Outcomes produced by a guard rather than the vendor.
    pub timeouts: IntCounter,
    pub records_written: IntCounter,
}

impl KycMetrics {
    pub fn new() -> Result<Self, AppError> {
        let registry = Registry::new();

        let sessions_started = register_int_counter_with_registry!(
            Opts::new("kyc_sessions_started_total", "Verification sessions started"),
            registry
        )?;

        let sessions_cancelled = register_int_counter_with_registry!(
            Opts::new(
                "kyc_sessions_cancelled_total",
                "Verification sessions cancelled before submission"
            ),
            registry
        )?;

        let outcomes = register_int_counter_vec_with_registry!(
            Opts::new("kyc_outcomes_total", "Terminal verification outcomes"),
            &["status"],
            registry
        )?;

        let timeouts = register_int_counter_with_registry!(
            Opts::new("kyc_timeouts_total", "Attempts ended by a timeout guard"),
            registry
        )?;

        let records_written = register_int_counter_with_registry!(
            Opts::new(
                "kyc_records_written_total",
                "Verification records persisted to the preference store"
            ),
            registry
        )?;

        Ok(Self {
            registry,
            sessions_started,
            sessions_cancelled,
            outcomes,
            timeouts,
            records_written,
        })
    }

    pub fn record_outcome(&self, outcome: &VerificationOutcome) {
        self.outcomes
            .with_label_values(&[outcome.status.as_str()])
            .inc();
        if outcome.failure == Some(FailureKind::Timeout) {
            self.timeouts.inc();
        }
    }

    /// Encode every metric in the Prometheus text exposition format.
    pub fn encode_text(&self) -> Result<String, AppError> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| AppError::Config(e.to_string()))
    }
}
