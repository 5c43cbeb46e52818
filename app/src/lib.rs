//! KYC host composition.
//!
//! Wires the verification core to a concrete host:
//! - TOML configuration ([`AppConfig`])
//! - the persisted verification record, written on every terminal outcome
//! - Prometheus counters ([`KycMetrics`])
//! - transport selection (native bridge, HTTP polling, hosted web view)

pub mod app;
pub mod config;
pub mod error;
pub mod metrics;
pub mod observer;

pub use app::{HostBindings, KycApp};
pub use config::{AppConfig, TransportKind};
pub use error::AppError;
pub use metrics::KycMetrics;
pub use observer::PersistingObserver;
