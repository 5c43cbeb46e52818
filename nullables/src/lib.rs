//! Nullable infrastructure for deterministic testing.
//!
//! Every external collaborator of a verification session (timers, the
//! vendor transport, the native SDK bridge, the preference store, the
//! camera) sits behind a trait. This crate provides test-friendly
//! implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the clock, the filesystem or the network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod bridge;
pub mod capture;
pub mod observer;
pub mod scheduler;
pub mod store;
pub mod transport;

pub use bridge::NullBridge;
pub use capture::NullCaptureSource;
pub use observer::RecordingObserver;
pub use scheduler::{FiredTimer, NullScheduler};
pub use store::NullPreferenceStore;
pub use transport::NullTransport;
