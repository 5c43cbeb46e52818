//! Identity-verification orchestration.
//!
//! A session walks the user through capture steps, hands the collected
//! photos to a vendor transport, and races the vendor's answer against a
//! ladder of timeout guards:
//!
//! 1. **Session**: the step state machine (`intro` … `processing` → `result`).
//! 2. **Normalizer**: maps vendor events, legacy status codes and navigation
//!    URLs onto `verified` / `declined` / `pending` / `error`.
//! 3. **Guards**: checkpoints, a primary timeout and a never-cancelled
//!    force-kill, scheduled through a [`Scheduler`].
//!
//! The [`VerificationOrchestrator`] ties them together and guarantees one
//! terminal observer call per attempt.

pub mod capture;
pub mod error;
pub mod guard;
pub mod messages;
pub mod normalizer;
pub mod observer;
pub mod orchestrator;
pub mod scheduler;
pub mod session;

pub use capture::{CaptureResult, CaptureSource};
pub use error::VerificationError;
pub use guard::{ArmedLadder, GuardConfig, GuardLadder, GuardStage};
pub use messages::{extract_message, user_message};
pub use normalizer::{normalize, Normalized};
pub use observer::{ChannelObserver, SessionEnd, VerificationObserver};
pub use orchestrator::{
    OrchestratorSettings, SessionSnapshot, VerificationOrchestrator, FORCED_TIMEOUT_MESSAGE,
    TIMEOUT_MESSAGE,
};
pub use scheduler::{Scheduler, Task, TimerHandle, TokioScheduler};
pub use session::{Advance, FlowOptions, SessionStep, VerificationSession};
