//! Deferred tasks with cancellation.
//!
//! Guards are scheduled through this trait rather than directly on a runtime
//! so tests can drive them with virtual time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;

use crate::VerificationError;

pub type Task = Box<dyn FnOnce() + Send + 'static>;

pub trait Scheduler: Send + Sync {
    /// Run `task` once after `delay`, unless the returned handle is cancelled first.
    fn schedule(&self, label: &'static str, delay: Duration, task: Task) -> TimerHandle;
}

/// Handle to a scheduled task.
#[derive(Clone, Debug)]
pub struct TimerHandle {
    label: &'static str,
    cancelled: Arc<AtomicBool>,
}

impl TimerHandle {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Prevent the task from running. No effect once it has started.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// [`Scheduler`] backed by tokio timers.
#[derive(Clone, Debug)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Scheduler on the runtime the caller is running in.
    pub fn current() -> Result<Self, VerificationError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| VerificationError::Scheduler(e.to_string()))
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, label: &'static str, delay: Duration, task: Task) -> TimerHandle {
        let handle = TimerHandle::new(label);
        let timer = handle.clone();
        self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            if timer.is_cancelled() {
                tracing::trace!(label = timer.label(), "timer cancelled");
                return;
            }
            task();
        });
        handle
    }
}
