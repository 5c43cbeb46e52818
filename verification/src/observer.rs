//! The caller-facing end of a session.

use kyc_types::VerificationOutcome;
use tokio::sync::mpsc;

/// The host screen's three callbacks. Exactly one of them is invoked per
/// session attempt.
pub trait VerificationObserver: Send + Sync {
    /// `verified` or `pending`.
    fn on_complete(&self, outcome: &VerificationOutcome);
    /// The user cancelled before submission.
    fn on_cancel(&self);
    /// `declined` or `error`.
    fn on_error(&self, outcome: &VerificationOutcome);
}

/// How a session ended.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEnd {
    Completed(VerificationOutcome),
    Failed(VerificationOutcome),
    Cancelled,
}

impl SessionEnd {
    pub fn outcome(&self) -> Option<&VerificationOutcome> {
        match self {
            Self::Completed(outcome) | Self::Failed(outcome) => Some(outcome),
            Self::Cancelled => None,
        }
    }
}

/// Observer that forwards session ends into a tokio channel.
#[derive(Clone, Debug)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<SessionEnd>,
}

impl ChannelObserver {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SessionEnd>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, end: SessionEnd) {
        if self.tx.send(end).is_err() {
            tracing::debug!("session end dropped, receiver closed");
        }
    }
}

impl VerificationObserver for ChannelObserver {
    fn on_complete(&self, outcome: &VerificationOutcome) {
        self.send(SessionEnd::Completed(outcome.clone()));
    }

    fn on_cancel(&self) {
        self.send(SessionEnd::Cancelled);
    }

    fn on_error(&self, outcome: &VerificationOutcome) {
        self.send(SessionEnd::Failed(outcome.clone()));
    }
}
