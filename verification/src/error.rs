use kyc_transport::TransportError;
use kyc_types::KycError;
use thiserror::Error;

use crate::session::SessionStep;

#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("no verification session is active")]
    NoActiveSession,

    #[error("verification {0} is already in progress")]
    AlreadyInProgress(String),

    #[error("verification has not reached a result yet")]
    NotFinished,

    #[error("the last outcome does not allow a retry")]
    NotRetryable,

    #[error("operation not allowed at step {0}")]
    InvalidStep(SessionStep),

    #[error("{0} is not captured for the selected document type")]
    CaptureNotRequired(String),

    #[error("invalid guard configuration: {0}")]
    InvalidGuardConfig(String),

    #[error("scheduler error: {0}")]
    Scheduler(String),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Types(#[from] KycError),
}
