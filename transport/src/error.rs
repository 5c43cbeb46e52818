use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("vendor transport unavailable: {0}")]
    Unavailable(String),

    #[error("vendor rejected credentials: {0}")]
    Unauthorized(String),

    #[error("vendor request failed: {0}")]
    RequestFailed(String),

    #[error("invalid vendor response: {0}")]
    InvalidResponse(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("vendor did not reach a terminal state within {0}s")]
    Timeout(u64),

    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Whether a polling loop should try again after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::RequestFailed(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Unavailable(format!("request timed out: {e}"))
        } else if e.is_connect() {
            Self::Unavailable(format!("connection failed: {e}"))
        } else if e.is_decode() {
            Self::InvalidResponse(e.to_string())
        } else {
            Self::RequestFailed(e.to_string())
        }
    }
}
