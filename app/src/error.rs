use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("no vendor credentials configured (set an access token, a journey URL, or client id and secret key)")]
    MissingCredentials,

    #[error("native vendor bridge is not linked into this host")]
    NoNativeBridge,

    #[error("store error: {0}")]
    Store(#[from] kyc_store::StoreError),

    #[error("transport error: {0}")]
    Transport(#[from] kyc_transport::TransportError),

    #[error("verification error: {0}")]
    Verification(#[from] kyc_verification::VerificationError),

    #[error("{0}")]
    Types(#[from] kyc_types::KycError),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
