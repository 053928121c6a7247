//! Error types for pinsig

use thiserror::Error;

/// Errors that can occur in pinsig operations
#[derive(Error, Debug)]
pub enum Error {
    /// Certificate decoding error
    #[error("Certificate error: {0}")]
    Decode(#[from] pinsig_x509::DecodeError),

    /// Signature verification error
    #[error("Verification error: {0}")]
    Verification(#[from] pinsig_cms::VerificationError),

    /// Trust configuration error
    #[error("Trust error: {0}")]
    Trust(#[from] pinsig_trust::Error),

    /// JSON encoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The credential core reported an error
    #[error("Credential core error: {0}")]
    Core(String),
}

/// Result type for pinsig operations
pub type Result<T> = std::result::Result<T, Error>;
