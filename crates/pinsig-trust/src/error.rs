//! Error types for trust configuration and evaluation

use thiserror::Error;

/// Errors that can occur while loading trust material
#[derive(Debug, Error)]
pub enum Error {
    /// JSON parsing error
    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// File could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path that was being read
        path: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// Certificate parsing error
    #[error("failed to parse certificate: {0}")]
    Certificate(#[from] pinsig_x509::DecodeError),

    /// PEM bundle could not be read
    #[error("failed to parse PEM bundle: {0}")]
    Pem(#[from] pem::PemError),

    /// A certificate cannot serve as a trust anchor
    #[error("invalid trust anchor: {0}")]
    Anchor(String),

    /// The configuration is inconsistent with the certificates it pins
    #[error("invalid trust configuration: {0}")]
    Config(String),
}

/// Result type for trust operations
pub type Result<T> = std::result::Result<T, Error>;
