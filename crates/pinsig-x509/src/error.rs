//! Error types for pinsig-x509

use thiserror::Error;

/// A certificate could not be decoded
///
/// Decoding is atomic: either a complete [`Certificate`](crate::Certificate)
/// is produced or this error is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Structural ASN.1 violation, bad PEM armor or unsupported version
    #[error("Malformed certificate: {0}")]
    Malformed(String),
}

/// Errors that can occur when checking signatures with certificate keys
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Certificate decoding error
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Signature or digest algorithm is not supported
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The key cannot be used with the requested algorithm
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Signature did not verify
    #[error("Signature invalid: {0}")]
    SignatureInvalid(String),
}

/// Result type for certificate operations
pub type Result<T> = std::result::Result<T, Error>;
