//! Error types for pinsig-cms

use thiserror::Error;

/// Reasons a signature can be rejected
///
/// `SignatureMismatch` and `UntrustedSigner` are kept apart so callers can
/// tell corrupted data from data of an unknown origin.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    /// Input is not a usable PKCS#7 SignedData structure
    #[error("Malformed signature: {0}")]
    Malformed(String),

    /// A cryptographic check failed
    #[error("Signature mismatch: {0}")]
    SignatureMismatch(String),

    /// The signature verifies but the signer fails the identity policy
    #[error("Untrusted signer: {0}")]
    UntrustedSigner(String),
}

/// Data-free classification of a [`VerificationError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// See [`VerificationError::Malformed`]
    Malformed,
    /// See [`VerificationError::SignatureMismatch`]
    SignatureMismatch,
    /// See [`VerificationError::UntrustedSigner`]
    UntrustedSigner,
}

impl VerificationError {
    /// Get the failure kind without the message
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Malformed(_) => FailureKind::Malformed,
            Self::SignatureMismatch(_) => FailureKind::SignatureMismatch,
            Self::UntrustedSigner(_) => FailureKind::UntrustedSigner,
        }
    }
}

/// Result type for signature verification
pub type Result<T> = std::result::Result<T, VerificationError>;
