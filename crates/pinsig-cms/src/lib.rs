//! PKCS#7 / CMS signature verification for pinned signers
//!
//! [`verify_signature`] checks a detached or attached SignedData structure
//! against caller supplied content and a pinned certificate, then applies a
//! [`SignerPolicy`] to the signer's identity.

pub mod asn1;
pub mod error;
pub mod policy;
pub mod verify;

pub use error::{FailureKind, Result, VerificationError};
pub use policy::SignerPolicy;
pub use verify::{verify_signature, VerifiedSignature};
