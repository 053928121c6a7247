//! Verify signed configuration and key bundles against pinned authorities
//!
//! This crate ties the certificate model, the PKCS#7 verifier and the trust
//! configuration together:
//!
//! - [`verify_legacy`] and [`verify_strict`] are the two verification modes
//! - [`SignatureValidator`] tries every configured signer
//! - [`core_bridge`] is the opaque boundary to the credential core
//!
//! # Example
//!
//! ```no_run
//! use pinsig::{verify_strict, CommonNameRule, KeyIdentifier, StrictPolicy};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let signature = std::fs::read("config.json.sig")?;
//! let content = std::fs::read("config.json")?;
//! let root = std::fs::read("root-ca.pem")?;
//!
//! let policy = StrictPolicy::new(
//!     KeyIdentifier::from_hex("10:E8:30:12:96:2E:9B:E2:C6:58:C6:2E:83:8F:B4:C2:DD:73:52:3F")?,
//!     CommonNameRule::Suffix(".bundles.pinsig.test".to_string()),
//! );
//! let verified = verify_strict(&signature, &content, &root, &policy)?;
//! println!("signed by {:?}", verified.signer().common_name());
//! # Ok(())
//! # }
//! ```

pub mod core_bridge;
pub mod error;
pub mod policy;
pub mod validator;

// Re-export component crates
pub use pinsig_cms as cms;
pub use pinsig_trust as trust;
pub use pinsig_x509 as x509;

pub use error::{Error, Result};
pub use pinsig_cms::{FailureKind, VerificationError, VerifiedSignature};
pub use pinsig_x509::{Certificate, DecodeError, KeyIdentifier};
pub use policy::{verify_legacy, verify_strict, CommonNameRule, StrictPolicy};
pub use validator::{SignatureValidator, SignerEntry};
