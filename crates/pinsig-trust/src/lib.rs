//! Trust material for pinned signature and server verification
//!
//! This crate provides:
//! - [`WebpkiTrustEvaluator`], a [`TrustEvaluator`](pinsig_x509::TrustEvaluator)
//!   validating certificates against a fixed anchor set
//! - [`TrustConfiguration`], the JSON description of pinned signers, trusted
//!   names and anchor certificates
//! - [`ServerTrustChecker`], the pinning check for presented server chains

pub mod config;
pub mod error;
pub mod evaluator;
pub mod server;

pub use config::{SignerMode, SigningCertificate, TrustConfiguration};
pub use error::{Error, Result};
pub use evaluator::{ExtendedKeyUsage, WebpkiTrustEvaluator};
pub use server::{SecurityStrategy, ServerTrustChecker, TrustFailure};
