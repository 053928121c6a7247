//! X.509 certificate model and identity inspection
//!
//! This crate decodes DER or PEM certificates into an immutable
//! [`Certificate`] view and provides the predicates used to pin signers:
//! serial numbers, key identifiers, subjectAltName host matching, common
//! name rules and exact byte equality against a trusted reference.

pub mod certificate;
pub mod encoding;
pub mod error;
pub mod inspect;
pub mod signature;
pub mod trust;

pub use certificate::{parse, Certificate, KeyAlgorithm, PublicKey, SerialNumber, SubjectAltName};
pub use encoding::KeyIdentifier;
pub use error::{DecodeError, Error, Result};
pub use inspect::{
    common_name_contains, common_name_has_suffix, equals_trusted, is_system_trusted,
    matches_authority_key_identifier, matches_hostname, matches_key_identifier,
    matches_serial_number, matching_dns_names,
};
pub use signature::{DigestAlgorithm, SignatureScheme};
pub use trust::TrustEvaluator;
