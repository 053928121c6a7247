//! Signature and digest algorithm selection
//!
//! Maps the algorithm identifiers found in certificates and CMS structures
//! onto aws-lc-rs verification algorithms. Only SHA-2 digests are accepted;
//! SHA-1 based identifiers are reported as unsupported.

use crate::certificate::KeyAlgorithm;
use crate::error::{Error, Result};
use aws_lc_rs::digest;
use aws_lc_rs::signature::{
    VerificationAlgorithm, ECDSA_P256_SHA256_ASN1, ECDSA_P256_SHA384_ASN1,
    ECDSA_P256_SHA512_ASN1, ECDSA_P384_SHA256_ASN1, ECDSA_P384_SHA384_ASN1,
    ECDSA_P384_SHA512_ASN1, ED25519, RSA_PKCS1_2048_8192_SHA256, RSA_PKCS1_2048_8192_SHA384,
    RSA_PKCS1_2048_8192_SHA512, RSA_PSS_2048_8192_SHA256, RSA_PSS_2048_8192_SHA384,
    RSA_PSS_2048_8192_SHA512,
};
use const_oid::db::rfc5912::{
    ECDSA_WITH_SHA_256, ECDSA_WITH_SHA_384, ECDSA_WITH_SHA_512, ID_MGF_1, ID_RSASSA_PSS, ID_SHA_256,
    ID_SHA_384, ID_SHA_512, SHA_256_WITH_RSA_ENCRYPTION, SHA_384_WITH_RSA_ENCRYPTION,
    SHA_512_WITH_RSA_ENCRYPTION,
};
use const_oid::db::rfc8410::ID_ED_25519;
use const_oid::ObjectIdentifier;
use der::{Decode, Sequence};
use std::fmt;
use spki::AlgorithmIdentifierOwned;

/// Supported message digest algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    /// SHA-256
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
}

impl DigestAlgorithm {
    /// Look up a digest algorithm by OID
    pub fn from_oid(oid: &ObjectIdentifier) -> Result<Self> {
        match *oid {
            ID_SHA_256 => Ok(Self::Sha256),
            ID_SHA_384 => Ok(Self::Sha384),
            ID_SHA_512 => Ok(Self::Sha512),
            _ => Err(Error::UnsupportedAlgorithm(format!(
                "digest algorithm {}",
                oid
            ))),
        }
    }

    /// Get the OID of this digest algorithm
    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            Self::Sha256 => ID_SHA_256,
            Self::Sha384 => ID_SHA_384,
            Self::Sha512 => ID_SHA_512,
        }
    }

    /// Hash `data` with this algorithm
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        let algorithm = match self {
            Self::Sha256 => &digest::SHA256,
            Self::Sha384 => &digest::SHA384,
            Self::Sha512 => &digest::SHA512,
        };
        digest::digest(algorithm, data).as_ref().to_vec()
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha256 => f.write_str("SHA-256"),
            Self::Sha384 => f.write_str("SHA-384"),
            Self::Sha512 => f.write_str("SHA-512"),
        }
    }
}

/// A signature scheme, independent of the key it is used with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureScheme {
    /// ECDSA with an ASN.1 encoded signature
    Ecdsa(DigestAlgorithm),
    /// RSA PKCS#1 v1.5
    RsaPkcs1(DigestAlgorithm),
    /// RSA-PSS with MGF1 over the same digest and salt length equal to the digest size
    RsaPss(DigestAlgorithm),
    /// Ed25519 (pure)
    Ed25519,
}

/// RSASSA-PSS-params from RFC 4055
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
struct RsaPssParameters {
    #[asn1(context_specific = "0", tag_mode = "EXPLICIT", optional = "true")]
    hash_algorithm: Option<AlgorithmIdentifierOwned>,
    #[asn1(context_specific = "1", tag_mode = "EXPLICIT", optional = "true")]
    mask_gen_algorithm: Option<AlgorithmIdentifierOwned>,
    #[asn1(context_specific = "2", tag_mode = "EXPLICIT", optional = "true")]
    salt_length: Option<u32>,
    #[asn1(context_specific = "3", tag_mode = "EXPLICIT", optional = "true")]
    trailer_field: Option<u32>,
}

impl SignatureScheme {
    /// Determine the scheme from a combined signature algorithm identifier,
    /// e.g. `ecdsa-with-SHA256` or `sha384WithRSAEncryption`
    pub fn from_algorithm_identifier(alg: &AlgorithmIdentifierOwned) -> Result<Self> {
        match alg.oid {
            ECDSA_WITH_SHA_256 => Ok(Self::Ecdsa(DigestAlgorithm::Sha256)),
            ECDSA_WITH_SHA_384 => Ok(Self::Ecdsa(DigestAlgorithm::Sha384)),
            ECDSA_WITH_SHA_512 => Ok(Self::Ecdsa(DigestAlgorithm::Sha512)),
            SHA_256_WITH_RSA_ENCRYPTION => Ok(Self::RsaPkcs1(DigestAlgorithm::Sha256)),
            SHA_384_WITH_RSA_ENCRYPTION => Ok(Self::RsaPkcs1(DigestAlgorithm::Sha384)),
            SHA_512_WITH_RSA_ENCRYPTION => Ok(Self::RsaPkcs1(DigestAlgorithm::Sha512)),
            ID_RSASSA_PSS => Self::from_pss_parameters(alg),
            ID_ED_25519 => Ok(Self::Ed25519),
            oid => Err(Error::UnsupportedAlgorithm(format!(
                "signature algorithm {}",
                oid
            ))),
        }
    }

    fn from_pss_parameters(alg: &AlgorithmIdentifierOwned) -> Result<Self> {
        let params = alg.parameters.as_ref().ok_or_else(|| {
            Error::UnsupportedAlgorithm("RSA-PSS without parameters".to_string())
        })?;
        let params_der = der::Encode::to_der(params)
            .map_err(|e| Error::UnsupportedAlgorithm(format!("invalid RSA-PSS parameters: {}", e)))?;
        let params = RsaPssParameters::from_der(&params_der)
            .map_err(|e| Error::UnsupportedAlgorithm(format!("invalid RSA-PSS parameters: {}", e)))?;

        // An absent hash algorithm means SHA-1
        let hash = params.hash_algorithm.ok_or_else(|| {
            Error::UnsupportedAlgorithm("RSA-PSS with SHA-1".to_string())
        })?;
        let digest = DigestAlgorithm::from_oid(&hash.oid)?;

        // An absent mask generation function means MGF1 with SHA-1
        let mgf = params.mask_gen_algorithm.ok_or_else(|| {
            Error::UnsupportedAlgorithm("RSA-PSS with MGF1/SHA-1".to_string())
        })?;
        if mgf.oid != ID_MGF_1 {
            return Err(Error::UnsupportedAlgorithm(format!(
                "RSA-PSS mask generation function {}",
                mgf.oid
            )));
        }
        let mgf_hash = mgf
            .parameters
            .as_ref()
            .and_then(|p| p.decode_as::<AlgorithmIdentifierOwned>().ok())
            .ok_or_else(|| Error::UnsupportedAlgorithm("RSA-PSS MGF1 without hash".to_string()))?;
        if mgf_hash.oid != hash.oid {
            return Err(Error::UnsupportedAlgorithm(format!(
                "RSA-PSS MGF1 hash {} differs from {}",
                mgf_hash.oid, digest
            )));
        }

        // The salt length defaults to 20, which no SHA-2 digest matches
        let expected_salt = match digest {
            DigestAlgorithm::Sha256 => 32,
            DigestAlgorithm::Sha384 => 48,
            DigestAlgorithm::Sha512 => 64,
        };
        let salt = params.salt_length.unwrap_or(20);
        if salt != expected_salt {
            return Err(Error::UnsupportedAlgorithm(format!(
                "RSA-PSS salt length {} with {}",
                salt, digest
            )));
        }

        Ok(Self::RsaPss(digest))
    }

    /// Get the digest algorithm, if the scheme has a separate one
    pub fn digest_algorithm(&self) -> Option<DigestAlgorithm> {
        match self {
            Self::Ecdsa(d) | Self::RsaPkcs1(d) | Self::RsaPss(d) => Some(*d),
            Self::Ed25519 => None,
        }
    }

    /// Select the aws-lc-rs algorithm for this scheme and key type
    pub fn verification_algorithm(
        &self,
        key: &KeyAlgorithm,
    ) -> Result<&'static dyn VerificationAlgorithm> {
        use DigestAlgorithm::*;

        let algorithm: &'static dyn VerificationAlgorithm = match (self, key) {
            (Self::Ecdsa(Sha256), KeyAlgorithm::EcP256) => &ECDSA_P256_SHA256_ASN1,
            (Self::Ecdsa(Sha384), KeyAlgorithm::EcP256) => &ECDSA_P256_SHA384_ASN1,
            (Self::Ecdsa(Sha512), KeyAlgorithm::EcP256) => &ECDSA_P256_SHA512_ASN1,
            (Self::Ecdsa(Sha256), KeyAlgorithm::EcP384) => &ECDSA_P384_SHA256_ASN1,
            (Self::Ecdsa(Sha384), KeyAlgorithm::EcP384) => &ECDSA_P384_SHA384_ASN1,
            (Self::Ecdsa(Sha512), KeyAlgorithm::EcP384) => &ECDSA_P384_SHA512_ASN1,
            (Self::RsaPkcs1(Sha256), KeyAlgorithm::Rsa) => &RSA_PKCS1_2048_8192_SHA256,
            (Self::RsaPkcs1(Sha384), KeyAlgorithm::Rsa) => &RSA_PKCS1_2048_8192_SHA384,
            (Self::RsaPkcs1(Sha512), KeyAlgorithm::Rsa) => &RSA_PKCS1_2048_8192_SHA512,
            (Self::RsaPss(Sha256), KeyAlgorithm::Rsa) => &RSA_PSS_2048_8192_SHA256,
            (Self::RsaPss(Sha384), KeyAlgorithm::Rsa) => &RSA_PSS_2048_8192_SHA384,
            (Self::RsaPss(Sha512), KeyAlgorithm::Rsa) => &RSA_PSS_2048_8192_SHA512,
            (Self::Ed25519, KeyAlgorithm::Ed25519) => &ED25519,
            _ => {
                return Err(Error::InvalidKey(format!(
                    "{} cannot be used with a {} key",
                    self, key
                )))
            }
        };

        Ok(algorithm)
    }
}

impl fmt::Display for SignatureScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ecdsa(d) => write!(f, "ECDSA/{}", d),
            Self::RsaPkcs1(d) => write!(f, "RSA-PKCS1/{}", d),
            Self::RsaPss(d) => write!(f, "RSA-PSS/{}", d),
            Self::Ed25519 => f.write_str("Ed25519"),
        }
    }
}
