//! Validation against a set of configured signers

use crate::error::{Error, Result};
use crate::policy::{verify_legacy, verify_strict, CommonNameRule, StrictPolicy};
use pinsig_cms::{FailureKind, VerificationError, VerifiedSignature};
use pinsig_trust::{SignerMode, SigningCertificate, TrustConfiguration};
use pinsig_x509::Certificate;

#[derive(Debug, Clone)]
enum Mode {
    Legacy,
    Strict(StrictPolicy),
}

/// A pinned signer with its verification mode
#[derive(Debug, Clone)]
pub struct SignerEntry {
    name: String,
    certificate: Certificate,
    mode: Mode,
}

impl SignerEntry {
    /// Pin a signer verified in legacy mode
    pub fn legacy(name: impl Into<String>, certificate: Certificate) -> Self {
        Self {
            name: name.into(),
            certificate,
            mode: Mode::Legacy,
        }
    }

    /// Pin a signer verified in strict mode
    pub fn strict(name: impl Into<String>, certificate: Certificate, policy: StrictPolicy) -> Self {
        Self {
            name: name.into(),
            certificate,
            mode: Mode::Strict(policy),
        }
    }

    /// Get the signer's label
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the pinned certificate
    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    /// Get the strict policy, `None` for legacy signers
    pub fn strict_policy(&self) -> Option<&StrictPolicy> {
        match &self.mode {
            Mode::Legacy => None,
            Mode::Strict(policy) => Some(policy),
        }
    }

    /// Verify a signature with this signer's mode
    pub fn verify(
        &self,
        signature: &[u8],
        content: &[u8],
    ) -> std::result::Result<VerifiedSignature, VerificationError> {
        let pinned = self.certificate.raw_bytes();
        match &self.mode {
            Mode::Legacy => verify_legacy(signature, content, pinned),
            Mode::Strict(policy) => verify_strict(signature, content, pinned, policy),
        }
    }
}

impl TryFrom<&SigningCertificate> for SignerEntry {
    type Error = Error;

    fn try_from(config: &SigningCertificate) -> Result<Self> {
        let certificate = config.parse_certificate()?;

        match config.mode {
            SignerMode::Legacy => Ok(Self::legacy(&config.name, certificate)),
            SignerMode::Strict => {
                let aki = config.authority_key_identifier.clone().ok_or_else(|| {
                    pinsig_trust::Error::Config(format!(
                        "strict signer {:?} has no authority key identifier",
                        config.name
                    ))
                })?;
                let rule = CommonNameRule::from_parts(
                    config.common_name_contains.clone(),
                    config.common_name_suffix.clone(),
                )
                .ok_or_else(|| {
                    pinsig_trust::Error::Config(format!(
                        "strict signer {:?} has no common name rule",
                        config.name
                    ))
                })?;
                Ok(Self::strict(
                    &config.name,
                    certificate,
                    StrictPolicy::new(aki, rule),
                ))
            }
        }
    }
}

/// Validates signatures against every configured signer
///
/// A signature is accepted when any signer accepts it.
#[derive(Debug, Clone, Default)]
pub struct SignatureValidator {
    signers: Vec<SignerEntry>,
}

impl SignatureValidator {
    /// Create a validator from signer entries
    pub fn new(signers: Vec<SignerEntry>) -> Self {
        Self { signers }
    }

    /// Create a validator from the signers of a trust configuration
    pub fn from_configuration(config: &TrustConfiguration) -> Result<Self> {
        let signers = config
            .signers
            .iter()
            .map(SignerEntry::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(signers))
    }

    /// Add a signer
    pub fn push(&mut self, signer: SignerEntry) {
        self.signers.push(signer);
    }

    /// Get the configured signers
    pub fn signers(&self) -> &[SignerEntry] {
        &self.signers
    }

    /// Check whether any signer accepts the signature
    pub fn validate(&self, signature: &[u8], content: &[u8]) -> bool {
        self.verify(signature, content).is_ok()
    }

    /// Find the signer that accepts the signature
    ///
    /// When every signer rejects, the most specific failure is returned:
    /// an untrusted signer ranks above a signature mismatch, which ranks
    /// above malformed input.
    pub fn verify(
        &self,
        signature: &[u8],
        content: &[u8],
    ) -> std::result::Result<&SignerEntry, VerificationError> {
        let mut best: Option<VerificationError> = None;

        for signer in &self.signers {
            match signer.verify(signature, content) {
                Ok(_) => {
                    tracing::debug!(signer = signer.name(), "Signature accepted");
                    return Ok(signer);
                }
                Err(e) => {
                    tracing::debug!(signer = signer.name(), error = %e, "Signer rejected signature");
                    if best.as_ref().map_or(true, |b| rank(&e) > rank(b)) {
                        best = Some(e);
                    }
                }
            }
        }

        Err(best.unwrap_or_else(|| {
            VerificationError::UntrustedSigner("no signers configured".to_string())
        }))
    }
}

fn rank(error: &VerificationError) -> u8 {
    match error.kind() {
        FailureKind::Malformed => 0,
        FailureKind::SignatureMismatch => 1,
        FailureKind::UntrustedSigner => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinsig_x509::KeyIdentifier;

    const PAYLOAD: &[u8] = include_bytes!("../../../test_data/payload.json");
    const ROOT_PEM: &[u8] = include_bytes!("../../../test_data/root-ca.pem");
    const FOO_CA_PEM: &[u8] = include_bytes!("../../../test_data/foo-ca.pem");
    const DETACHED: &[u8] = include_bytes!("../../../test_data/signer-detached.p7s");
    const FOO_CA: &[u8] = include_bytes!("../../../test_data/foo-ca.p7s");
    const DATA_ONLY: &[u8] = include_bytes!("../../../test_data/data-only.der");

    fn root_strict(suffix: &str) -> SignerEntry {
        let root = Certificate::parse(ROOT_PEM).unwrap();
        let aki = KeyIdentifier::new(root.subject_key_identifier().unwrap().as_bytes());
        SignerEntry::strict(
            "root",
            root,
            StrictPolicy::new(aki, CommonNameRule::Suffix(suffix.to_string())),
        )
    }

    fn foo_legacy() -> SignerEntry {
        SignerEntry::legacy("foo", Certificate::parse(FOO_CA_PEM).unwrap())
    }

    #[test]
    fn test_any_signer_accepts() {
        let validator = SignatureValidator::new(vec![foo_legacy(), root_strict(".pinsig.test")]);
        assert_eq!(validator.verify(DETACHED, PAYLOAD).unwrap().name(), "root");
        assert_eq!(validator.verify(FOO_CA, PAYLOAD).unwrap().name(), "foo");
        assert!(validator.validate(DETACHED, PAYLOAD));
        assert!(!validator.validate(DETACHED, b"tampered"));
    }

    #[test]
    fn test_most_specific_error() {
        // foo finds its key but the digest differs; root cannot resolve the signer
        let validator = SignatureValidator::new(vec![foo_legacy(), root_strict(".pinsig.test")]);
        let err = validator.verify(FOO_CA, b"tampered").unwrap_err();
        assert_eq!(err.kind(), FailureKind::UntrustedSigner);

        let validator = SignatureValidator::new(vec![root_strict(".pinsig.test")]);
        let err = validator.verify(DETACHED, b"tampered").unwrap_err();
        assert_eq!(err.kind(), FailureKind::SignatureMismatch);

        let err = validator.verify(DATA_ONLY, PAYLOAD).unwrap_err();
        assert_eq!(err.kind(), FailureKind::Malformed);
    }

    #[test]
    fn test_strict_signer_rejects_wrong_name() {
        let validator = SignatureValidator::new(vec![root_strict(".example.nl")]);
        let err = validator.verify(DETACHED, PAYLOAD).unwrap_err();
        assert_eq!(err.kind(), FailureKind::UntrustedSigner);
    }

    #[test]
    fn test_no_signers() {
        let mut validator = SignatureValidator::default();
        assert!(matches!(
            validator.verify(DETACHED, PAYLOAD),
            Err(VerificationError::UntrustedSigner(_))
        ));

        validator.push(foo_legacy());
        assert_eq!(validator.signers().len(), 1);
        assert!(validator.signers()[0].strict_policy().is_none());
    }
}
