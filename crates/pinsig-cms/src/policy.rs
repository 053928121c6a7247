//! Identity policy applied to the resolved signer certificate

use crate::error::{Result, VerificationError};
use pinsig_x509::{inspect, Certificate, KeyIdentifier};

/// Identity requirements on the signer certificate
///
/// Every populated field must hold for a signature to be accepted. A policy
/// with no fields set only gates on cryptographic validity; it has to be
/// requested explicitly through [`SignerPolicy::signature_only`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerPolicy {
    /// Required authority key identifier of the signer
    pub authority_key_identifier: Option<KeyIdentifier>,
    /// Substring the signer's common name must contain
    pub common_name_contains: Option<String>,
    /// Suffix the signer's common name must end with
    pub common_name_suffix: Option<String>,
}

impl SignerPolicy {
    /// Accept any signer whose signature verifies against the pinned certificate
    pub fn signature_only() -> Self {
        Self {
            authority_key_identifier: None,
            common_name_contains: None,
            common_name_suffix: None,
        }
    }

    /// Require the signer's AKI to match
    pub fn with_authority_key_identifier(mut self, aki: KeyIdentifier) -> Self {
        self.authority_key_identifier = Some(aki);
        self
    }

    /// Require the signer's common name to contain `needle`
    pub fn with_common_name_contains(mut self, needle: impl Into<String>) -> Self {
        self.common_name_contains = Some(needle.into());
        self
    }

    /// Require the signer's common name to end with `suffix`
    pub fn with_common_name_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.common_name_suffix = Some(suffix.into());
        self
    }

    /// Check whether no identity requirement is set
    pub fn is_signature_only(&self) -> bool {
        self.authority_key_identifier.is_none()
            && self.common_name_contains.is_none()
            && self.common_name_suffix.is_none()
    }

    /// Apply the policy to a signer certificate
    pub fn enforce(&self, signer: &Certificate) -> Result<()> {
        if let Some(aki) = &self.authority_key_identifier {
            if !inspect::matches_authority_key_identifier(signer, aki) {
                return Err(VerificationError::UntrustedSigner(format!(
                    "authority key identifier {} does not match {}",
                    signer
                        .authority_key_identifier()
                        .map(|id| id.to_string())
                        .unwrap_or_else(|| "(none)".to_string()),
                    aki
                )));
            }
        }

        if let Some(needle) = &self.common_name_contains {
            if !inspect::common_name_contains(signer, needle) {
                return Err(VerificationError::UntrustedSigner(format!(
                    "common name {:?} does not contain {:?}",
                    signer.common_name(),
                    needle
                )));
            }
        }

        if let Some(suffix) = &self.common_name_suffix {
            if !inspect::common_name_has_suffix(signer, suffix) {
                return Err(VerificationError::UntrustedSigner(format!(
                    "common name {:?} does not end with {:?}",
                    signer.common_name(),
                    suffix
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIGNER_PEM: &[u8] = include_bytes!("../../../test_data/signer.pem");
    const NO_CN_PEM: &[u8] = include_bytes!("../../../test_data/no-cn-signer.pem");

    #[test]
    fn test_signature_only_accepts_anything() {
        let policy = SignerPolicy::signature_only();
        assert!(policy.is_signature_only());
        policy
            .enforce(&Certificate::parse(NO_CN_PEM).unwrap())
            .unwrap();
    }

    #[test]
    fn test_all_rules_must_hold() {
        let signer = Certificate::parse(SIGNER_PEM).unwrap();
        let aki = signer.authority_key_identifier().unwrap().clone();

        let policy = SignerPolicy::signature_only()
            .with_authority_key_identifier(aki)
            .with_common_name_contains(".bundles.")
            .with_common_name_suffix(".pinsig.test");
        assert!(!policy.is_signature_only());
        policy.enforce(&signer).unwrap();

        let err = policy
            .clone()
            .with_common_name_suffix(".example.org")
            .enforce(&signer)
            .unwrap_err();
        assert!(matches!(err, VerificationError::UntrustedSigner(_)));
    }

    #[test]
    fn test_missing_common_name_fails_cn_rules() {
        let no_cn = Certificate::parse(NO_CN_PEM).unwrap();
        let policy = SignerPolicy::signature_only().with_common_name_contains("");
        assert!(matches!(
            policy.enforce(&no_cn),
            Err(VerificationError::UntrustedSigner(_))
        ));
    }
}
