//! Legacy and strict verification entry points
//!
//! The two modes are separate functions so a caller can never fall back to
//! the permissive one by leaving parameters out.

use pinsig_cms::{verify_signature, SignerPolicy, VerificationError, VerifiedSignature};
use pinsig_x509::KeyIdentifier;

/// Common name requirement of a strict signer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommonNameRule {
    /// The common name must contain the string
    Contains(String),
    /// The common name must end with the string
    Suffix(String),
    /// Both must hold
    ContainsAndSuffix {
        /// Required substring
        contains: String,
        /// Required suffix
        suffix: String,
    },
}

impl CommonNameRule {
    /// Build a rule from optional parts, `None` if both are absent
    pub fn from_parts(contains: Option<String>, suffix: Option<String>) -> Option<Self> {
        match (contains, suffix) {
            (Some(contains), Some(suffix)) => Some(Self::ContainsAndSuffix { contains, suffix }),
            (Some(contains), None) => Some(Self::Contains(contains)),
            (None, Some(suffix)) => Some(Self::Suffix(suffix)),
            (None, None) => None,
        }
    }
}

/// Identity requirements of strict mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrictPolicy {
    /// Authority key identifier the signer must carry
    pub authority_key_identifier: KeyIdentifier,
    /// Common name requirement
    pub common_name: CommonNameRule,
}

impl StrictPolicy {
    /// Create a strict policy
    pub fn new(authority_key_identifier: KeyIdentifier, common_name: CommonNameRule) -> Self {
        Self {
            authority_key_identifier,
            common_name,
        }
    }

    fn signer_policy(&self) -> SignerPolicy {
        let policy = SignerPolicy::signature_only()
            .with_authority_key_identifier(self.authority_key_identifier.clone());

        match &self.common_name {
            CommonNameRule::Contains(needle) => policy.with_common_name_contains(needle.as_str()),
            CommonNameRule::Suffix(suffix) => policy.with_common_name_suffix(suffix.as_str()),
            CommonNameRule::ContainsAndSuffix { contains, suffix } => policy
                .with_common_name_contains(contains.as_str())
                .with_common_name_suffix(suffix.as_str()),
        }
    }
}

/// Verify a signature for cryptographic validity only
///
/// Accepts any signer that links to `signer_cert`. Only for payloads that
/// predate strict signing; new integrations use [`verify_strict`].
pub fn verify_legacy(
    signature: &[u8],
    content: &[u8],
    signer_cert: &[u8],
) -> Result<VerifiedSignature, VerificationError> {
    tracing::debug!("Verifying signature in legacy mode");
    verify_signature(signature, content, signer_cert, &SignerPolicy::signature_only())
}

/// Verify a signature and the signer's AKI and common name
pub fn verify_strict(
    signature: &[u8],
    content: &[u8],
    signer_cert: &[u8],
    policy: &StrictPolicy,
) -> Result<VerifiedSignature, VerificationError> {
    tracing::debug!(
        authority_key_identifier = %policy.authority_key_identifier,
        "Verifying signature in strict mode"
    );
    verify_signature(signature, content, signer_cert, &policy.signer_policy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinsig_cms::FailureKind;

    const PAYLOAD: &[u8] = include_bytes!("../../../test_data/payload.json");
    const ROOT_PEM: &[u8] = include_bytes!("../../../test_data/root-ca.pem");
    const DETACHED: &[u8] = include_bytes!("../../../test_data/signer-detached.p7s");

    fn root_aki() -> KeyIdentifier {
        KeyIdentifier::from_hex("10:E8:30:12:96:2E:9B:E2:C6:58:C6:2E:83:8F:B4:C2:DD:73:52:3F")
            .unwrap()
    }

    #[test]
    fn test_rule_from_parts() {
        assert_eq!(CommonNameRule::from_parts(None, None), None);
        assert_eq!(
            CommonNameRule::from_parts(Some("a".into()), None),
            Some(CommonNameRule::Contains("a".into()))
        );
        assert_eq!(
            CommonNameRule::from_parts(Some("a".into()), Some("b".into())),
            Some(CommonNameRule::ContainsAndSuffix {
                contains: "a".into(),
                suffix: "b".into()
            })
        );
    }

    #[test]
    fn test_strict_and_legacy() {
        verify_legacy(DETACHED, PAYLOAD, ROOT_PEM).unwrap();

        let policy = StrictPolicy::new(
            root_aki(),
            CommonNameRule::Suffix(".bundles.pinsig.test".into()),
        );
        let verified = verify_strict(DETACHED, PAYLOAD, ROOT_PEM, &policy).unwrap();
        assert_eq!(
            verified.signer().common_name(),
            Some("signer.bundles.pinsig.test")
        );

        let policy = StrictPolicy::new(
            root_aki(),
            CommonNameRule::ContainsAndSuffix {
                contains: "signer".into(),
                suffix: ".example.nl".into(),
            },
        );
        let err = verify_strict(DETACHED, PAYLOAD, ROOT_PEM, &policy).unwrap_err();
        assert_eq!(err.kind(), FailureKind::UntrustedSigner);
    }

    #[test]
    fn test_cn_rules_are_case_sensitive() {
        let policy = StrictPolicy::new(root_aki(), CommonNameRule::Contains("SIGNER".into()));
        let err = verify_strict(DETACHED, PAYLOAD, ROOT_PEM, &policy).unwrap_err();
        assert_eq!(err.kind(), FailureKind::UntrustedSigner);
    }
}
