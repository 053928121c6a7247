//! PKCS#7 / CMS SignedData verification against a pinned certificate
//!
//! The pinned certificate is either the signer itself or the issuer of an
//! embedded signer certificate. Deeper chains are not built.
//!
//! Verification proceeds in the same order for every SignerInfo:
//! 1. Resolve the signer certificate referenced by the SignerInfo
//! 2. Check the content digest and the signature over it
//! 3. Link the signer to the pinned certificate, cross-checking a pinned
//!    signer against the embedded certificates
//! 4. Apply the identity policy

use crate::asn1;
use crate::error::{Result, VerificationError};
use crate::policy::SignerPolicy;
use cms::signed_data::{SignedData, SignerInfo};
use const_oid::db::rfc5912::{ID_EC_PUBLIC_KEY, RSA_ENCRYPTION};
use pinsig_x509::{Certificate, DigestAlgorithm, SignatureScheme};
use std::borrow::Cow;

/// A signature that passed verification
#[derive(Debug, Clone)]
pub struct VerifiedSignature {
    signer: Certificate,
    digest_algorithm: DigestAlgorithm,
}

impl VerifiedSignature {
    /// Get the certificate that produced the signature
    pub fn signer(&self) -> &Certificate {
        &self.signer
    }

    /// Take ownership of the signer certificate
    pub fn into_signer(self) -> Certificate {
        self.signer
    }

    /// Get the digest algorithm the signer used over the content
    pub fn digest_algorithm(&self) -> DigestAlgorithm {
        self.digest_algorithm
    }
}

/// Verify a DER encoded PKCS#7 signature over `content`
///
/// `signer_cert` (DER or PEM) is the pinned certificate: either the signer
/// itself or the certificate that issued it. Every SignerInfo in the
/// structure must verify and satisfy `policy`.
///
/// # Errors
///
/// * [`VerificationError::Malformed`] if `signature` is not SignedData or has
///   no signer infos
/// * [`VerificationError::UntrustedSigner`] if `signer_cert` cannot be
///   decoded, the signer cannot be linked to it, or `policy` rejects it
/// * [`VerificationError::SignatureMismatch`] on any cryptographic failure,
///   including unsupported digest algorithms
pub fn verify_signature(
    signature: &[u8],
    content: &[u8],
    signer_cert: &[u8],
    policy: &SignerPolicy,
) -> Result<VerifiedSignature> {
    tracing::debug!("Starting PKCS#7 signature verification");

    let signed_data = asn1::decode_signed_data(signature)?;

    let pinned = Certificate::parse(signer_cert).map_err(|e| {
        VerificationError::UntrustedSigner(format!("invalid signer certificate: {}", e))
    })?;

    if let Some(attached) = asn1::attached_content(&signed_data) {
        if attached != content {
            return Err(VerificationError::SignatureMismatch(
                "attached content differs from the supplied content".to_string(),
            ));
        }
    }

    let embedded = asn1::embedded_certificates(&signed_data);

    // The pinned certificate is preferred over embedded copies
    let mut candidates = vec![pinned.clone()];
    candidates.extend(embedded.iter().cloned());

    let mut verified = Vec::with_capacity(signed_data.signer_infos.0.len());
    for signer_info in signed_data.signer_infos.0.iter() {
        verified.push(verify_signer_info(
            &signed_data,
            signer_info,
            content,
            &pinned,
            &candidates,
            &embedded,
            policy,
        )?);
    }

    tracing::debug!(
        signers = verified.len(),
        "PKCS#7 signature verification completed successfully"
    );

    verified.into_iter().next().ok_or_else(|| {
        VerificationError::Malformed("SignedData contains no signer infos".to_string())
    })
}

fn verify_signer_info(
    signed_data: &SignedData,
    signer_info: &SignerInfo,
    content: &[u8],
    pinned: &Certificate,
    candidates: &[Certificate],
    embedded: &[Certificate],
    policy: &SignerPolicy,
) -> Result<VerifiedSignature> {
    let signer = candidates
        .iter()
        .find(|cert| asn1::identifies(&signer_info.sid, cert))
        .ok_or_else(|| {
            VerificationError::UntrustedSigner(
                "no certificate matches the signer identifier".to_string(),
            )
        })?;

    tracing::debug!(
        serial = %signer.serial_number(),
        common_name = signer.common_name().unwrap_or(""),
        "Resolved signer certificate"
    );

    let digest_algorithm = DigestAlgorithm::from_oid(&signer_info.digest_alg.oid)
        .map_err(|e| VerificationError::SignatureMismatch(e.to_string()))?;

    verify_content_signature(signed_data, signer_info, signer, digest_algorithm, content)?;
    verify_anchor(signer, pinned)?;
    if signer == pinned {
        verify_pinned_against_embedded(signer_info, pinned, embedded)?;
    }
    policy.enforce(signer)?;

    Ok(VerifiedSignature {
        signer: signer.clone(),
        digest_algorithm,
    })
}

/// Verify the SignerInfo signature with the signer's public key
///
/// With signed attributes the signature covers the attributes, which in turn
/// carry the content digest. Without them it covers the content directly.
fn verify_content_signature(
    signed_data: &SignedData,
    signer_info: &SignerInfo,
    signer: &Certificate,
    digest_algorithm: DigestAlgorithm,
    content: &[u8],
) -> Result<()> {
    let message: Cow<'_, [u8]> = match &signer_info.signed_attrs {
        Some(attrs) => {
            let expected = asn1::message_digest(attrs)?;
            let actual = digest_algorithm.digest(content);
            if expected != actual {
                return Err(VerificationError::SignatureMismatch(format!(
                    "content digest mismatch: expected {}, got {}",
                    hex::encode(&expected),
                    hex::encode(&actual)
                )));
            }

            if let Some(content_type) = asn1::content_type(attrs)? {
                if content_type != signed_data.encap_content_info.econtent_type {
                    return Err(VerificationError::SignatureMismatch(format!(
                        "content-type attribute {} does not match {}",
                        content_type, signed_data.encap_content_info.econtent_type
                    )));
                }
            }

            Cow::Owned(asn1::signed_attributes_der(attrs)?)
        }
        None => Cow::Borrowed(content),
    };

    let scheme = signer_scheme(signer_info, digest_algorithm)
        .map_err(|e| VerificationError::SignatureMismatch(e.to_string()))?;

    signer
        .public_key()
        .verify(scheme, &message, signer_info.signature.as_bytes())
        .map_err(|e| VerificationError::SignatureMismatch(e.to_string()))?;

    tracing::debug!(%scheme, "Content signature verified");
    Ok(())
}

/// Determine the signature scheme of a SignerInfo
///
/// CMS allows the bare key algorithm (`rsaEncryption`, `id-ecPublicKey`) as
/// signature algorithm, in which case the digest comes from `digestAlgorithm`.
fn signer_scheme(
    signer_info: &SignerInfo,
    digest_algorithm: DigestAlgorithm,
) -> pinsig_x509::Result<SignatureScheme> {
    match signer_info.signature_algorithm.oid {
        RSA_ENCRYPTION => Ok(SignatureScheme::RsaPkcs1(digest_algorithm)),
        ID_EC_PUBLIC_KEY => Ok(SignatureScheme::Ecdsa(digest_algorithm)),
        _ => SignatureScheme::from_algorithm_identifier(&signer_info.signature_algorithm),
    }
}

/// Link the resolved signer to the pinned certificate
fn verify_anchor(signer: &Certificate, pinned: &Certificate) -> Result<()> {
    if signer == pinned {
        // A self-issued pin can still be checked against its own key
        if signer.is_self_issued() {
            signer.verify_issued_by(signer).map_err(|e| {
                VerificationError::SignatureMismatch(format!(
                    "pinned certificate self-signature: {}",
                    e
                ))
            })?;
        }
        tracing::debug!("Signer is the pinned certificate");
        return Ok(());
    }

    if signer.issuer() != pinned.subject() {
        return Err(VerificationError::UntrustedSigner(format!(
            "signer issuer {} is not the pinned certificate {}",
            signer.issuer(),
            pinned.subject()
        )));
    }

    signer.verify_issued_by(pinned).map_err(|e| {
        VerificationError::SignatureMismatch(format!(
            "signer certificate not signed by the pinned certificate: {}",
            e
        ))
    })?;

    tracing::debug!("Signer certificate issued by the pinned certificate");
    Ok(())
}

/// Cross-check a pinned signer with the certificates carried in the structure
///
/// An embedded certificate for the same signer must be byte-identical to the
/// pin, and an embedded issuer of the pin must have signed it.
fn verify_pinned_against_embedded(
    signer_info: &SignerInfo,
    pinned: &Certificate,
    embedded: &[Certificate],
) -> Result<()> {
    if embedded
        .iter()
        .any(|cert| cert != pinned && asn1::identifies(&signer_info.sid, cert))
    {
        return Err(VerificationError::SignatureMismatch(
            "embedded signer certificate differs from the pinned certificate".to_string(),
        ));
    }

    if pinned.is_self_issued() {
        return Ok(());
    }

    for issuer in embedded.iter().filter(|cert| is_issuer_of(cert, pinned)) {
        pinned.verify_issued_by(issuer).map_err(|e| {
            VerificationError::SignatureMismatch(format!(
                "pinned certificate not signed by its embedded issuer: {}",
                e
            ))
        })?;
        tracing::debug!(issuer = %issuer.subject(), "Pinned certificate checked against embedded issuer");
    }

    Ok(())
}

fn is_issuer_of(issuer: &Certificate, cert: &Certificate) -> bool {
    if issuer == cert || issuer.subject() != cert.issuer() {
        return false;
    }
    match (cert.authority_key_identifier(), issuer.subject_key_identifier()) {
        (Some(aki), Some(ski)) => aki == ski,
        _ => true,
    }
}
