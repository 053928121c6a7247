//! CMS structure decoding
//!
//! Thin helpers over the `cms` crate types: unwrapping the ContentInfo,
//! collecting embedded certificates and reading signed attributes.

use crate::error::{Result, VerificationError};
use cms::cert::CertificateChoices;
use cms::content_info::ContentInfo;
use cms::signed_data::{SignedData, SignerIdentifier};
use const_oid::db::rfc6268::{ID_CONTENT_TYPE, ID_MESSAGE_DIGEST, ID_SIGNED_DATA};
use const_oid::ObjectIdentifier;
use der::asn1::OctetStringRef;
use der::{Decode, Encode};
use pinsig_x509::{Certificate, SerialNumber};
use x509_cert::attr::Attributes;

/// Decode DER `ContentInfo` bytes and unwrap the `SignedData` inside
///
/// Fails when the content type is not `id-signedData` or when there is no
/// SignerInfo to verify.
pub fn decode_signed_data(bytes: &[u8]) -> Result<SignedData> {
    let content_info = ContentInfo::from_der(bytes).map_err(|e| {
        VerificationError::Malformed(format!("failed to decode ContentInfo: {}", e))
    })?;

    if content_info.content_type != ID_SIGNED_DATA {
        return Err(VerificationError::Malformed(format!(
            "content type {} is not SignedData",
            content_info.content_type
        )));
    }

    let signed_data_der = content_info.content.to_der().map_err(|e| {
        VerificationError::Malformed(format!("failed to encode SignedData content: {}", e))
    })?;

    let signed_data = SignedData::from_der(&signed_data_der).map_err(|e| {
        VerificationError::Malformed(format!("failed to decode SignedData: {}", e))
    })?;

    if signed_data.signer_infos.0.is_empty() {
        return Err(VerificationError::Malformed(
            "SignedData contains no signer infos".to_string(),
        ));
    }

    Ok(signed_data)
}

/// Collect the certificates embedded in `SignedData`
///
/// Entries that are not plain X.509 certificates are skipped.
pub fn embedded_certificates(signed_data: &SignedData) -> Vec<Certificate> {
    let Some(cert_set) = &signed_data.certificates else {
        return Vec::new();
    };

    cert_set
        .0
        .iter()
        .filter_map(|choice| match choice {
            CertificateChoices::Certificate(cert) => {
                let der = cert.to_der().ok()?;
                match Certificate::from_der(&der) {
                    Ok(cert) => Some(cert),
                    Err(e) => {
                        tracing::debug!("Skipping undecodable embedded certificate: {}", e);
                        None
                    }
                }
            }
            CertificateChoices::Other(_) => {
                tracing::debug!("Skipping non-standard certificate format");
                None
            }
        })
        .collect()
}

/// Get the attached content, if the signature is not detached
pub fn attached_content(signed_data: &SignedData) -> Option<&[u8]> {
    signed_data
        .encap_content_info
        .econtent
        .as_ref()
        .map(|content| content.value())
}

/// Check whether `cert` is the one a SignerInfo refers to
pub fn identifies(sid: &SignerIdentifier, cert: &Certificate) -> bool {
    match sid {
        SignerIdentifier::IssuerAndSerialNumber(issuer_serial) => {
            cert.issuer() == &issuer_serial.issuer
                && cert.serial_number()
                    == &SerialNumber::from_be_bytes(issuer_serial.serial_number.as_bytes())
        }
        SignerIdentifier::SubjectKeyIdentifier(ski) => cert
            .subject_key_identifier()
            .is_some_and(|id| id.as_bytes() == ski.0.as_bytes()),
    }
}

/// Read the single-valued `message-digest` signed attribute
pub fn message_digest(attrs: &Attributes) -> Result<Vec<u8>> {
    let value = single_attribute_value(attrs, ID_MESSAGE_DIGEST, "message-digest")?;
    let digest = value.decode_as::<OctetStringRef<'_>>().map_err(|e| {
        VerificationError::Malformed(format!(
            "failed to decode message-digest as OCTET STRING: {}",
            e
        ))
    })?;
    Ok(digest.as_bytes().to_vec())
}

/// Read the `content-type` signed attribute, if present
pub fn content_type(attrs: &Attributes) -> Result<Option<ObjectIdentifier>> {
    if !attrs.iter().any(|attr| attr.oid == ID_CONTENT_TYPE) {
        return Ok(None);
    }
    let value = single_attribute_value(attrs, ID_CONTENT_TYPE, "content-type")?;
    let oid = value.decode_as::<ObjectIdentifier>().map_err(|e| {
        VerificationError::Malformed(format!("failed to decode content-type: {}", e))
    })?;
    Ok(Some(oid))
}

fn single_attribute_value<'a>(
    attrs: &'a Attributes,
    oid: ObjectIdentifier,
    name: &str,
) -> Result<&'a der::Any> {
    let attr = attrs.iter().find(|attr| attr.oid == oid).ok_or_else(|| {
        VerificationError::SignatureMismatch(format!(
            "{} attribute not found in signed attributes",
            name
        ))
    })?;

    if attr.values.len() != 1 {
        return Err(VerificationError::Malformed(format!(
            "{} attribute should have exactly one value",
            name
        )));
    }

    attr.values.get(0).ok_or_else(|| {
        VerificationError::Malformed(format!("failed to get {} attribute value", name))
    })
}

/// Re-encode signed attributes for signature verification
///
/// Inside SignerInfo the attributes carry a `[0] IMPLICIT` tag, but the
/// signature is computed over their encoding as a plain `SET OF`.
pub fn signed_attributes_der(attrs: &Attributes) -> Result<Vec<u8>> {
    attrs.to_der().map_err(|e| {
        VerificationError::Malformed(format!("failed to re-encode signed attributes: {}", e))
    })
}
