//! Certificate encodings and key identifiers
//!
//! Callers hand over certificates either as binary DER or as PEM text. Both
//! are normalized to DER here before any structural parsing happens.

use crate::error::DecodeError;
use std::borrow::Cow;
use std::fmt;

const PEM_CERTIFICATE_TAG: &str = "CERTIFICATE";
const PEM_PREAMBLE: &[u8] = b"-----BEGIN";

/// DER tag of an OCTET STRING
const OCTET_STRING_TAG: u8 = 0x04;

/// Returns true when the buffer holds PEM armor rather than binary DER
pub fn is_pem(bytes: &[u8]) -> bool {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    bytes[start..].starts_with(PEM_PREAMBLE)
}

/// Normalize a DER or PEM encoded certificate to DER
///
/// Only the first PEM block is considered and it must carry the
/// `CERTIFICATE` label.
pub fn certificate_der(bytes: &[u8]) -> Result<Cow<'_, [u8]>, DecodeError> {
    if !is_pem(bytes) {
        return Ok(Cow::Borrowed(bytes));
    }

    let parsed = pem::parse(bytes)
        .map_err(|e| DecodeError::Malformed(format!("failed to parse PEM: {}", e)))?;

    if parsed.tag() != PEM_CERTIFICATE_TAG {
        return Err(DecodeError::Malformed(format!(
            "expected CERTIFICATE PEM block, got {}",
            parsed.tag()
        )));
    }

    Ok(Cow::Owned(parsed.into_contents()))
}

/// Encode DER certificate bytes as a PEM `CERTIFICATE` block
pub fn certificate_pem(der: &[u8]) -> String {
    pem::encode(&pem::Pem::new(PEM_CERTIFICATE_TAG, der.to_vec()))
}

/// A subject or authority key identifier
///
/// Pinned identifiers are often stored with the DER `OCTET STRING` header
/// still attached (`04 14 ...`). [`KeyIdentifier::matches`] accepts both
/// forms.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct KeyIdentifier(Vec<u8>);

impl KeyIdentifier {
    /// Create a key identifier from raw bytes
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Parse a hex string, ignoring `:` separators and whitespace
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let digits: String = s
            .chars()
            .filter(|c| *c != ':' && !c.is_whitespace())
            .collect();
        Ok(Self(hex::decode(digits)?))
    }

    /// Get the identifier bytes as supplied
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Get the identifier bytes without a leading DER OCTET STRING header
    pub fn key_id(&self) -> &[u8] {
        match self.0.as_slice() {
            [OCTET_STRING_TAG, len, rest @ ..] if *len < 0x80 && *len as usize == rest.len() => {
                rest
            }
            other => other,
        }
    }

    /// Compare against a key identifier extracted from a certificate
    pub fn matches(&self, key_id: &[u8]) -> bool {
        self.0 == key_id || self.key_id() == key_id
    }

    /// Encode the identifier as lowercase hex
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl From<Vec<u8>> for KeyIdentifier {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl From<&[u8]> for KeyIdentifier {
    fn from(bytes: &[u8]) -> Self {
        Self::new(bytes.to_vec())
    }
}

impl AsRef<[u8]> for KeyIdentifier {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for KeyIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{:02X}", b)?;
        }
        Ok(())
    }
}

impl fmt::Debug for KeyIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyIdentifier({})", self)
    }
}
