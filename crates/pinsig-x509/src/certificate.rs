//! Parsed X.509 certificate view
//!
//! [`Certificate`] is decoded once from DER or PEM and never changes
//! afterwards. Every field that the inspection and verification layers rely
//! on is extracted up front, so a certificate that decodes successfully can be
//! queried without further fallible steps.

use crate::encoding::{self, KeyIdentifier};
use crate::error::{DecodeError, Error, Result};
use crate::signature::SignatureScheme;
use aws_lc_rs::signature::UnparsedPublicKey;
use const_oid::db::rfc4519::CN;
use const_oid::db::rfc5280::ID_CE_AUTHORITY_KEY_IDENTIFIER;
use const_oid::db::rfc5912::{ID_EC_PUBLIC_KEY, RSA_ENCRYPTION, SECP_256_R_1, SECP_384_R_1};
use const_oid::db::rfc8410::ID_ED_25519;
use const_oid::ObjectIdentifier;
use der::asn1::{Ia5StringRef, OctetString, PrintableStringRef, TeletexStringRef, Utf8StringRef};
use der::{Any, Decode, Encode, Tag, Tagged};
use std::fmt;
use std::net::IpAddr;
use x509_cert::certificate::TbsCertificate;
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::pkix::{
    AuthorityKeyIdentifier, SubjectAltName as SubjectAltNameExtension, SubjectKeyIdentifier,
};
use x509_cert::name::Name;
use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};

/// Decode a DER or PEM encoded certificate
pub fn parse(bytes: &[u8]) -> std::result::Result<Certificate, DecodeError> {
    Certificate::parse(bytes)
}

fn malformed(context: &str, e: impl fmt::Display) -> DecodeError {
    DecodeError::Malformed(format!("{}: {}", context, e))
}

/// Certificate serial number
///
/// Stored as the big-endian magnitude with leading zero octets removed, so
/// two encodings of the same positive integer compare equal.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SerialNumber(Vec<u8>);

impl SerialNumber {
    /// Create a serial number from big-endian bytes
    pub fn from_be_bytes(bytes: &[u8]) -> Self {
        let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
        Self(bytes[start..].to_vec())
    }

    /// Get the normalized big-endian bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Get the serial as a `u64` if it fits
    pub fn to_u64(&self) -> Option<u64> {
        if self.0.len() > 8 {
            return None;
        }
        Some(self.0.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
    }
}

impl From<u64> for SerialNumber {
    fn from(value: u64) -> Self {
        Self::from_be_bytes(&value.to_be_bytes())
    }
}

impl fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_u64() {
            Some(value) => write!(f, "{}", value),
            None => write!(f, "0x{}", hex::encode(&self.0)),
        }
    }
}

impl fmt::Debug for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SerialNumber({})", self)
    }
}

/// A single subjectAltName entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubjectAltName {
    /// dNSName
    Dns(String),
    /// iPAddress (IPv4 or IPv6)
    Ip(IpAddr),
    /// Any other GeneralName form
    Other,
}

/// Public key algorithm of a certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAlgorithm {
    /// RSA (rsaEncryption)
    Rsa,
    /// ECDSA on NIST P-256
    EcP256,
    /// ECDSA on NIST P-384
    EcP384,
    /// Ed25519
    Ed25519,
    /// Anything else, tagged with the algorithm or curve OID
    Unsupported(ObjectIdentifier),
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rsa => f.write_str("RSA"),
            Self::EcP256 => f.write_str("EC P-256"),
            Self::EcP384 => f.write_str("EC P-384"),
            Self::Ed25519 => f.write_str("Ed25519"),
            Self::Unsupported(oid) => write!(f, "unsupported ({})", oid),
        }
    }
}

/// Subject public key of a certificate
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey {
    algorithm: KeyAlgorithm,
    spki_der: Vec<u8>,
    key_bytes: Vec<u8>,
}

impl PublicKey {
    fn from_spki(spki: &SubjectPublicKeyInfoOwned) -> std::result::Result<Self, DecodeError> {
        let algorithm = key_algorithm(spki)?;
        let spki_der = spki
            .to_der()
            .map_err(|e| malformed("failed to encode SPKI", e))?;
        let key_bytes = spki
            .subject_public_key
            .as_bytes()
            .ok_or_else(|| DecodeError::Malformed("public key has unused bits".to_string()))?
            .to_vec();

        Ok(Self {
            algorithm,
            spki_der,
            key_bytes,
        })
    }

    /// Get the key algorithm
    pub fn algorithm(&self) -> &KeyAlgorithm {
        &self.algorithm
    }

    /// Get the DER encoded SubjectPublicKeyInfo
    pub fn spki_der(&self) -> &[u8] {
        &self.spki_der
    }

    /// Get the raw key bits (PKCS#1 for RSA, SEC1 point for EC)
    pub fn as_bytes(&self) -> &[u8] {
        &self.key_bytes
    }

    /// Verify `signature` over `message` with this key
    pub fn verify(&self, scheme: SignatureScheme, message: &[u8], signature: &[u8]) -> Result<()> {
        let algorithm = scheme.verification_algorithm(&self.algorithm)?;
        UnparsedPublicKey::new(algorithm, &self.key_bytes)
            .verify(message, signature)
            .map_err(|_| Error::SignatureInvalid(format!("{} signature invalid", scheme)))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKey")
            .field("algorithm", &self.algorithm)
            .field("spki", &hex::encode(&self.spki_der))
            .finish()
    }
}

fn key_algorithm(spki: &SubjectPublicKeyInfoOwned) -> std::result::Result<KeyAlgorithm, DecodeError> {
    let alg_oid = spki.algorithm.oid;

    if alg_oid == ID_EC_PUBLIC_KEY {
        let Some(params) = &spki.algorithm.parameters else {
            return Ok(KeyAlgorithm::Unsupported(alg_oid));
        };
        // Named curves only; explicit curve parameters are not supported
        let Ok(curve_oid) = params.decode_as::<ObjectIdentifier>() else {
            return Ok(KeyAlgorithm::Unsupported(alg_oid));
        };
        return Ok(match curve_oid {
            SECP_256_R_1 => KeyAlgorithm::EcP256,
            SECP_384_R_1 => KeyAlgorithm::EcP384,
            other => KeyAlgorithm::Unsupported(other),
        });
    }

    Ok(match alg_oid {
        RSA_ENCRYPTION => KeyAlgorithm::Rsa,
        ID_ED_25519 => KeyAlgorithm::Ed25519,
        other => KeyAlgorithm::Unsupported(other),
    })
}

/// A decoded X.509 certificate
///
/// Equality is defined over the DER encoding: two certificates are equal
/// only if their bytes are identical.
#[derive(Clone)]
pub struct Certificate {
    inner: x509_cert::Certificate,
    raw: Vec<u8>,
    serial_number: SerialNumber,
    subject_key_identifier: Option<KeyIdentifier>,
    authority_key_identifier: Option<KeyIdentifier>,
    subject_alternative_names: Vec<SubjectAltName>,
    common_name: Option<String>,
    public_key: PublicKey,
}

impl Certificate {
    /// Decode a certificate from DER or PEM
    pub fn parse(bytes: &[u8]) -> std::result::Result<Self, DecodeError> {
        let der = encoding::certificate_der(bytes)?;
        Self::from_der(&der)
    }

    /// Decode a PEM encoded certificate
    pub fn from_pem(pem: &str) -> std::result::Result<Self, DecodeError> {
        if !encoding::is_pem(pem.as_bytes()) {
            return Err(DecodeError::Malformed("missing PEM armor".to_string()));
        }
        Self::parse(pem.as_bytes())
    }

    /// Decode a DER encoded certificate
    ///
    /// Trailing bytes after the certificate are rejected.
    pub fn from_der(der: &[u8]) -> std::result::Result<Self, DecodeError> {
        let inner = x509_cert::Certificate::from_der(der)
            .map_err(|e| malformed("failed to parse certificate", e))?;

        if inner.signature.unused_bits() != 0 {
            return Err(DecodeError::Malformed(
                "signature has unused bits".to_string(),
            ));
        }

        let tbs = &inner.tbs_certificate;
        let serial_number = SerialNumber::from_be_bytes(tbs.serial_number.as_bytes());
        let subject_key_identifier = tbs
            .get::<SubjectKeyIdentifier>()
            .map_err(|e| malformed("invalid subject key identifier", e))?
            .map(|(_, ski)| KeyIdentifier::new(ski.0.as_bytes()));
        let authority_key_identifier = extract_authority_key_identifier(tbs)?;
        let subject_alternative_names = extract_subject_alt_names(tbs)?;
        let common_name = extract_common_name(&tbs.subject);
        let public_key = PublicKey::from_spki(&tbs.subject_public_key_info)?;

        tracing::trace!(
            serial = %serial_number,
            common_name = common_name.as_deref().unwrap_or(""),
            "decoded certificate"
        );

        Ok(Self {
            raw: der.to_vec(),
            serial_number,
            subject_key_identifier,
            authority_key_identifier,
            subject_alternative_names,
            common_name,
            public_key,
            inner,
        })
    }

    /// Get the DER encoding this certificate was decoded from
    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// Encode the certificate as PEM
    pub fn to_pem(&self) -> String {
        encoding::certificate_pem(&self.raw)
    }

    /// Get the serial number
    pub fn serial_number(&self) -> &SerialNumber {
        &self.serial_number
    }

    /// Get the subject key identifier, if the extension is present
    pub fn subject_key_identifier(&self) -> Option<&KeyIdentifier> {
        self.subject_key_identifier.as_ref()
    }

    /// Get the key identifier from the authority key identifier extension
    ///
    /// Issuer name and serial sub-fields are not exposed.
    pub fn authority_key_identifier(&self) -> Option<&KeyIdentifier> {
        self.authority_key_identifier.as_ref()
    }

    /// Get all subjectAltName entries in certificate order
    pub fn subject_alternative_names(&self) -> &[SubjectAltName] {
        &self.subject_alternative_names
    }

    /// Get the DNS names from the subjectAltName extension in certificate order
    pub fn dns_names(&self) -> Vec<&str> {
        self.subject_alternative_names
            .iter()
            .filter_map(|san| match san {
                SubjectAltName::Dns(name) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Get the subject common name
    ///
    /// When the subject holds several CN attributes the last one wins.
    pub fn common_name(&self) -> Option<&str> {
        self.common_name.as_deref()
    }

    /// Get the subject public key
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Get the subject name
    pub fn subject(&self) -> &Name {
        &self.inner.tbs_certificate.subject
    }

    /// Get the issuer name
    pub fn issuer(&self) -> &Name {
        &self.inner.tbs_certificate.issuer
    }

    /// Check whether issuer and subject names are identical
    pub fn is_self_issued(&self) -> bool {
        self.subject() == self.issuer()
    }

    /// Get the outer signature algorithm
    pub fn signature_algorithm(&self) -> &AlgorithmIdentifierOwned {
        &self.inner.signature_algorithm
    }

    /// Get the certificate signature bytes
    pub fn signature(&self) -> &[u8] {
        self.inner.signature.raw_bytes()
    }

    /// Borrow the underlying x509-cert structure
    pub fn as_x509(&self) -> &x509_cert::Certificate {
        &self.inner
    }

    /// Verify that `issuer`'s key produced this certificate's signature
    pub fn verify_issued_by(&self, issuer: &Certificate) -> Result<()> {
        if self.inner.tbs_certificate.signature != self.inner.signature_algorithm {
            return Err(Error::SignatureInvalid(
                "inner and outer signature algorithms differ".to_string(),
            ));
        }

        let scheme = SignatureScheme::from_algorithm_identifier(&self.inner.signature_algorithm)?;
        let tbs_der = self
            .inner
            .tbs_certificate
            .to_der()
            .map_err(|e| malformed("failed to encode TBS certificate", e))?;

        issuer
            .public_key
            .verify(scheme, &tbs_der, self.signature())
    }
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Certificate {}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("subject", &self.subject().to_string())
            .field("issuer", &self.issuer().to_string())
            .field("serial_number", &self.serial_number)
            .finish_non_exhaustive()
    }
}

impl TryFrom<&[u8]> for Certificate {
    type Error = DecodeError;

    fn try_from(bytes: &[u8]) -> std::result::Result<Self, Self::Error> {
        Self::parse(bytes)
    }
}

/// Extract the key identifier of the authority key identifier extension
///
/// Accepts the RFC 5280 SEQUENCE form as well as a bare OCTET STRING.
fn extract_authority_key_identifier(
    tbs: &TbsCertificate,
) -> std::result::Result<Option<KeyIdentifier>, DecodeError> {
    let Some(extensions) = &tbs.extensions else {
        return Ok(None);
    };
    let Some(ext) = extensions
        .iter()
        .find(|ext| ext.extn_id == ID_CE_AUTHORITY_KEY_IDENTIFIER)
    else {
        return Ok(None);
    };

    let value = ext.extn_value.as_bytes();
    if let Ok(aki) = AuthorityKeyIdentifier::from_der(value) {
        return Ok(aki
            .key_identifier
            .map(|id| KeyIdentifier::new(id.as_bytes())));
    }

    let id = OctetString::from_der(value)
        .map_err(|e| malformed("invalid authority key identifier", e))?;
    Ok(Some(KeyIdentifier::new(id.as_bytes())))
}

fn extract_subject_alt_names(
    tbs: &TbsCertificate,
) -> std::result::Result<Vec<SubjectAltName>, DecodeError> {
    let san: Option<(bool, SubjectAltNameExtension)> = tbs
        .get()
        .map_err(|e| malformed("invalid subjectAltName extension", e))?;

    let Some((_critical, san)) = san else {
        return Ok(Vec::new());
    };

    Ok(san
        .0
        .iter()
        .map(|name| match name {
            GeneralName::DnsName(dns) => SubjectAltName::Dns(dns.as_str().to_string()),
            GeneralName::IpAddress(ip) => ip_address(ip.as_bytes())
                .map(SubjectAltName::Ip)
                .unwrap_or(SubjectAltName::Other),
            _ => SubjectAltName::Other,
        })
        .collect())
}

fn ip_address(bytes: &[u8]) -> Option<IpAddr> {
    if let Ok(v4) = <[u8; 4]>::try_from(bytes) {
        return Some(IpAddr::from(v4));
    }
    <[u8; 16]>::try_from(bytes).ok().map(IpAddr::from)
}

fn extract_common_name(name: &Name) -> Option<String> {
    name.0
        .iter()
        .flat_map(|rdn| rdn.0.iter())
        .filter(|atv| atv.oid == CN)
        .filter_map(|atv| directory_string(&atv.value))
        .last()
}

fn directory_string(value: &Any) -> Option<String> {
    let s = match value.tag() {
        Tag::Utf8String => value.decode_as::<Utf8StringRef<'_>>().ok()?.as_str().to_string(),
        Tag::PrintableString => value
            .decode_as::<PrintableStringRef<'_>>()
            .ok()?
            .as_str()
            .to_string(),
        Tag::Ia5String => value.decode_as::<Ia5StringRef<'_>>().ok()?.as_str().to_string(),
        Tag::TeletexString => value
            .decode_as::<TeletexStringRef<'_>>()
            .ok()?
            .as_str()
            .to_string(),
        _ => return None,
    };
    Some(s)
}
