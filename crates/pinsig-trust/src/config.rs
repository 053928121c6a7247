//! Pinned signer and server trust configuration
//!
//! Signing certificates ship as data. A configuration is loaded from JSON
//! and checked against the certificates it pins before it can be used.

use crate::error::{Error, Result};
use pinsig_x509::{inspect, Certificate, KeyIdentifier, SerialNumber};
use serde::{Deserialize, Serialize};

/// How a configured signer is verified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignerMode {
    /// Cryptographic validity plus AKI and common name rules
    Strict,
    /// Cryptographic validity only
    Legacy,
}

/// A pinned signing certificate with its identity requirements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningCertificate {
    /// Human readable label used in logs
    pub name: String,

    /// The pinned certificate, PEM encoded
    pub certificate: String,

    /// Verification mode
    pub mode: SignerMode,

    /// Required authority key identifier of the signer
    #[serde(default, with = "hex_key_id", skip_serializing_if = "Option::is_none")]
    pub authority_key_identifier: Option<KeyIdentifier>,

    /// Substring the signer's common name must contain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_name_contains: Option<String>,

    /// Suffix the signer's common name must end with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_name_suffix: Option<String>,

    /// Expected subject key identifier of the pinned certificate
    #[serde(default, with = "hex_key_id", skip_serializing_if = "Option::is_none")]
    pub subject_key_identifier: Option<KeyIdentifier>,

    /// Expected serial number of the pinned certificate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_serial: Option<u64>,
}

impl SigningCertificate {
    /// Decode the pinned certificate
    pub fn parse_certificate(&self) -> Result<Certificate> {
        Ok(Certificate::parse(self.certificate.as_bytes())?)
    }

    /// Check the entry against its own certificate
    ///
    /// The certificate must decode, the optional SKI and serial must match
    /// it, and a strict entry needs an AKI and at least one common name rule.
    pub fn validate(&self) -> Result<()> {
        let cert = self.parse_certificate().map_err(|e| {
            Error::Config(format!("signer {:?}: {}", self.name, e))
        })?;

        if let Some(ski) = &self.subject_key_identifier {
            if !inspect::matches_key_identifier(&cert, ski) {
                return Err(Error::Config(format!(
                    "signer {:?}: subject key identifier {} does not match the certificate",
                    self.name, ski
                )));
            }
        }

        if let Some(serial) = self.root_serial {
            if !inspect::matches_serial_number(&cert, &SerialNumber::from(serial)) {
                return Err(Error::Config(format!(
                    "signer {:?}: serial {} does not match certificate serial {}",
                    self.name,
                    serial,
                    cert.serial_number()
                )));
            }
        }

        if self.mode == SignerMode::Strict {
            if self.authority_key_identifier.is_none() {
                return Err(Error::Config(format!(
                    "strict signer {:?} has no authority key identifier",
                    self.name
                )));
            }
            if self.common_name_contains.is_none() && self.common_name_suffix.is_none() {
                return Err(Error::Config(format!(
                    "strict signer {:?} has no common name rule",
                    self.name
                )));
            }
        }

        Ok(())
    }
}

/// Trust material for signature and server checks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustConfiguration {
    /// Pinned signers, tried in order
    #[serde(default)]
    pub signers: Vec<SigningCertificate>,

    /// Common name suffixes accepted for servers
    #[serde(default)]
    pub trusted_names: Vec<String>,

    /// Certificates that anchor server chains, PEM encoded
    #[serde(default)]
    pub trusted_certificates: Vec<String>,

    /// Additional anchors for data endpoints, PEM encoded
    #[serde(default)]
    pub data_certificates: Vec<String>,
}

impl TrustConfiguration {
    /// Parse and validate a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration from a file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Validate every signer and anchor certificate
    pub fn validate(&self) -> Result<()> {
        for signer in &self.signers {
            signer.validate()?;
        }
        self.trusted_certificates()?;
        self.data_certificates()?;

        tracing::debug!(
            signers = self.signers.len(),
            trusted_names = self.trusted_names.len(),
            trusted_certificates = self.trusted_certificates.len(),
            "Trust configuration validated"
        );
        Ok(())
    }

    /// Decode the server anchor certificates
    pub fn trusted_certificates(&self) -> Result<Vec<Certificate>> {
        decode_all(&self.trusted_certificates, "trusted certificate")
    }

    /// Decode the data endpoint anchor certificates
    pub fn data_certificates(&self) -> Result<Vec<Certificate>> {
        decode_all(&self.data_certificates, "data certificate")
    }
}

fn decode_all(pems: &[String], what: &str) -> Result<Vec<Certificate>> {
    pems.iter()
        .enumerate()
        .map(|(index, pem)| {
            Certificate::parse(pem.as_bytes())
                .map_err(|e| Error::Config(format!("{} #{}: {}", what, index, e)))
        })
        .collect()
}

/// Serde helper for optional hex encoded key identifiers
mod hex_key_id {
    use pinsig_x509::KeyIdentifier;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(id: &Option<KeyIdentifier>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match id {
            Some(id) => serializer.serialize_str(&id.to_hex()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<KeyIdentifier>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|s| KeyIdentifier::from_hex(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT_PEM: &str = include_str!("../../../test_data/root-ca.pem");
    const ROOT_SKI: &str = "10:E8:30:12:96:2E:9B:E2:C6:58:C6:2E:83:8F:B4:C2:DD:73:52:3F";

    fn strict_signer() -> SigningCertificate {
        SigningCertificate {
            name: "root".to_string(),
            certificate: ROOT_PEM.to_string(),
            mode: SignerMode::Strict,
            authority_key_identifier: Some(KeyIdentifier::from_hex(ROOT_SKI).unwrap()),
            common_name_contains: None,
            common_name_suffix: Some(".bundles.pinsig.test".to_string()),
            subject_key_identifier: Some(KeyIdentifier::from_hex(ROOT_SKI).unwrap()),
            root_serial: Some(10003001),
        }
    }

    #[test]
    fn test_parse_signer_json() {
        let json = serde_json::json!({
            "signers": [{
                "name": "root",
                "certificate": ROOT_PEM,
                "mode": "strict",
                "authorityKeyIdentifier": format!("0414{}", ROOT_SKI.replace(':', "")),
                "commonNameSuffix": ".bundles.pinsig.test",
                "subjectKeyIdentifier": ROOT_SKI,
                "rootSerial": 10003001
            }],
            "trustedNames": [".pinsig.test"]
        });

        let config = TrustConfiguration::from_json(&json.to_string()).unwrap();
        let signer = &config.signers[0];
        assert_eq!(signer.mode, SignerMode::Strict);
        assert_eq!(
            signer.authority_key_identifier.as_ref().unwrap().key_id(),
            KeyIdentifier::from_hex(ROOT_SKI).unwrap().as_bytes()
        );
        assert_eq!(config.trusted_names, vec![".pinsig.test".to_string()]);
        assert!(config.trusted_certificates.is_empty());
    }

    #[test]
    fn test_data_certificates() {
        let json = serde_json::json!({
            "trustedCertificates": [ROOT_PEM],
            "dataCertificates": [ROOT_PEM]
        });
        let config = TrustConfiguration::from_json(&json.to_string()).unwrap();
        assert!(config.signers.is_empty());
        assert_eq!(config.data_certificates().unwrap(), config.trusted_certificates().unwrap());

        assert!(matches!(
            TrustConfiguration::from_json(r#"{"dataCertificates": ["nope"]}"#),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_serialize_round_trip() {
        let config = TrustConfiguration {
            signers: vec![strict_signer()],
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"authorityKeyIdentifier\":\"10e83012"));
        assert_eq!(TrustConfiguration::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_strict_requires_aki_and_cn_rule() {
        let mut signer = strict_signer();
        signer.validate().unwrap();

        signer.authority_key_identifier = None;
        assert!(matches!(signer.validate(), Err(Error::Config(_))));

        let mut signer = strict_signer();
        signer.common_name_suffix = None;
        assert!(matches!(signer.validate(), Err(Error::Config(_))));

        // Legacy entries carry no identity rules
        signer.mode = SignerMode::Legacy;
        signer.authority_key_identifier = None;
        signer.validate().unwrap();
    }

    #[test]
    fn test_pinned_identity_must_match() {
        let mut signer = strict_signer();
        signer.root_serial = Some(10003002);
        assert!(matches!(signer.validate(), Err(Error::Config(_))));

        let mut signer = strict_signer();
        signer.subject_key_identifier = Some(KeyIdentifier::new(vec![0xAB; 20]));
        assert!(matches!(signer.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_invalid_inputs() {
        let mut signer = strict_signer();
        signer.certificate = "-----BEGIN CERTIFICATE-----\nAAAA\n-----END CERTIFICATE-----\n".into();
        assert!(matches!(signer.validate(), Err(Error::Config(_))));

        assert!(matches!(
            TrustConfiguration::from_json(r#"{"signers": [{"name": "x"}]}"#),
            Err(Error::Json(_))
        ));
        assert!(matches!(
            TrustConfiguration::from_json(r#"{"trustedCertificates": ["nope"]}"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            TrustConfiguration::from_json(
                r#"{"signers": [{"name": "x", "certificate": "", "mode": "legacy", "authorityKeyIdentifier": "zz"}]}"#
            ),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            TrustConfiguration::from_file("/nonexistent/pinsig.json"),
            Err(Error::Io { .. })
        ));
    }
}
