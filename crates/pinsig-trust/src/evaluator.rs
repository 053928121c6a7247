//! Trust evaluation against a fixed set of anchors using webpki

use crate::error::{Error, Result};
use pinsig_x509::{Certificate, TrustEvaluator};
use rustls_pki_types::{CertificateDer, TrustAnchor, UnixTime};
use webpki::{anchor_from_trusted_cert, EndEntityCert, KeyUsage, ALL_VERIFICATION_ALGS};

/// Extended key usage a certificate is evaluated for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtendedKeyUsage {
    /// TLS server authentication (the default)
    #[default]
    ServerAuth,
    /// TLS client authentication
    ClientAuth,
}

impl ExtendedKeyUsage {
    fn key_usage(self) -> KeyUsage {
        match self {
            Self::ServerAuth => KeyUsage::server_auth(),
            Self::ClientAuth => KeyUsage::client_auth(),
        }
    }
}

/// [`TrustEvaluator`] backed by webpki path validation
///
/// Through [`TrustEvaluator`] the certificate is treated as a one-element
/// chain: it must be issued directly by one of the anchors, or be
/// byte-identical to one. [`WebpkiTrustEvaluator::is_chain_trusted`] also
/// consults intermediates.
#[derive(Debug)]
pub struct WebpkiTrustEvaluator {
    anchors: Vec<TrustAnchor<'static>>,
    anchor_ders: Vec<Vec<u8>>,
    usage: ExtendedKeyUsage,
    time: Option<UnixTime>,
}

impl WebpkiTrustEvaluator {
    /// Build an evaluator from parsed anchor certificates
    pub fn from_certificates<'a>(certs: impl IntoIterator<Item = &'a Certificate>) -> Result<Self> {
        let mut anchors = Vec::new();
        let mut anchor_ders = Vec::new();

        for cert in certs {
            let der = CertificateDer::from(cert.raw_bytes());
            let anchor = anchor_from_trusted_cert(&der)
                .map(|anchor| anchor.to_owned())
                .map_err(|e| Error::Anchor(format!("{}: {:?}", cert.subject(), e)))?;
            anchors.push(anchor);
            anchor_ders.push(cert.raw_bytes().to_vec());
        }

        tracing::debug!(anchors = anchors.len(), "Loaded trust anchors");

        Ok(Self {
            anchors,
            anchor_ders,
            usage: ExtendedKeyUsage::default(),
            time: None,
        })
    }

    /// Build an evaluator from a bundle of PEM `CERTIFICATE` blocks
    pub fn from_pem_bundle(bundle: &[u8]) -> Result<Self> {
        let certs = pem::parse_many(bundle)?
            .into_iter()
            .filter(|block| block.tag() == "CERTIFICATE")
            .map(|block| Certificate::from_der(block.contents()))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if certs.is_empty() {
            return Err(Error::Anchor("PEM bundle contains no certificates".to_string()));
        }

        Self::from_certificates(&certs)
    }

    /// Evaluate for a different extended key usage
    pub fn with_usage(mut self, usage: ExtendedKeyUsage) -> Self {
        self.usage = usage;
        self
    }

    /// Evaluate at a fixed time instead of the current time
    pub fn at_time(mut self, time: UnixTime) -> Self {
        self.time = Some(time);
        self
    }

    /// Number of configured anchors
    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    /// Check whether no anchors are configured
    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    /// Check that a chain (leaf first) validates up to one of the anchors
    ///
    /// Certificates after the leaf are offered as intermediates. A leaf that
    /// is itself an anchor is trusted as is.
    pub fn is_chain_trusted(&self, chain: &[Certificate]) -> bool {
        let Some((leaf, intermediates)) = chain.split_first() else {
            return false;
        };

        if self.is_anchor(leaf) {
            tracing::trace!("Leaf certificate is a trust anchor");
            return true;
        }

        match self.verify_path(leaf, intermediates) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(subject = %leaf.subject(), error = ?e, "Certificate chain not trusted");
                false
            }
        }
    }

    fn is_anchor(&self, cert: &Certificate) -> bool {
        self.anchor_ders.iter().any(|der| der == cert.raw_bytes())
    }

    fn verify_path(
        &self,
        leaf: &Certificate,
        intermediates: &[Certificate],
    ) -> std::result::Result<(), webpki::Error> {
        let der = CertificateDer::from(leaf.raw_bytes());
        let end_entity = EndEntityCert::try_from(&der)?;
        let intermediates: Vec<CertificateDer<'_>> = intermediates
            .iter()
            .map(|cert| CertificateDer::from(cert.raw_bytes()))
            .collect();
        let time = self.time.unwrap_or_else(UnixTime::now);

        end_entity.verify_for_usage(
            ALL_VERIFICATION_ALGS,
            &self.anchors,
            &intermediates,
            time,
            self.usage.key_usage(),
            None,
            None,
        )?;
        Ok(())
    }
}

impl TrustEvaluator for WebpkiTrustEvaluator {
    fn evaluate(&self, cert: &Certificate) -> bool {
        self.is_chain_trusted(std::slice::from_ref(cert))
    }
}
