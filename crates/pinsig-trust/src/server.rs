//! Server certificate chain pinning
//!
//! A presented chain is accepted when it is anchored in a trusted
//! certificate, carries a trusted name and covers the requested host.
//! Anchoring means the leaf validates up to a trusted certificate through
//! the rest of the chain, and the chain carries that certificate.

use crate::config::TrustConfiguration;
use crate::error::Result;
use crate::evaluator::WebpkiTrustEvaluator;
use pinsig_x509::{inspect, Certificate, TrustEvaluator};
use rustls_pki_types::UnixTime;
use std::sync::Arc;
use thiserror::Error;

/// Which trust material applies to a connection
#[derive(Debug, Clone, Default)]
pub enum SecurityStrategy {
    /// No pinning; every chain is accepted
    #[default]
    None,
    /// Configuration endpoints: trusted certificates and names
    Config,
    /// Data endpoints: configuration anchors plus the data certificates
    Data,
    /// Third-party providers: the provider's own certificates, no name rules
    Provider(Vec<Certificate>),
}

/// The condition a rejected chain failed
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustFailure {
    /// The chain does not validate up to a trusted certificate
    #[error("chain is not anchored in a trusted certificate")]
    Anchor,
    /// No certificate's common name ends with a trusted name
    #[error("no certificate carries a trusted name")]
    Name,
    /// No certificate covers the requested host
    #[error("no certificate matches the host")]
    Hostname,
}

/// Checks presented server chains against pinned trust material
pub struct ServerTrustChecker {
    enabled: bool,
    trusted_certificates: Vec<Certificate>,
    anchors: Option<WebpkiTrustEvaluator>,
    trusted_names: Vec<String>,
    evaluator: Arc<dyn TrustEvaluator>,
}

impl ServerTrustChecker {
    /// Create a checker from explicit trust material
    ///
    /// With no trusted certificates the leaf must be accepted by
    /// `evaluator`. With no trusted names the name condition always holds.
    ///
    /// # Errors
    ///
    /// Fails if a trusted certificate cannot serve as a webpki trust anchor.
    pub fn new(
        trusted_certificates: Vec<Certificate>,
        trusted_names: Vec<String>,
        evaluator: Arc<dyn TrustEvaluator>,
    ) -> Result<Self> {
        let anchors = if trusted_certificates.is_empty() {
            None
        } else {
            Some(WebpkiTrustEvaluator::from_certificates(&trusted_certificates)?)
        };

        Ok(Self {
            enabled: true,
            trusted_certificates,
            anchors,
            trusted_names,
            evaluator,
        })
    }

    /// Validate chains at a fixed time instead of the current time
    pub fn at_time(mut self, time: UnixTime) -> Self {
        self.anchors = self.anchors.map(|anchors| anchors.at_time(time));
        self
    }

    /// Create the checker for a [`SecurityStrategy`]
    pub fn for_strategy(
        strategy: &SecurityStrategy,
        config: &TrustConfiguration,
        evaluator: Arc<dyn TrustEvaluator>,
    ) -> Result<Self> {
        let checker = match strategy {
            SecurityStrategy::None => Self {
                enabled: false,
                ..Self::new(Vec::new(), Vec::new(), evaluator)?
            },
            SecurityStrategy::Config => Self::new(
                config.trusted_certificates()?,
                config.trusted_names.clone(),
                evaluator,
            )?,
            SecurityStrategy::Data => {
                let mut certs = config.trusted_certificates()?;
                certs.extend(config.data_certificates()?);
                Self::new(certs, config.trusted_names.clone(), evaluator)?
            }
            SecurityStrategy::Provider(certs) => Self::new(certs.clone(), Vec::new(), evaluator)?,
        };

        tracing::debug!(
            ?strategy,
            trusted_certificates = checker.trusted_certificates.len(),
            trusted_names = checker.trusted_names.len(),
            "Created server trust checker"
        );
        Ok(checker)
    }

    /// Check a chain (leaf first) presented for `host`
    pub fn check(&self, chain: &[Certificate], host: &str) -> std::result::Result<(), TrustFailure> {
        if !self.enabled {
            return Ok(());
        }

        let anchored = match &self.anchors {
            None => chain
                .first()
                .is_some_and(|leaf| inspect::is_system_trusted(leaf, self.evaluator.as_ref())),
            Some(anchors) => {
                anchors.is_chain_trusted(chain)
                    && chain.iter().any(|cert| {
                        self.trusted_certificates
                            .iter()
                            .any(|trusted| inspect::equals_trusted(cert, trusted))
                    })
            }
        };

        let named = self.trusted_names.is_empty()
            || chain.iter().any(|cert| {
                cert.common_name().is_some_and(|cn| {
                    let cn = cn.to_lowercase();
                    self.trusted_names
                        .iter()
                        .any(|name| cn.ends_with(&name.to_lowercase()))
                })
            });

        let host_matched = chain.iter().any(|cert| {
            cert.common_name()
                .is_some_and(|cn| cn.eq_ignore_ascii_case(host))
                || inspect::matches_hostname(cert, host)
        });

        tracing::debug!(
            host,
            anchored,
            named,
            host_matched,
            "Evaluated server chain"
        );

        if !anchored {
            Err(TrustFailure::Anchor)
        } else if !named {
            Err(TrustFailure::Name)
        } else if !host_matched {
            Err(TrustFailure::Hostname)
        } else {
            Ok(())
        }
    }

    /// Check a chain, discarding the failure reason
    pub fn is_trusted(&self, chain: &[Certificate], host: &str) -> bool {
        self.check(chain, host).is_ok()
    }
}

impl std::fmt::Debug for ServerTrustChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerTrustChecker")
            .field("enabled", &self.enabled)
            .field("trusted_certificates", &self.trusted_certificates.len())
            .field("trusted_names", &self.trusted_names)
            .finish_non_exhaustive()
    }
}
