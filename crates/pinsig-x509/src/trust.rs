//! Pluggable trust evaluation
//!
//! Whether a certificate chains to the platform's trusted roots is a host
//! capability. It is modelled as an injected evaluator so the rest of the
//! crate stays testable without a real trust store.

use crate::certificate::Certificate;

/// Evaluates whether a single certificate is trusted by the host platform
pub trait TrustEvaluator: Send + Sync {
    /// Evaluate `cert` as a one-element chain
    fn evaluate(&self, cert: &Certificate) -> bool;
}

impl<F> TrustEvaluator for F
where
    F: Fn(&Certificate) -> bool + Send + Sync,
{
    fn evaluate(&self, cert: &Certificate) -> bool {
        self(cert)
    }
}
