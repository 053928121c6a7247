use pinsig_trust::{
    SecurityStrategy, ServerTrustChecker, SignerMode, TrustConfiguration, TrustFailure,
    WebpkiTrustEvaluator,
};
use pinsig_x509::{Certificate, TrustEvaluator};
use rustls_pki_types::UnixTime;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

fn test_data(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.pop(); // crates
    path.pop(); // root
    path.push("test_data");
    path.push(name);
    path
}

fn load(name: &str) -> Certificate {
    Certificate::parse(&std::fs::read(test_data(name)).unwrap()).unwrap()
}

#[test]
fn test_load_configuration_file() {
    let config = TrustConfiguration::from_file(test_data("trust-config.json")).unwrap();

    assert_eq!(config.signers.len(), 2);
    assert_eq!(config.signers[0].name, "pinsig-root");
    assert_eq!(config.signers[0].mode, SignerMode::Strict);
    assert_eq!(config.signers[0].root_serial, Some(10003001));
    assert_eq!(config.signers[1].mode, SignerMode::Legacy);
    assert!(config.signers[1].authority_key_identifier.is_none());

    let root = config.signers[0].parse_certificate().unwrap();
    assert_eq!(root, load("root-ca.pem"));
    // The configured AKI carries an OCTET STRING header
    let aki = config.signers[0].authority_key_identifier.as_ref().unwrap();
    assert_eq!(aki.as_bytes().len(), 22);
    assert!(aki.matches(root.subject_key_identifier().unwrap().as_bytes()));
}

#[test]
fn test_server_chain_with_loaded_configuration() {
    let config = TrustConfiguration::from_file(test_data("trust-config.json")).unwrap();
    let time = UnixTime::since_unix_epoch(Duration::from_secs(1_893_456_000));
    let evaluator = WebpkiTrustEvaluator::from_certificates(&config.trusted_certificates().unwrap())
        .unwrap()
        .at_time(time);

    let leaf = load("signer.pem");
    assert!(evaluator.evaluate(&leaf));

    let checker =
        ServerTrustChecker::for_strategy(&SecurityStrategy::Config, &config, Arc::new(evaluator))
            .unwrap()
            .at_time(time);
    let chain = vec![leaf, load("root-ca.pem")];
    assert!(checker.is_trusted(&chain, "signer.bundles.pinsig.test"));
    assert_eq!(
        checker.check(&chain[..1], "signer.bundles.pinsig.test"),
        Err(TrustFailure::Anchor)
    );

    // A rogue chain reusing the root's names is not anchored
    let rogue = vec![load("rogue-signer.pem"), load("rogue-ca.pem")];
    assert_eq!(
        checker.check(&rogue, "signer.bundles.pinsig.test"),
        Err(TrustFailure::Anchor)
    );

    // Appending the pinned root does not anchor a leaf it never issued
    let forged = vec![load("rogue-signer.pem"), load("root-ca.pem")];
    assert_eq!(
        checker.check(&forged, "signer.bundles.pinsig.test"),
        Err(TrustFailure::Anchor)
    );
}
