use pinsig_x509::{encoding, parse, Certificate, DecodeError};
use rstest::rstest;
use std::path::PathBuf;

fn test_data(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.pop(); // crates
    path.pop(); // root
    path.push("test_data");
    path.push(name);
    path
}

#[rstest]
#[case("root-ca.pem")]
#[case("signer.pem")]
#[case("rsa-signer.pem")]
#[case("no-cn-signer.pem")]
#[case("foo-ca.pem")]
#[case("rogue-ca.pem")]
#[case("rogue-signer.pem")]
#[case("minimal.pem")]
fn test_pem_and_der_decode_identically(#[case] name: &str) {
    let pem = std::fs::read(test_data(name)).expect("fixture missing");
    let der = encoding::certificate_der(&pem).unwrap().into_owned();

    let from_pem = parse(&pem).unwrap();
    let from_der = parse(&der).unwrap();

    assert_eq!(from_pem, from_der);
    assert_eq!(from_pem.serial_number(), from_der.serial_number());
    assert_eq!(
        from_pem.subject_key_identifier(),
        from_der.subject_key_identifier()
    );
    assert_eq!(
        from_pem.authority_key_identifier(),
        from_der.authority_key_identifier()
    );
    assert_eq!(
        from_pem.subject_alternative_names(),
        from_der.subject_alternative_names()
    );
    assert_eq!(from_pem.common_name(), from_der.common_name());
    assert_eq!(from_pem.public_key(), from_der.public_key());
}

#[test]
fn test_rogue_ca_differs_from_root() {
    let root = Certificate::parse(&std::fs::read(test_data("root-ca.pem")).unwrap()).unwrap();
    let rogue = Certificate::parse(&std::fs::read(test_data("rogue-ca.pem")).unwrap()).unwrap();

    // Same subject, serial and CN but a different key
    assert_eq!(root.subject(), rogue.subject());
    assert_eq!(root.serial_number(), rogue.serial_number());
    assert_ne!(root, rogue);
    assert!(!pinsig_x509::equals_trusted(&rogue, &root));
}

#[test]
fn test_signature_blob_is_not_a_certificate() {
    let p7s = std::fs::read(test_data("signer-detached.p7s")).unwrap();
    assert!(matches!(parse(&p7s), Err(DecodeError::Malformed(_))));
}
