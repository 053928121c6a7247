//! Identity predicates over parsed certificates
//!
//! Every function here is side-effect free. Missing certificate fields
//! (no SKI, no subjectAltName, no common name) make a predicate return
//! `false` rather than an error.

use crate::certificate::{Certificate, SerialNumber, SubjectAltName};
use crate::encoding::KeyIdentifier;
use crate::trust::TrustEvaluator;

/// Check the serial number against an expected value
pub fn matches_serial_number(cert: &Certificate, expected: &SerialNumber) -> bool {
    cert.serial_number() == expected
}

/// Check the subject key identifier against an expected value
///
/// The expected value may carry a DER OCTET STRING header.
pub fn matches_key_identifier(cert: &Certificate, expected: &KeyIdentifier) -> bool {
    match cert.subject_key_identifier() {
        Some(ski) => expected.matches(ski.as_bytes()),
        None => false,
    }
}

/// Check the authority key identifier against an expected value
pub fn matches_authority_key_identifier(cert: &Certificate, expected: &KeyIdentifier) -> bool {
    match cert.authority_key_identifier() {
        Some(aki) => expected.matches(aki.as_bytes()),
        None => false,
    }
}

/// Check whether `host` is covered by a DNS subjectAltName entry
pub fn matches_hostname(cert: &Certificate, host: &str) -> bool {
    !matching_dns_names(cert, host).is_empty()
}

/// Get the DNS subjectAltName entries that cover `host`, in certificate order
pub fn matching_dns_names<'a>(cert: &'a Certificate, host: &str) -> Vec<&'a str> {
    cert.subject_alternative_names()
        .iter()
        .filter_map(|san| match san {
            SubjectAltName::Dns(pattern) if hostname_matches_pattern(host, pattern) => {
                Some(pattern.as_str())
            }
            _ => None,
        })
        .collect()
}

/// Match a hostname against a DNS name pattern
///
/// Comparison is ASCII case-insensitive and ignores a trailing dot. A `*` is
/// only honoured as the complete leftmost label and stands for exactly one
/// non-empty label: `*.example.com` matches `a.example.com` but neither
/// `example.com` nor `a.b.example.com`.
pub fn hostname_matches_pattern(host: &str, pattern: &str) -> bool {
    let host = host.strip_suffix('.').unwrap_or(host);
    let pattern = pattern.strip_suffix('.').unwrap_or(pattern);

    if host.is_empty() || pattern.is_empty() {
        return false;
    }

    let Some(suffix) = pattern.strip_prefix("*.") else {
        return host.eq_ignore_ascii_case(pattern);
    };

    // A wildcard must be followed by at least two labels
    if suffix.is_empty() || !suffix.contains('.') || suffix.contains('*') {
        return false;
    }

    match host.split_once('.') {
        Some((first, rest)) => !first.is_empty() && rest.eq_ignore_ascii_case(suffix),
        None => false,
    }
}

/// Byte-for-byte comparison of the DER encodings
pub fn equals_trusted(cert: &Certificate, trusted: &Certificate) -> bool {
    cert.raw_bytes() == trusted.raw_bytes()
}

/// Ask the host platform whether it trusts `cert` on its own
pub fn is_system_trusted(cert: &Certificate, evaluator: &dyn TrustEvaluator) -> bool {
    let trusted = evaluator.evaluate(cert);
    tracing::debug!(serial = %cert.serial_number(), trusted, "system trust evaluation");
    trusted
}

/// Case-sensitive substring check on the common name
pub fn common_name_contains(cert: &Certificate, needle: &str) -> bool {
    cert.common_name().is_some_and(|cn| cn.contains(needle))
}

/// Case-sensitive suffix check on the common name
pub fn common_name_has_suffix(cert: &Certificate, suffix: &str) -> bool {
    cert.common_name().is_some_and(|cn| cn.ends_with(suffix))
}

/// Compare the subject public key against a pinned SubjectPublicKeyInfo
pub fn matches_public_key(cert: &Certificate, spki_der: &[u8]) -> bool {
    cert.public_key().spki_der() == spki_der
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const ROOT_PEM: &[u8] = include_bytes!("../../../test_data/root-ca.pem");
    const SIGNER_PEM: &[u8] = include_bytes!("../../../test_data/signer.pem");
    const NO_CN_PEM: &[u8] = include_bytes!("../../../test_data/no-cn-signer.pem");
    const FOO_CA_PEM: &[u8] = include_bytes!("../../../test_data/foo-ca.pem");
    const MINIMAL_PEM: &[u8] = include_bytes!("../../../test_data/minimal.pem");

    fn cert(bytes: &[u8]) -> Certificate {
        Certificate::parse(bytes).unwrap()
    }

    #[rstest]
    #[case("a.example.com", "*.example.com", true)]
    #[case("A.Example.COM", "*.example.com", true)]
    #[case("example.com", "*.example.com", false)]
    #[case("b.a.example.com", "*.example.com", false)]
    #[case(".example.com", "*.example.com", false)]
    #[case("example.com", "example.com", true)]
    #[case("EXAMPLE.com.", "example.COM", true)]
    #[case("www.example.com", "example.com", false)]
    #[case("a.com", "*.com", false)]
    #[case("foo.example.com", "f*.example.com", false)]
    #[case("a.b.example.com", "a.*.example.com", false)]
    #[case("", "*.example.com", false)]
    fn test_hostname_patterns(#[case] host: &str, #[case] pattern: &str, #[case] expected: bool) {
        assert_eq!(hostname_matches_pattern(host, pattern), expected);
    }

    #[rstest]
    #[case("signer.bundles.pinsig.test", true)]
    #[case("SIGNER.bundles.pinsig.test", true)]
    #[case("edge.cdn.pinsig.test", true)]
    #[case("cdn.pinsig.test", false)]
    #[case("a.edge.cdn.pinsig.test", false)]
    #[case("192.0.2.10", false)]
    fn test_matches_hostname(#[case] host: &str, #[case] expected: bool) {
        assert_eq!(matches_hostname(&cert(SIGNER_PEM), host), expected);
    }

    #[test]
    fn test_matching_dns_names() {
        let signer = cert(SIGNER_PEM);
        assert_eq!(
            matching_dns_names(&signer, "edge.cdn.pinsig.test"),
            vec!["*.cdn.pinsig.test"]
        );
        assert!(matching_dns_names(&cert(ROOT_PEM), "edge.cdn.pinsig.test").is_empty());
    }

    #[test]
    fn test_ip_entries_are_never_matched() {
        let no_cn = cert(NO_CN_PEM);
        assert_eq!(no_cn.dns_names(), vec!["test1", "test2"]);
        assert!(matches_hostname(&no_cn, "test2"));
        assert!(!matches_hostname(&no_cn, "1.2.3.4"));
    }

    #[test]
    fn test_serial_number() {
        let root = cert(ROOT_PEM);
        assert!(matches_serial_number(&root, &SerialNumber::from(10003001)));
        assert!(!matches_serial_number(&root, &SerialNumber::from(10004001)));
    }

    #[test]
    fn test_key_identifier() {
        let root = cert(ROOT_PEM);
        let ski = root.subject_key_identifier().unwrap().clone();

        assert!(matches_key_identifier(&root, &ski));

        let mut wrapped = vec![0x04, ski.as_bytes().len() as u8];
        wrapped.extend_from_slice(ski.as_bytes());
        assert!(matches_key_identifier(&root, &KeyIdentifier::new(wrapped)));

        assert!(!matches_key_identifier(&root, &KeyIdentifier::new(vec![0xFF; 20])));
    }

    #[test]
    fn test_authority_key_identifier() {
        let root = cert(ROOT_PEM);
        let signer = cert(SIGNER_PEM);
        let root_ski = root.subject_key_identifier().unwrap();

        assert!(matches_authority_key_identifier(&signer, root_ski));
        assert!(!matches_authority_key_identifier(
            &signer,
            &KeyIdentifier::new(vec![0xFF; 20])
        ));
    }

    #[test]
    fn test_certificate_without_extensions() {
        let minimal = cert(MINIMAL_PEM);
        let any_id = KeyIdentifier::new(vec![0xAB; 20]);

        assert!(minimal.subject_key_identifier().is_none());
        assert!(!matches_key_identifier(&minimal, &any_id));
        assert!(!matches_authority_key_identifier(&minimal, &any_id));
        assert!(!matches_hostname(&minimal, "minimal.pinsig.test"));
        assert!(matches_serial_number(&minimal, &SerialNumber::from(0xff)));
    }

    #[test]
    fn test_equals_trusted() {
        let root = cert(ROOT_PEM);
        let signer = cert(SIGNER_PEM);
        assert!(equals_trusted(&root, &root));
        assert!(equals_trusted(&signer, &cert(SIGNER_PEM)));
        assert!(!equals_trusted(&root, &signer));
    }

    #[test]
    fn test_common_name_predicates() {
        let signer = cert(SIGNER_PEM);
        assert!(common_name_contains(&signer, ".bundles."));
        assert!(!common_name_contains(&signer, ".BUNDLES."));
        assert!(common_name_has_suffix(&signer, ".pinsig.test"));
        assert!(!common_name_has_suffix(&signer, ".pinsig"));

        let foo = cert(FOO_CA_PEM);
        assert_eq!(foo.common_name(), Some("Foo CA"));
        assert!(!common_name_has_suffix(&foo, "Bar"));

        let no_cn = cert(NO_CN_PEM);
        assert_eq!(no_cn.common_name(), None);
        assert!(!common_name_contains(&no_cn, ""));
        assert!(!common_name_has_suffix(&no_cn, ""));
    }

    #[test]
    fn test_is_system_trusted_delegates() {
        let root = cert(ROOT_PEM);
        let trusting = |_: &Certificate| true;
        let root_only = move |c: &Certificate| c.common_name() == Some("Pinsig Test Root CA");

        assert!(is_system_trusted(&root, &trusting));
        assert!(is_system_trusted(&root, &root_only));
        assert!(!is_system_trusted(&cert(SIGNER_PEM), &root_only));
    }

    #[test]
    fn test_matches_public_key() {
        let root = cert(ROOT_PEM);
        let spki = root.public_key().spki_der().to_vec();
        assert!(matches_public_key(&root, &spki));
        assert!(!matches_public_key(&cert(SIGNER_PEM), &spki));
    }
}
