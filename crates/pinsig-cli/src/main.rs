//! pinsig command-line client
//!
//! Verifies PKCS#7 signatures against a pinned certificate and prints the
//! identity fields of certificates.
//!
//! Exit status is 0 on success, 1 when verification fails and 2 on usage
//! errors.

use pinsig::trust::TrustConfiguration;
use pinsig::x509::SubjectAltName;
use pinsig::{
    verify_legacy, verify_strict, Certificate, CommonNameRule, KeyIdentifier, SignatureValidator,
    StrictPolicy,
};

use std::env;
use std::fs;
use std::process;

use tracing_subscriber::EnvFilter;

enum Failure {
    Usage(String),
    Rejected(String),
}

type CliResult = Result<(), Failure>;

fn usage(message: impl Into<String>) -> Failure {
    Failure::Usage(message.into())
}

fn rejected(err: impl std::fmt::Display) -> Failure {
    Failure::Rejected(err.to_string())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("pinsig");

    if args.len() < 2 {
        print_usage(program);
        process::exit(2);
    }

    let command = &args[1];
    let result = match command.as_str() {
        "verify" => verify(&args[2..]),
        "validate" => validate(&args[2..]),
        "inspect" => inspect(&args[2..]),
        _ => Err(usage(format!("Unknown command: {}", command))),
    };

    match result {
        Ok(()) => process::exit(0),
        Err(Failure::Usage(message)) => {
            eprintln!("{}", message);
            print_usage(program);
            process::exit(2);
        }
        Err(Failure::Rejected(message)) => {
            eprintln!("Verification failed:\n{}", message);
            process::exit(1);
        }
    }
}

fn print_usage(program: &str) {
    eprintln!("Usage:");
    eprintln!("  {} verify --signature FILE --content FILE --certificate FILE [--aki HEX] [--cn-contains TEXT] [--cn-suffix TEXT]", program);
    eprintln!("  {} validate --config FILE --signature FILE --content FILE", program);
    eprintln!("  {} inspect --certificate FILE", program);
}

/// Collect `--flag value` pairs, rejecting flags outside `allowed`
fn parse_options<'a>(
    args: &'a [String],
    allowed: &[&str],
) -> Result<Vec<(&'a str, &'a str)>, Failure> {
    let mut values = Vec::new();

    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        if !allowed.contains(&flag) {
            return Err(usage(format!("Unknown option: {}", flag)));
        }
        i += 1;
        let value = args
            .get(i)
            .ok_or_else(|| usage(format!("Missing value for {}", flag)))?;
        values.push((flag, value.as_str()));
        i += 1;
    }
    Ok(values)
}

fn get<'a>(values: &[(&'a str, &'a str)], flag: &str) -> Option<&'a str> {
    values.iter().rev().find(|(f, _)| *f == flag).map(|(_, v)| *v)
}

fn require<'a>(values: &[(&'a str, &'a str)], flag: &str) -> Result<&'a str, Failure> {
    get(values, flag).ok_or_else(|| usage(format!("Missing required {}", flag)))
}

fn read(path: &str) -> Result<Vec<u8>, Failure> {
    fs::read(path).map_err(|e| usage(format!("Cannot read {}: {}", path, e)))
}

fn verify(args: &[String]) -> CliResult {
    let values = parse_options(
        args,
        &[
            "--signature",
            "--content",
            "--certificate",
            "--aki",
            "--cn-contains",
            "--cn-suffix",
        ],
    )?;

    let signature = read(require(&values, "--signature")?)?;
    let content = read(require(&values, "--content")?)?;
    let certificate = read(require(&values, "--certificate")?)?;

    let rule = CommonNameRule::from_parts(
        get(&values, "--cn-contains").map(str::to_string),
        get(&values, "--cn-suffix").map(str::to_string),
    );

    let verified = match (get(&values, "--aki"), rule) {
        (Some(aki), Some(rule)) => {
            let aki = KeyIdentifier::from_hex(aki)
                .map_err(|e| usage(format!("Invalid --aki: {}", e)))?;
            verify_strict(&signature, &content, &certificate, &StrictPolicy::new(aki, rule))
        }
        (Some(_), None) => {
            return Err(usage("--aki requires --cn-contains or --cn-suffix"));
        }
        (None, Some(_)) => {
            return Err(usage("Common name rules require --aki"));
        }
        (None, None) => verify_legacy(&signature, &content, &certificate),
    }
    .map_err(rejected)?;

    tracing::debug!(digest = %verified.digest_algorithm(), "Signature verified");
    println!(
        "OK: signed by {}",
        verified.signer().common_name().unwrap_or("(no common name)")
    );
    Ok(())
}

fn validate(args: &[String]) -> CliResult {
    let values = parse_options(args, &["--config", "--signature", "--content"])?;

    let config = TrustConfiguration::from_file(require(&values, "--config")?)
        .map_err(|e| usage(e.to_string()))?;
    let validator =
        SignatureValidator::from_configuration(&config).map_err(|e| usage(e.to_string()))?;

    let signature = read(require(&values, "--signature")?)?;
    let content = read(require(&values, "--content")?)?;

    let signer = validator.verify(&signature, &content).map_err(rejected)?;
    println!("OK: accepted by {}", signer.name());
    Ok(())
}

fn inspect(args: &[String]) -> CliResult {
    let values = parse_options(args, &["--certificate"])?;
    let bytes = read(require(&values, "--certificate")?)?;
    let cert = Certificate::parse(&bytes).map_err(rejected)?;

    let optional = |id: Option<&KeyIdentifier>| {
        id.map(|id| id.to_string())
            .unwrap_or_else(|| "(none)".to_string())
    };

    println!("subject:     {}", cert.subject());
    println!("issuer:      {}", cert.issuer());
    println!("serial:      {}", cert.serial_number());
    println!("common name: {}", cert.common_name().unwrap_or("(none)"));
    println!("ski:         {}", optional(cert.subject_key_identifier()));
    println!("aki:         {}", optional(cert.authority_key_identifier()));
    println!(
        "public key:  {} {}",
        cert.public_key().algorithm(),
        hex::encode(cert.public_key().as_bytes())
    );
    for san in cert.subject_alternative_names() {
        match san {
            SubjectAltName::Dns(name) => println!("san:         DNS:{}", name),
            SubjectAltName::Ip(addr) => println!("san:         IP:{}", addr),
            SubjectAltName::Other => println!("san:         (other)"),
        }
    }
    Ok(())
}
