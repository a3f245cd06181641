// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use ades_validation_policy::*;
use chrono::{DateTime, TimeZone, Utc};

fn at(year: i32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap()
}

fn rsa(len: u32) -> AlgorithmUse<'static> {
    AlgorithmUse::new(Some("SHA256"), Some("RSA"), Some(len))
}

#[test]
fn acceptable_algorithm_before_expiration() {
    let c = ValidationConstraints::default();
    let check =
        c.check_cryptographic_constraint(ConstraintContext::MainSignature, rsa(2048), at(2020));
    assert_eq!(check, CryptoCheck::Acceptable);
}

#[test]
fn short_key_is_rejected_not_expired() {
    let c = ValidationConstraints::default();
    let check =
        c.check_cryptographic_constraint(ConstraintContext::MainSignature, rsa(1024), at(2020));
    assert!(matches!(check, CryptoCheck::Rejected { .. }));
}

#[test]
fn unknown_digest_is_rejected() {
    let c = ValidationConstraints::default();
    let usage = AlgorithmUse::new(Some("MD5"), Some("RSA"), Some(4096));
    let check = c.check_cryptographic_constraint(ConstraintContext::CaCertificate, usage, at(2020));
    match check {
        CryptoCheck::Rejected { reason } => assert!(reason.contains("MD5")),
        other => panic!("unexpected: {other:?}"),
    }

    let missing = AlgorithmUse::new(None, Some("RSA"), Some(4096));
    assert!(!c
        .check_cryptographic_constraint(ConstraintContext::CaCertificate, missing, at(2020))
        .is_acceptable());
}

#[test]
fn expiration_reports_earliest_algorithm_at_boundary() {
    let c = ValidationConstraints::builder()
        .with_algorithm_expiration("SHA256", at(2030))
        .with_algorithm_expiration("RSA", at(2025))
        .build()
        .unwrap();

    let before = c.check_cryptographic_constraint(ConstraintContext::Ocsp, rsa(2048), at(2024));
    assert!(before.is_acceptable());

    let on = c.check_cryptographic_constraint(ConstraintContext::Ocsp, rsa(2048), at(2025));
    assert_eq!(
        on,
        CryptoCheck::Expired {
            algorithm: "RSA".to_string(),
            expiration: at(2025)
        }
    );
    assert_eq!(on.expiration(), Some(at(2025)));
}

#[test]
fn key_size_specific_expiration_takes_precedence() {
    let c = ValidationConstraints::builder()
        .with_algorithm_expiration("RSA", at(2035))
        .with_algorithm_expiration("RSA2048", at(2022))
        .build()
        .unwrap();

    let small = c.check_cryptographic_constraint(ConstraintContext::Crl, rsa(2048), at(2023));
    assert_eq!(small.expiration(), Some(at(2022)));

    let large = c.check_cryptographic_constraint(ConstraintContext::Crl, rsa(4096), at(2023));
    assert!(large.is_acceptable());
}

#[test]
fn missing_expiration_date_fails_conservatively() {
    let c = ValidationConstraints::builder()
        .without_algorithm_expiration("SHA256")
        .build()
        .unwrap();
    let check =
        c.check_cryptographic_constraint(ConstraintContext::MainSignature, rsa(2048), at(2020));
    assert!(matches!(check, CryptoCheck::Rejected { .. }));
}

#[test]
fn context_without_table_is_not_checked() {
    let c = ValidationConstraints::builder()
        .without_cryptographic(ConstraintContext::Timestamp)
        .build()
        .unwrap();
    let usage = AlgorithmUse::new(Some("MD5"), Some("DSA"), Some(512));
    assert!(c
        .check_cryptographic_constraint(ConstraintContext::Timestamp, usage, at(2050))
        .is_acceptable());
}

#[test]
fn digest_only_check_ignores_encryption_table() {
    let c = ValidationConstraints::default();
    assert!(c
        .check_digest_algorithm(ConstraintContext::Timestamp, Some("SHA384"), at(2020))
        .is_acceptable());
    assert!(matches!(
        c.check_digest_algorithm(ConstraintContext::Timestamp, Some("SHA1"), at(2020)),
        CryptoCheck::Rejected { .. }
    ));
    assert_eq!(
        c.check_digest_algorithm(ConstraintContext::Timestamp, Some("SHA256"), at(2041))
            .expiration(),
        Some(at(2040))
    );
}
