// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use ades_validation_policy::*;
use chrono::{Duration, TimeZone, Utc};

#[test]
fn default_policy_accepts_any_policy_and_mandates_nothing() {
    let c = ValidationConstraints::default();
    assert!(c.accepted_policies.accepts(None));
    assert!(c.accepted_policies.accepts(Some("1.2.3")));
    assert_eq!(c.signed_properties.signing_time, ConstraintLevel::Ignore);
    assert_eq!(c.cryptographic.len(), ConstraintContext::ALL.len());
    assert!(c.algorithm_expiration("SHA256", None).is_some());
    c.validate().unwrap();
}

#[test]
fn json_document_loads_with_defaults_for_missing_sections() {
    let json = r#"{
        "name": "qualified",
        "accepted_policies": { "allow_any": false, "ids": ["1.2.3.4"] },
        "signed_properties": {
            "signing_time": "FAIL",
            "claimed_role": "WARN",
            "accepted_roles": ["signer"]
        },
        "revocation_freshness": 86400,
        "cryptographic": {
            "MAIN_SIGNATURE": {
                "acceptable_digest_algorithms": ["SHA256"],
                "acceptable_encryption_algorithms": ["RSA"],
                "min_key_sizes": { "RSA": 3072 }
            }
        },
        "algorithm_expiration": {
            "SHA256": "2040-01-01T00:00:00Z",
            "RSA3072": "2038-01-01T00:00:00Z"
        }
    }"#;

    let c = ValidationConstraints::from_json_str(json).unwrap();
    assert_eq!(c.name.as_deref(), Some("qualified"));
    assert!(c.accepted_policies.allow_implicit);
    assert!(c.accepted_policies.accepts(Some("1.2.3.4")));
    assert!(!c.accepted_policies.accepts(Some("9.9")));
    assert_eq!(c.signed_properties.signing_time, ConstraintLevel::Fail);
    assert_eq!(c.signed_properties.claimed_role, ConstraintLevel::Warn);
    assert_eq!(c.revocation_freshness, Some(Duration::days(1)));
    assert_eq!(c.timestamp_delay, None);
    assert_eq!(c.cryptographic.len(), 1);
    assert_eq!(
        c.algorithm_expiration("RSA", Some(3072)),
        Utc.with_ymd_and_hms(2038, 1, 1, 0, 0, 0).single()
    );
    assert_eq!(c.algorithm_expiration("RSA", Some(2048)), None);
}

#[test]
fn json_round_trip_preserves_durations() {
    let c = ValidationConstraints::builder()
        .with_timestamp_delay(Duration::hours(2))
        .build()
        .unwrap();
    let json = c.to_json_pretty().unwrap();
    assert!(json.contains("\"timestamp_delay\": 7200"));
    assert_eq!(ValidationConstraints::from_json_str(&json).unwrap(), c);
}

#[test]
fn negative_duration_is_rejected() {
    let err =
        ValidationConstraints::from_json_str(r#"{ "revocation_freshness": -5 }"#).unwrap_err();
    assert!(matches!(
        err,
        PolicyError::InvalidDuration {
            name: "revocation_freshness",
            seconds: -5
        }
    ));
}

#[test]
fn key_size_for_unlisted_algorithm_conflicts() {
    let err = ValidationConstraints::builder()
        .with_cryptographic(
            ConstraintContext::Ocsp,
            CryptographicConstraint::new(["SHA256"], ["RSA"]).with_min_key_size("ECDSA", 256),
        )
        .build()
        .unwrap_err();
    match err {
        PolicyError::ConflictingAlgorithmTable { context, algorithm } => {
            assert_eq!(context, ConstraintContext::Ocsp);
            assert_eq!(algorithm, "ECDSA");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unknown_level_is_a_decode_error() {
    let json = r#"{ "signed_properties": { "signing_time": "SOMETIMES" } }"#;
    let err = ValidationConstraints::from_json_str(json).unwrap_err();
    assert!(matches!(err, PolicyError::Decode(_)));
}

#[test]
fn missing_file_reports_path() {
    let err = ValidationConstraints::from_json_file("/definitely/not/here.json").unwrap_err();
    match err {
        PolicyError::Io { path, .. } => assert!(path.ends_with("here.json")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn builder_restricts_policies() {
    let c = ValidationConstraints::builder()
        .with_name("strict")
        .with_accepted_policy("1.2.3")
        .with_implicit_policy(false)
        .with_default_policy("1.2.3")
        .build()
        .unwrap();
    assert!(!c.accepted_policies.allow_any);
    assert!(!c.accepted_policies.accepts(None));
    assert!(c.accepted_policies.accepts(Some("1.2.3")));
    assert_eq!(c.accepted_policies.default_policy.as_deref(), Some("1.2.3"));
}

#[test]
fn durations_past_the_calendar_are_accepted_and_kept() {
    let json = r#"{
        "timestamp_delay": 9000000000000000,
        "revocation_freshness": 9000000000000000
    }"#;
    let c = ValidationConstraints::from_json_str(json).unwrap();
    assert_eq!(c.timestamp_delay, Some(Duration::seconds(9_000_000_000_000_000)));
    assert_eq!(c.revocation_freshness, c.timestamp_delay);

    let overflow = r#"{ "timestamp_delay": 9223372036854775807 }"#;
    let err = ValidationConstraints::from_json_str(overflow).unwrap_err();
    assert!(matches!(err, PolicyError::Decode(_)));
}
