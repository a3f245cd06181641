// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use ades_validation::fluent::*;
use ades_validation_test_utils::*;

fn validate(data: &DiagnosticData) -> ValidationReport {
    AdesValidator::new(default_constraints())
        .with_options(|o| o.current_time = Some(now()))
        .validate(data)
        .unwrap()
}

/// Clean signature chain with revocation data issued the day before validation.
fn clean_signature() -> (ChainIds, Vec<ades_validation_model::CertificateData>) {
    standard_chain("sig", at(2024, 12, 31))
}

#[test]
fn clean_signature_without_timestamp_has_no_timestamp_at_adest() {
    let (ids, certs) = clean_signature();
    let data = DiagnosticDataBuilder::new()
        .certificates(certs)
        .signature(SignatureBuilder::new("S-1", &ids.as_vec()).build())
        .build();

    let report = validate(&data);
    let sig = report.signature("S-1").unwrap();

    assert!(sig.basic_validation.conclusion.is_valid());
    assert!(sig
        .adest_validation
        .conclusion
        .is(Indication::Indeterminate, SubIndication::NoTimestamp));
    assert!(sig.conclusion().is(Indication::Indeterminate, SubIndication::NoTimestamp));
    assert!(sig.long_term_validation.children.is_empty());
    assert_eq!(report.policy_name.as_deref(), Some("test-policy"));
    assert_eq!(report.validation_time, now());
}

#[test]
fn broken_signature_value_is_sig_crypto_failure() {
    let (ids, certs) = clean_signature();
    let data = DiagnosticDataBuilder::new()
        .certificates(certs)
        .signature(SignatureBuilder::new("S-1", &ids.as_vec()).signature_intact(false).build())
        .build();

    let report = validate(&data);
    let sig = report.signature("S-1").unwrap();

    assert!(sig
        .building_blocks
        .cv
        .conclusion
        .is(Indication::Invalid, SubIndication::SigCryptoFailure));
    assert!(sig.building_blocks.sav.is_none());
    assert!(sig.building_blocks.xcv.is_none());
    assert!(sig
        .basic_validation
        .conclusion
        .is(Indication::Invalid, SubIndication::SigCryptoFailure));
    assert!(sig.conclusion().is(Indication::Invalid, SubIndication::SigCryptoFailure));
}

#[test]
fn tamper_detection_wins_over_every_other_failure() {
    let ids = ChainIds::new("sig");
    let certs = vec![
        CertificateBuilder::new(&ids.leaf)
            .revocation(
                RevocationBuilder::revoked("sig-leaf-ocsp", at(2024, 12, 31), at(2023, 6, 1))
                    .build(),
            )
            .build(),
        CertificateBuilder::new(&ids.ca).good_at(at(2024, 12, 31)).build(),
        // not a trust anchor
        CertificateBuilder::new(&ids.root).build(),
    ];
    let unbound = ades_validation_model::SigningCertificateData::default();
    let data = DiagnosticDataBuilder::new()
        .certificates(certs)
        .signature(
            SignatureBuilder::new("S-1", &ids.as_vec())
                .signing_certificate(unbound)
                .policy("urn:unknown", Some(false))
                .signature_intact(false)
                .build(),
        )
        .build();

    let constraints = ValidationConstraints::builder()
        .with_accepted_policy("urn:accepted")
        .with_signing_time(ConstraintLevel::Fail)
        .build()
        .unwrap();
    let report = AdesValidator::new(constraints)
        .with_options(|o| o.current_time = Some(now()))
        .validate(&data)
        .unwrap();

    let sig = report.signature("S-1").unwrap();
    assert!(sig.conclusion().is(Indication::Invalid, SubIndication::SigCryptoFailure));
}

#[test]
fn revoked_signer_is_rescued_by_earlier_signature_timestamp() {
    let ids = ChainIds::new("sig");
    let certs = vec![
        CertificateBuilder::new(&ids.leaf)
            .revocation(
                RevocationBuilder::revoked("sig-leaf-ocsp", at(2024, 12, 31), at(2023, 6, 1))
                    .build(),
            )
            .build(),
        CertificateBuilder::new(&ids.ca).good_at(at(2024, 12, 31)).build(),
        CertificateBuilder::anchor(&ids.root).build(),
    ];
    let (tsa, tsa_certs) = standard_chain("tsa", at(2024, 12, 31));
    let data = DiagnosticDataBuilder::new()
        .certificates(certs)
        .certificates(tsa_certs)
        .signature(
            SignatureBuilder::new("S-1", &ids.as_vec())
                .timestamp(
                    TimestampBuilder::signature_timestamp("TS-1", at(2022, 1, 1), &tsa.as_vec())
                        .build(),
                )
                .build(),
        )
        .build();

    let report = validate(&data);
    let sig = report.signature("S-1").unwrap();

    assert!(sig.timestamp("TS-1").unwrap().conclusion.is_valid());
    assert!(sig
        .basic_validation
        .conclusion
        .is(Indication::Indeterminate, SubIndication::RevokedNoPoe));
    assert!(sig.adest_validation.conclusion.is_valid());
    assert_eq!(
        sig.adest_validation
            .conclusion
            .info(Info::BEST_SIGNATURE_TIME)
            .and_then(|i| i.attribute(Info::VALUE_KEY)),
        Some("2022-01-01T00:00:00Z")
    );
    assert!(sig.conclusion().is_valid());
}

#[test]
fn signature_timestamp_after_revocation_does_not_rescue() {
    let ids = ChainIds::new("sig");
    let certs = vec![
        CertificateBuilder::new(&ids.leaf)
            .revocation(
                RevocationBuilder::revoked("sig-leaf-ocsp", at(2024, 12, 31), at(2023, 6, 1))
                    .build(),
            )
            .build(),
        CertificateBuilder::new(&ids.ca).good_at(at(2024, 12, 31)).build(),
        CertificateBuilder::anchor(&ids.root).build(),
    ];
    let (tsa, tsa_certs) = standard_chain("tsa", at(2024, 12, 31));
    let data = DiagnosticDataBuilder::new()
        .certificates(certs)
        .certificates(tsa_certs)
        .signature(
            SignatureBuilder::new("S-1", &ids.as_vec())
                .timestamp(
                    TimestampBuilder::signature_timestamp("TS-1", at(2024, 1, 1), &tsa.as_vec())
                        .build(),
                )
                .build(),
        )
        .build();

    let report = validate(&data);
    let sig = report.signature("S-1").unwrap();

    assert!(sig
        .adest_validation
        .conclusion
        .is(Indication::Indeterminate, SubIndication::RevokedNoPoe));
    assert!(sig
        .conclusion()
        .is(Indication::Indeterminate, SubIndication::RevokedNoPoe));
}

#[test]
fn best_signature_time_before_not_before_is_not_yet_valid() {
    let ids = ChainIds::new("sig");
    let certs = vec![
        CertificateBuilder::new(&ids.leaf)
            .valid_between(at(2023, 1, 1), at(2024, 6, 1))
            .good_at(at(2024, 3, 1))
            .build(),
        CertificateBuilder::new(&ids.ca).good_at(at(2024, 12, 31)).build(),
        CertificateBuilder::anchor(&ids.root).build(),
    ];
    let (tsa, tsa_certs) = standard_chain("tsa", at(2024, 12, 31));
    let data = DiagnosticDataBuilder::new()
        .certificates(certs)
        .certificates(tsa_certs)
        .signature(
            SignatureBuilder::new("S-1", &ids.as_vec())
                .timestamp(
                    TimestampBuilder::signature_timestamp("TS-1", at(2022, 6, 1), &tsa.as_vec())
                        .build(),
                )
                .build(),
        )
        .build();

    let report = validate(&data);
    let sig = report.signature("S-1").unwrap();

    assert!(sig
        .basic_validation
        .conclusion
        .is(Indication::Indeterminate, SubIndication::OutOfBoundsNoPoe));
    assert!(sig.adest_validation.conclusion.is(Indication::Invalid, SubIndication::NotYetValid));
    assert!(sig.conclusion().is(Indication::Invalid, SubIndication::NotYetValid));
}

#[test]
fn content_timestamp_after_signature_timestamp_is_order_failure() {
    let (ids, certs) = clean_signature();
    let (tsa, tsa_certs) = standard_chain("tsa", at(2024, 12, 31));
    let chain = tsa.as_vec();
    let data = DiagnosticDataBuilder::new()
        .certificates(certs)
        .certificates(tsa_certs)
        .signature(
            SignatureBuilder::new("S-1", &ids.as_vec())
                .timestamp(
                    TimestampBuilder::signature_timestamp("TS-OLD", at(2021, 1, 1), &chain)
                        .signature_intact(false)
                        .build(),
                )
                .timestamp(
                    TimestampBuilder::signature_timestamp("TS-NEW", at(2022, 1, 1), &chain).build(),
                )
                .timestamp(
                    TimestampBuilder::content_timestamp("TS-CONTENT", at(2023, 1, 1), &chain)
                        .build(),
                )
                .build(),
        )
        .build();

    let report = validate(&data);
    let sig = report.signature("S-1").unwrap();

    assert!(!sig.timestamp("TS-OLD").unwrap().conclusion.is_valid());
    assert!(sig.basic_validation.conclusion.is_valid());
    assert!(sig
        .adest_validation
        .conclusion
        .is(Indication::Invalid, SubIndication::TimestampOrderFailure));
    assert!(sig.conclusion().is(Indication::Invalid, SubIndication::TimestampOrderFailure));
}

#[test]
fn missing_trust_anchor_propagates_unchanged() {
    let ids = ChainIds::new("sig");
    let certs = vec![
        CertificateBuilder::new(&ids.leaf).good_at(at(2024, 12, 31)).build(),
        CertificateBuilder::new(&ids.ca).good_at(at(2024, 12, 31)).build(),
        CertificateBuilder::new(&ids.root).build(),
    ];
    let data = DiagnosticDataBuilder::new()
        .certificates(certs)
        .signature(SignatureBuilder::new("S-1", &ids.as_vec()).build())
        .build();

    let report = validate(&data);
    let sig = report.signature("S-1").unwrap();
    let expected =
        |c: &Conclusion| c.is(Indication::Indeterminate, SubIndication::NoCertificateChainFound);

    assert!(expected(&sig.building_blocks.xcv.as_ref().unwrap().conclusion));
    assert!(expected(&sig.basic_validation.conclusion));
    assert!(expected(&sig.adest_validation.conclusion));
    assert!(expected(sig.conclusion()));
}

#[test]
fn content_timestamp_after_revocation_makes_revocation_final() {
    let ids = ChainIds::new("sig");
    let certs = vec![
        CertificateBuilder::new(&ids.leaf)
            .revocation(
                RevocationBuilder::revoked("sig-leaf-ocsp", at(2024, 12, 31), at(2023, 6, 1))
                    .build(),
            )
            .build(),
        CertificateBuilder::new(&ids.ca).good_at(at(2024, 12, 31)).build(),
        CertificateBuilder::anchor(&ids.root).build(),
    ];
    let (tsa, tsa_certs) = standard_chain("tsa", at(2024, 12, 31));
    let data = DiagnosticDataBuilder::new()
        .certificates(certs)
        .certificates(tsa_certs)
        .signature(
            SignatureBuilder::new("S-1", &ids.as_vec())
                .timestamp(
                    TimestampBuilder::content_timestamp("TS-C", at(2024, 1, 1), &tsa.as_vec())
                        .build(),
                )
                .build(),
        )
        .build();

    let report = validate(&data);
    let sig = report.signature("S-1").unwrap();

    let basic = &sig.basic_validation.conclusion;
    assert!(basic.is(Indication::Invalid, SubIndication::Revoked));
    assert_eq!(
        basic.info(Info::TIMESTAMP_ID).and_then(|i| i.attribute(Info::VALUE_KEY)),
        Some("TS-C")
    );
    assert!(sig.conclusion().is(Indication::Invalid, SubIndication::Revoked));
}

#[test]
fn content_timestamp_before_revocation_leaves_deferral() {
    let ids = ChainIds::new("sig");
    let certs = vec![
        CertificateBuilder::new(&ids.leaf)
            .revocation(
                RevocationBuilder::revoked("sig-leaf-ocsp", at(2024, 12, 31), at(2023, 6, 1))
                    .build(),
            )
            .build(),
        CertificateBuilder::new(&ids.ca).good_at(at(2024, 12, 31)).build(),
        CertificateBuilder::anchor(&ids.root).build(),
    ];
    let (tsa, tsa_certs) = standard_chain("tsa", at(2024, 12, 31));
    let data = DiagnosticDataBuilder::new()
        .certificates(certs)
        .certificates(tsa_certs)
        .signature(
            SignatureBuilder::new("S-1", &ids.as_vec())
                .timestamp(
                    TimestampBuilder::content_timestamp("TS-C", at(2022, 1, 1), &tsa.as_vec())
                        .build(),
                )
                .build(),
        )
        .build();

    let report = validate(&data);
    let sig = report.signature("S-1").unwrap();

    assert!(sig
        .basic_validation
        .conclusion
        .is(Indication::Indeterminate, SubIndication::RevokedNoPoe));
}

#[test]
fn missing_revocation_data_is_try_later() {
    let ids = ChainIds::new("sig");
    let certs = vec![
        CertificateBuilder::new(&ids.leaf).build(),
        CertificateBuilder::new(&ids.ca).good_at(at(2024, 12, 31)).build(),
        CertificateBuilder::anchor(&ids.root).build(),
    ];
    let data = DiagnosticDataBuilder::new()
        .certificates(certs)
        .signature(SignatureBuilder::new("S-1", &ids.as_vec()).build())
        .build();

    let report = validate(&data);
    let sig = report.signature("S-1").unwrap();

    let xcv = sig.building_blocks.xcv.as_ref().unwrap();
    assert!(xcv.conclusion.is(Indication::Indeterminate, SubIndication::TryLater));
    assert_eq!(
        xcv.failed_constraints().map(|c| c.object_id.as_deref()).collect::<Vec<_>>(),
        [Some("sig-leaf")]
    );
    assert!(sig.conclusion().is(Indication::Indeterminate, SubIndication::TryLater));
}

#[test]
fn revoked_intermediate_is_revoked_ca_no_poe() {
    let ids = ChainIds::new("sig");
    let certs = vec![
        CertificateBuilder::new(&ids.leaf).good_at(at(2024, 12, 31)).build(),
        CertificateBuilder::new(&ids.ca)
            .revocation(
                RevocationBuilder::revoked("sig-ca-crl", at(2024, 12, 31), at(2024, 1, 1)).crl()
                    .build(),
            )
            .build(),
        CertificateBuilder::anchor(&ids.root).build(),
    ];
    let data = DiagnosticDataBuilder::new()
        .certificates(certs)
        .signature(SignatureBuilder::new("S-1", &ids.as_vec()).build())
        .build();

    let report = validate(&data);
    let sig = report.signature("S-1").unwrap();

    assert!(sig
        .basic_validation
        .conclusion
        .is(Indication::Indeterminate, SubIndication::RevokedCaNoPoe));
}

#[test]
fn held_signing_certificate_is_try_later() {
    let ids = ChainIds::new("sig");
    let certs = vec![
        CertificateBuilder::new(&ids.leaf)
            .revocation(
                RevocationBuilder::on_hold("sig-leaf-ocsp", at(2024, 12, 31), at(2024, 6, 1))
                    .build(),
            )
            .build(),
        CertificateBuilder::new(&ids.ca).good_at(at(2024, 12, 31)).build(),
        CertificateBuilder::anchor(&ids.root).build(),
    ];
    let data = DiagnosticDataBuilder::new()
        .certificates(certs)
        .signature(SignatureBuilder::new("S-1", &ids.as_vec()).build())
        .build();

    let report = validate(&data);
    let sig = report.signature("S-1").unwrap();

    assert!(sig
        .basic_validation
        .conclusion
        .is(Indication::Indeterminate, SubIndication::TryLater));
}

fn delayed_signature(signing_time: chrono::DateTime<chrono::Utc>) -> DiagnosticData {
    let (ids, certs) = clean_signature();
    let (tsa, tsa_certs) = standard_chain("tsa", at(2024, 12, 31));
    DiagnosticDataBuilder::new()
        .certificates(certs)
        .certificates(tsa_certs)
        .signature(
            SignatureBuilder::new("S-1", &ids.as_vec())
                .signing_time(signing_time)
                .timestamp(
                    TimestampBuilder::signature_timestamp("TS-1", at(2021, 1, 1), &tsa.as_vec())
                        .build(),
                )
                .build(),
        )
        .build()
}

#[test]
fn timestamp_delay_bounds_the_claimed_signing_time() {
    let constraints = ValidationConstraints::builder()
        .with_timestamp_delay(chrono::Duration::days(2))
        .build()
        .unwrap();
    let validator = AdesValidator::new(constraints).with_options(|o| o.current_time = Some(now()));

    let report = validator.validate(&delayed_signature(at(2020, 12, 30))).unwrap();
    assert!(report.signatures[0].adest_validation.conclusion.is_valid());

    let report = validator.validate(&delayed_signature(at(2020, 1, 1))).unwrap();
    let adest = &report.signatures[0].adest_validation;
    assert!(adest.conclusion.is(Indication::Invalid, SubIndication::SigConstraintsFailure));
    assert_eq!(
        adest.failed_constraints().map(|c| c.name.as_str()).collect::<Vec<_>>(),
        [ades_validation::adest::TIMESTAMP_DELAY]
    );
}

#[test]
fn timestamp_delay_beyond_the_calendar_bounds_nothing() {
    let constraints = ValidationConstraints::builder()
        .with_timestamp_delay(chrono::Duration::seconds(9_000_000_000_000_000))
        .build()
        .unwrap();
    let report = AdesValidator::new(constraints)
        .with_options(|o| o.current_time = Some(now()))
        .validate(&delayed_signature(at(2020, 1, 1)))
        .unwrap();

    let adest = &report.signatures[0].adest_validation;
    assert!(adest.conclusion.is_valid());
    let delay = adest
        .constraints
        .iter()
        .find(|c| c.name == ades_validation::adest::TIMESTAMP_DELAY)
        .unwrap();
    assert_eq!(delay.status, ades_validation_model::ConstraintStatus::Ok);
}
