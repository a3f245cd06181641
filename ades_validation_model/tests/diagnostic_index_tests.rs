// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use ades_validation_model::*;

const DOCUMENT: &str = r#"{
  "signatures": [
    {
      "id": "S-1",
      "basic_signature": {
        "algorithm": {
          "digest_algorithm": "SHA256",
          "encryption_algorithm": "RSA",
          "key_length": 2048
        },
        "reference_data_found": true,
        "reference_data_intact": true,
        "signature_intact": true
      },
      "signing_certificate": {
        "id": "C-leaf",
        "digest_value_present": true,
        "digest_value_match": true
      },
      "certificate_chain": ["C-leaf", "C-root"],
      "timestamps": [
        {
          "id": "T-1",
          "category": "SIGNATURE",
          "production_time": "2019-06-01T00:00:00Z",
          "signing_certificate": {
            "id": "C-tsa",
            "digest_value_present": true,
            "digest_value_match": true
          },
          "certificate_chain": ["C-tsa", "C-root"]
        }
      ]
    }
  ],
  "certificates": [
    {
      "id": "C-leaf",
      "not_before": "2018-01-01T00:00:00Z",
      "not_after": "2022-01-01T00:00:00Z",
      "revocation": {
        "id": "R-leaf",
        "source": "OCSP",
        "status": "REVOKED",
        "reason": "keyCompromise",
        "revocation_time": "2020-01-01T00:00:00Z",
        "issuing_time": "2020-02-01T00:00:00Z"
      }
    },
    { "id": "C-tsa", "not_before": "2015-01-01T00:00:00Z", "not_after": "2030-01-01T00:00:00Z" },
    {
      "id": "C-root",
      "not_before": "2010-01-01T00:00:00Z",
      "not_after": "2040-01-01T00:00:00Z",
      "trusted": true
    }
  ]
}"#;

#[test]
fn json_document_decodes_and_indexes() {
    let data = DiagnosticData::from_json_str(DOCUMENT).unwrap();
    let index = DiagnosticIndex::build(&data).unwrap();

    let sig = index.signature("S-1").unwrap();
    assert_eq!(sig.certificate_chain, vec!["C-leaf", "C-root"]);
    assert!(sig.basic_signature.signature_intact);

    let (rev, cert) = index.revocation("R-leaf").unwrap();
    assert_eq!(cert.id, "C-leaf");
    assert!(rev.is_revoked());
    assert_eq!(rev.reason, Some(RevocationReason::KeyCompromise));

    let (ts, owner) = index.timestamp("T-1").unwrap();
    assert_eq!(owner.id, "S-1");
    assert_eq!(ts.category, TimestampCategory::Signature);

    assert!(index.contains(&ObjectRef::certificate("C-root")));
    assert!(!index.contains(&ObjectRef::timestamp("T-404")));
    assert_eq!(index.chain(&sig.certificate_chain).len(), 2);
}

#[test]
fn duplicate_certificate_id_is_rejected() {
    let mut data = DiagnosticData::from_json_str(DOCUMENT).unwrap();
    let copy = data.certificates[1].clone();
    data.certificates.push(copy);

    let err = DiagnosticIndex::build(&data).unwrap_err();
    assert!(matches!(err, ModelError::DuplicateId { kind: "certificate", .. }));
}

#[test]
fn dangling_chain_reference_is_rejected() {
    let mut data = DiagnosticData::from_json_str(DOCUMENT).unwrap();
    data.signatures[0].certificate_chain.push("C-missing".to_string());

    let err = DiagnosticIndex::build(&data).unwrap_err();
    match err {
        ModelError::DanglingReference { owner, kind, id } => {
            assert_eq!(owner, "signature S-1");
            assert_eq!(kind, "certificate");
            assert_eq!(id, "C-missing");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn dangling_covered_object_is_rejected() {
    let mut data = DiagnosticData::from_json_str(DOCUMENT).unwrap();
    data.signatures[0].timestamps[0]
        .covered_objects
        .push(ObjectRef::revocation("R-missing"));

    let err = DiagnosticIndex::build(&data).unwrap_err();
    assert!(matches!(err, ModelError::DanglingReference { kind: "revocation", .. }));
}

#[test]
fn malformed_json_is_a_decode_error() {
    let err = DiagnosticData::from_json_str("{\"signatures\": 3}").unwrap_err();
    assert!(matches!(err, ModelError::Decode(_)));
}

#[test]
fn certificate_hold_is_not_a_revocation() {
    let mut data = DiagnosticData::from_json_str(DOCUMENT).unwrap();
    let rev = data.certificates[0].revocation.as_mut().unwrap();
    rev.reason = Some(RevocationReason::CertificateHold);

    assert!(rev.is_on_hold());
    assert!(!rev.is_revoked());
}

#[test]
fn expired_certs_revocation_info_extends_validity_past_not_after() {
    let mut data = DiagnosticData::from_json_str(DOCUMENT).unwrap();
    let after_expiry = "2023-01-01T00:00:00Z".parse().unwrap();
    let leaf = &mut data.certificates[0];
    assert!(!leaf.is_within_validity(after_expiry));

    leaf.trusted_service = Some(TrustedServiceData {
        expired_certs_revocation_info: Some("2021-01-01T00:00:00Z".parse().unwrap()),
    });
    assert!(leaf.is_within_validity(after_expiry));
    assert!(!leaf.is_within_validity("2017-01-01T00:00:00Z".parse().unwrap()));
}
