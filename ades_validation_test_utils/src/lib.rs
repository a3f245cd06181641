// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Test-only utilities for composing validation scenarios.
//!
//! This crate keeps the production crates free of fixture code while still supporting
//! concise scenario composition in this repo. Everything defaults to a healthy state:
//! certificates valid from 2015 to 2030 signed with SHA256/RSA-2048, good OCSP responses,
//! intact signatures bound to their signing certificate.

use ades_validation_model::{
    BasicSignatureData, CertificateData, DiagnosticData, ObjectRef, PublicKeyData,
    QualificationData, RevocationData, RevocationReason, RevocationSource, RevocationStatus,
    SignatureAlgorithm, SignatureData, SignaturePolicyData, SignedPropertiesData,
    SigningCertificateData, TimestampCategory, TimestampData, TrustedServiceData,
};
use ades_validation_policy::ValidationConstraints;
use chrono::{DateTime, TimeZone, Utc};

/// Midnight UTC on the given date.
pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

/// The validation time used by most scenarios.
pub fn now() -> DateTime<Utc> {
    at(2025, 1, 1)
}

pub fn sha256_rsa() -> SignatureAlgorithm {
    SignatureAlgorithm::new("SHA256", "RSA", 2048)
}

pub fn default_constraints() -> ValidationConstraints {
    ValidationConstraints::builder()
        .with_name("test-policy")
        .build()
        .unwrap()
}

pub struct RevocationBuilder {
    revocation: RevocationData,
}

impl RevocationBuilder {
    /// A good OCSP response produced at `issuing_time`, without nextUpdate.
    pub fn good(id: &str, issuing_time: DateTime<Utc>) -> Self {
        Self {
            revocation: RevocationData {
                id: id.to_string(),
                source: RevocationSource::Ocsp,
                status: RevocationStatus::Good,
                reason: None,
                revocation_time: None,
                issuing_time,
                next_update: None,
                signature: sha256_rsa(),
            },
        }
    }

    pub fn revoked(id: &str, issuing_time: DateTime<Utc>, revocation_time: DateTime<Utc>) -> Self {
        let mut builder = Self::good(id, issuing_time);
        builder.revocation.status = RevocationStatus::Revoked;
        builder.revocation.reason = Some(RevocationReason::KeyCompromise);
        builder.revocation.revocation_time = Some(revocation_time);
        builder
    }

    pub fn on_hold(id: &str, issuing_time: DateTime<Utc>, since: DateTime<Utc>) -> Self {
        let mut builder = Self::revoked(id, issuing_time, since);
        builder.revocation.reason = Some(RevocationReason::CertificateHold);
        builder
    }

    pub fn unknown(id: &str, issuing_time: DateTime<Utc>) -> Self {
        let mut builder = Self::good(id, issuing_time);
        builder.revocation.status = RevocationStatus::Unknown;
        builder
    }

    pub fn crl(mut self) -> Self {
        self.revocation.source = RevocationSource::Crl;
        self
    }

    pub fn next_update(mut self, next_update: DateTime<Utc>) -> Self {
        self.revocation.next_update = Some(next_update);
        self
    }

    pub fn signed_with(mut self, signature: SignatureAlgorithm) -> Self {
        self.revocation.signature = signature;
        self
    }

    pub fn build(self) -> RevocationData {
        self.revocation
    }
}

pub struct CertificateBuilder {
    cert: CertificateData,
}

impl CertificateBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            cert: CertificateData {
                id: id.to_string(),
                subject: Some(format!("CN={id}")),
                not_before: at(2015, 1, 1),
                not_after: at(2030, 1, 1),
                public_key: PublicKeyData {
                    algorithm: Some("RSA".to_string()),
                    length: Some(2048),
                },
                signature: sha256_rsa(),
                trusted: false,
                self_signed: false,
                trusted_service: None,
                revocation: None,
                qualification: QualificationData::default(),
                key_usages: vec!["nonRepudiation".to_string()],
            },
        }
    }

    /// A self-signed trust anchor.
    pub fn anchor(id: &str) -> Self {
        let mut builder = Self::new(id);
        builder.cert.trusted = true;
        builder.cert.self_signed = true;
        builder.cert.not_before = at(2010, 1, 1);
        builder.cert.not_after = at(2040, 1, 1);
        builder.cert.key_usages = vec!["keyCertSign".to_string()];
        builder
    }

    pub fn valid_between(mut self, not_before: DateTime<Utc>, not_after: DateTime<Utc>) -> Self {
        self.cert.not_before = not_before;
        self.cert.not_after = not_after;
        self
    }

    pub fn signed_with(mut self, signature: SignatureAlgorithm) -> Self {
        self.cert.signature = signature;
        self
    }

    pub fn revocation(mut self, revocation: RevocationData) -> Self {
        self.cert.revocation = Some(revocation);
        self
    }

    /// Attach a good OCSP response with id `{cert id}-ocsp`.
    pub fn good_at(self, issuing_time: DateTime<Utc>) -> Self {
        let id = format!("{}-ocsp", self.cert.id);
        self.revocation(RevocationBuilder::good(&id, issuing_time).build())
    }

    pub fn qualification(mut self, qualification: QualificationData) -> Self {
        self.cert.qualification = qualification;
        self
    }

    pub fn key_usages(mut self, usages: &[&str]) -> Self {
        self.cert.key_usages = usages.iter().map(|u| u.to_string()).collect();
        self
    }

    pub fn expired_certs_revocation_info(mut self, since: DateTime<Utc>) -> Self {
        self.cert.trusted_service = Some(TrustedServiceData {
            expired_certs_revocation_info: Some(since),
        });
        self
    }

    pub fn build(self) -> CertificateData {
        self.cert
    }
}

/// Ids of a three-certificate chain built by [`standard_chain`].
#[derive(Debug, Clone)]
pub struct ChainIds {
    pub leaf: String,
    pub ca: String,
    pub root: String,
}

impl ChainIds {
    pub fn new(prefix: &str) -> Self {
        Self {
            leaf: format!("{prefix}-leaf"),
            ca: format!("{prefix}-ca"),
            root: format!("{prefix}-root"),
        }
    }

    pub fn as_vec(&self) -> Vec<&str> {
        vec![self.leaf.as_str(), self.ca.as_str(), self.root.as_str()]
    }
}

/// Leaf, intermediate CA and trust anchor, with good OCSP responses for the leaf and the CA
/// issued at `revocation_issued`.
pub fn standard_chain(
    prefix: &str,
    revocation_issued: DateTime<Utc>,
) -> (ChainIds, Vec<CertificateData>) {
    let ids = ChainIds::new(prefix);
    let certs = vec![
        CertificateBuilder::new(&ids.leaf).good_at(revocation_issued).build(),
        CertificateBuilder::new(&ids.ca)
            .key_usages(&["keyCertSign"])
            .good_at(revocation_issued)
            .build(),
        CertificateBuilder::anchor(&ids.root).build(),
    ];
    (ids, certs)
}

fn bound_to(chain: &[&str]) -> SigningCertificateData {
    SigningCertificateData {
        id: chain.first().map(|id| id.to_string()),
        digest_value_present: true,
        digest_value_match: true,
        issuer_serial_match: None,
    }
}

pub struct SignatureBuilder {
    signature: SignatureData,
}

impl SignatureBuilder {
    /// An intact signature bound to the first certificate of `chain` (leaf to anchor).
    pub fn new(id: &str, chain: &[&str]) -> Self {
        Self {
            signature: SignatureData {
                id: id.to_string(),
                basic_signature: BasicSignatureData {
                    algorithm: sha256_rsa(),
                    ..BasicSignatureData::default()
                },
                signing_certificate: bound_to(chain),
                certificate_chain: chain.iter().map(|c| c.to_string()).collect(),
                signed_properties: SignedPropertiesData::default(),
                policy: None,
                timestamps: Vec::new(),
            },
        }
    }

    pub fn signature_intact(mut self, intact: bool) -> Self {
        self.signature.basic_signature.signature_intact = intact;
        self
    }

    pub fn reference_data(mut self, found: bool, intact: bool) -> Self {
        self.signature.basic_signature.reference_data_found = found;
        self.signature.basic_signature.reference_data_intact = intact;
        self
    }

    pub fn algorithm(mut self, algorithm: SignatureAlgorithm) -> Self {
        self.signature.basic_signature.algorithm = algorithm;
        self
    }

    pub fn signing_certificate(mut self, binding: SigningCertificateData) -> Self {
        self.signature.signing_certificate = binding;
        self
    }

    pub fn signing_time(mut self, signing_time: DateTime<Utc>) -> Self {
        self.signature.signed_properties.signing_time = Some(signing_time);
        self
    }

    pub fn commitment_type(mut self, commitment: &str) -> Self {
        self.signature
            .signed_properties
            .commitment_type_indications
            .push(commitment.to_string());
        self
    }

    pub fn claimed_role(mut self, role: &str) -> Self {
        self.signature.signed_properties.claimed_roles.push(role.to_string());
        self
    }

    pub fn signer_location(mut self, location: &str) -> Self {
        self.signature.signed_properties.signer_location = Some(location.to_string());
        self
    }

    pub fn policy(mut self, id: &str, digest_match: Option<bool>) -> Self {
        self.signature.policy = Some(SignaturePolicyData {
            id: id.to_string(),
            digest_match,
        });
        self
    }

    pub fn timestamp(mut self, timestamp: TimestampData) -> Self {
        self.signature.timestamps.push(timestamp);
        self
    }

    pub fn build(self) -> SignatureData {
        self.signature
    }
}

pub struct TimestampBuilder {
    timestamp: TimestampData,
}

impl TimestampBuilder {
    /// A valid-looking token issued by the first certificate of `chain`, with a SHA256 message
    /// imprint that matches.
    pub fn new(
        id: &str,
        category: TimestampCategory,
        production_time: DateTime<Utc>,
        chain: &[&str],
    ) -> Self {
        Self {
            timestamp: TimestampData {
                id: id.to_string(),
                category,
                production_time,
                basic_signature: BasicSignatureData {
                    algorithm: sha256_rsa(),
                    ..BasicSignatureData::default()
                },
                signed_data_digest_algorithm: Some("SHA256".to_string()),
                signing_certificate: bound_to(chain),
                certificate_chain: chain.iter().map(|c| c.to_string()).collect(),
                covered_objects: Vec::new(),
            },
        }
    }

    pub fn signature_timestamp(id: &str, production_time: DateTime<Utc>, chain: &[&str]) -> Self {
        Self::new(id, TimestampCategory::Signature, production_time, chain)
    }

    pub fn content_timestamp(id: &str, production_time: DateTime<Utc>, chain: &[&str]) -> Self {
        Self::new(id, TimestampCategory::Content, production_time, chain)
    }

    pub fn archive_timestamp(id: &str, production_time: DateTime<Utc>, chain: &[&str]) -> Self {
        Self::new(id, TimestampCategory::Archive, production_time, chain)
    }

    pub fn message_imprint_intact(mut self, intact: bool) -> Self {
        self.timestamp.basic_signature.reference_data_intact = intact;
        self
    }

    pub fn signature_intact(mut self, intact: bool) -> Self {
        self.timestamp.basic_signature.signature_intact = intact;
        self
    }

    pub fn algorithm(mut self, algorithm: SignatureAlgorithm) -> Self {
        self.timestamp.basic_signature.algorithm = algorithm;
        self
    }

    pub fn imprint_digest(mut self, digest: &str) -> Self {
        self.timestamp.signed_data_digest_algorithm = Some(digest.to_string());
        self
    }

    pub fn covering(mut self, object: ObjectRef) -> Self {
        self.timestamp.covered_objects.push(object);
        self
    }

    pub fn build(self) -> TimestampData {
        self.timestamp
    }
}

#[derive(Default)]
pub struct DiagnosticDataBuilder {
    data: DiagnosticData,
}

impl DiagnosticDataBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn certificate(mut self, cert: CertificateData) -> Self {
        self.data.certificates.push(cert);
        self
    }

    pub fn certificates(mut self, certs: impl IntoIterator<Item = CertificateData>) -> Self {
        self.data.certificates.extend(certs);
        self
    }

    pub fn signature(mut self, signature: SignatureData) -> Self {
        self.data.signatures.push(signature);
        self
    }

    pub fn build(self) -> DiagnosticData {
        self.data
    }
}
