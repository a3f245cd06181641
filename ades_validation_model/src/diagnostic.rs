// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Typed diagnostic data.
//!
//! This is the normalized model produced by the signature-parsing collaborators: facts
//! extracted from the signature, its certificate chain, and its embedded revocation and
//! timestamp tokens. The engine only ever reads it.
//!
//! Certificates live in a single pool and are referenced by id from signatures and
//! timestamps. Revocation records are attached to the certificate they describe.

use crate::error::ModelError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DiagnosticData {
    #[serde(default)]
    pub signatures: Vec<SignatureData>,
    #[serde(default)]
    pub certificates: Vec<CertificateData>,
}

impl DiagnosticData {
    pub fn from_json_str(json: &str) -> Result<Self, ModelError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_slice(json: &[u8]) -> Result<Self, ModelError> {
        Ok(serde_json::from_slice(json)?)
    }
}

/// Algorithms and key size used to produce a signature value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignatureAlgorithm {
    #[serde(default)]
    pub digest_algorithm: Option<String>,
    #[serde(default)]
    pub encryption_algorithm: Option<String>,
    /// Size in bits of the key that produced the signature value.
    #[serde(default)]
    pub key_length: Option<u32>,
}

impl SignatureAlgorithm {
    pub fn new(digest: &str, encryption: &str, key_length: u32) -> Self {
        Self {
            digest_algorithm: Some(digest.to_string()),
            encryption_algorithm: Some(encryption.to_string()),
            key_length: Some(key_length),
        }
    }
}

/// Integrity facts of a signature value (or of a timestamp token).
///
/// For a timestamp the reference data is the message imprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicSignatureData {
    #[serde(default)]
    pub algorithm: SignatureAlgorithm,
    pub reference_data_found: bool,
    pub reference_data_intact: bool,
    pub signature_intact: bool,
}

impl Default for BasicSignatureData {
    fn default() -> Self {
        Self {
            algorithm: SignatureAlgorithm::default(),
            reference_data_found: true,
            reference_data_intact: true,
            signature_intact: true,
        }
    }
}

/// Binding between the signed `SigningCertificate` property and the certificate pool.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SigningCertificateData {
    /// Candidate certificate the collaborator resolved, if any.
    #[serde(default)]
    pub id: Option<String>,
    /// The signed properties carry a certificate digest reference.
    #[serde(default)]
    pub digest_value_present: bool,
    /// The referenced digest matches the candidate certificate.
    #[serde(default)]
    pub digest_value_match: bool,
    /// Issuer/serial comparison, when issuer/serial are carried at all.
    #[serde(default)]
    pub issuer_serial_match: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignedPropertiesData {
    #[serde(default)]
    pub signing_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub commitment_type_indications: Vec<String>,
    #[serde(default)]
    pub signer_location: Option<String>,
    #[serde(default)]
    pub claimed_roles: Vec<String>,
}

/// Explicit signature policy identifier found in the signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignaturePolicyData {
    pub id: String,
    /// Result of comparing the policy document digest, when it could be computed.
    #[serde(default)]
    pub digest_match: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureData {
    pub id: String,
    #[serde(default)]
    pub basic_signature: BasicSignatureData,
    #[serde(default)]
    pub signing_certificate: SigningCertificateData,
    /// Certificate ids ordered leaf to anchor.
    #[serde(default)]
    pub certificate_chain: Vec<String>,
    #[serde(default)]
    pub signed_properties: SignedPropertiesData,
    #[serde(default)]
    pub policy: Option<SignaturePolicyData>,
    #[serde(default)]
    pub timestamps: Vec<TimestampData>,
}

impl SignatureData {
    pub fn timestamps_of(
        &self,
        category: TimestampCategory,
    ) -> impl Iterator<Item = &TimestampData> {
        self.timestamps.iter().filter(move |t| t.category == category)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimestampCategory {
    /// Covers the signed content (all-data-objects / individual-data-objects).
    Content,
    Signature,
    /// Covers certificate and revocation references only (AdES-X type 2).
    ValidationDataRefsOnly,
    /// Covers the signature, its timestamps and the references (AdES-X type 1).
    ValidationData,
    Archive,
}

impl TimestampCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimestampCategory::Content => "CONTENT",
            TimestampCategory::Signature => "SIGNATURE",
            TimestampCategory::ValidationDataRefsOnly => "VALIDATION_DATA_REFS_ONLY",
            TimestampCategory::ValidationData => "VALIDATION_DATA",
            TimestampCategory::Archive => "ARCHIVE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampData {
    pub id: String,
    pub category: TimestampCategory,
    pub production_time: DateTime<Utc>,
    /// Integrity of the token; reference data is the message imprint.
    #[serde(default)]
    pub basic_signature: BasicSignatureData,
    /// Digest algorithm used over the timestamped data (the message imprint).
    #[serde(default)]
    pub signed_data_digest_algorithm: Option<String>,
    #[serde(default)]
    pub signing_certificate: SigningCertificateData,
    /// Certificate ids ordered leaf (TSA) to anchor.
    #[serde(default)]
    pub certificate_chain: Vec<String>,
    /// Objects this token proves existence of. Derived from the category when empty.
    #[serde(default)]
    pub covered_objects: Vec<ObjectRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectKind {
    Signature,
    Certificate,
    Revocation,
    Timestamp,
}

/// Typed reference to an identified object of the diagnostic data.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub kind: ObjectKind,
    pub id: String,
}

impl ObjectRef {
    pub fn new(kind: ObjectKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn signature(id: impl Into<String>) -> Self {
        Self::new(ObjectKind::Signature, id)
    }

    pub fn certificate(id: impl Into<String>) -> Self {
        Self::new(ObjectKind::Certificate, id)
    }

    pub fn revocation(id: impl Into<String>) -> Self {
        Self::new(ObjectKind::Revocation, id)
    }

    pub fn timestamp(id: impl Into<String>) -> Self {
        Self::new(ObjectKind::Timestamp, id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PublicKeyData {
    #[serde(default)]
    pub algorithm: Option<String>,
    #[serde(default)]
    pub length: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QualificationData {
    #[serde(default)]
    pub qc_compliance: bool,
    #[serde(default)]
    pub qc_sscd: bool,
    #[serde(default)]
    pub legal_person: bool,
}

/// Trusted-list service entry under which the certificate was issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustedServiceData {
    /// `ExpiredCertsRevocationInfo` extension: revocation information is kept for
    /// certificates that expired after this date.
    #[serde(default)]
    pub expired_certs_revocation_info: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RevocationSource {
    Crl,
    Ocsp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RevocationStatus {
    Good,
    Revoked,
    Unknown,
}

/// RFC 5280 CRL reason codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RevocationReason {
    Unspecified,
    KeyCompromise,
    CaCompromise,
    AffiliationChanged,
    Superseded,
    CessationOfOperation,
    CertificateHold,
    RemoveFromCrl,
    PrivilegeWithdrawn,
    AaCompromise,
}

impl RevocationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RevocationReason::Unspecified => "unspecified",
            RevocationReason::KeyCompromise => "keyCompromise",
            RevocationReason::CaCompromise => "cACompromise",
            RevocationReason::AffiliationChanged => "affiliationChanged",
            RevocationReason::Superseded => "superseded",
            RevocationReason::CessationOfOperation => "cessationOfOperation",
            RevocationReason::CertificateHold => "certificateHold",
            RevocationReason::RemoveFromCrl => "removeFromCRL",
            RevocationReason::PrivilegeWithdrawn => "privilegeWithdrawn",
            RevocationReason::AaCompromise => "aACompromise",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationData {
    pub id: String,
    pub source: RevocationSource,
    pub status: RevocationStatus,
    #[serde(default)]
    pub reason: Option<RevocationReason>,
    #[serde(default)]
    pub revocation_time: Option<DateTime<Utc>>,
    /// thisUpdate for a CRL, producedAt for an OCSP response.
    pub issuing_time: DateTime<Utc>,
    #[serde(default)]
    pub next_update: Option<DateTime<Utc>>,
    /// Algorithms used to sign the revocation token itself.
    #[serde(default)]
    pub signature: SignatureAlgorithm,
}

impl RevocationData {
    /// Revoked with a reason other than `certificateHold`.
    pub fn is_revoked(&self) -> bool {
        self.status == RevocationStatus::Revoked && !self.is_on_hold()
    }

    pub fn is_on_hold(&self) -> bool {
        self.status == RevocationStatus::Revoked
            && self.reason == Some(RevocationReason::CertificateHold)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateData {
    pub id: String,
    #[serde(default)]
    pub subject: Option<String>,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    #[serde(default)]
    pub public_key: PublicKeyData,
    /// Algorithms the issuer used to sign this certificate.
    #[serde(default)]
    pub signature: SignatureAlgorithm,
    /// Trust anchor.
    #[serde(default)]
    pub trusted: bool,
    #[serde(default)]
    pub self_signed: bool,
    #[serde(default)]
    pub trusted_service: Option<TrustedServiceData>,
    #[serde(default)]
    pub revocation: Option<RevocationData>,
    #[serde(default)]
    pub qualification: QualificationData,
    #[serde(default)]
    pub key_usages: Vec<String>,
}

impl CertificateData {
    /// `at` lies within the validity period, which extends past notAfter when revocation
    /// information is kept for expired certificates.
    pub fn is_within_validity(&self, at: DateTime<Utc>) -> bool {
        self.not_before <= at && (at <= self.not_after || self.has_expired_certs_revocation_info())
    }

    /// Revocation information is still maintained for this certificate after expiry.
    pub fn has_expired_certs_revocation_info(&self) -> bool {
        self.trusted_service
            .as_ref()
            .and_then(|s| s.expired_certs_revocation_info)
            .map(|since| self.not_after >= since)
            .unwrap_or(false)
    }
}
