// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Inputs threaded through the stages of one validation run.
//!
//! Every stage receives exactly what it needs as constructor-checked values. Results of
//! earlier stages are passed explicitly as typed outcomes, never looked up from shared state.

use ades_validation_model::{
    BasicSignatureData, CertificateData, DiagnosticIndex, ObjectRef, SignatureData,
    SignaturePolicyData, SignedPropertiesData, SigningCertificateData, TimestampCategory,
    TimestampData,
};
use ades_validation_policy::{ConstraintContext, ValidationConstraints};
use chrono::{DateTime, Utc};

/// Read-only inputs shared by every stage of one run.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    pub index: &'a DiagnosticIndex<'a>,
    pub constraints: &'a ValidationConstraints,
    pub current_time: DateTime<Utc>,
}

impl<'a> ValidationContext<'a> {
    pub fn new(
        index: &'a DiagnosticIndex<'a>,
        constraints: &'a ValidationConstraints,
        current_time: DateTime<Utc>,
    ) -> Self {
        Self {
            index,
            constraints,
            current_time,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Signature,
    Timestamp(TimestampCategory),
}

/// A signature or a timestamp token, as seen by the building blocks.
///
/// A timestamp is treated as a CAdES-BES signature over its message imprint, so both share
/// one shape. Fields a timestamp does not have are `None`.
#[derive(Debug, Clone)]
pub struct SignedToken<'a> {
    pub id: &'a str,
    pub kind: TokenKind,
    pub basic_signature: &'a BasicSignatureData,
    pub signing_certificate: &'a SigningCertificateData,
    /// Leaf to anchor.
    pub chain: Vec<&'a CertificateData>,
    pub signed_properties: Option<&'a SignedPropertiesData>,
    pub policy: Option<&'a SignaturePolicyData>,
    pub signed_data_digest_algorithm: Option<&'a str>,
}

impl<'a> SignedToken<'a> {
    pub fn signature(index: &DiagnosticIndex<'a>, signature: &'a SignatureData) -> Self {
        Self {
            id: &signature.id,
            kind: TokenKind::Signature,
            basic_signature: &signature.basic_signature,
            signing_certificate: &signature.signing_certificate,
            chain: index.chain(&signature.certificate_chain),
            signed_properties: Some(&signature.signed_properties),
            policy: signature.policy.as_ref(),
            signed_data_digest_algorithm: None,
        }
    }

    pub fn timestamp(index: &DiagnosticIndex<'a>, timestamp: &'a TimestampData) -> Self {
        Self {
            id: &timestamp.id,
            kind: TokenKind::Timestamp(timestamp.category),
            basic_signature: &timestamp.basic_signature,
            signing_certificate: &timestamp.signing_certificate,
            chain: index.chain(&timestamp.certificate_chain),
            signed_properties: None,
            policy: None,
            signed_data_digest_algorithm: timestamp.signed_data_digest_algorithm.as_deref(),
        }
    }

    pub fn is_timestamp(&self) -> bool {
        matches!(self.kind, TokenKind::Timestamp(_))
    }

    pub fn object_ref(&self) -> ObjectRef {
        match self.kind {
            TokenKind::Signature => ObjectRef::signature(self.id),
            TokenKind::Timestamp(_) => ObjectRef::timestamp(self.id),
        }
    }

    /// Context of the token's own signature value.
    pub fn constraint_context(&self) -> ConstraintContext {
        match self.kind {
            TokenKind::Signature => ConstraintContext::MainSignature,
            TokenKind::Timestamp(_) => ConstraintContext::Timestamp,
        }
    }
}

/// Splits a leaf-to-anchor chain at its first trust anchor.
///
/// Returns the certificates to validate (leaf first, anchor excluded), or `None` when no
/// certificate of the chain is a trust anchor.
pub fn certificates_below_anchor<'c, 'a>(
    chain: &'c [&'a CertificateData],
) -> Option<&'c [&'a CertificateData]> {
    chain.iter().position(|c| c.trusted).map(|pos| &chain[..pos])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn cert(id: &str, trusted: bool) -> CertificateData {
        CertificateData {
            id: id.to_string(),
            subject: None,
            not_before: Utc.with_ymd_and_hms(2010, 1, 1, 0, 0, 0).unwrap(),
            not_after: Utc.with_ymd_and_hms(2040, 1, 1, 0, 0, 0).unwrap(),
            public_key: Default::default(),
            signature: Default::default(),
            trusted,
            self_signed: trusted,
            trusted_service: None,
            revocation: None,
            qualification: Default::default(),
            key_usages: Vec::new(),
        }
    }

    #[test]
    fn chain_is_cut_at_first_anchor() {
        let leaf = cert("leaf", false);
        let ca = cert("ca", false);
        let root = cert("root", true);
        let chain = vec![&leaf, &ca, &root];

        let below = certificates_below_anchor(&chain).unwrap();
        assert_eq!(below.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(), ["leaf", "ca"]);
    }

    #[test]
    fn chain_without_anchor_is_rejected() {
        let leaf = cert("leaf", false);
        let ca = cert("ca", false);
        assert!(certificates_below_anchor(&[&leaf, &ca]).is_none());
        assert!(certificates_below_anchor(&[]).is_none());
    }
}
