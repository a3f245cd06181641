// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! X.509 certificate validation at the current time.
//!
//! The chain must end at a trust anchor. The signing certificate's meta-data constraints are
//! checked next, then every certificate below the anchor, from the anchor side down to the
//! leaf. The first failure ends the block.

use super::sav::crypto_failure;
use super::{record_level, stage_builder, BlockOutcome};
use crate::context::{certificates_below_anchor, SignedToken, ValidationContext};
use crate::verdict::Deferral;
use ades_validation_model::{
    CertificateData, Conclusion, ConstraintCheck, ConstraintStatus, Info, RevocationData,
    RevocationSource, RevocationStatus, Stage, StageReportBuilder, SubIndication,
};
use ades_validation_policy::{AlgorithmUse, ConstraintContext, ValidationConstraints};
use chrono::{DateTime, Utc};

pub const CERTIFICATE_CHAIN_FOUND: &str = "CertificateChainFound";
pub const CHAIN_STARTS_AT_SIGNING_CERTIFICATE: &str = "ChainStartsAtSigningCertificate";
pub const QUALIFIED_CERTIFICATE: &str = "QualifiedCertificate";
pub const SSCD_CERTIFICATE: &str = "SscdCertificate";
pub const LEGAL_PERSON_CERTIFICATE: &str = "LegalPersonCertificate";
pub const KEY_USAGE: &str = "KeyUsage";
pub const CERTIFICATE_VALIDITY_RANGE: &str = "CertificateValidityRange";
pub const REVOCATION_DATA_PRESENT: &str = "RevocationDataPresent";
pub const REVOCATION_STATUS_KNOWN: &str = "RevocationStatusKnown";
pub const CERTIFICATE_NOT_REVOKED: &str = "CertificateNotRevoked";
pub const CERTIFICATE_NOT_ON_HOLD: &str = "CertificateNotOnHold";
pub const REVOCATION_DATA_FRESH: &str = "RevocationDataFresh";
pub const CERTIFICATE_SIGNATURE_ALGORITHM_ACCEPTABLE: &str =
    "CertificateSignatureAlgorithmAcceptable";
pub const REVOCATION_SIGNATURE_ALGORITHM_ACCEPTABLE: &str =
    "RevocationSignatureAlgorithmAcceptable";

enum Failure {
    Final(Conclusion),
    Deferred(Deferral),
}

pub fn validate_certificate_chain(
    ctx: &ValidationContext<'_>,
    token: &SignedToken<'_>,
    signing_certificate: Option<&CertificateData>,
) -> BlockOutcome {
    let mut builder = stage_builder(Stage::X509CertificateValidation, token);
    let chain = token.chain.as_slice();

    let Some(below) = certificates_below_anchor(chain) else {
        builder.ko(CERTIFICATE_CHAIN_FOUND, "chain does not end at a trust anchor");
        return no_chain(builder);
    };
    builder.ok(CERTIFICATE_CHAIN_FOUND);

    if let Some(expected) = signing_certificate {
        let leaf_id = chain.first().map(|c| c.id.as_str());
        let starts_at_signer = leaf_id == Some(expected.id.as_str());
        if !builder.check(CHAIN_STARTS_AT_SIGNING_CERTIFICATE, starts_at_signer, || {
            format!("chain does not start at {}", expected.id)
        }) {
            return no_chain(builder);
        }
    }

    if !token.is_timestamp() {
        if let Some(leaf) = chain.first() {
            if !check_signing_certificate_constraints(ctx.constraints, leaf, &mut builder) {
                let conclusion = Conclusion::invalid(SubIndication::ChainConstraintsFailure);
                return BlockOutcome::concluded(builder, conclusion);
            }
        }
    }

    for (pos, cert) in below.iter().enumerate().rev() {
        let issuer = chain.get(pos + 1).copied();
        let context = certificate_context(token.constraint_context(), pos == 0);
        match check_certificate(ctx, cert, issuer, pos == 0, context, &mut builder) {
            Ok(()) => {}
            Err(Failure::Final(conclusion)) => return BlockOutcome::concluded(builder, conclusion),
            Err(Failure::Deferred(deferral)) => return BlockOutcome::deferred(builder, deferral),
        }
    }

    BlockOutcome::concluded(builder, Conclusion::valid())
}

fn no_chain(builder: StageReportBuilder) -> BlockOutcome {
    let conclusion = Conclusion::indeterminate(SubIndication::NoCertificateChainFound);
    BlockOutcome::concluded(builder, conclusion)
}

fn check_signing_certificate_constraints(
    constraints: &ValidationConstraints,
    leaf: &CertificateData,
    builder: &mut StageReportBuilder,
) -> bool {
    let required = &constraints.signing_certificate;
    let qualification = &leaf.qualification;

    let qualified = qualification.qc_compliance;
    if !record_level(builder, QUALIFIED_CERTIFICATE, required.qualified, qualified, || {
        format!("{} is not a qualified certificate", leaf.id)
    }) {
        return false;
    }
    if !record_level(builder, SSCD_CERTIFICATE, required.sscd, qualification.qc_sscd, || {
        format!("{} is not supported by an SSCD", leaf.id)
    }) {
        return false;
    }
    let legal_person = qualification.legal_person;
    if !record_level(builder, LEGAL_PERSON_CERTIFICATE, required.legal_person, legal_person, || {
        format!("{} is not issued to a legal person", leaf.id)
    }) {
        return false;
    }

    let missing: Vec<&String> = required
        .required_key_usages
        .iter()
        .filter(|usage| !leaf.key_usages.contains(usage))
        .collect();
    record_level(builder, KEY_USAGE, required.key_usage, missing.is_empty(), || {
        format!("{} lacks key usages {missing:?}", leaf.id)
    })
}

fn check_certificate(
    ctx: &ValidationContext<'_>,
    cert: &CertificateData,
    issuer: Option<&CertificateData>,
    is_leaf: bool,
    context: ConstraintContext,
    builder: &mut StageReportBuilder,
) -> Result<(), Failure> {
    let now = ctx.current_time;

    if !record(builder, CERTIFICATE_VALIDITY_RANGE, &cert.id, cert.is_within_validity(now), || {
        format!("not valid at {now}")
    }) {
        return Err(Failure::Deferred(Deferral::OutOfBounds {
            certificate_id: cert.id.clone(),
            not_before: cert.not_before,
            not_after: cert.not_after,
        }));
    }

    let Some(revocation) = &cert.revocation else {
        record(builder, REVOCATION_DATA_PRESENT, &cert.id, false, || {
            "no revocation data".to_string()
        });
        return Err(Failure::Final(try_later(cert)));
    };
    record(builder, REVOCATION_DATA_PRESENT, &cert.id, true, String::new);

    if !record(
        builder,
        REVOCATION_STATUS_KNOWN,
        &cert.id,
        revocation.status != RevocationStatus::Unknown,
        || format!("revocation {} reports an unknown status", revocation.id),
    ) {
        return Err(Failure::Final(try_later(cert)));
    }

    if !record(builder, CERTIFICATE_NOT_REVOKED, &cert.id, !revocation.is_revoked(), || {
        let reason = revocation.reason.map_or("unspecified", |r| r.as_str());
        format!("revoked per {} ({reason})", revocation.id)
    }) {
        return Err(revoked(cert, revocation, is_leaf));
    }

    if !record(builder, CERTIFICATE_NOT_ON_HOLD, &cert.id, !revocation.is_on_hold(), || {
        format!("on hold per {}", revocation.id)
    }) {
        return Err(Failure::Final(try_later(cert)));
    }

    if !record(
        builder,
        REVOCATION_DATA_FRESH,
        &cert.id,
        is_fresh(ctx.constraints, revocation, now),
        || {
            format!(
                "revocation {} issued at {} is not fresh",
                revocation.id, revocation.issuing_time
            )
        },
    ) {
        return Err(Failure::Final(try_later(cert)));
    }

    let check = ctx
        .constraints
        .check_cryptographic_constraint(context, certificate_algorithm(cert, issuer), now);
    let name = CERTIFICATE_SIGNATURE_ALGORITHM_ACCEPTABLE;
    if let Some(deferral) = crypto_failure(builder, name, &cert.id, context, check) {
        return Err(Failure::Deferred(deferral));
    }

    let context = revocation_context(revocation.source);
    let check = ctx
        .constraints
        .check_cryptographic_constraint(context, revocation_algorithm(revocation), now);
    let name = REVOCATION_SIGNATURE_ALGORITHM_ACCEPTABLE;
    if let Some(deferral) = crypto_failure(builder, name, &revocation.id, context, check) {
        return Err(Failure::Deferred(deferral));
    }

    Ok(())
}

fn record(
    builder: &mut StageReportBuilder,
    name: &str,
    object_id: &str,
    passed: bool,
    detail: impl FnOnce() -> String,
) -> bool {
    let check = if passed {
        ConstraintCheck::new(name, ConstraintStatus::Ok)
    } else {
        ConstraintCheck::new(name, ConstraintStatus::Ko).with_detail(detail())
    };
    builder.record(check.with_object(object_id));
    passed
}

fn try_later(cert: &CertificateData) -> Conclusion {
    Conclusion::indeterminate(SubIndication::TryLater)
        .with_info(Info::value(Info::CERTIFICATE_ID, &cert.id))
}

fn revoked(cert: &CertificateData, revocation: &RevocationData, is_leaf: bool) -> Failure {
    let certificate_id = cert.id.clone();
    let revocation_time = revocation_time(cert, revocation);
    let reason = revocation.reason;
    let deferral = if is_leaf {
        Deferral::Revoked {
            certificate_id,
            revocation_time,
            reason,
        }
    } else {
        Deferral::RevokedCa {
            certificate_id,
            revocation_time,
            reason,
        }
    };
    Failure::Deferred(deferral)
}

/// Revocation instant. A revoked status without a date counts as revoked since issuance.
pub(crate) fn revocation_time(
    cert: &CertificateData,
    revocation: &RevocationData,
) -> DateTime<Utc> {
    revocation.revocation_time.unwrap_or(cert.not_before)
}

fn is_fresh(
    constraints: &ValidationConstraints,
    revocation: &RevocationData,
    at: DateTime<Utc>,
) -> bool {
    match constraints.revocation_freshness {
        Some(tolerance) => at - revocation.issuing_time <= tolerance,
        None => revocation.next_update.map_or(true, |next| at <= next),
    }
}

/// Context of the signature on a certificate: the token's own context for the leaf, the CA
/// context above it.
pub(crate) fn certificate_context(
    token_context: ConstraintContext,
    is_leaf: bool,
) -> ConstraintContext {
    if is_leaf {
        token_context
    } else {
        ConstraintContext::CaCertificate
    }
}

pub(crate) fn revocation_context(source: RevocationSource) -> ConstraintContext {
    match source {
        RevocationSource::Ocsp => ConstraintContext::Ocsp,
        RevocationSource::Crl => ConstraintContext::Crl,
    }
}

/// Algorithms of the issuer's signature on `cert`; the key size falls back to the issuer's key.
pub(crate) fn certificate_algorithm<'c>(
    cert: &'c CertificateData,
    issuer: Option<&CertificateData>,
) -> AlgorithmUse<'c> {
    AlgorithmUse::new(
        cert.signature.digest_algorithm.as_deref(),
        cert.signature.encryption_algorithm.as_deref(),
        cert.signature
            .key_length
            .or_else(|| issuer.and_then(|i| i.public_key.length)),
    )
}

pub(crate) fn revocation_algorithm(revocation: &RevocationData) -> AlgorithmUse<'_> {
    AlgorithmUse::new(
        revocation.signature.digest_algorithm.as_deref(),
        revocation.signature.encryption_algorithm.as_deref(),
        revocation.signature.key_length,
    )
}
