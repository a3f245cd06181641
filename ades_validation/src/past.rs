// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Past certificate validation and past signature validation.
//!
//! Past certificate validation slides a control time back from the current time over the
//! chain, from the anchor side down: a revoked certificate pulls it back to its revocation, a
//! stale revocation token pulls it back to the token's issuance. The chain is then checked as
//! of the control time, with algorithm expiry excused by a proof of existence of the signed
//! object before the expiration.
//!
//! Past signature validation uses the control time and the proof of existence of the
//! signature (or timestamp) to resolve the deferred failures of a current-time verdict.

use crate::bbb::xcv::{
    certificate_algorithm, certificate_context, revocation_algorithm, revocation_context,
    revocation_time,
};
use crate::context::{certificates_below_anchor, ValidationContext};
use crate::poe::PoeSet;
use crate::verdict::{Deferral, Verdict};
use ades_validation_model::{
    format_time, CertificateData, Conclusion, ConstraintCheck, ConstraintStatus, Info, ObjectKind,
    ObjectRef, RevocationStatus, Stage, StageReport, StageReportBuilder, SubIndication,
};
use ades_validation_policy::{AlgorithmUse, ConstraintContext, CryptoCheck};
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

pub const CERTIFICATE_CHAIN_FOUND: &str = "CertificateChainFound";
pub const REVOCATION_DATA_PRESENT: &str = "RevocationDataPresent";
pub const REVOCATION_STATUS_KNOWN: &str = "RevocationStatusKnown";
pub const CONTROL_TIME_SLIDING: &str = "ControlTimeSliding";
pub const VALIDITY_AT_CONTROL_TIME: &str = "CertificateValidityAtControlTime";
pub const CERTIFICATE_ALGORITHM_AT_CONTROL_TIME: &str =
    "CertificateSignatureAlgorithmAtControlTime";
pub const REVOCATION_ALGORITHM_AT_CONTROL_TIME: &str = "RevocationSignatureAlgorithmAtControlTime";
pub const DEFERRED_FAILURE_RESOLVED: &str = "DeferredFailureResolved";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PastCertificateValidation {
    pub report: StageReport,
    pub control_time: DateTime<Utc>,
}

impl PastCertificateValidation {
    pub fn conclusion(&self) -> &Conclusion {
        &self.report.conclusion
    }
}

pub fn validate_past_certificate(
    ctx: &ValidationContext<'_>,
    target: &ObjectRef,
    token_context: ConstraintContext,
    chain: &[&CertificateData],
    poe: &PoeSet,
) -> PastCertificateValidation {
    let mut builder = StageReport::builder(Stage::PastCertificateValidation).subject(&target.id);
    let mut control_time = ctx.current_time;

    let Some(below) = certificates_below_anchor(chain) else {
        builder.ko(CERTIFICATE_CHAIN_FOUND, "chain does not end at a trust anchor");
        let conclusion = Conclusion::indeterminate(SubIndication::NoCertificateChainFound);
        return finish_pcv(target, builder, conclusion, control_time);
    };
    builder.ok(CERTIFICATE_CHAIN_FOUND);

    for cert in below.iter().rev() {
        let Some(revocation) = &cert.revocation else {
            record(&mut builder, REVOCATION_DATA_PRESENT, &cert.id, false, || {
                "no revocation data".to_string()
            });
            return finish_pcv(target, builder, try_later(cert), control_time);
        };
        if revocation.status == RevocationStatus::Unknown {
            record(&mut builder, REVOCATION_STATUS_KNOWN, &cert.id, false, || {
                format!("revocation {} reports an unknown status", revocation.id)
            });
            return finish_pcv(target, builder, try_later(cert), control_time);
        }

        if revocation.is_revoked() || revocation.is_on_hold() {
            control_time = control_time.min(revocation_time(cert, revocation));
        } else {
            let tolerance = ctx
                .constraints
                .revocation_freshness
                .or_else(|| revocation.next_update.map(|next| next - revocation.issuing_time))
                .unwrap_or_else(Duration::zero);
            let stale = revocation
                .issuing_time
                .checked_add_signed(tolerance)
                .map_or(false, |fresh_until| fresh_until < control_time);
            if stale {
                control_time = revocation.issuing_time;
            }
        }
        builder.record(
            ConstraintCheck::new(CONTROL_TIME_SLIDING, ConstraintStatus::Informational)
                .with_object(&cert.id)
                .with_detail(format_time(control_time)),
        );
    }

    for (pos, cert) in below.iter().enumerate().rev() {
        let in_range = cert.is_within_validity(control_time);
        if !record(&mut builder, VALIDITY_AT_CONTROL_TIME, &cert.id, in_range, || {
            format!("not valid at control time {}", format_time(control_time))
        }) {
            let conclusion = Conclusion::indeterminate(SubIndication::OutOfBoundsNoPoe)
                .with_info(Info::value(Info::CERTIFICATE_ID, &cert.id))
                .with_info(Info::time(Info::CONTROL_TIME, control_time));
            return finish_pcv(target, builder, conclusion, control_time);
        }

        let issuer = chain.get(pos + 1).copied();
        let context = certificate_context(token_context, pos == 0);
        let cert_ref = ObjectRef::certificate(&cert.id);
        let usage = certificate_algorithm(cert, issuer);
        if !check_algorithm_at(
            ctx,
            poe,
            &mut builder,
            CERTIFICATE_ALGORITHM_AT_CONTROL_TIME,
            &cert_ref,
            context,
            usage,
            control_time,
        ) {
            return finish_pcv(target, builder, crypto_no_poe(&cert.id, control_time), control_time);
        }

        if let Some(revocation) = &cert.revocation {
            let rev_ref = ObjectRef::revocation(&revocation.id);
            let context = revocation_context(revocation.source);
            let usage = revocation_algorithm(revocation);
            if !check_algorithm_at(
                ctx,
                poe,
                &mut builder,
                REVOCATION_ALGORITHM_AT_CONTROL_TIME,
                &rev_ref,
                context,
                usage,
                control_time,
            ) {
                let conclusion = crypto_no_poe(&revocation.id, control_time);
                return finish_pcv(target, builder, conclusion, control_time);
            }
        }
    }

    let conclusion = Conclusion::valid().with_info(Info::time(Info::CONTROL_TIME, control_time));
    finish_pcv(target, builder, conclusion, control_time)
}

/// An algorithm expired at the control time still passes when `object` is proven to exist
/// before the expiration.
#[allow(clippy::too_many_arguments)]
fn check_algorithm_at(
    ctx: &ValidationContext<'_>,
    poe: &PoeSet,
    builder: &mut StageReportBuilder,
    name: &str,
    object: &ObjectRef,
    context: ConstraintContext,
    usage: AlgorithmUse<'_>,
    control_time: DateTime<Utc>,
) -> bool {
    match ctx.constraints.check_cryptographic_constraint(context, usage, control_time) {
        CryptoCheck::Acceptable => record(builder, name, &object.id, true, String::new),
        CryptoCheck::Rejected { reason } => {
            record(builder, name, &object.id, false, || format!("{context}: {reason}"))
        }
        CryptoCheck::Expired { algorithm, expiration } => {
            let proven = poe.get_or(object, ctx.current_time);
            record(builder, name, &object.id, proven < expiration, || {
                format!(
                    "{context}: {algorithm} expired at {}, existence proven at {}",
                    format_time(expiration),
                    format_time(proven)
                )
            })
        }
    }
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

fn crypto_no_poe(object_id: &str, control_time: DateTime<Utc>) -> Conclusion {
    Conclusion::indeterminate(SubIndication::CryptoConstraintsFailureNoPoe)
        .with_info(Info::value(Info::DETAIL, object_id))
        .with_info(Info::time(Info::CONTROL_TIME, control_time))
}

fn finish_pcv(
    target: &ObjectRef,
    builder: StageReportBuilder,
    conclusion: Conclusion,
    control_time: DateTime<Utc>,
) -> PastCertificateValidation {
    log_target(target, "PCV", &conclusion);
    PastCertificateValidation {
        report: builder.finish(conclusion),
        control_time,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PastSignatureValidation {
    pub report: StageReport,
    pub verdict: Verdict,
}

/// Re-evaluate `current`, the verdict of `target` at the current time, using past certificate
/// validation over `chain` and the proofs of existence in `poe`.
pub fn validate_past_signature(
    ctx: &ValidationContext<'_>,
    target: &ObjectRef,
    token_context: ConstraintContext,
    chain: &[&CertificateData],
    current: &Verdict,
    poe: &PoeSet,
) -> PastSignatureValidation {
    let mut builder = StageReport::builder(Stage::PastSignatureValidation).subject(&target.id);

    if current.pending.is_empty() {
        return finish_psv(target, builder, current.clone());
    }

    let pcv = validate_past_certificate(ctx, target, token_context, chain, poe);
    let pcv_conclusion = pcv.conclusion().clone();
    let control_time = pcv.control_time;
    builder.child(pcv.report);
    if !pcv_conclusion.is_valid() {
        return finish_psv(target, builder, Verdict::from_conclusion(pcv_conclusion));
    }

    let proven = poe.get_or(target, ctx.current_time);
    let mut unresolved = Vec::new();
    for deferral in &current.pending {
        if let Deferral::OutOfBounds {
            certificate_id,
            not_before,
            ..
        } = deferral
        {
            if proven < *not_before {
                record(&mut builder, DEFERRED_FAILURE_RESOLVED, certificate_id, false, || {
                    format!("existence proven at {}, before notBefore", format_time(proven))
                });
                let conclusion = Conclusion::invalid(SubIndication::NotYetValid)
                    .with_info(Info::value(Info::CERTIFICATE_ID, certificate_id))
                    .with_info(Info::time(Info::NOT_BEFORE, *not_before));
                return finish_psv(target, builder, Verdict::from_conclusion(conclusion));
            }
        }

        let resolved = deferral.is_resolved_at(proven) && proven <= control_time;
        record(&mut builder, DEFERRED_FAILURE_RESOLVED, deferral.object_id(), resolved, || {
            format!(
                "{} not resolved by existence at {} with control time {}",
                deferral.sub_indication(),
                format_time(proven),
                format_time(control_time)
            )
        });
        if !resolved {
            unresolved.push(deferral.clone());
        }
    }

    let mut verdict = Verdict::deferred(unresolved);
    verdict.conclusion.push_info(Info::time(Info::CONTROL_TIME, control_time));
    finish_psv(target, builder, verdict)
}

fn finish_psv(
    target: &ObjectRef,
    builder: StageReportBuilder,
    verdict: Verdict,
) -> PastSignatureValidation {
    log_target(target, "PSV", &verdict.conclusion);
    PastSignatureValidation {
        report: builder.finish(verdict.conclusion.clone()),
        verdict,
    }
}

fn log_target(target: &ObjectRef, stage: &'static str, conclusion: &Conclusion) {
    let indication = conclusion.summary();
    match target.kind {
        ObjectKind::Timestamp => {
            debug!(timestamp_id = %target.id, stage, %indication, "past validation finished")
        }
        _ => debug!(signature_id = %target.id, stage, %indication, "past validation finished"),
    }
}
