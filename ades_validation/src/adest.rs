// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! AdES-T validation.
//!
//! Signature timestamps establish the best-signature-time, which is then used to resolve the
//! deferred failures of basic validation.

use crate::basic::{latest_valid_content_timestamp, BasicValidation};
use crate::context::ValidationContext;
use crate::timestamp::TimestampValidation;
use crate::verdict::{Deferral, Verdict};
use ades_validation_model::{
    Conclusion, ConstraintCheck, ConstraintStatus, Info, SignatureData, Stage, StageReport,
    StageReportBuilder, SubIndication, TimestampCategory,
};
use chrono::{DateTime, Utc};
use tracing::debug;

pub const MESSAGE_IMPRINT_VERIFIED: &str = "MessageImprintVerified";
pub const SIGNATURE_TIMESTAMP_ADOPTED: &str = "SignatureTimestampAdopted";
pub const TIMESTAMP_ORDER: &str = "TimestampOrder";
pub const TIMESTAMP_DELAY: &str = "TimestampDelay";
pub const DEFERRED_FAILURE_RESOLVED: &str = "DeferredFailureResolved";

/// Basic-validation results AdES-T can still work with.
const CONTINUABLE: [SubIndication; 3] = [
    SubIndication::CryptoConstraintsFailureNoPoe,
    SubIndication::OutOfBoundsNoPoe,
    SubIndication::RevokedNoPoe,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdesTValidation {
    pub report: StageReport,
    pub verdict: Verdict,
    pub best_signature_time: DateTime<Utc>,
}

pub fn validate_adest(
    ctx: &ValidationContext<'_>,
    signature: &SignatureData,
    basic: &BasicValidation,
    timestamps: &[TimestampValidation<'_>],
) -> AdesTValidation {
    let mut builder = StageReport::builder(Stage::AdesTValidation).subject(&signature.id);
    let mut best = ctx.current_time;

    let basic_verdict = &basic.verdict;
    if !basic_verdict.is_valid() && !basic_verdict.is_deferred_with(&CONTINUABLE) {
        return finish(signature, builder, basic_verdict.clone(), best);
    }

    let mut signature_timestamps: Vec<&TimestampValidation<'_>> = timestamps
        .iter()
        .filter(|t| t.timestamp.category == TimestampCategory::Signature)
        .collect();
    signature_timestamps.sort_by(|a, b| {
        a.timestamp
            .production_time
            .cmp(&b.timestamp.production_time)
            .then_with(|| a.timestamp.id.cmp(&b.timestamp.id))
    });

    let mut adopted = false;
    for ts in &signature_timestamps {
        let id = ts.timestamp.id.as_str();
        if !ts.message_imprint_verified() {
            builder.record(
                ConstraintCheck::new(MESSAGE_IMPRINT_VERIFIED, ConstraintStatus::Ko)
                    .with_object(id)
                    .with_detail("message imprint does not match the signature value"),
            );
            continue;
        }
        builder.record(
            ConstraintCheck::new(MESSAGE_IMPRINT_VERIFIED, ConstraintStatus::Ok).with_object(id),
        );

        let production_time = ts.timestamp.production_time;
        if ts.is_valid() && production_time < best {
            best = production_time;
            adopted = true;
            builder.record(
                ConstraintCheck::new(SIGNATURE_TIMESTAMP_ADOPTED, ConstraintStatus::Ok)
                    .with_object(id),
            );
        } else {
            builder.record(
                ConstraintCheck::new(SIGNATURE_TIMESTAMP_ADOPTED, ConstraintStatus::Informational)
                    .with_object(id)
                    .with_detail(ts.verdict.conclusion.summary()),
            );
        }
    }

    if !adopted {
        let sub = if signature_timestamps.is_empty() {
            SubIndication::NoTimestamp
        } else {
            SubIndication::NoValidTimestamp
        };
        let verdict = Verdict::from_conclusion(Conclusion::indeterminate(sub));
        return finish(signature, builder, verdict, best);
    }

    if let Some(content) = latest_valid_content_timestamp(timestamps) {
        let content_time = content.timestamp.production_time;
        if !builder.check(TIMESTAMP_ORDER, content_time <= best, || {
            format!("content timestamp {} at {content_time} is after {best}", content.timestamp.id)
        }) {
            let conclusion = Conclusion::invalid(SubIndication::TimestampOrderFailure)
                .with_info(Info::value(Info::TIMESTAMP_ID, &content.timestamp.id));
            return finish(signature, builder, Verdict::from_conclusion(conclusion), best);
        }
    }

    if let Some(delay) = ctx.constraints.timestamp_delay {
        let signing_time = signature.signed_properties.signing_time;
        // A delay past the representable range bounds nothing.
        let in_time = signing_time.map_or(false, |claimed| {
            claimed.checked_add_signed(delay).map_or(true, |limit| limit >= best)
        });
        if !builder.check(TIMESTAMP_DELAY, in_time, || match signing_time {
            Some(claimed) => format!(
                "signing time {claimed} plus {}s is before {best}",
                delay.num_seconds()
            ),
            None => "no signing time to compare".to_string(),
        }) {
            let conclusion = Conclusion::invalid(SubIndication::SigConstraintsFailure);
            return finish(signature, builder, Verdict::from_conclusion(conclusion), best);
        }
    }

    let mut unresolved = Vec::new();
    for deferral in &basic_verdict.pending {
        if let Deferral::OutOfBounds {
            certificate_id,
            not_before,
            ..
        } = deferral
        {
            if best < *not_before {
                record_resolution(&mut builder, deferral, false);
                let conclusion = Conclusion::invalid(SubIndication::NotYetValid)
                    .with_info(Info::value(Info::CERTIFICATE_ID, certificate_id))
                    .with_info(Info::time(Info::NOT_BEFORE, *not_before));
                return finish(signature, builder, Verdict::from_conclusion(conclusion), best);
            }
            record_resolution(&mut builder, deferral, false);
            unresolved.push(deferral.clone());
            continue;
        }

        let resolved = resolvable_here(signature, deferral) && deferral.is_resolved_at(best);
        record_resolution(&mut builder, deferral, resolved);
        if !resolved {
            unresolved.push(deferral.clone());
        }
    }

    finish(signature, builder, Verdict::deferred(unresolved), best)
}

/// Whether the signature timestamp alone can settle `deferral`. A revoked CA and algorithms
/// of the chain or its revocation data are left for long-term validation.
fn resolvable_here(signature: &SignatureData, deferral: &Deferral) -> bool {
    match deferral {
        Deferral::Revoked { .. } | Deferral::OutOfBounds { .. } => true,
        Deferral::RevokedCa { .. } => false,
        Deferral::Crypto { object_id, .. } => *object_id == signature.id,
    }
}

fn record_resolution(builder: &mut StageReportBuilder, deferral: &Deferral, resolved: bool) {
    let status = if resolved {
        ConstraintStatus::Ok
    } else {
        ConstraintStatus::Ko
    };
    builder.record(
        ConstraintCheck::new(DEFERRED_FAILURE_RESOLVED, status)
            .with_object(deferral.object_id())
            .with_detail(deferral.sub_indication().as_str()),
    );
}

fn finish(
    signature: &SignatureData,
    builder: StageReportBuilder,
    mut verdict: Verdict,
    best: DateTime<Utc>,
) -> AdesTValidation {
    verdict.conclusion.push_info(Info::time(Info::BEST_SIGNATURE_TIME, best));
    debug!(
        signature_id = %signature.id,
        indication = %verdict.conclusion.summary(),
        best_signature_time = %best,
        "AdES-T validation finished"
    );
    AdesTValidation {
        report: builder.finish(verdict.conclusion.clone()),
        verdict,
        best_signature_time: best,
    }
}
