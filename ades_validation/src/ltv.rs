// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Long-term validation.
//!
//! Starting from the AdES-T verdict, timestamps are walked from the archive level down to the
//! signature timestamps, newest first. Each usable timestamp lowers the proof-of-existence
//! time of the objects it covers; a timestamp that is itself only INDETERMINATE for lack of
//! POE is first re-evaluated in the past with the proofs gathered so far. A final past
//! signature validation then decides the signature.
//!
//! Only a VALID AdES-T result or one of the `*_NO_POE` indeterminates enters the walk; any
//! other AdES-T result, NO_TIMESTAMP and NO_VALID_TIMESTAMP included, is carried over as is.

use crate::adest::AdesTValidation;
use crate::context::ValidationContext;
use crate::past::validate_past_signature;
use crate::poe::PoeSet;
use crate::timestamp::TimestampValidation;
use crate::verdict::Verdict;
use ades_validation_model::{
    format_time, Conclusion, ConstraintCheck, ConstraintStatus, ObjectRef, SignatureData, Stage,
    StageReport, StageReportBuilder, SubIndication, TimestampCategory, TimestampData,
};
use ades_validation_policy::ConstraintContext;
use tracing::{debug, trace};

pub const TIMESTAMP_USABLE: &str = "TimestampUsable";
pub const MESSAGE_IMPRINT_ALGORITHM_AT_PRODUCTION: &str = "MessageImprintAlgorithmAtProductionTime";
pub const PROOF_OF_EXISTENCE: &str = "ProofOfExistence";

/// Verdicts a proof of existence may still turn around.
const RECOVERABLE: [SubIndication; 4] = [
    SubIndication::RevokedNoPoe,
    SubIndication::RevokedCaNoPoe,
    SubIndication::OutOfBoundsNoPoe,
    SubIndication::CryptoConstraintsFailureNoPoe,
];

/// Processing order of timestamp categories.
const CATEGORY_ORDER: [TimestampCategory; 4] = [
    TimestampCategory::Archive,
    TimestampCategory::ValidationDataRefsOnly,
    TimestampCategory::ValidationData,
    TimestampCategory::Signature,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LongTermValidation {
    pub report: StageReport,
    pub verdict: Verdict,
    /// Proofs of existence gathered for this signature.
    pub poe: PoeSet,
}

pub fn validate_long_term(
    ctx: &ValidationContext<'_>,
    signature: &SignatureData,
    adest: &AdesTValidation,
    timestamps: &[TimestampValidation<'_>],
) -> LongTermValidation {
    let mut builder = StageReport::builder(Stage::LongTermValidation).subject(&signature.id);
    let mut poe = PoeSet::seeded(initial_objects(ctx, signature), ctx.current_time);

    let starting = &adest.verdict;
    if starting.is_valid() || !starting.is_deferred_with(&RECOVERABLE) {
        return finish(signature, builder, starting.clone(), poe);
    }

    for ts in ordered_timestamps(timestamps) {
        if let Some(child) = try_extract(ctx, signature, ts, timestamps, &mut poe, &mut builder) {
            builder.child(child);
        }
    }

    let chain = ctx.index.chain(&signature.certificate_chain);
    let psv = validate_past_signature(
        ctx,
        &ObjectRef::signature(&signature.id),
        ConstraintContext::MainSignature,
        &chain,
        starting,
        &poe,
    );
    builder.child(psv.report);
    finish(signature, builder, psv.verdict, poe)
}

/// Archive first, then refs-only, sig-and-refs and signature timestamps, each newest first
/// with ties broken by id.
fn ordered_timestamps<'t, 'a>(
    timestamps: &'t [TimestampValidation<'a>],
) -> Vec<&'t TimestampValidation<'a>> {
    let mut ordered = Vec::new();
    for category in CATEGORY_ORDER {
        let mut of_category: Vec<_> = timestamps
            .iter()
            .filter(|t| t.timestamp.category == category)
            .collect();
        of_category.sort_by(|a, b| {
            b.timestamp
                .production_time
                .cmp(&a.timestamp.production_time)
                .then_with(|| a.timestamp.id.cmp(&b.timestamp.id))
        });
        ordered.extend(of_category);
    }
    ordered
}

/// Extract the proofs of existence of `ts` when it is usable, re-evaluating it in the past
/// first when it only lacks POE. Returns the report to attach.
fn try_extract(
    ctx: &ValidationContext<'_>,
    signature: &SignatureData,
    ts: &TimestampValidation<'_>,
    all: &[TimestampValidation<'_>],
    poe: &mut PoeSet,
    builder: &mut StageReportBuilder,
) -> Option<StageReport> {
    let timestamp = ts.timestamp;
    let production_time = timestamp.production_time;

    let digest = ctx.constraints.check_digest_algorithm(
        ConstraintContext::Timestamp,
        timestamp.signed_data_digest_algorithm.as_deref(),
        production_time,
    );
    if !digest.is_acceptable() {
        builder.record(
            ConstraintCheck::new(MESSAGE_IMPRINT_ALGORITHM_AT_PRODUCTION, ConstraintStatus::Ko)
                .with_object(&timestamp.id)
                .with_detail(format!("not acceptable at {}", format_time(production_time))),
        );
        return None;
    }

    if !ts.is_valid() {
        if !ts.verdict.is_deferred_with(&RECOVERABLE) {
            builder.record(
                ConstraintCheck::new(TIMESTAMP_USABLE, ConstraintStatus::Ko)
                    .with_object(&timestamp.id)
                    .with_detail(ts.verdict.conclusion.summary()),
            );
            return None;
        }
        let psv = validate_past_signature(
            ctx,
            &ObjectRef::timestamp(&timestamp.id),
            ConstraintContext::Timestamp,
            &ts.token.chain,
            &ts.verdict,
            poe,
        );
        let usable = psv.verdict.is_valid();
        builder.child(psv.report);
        if !usable {
            builder.record(
                ConstraintCheck::new(TIMESTAMP_USABLE, ConstraintStatus::Ko)
                    .with_object(&timestamp.id)
                    .with_detail(psv.verdict.conclusion.summary()),
            );
            return None;
        }
    }
    builder.record(
        ConstraintCheck::new(TIMESTAMP_USABLE, ConstraintStatus::Ok).with_object(&timestamp.id),
    );

    let mut extraction = StageReport::builder(Stage::PoeExtraction).subject(&timestamp.id);
    for object in covered_objects(ctx, signature, timestamp, all) {
        let lowered = poe.prove(object.clone(), production_time);
        trace!(timestamp_id = %timestamp.id, object = %object.id, lowered, "proof of existence");
        let status = if lowered {
            ConstraintStatus::Ok
        } else {
            ConstraintStatus::Informational
        };
        extraction.record(
            ConstraintCheck::new(PROOF_OF_EXISTENCE, status)
                .with_object(&object.id)
                .with_detail(format_time(poe.get_or(&object, production_time))),
        );
    }
    Some(extraction.finish(Conclusion::valid()))
}

/// Objects `timestamp` proves the existence of: its declared coverage, or the coverage its
/// category implies.
fn covered_objects(
    ctx: &ValidationContext<'_>,
    signature: &SignatureData,
    timestamp: &TimestampData,
    all: &[TimestampValidation<'_>],
) -> Vec<ObjectRef> {
    if !timestamp.covered_objects.is_empty() {
        return timestamp.covered_objects.clone();
    }

    let signature_ref = ObjectRef::signature(&signature.id);
    match timestamp.category {
        TimestampCategory::Content => Vec::new(),
        TimestampCategory::Signature => vec![signature_ref],
        TimestampCategory::ValidationDataRefsOnly => {
            chain_objects(ctx, &signature.certificate_chain)
        }
        TimestampCategory::ValidationData => {
            let mut objects = vec![signature_ref];
            objects.extend(
                signature
                    .timestamps_of(TimestampCategory::Signature)
                    .map(|t| ObjectRef::timestamp(&t.id)),
            );
            objects.extend(chain_objects(ctx, &signature.certificate_chain));
            objects
        }
        TimestampCategory::Archive => {
            let mut objects = vec![signature_ref];
            objects.extend(chain_objects(ctx, &signature.certificate_chain));
            for other in all.iter().map(|t| t.timestamp) {
                if other.id == timestamp.id {
                    continue;
                }
                objects.extend(chain_objects(ctx, &other.certificate_chain));
                if other.production_time <= timestamp.production_time {
                    objects.push(ObjectRef::timestamp(&other.id));
                }
            }
            objects
        }
    }
}

/// Certificates of a chain plus the revocation data attached to them.
fn chain_objects(ctx: &ValidationContext<'_>, chain: &[String]) -> Vec<ObjectRef> {
    let mut objects = Vec::new();
    for cert in ctx.index.chain(chain) {
        objects.push(ObjectRef::certificate(&cert.id));
        if let Some(revocation) = &cert.revocation {
            objects.push(ObjectRef::revocation(&revocation.id));
        }
    }
    objects
}

fn initial_objects(ctx: &ValidationContext<'_>, signature: &SignatureData) -> Vec<ObjectRef> {
    let mut objects = vec![ObjectRef::signature(&signature.id)];
    objects.extend(chain_objects(ctx, &signature.certificate_chain));
    for timestamp in &signature.timestamps {
        objects.push(ObjectRef::timestamp(&timestamp.id));
        objects.extend(chain_objects(ctx, &timestamp.certificate_chain));
    }
    objects
}

fn finish(
    signature: &SignatureData,
    builder: StageReportBuilder,
    verdict: Verdict,
    poe: PoeSet,
) -> LongTermValidation {
    debug!(
        signature_id = %signature.id,
        indication = %verdict.conclusion.summary(),
        poe_entries = poe.len(),
        "long-term validation finished"
    );
    LongTermValidation {
        report: builder.finish(verdict.conclusion.clone()),
        verdict,
        poe,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_order_puts_archive_first() {
        assert_eq!(CATEGORY_ORDER[0], TimestampCategory::Archive);
        assert_eq!(CATEGORY_ORDER[3], TimestampCategory::Signature);
        assert!(RECOVERABLE.iter().all(|s| s.is_recoverable_with_poe()));
    }
}
