// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Basic validation: the short-term verdict of one signature.
//!
//! The building-block conclusions are folded by precedence. When the result is a deferred
//! `*_NO_POE` failure and a valid content timestamp exists, the content timestamp proves the
//! signature was produced after its own production time. That can turn the deferral into a
//! final verdict.

use crate::bbb::BuildingBlocks;
use crate::timestamp::TimestampValidation;
use crate::verdict::{Deferral, Verdict};
use ades_validation_model::{
    Conclusion, Info, SignatureData, Stage, StageReport, SubIndication, TimestampCategory,
};
use chrono::{DateTime, Utc};
use tracing::debug;

pub const CONTENT_TIMESTAMP_PROMOTION: &str = "ContentTimestampPromotion";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicValidation {
    pub report: StageReport,
    pub verdict: Verdict,
}

pub fn validate_basic(
    signature: &SignatureData,
    building_blocks: &BuildingBlocks<'_>,
    timestamps: &[TimestampValidation<'_>],
) -> BasicValidation {
    let mut builder = StageReport::builder(Stage::BasicValidation).subject(&signature.id);

    let blocks = [
        Some(&building_blocks.isc),
        building_blocks.vci.as_ref(),
        Some(&building_blocks.cv),
        building_blocks.sav.as_ref().map(|o| &o.report),
        building_blocks.xcv.as_ref().map(|o| &o.report),
    ];
    for report in blocks.into_iter().flatten() {
        builder.check(report.stage.short_name(), report.conclusion.is_valid(), || {
            report.conclusion.summary()
        });
    }

    let mut verdict = building_blocks.fold();

    if !verdict.pending.is_empty() {
        if let Some(content) = latest_valid_content_timestamp(timestamps) {
            let at = content.timestamp.production_time;
            match verdict.pending.iter().find_map(|d| promote(d, at)) {
                Some(conclusion) => {
                    builder.ko(
                        CONTENT_TIMESTAMP_PROMOTION,
                        format!("content timestamp {} produced at {at}", content.timestamp.id),
                    );
                    let timestamp_id = Info::value(Info::TIMESTAMP_ID, &content.timestamp.id);
                    verdict = Verdict::from_conclusion(conclusion.with_info(timestamp_id));
                }
                None => builder.ok(CONTENT_TIMESTAMP_PROMOTION),
            }
        }
    }

    debug!(
        signature_id = %signature.id,
        indication = %verdict.conclusion.summary(),
        "basic validation finished"
    );

    BasicValidation {
        report: builder.finish(verdict.conclusion.clone()),
        verdict,
    }
}

/// The most recent content timestamp that validated. Ties are broken by id.
pub(crate) fn latest_valid_content_timestamp<'t, 'a>(
    timestamps: &'t [TimestampValidation<'a>],
) -> Option<&'t TimestampValidation<'a>> {
    timestamps
        .iter()
        .filter(|t| t.timestamp.category == TimestampCategory::Content && t.is_valid())
        .max_by(|a, b| {
            a.timestamp
                .production_time
                .cmp(&b.timestamp.production_time)
                .then_with(|| a.timestamp.id.cmp(&b.timestamp.id))
        })
}

/// Final verdict for `deferral` given that the signature was produced after `produced_after`.
fn promote(deferral: &Deferral, produced_after: DateTime<Utc>) -> Option<Conclusion> {
    match deferral {
        Deferral::Crypto {
            algorithm,
            expiration: Some(expiration),
            ..
        } if produced_after >= *expiration => {
            let mut conclusion = Conclusion::invalid(SubIndication::CryptoConstraintsFailure)
                .with_info(Info::time(Info::ALGORITHM_EXPIRATION_DATE, *expiration));
            if let Some(algorithm) = algorithm {
                conclusion.push_info(Info::value(Info::ALGORITHM, algorithm));
            }
            Some(conclusion)
        }
        Deferral::Revoked {
            certificate_id,
            revocation_time,
            reason,
        } if produced_after >= *revocation_time => {
            let mut conclusion = Conclusion::invalid(SubIndication::Revoked)
                .with_info(Info::value(Info::CERTIFICATE_ID, certificate_id))
                .with_info(Info::time(Info::REVOCATION_TIME, *revocation_time));
            if let Some(reason) = reason {
                conclusion.push_info(Info::value(Info::REVOCATION_REASON, reason.as_str()));
            }
            Some(conclusion)
        }
        Deferral::OutOfBounds {
            certificate_id,
            not_after,
            ..
        } if produced_after > *not_after => Some(
            Conclusion::indeterminate(SubIndication::Expired)
                .with_info(Info::value(Info::CERTIFICATE_ID, certificate_id))
                .with_info(Info::time(Info::NOT_AFTER, *not_after)),
        ),
        _ => None,
    }
}
