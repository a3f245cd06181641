// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Validation context initialisation: selects and checks the signature policy.

use super::stage_builder;
use crate::context::{SignedToken, ValidationContext};
use ades_validation_model::{
    Conclusion, ConstraintCheck, ConstraintStatus, Info, Stage, StageReport, SubIndication,
};

pub const POLICY_IDENTIFIED: &str = "PolicyIdentified";
pub const ACCEPTABLE_POLICY: &str = "AcceptablePolicy";
pub const POLICY_DIGEST_MATCH: &str = "PolicyDigestMatch";

/// Label of the policy applied when neither the signature nor the constraints name one.
pub const IMPLICIT_POLICY: &str = "implicit";

pub fn initialise_validation_context(
    ctx: &ValidationContext<'_>,
    token: &SignedToken<'_>,
) -> StageReport {
    let mut builder = stage_builder(Stage::ValidationContextInitialisation, token);
    let accepted = &ctx.constraints.accepted_policies;

    let policy_id = token
        .policy
        .map(|p| p.id.as_str())
        .or(accepted.default_policy.as_deref());
    let label = policy_id.unwrap_or(IMPLICIT_POLICY);
    builder.record(
        ConstraintCheck::new(POLICY_IDENTIFIED, ConstraintStatus::Informational).with_detail(label),
    );

    if !builder.check(ACCEPTABLE_POLICY, accepted.accepts(policy_id), || {
        format!("policy {label} is not accepted")
    }) {
        let conclusion = Conclusion::indeterminate(SubIndication::NoPolicy)
            .with_info(Info::value(Info::DETAIL, label));
        return builder.finish(conclusion);
    }

    if let Some(digest_match) = token.policy.and_then(|p| p.digest_match) {
        if !builder.check(POLICY_DIGEST_MATCH, digest_match, || {
            format!("digest of policy {label} does not match")
        }) {
            return builder.finish(Conclusion::invalid(SubIndication::PolicyProcessingError));
        }
    }

    builder.finish(Conclusion::valid())
}
