// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Signature acceptance validation.
//!
//! Checks the mandated signed properties, then the algorithms of the signature value. For a
//! timestamp the digest algorithm of the message imprint is checked as well.

use super::{record_level, stage_builder, BlockOutcome};
use crate::context::{SignedToken, ValidationContext};
use crate::verdict::Deferral;
use ades_validation_model::{CertificateData, Conclusion, Stage, StageReportBuilder, SubIndication};
use ades_validation_policy::{AlgorithmUse, ConstraintContext, CryptoCheck};

pub const SIGNING_TIME_PRESENT: &str = "SigningTimePresent";
pub const COMMITMENT_TYPE_PRESENT: &str = "CommitmentTypePresent";
pub const COMMITMENT_TYPE_ACCEPTED: &str = "CommitmentTypeAccepted";
pub const SIGNER_LOCATION_PRESENT: &str = "SignerLocationPresent";
pub const CLAIMED_ROLE_PRESENT: &str = "ClaimedRolePresent";
pub const CLAIMED_ROLE_ACCEPTED: &str = "ClaimedRoleAccepted";
pub const SIGNATURE_ALGORITHM_ACCEPTABLE: &str = "SignatureAlgorithmAcceptable";
pub const MESSAGE_IMPRINT_ALGORITHM_ACCEPTABLE: &str = "MessageImprintAlgorithmAcceptable";

pub fn validate_signature_acceptance(
    ctx: &ValidationContext<'_>,
    token: &SignedToken<'_>,
    signing_certificate: Option<&CertificateData>,
) -> BlockOutcome {
    let mut builder = stage_builder(Stage::SignatureAcceptanceValidation, token);

    if !check_signed_properties(ctx, token, &mut builder) {
        let conclusion = Conclusion::invalid(SubIndication::SigConstraintsFailure);
        return BlockOutcome::concluded(builder, conclusion);
    }

    let algorithm = &token.basic_signature.algorithm;
    let key_length = algorithm
        .key_length
        .or_else(|| signing_certificate.and_then(|c| c.public_key.length));
    let usage = AlgorithmUse::new(
        algorithm.digest_algorithm.as_deref(),
        algorithm.encryption_algorithm.as_deref(),
        key_length,
    );
    let context = token.constraint_context();
    let check = ctx
        .constraints
        .check_cryptographic_constraint(context, usage, ctx.current_time);
    let name = SIGNATURE_ALGORITHM_ACCEPTABLE;
    if let Some(deferral) = crypto_failure(&mut builder, name, token.id, context, check) {
        return BlockOutcome::deferred(builder, deferral);
    }

    if token.is_timestamp() {
        let check = ctx.constraints.check_digest_algorithm(
            ConstraintContext::Timestamp,
            token.signed_data_digest_algorithm,
            ctx.current_time,
        );
        if let Some(deferral) = crypto_failure(
            &mut builder,
            MESSAGE_IMPRINT_ALGORITHM_ACCEPTABLE,
            token.id,
            ConstraintContext::Timestamp,
            check,
        ) {
            return BlockOutcome::deferred(builder, deferral);
        }
    }

    BlockOutcome::concluded(builder, Conclusion::valid())
}

/// Returns false on the first blocking failure.
fn check_signed_properties(
    ctx: &ValidationContext<'_>,
    token: &SignedToken<'_>,
    builder: &mut StageReportBuilder,
) -> bool {
    let Some(props) = token.signed_properties else {
        return true;
    };
    let required = &ctx.constraints.signed_properties;

    let has_signing_time = props.signing_time.is_some();
    if !record_level(builder, SIGNING_TIME_PRESENT, required.signing_time, has_signing_time, || {
        "signing time is missing".to_string()
    }) {
        return false;
    }

    let commitments = &props.commitment_type_indications;
    let level = required.commitment_type;
    if !record_level(builder, COMMITMENT_TYPE_PRESENT, level, !commitments.is_empty(), || {
        "commitment type indication is missing".to_string()
    }) {
        return false;
    }
    if !required.accepted_commitment_types.is_empty()
        && !commitments.is_empty()
        && !record_level(
            builder,
            COMMITMENT_TYPE_ACCEPTED,
            required.commitment_type,
            commitments.iter().any(|t| required.accepted_commitment_types.contains(t)),
            || format!("commitment types {commitments:?} are not accepted"),
        )
    {
        return false;
    }

    let has_location = props.signer_location.is_some();
    if !record_level(builder, SIGNER_LOCATION_PRESENT, required.signer_location, has_location, || {
        "signer location is missing".to_string()
    }) {
        return false;
    }

    let roles = &props.claimed_roles;
    if !record_level(builder, CLAIMED_ROLE_PRESENT, required.claimed_role, !roles.is_empty(), || {
        "claimed role is missing".to_string()
    }) {
        return false;
    }
    required.accepted_roles.is_empty()
        || roles.is_empty()
        || record_level(
            builder,
            CLAIMED_ROLE_ACCEPTED,
            required.claimed_role,
            roles.iter().any(|r| required.accepted_roles.contains(r)),
            || format!("claimed roles {roles:?} are not accepted"),
        )
}

/// Record `check` under `name`; returns the deferral when it failed.
pub(crate) fn crypto_failure(
    builder: &mut StageReportBuilder,
    name: &str,
    object_id: &str,
    context: ConstraintContext,
    check: CryptoCheck,
) -> Option<Deferral> {
    match check {
        CryptoCheck::Acceptable => {
            builder.ok(name);
            None
        }
        CryptoCheck::Rejected { reason } => {
            builder.ko(name, format!("{context}: {reason}"));
            Some(Deferral::Crypto {
                object_id: object_id.to_string(),
                context,
                algorithm: None,
                expiration: None,
            })
        }
        CryptoCheck::Expired { algorithm, expiration } => {
            builder.ko(name, format!("{context}: {algorithm} expired at {expiration}"));
            Some(Deferral::Crypto {
                object_id: object_id.to_string(),
                context,
                algorithm: Some(algorithm),
                expiration: Some(expiration),
            })
        }
    }
}
