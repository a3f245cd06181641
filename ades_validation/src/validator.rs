// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::adest::validate_adest;
use crate::basic::validate_basic;
use crate::bbb::run_building_blocks;
use crate::context::{SignedToken, ValidationContext};
use crate::error::AdesValidationError;
use crate::executor::{fan_out, ExecutionMode};
use crate::ltv::validate_long_term;
use crate::timestamp::validate_timestamp;
use ades_validation_model::{
    DiagnosticData, DiagnosticIndex, ModelError, SignatureData, SignatureReport, ValidationReport,
};
use ades_validation_policy::ValidationConstraints;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};

/// Options controlling how a validation run is performed.
///
/// The defaults validate sequentially against the wall clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdesValidationOptions {
    /// Instant the validation is performed at. When `None`, the wall clock is read once at the
    /// start of each call and used for every stage.
    pub current_time: Option<DateTime<Utc>>,
    /// Fan-out for independent signatures and timestamps.
    pub execution: ExecutionMode,
}

/// Long-term validation entrypoint.
///
/// A validator holds an immutable set of constraints and can be shared across threads and
/// reused across requests. Each call builds its own index, contexts and POE sets.
#[derive(Debug, Clone)]
pub struct AdesValidator {
    constraints: Arc<ValidationConstraints>,
    options: AdesValidationOptions,
}

impl AdesValidator {
    pub fn new(constraints: impl Into<Arc<ValidationConstraints>>) -> Self {
        Self {
            constraints: constraints.into(),
            options: AdesValidationOptions::default(),
        }
    }

    /// Configure options starting from the defaults.
    pub fn with_options(mut self, configure: impl FnOnce(&mut AdesValidationOptions)) -> Self {
        configure(&mut self.options);
        self
    }

    pub fn constraints(&self) -> &ValidationConstraints {
        &self.constraints
    }

    pub fn options(&self) -> &AdesValidationOptions {
        &self.options
    }

    /// Validate every signature of `data`.
    ///
    /// Fails only when the constraints or the diagnostic data are unusable; every verdict,
    /// including INVALID and INDETERMINATE ones, is part of the returned report.
    pub fn validate(&self, data: &DiagnosticData) -> Result<ValidationReport, AdesValidationError> {
        self.constraints.validate()?;
        let index = DiagnosticIndex::build(data)?;
        let current_time = self.current_time();
        let ctx = ValidationContext::new(&index, &self.constraints, current_time);

        info!(
            signatures = data.signatures.len(),
            validation_time = %current_time,
            "validation started"
        );

        let (signature_mode, timestamp_mode) =
            split_execution(self.options.execution, data.signatures.len());
        let signatures = fan_out(signature_mode, &data.signatures, |signature| {
            validate_one(&ctx, signature, timestamp_mode)
        });

        Ok(ValidationReport {
            validation_time: current_time,
            policy_name: self.constraints.name.clone(),
            signatures,
        })
    }

    /// Validate a single signature of `data`, identified by id.
    pub fn validate_signature(
        &self,
        data: &DiagnosticData,
        signature_id: &str,
    ) -> Result<SignatureReport, AdesValidationError> {
        self.constraints.validate()?;
        let index = DiagnosticIndex::build(data)?;
        let signature = index
            .signature(signature_id)
            .ok_or_else(|| ModelError::UnknownSignature(signature_id.to_string()))?;
        let ctx = ValidationContext::new(&index, &self.constraints, self.current_time());
        Ok(validate_one(&ctx, signature, self.options.execution))
    }

    fn current_time(&self) -> DateTime<Utc> {
        self.options.current_time.unwrap_or_else(Utc::now)
    }
}

/// Split the configured execution between signatures and their timestamps.
///
/// Several signatures are spread over the workers and their timestamps run inline; a single
/// signature hands the workers to its timestamps instead.
fn split_execution(execution: ExecutionMode, signatures: usize) -> (ExecutionMode, ExecutionMode) {
    if signatures > 1 {
        (execution, ExecutionMode::Sequential)
    } else {
        (ExecutionMode::Sequential, execution)
    }
}

fn validate_one<'a>(
    ctx: &ValidationContext<'a>,
    signature: &'a SignatureData,
    timestamp_mode: ExecutionMode,
) -> SignatureReport {
    debug!(
        signature_id = %signature.id,
        timestamps = signature.timestamps.len(),
        "signature validation started"
    );

    let timestamps = fan_out(timestamp_mode, &signature.timestamps, |timestamp| {
        validate_timestamp(ctx, timestamp)
    });

    let token = SignedToken::signature(ctx.index, signature);
    let building_blocks = run_building_blocks(ctx, &token);
    let basic = validate_basic(signature, &building_blocks, &timestamps);
    let adest = validate_adest(ctx, signature, &basic, &timestamps);
    let long_term = validate_long_term(ctx, signature, &adest, &timestamps);

    info!(
        signature_id = %signature.id,
        indication = %long_term.verdict.conclusion.summary(),
        "signature validated"
    );

    SignatureReport {
        signature_id: signature.id.clone(),
        building_blocks: building_blocks.report(),
        basic_validation: basic.report,
        timestamps: timestamps.iter().map(|t| t.report()).collect(),
        adest_validation: adest.report,
        long_term_validation: long_term.report,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workers_go_to_signatures_when_there_are_several() {
        let parallel = ExecutionMode::parallel(4).unwrap();
        assert_eq!(split_execution(parallel, 3), (parallel, ExecutionMode::Sequential));
        assert_eq!(split_execution(parallel, 1), (ExecutionMode::Sequential, parallel));
        assert_eq!(
            split_execution(ExecutionMode::Sequential, 5),
            (ExecutionMode::Sequential, ExecutionMode::Sequential)
        );
    }
}
