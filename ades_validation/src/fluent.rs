// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Fluent-first API surface.
//!
//! Re-exports what a caller needs to:
//! - author constraints (`ValidationConstraints::builder()`, `ConstraintLevel`)
//! - run validation (`AdesValidator`)
//! - inspect the result tree (`ValidationReport` and its nodes)

use std::sync::Arc;

pub use crate::error::AdesValidationError;
pub use crate::executor::ExecutionMode;
pub use crate::validator::{AdesValidationOptions, AdesValidator};

pub use ades_validation_model::{
    Conclusion, DiagnosticData, Indication, Info, ObjectRef, SignatureReport, Stage, StageReport,
    SubIndication, TimestampReport, ValidationReport,
};
pub use ades_validation_policy::{
    ConstraintContext, ConstraintLevel, PolicyError, ValidationConstraints,
    ValidationConstraintsBuilder,
};

/// Build an [`AdesValidator`] from the default constraints adjusted by a builder closure.
pub fn build_validator_with_constraints(
    constraints: impl FnOnce(ValidationConstraintsBuilder) -> ValidationConstraintsBuilder,
) -> Result<AdesValidator, PolicyError> {
    let constraints = constraints(ValidationConstraints::builder()).build()?;
    Ok(AdesValidator::new(Arc::new(constraints)))
}
