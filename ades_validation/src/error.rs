// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use ades_validation_model::ModelError;
use ades_validation_policy::PolicyError;
use thiserror::Error;

/// Top-level validation errors (as opposed to verdicts).
///
/// Verdicts, including INVALID and INDETERMINATE ones, are carried by the
/// [`ValidationReport`](ades_validation_model::ValidationReport). An error means the run could
/// not start.
#[derive(Debug, Error)]
pub enum AdesValidationError {
    #[error("invalid diagnostic data: {0}")]
    Model(#[from] ModelError),

    #[error("invalid validation constraints: {0}")]
    Policy(#[from] PolicyError),
}
