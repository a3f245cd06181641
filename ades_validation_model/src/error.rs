// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use thiserror::Error;

/// Integrity failures of a diagnostic-data document.
///
/// These are input errors, not verdicts: they are raised before validation starts.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("diagnostic data decode failed: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("duplicate {kind} id: {id}")]
    DuplicateId { kind: &'static str, id: String },

    #[error("{owner} references unknown {kind} id: {id}")]
    DanglingReference {
        owner: String,
        kind: &'static str,
        id: String,
    },

    #[error("unknown signature id: {0}")]
    UnknownSignature(String),
}
