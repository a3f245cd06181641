// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::path::PathBuf;
use thiserror::Error;

use crate::constraints::ConstraintContext;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("constraint document decode failed: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("failed to read constraint document {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid duration for {name}: {seconds}s")]
    InvalidDuration { name: &'static str, seconds: i64 },

    #[error("{context} sets a minimum key size for {algorithm}, which it does not accept")]
    ConflictingAlgorithmTable {
        context: ConstraintContext,
        algorithm: String,
    },
}
