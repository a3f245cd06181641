// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Cryptographic verification.

use super::stage_builder;
use crate::context::SignedToken;
use ades_validation_model::{Conclusion, Stage, StageReport, SubIndication};

pub const REFERENCE_DATA_FOUND: &str = "ReferenceDataFound";
pub const REFERENCE_DATA_INTACT: &str = "ReferenceDataIntact";
pub const SIGNATURE_INTACT: &str = "SignatureIntact";

pub fn verify_cryptographically(token: &SignedToken<'_>) -> StageReport {
    let mut builder = stage_builder(Stage::CryptographicVerification, token);
    let basic = token.basic_signature;

    let conclusion = if !builder.check(REFERENCE_DATA_FOUND, basic.reference_data_found, || {
        "signed data object not found".to_string()
    }) {
        Conclusion::indeterminate(SubIndication::SignedDataNotFound)
    } else if !builder.check(REFERENCE_DATA_INTACT, basic.reference_data_intact, || {
        "reference digest mismatch".to_string()
    }) {
        Conclusion::invalid(SubIndication::HashFailure)
    } else if !builder.check(SIGNATURE_INTACT, basic.signature_intact, || {
        "signature value does not verify".to_string()
    }) {
        Conclusion::invalid(SubIndication::SigCryptoFailure)
    } else {
        Conclusion::valid()
    };

    builder.finish(conclusion)
}
