// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Data model for AdES long-term validation.
//!
//! This crate holds everything the validation engine reads and writes but does not
//! compute:
//! - [`diagnostic`]: the typed diagnostic data produced by the parsing collaborators
//! - [`index`]: id-based lookup over that data, checked once up front
//! - [`indication`] and [`conclusion`]: the two-level verdict vocabulary
//! - [`report`]: the structured result tree returned to callers

pub mod conclusion;
pub mod diagnostic;
pub mod error;
pub mod index;
pub mod indication;
pub mod report;

pub use conclusion::{format_time, Conclusion, Info};
pub use diagnostic::{
    BasicSignatureData, CertificateData, DiagnosticData, ObjectKind, ObjectRef, PublicKeyData,
    QualificationData, RevocationData, RevocationReason, RevocationSource, RevocationStatus,
    SignatureAlgorithm, SignatureData, SignaturePolicyData, SignedPropertiesData,
    SigningCertificateData, TimestampCategory, TimestampData, TrustedServiceData,
};
pub use error::ModelError;
pub use index::DiagnosticIndex;
pub use indication::{Indication, SubIndication};
pub use report::{
    BuildingBlocksReport, ConstraintCheck, ConstraintStatus, SignatureReport, Stage,
    StageReport, StageReportBuilder, TimestampReport, ValidationReport,
};
