// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Structured result tree.
//!
//! The tree mirrors the stage hierarchy: building blocks, basic validation, timestamp
//! validation, AdES-T and long-term validation. Every node carries the individual
//! constraint checks it ran plus its terminal [`Conclusion`].
//!
//! All collections are ordered so that serialising the same tree twice yields identical
//! bytes.

use crate::conclusion::{format_time, Conclusion};
use crate::diagnostic::TimestampCategory;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    IdentificationOfSignerCertificate,
    ValidationContextInitialisation,
    CryptographicVerification,
    SignatureAcceptanceValidation,
    X509CertificateValidation,
    BasicValidation,
    TimestampValidation,
    AdesTValidation,
    PastCertificateValidation,
    PastSignatureValidation,
    PoeExtraction,
    LongTermValidation,
}

impl Stage {
    pub fn short_name(&self) -> &'static str {
        match self {
            Stage::IdentificationOfSignerCertificate => "ISC",
            Stage::ValidationContextInitialisation => "VCI",
            Stage::CryptographicVerification => "CV",
            Stage::SignatureAcceptanceValidation => "SAV",
            Stage::X509CertificateValidation => "XCV",
            Stage::BasicValidation => "BV",
            Stage::TimestampValidation => "TSV",
            Stage::AdesTValidation => "ADEST",
            Stage::PastCertificateValidation => "PCV",
            Stage::PastSignatureValidation => "PSV",
            Stage::PoeExtraction => "POE",
            Stage::LongTermValidation => "LTV",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConstraintStatus {
    Ok,
    Ko,
    Warning,
    Informational,
}

/// One constraint evaluated by a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstraintCheck {
    pub name: String,
    pub status: ConstraintStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ConstraintCheck {
    pub fn new(name: impl Into<String>, status: ConstraintStatus) -> Self {
        Self {
            name: name.into(),
            status,
            object_id: None,
            detail: None,
        }
    }

    pub fn with_object(mut self, id: impl Into<String>) -> Self {
        self.object_id = Some(id.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub stage: Stage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<ConstraintCheck>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<StageReport>,
    pub conclusion: Conclusion,
}

impl StageReport {
    pub fn builder(stage: Stage) -> StageReportBuilder {
        StageReportBuilder {
            stage,
            subject_id: None,
            constraints: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Constraint checks that did not pass.
    pub fn failed_constraints(&self) -> impl Iterator<Item = &ConstraintCheck> {
        self.constraints
            .iter()
            .filter(|c| c.status == ConstraintStatus::Ko)
    }

    pub fn constraint(&self, name: &str) -> Option<&ConstraintCheck> {
        self.constraints.iter().find(|c| c.name == name)
    }
}

/// Collects constraint checks while a stage runs, then seals them with a conclusion.
#[derive(Debug, Clone)]
pub struct StageReportBuilder {
    stage: Stage,
    subject_id: Option<String>,
    constraints: Vec<ConstraintCheck>,
    children: Vec<StageReport>,
}

impl StageReportBuilder {
    pub fn subject(mut self, id: impl Into<String>) -> Self {
        self.subject_id = Some(id.into());
        self
    }

    pub fn record(&mut self, check: ConstraintCheck) {
        self.constraints.push(check);
    }

    pub fn ok(&mut self, name: &str) {
        self.record(ConstraintCheck::new(name, ConstraintStatus::Ok));
    }

    pub fn ko(&mut self, name: &str, detail: impl Into<String>) {
        self.record(ConstraintCheck::new(name, ConstraintStatus::Ko).with_detail(detail));
    }

    /// Record `name` as passed or failed and return `passed`.
    pub fn check(&mut self, name: &str, passed: bool, detail: impl FnOnce() -> String) -> bool {
        if passed {
            self.ok(name);
        } else {
            self.ko(name, detail());
        }
        passed
    }

    pub fn child(&mut self, report: StageReport) {
        self.children.push(report);
    }

    pub fn finish(self, conclusion: Conclusion) -> StageReport {
        StageReport {
            stage: self.stage,
            subject_id: self.subject_id,
            constraints: self.constraints,
            children: self.children,
            conclusion,
        }
    }
}

/// The five building blocks run for one signature (or, without VCI, one timestamp).
///
/// `None` marks a building block that was not executed because an earlier one failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildingBlocksReport {
    pub isc: StageReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vci: Option<StageReport>,
    pub cv: StageReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sav: Option<StageReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xcv: Option<StageReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimestampReport {
    pub timestamp_id: String,
    pub category: TimestampCategory,
    #[serde(serialize_with = "serialize_time")]
    pub production_time: DateTime<Utc>,
    pub building_blocks: BuildingBlocksReport,
    pub conclusion: Conclusion,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignatureReport {
    pub signature_id: String,
    pub building_blocks: BuildingBlocksReport,
    pub basic_validation: StageReport,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub timestamps: Vec<TimestampReport>,
    pub adest_validation: StageReport,
    pub long_term_validation: StageReport,
}

impl SignatureReport {
    /// Verdict of the top-level long-term validation.
    pub fn conclusion(&self) -> &Conclusion {
        &self.long_term_validation.conclusion
    }

    pub fn timestamp(&self, id: &str) -> Option<&TimestampReport> {
        self.timestamps.iter().find(|t| t.timestamp_id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    #[serde(serialize_with = "serialize_time")]
    pub validation_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_name: Option<String>,
    pub signatures: Vec<SignatureReport>,
}

impl ValidationReport {
    pub fn signature(&self, id: &str) -> Option<&SignatureReport> {
        self.signatures.iter().find(|s| s.signature_id == id)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// SHA-256 (hex) of the canonical JSON rendering.
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        let bytes = serde_json::to_vec(self)?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }
}

fn serialize_time<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_time(*at))
}
