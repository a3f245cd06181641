// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Basic building blocks.
//!
//! ISC, VCI, CV, SAV and XCV run in that order for a signature; a timestamp runs the same
//! blocks without VCI. A failing ISC, VCI or CV skips SAV and XCV. A SAV failure that an
//! earlier proof of existence may resolve still lets XCV run, any other SAV failure skips it.

pub mod cv;
pub mod isc;
pub mod sav;
pub mod vci;
pub mod xcv;

use crate::context::{SignedToken, TokenKind, ValidationContext};
use crate::verdict::{Deferral, Verdict};
use ades_validation_model::{
    BuildingBlocksReport, CertificateData, Conclusion, ConstraintCheck, ConstraintStatus,
    Indication, Stage, StageReport, StageReportBuilder,
};
use ades_validation_policy::ConstraintLevel;
use tracing::{debug, trace};

/// Report of SAV or XCV, plus the deferred failure behind an INDETERMINATE `*_NO_POE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockOutcome {
    pub report: StageReport,
    pub deferral: Option<Deferral>,
}

impl BlockOutcome {
    pub(crate) fn concluded(builder: StageReportBuilder, conclusion: Conclusion) -> Self {
        Self {
            report: builder.finish(conclusion),
            deferral: None,
        }
    }

    pub(crate) fn deferred(builder: StageReportBuilder, deferral: Deferral) -> Self {
        Self {
            report: builder.finish(deferral.conclusion()),
            deferral: Some(deferral),
        }
    }

    pub fn conclusion(&self) -> &Conclusion {
        &self.report.conclusion
    }
}

#[derive(Debug, Clone)]
pub struct BuildingBlocks<'a> {
    pub isc: StageReport,
    pub vci: Option<StageReport>,
    pub cv: StageReport,
    pub sav: Option<BlockOutcome>,
    pub xcv: Option<BlockOutcome>,
    /// Certificate identified by ISC.
    pub signing_certificate: Option<&'a CertificateData>,
}

pub fn run_building_blocks<'a>(
    ctx: &ValidationContext<'a>,
    token: &SignedToken<'a>,
) -> BuildingBlocks<'a> {
    let (isc, signing_certificate) = isc::identify_signer_certificate(ctx, token);
    log_stage(token, &isc);

    let vci = match token.kind {
        TokenKind::Signature => {
            let report = vci::initialise_validation_context(ctx, token);
            log_stage(token, &report);
            Some(report)
        }
        TokenKind::Timestamp(_) => None,
    };

    let cv = cv::verify_cryptographically(token);
    log_stage(token, &cv);

    let prior_valid = isc.conclusion.is_valid()
        && vci.as_ref().map_or(true, |r| r.conclusion.is_valid())
        && cv.conclusion.is_valid();

    let sav =
        prior_valid.then(|| sav::validate_signature_acceptance(ctx, token, signing_certificate));
    if let Some(sav) = &sav {
        log_stage(token, &sav.report);
    }

    let xcv = match &sav {
        Some(sav) if sav.conclusion().is_valid() || sav.deferral.is_some() => {
            let outcome = xcv::validate_certificate_chain(ctx, token, signing_certificate);
            log_stage(token, &outcome.report);
            Some(outcome)
        }
        _ => None,
    };

    BuildingBlocks {
        isc,
        vci,
        cv,
        sav,
        xcv,
        signing_certificate,
    }
}

impl<'a> BuildingBlocks<'a> {
    pub fn report(&self) -> BuildingBlocksReport {
        BuildingBlocksReport {
            isc: self.isc.clone(),
            vci: self.vci.clone(),
            cv: self.cv.clone(),
            sav: self.sav.as_ref().map(|o| o.report.clone()),
            xcv: self.xcv.as_ref().map(|o| o.report.clone()),
        }
    }

    /// Fold the block conclusions into one verdict.
    ///
    /// An INVALID CV wins over everything. Otherwise ISC, VCI and CV must be VALID. A hard SAV
    /// or XCV failure is returned as is; deferrable SAV and XCV failures are collected, SAV
    /// first.
    pub fn fold(&self) -> Verdict {
        if self.cv.conclusion.indication() == Indication::Invalid {
            return Verdict::from_conclusion(self.cv.conclusion.clone());
        }
        let firsts = std::iter::once(&self.isc)
            .chain(self.vci.as_ref())
            .chain(std::iter::once(&self.cv));
        for report in firsts {
            if !report.conclusion.is_valid() {
                return Verdict::from_conclusion(report.conclusion.clone());
            }
        }

        let mut pending = Vec::new();
        for outcome in [&self.sav, &self.xcv].into_iter().flatten() {
            if outcome.conclusion().is_valid() {
                continue;
            }
            match &outcome.deferral {
                Some(deferral) => pending.push(deferral.clone()),
                None => return Verdict::from_conclusion(outcome.conclusion().clone()),
            }
        }
        Verdict::deferred(pending)
    }
}

/// Record an optional constraint according to its level.
///
/// Returns false only for a failed constraint at level `Fail`.
pub(crate) fn record_level(
    builder: &mut StageReportBuilder,
    name: &str,
    level: ConstraintLevel,
    passed: bool,
    detail: impl FnOnce() -> String,
) -> bool {
    if !level.is_checked() {
        return true;
    }
    trace!(constraint = name, ?level, passed, "optional constraint");
    if passed {
        builder.ok(name);
        return true;
    }
    let status = match level {
        ConstraintLevel::Fail => ConstraintStatus::Ko,
        ConstraintLevel::Warn => ConstraintStatus::Warning,
        _ => ConstraintStatus::Informational,
    };
    builder.record(ConstraintCheck::new(name, status).with_detail(detail()));
    !level.is_blocking()
}

pub(crate) fn stage_builder(stage: Stage, token: &SignedToken<'_>) -> StageReportBuilder {
    StageReport::builder(stage).subject(token.id)
}

fn log_stage(token: &SignedToken<'_>, report: &StageReport) {
    let stage = report.stage.short_name();
    let indication = report.conclusion.summary();
    match token.kind {
        TokenKind::Signature => {
            debug!(signature_id = token.id, stage, %indication, "building block finished")
        }
        TokenKind::Timestamp(_) => {
            debug!(timestamp_id = token.id, stage, %indication, "building block finished")
        }
    }
}
