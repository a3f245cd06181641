// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Identification of the signer's certificate.

use super::stage_builder;
use crate::context::{SignedToken, ValidationContext};
use ades_validation_model::{CertificateData, Conclusion, Info, Stage, StageReport, SubIndication};

pub const SIGNING_CERTIFICATE_IDENTIFIED: &str = "SigningCertificateIdentified";
pub const SIGNING_CERTIFICATE_REFERENCE_PRESENT: &str = "SigningCertificateReferencePresent";
pub const SIGNING_CERTIFICATE_DIGEST_MATCH: &str = "SigningCertificateDigestMatch";
pub const ISSUER_SERIAL_MATCH: &str = "IssuerSerialMatch";

pub fn identify_signer_certificate<'a>(
    ctx: &ValidationContext<'a>,
    token: &SignedToken<'a>,
) -> (StageReport, Option<&'a CertificateData>) {
    let mut builder = stage_builder(Stage::IdentificationOfSignerCertificate, token);
    let binding = token.signing_certificate;

    let candidate = binding.id.as_deref().and_then(|id| ctx.index.certificate(id));
    let Some(candidate) = candidate else {
        builder.ko(SIGNING_CERTIFICATE_IDENTIFIED, "no candidate signing certificate");
        let conclusion = Conclusion::indeterminate(SubIndication::NoSignerCertificateFound);
        return (builder.finish(conclusion), None);
    };
    builder.ok(SIGNING_CERTIFICATE_IDENTIFIED);

    if !builder.check(SIGNING_CERTIFICATE_REFERENCE_PRESENT, binding.digest_value_present, || {
        "signed properties carry no signing-certificate digest".to_string()
    }) {
        return (builder.finish(Conclusion::invalid(SubIndication::FormatFailure)), None);
    }

    if !builder.check(SIGNING_CERTIFICATE_DIGEST_MATCH, binding.digest_value_match, || {
        format!("digest does not match certificate {}", candidate.id)
    }) {
        return (builder.finish(Conclusion::invalid(SubIndication::FormatFailure)), None);
    }

    if let Some(matches) = binding.issuer_serial_match {
        if !builder.check(ISSUER_SERIAL_MATCH, matches, || {
            format!("issuer/serial do not match certificate {}", candidate.id)
        }) {
            let conclusion = Conclusion::indeterminate(SubIndication::NoSignerCertificateFound);
            return (builder.finish(conclusion), None);
        }
    }

    let conclusion =
        Conclusion::valid().with_info(Info::value(Info::CERTIFICATE_ID, &candidate.id));
    (builder.finish(conclusion), Some(candidate))
}
