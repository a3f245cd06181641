// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Stage verdicts and the failures a proof of existence may still resolve.

use ades_validation_model::{Conclusion, Info, RevocationReason, SubIndication};
use ades_validation_policy::ConstraintContext;
use chrono::{DateTime, Utc};

/// A `*_NO_POE` failure together with the facts needed to resolve it at an earlier time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deferral {
    Revoked {
        certificate_id: String,
        revocation_time: DateTime<Utc>,
        reason: Option<RevocationReason>,
    },
    RevokedCa {
        certificate_id: String,
        revocation_time: DateTime<Utc>,
        reason: Option<RevocationReason>,
    },
    OutOfBounds {
        certificate_id: String,
        not_before: DateTime<Utc>,
        not_after: DateTime<Utc>,
    },
    /// `expiration` is `None` when the algorithm is not acceptable at all.
    Crypto {
        object_id: String,
        context: ConstraintContext,
        algorithm: Option<String>,
        expiration: Option<DateTime<Utc>>,
    },
}

impl Deferral {
    pub fn sub_indication(&self) -> SubIndication {
        match self {
            Deferral::Revoked { .. } => SubIndication::RevokedNoPoe,
            Deferral::RevokedCa { .. } => SubIndication::RevokedCaNoPoe,
            Deferral::OutOfBounds { .. } => SubIndication::OutOfBoundsNoPoe,
            Deferral::Crypto { .. } => SubIndication::CryptoConstraintsFailureNoPoe,
        }
    }

    /// Id of the certificate, signature or token the failure is about.
    pub fn object_id(&self) -> &str {
        match self {
            Deferral::Revoked { certificate_id, .. }
            | Deferral::RevokedCa { certificate_id, .. }
            | Deferral::OutOfBounds { certificate_id, .. } => certificate_id,
            Deferral::Crypto { object_id, .. } => object_id,
        }
    }

    /// Whether an object proven to exist at `at` escapes this failure.
    ///
    /// A revoked certificate needs `at` strictly before the revocation; an expired algorithm
    /// needs `at` strictly before its expiration. Out-of-bounds certificates need `at` inside
    /// the validity window.
    pub fn is_resolved_at(&self, at: DateTime<Utc>) -> bool {
        match self {
            Deferral::Revoked {
                revocation_time, ..
            }
            | Deferral::RevokedCa {
                revocation_time, ..
            } => at < *revocation_time,
            Deferral::OutOfBounds {
                not_before,
                not_after,
                ..
            } => *not_before <= at && at <= *not_after,
            Deferral::Crypto { expiration, .. } => expiration.map_or(false, |e| at < e),
        }
    }

    /// INDETERMINATE conclusion carrying this failure's facts.
    pub fn conclusion(&self) -> Conclusion {
        let mut conclusion = Conclusion::indeterminate(self.sub_indication());
        match self {
            Deferral::Revoked {
                certificate_id,
                revocation_time,
                reason,
            }
            | Deferral::RevokedCa {
                certificate_id,
                revocation_time,
                reason,
            } => {
                conclusion.push_info(Info::value(Info::CERTIFICATE_ID, certificate_id));
                conclusion.push_info(Info::time(Info::REVOCATION_TIME, *revocation_time));
                if let Some(reason) = reason {
                    conclusion.push_info(Info::value(Info::REVOCATION_REASON, reason.as_str()));
                }
            }
            Deferral::OutOfBounds {
                certificate_id,
                not_before,
                not_after,
            } => {
                conclusion.push_info(Info::value(Info::CERTIFICATE_ID, certificate_id));
                conclusion.push_info(Info::time(Info::NOT_BEFORE, *not_before));
                conclusion.push_info(Info::time(Info::NOT_AFTER, *not_after));
            }
            Deferral::Crypto {
                object_id,
                context,
                algorithm,
                expiration,
            } => {
                let mut info = Info::new(Info::ALGORITHM)
                    .with_attribute("object", object_id)
                    .with_attribute(Info::CONTEXT, context.as_str());
                if let Some(algorithm) = algorithm {
                    info = info.with_attribute(Info::VALUE_KEY, algorithm);
                }
                conclusion.push_info(info);
                if let Some(expiration) = expiration {
                    conclusion.push_info(Info::time(Info::ALGORITHM_EXPIRATION_DATE, *expiration));
                }
            }
        }
        conclusion
    }
}

/// Conclusion of a stage plus the deferred failures behind it.
///
/// `pending` is non-empty only when the conclusion is one of the `*_NO_POE`
/// INDETERMINATE results; its first entry produced the conclusion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub conclusion: Conclusion,
    pub pending: Vec<Deferral>,
}

impl Verdict {
    pub fn valid() -> Self {
        Self::from_conclusion(Conclusion::valid())
    }

    /// A final verdict with nothing left to resolve.
    pub fn from_conclusion(conclusion: Conclusion) -> Self {
        Self {
            conclusion,
            pending: Vec::new(),
        }
    }

    /// VALID when `pending` is empty, otherwise the first deferral's conclusion.
    pub fn deferred(pending: Vec<Deferral>) -> Self {
        match pending.first() {
            Some(first) => Self {
                conclusion: first.conclusion(),
                pending,
            },
            None => Self::valid(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.conclusion.is_valid()
    }

    /// INDETERMINATE with a sub-indication in `subs` and something left to resolve.
    pub fn is_deferred_with(&self, subs: &[SubIndication]) -> bool {
        !self.pending.is_empty() && self.conclusion.is_indeterminate_with(subs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(year: i32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn revocation_resolution_is_strict() {
        let d = Deferral::Revoked {
            certificate_id: "c".into(),
            revocation_time: at(2020),
            reason: None,
        };
        assert!(d.is_resolved_at(at(2019)));
        assert!(!d.is_resolved_at(at(2020)));
        assert!(d.conclusion().info(Info::REVOCATION_REASON).is_none());
    }

    #[test]
    fn revoked_ca_conclusion_names_the_reason() {
        let d = Deferral::RevokedCa {
            certificate_id: "ca".into(),
            revocation_time: at(2020),
            reason: Some(RevocationReason::CaCompromise),
        };
        let conclusion = d.conclusion();
        assert_eq!(d.object_id(), "ca");
        assert_eq!(conclusion.sub_indication(), Some(SubIndication::RevokedCaNoPoe));
        assert_eq!(
            conclusion.info(Info::REVOCATION_REASON).and_then(|i| i.attribute(Info::VALUE_KEY)),
            Some("cACompromise")
        );
    }

    #[test]
    fn rejected_algorithm_never_resolves() {
        let d = Deferral::Crypto {
            object_id: "s".into(),
            context: ConstraintContext::MainSignature,
            algorithm: None,
            expiration: None,
        };
        assert!(!d.is_resolved_at(at(1990)));
        assert!(d.conclusion().is(
            ades_validation_model::Indication::Indeterminate,
            SubIndication::CryptoConstraintsFailureNoPoe
        ));
    }

    #[test]
    fn deferred_takes_first_conclusion() {
        let v = Verdict::deferred(vec![
            Deferral::OutOfBounds {
                certificate_id: "c".into(),
                not_before: at(2015),
                not_after: at(2018),
            },
            Deferral::Revoked {
                certificate_id: "c".into(),
                revocation_time: at(2017),
                reason: Some(RevocationReason::KeyCompromise),
            },
        ]);
        assert_eq!(v.conclusion.sub_indication(), Some(SubIndication::OutOfBoundsNoPoe));
        assert_eq!(
            v.conclusion.info(Info::NOT_AFTER).and_then(|i| i.attribute(Info::VALUE_KEY)),
            Some("2018-01-01T00:00:00Z")
        );
        assert!(Verdict::deferred(Vec::new()).is_valid());
    }
}
