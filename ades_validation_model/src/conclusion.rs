// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Terminal verdict of a validation process.
//!
//! A [`Conclusion`] is an indication, an optional sub-indication and an ordered list of
//! [`Info`] facts. The constructors enforce that a VALID conclusion never carries a
//! sub-indication and that every other conclusion does.

use crate::indication::{Indication, SubIndication};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// A labelled audit fact, optionally carrying named attributes.
///
/// Infos also transport values between stages (for example the best-signature-time
/// computed by AdES-T).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Info {
    pub label: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl Info {
    pub const BEST_SIGNATURE_TIME: &'static str = "BestSignatureTime";
    pub const CONTROL_TIME: &'static str = "ControlTime";
    pub const REVOCATION_TIME: &'static str = "RevocationTime";
    pub const REVOCATION_REASON: &'static str = "RevocationReason";
    pub const NOT_BEFORE: &'static str = "NotBefore";
    pub const NOT_AFTER: &'static str = "NotAfter";
    pub const ALGORITHM_EXPIRATION_DATE: &'static str = "AlgorithmExpirationDate";
    pub const ALGORITHM: &'static str = "Algorithm";
    pub const CERTIFICATE_ID: &'static str = "CertificateId";
    pub const TIMESTAMP_ID: &'static str = "TimestampId";
    pub const CONTEXT: &'static str = "Context";
    pub const DETAIL: &'static str = "Detail";

    /// Attribute key used by [`Info::value`] and [`Info::time`].
    pub const VALUE_KEY: &'static str = "value";

    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Info carrying a single string value.
    pub fn value(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(label).with_attribute(Self::VALUE_KEY, value)
    }

    /// Info carrying a single instant, formatted as RFC 3339 with second precision.
    pub fn time(label: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self::value(label, format_time(at))
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(|v| v.as_str())
    }
}

/// Canonical time rendering used throughout the result tree.
pub fn format_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conclusion {
    indication: Indication,
    #[serde(skip_serializing_if = "Option::is_none")]
    sub_indication: Option<SubIndication>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    infos: Vec<Info>,
}

impl Conclusion {
    pub fn valid() -> Self {
        Self {
            indication: Indication::Valid,
            sub_indication: None,
            infos: Vec::new(),
        }
    }

    pub fn invalid(sub_indication: SubIndication) -> Self {
        Self {
            indication: Indication::Invalid,
            sub_indication: Some(sub_indication),
            infos: Vec::new(),
        }
    }

    pub fn indeterminate(sub_indication: SubIndication) -> Self {
        Self {
            indication: Indication::Indeterminate,
            sub_indication: Some(sub_indication),
            infos: Vec::new(),
        }
    }

    pub fn indication(&self) -> Indication {
        self.indication
    }

    pub fn sub_indication(&self) -> Option<SubIndication> {
        self.sub_indication
    }

    pub fn infos(&self) -> &[Info] {
        &self.infos
    }

    pub fn is_valid(&self) -> bool {
        self.indication == Indication::Valid
    }

    /// True when the conclusion is exactly `indication`/`sub_indication`.
    pub fn is(&self, indication: Indication, sub_indication: SubIndication) -> bool {
        self.indication == indication && self.sub_indication == Some(sub_indication)
    }

    /// True for INDETERMINATE conclusions whose sub-indication is in `subs`.
    pub fn is_indeterminate_with(&self, subs: &[SubIndication]) -> bool {
        self.indication == Indication::Indeterminate
            && self.sub_indication.map(|s| subs.contains(&s)).unwrap_or(false)
    }

    pub fn with_info(mut self, info: Info) -> Self {
        self.infos.push(info);
        self
    }

    pub fn push_info(&mut self, info: Info) {
        self.infos.push(info);
    }

    /// First info with the given label.
    pub fn info(&self, label: &str) -> Option<&Info> {
        self.infos.iter().find(|i| i.label == label)
    }

    /// Parent-level copy of a child conclusion: same verdict, same infos.
    ///
    /// Used when a stage propagates the conclusion of the stage it delegated to.
    pub fn propagate(child: &Conclusion) -> Self {
        child.clone()
    }

    /// Short `INDICATION[/SUB_INDICATION]` rendering for logs.
    pub fn summary(&self) -> String {
        match self.sub_indication {
            Some(sub) => format!("{}/{}", self.indication, sub),
            None => self.indication.to_string(),
        }
    }
}
