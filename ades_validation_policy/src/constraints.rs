// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The validation policy consulted by every stage.
//!
//! A [`ValidationConstraints`] is immutable once built and may be shared across requests.
//! It is usually loaded from JSON:
//!
//! ```json
//! {
//!   "name": "qualified",
//!   "accepted_policies": { "allow_any": false, "ids": ["1.2.3.4"] },
//!   "signed_properties": { "signing_time": "FAIL" },
//!   "revocation_freshness": 86400,
//!   "cryptographic": {
//!     "MAIN_SIGNATURE": {
//!       "acceptable_digest_algorithms": ["SHA256"],
//!       "acceptable_encryption_algorithms": ["RSA"],
//!       "min_key_sizes": { "RSA": 2048 }
//!     }
//!   },
//!   "algorithm_expiration": { "SHA256": "2040-01-01T00:00:00Z", "RSA": "2035-01-01T00:00:00Z" }
//! }
//! ```
//!
//! Durations are whole seconds.

use crate::error::PolicyError;
use crate::level::ConstraintLevel;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Context in which an algorithm is used. Each context has its own algorithm table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConstraintContext {
    MainSignature,
    CaCertificate,
    Timestamp,
    Ocsp,
    Crl,
}

impl ConstraintContext {
    pub const ALL: [ConstraintContext; 5] = [
        ConstraintContext::MainSignature,
        ConstraintContext::CaCertificate,
        ConstraintContext::Timestamp,
        ConstraintContext::Ocsp,
        ConstraintContext::Crl,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConstraintContext::MainSignature => "MAIN_SIGNATURE",
            ConstraintContext::CaCertificate => "CA_CERTIFICATE",
            ConstraintContext::Timestamp => "TIMESTAMP",
            ConstraintContext::Ocsp => "OCSP",
            ConstraintContext::Crl => "CRL",
        }
    }
}

impl fmt::Display for ConstraintContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Acceptable algorithms for one [`ConstraintContext`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptographicConstraint {
    pub acceptable_digest_algorithms: Vec<String>,
    pub acceptable_encryption_algorithms: Vec<String>,
    /// Minimum key size in bits, per encryption algorithm.
    pub min_key_sizes: BTreeMap<String, u32>,
}

impl CryptographicConstraint {
    pub fn new<D, E>(digests: D, encryptions: E) -> Self
    where
        D: IntoIterator,
        D::Item: Into<String>,
        E: IntoIterator,
        E::Item: Into<String>,
    {
        Self {
            acceptable_digest_algorithms: digests.into_iter().map(Into::into).collect(),
            acceptable_encryption_algorithms: encryptions.into_iter().map(Into::into).collect(),
            min_key_sizes: BTreeMap::new(),
        }
    }

    pub fn with_min_key_size(mut self, algorithm: impl Into<String>, bits: u32) -> Self {
        self.min_key_sizes.insert(algorithm.into(), bits);
        self
    }
}

/// Which signature policies VCI accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcceptedPolicies {
    pub allow_any: bool,
    /// Accept signatures that carry no explicit policy identifier.
    pub allow_implicit: bool,
    pub ids: Vec<String>,
    /// Policy applied when the signature does not name one.
    pub default_policy: Option<String>,
}

impl Default for AcceptedPolicies {
    fn default() -> Self {
        Self {
            allow_any: true,
            allow_implicit: true,
            ids: Vec::new(),
            default_policy: None,
        }
    }
}

impl AcceptedPolicies {
    /// `policy_id` is `None` for an implicit policy.
    pub fn accepts(&self, policy_id: Option<&str>) -> bool {
        if self.allow_any {
            return true;
        }
        match policy_id {
            None => self.allow_implicit,
            Some(id) => self.ids.iter().any(|accepted| accepted == id),
        }
    }
}

/// Mandated signed properties, checked by SAV.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SignedPropertiesConstraints {
    pub signing_time: ConstraintLevel,
    pub commitment_type: ConstraintLevel,
    /// When non-empty, at least one indicated commitment type must be listed here.
    pub accepted_commitment_types: Vec<String>,
    pub signer_location: ConstraintLevel,
    pub claimed_role: ConstraintLevel,
    /// When non-empty, at least one claimed role must be listed here.
    pub accepted_roles: Vec<String>,
}

/// Meta-data constraints on the signing certificate, checked by XCV.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningCertificateConstraints {
    pub qualified: ConstraintLevel,
    pub sscd: ConstraintLevel,
    pub legal_person: ConstraintLevel,
    pub key_usage: ConstraintLevel,
    /// Every listed key usage must be present when `key_usage` is checked.
    pub required_key_usages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConstraints {
    pub name: Option<String>,
    pub accepted_policies: AcceptedPolicies,
    pub signed_properties: SignedPropertiesConstraints,
    pub signing_certificate: SigningCertificateConstraints,
    /// Maximum age of a revocation token relative to the validation time. When absent, the
    /// token's own `nextUpdate` bounds its freshness.
    #[serde(with = "seconds")]
    pub revocation_freshness: Option<Duration>,
    /// Maximum delay between the claimed signing time and the best-signature-time.
    #[serde(with = "seconds")]
    pub timestamp_delay: Option<Duration>,
    pub cryptographic: BTreeMap<ConstraintContext, CryptographicConstraint>,
    /// Expiration date per algorithm name. Encryption algorithms may also be keyed with their
    /// key size (`RSA2048`), which takes precedence over the bare name.
    pub algorithm_expiration: BTreeMap<String, DateTime<Utc>>,
}

impl Default for ValidationConstraints {
    fn default() -> Self {
        let table = CryptographicConstraint::new(["SHA256", "SHA384", "SHA512"], ["RSA", "ECDSA"])
            .with_min_key_size("RSA", 2048)
            .with_min_key_size("ECDSA", 256);
        let cryptographic = ConstraintContext::ALL
            .iter()
            .map(|ctx| (*ctx, table.clone()))
            .collect();

        let expiration = |year: i32| Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).single();
        let algorithm_expiration = [
            ("SHA256", 2040),
            ("SHA384", 2045),
            ("SHA512", 2045),
            ("RSA", 2035),
            ("ECDSA", 2040),
        ]
        .into_iter()
        .filter_map(|(name, year)| expiration(year).map(|at| (name.to_string(), at)))
        .collect();

        Self {
            name: None,
            accepted_policies: AcceptedPolicies::default(),
            signed_properties: SignedPropertiesConstraints::default(),
            signing_certificate: SigningCertificateConstraints::default(),
            revocation_freshness: None,
            timestamp_delay: None,
            cryptographic,
            algorithm_expiration,
        }
    }
}

impl ValidationConstraints {
    pub fn builder() -> ValidationConstraintsBuilder {
        ValidationConstraintsBuilder::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self, PolicyError> {
        let constraints: Self = serde_json::from_str(json)?;
        constraints.validate()?;
        Ok(constraints)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn to_json_pretty(&self) -> Result<String, PolicyError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks internal consistency. Called by every constructor that accepts external input.
    pub fn validate(&self) -> Result<(), PolicyError> {
        check_duration("revocation_freshness", self.revocation_freshness)?;
        check_duration("timestamp_delay", self.timestamp_delay)?;

        for (context, table) in &self.cryptographic {
            if let Some(algorithm) = table
                .min_key_sizes
                .keys()
                .find(|alg| !table.acceptable_encryption_algorithms.contains(alg))
            {
                return Err(PolicyError::ConflictingAlgorithmTable {
                    context: *context,
                    algorithm: algorithm.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn cryptographic_constraint(
        &self,
        context: ConstraintContext,
    ) -> Option<&CryptographicConstraint> {
        self.cryptographic.get(&context)
    }

    /// Expiration of `algorithm`, preferring a key-size specific entry.
    pub fn algorithm_expiration(
        &self,
        algorithm: &str,
        key_length: Option<u32>,
    ) -> Option<DateTime<Utc>> {
        key_length
            .and_then(|len| self.algorithm_expiration.get(&format!("{algorithm}{len}")))
            .or_else(|| self.algorithm_expiration.get(algorithm))
            .copied()
    }
}

fn check_duration(name: &'static str, value: Option<Duration>) -> Result<(), PolicyError> {
    match value {
        Some(d) if d < Duration::zero() => Err(PolicyError::InvalidDuration {
            name,
            seconds: d.num_seconds(),
        }),
        _ => Ok(()),
    }
}

/// Fluent construction of a [`ValidationConstraints`], starting from the defaults.
#[derive(Debug, Clone, Default)]
pub struct ValidationConstraintsBuilder {
    constraints: ValidationConstraints,
}

impl ValidationConstraintsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing policy instead of the defaults.
    pub fn from_constraints(constraints: ValidationConstraints) -> Self {
        Self { constraints }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.constraints.name = Some(name.into());
        self
    }

    /// Restrict VCI to the listed policies (plus implicit ones, if still allowed).
    pub fn with_accepted_policy(mut self, id: impl Into<String>) -> Self {
        self.constraints.accepted_policies.allow_any = false;
        self.constraints.accepted_policies.ids.push(id.into());
        self
    }

    pub fn with_any_policy(mut self, allow: bool) -> Self {
        self.constraints.accepted_policies.allow_any = allow;
        self
    }

    pub fn with_implicit_policy(mut self, allow: bool) -> Self {
        self.constraints.accepted_policies.allow_implicit = allow;
        self
    }

    pub fn with_default_policy(mut self, id: impl Into<String>) -> Self {
        self.constraints.accepted_policies.default_policy = Some(id.into());
        self
    }

    pub fn with_signing_time(mut self, level: ConstraintLevel) -> Self {
        self.constraints.signed_properties.signing_time = level;
        self
    }

    pub fn with_commitment_type(mut self, level: ConstraintLevel) -> Self {
        self.constraints.signed_properties.commitment_type = level;
        self
    }

    pub fn with_accepted_commitment_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.constraints.signed_properties.accepted_commitment_types =
            types.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_signer_location(mut self, level: ConstraintLevel) -> Self {
        self.constraints.signed_properties.signer_location = level;
        self
    }

    pub fn with_claimed_role(mut self, level: ConstraintLevel) -> Self {
        self.constraints.signed_properties.claimed_role = level;
        self
    }

    pub fn with_accepted_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.constraints.signed_properties.accepted_roles =
            roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_qualified_certificate(mut self, level: ConstraintLevel) -> Self {
        self.constraints.signing_certificate.qualified = level;
        self
    }

    pub fn with_sscd(mut self, level: ConstraintLevel) -> Self {
        self.constraints.signing_certificate.sscd = level;
        self
    }

    pub fn with_legal_person(mut self, level: ConstraintLevel) -> Self {
        self.constraints.signing_certificate.legal_person = level;
        self
    }

    pub fn with_key_usage<I, S>(mut self, level: ConstraintLevel, usages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.constraints.signing_certificate.key_usage = level;
        self.constraints.signing_certificate.required_key_usages =
            usages.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_revocation_freshness(mut self, freshness: Duration) -> Self {
        self.constraints.revocation_freshness = Some(freshness);
        self
    }

    pub fn with_timestamp_delay(mut self, delay: Duration) -> Self {
        self.constraints.timestamp_delay = Some(delay);
        self
    }

    pub fn with_cryptographic(
        mut self,
        context: ConstraintContext,
        constraint: CryptographicConstraint,
    ) -> Self {
        self.constraints.cryptographic.insert(context, constraint);
        self
    }

    /// Drop the table for `context`; algorithms used there are then not checked.
    pub fn without_cryptographic(mut self, context: ConstraintContext) -> Self {
        self.constraints.cryptographic.remove(&context);
        self
    }

    pub fn with_algorithm_expiration(
        mut self,
        algorithm: impl Into<String>,
        expiration: DateTime<Utc>,
    ) -> Self {
        self.constraints.algorithm_expiration.insert(algorithm.into(), expiration);
        self
    }

    pub fn without_algorithm_expiration(mut self, algorithm: &str) -> Self {
        self.constraints.algorithm_expiration.remove(algorithm);
        self
    }

    pub fn build(self) -> Result<ValidationConstraints, PolicyError> {
        self.constraints.validate()?;
        Ok(self.constraints)
    }
}

mod seconds {
    use chrono::Duration;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&d.num_seconds()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        match Option::<i64>::deserialize(deserializer)? {
            Some(secs) => Duration::try_seconds(secs)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("duration out of range: {secs}s"))),
            None => Ok(None),
        }
    }
}
