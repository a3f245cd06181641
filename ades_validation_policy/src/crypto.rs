// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The cryptographic-constraint check shared by SAV, XCV and the revocation checks.

use crate::constraints::{ConstraintContext, CryptographicConstraint, ValidationConstraints};
use chrono::{DateTime, Utc};
use tracing::{trace, warn};

/// Outcome of checking one algorithm use against the policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptoCheck {
    Acceptable,
    /// Unknown or unacceptable algorithm or key size. No proof of existence can recover this.
    Rejected { reason: String },
    /// The algorithm was acceptable but expired at or before the reference time. An earlier
    /// proof of existence may still recover it.
    Expired {
        algorithm: String,
        expiration: DateTime<Utc>,
    },
}

impl CryptoCheck {
    pub fn is_acceptable(&self) -> bool {
        matches!(self, CryptoCheck::Acceptable)
    }

    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        match self {
            CryptoCheck::Expired { expiration, .. } => Some(*expiration),
            _ => None,
        }
    }
}

/// Algorithms and key size of one signature value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlgorithmUse<'a> {
    pub digest: Option<&'a str>,
    pub encryption: Option<&'a str>,
    pub key_length: Option<u32>,
}

impl<'a> AlgorithmUse<'a> {
    pub fn new(
        digest: Option<&'a str>,
        encryption: Option<&'a str>,
        key_length: Option<u32>,
    ) -> Self {
        Self {
            digest,
            encryption,
            key_length,
        }
    }
}

impl ValidationConstraints {
    /// Check `usage` in `context` as of `at`.
    ///
    /// Acceptability is checked first and a rejection is final. Then the earliest expiration
    /// of the algorithms involved is compared with `at`. An acceptable algorithm without a
    /// configured expiration date is rejected. A context without a table is not checked.
    pub fn check_cryptographic_constraint(
        &self,
        context: ConstraintContext,
        usage: AlgorithmUse<'_>,
        at: DateTime<Utc>,
    ) -> CryptoCheck {
        self.check_algorithms(context, usage, true, at)
    }

    /// Check only the digest algorithm, for example the message imprint of a timestamp.
    pub fn check_digest_algorithm(
        &self,
        context: ConstraintContext,
        digest: Option<&str>,
        at: DateTime<Utc>,
    ) -> CryptoCheck {
        self.check_algorithms(context, AlgorithmUse::new(digest, None, None), false, at)
    }

    fn check_algorithms(
        &self,
        context: ConstraintContext,
        usage: AlgorithmUse<'_>,
        check_encryption: bool,
        at: DateTime<Utc>,
    ) -> CryptoCheck {
        let Some(table) = self.cryptographic_constraint(context) else {
            trace!(context = %context, "no cryptographic constraint configured");
            return CryptoCheck::Acceptable;
        };

        if let Err(reason) = check_acceptable(table, usage, check_encryption) {
            trace!(context = %context, %reason, "algorithm rejected");
            return CryptoCheck::Rejected { reason };
        }

        let mut earliest: Option<(String, DateTime<Utc>)> = None;
        let candidates = [
            usage.digest.map(|d| (d, None)),
            usage.encryption.map(|e| (e, usage.key_length)),
        ];
        for (algorithm, key_length) in candidates.into_iter().flatten() {
            let Some(expiration) = self.algorithm_expiration(algorithm, key_length) else {
                warn!(context = %context, algorithm, "accepted algorithm has no expiration date");
                return CryptoCheck::Rejected {
                    reason: format!("no expiration date for {algorithm}"),
                };
            };
            if earliest.as_ref().map_or(true, |(_, current)| expiration < *current) {
                earliest = Some((algorithm.to_string(), expiration));
            }
        }

        match earliest {
            Some((algorithm, expiration)) if at >= expiration => {
                trace!(context = %context, %algorithm, %expiration, "algorithm expired");
                CryptoCheck::Expired { algorithm, expiration }
            }
            _ => CryptoCheck::Acceptable,
        }
    }
}

fn check_acceptable(
    table: &CryptographicConstraint,
    usage: AlgorithmUse<'_>,
    check_encryption: bool,
) -> Result<(), String> {
    let digest = usage.digest.ok_or_else(|| "digest algorithm unknown".to_string())?;
    if !table.acceptable_digest_algorithms.iter().any(|a| a == digest) {
        return Err(format!("digest algorithm {digest} is not acceptable"));
    }

    if !check_encryption {
        return Ok(());
    }
    let encryption = usage
        .encryption
        .ok_or_else(|| "encryption algorithm unknown".to_string())?;
    if !table.acceptable_encryption_algorithms.iter().any(|a| a == encryption) {
        return Err(format!("encryption algorithm {encryption} is not acceptable"));
    }

    if let Some(min) = table.min_key_sizes.get(encryption) {
        match usage.key_length {
            Some(len) if len >= *min => {}
            Some(len) => return Err(format!("{encryption} key size {len} is below {min}")),
            None => return Err(format!("{encryption} key size unknown")),
        }
    }
    Ok(())
}
