// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Validation constraints for AdES long-term validation.
//!
//! A [`ValidationConstraints`] is the read-only policy consulted by every validation stage:
//! accepted signature policies, mandated signed properties, signing-certificate meta-data
//! constraints, revocation freshness, per-context algorithm tables and algorithm expiration
//! dates. The cryptographic-constraint check shared by several stages lives here as well.

pub mod constraints;
pub mod crypto;
pub mod error;
pub mod level;

pub use constraints::{
    AcceptedPolicies, ConstraintContext, CryptographicConstraint, SignedPropertiesConstraints,
    SigningCertificateConstraints, ValidationConstraints, ValidationConstraintsBuilder,
};
pub use crypto::{AlgorithmUse, CryptoCheck};
pub use error::PolicyError;
pub use level::ConstraintLevel;
