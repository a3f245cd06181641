// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! ETSI AdES long-term validation engine.
//!
//! The engine consumes pre-parsed diagnostic data and a set of validation constraints, and
//! produces a result tree mirroring the validation stages:
//! - basic building blocks (ISC, VCI, CV, SAV, XCV) for every signature and timestamp
//! - basic validation and timestamp validation
//! - AdES-T validation, establishing the best-signature-time
//! - long-term validation, resolving `*_NO_POE` failures with proofs of existence
//!
//! New integrations should start with [`fluent`].

pub mod fluent;

pub mod adest;
pub mod basic;
pub mod bbb;
pub mod context;
pub mod error;
pub mod executor;
pub mod ltv;
pub mod past;
pub mod poe;
pub mod timestamp;
pub mod validator;
pub mod verdict;

pub use error::AdesValidationError;
pub use executor::ExecutionMode;
pub use poe::PoeSet;
pub use validator::{AdesValidationOptions, AdesValidator};
pub use verdict::{Deferral, Verdict};
