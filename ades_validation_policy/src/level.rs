// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use serde::{Deserialize, Serialize};

/// How a failed optional constraint affects the verdict.
///
/// Only [`ConstraintLevel::Fail`] changes the conclusion. `Warn` and `Inform` failures are
/// recorded in the result tree and otherwise ignored; `Ignore` skips the check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConstraintLevel {
    Fail,
    Warn,
    Inform,
    #[default]
    Ignore,
}

impl ConstraintLevel {
    pub fn is_checked(&self) -> bool {
        !matches!(self, ConstraintLevel::Ignore)
    }

    pub fn is_blocking(&self) -> bool {
        matches!(self, ConstraintLevel::Fail)
    }
}
