// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Timestamp validation: the building blocks, without VCI, for one timestamp token.

use crate::bbb::{run_building_blocks, BuildingBlocks};
use crate::context::{SignedToken, ValidationContext};
use crate::verdict::Verdict;
use ades_validation_model::{TimestampData, TimestampReport};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct TimestampValidation<'a> {
    pub timestamp: &'a TimestampData,
    pub token: SignedToken<'a>,
    pub building_blocks: BuildingBlocks<'a>,
    pub verdict: Verdict,
}

impl<'a> TimestampValidation<'a> {
    pub fn is_valid(&self) -> bool {
        self.verdict.is_valid()
    }

    /// The message imprint was found and matches the timestamped data.
    pub fn message_imprint_verified(&self) -> bool {
        let basic = &self.timestamp.basic_signature;
        basic.reference_data_found && basic.reference_data_intact
    }

    pub fn report(&self) -> TimestampReport {
        TimestampReport {
            timestamp_id: self.timestamp.id.clone(),
            category: self.timestamp.category,
            production_time: self.timestamp.production_time,
            building_blocks: self.building_blocks.report(),
            conclusion: self.verdict.conclusion.clone(),
        }
    }
}

pub fn validate_timestamp<'a>(
    ctx: &ValidationContext<'a>,
    timestamp: &'a TimestampData,
) -> TimestampValidation<'a> {
    let token = SignedToken::timestamp(ctx.index, timestamp);
    let building_blocks = run_building_blocks(ctx, &token);
    let verdict = building_blocks.fold();

    debug!(
        timestamp_id = %timestamp.id,
        category = timestamp.category.as_str(),
        indication = %verdict.conclusion.summary(),
        "timestamp validated"
    );

    TimestampValidation {
        timestamp,
        token,
        building_blocks,
        verdict,
    }
}
