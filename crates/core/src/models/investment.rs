use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One investment "crate" in a portfolio template.
///
/// The `id` is stable across template edits; `slot_target` is reassigned
/// by slot apportionment whenever percentages change. The trailing three
/// fields belong to the money layer: `existing_amount` is the last
/// reconciled dollar figure, split into whole `starting_filled_blocks`
/// (materialized into ledger cards) and a sub-block `overflow_dollars`
/// remainder that never enters the cards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Investment {
    /// Unique identifier, stable across edits
    pub id: Uuid,

    /// Display name (e.g., "Index Fund", "Gold")
    pub name: String,

    /// Target allocation percentage (0–100).
    /// Summed across a portfolio's investments this is 100 ± 0.01.
    pub requested_percent: f64,

    /// Capacity in blocks per stack card, assigned by slot apportionment.
    pub slot_target: u32,

    /// Simulated appreciation: dollars-growth multiplier per minute (≥ 0).
    #[serde(default = "default_overflow_rate")]
    pub overflow_rate_per_minute: f64,

    /// Dollars already invested, as last entered by the user.
    #[serde(default)]
    pub existing_amount: f64,

    /// Whole blocks derived from `existing_amount` at the last reconcile.
    #[serde(default)]
    pub starting_filled_blocks: u32,

    /// Sub-block remainder of `existing_amount` (0 ≤ v < block value).
    #[serde(default)]
    pub overflow_dollars: f64,
}

fn default_overflow_rate() -> f64 {
    1.0
}

impl Investment {
    pub fn new(name: impl Into<String>, requested_percent: f64, slot_target: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            requested_percent,
            slot_target: slot_target.max(1),
            overflow_rate_per_minute: default_overflow_rate(),
            existing_amount: 0.0,
            starting_filled_blocks: 0,
            overflow_dollars: 0.0,
        }
    }

    /// Maximum dollar value one card can hold for this investment.
    #[must_use]
    pub fn max_card_value(&self, block_value: f64) -> f64 {
        f64::from(self.slot_target) * block_value
    }
}
