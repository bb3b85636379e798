use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::investment::Investment;

/// Block-fill state of a single crate within one stack card.
///
/// Invariant: `filled == floor(value_dollars / block_value)`, clamped to
/// `[0, slot_target]`. `value_dollars` may carry a fractional remainder
/// from growth ticks; `filled` only ever counts whole blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrateState {
    /// Id of the investment this state belongs to
    pub crate_id: Uuid,

    /// Whole blocks placed in this crate on this card
    pub filled: u32,

    /// Dollar value held in this crate on this card
    pub value_dollars: f64,
}

impl CrateState {
    pub fn new(crate_id: Uuid) -> Self {
        Self {
            crate_id,
            filled: 0,
            value_dollars: 0.0,
        }
    }
}

/// One complete "round" through the crate set: a card holds one crate
/// state per investment, in template order.
///
/// A card is complete when every crate is at its slot target. Cards are
/// appended in the forward direction and never deleted outside the
/// reconciliation rebuild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackCard {
    pub card_id: Uuid,
    pub crates: Vec<CrateState>,
}

impl StackCard {
    /// A fresh zero-initialized card shaped after the template.
    pub fn from_template(investments: &[Investment]) -> Self {
        Self {
            card_id: Uuid::new_v4(),
            crates: investments.iter().map(|inv| CrateState::new(inv.id)).collect(),
        }
    }

    #[must_use]
    pub fn crate_state(&self, crate_id: Uuid) -> Option<&CrateState> {
        self.crates.iter().find(|s| s.crate_id == crate_id)
    }

    pub fn crate_state_mut(&mut self, crate_id: Uuid) -> Option<&mut CrateState> {
        self.crates.iter_mut().find(|s| s.crate_id == crate_id)
    }

    /// Total dollars held on this card across all crates.
    #[must_use]
    pub fn total_value(&self) -> f64 {
        self.crates.iter().map(|s| s.value_dollars).sum()
    }

    /// Complete when every crate is at its slot target.
    /// Crates with no matching investment are ignored.
    #[must_use]
    pub fn is_complete(&self, investments: &[Investment]) -> bool {
        investments.iter().all(|inv| {
            self.crate_state(inv.id)
                .map(|s| s.filled >= inv.slot_target)
                .unwrap_or(false)
        })
    }
}
