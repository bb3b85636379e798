use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::investment::Investment;
use super::stack_card::StackCard;
use super::trade::TradeEntry;

/// A complete stack portfolio: the investment template, the multi-card
/// block ledger, and the virtual contribution clock state.
///
/// The portfolio exclusively owns its investments, cards, and clock;
/// nothing here is shared across portfolios.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,

    /// Contribution per simulated month, chosen from a fixed menu.
    pub monthly_contribution: f64,

    /// Dollar value of one cash block. Equals `monthly_contribution`.
    pub block_value: f64,

    /// Sum of all slot targets — blocks needed to complete one card.
    pub full_stack_size: u32,

    /// Fractional dollars awaiting the next block mint (0 ≤ v < block_value).
    pub cash_balance: f64,

    /// Minted blocks not yet allocated into a crate.
    pub waiting_room_blocks: u32,

    /// Simulated months elapsed, starting at 1.
    pub month_counter: u32,

    /// Milliseconds into the current simulated month.
    pub elapsed_ms_in_period: u64,

    pub investments: Vec<Investment>,
    pub stack_cards: Vec<StackCard>,

    /// Index of the first incomplete card (or the last card if all complete).
    pub active_card_index: usize,

    /// Cards where every crate is at its slot target. Derived by sync.
    #[serde(default)]
    pub completed_stacks: u32,

    #[serde(default)]
    pub trade_log: Vec<TradeEntry>,
}

impl Portfolio {
    #[must_use]
    pub fn investment(&self, crate_id: Uuid) -> Option<&Investment> {
        self.investments.iter().find(|inv| inv.id == crate_id)
    }

    #[must_use]
    pub fn slot_target_of(&self, crate_id: Uuid) -> Option<u32> {
        self.investment(crate_id).map(|inv| inv.slot_target)
    }

    #[must_use]
    pub fn active_card(&self) -> Option<&StackCard> {
        self.stack_cards.get(self.active_card_index)
    }

    /// Dollars invested in one crate: card values across the whole ledger
    /// plus the sub-block overflow remainder held by the money layer.
    #[must_use]
    pub fn invested_value(&self, crate_id: Uuid) -> f64 {
        let in_cards: f64 = self
            .stack_cards
            .iter()
            .filter_map(|card| card.crate_state(crate_id))
            .map(|s| s.value_dollars)
            .sum();
        let overflow = self
            .investment(crate_id)
            .map(|inv| inv.overflow_dollars)
            .unwrap_or(0.0);
        in_cards + overflow
    }

    /// Total dollars invested across all crates.
    #[must_use]
    pub fn total_invested_value(&self) -> f64 {
        self.investments
            .iter()
            .map(|inv| self.invested_value(inv.id))
            .sum()
    }

    /// Total blocks placed across every card.
    #[must_use]
    pub fn total_filled_blocks(&self) -> u32 {
        self.stack_cards
            .iter()
            .flat_map(|card| card.crates.iter())
            .map(|s| s.filled)
            .sum()
    }
}
