use std::collections::HashMap;

use uuid::Uuid;

use crate::models::portfolio::Portfolio;
use crate::models::stack_card::{CrateState, StackCard};
use crate::models::trade::TradeEntry;

/// Growth amounts below this are treated as fully absorbed.
const ABSORB_EPSILON: f64 = 1e-6;

/// Operations on the multi-card block ledger: allocating waiting-room
/// blocks into the active card, moving blocks within it, and the
/// normalization pass that keeps `filled`, the active cursor, and the
/// completed-card count derived from dollar values.
///
/// Allocation and moves return `bool`: a `false` is a normal UI race
/// (block just consumed by a tick, crate already full), not an error.
pub struct LedgerService;

impl LedgerService {
    pub fn new() -> Self {
        Self
    }

    /// Consume one waiting-room block into `crate_id` on the active card.
    /// Completing the last card appends a fresh empty card and advances
    /// the active cursor onto it.
    pub fn allocate(&self, portfolio: &mut Portfolio, crate_id: Uuid) -> bool {
        if portfolio.waiting_room_blocks == 0 {
            return false;
        }
        let Some(investment) = portfolio.investment(crate_id) else {
            return false;
        };
        let slot_target = investment.slot_target;
        let crate_name = investment.name.clone();
        let block_value = portfolio.block_value;

        // Ensure a card exists and the cursor is fresh. When every card is
        // complete the cursor sits on a finished card; open a new one so
        // the active card is always incomplete.
        self.sync_state(portfolio);
        if portfolio.stack_cards[portfolio.active_card_index].is_complete(&portfolio.investments) {
            let card = StackCard::from_template(&portfolio.investments);
            portfolio.stack_cards.push(card);
            self.sync_state(portfolio);
        }

        let card_index = portfolio.active_card_index;
        let max_value = f64::from(slot_target) * block_value;
        let Some(state) = portfolio.stack_cards[card_index].crate_state_mut(crate_id) else {
            return false;
        };
        if state.filled >= slot_target {
            return false;
        }

        // Growth may have left a fraction in the last open slot; take what
        // fits here and roll the rest forward so exactly one block's value
        // lands in the ledger.
        let take = (max_value - state.value_dollars).max(0.0).min(block_value);
        state.value_dollars += take;
        portfolio.waiting_room_blocks -= 1;
        let excess = block_value - take;
        if excess > ABSORB_EPSILON {
            self.apply_value_with_rollover(portfolio, crate_id, excess);
        }

        let month = portfolio.month_counter;
        portfolio
            .trade_log
            .push(TradeEntry::buy(crate_name, block_value, month));

        self.advance_after_mutation(portfolio);
        true
    }

    /// Move one filled block between two crates of the active card.
    pub fn move_block(&self, portfolio: &mut Portfolio, from: Uuid, to: Uuid) -> bool {
        if from == to {
            return false;
        }
        let Some(from_inv) = portfolio.investment(from) else {
            return false;
        };
        let Some(to_inv) = portfolio.investment(to) else {
            return false;
        };
        let to_target = to_inv.slot_target;
        let from_name = from_inv.name.clone();
        let to_name = to_inv.name.clone();
        let block_value = portfolio.block_value;
        let month = portfolio.month_counter;

        let Some(card) = portfolio.stack_cards.get_mut(portfolio.active_card_index) else {
            return false;
        };
        let Some(from_idx) = card.crates.iter().position(|s| s.crate_id == from) else {
            return false;
        };
        let Some(to_idx) = card.crates.iter().position(|s| s.crate_id == to) else {
            return false;
        };
        if card.crates[from_idx].filled == 0 {
            return false;
        }
        if card.crates[to_idx].filled >= to_target {
            return false;
        }

        card.crates[from_idx].filled -= 1;
        card.crates[from_idx].value_dollars =
            (card.crates[from_idx].value_dollars - block_value).max(0.0);
        card.crates[to_idx].filled += 1;
        card.crates[to_idx].value_dollars += block_value;

        portfolio
            .trade_log
            .push(TradeEntry::sell(from_name, block_value, month));
        portfolio
            .trade_log
            .push(TradeEntry::buy(to_name, block_value, month));

        self.sync_state(portfolio);
        true
    }

    /// Idempotent normalization: every card gets exactly the template's
    /// crates, `filled` is re-derived from dollar values (clamped to the
    /// slot target), and the active cursor plus completed count are
    /// recomputed. At least one card always exists afterwards.
    pub fn sync_state(&self, portfolio: &mut Portfolio) {
        if portfolio.stack_cards.is_empty() {
            let card = StackCard::from_template(&portfolio.investments);
            portfolio.stack_cards.push(card);
        }

        let block_value = portfolio.block_value;
        let targets: HashMap<Uuid, u32> = portfolio
            .investments
            .iter()
            .map(|inv| (inv.id, inv.slot_target))
            .collect();
        let template_ids: Vec<Uuid> = portfolio.investments.iter().map(|inv| inv.id).collect();

        for card in &mut portfolio.stack_cards {
            let shape_ok = card.crates.len() == template_ids.len()
                && card
                    .crates
                    .iter()
                    .zip(&template_ids)
                    .all(|(state, &id)| state.crate_id == id);
            if !shape_ok {
                card.crates = template_ids
                    .iter()
                    .map(|&id| {
                        card.crates
                            .iter()
                            .find(|s| s.crate_id == id)
                            .cloned()
                            .unwrap_or_else(|| CrateState::new(id))
                    })
                    .collect();
            }

            for state in &mut card.crates {
                let target = targets.get(&state.crate_id).copied().unwrap_or(1);
                let max_value = (f64::from(target) * block_value).max(0.0);
                state.value_dollars = state.value_dollars.clamp(0.0, max_value);
                state.filled = if block_value > 0.0 {
                    ((state.value_dollars / block_value).floor() as u32).min(target)
                } else {
                    0
                };
            }
        }

        let complete_flags: Vec<bool> = portfolio
            .stack_cards
            .iter()
            .map(|card| card.is_complete(&portfolio.investments))
            .collect();
        portfolio.completed_stacks = complete_flags.iter().filter(|&&c| c).count() as u32;
        portfolio.active_card_index = complete_flags
            .iter()
            .position(|&complete| !complete)
            .unwrap_or(portfolio.stack_cards.len().saturating_sub(1));
    }

    /// Pour `dollars` into `crate_id`, filling the first card with spare
    /// capacity and rolling the remainder forward card by card (creating
    /// template-shaped cards as needed). The search always starts at card
    /// 0 so growth, reconciliation, and catch-up ticks agree on where
    /// value lands. Callers run `sync_state` afterwards.
    pub fn apply_value_with_rollover(&self, portfolio: &mut Portfolio, crate_id: Uuid, dollars: f64) {
        if dollars <= 0.0 || portfolio.block_value <= 0.0 {
            return;
        }
        let Some(slot_target) = portfolio.slot_target_of(crate_id) else {
            return;
        };
        let max_value = f64::from(slot_target) * portfolio.block_value;
        if max_value <= 0.0 {
            return;
        }

        let mut remaining = dollars;
        let mut card_index = 0usize;
        while remaining > ABSORB_EPSILON {
            if card_index >= portfolio.stack_cards.len() {
                let card = StackCard::from_template(&portfolio.investments);
                portfolio.stack_cards.push(card);
            }
            if let Some(state) = portfolio.stack_cards[card_index].crate_state_mut(crate_id) {
                let spare = max_value - state.value_dollars;
                if spare > 0.0 {
                    let take = spare.min(remaining);
                    state.value_dollars += take;
                    remaining -= take;
                }
            }
            card_index += 1;
        }
    }

    /// Normalize, then append a fresh card when everything is complete so
    /// the active cursor always has somewhere to point.
    fn advance_after_mutation(&self, portfolio: &mut Portfolio) {
        self.sync_state(portfolio);
        let all_complete = portfolio
            .stack_cards
            .iter()
            .all(|card| card.is_complete(&portfolio.investments));
        if all_complete {
            let card = StackCard::from_template(&portfolio.investments);
            portfolio.stack_cards.push(card);
            self.sync_state(portfolio);
        }
    }
}

impl Default for LedgerService {
    fn default() -> Self {
        Self::new()
    }
}
