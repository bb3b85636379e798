use std::collections::HashMap;

use uuid::Uuid;

use crate::models::portfolio::Portfolio;
use crate::models::stack_card::{CrateState, StackCard};
use crate::services::ledger_service::LedgerService;

/// Projects per-crate "already invested" dollar figures onto the ledger.
///
/// The existing-amount figures are the single source of truth: a
/// reconcile is a full rebuild of the card sequence, never an incremental
/// patch, so any ledger state not derivable from the amounts is
/// intentionally discarded. Cards only ever receive whole blocks; the
/// sub-block remainder stays on the investment as `overflow_dollars`.
pub struct ReconcileService {
    ledger: LedgerService,
}

impl ReconcileService {
    pub fn new() -> Self {
        Self {
            ledger: LedgerService::new(),
        }
    }

    /// Total and idempotent. Investments missing from `amounts` keep
    /// their current `existing_amount`.
    pub fn reconcile(&self, portfolio: &mut Portfolio, amounts: &HashMap<Uuid, f64>) {
        if portfolio.block_value <= 0.0 {
            return;
        }
        let block_value = portfolio.block_value;

        for investment in &mut portfolio.investments {
            let amount = amounts
                .get(&investment.id)
                .copied()
                .unwrap_or(investment.existing_amount)
                .max(0.0);
            let starting_filled = (amount / block_value).floor() as u32;
            investment.existing_amount = amount;
            investment.starting_filled_blocks = starting_filled;
            investment.overflow_dollars =
                (amount - f64::from(starting_filled) * block_value).max(0.0);
        }

        self.rebuild_cards(portfolio);
    }

    /// Regenerate the whole card sequence from each investment's starting
    /// blocks: greedily fill card 0's crate to its slot target, then card
    /// 1, and so on. Every card ends up template-shaped regardless of
    /// which investment forced its creation. Card ids are reused by index
    /// so an unchanged reconcile leaves ids stable.
    fn rebuild_cards(&self, portfolio: &mut Portfolio) {
        let block_value = portfolio.block_value;
        let cards_needed = portfolio
            .investments
            .iter()
            .map(|inv| inv.starting_filled_blocks.div_ceil(inv.slot_target.max(1)))
            .max()
            .unwrap_or(0)
            .max(1) as usize;

        let previous_ids: Vec<Uuid> = portfolio.stack_cards.iter().map(|c| c.card_id).collect();

        portfolio.stack_cards = (0..cards_needed)
            .map(|card_index| StackCard {
                card_id: previous_ids
                    .get(card_index)
                    .copied()
                    .unwrap_or_else(Uuid::new_v4),
                crates: portfolio
                    .investments
                    .iter()
                    .map(|inv| {
                        let start = card_index as u32 * inv.slot_target;
                        let in_card = inv
                            .starting_filled_blocks
                            .saturating_sub(start)
                            .min(inv.slot_target);
                        CrateState {
                            crate_id: inv.id,
                            filled: in_card,
                            value_dollars: f64::from(in_card) * block_value,
                        }
                    })
                    .collect(),
            })
            .collect();

        self.ledger.sync_state(portfolio);
    }
}

impl Default for ReconcileService {
    fn default() -> Self {
        Self::new()
    }
}
