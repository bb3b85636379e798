use crate::models::portfolio::Portfolio;
use crate::models::report::{CrateProgress, QuickReport};

/// Computes the read-only progress numbers the UI renders.
pub struct ReportService;

impl ReportService {
    pub fn new() -> Self {
        Self
    }

    pub fn quick_report(&self, portfolio: &Portfolio) -> QuickReport {
        let block_value = portfolio.block_value.max(0.0);
        let active_card = portfolio.active_card();

        let per_crate: Vec<CrateProgress> = portfolio
            .investments
            .iter()
            .map(|inv| {
                let current_value = active_card
                    .and_then(|card| card.crate_state(inv.id))
                    .map(|state| state.value_dollars)
                    .unwrap_or(0.0);
                CrateProgress {
                    crate_id: inv.id,
                    crate_name: inv.name.clone(),
                    current_value,
                    max_value: inv.max_card_value(block_value),
                }
            })
            .collect();

        let current_stack_value = active_card.map(|card| card.total_value()).unwrap_or(0.0);
        let full_stack_value = f64::from(portfolio.full_stack_size) * block_value;
        let total_invested_value = portfolio.total_invested_value();
        let total_cash_value =
            portfolio.cash_balance + f64::from(portfolio.waiting_room_blocks) * block_value;

        QuickReport {
            total_portfolio_value: total_invested_value + total_cash_value,
            total_invested_value,
            total_cash_value,
            full_stack_value,
            current_stack_value,
            per_crate,
        }
    }
}

impl Default for ReportService {
    fn default() -> Self {
        Self::new()
    }
}
