use uuid::Uuid;

use crate::models::portfolio::Portfolio;
use crate::services::ledger_service::LedgerService;

/// Continuous per-crate appreciation, independent of the contribution
/// clock: every tick each invested crate accrues
/// `rate × block_value × tick_ms / 60000` dollars, poured into the ledger
/// with card-0-first rollover. A single huge tick after being
/// backgrounded cascades correctly across however many cards it fills.
pub struct GrowthService {
    ledger: LedgerService,
}

impl GrowthService {
    pub fn new() -> Self {
        Self {
            ledger: LedgerService::new(),
        }
    }

    pub fn tick(&self, portfolio: &mut Portfolio, tick_ms: u64) {
        if tick_ms == 0 || portfolio.block_value <= 0.0 {
            return;
        }
        let block_value = portfolio.block_value;
        let minutes = tick_ms as f64 / 60_000.0;

        // Appreciation needs principal: crates holding nothing accrue nothing.
        let growths: Vec<(Uuid, f64)> = portfolio
            .investments
            .iter()
            .filter(|inv| portfolio.invested_value(inv.id) > 0.0)
            .map(|inv| {
                let rate = inv.overflow_rate_per_minute.max(0.0);
                (inv.id, rate * block_value * minutes)
            })
            .filter(|&(_, growth)| growth > 0.0)
            .collect();

        for (crate_id, growth) in growths {
            self.ledger
                .apply_value_with_rollover(portfolio, crate_id, growth);
        }

        self.ledger.sync_state(portfolio);
    }
}

impl Default for GrowthService {
    fn default() -> Self {
        Self::new()
    }
}
