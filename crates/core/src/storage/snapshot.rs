use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::CoreError;
use crate::models::investment::Investment;
use crate::models::portfolio::Portfolio;
use crate::models::stack_card::{CrateState, StackCard};
use crate::services::clock_service::MONTH_DURATION_MS;
use crate::services::ledger_service::LedgerService;
use crate::services::template_service::PERCENT_SUM_TOLERANCE;

/// Block value of the original fixed-capacity prototype, used when a
/// legacy snapshot carries no money figures of its own.
const LEGACY_BLOCK_VALUE: f64 = 500.0;

/// Current snapshot payload (version 2): the whole portfolio collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotV2 {
    pub saved_at: DateTime<Utc>,

    #[serde(default)]
    pub active_portfolio_id: Option<Uuid>,

    #[serde(default)]
    pub portfolios: Vec<Portfolio>,
}

/// Legacy version 1 payload: the single-stack prototype — fixed-capacity
/// crates, a percent progress bar toward the next block, and at most one
/// spawned block at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotV1 {
    #[serde(default)]
    pub month: u32,

    #[serde(default)]
    pub progress_percent: f64,

    #[serde(default)]
    pub block_available: bool,

    #[serde(default)]
    pub crates: Vec<LegacyCrate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyCrate {
    pub id: String,

    #[serde(default)]
    pub capacity: u32,

    #[serde(default)]
    pub filled: u32,
}

/// Decode a payload of any supported version into the current shape.
/// Each legacy version migrates one step along the chain.
pub fn decode(version: u16, payload: &[u8]) -> Result<SnapshotV2, CoreError> {
    match version {
        1 => {
            let v1: SnapshotV1 = serde_json::from_slice(payload)?;
            Ok(migrate_v1_to_v2(v1))
        }
        2 => Ok(serde_json::from_slice(payload)?),
        other => Err(CoreError::UnsupportedVersion(other)),
    }
}

/// Legacy fixed-capacity crates become the percent/slot model: the
/// capacity turns into the slot target, percentages are even-split, and
/// the filled blocks materialize as one card plus matching
/// existing-amount figures.
fn migrate_v1_to_v2(v1: SnapshotV1) -> SnapshotV2 {
    debug!(crates = v1.crates.len(), "migrating version 1 snapshot");

    if v1.crates.is_empty() {
        return SnapshotV2 {
            saved_at: Utc::now(),
            active_portfolio_id: None,
            portfolios: Vec::new(),
        };
    }

    let even_percent = 100.0 / v1.crates.len() as f64;
    let investments: Vec<Investment> = v1
        .crates
        .iter()
        .map(|legacy| {
            let slot_target = legacy.capacity.max(1);
            let filled = legacy.filled.min(slot_target);
            Investment {
                id: Uuid::new_v4(),
                name: legacy.id.clone(),
                requested_percent: even_percent,
                slot_target,
                overflow_rate_per_minute: 1.0,
                existing_amount: f64::from(filled) * LEGACY_BLOCK_VALUE,
                starting_filled_blocks: filled,
                overflow_dollars: 0.0,
            }
        })
        .collect();

    let card = StackCard {
        card_id: Uuid::new_v4(),
        crates: investments
            .iter()
            .map(|inv| CrateState {
                crate_id: inv.id,
                filled: inv.starting_filled_blocks,
                value_dollars: f64::from(inv.starting_filled_blocks) * LEGACY_BLOCK_VALUE,
            })
            .collect(),
    };

    let progress = v1.progress_percent.clamp(0.0, 100.0);
    let full_stack_size = investments.iter().map(|inv| inv.slot_target).sum();

    let portfolio = Portfolio {
        id: Uuid::new_v4(),
        name: "Stack Portfolio".to_string(),
        created_at: Utc::now(),
        monthly_contribution: LEGACY_BLOCK_VALUE,
        block_value: LEGACY_BLOCK_VALUE,
        full_stack_size,
        cash_balance: 0.0,
        waiting_room_blocks: u32::from(v1.block_available),
        month_counter: v1.month.max(1),
        elapsed_ms_in_period: (progress / 100.0 * MONTH_DURATION_MS as f64) as u64,
        investments,
        stack_cards: vec![card],
        active_card_index: 0,
        completed_stacks: 0,
        trade_log: Vec::new(),
    };

    SnapshotV2 {
        saved_at: Utc::now(),
        active_portfolio_id: Some(portfolio.id),
        portfolios: vec![portfolio],
    }
}

/// Best-effort repair of persisted data: clamp, re-derive, and re-sync so
/// loading always yields a usable portfolio. Never fails.
pub fn normalize_portfolio(portfolio: &mut Portfolio) {
    if portfolio.monthly_contribution <= 0.0 {
        portfolio.monthly_contribution = if portfolio.block_value > 0.0 {
            portfolio.block_value
        } else {
            LEGACY_BLOCK_VALUE
        };
        warn!(
            portfolio = %portfolio.name,
            "repaired non-positive monthly contribution"
        );
    }
    if portfolio.block_value <= 0.0 {
        portfolio.block_value = portfolio.monthly_contribution;
        warn!(portfolio = %portfolio.name, "repaired non-positive block value");
    }
    let block_value = portfolio.block_value;

    if !portfolio.investments.is_empty() {
        let percent_sum: f64 = portfolio
            .investments
            .iter()
            .map(|inv| inv.requested_percent.max(0.0))
            .sum();
        if (percent_sum - 100.0).abs() > PERCENT_SUM_TOLERANCE {
            warn!(
                portfolio = %portfolio.name,
                percent_sum,
                "repairing allocation percentages that do not sum to 100"
            );
            if percent_sum <= 0.0 {
                let even = 100.0 / portfolio.investments.len() as f64;
                for inv in &mut portfolio.investments {
                    inv.requested_percent = even;
                }
            } else {
                for inv in &mut portfolio.investments {
                    inv.requested_percent = inv.requested_percent.max(0.0) / percent_sum * 100.0;
                }
            }
        }
    }

    for inv in &mut portfolio.investments {
        if inv.slot_target == 0 {
            warn!(investment = %inv.name, "repaired zero slot target");
            inv.slot_target = 1;
        }
        if inv.overflow_rate_per_minute < 0.0 {
            inv.overflow_rate_per_minute = 0.0;
        }
        if inv.existing_amount < 0.0 {
            inv.existing_amount = 0.0;
        }
        if inv.overflow_dollars < 0.0 {
            inv.overflow_dollars = 0.0;
        }
        while block_value > 0.0 && inv.overflow_dollars >= block_value {
            inv.overflow_dollars -= block_value;
            inv.starting_filled_blocks += 1;
        }
    }

    let full_stack_size: u32 = portfolio.investments.iter().map(|inv| inv.slot_target).sum();
    if portfolio.full_stack_size != full_stack_size {
        debug!(
            portfolio = %portfolio.name,
            "re-derived full stack size from slot targets"
        );
        portfolio.full_stack_size = full_stack_size;
    }

    if portfolio.month_counter == 0 {
        portfolio.month_counter = 1;
    }
    while portfolio.elapsed_ms_in_period >= MONTH_DURATION_MS {
        portfolio.elapsed_ms_in_period -= MONTH_DURATION_MS;
    }
    if portfolio.cash_balance < 0.0 {
        portfolio.cash_balance = 0.0;
    }
    while block_value > 0.0 && portfolio.cash_balance >= block_value {
        portfolio.cash_balance -= block_value;
        portfolio.waiting_room_blocks += 1;
    }

    LedgerService::new().sync_state(portfolio);
}
