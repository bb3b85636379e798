use chrono::Utc;
use uuid::Uuid;

use crate::errors::CoreError;
use crate::models::draft::{DraftInvestment, PortfolioDraft};
use crate::models::investment::Investment;
use crate::models::portfolio::Portfolio;
use crate::models::stack_card::StackCard;
use crate::services::apportionment::{MinErrorApportionment, SlotApportionment};

/// The fixed menu of monthly contribution amounts.
pub const CONTRIBUTION_MENU: &[f64] = &[50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0];

/// Allowed investment count per portfolio, after blank rows are dropped.
pub const MIN_INVESTMENTS: usize = 2;
pub const MAX_INVESTMENTS: usize = 20;

/// Percentages are entered in tenths; sums may drift by float noise.
pub const PERCENT_SUM_TOLERANCE: f64 = 0.01;

/// Builds and rebuilds portfolio templates from validated drafts.
///
/// Pure business logic — validation always runs against the draft, so a
/// rejected edit leaves the live portfolio untouched. Slot targets come
/// from the configured apportionment policy; re-mapping filled progress
/// onto an edited shape is the reconciler's job, not this service's.
pub struct TemplateService {
    apportionment: Box<dyn SlotApportionment>,
}

impl TemplateService {
    pub fn new() -> Self {
        Self::with_policy(Box::new(MinErrorApportionment::default()))
    }

    pub fn with_policy(apportionment: Box<dyn SlotApportionment>) -> Self {
        Self { apportionment }
    }

    /// Build a brand-new portfolio from a draft.
    pub fn build(&self, draft: &PortfolioDraft) -> Result<Portfolio, CoreError> {
        let rows = self.validated_rows(draft)?;
        let investments = self.assign_slots(&rows);
        let full_stack_size = investments.iter().map(|inv| inv.slot_target).sum();

        let portfolio = Portfolio {
            id: Uuid::new_v4(),
            name: draft.name.trim().to_string(),
            created_at: Utc::now(),
            monthly_contribution: draft.monthly_contribution,
            block_value: draft.monthly_contribution,
            full_stack_size,
            cash_balance: 0.0,
            waiting_room_blocks: 0,
            month_counter: 1,
            elapsed_ms_in_period: 0,
            stack_cards: vec![StackCard::from_template(&investments)],
            investments,
            active_card_index: 0,
            completed_stacks: 0,
            trade_log: Vec::new(),
        };
        Ok(portfolio)
    }

    /// Apply an edit draft to an existing portfolio: validate first, then
    /// swap in the freshly apportioned template. Clock state and the trade
    /// log survive; the caller reconciles the ledger onto the new shape.
    pub fn rebuild(&self, portfolio: &mut Portfolio, draft: &PortfolioDraft) -> Result<(), CoreError> {
        let rows = self.validated_rows(draft)?;
        let investments = self.assign_slots(&rows);

        portfolio.name = draft.name.trim().to_string();
        portfolio.monthly_contribution = draft.monthly_contribution;
        portfolio.block_value = draft.monthly_contribution;
        portfolio.full_stack_size = investments.iter().map(|inv| inv.slot_target).sum();
        portfolio.investments = investments;
        Ok(())
    }

    fn assign_slots(&self, rows: &[DraftInvestment]) -> Vec<Investment> {
        let weights: Vec<f64> = rows.iter().map(|row| row.target_percent).collect();
        let plan = self.apportionment.compute_slot_targets(&weights);

        rows.iter()
            .zip(plan.slots)
            .map(|(row, slot_target)| Investment {
                id: row.crate_id.unwrap_or_else(Uuid::new_v4),
                name: row.name.trim().to_string(),
                requested_percent: row.target_percent,
                slot_target,
                overflow_rate_per_minute: 1.0,
                existing_amount: row.existing_amount.max(0.0),
                starting_filled_blocks: 0,
                overflow_dollars: 0.0,
            })
            .collect()
    }

    /// Drop blank-name rows, then check everything the survey can get wrong.
    fn validated_rows(&self, draft: &PortfolioDraft) -> Result<Vec<DraftInvestment>, CoreError> {
        if draft.name.trim().is_empty() {
            return Err(CoreError::ValidationError(
                "Portfolio name must not be blank".into(),
            ));
        }

        if !CONTRIBUTION_MENU
            .iter()
            .any(|&option| (option - draft.monthly_contribution).abs() < f64::EPSILON)
        {
            return Err(CoreError::ValidationError(format!(
                "Monthly contribution ${} is not one of the offered amounts",
                draft.monthly_contribution
            )));
        }

        let rows: Vec<DraftInvestment> = draft
            .investments
            .iter()
            .filter(|row| !row.name.trim().is_empty())
            .cloned()
            .collect();

        if rows.len() < MIN_INVESTMENTS || rows.len() > MAX_INVESTMENTS {
            return Err(CoreError::ValidationError(format!(
                "Expected between {MIN_INVESTMENTS} and {MAX_INVESTMENTS} named investments, got {}",
                rows.len()
            )));
        }

        for row in &rows {
            if !(0.0..=100.0).contains(&row.target_percent) {
                return Err(CoreError::ValidationError(format!(
                    "Allocation for '{}' must be between 0 and 100 percent",
                    row.name
                )));
            }
            if row.existing_amount < 0.0 {
                return Err(CoreError::ValidationError(format!(
                    "Existing amount for '{}' must not be negative",
                    row.name
                )));
            }
        }

        let percent_sum: f64 = rows.iter().map(|row| row.target_percent).sum();
        if (percent_sum - 100.0).abs() > PERCENT_SUM_TOLERANCE {
            return Err(CoreError::ValidationError(format!(
                "Allocation percentages must sum to 100, got {percent_sum:.2}"
            )));
        }

        Ok(rows)
    }
}

impl Default for TemplateService {
    fn default() -> Self {
        Self::new()
    }
}
