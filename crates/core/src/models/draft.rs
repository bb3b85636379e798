use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::portfolio::Portfolio;

/// Editable copy of a portfolio's settings. Drafts are validated and
/// turned into a real template by the template service; nothing here
/// touches live portfolio state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioDraft {
    pub name: String,
    pub monthly_contribution: f64,
    pub investments: Vec<DraftInvestment>,
}

/// One row of the survey / settings form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftInvestment {
    /// Present when editing an existing investment; `None` for new rows.
    pub crate_id: Option<Uuid>,

    pub name: String,

    /// Requested allocation percentage (0–100).
    pub target_percent: f64,

    /// Dollars already invested in this crate.
    pub existing_amount: f64,

    /// Set once the user typed a percentage by hand. Manual rows are
    /// locked: auto-distribution only touches the unlocked remainder.
    #[serde(default)]
    pub percent_manual: bool,
}

impl DraftInvestment {
    pub fn new(name: impl Into<String>, target_percent: f64) -> Self {
        Self {
            crate_id: None,
            name: name.into(),
            target_percent,
            existing_amount: 0.0,
            percent_manual: false,
        }
    }
}

impl PortfolioDraft {
    pub fn new(
        name: impl Into<String>,
        monthly_contribution: f64,
        investments: Vec<DraftInvestment>,
    ) -> Self {
        Self {
            name: name.into(),
            monthly_contribution,
            investments,
        }
    }

    /// Load a draft from a live portfolio for editing.
    #[must_use]
    pub fn from_portfolio(portfolio: &Portfolio) -> Self {
        Self {
            name: portfolio.name.clone(),
            monthly_contribution: portfolio.monthly_contribution,
            investments: portfolio
                .investments
                .iter()
                .map(|inv| DraftInvestment {
                    crate_id: Some(inv.id),
                    name: inv.name.clone(),
                    target_percent: inv.requested_percent,
                    existing_amount: inv.existing_amount,
                    percent_manual: false,
                })
                .collect(),
        }
    }

    /// Append a fresh row and re-split all percentages evenly (the last
    /// row absorbs the rounding drift so the total stays exactly 100).
    /// Rows are capped at 20; beyond that this is a no-op.
    pub fn add_investment(&mut self) {
        if self.investments.len() >= 20 {
            return;
        }
        self.investments.push(DraftInvestment::new("", 0.0));
        for row in &mut self.investments {
            row.percent_manual = false;
            row.target_percent = 0.0;
        }
        self.auto_distribute();
    }

    /// A percentage was typed into row `changed_index`. Locks that row,
    /// clamps the value against the other locked rows, and proportionally
    /// redistributes whatever remains of 100% over the unlocked rows.
    pub fn rebalance_from(&mut self, changed_index: usize, value: f64) {
        if changed_index >= self.investments.len() {
            return;
        }

        self.investments[changed_index].percent_manual = true;

        let locked_other_total: f64 = self
            .investments
            .iter()
            .enumerate()
            .filter(|(idx, row)| *idx != changed_index && row.percent_manual)
            .map(|(_, row)| row.target_percent)
            .sum();

        let bounded = round_to_tenth(value.clamp(0.0, (100.0 - locked_other_total).max(0.0)));
        self.investments[changed_index].target_percent = bounded;

        let unlocked_target = (100.0 - locked_other_total - bounded).max(0.0);
        let unlocked: Vec<usize> = self
            .investments
            .iter()
            .enumerate()
            .filter(|(idx, row)| *idx != changed_index && !row.percent_manual)
            .map(|(idx, _)| idx)
            .collect();
        self.distribute_remainder(&unlocked, unlocked_target);
    }

    /// Re-split everything that isn't manually locked so the total is 100.
    pub fn auto_distribute(&mut self) {
        let locked_total: f64 = self
            .investments
            .iter()
            .filter(|row| row.percent_manual)
            .map(|row| row.target_percent)
            .sum();
        let unlocked: Vec<usize> = self
            .investments
            .iter()
            .enumerate()
            .filter(|(_, row)| !row.percent_manual)
            .map(|(idx, _)| idx)
            .collect();
        self.distribute_remainder(&unlocked, (100.0 - locked_total).max(0.0));
    }

    /// Scale the rows at `indexes` so they sum to `target_total`, rounding
    /// to tenths. The last row absorbs the rounding drift so the group
    /// total stays exact.
    fn distribute_remainder(&mut self, indexes: &[usize], target_total: f64) {
        if indexes.is_empty() {
            return;
        }

        let current_total: f64 = indexes
            .iter()
            .map(|&idx| self.investments[idx].target_percent)
            .sum();

        if current_total <= 0.0 {
            let even = target_total / indexes.len() as f64;
            for &idx in indexes {
                self.investments[idx].target_percent = round_to_tenth(even);
            }
        } else {
            for &idx in indexes {
                let row = &mut self.investments[idx];
                row.target_percent =
                    round_to_tenth(row.target_percent / current_total * target_total);
            }
        }

        let rounded_total: f64 = indexes
            .iter()
            .map(|&idx| self.investments[idx].target_percent)
            .sum();
        let Some(&last) = indexes.last() else { return };
        self.investments[last].target_percent =
            round_to_tenth(self.investments[last].target_percent + (target_total - rounded_total));
    }
}

/// Percent inputs work in tenths of a percent.
pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
