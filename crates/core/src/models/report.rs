use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Progress of one crate in the active card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrateProgress {
    pub crate_id: Uuid,
    pub crate_name: String,

    /// Dollars held in the active card's crate
    pub current_value: f64,

    /// slot_target × block_value
    pub max_value: f64,
}

/// Read-only progress numbers for the UI layer. The core computes these;
/// rendering them is entirely the caller's problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickReport {
    /// Invested + cash
    pub total_portfolio_value: f64,

    /// Dollars across every card plus sub-block overflow
    pub total_invested_value: f64,

    /// Cash balance plus waiting-room blocks at block value
    pub total_cash_value: f64,

    /// Maximum dollar value of one complete card
    pub full_stack_value: f64,

    /// Dollars held on the active card
    pub current_stack_value: f64,

    pub per_crate: Vec<CrateProgress>,
}

/// A cell in the square block-display grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutCell {
    pub row: usize,
    pub col: usize,
    pub filled: bool,
}

/// Square grid layout for rendering `block_count` blocks: the smallest
/// n×n grid that fits them, cells filled row-major.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrateLayout {
    pub grid_size: usize,
    pub cells: Vec<LayoutCell>,
}

impl CrateLayout {
    #[must_use]
    pub fn for_block_count(block_count: u32) -> Self {
        let count = block_count as usize;
        let grid_size = ((count as f64).sqrt().ceil() as usize).max(1);
        let cells = (0..grid_size * grid_size)
            .map(|index| LayoutCell {
                row: index / grid_size,
                col: index % grid_size,
                filled: index < count,
            })
            .collect();
        Self { grid_size, cells }
    }
}
