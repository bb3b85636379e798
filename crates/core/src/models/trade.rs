use serde::{Deserialize, Serialize};

/// Direction of a trade-log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeAction {
    /// Placing a block into a crate
    Buy,
    /// Pulling a block out of a crate
    Sell,
}

impl std::fmt::Display for TradeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeAction::Buy => write!(f, "BUY"),
            TradeAction::Sell => write!(f, "SELL"),
        }
    }
}

/// A single entry in a portfolio's trade log, appended whenever a block
/// is allocated into or moved between crates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEntry {
    pub action: TradeAction,

    /// Display name of the crate at the time of the trade
    pub crate_name: String,

    /// Dollar amount moved (one block value)
    pub amount_dollars: f64,

    /// Simulated month the trade happened in
    pub month: u32,
}

impl TradeEntry {
    pub fn buy(crate_name: impl Into<String>, amount_dollars: f64, month: u32) -> Self {
        Self {
            action: TradeAction::Buy,
            crate_name: crate_name.into(),
            amount_dollars,
            month,
        }
    }

    pub fn sell(crate_name: impl Into<String>, amount_dollars: f64, month: u32) -> Self {
        Self {
            action: TradeAction::Sell,
            crate_name: crate_name.into(),
            amount_dollars,
            month,
        }
    }
}

impl std::fmt::Display for TradeEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} - ${}", self.action, self.crate_name, self.amount_dollars)
    }
}
