pub mod errors;
pub mod models;
pub mod services;
pub mod storage;

use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use errors::CoreError;
use models::{
    draft::PortfolioDraft,
    portfolio::Portfolio,
    report::QuickReport,
    trade::TradeEntry,
};
use services::{
    clock_service::ClockService, growth_service::GrowthService, ledger_service::LedgerService,
    reconcile_service::ReconcileService, report_service::ReportService,
    template_service::TemplateService,
};
use storage::manager::StorageManager;
use storage::snapshot::SnapshotV2;

/// Main entry point for the Stack Budget core library.
///
/// Owns the whole application state — every portfolio plus the services
/// that operate on it — and is the single writer: UI event handlers and
/// the driving timer both call into this one object. No ambient globals.
#[must_use]
pub struct StackBudget {
    portfolios: Vec<Portfolio>,
    active_portfolio_id: Option<Uuid>,
    template_service: TemplateService,
    clock_service: ClockService,
    ledger_service: LedgerService,
    reconcile_service: ReconcileService,
    growth_service: GrowthService,
    report_service: ReportService,
    /// Tracks whether any mutation has occurred since the last save/load.
    dirty: bool,
}

impl std::fmt::Debug for StackBudget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StackBudget")
            .field("portfolios", &self.portfolios.len())
            .field("active_portfolio_id", &self.active_portfolio_id)
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl StackBudget {
    /// Create a brand new empty application state.
    pub fn create_new() -> Self {
        Self::build(Vec::new(), None)
    }

    /// Load application state from snapshot bytes.
    /// Use this for WASM / Tauri where the frontend handles file I/O.
    pub fn load_from_bytes(data: &[u8]) -> Result<Self, CoreError> {
        let snapshot = StorageManager::load_from_bytes(data)?;
        Ok(Self::from_snapshot(snapshot))
    }

    /// Save the current state to snapshot bytes.
    /// Clears the unsaved-changes flag on success.
    pub fn save_to_bytes(&mut self) -> Result<Vec<u8>, CoreError> {
        let bytes = StorageManager::save_to_bytes(&self.snapshot())?;
        self.dirty = false;
        Ok(bytes)
    }

    /// Load from a snapshot file on disk (native only, not WASM).
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_file(path: &str) -> Result<Self, CoreError> {
        let snapshot = StorageManager::load_from_file(path)?;
        Ok(Self::from_snapshot(snapshot))
    }

    /// Save to a snapshot file on disk (native only, not WASM).
    /// Clears the unsaved-changes flag on success.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to_file(&mut self, path: &str) -> Result<(), CoreError> {
        StorageManager::save_to_file(&self.snapshot(), path)?;
        self.dirty = false;
        Ok(())
    }

    // ── Portfolio Management ────────────────────────────────────────

    /// Create a portfolio from a validated draft. Existing-amount figures
    /// from the draft are reconciled into the ledger immediately.
    pub fn create_portfolio(&mut self, draft: &PortfolioDraft) -> Result<Uuid, CoreError> {
        let mut portfolio = self.template_service.build(draft)?;
        let amounts = Self::existing_amounts(&portfolio);
        self.reconcile_service.reconcile(&mut portfolio, &amounts);

        let id = portfolio.id;
        self.portfolios.push(portfolio);
        if self.active_portfolio_id.is_none() {
            self.active_portfolio_id = Some(id);
        }
        self.dirty = true;
        Ok(id)
    }

    /// Apply an edit draft to an existing portfolio: a brand-new slot
    /// assignment, with filled progress re-mapped onto the new shape by
    /// the reconciler. A validation error leaves the portfolio untouched.
    pub fn edit_portfolio(
        &mut self,
        portfolio_id: Uuid,
        draft: &PortfolioDraft,
    ) -> Result<(), CoreError> {
        let template_service = &self.template_service;
        let reconcile_service = &self.reconcile_service;

        let portfolio = Self::find_in(&mut self.portfolios, portfolio_id)?;
        template_service.rebuild(portfolio, draft)?;
        let amounts = Self::existing_amounts(portfolio);
        reconcile_service.reconcile(portfolio, &amounts);

        self.dirty = true;
        Ok(())
    }

    /// Remove a portfolio. The active selection falls back to the first
    /// remaining portfolio, if any.
    pub fn remove_portfolio(&mut self, portfolio_id: Uuid) -> Result<(), CoreError> {
        let idx = self
            .portfolios
            .iter()
            .position(|p| p.id == portfolio_id)
            .ok_or_else(|| CoreError::PortfolioNotFound(portfolio_id.to_string()))?;
        self.portfolios.remove(idx);

        if self.active_portfolio_id == Some(portfolio_id) {
            self.active_portfolio_id = self.portfolios.first().map(|p| p.id);
        }
        self.dirty = true;
        Ok(())
    }

    /// Switch the active portfolio selection.
    pub fn select_portfolio(&mut self, portfolio_id: Uuid) -> Result<(), CoreError> {
        if !self.portfolios.iter().any(|p| p.id == portfolio_id) {
            return Err(CoreError::PortfolioNotFound(portfolio_id.to_string()));
        }
        self.active_portfolio_id = Some(portfolio_id);
        self.dirty = true;
        Ok(())
    }

    #[must_use]
    pub fn portfolios(&self) -> &[Portfolio] {
        &self.portfolios
    }

    #[must_use]
    pub fn portfolio(&self, portfolio_id: Uuid) -> Option<&Portfolio> {
        self.portfolios.iter().find(|p| p.id == portfolio_id)
    }

    #[must_use]
    pub fn active_portfolio(&self) -> Option<&Portfolio> {
        self.active_portfolio_id.and_then(|id| self.portfolio(id))
    }

    #[must_use]
    pub fn active_portfolio_id(&self) -> Option<Uuid> {
        self.active_portfolio_id
    }

    #[must_use]
    pub fn portfolio_count(&self) -> usize {
        self.portfolios.len()
    }

    // ── Allocation ──────────────────────────────────────────────────

    /// Place one waiting-room block into a crate on the active card.
    /// `Ok(false)` is the normal "nothing to place / crate full" outcome;
    /// only an unknown portfolio id is an error.
    pub fn allocate(&mut self, portfolio_id: Uuid, crate_id: Uuid) -> Result<bool, CoreError> {
        let ledger_service = &self.ledger_service;
        let portfolio = Self::find_in(&mut self.portfolios, portfolio_id)?;
        let placed = ledger_service.allocate(portfolio, crate_id);
        if placed {
            self.dirty = true;
        }
        Ok(placed)
    }

    /// Move one filled block between two crates of the active card.
    pub fn move_block(
        &mut self,
        portfolio_id: Uuid,
        from_crate_id: Uuid,
        to_crate_id: Uuid,
    ) -> Result<bool, CoreError> {
        let ledger_service = &self.ledger_service;
        let portfolio = Self::find_in(&mut self.portfolios, portfolio_id)?;
        let moved = ledger_service.move_block(portfolio, from_crate_id, to_crate_id);
        if moved {
            self.dirty = true;
        }
        Ok(moved)
    }

    /// Re-project per-crate existing-amount figures onto the ledger.
    pub fn reconcile(
        &mut self,
        portfolio_id: Uuid,
        amounts: &HashMap<Uuid, f64>,
    ) -> Result<(), CoreError> {
        let reconcile_service = &self.reconcile_service;
        let portfolio = Self::find_in(&mut self.portfolios, portfolio_id)?;
        reconcile_service.reconcile(portfolio, amounts);
        self.dirty = true;
        Ok(())
    }

    // ── Simulation ──────────────────────────────────────────────────

    /// One driver tick for every portfolio: contribution clock first,
    /// then overflow growth, in that fixed order. The caller flushes
    /// state after ticking.
    pub fn tick(&mut self, ms: u64) {
        if ms == 0 || self.portfolios.is_empty() {
            return;
        }
        for portfolio in &mut self.portfolios {
            self.clock_service.advance(portfolio, ms);
            self.growth_service.tick(portfolio, ms);
        }
        self.dirty = true;
    }

    // ── Reports ─────────────────────────────────────────────────────

    /// Read-only progress numbers for the UI to render.
    pub fn quick_report(&self, portfolio_id: Uuid) -> Result<QuickReport, CoreError> {
        let portfolio = self
            .portfolio(portfolio_id)
            .ok_or_else(|| CoreError::PortfolioNotFound(portfolio_id.to_string()))?;
        Ok(self.report_service.quick_report(portfolio))
    }

    /// The portfolio's trade log, oldest first.
    pub fn trade_log(&self, portfolio_id: Uuid) -> Result<&[TradeEntry], CoreError> {
        let portfolio = self
            .portfolio(portfolio_id)
            .ok_or_else(|| CoreError::PortfolioNotFound(portfolio_id.to_string()))?;
        Ok(&portfolio.trade_log)
    }

    /// Returns `true` if state has been modified since the last save or load.
    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    // ── Internal ────────────────────────────────────────────────────

    fn build(portfolios: Vec<Portfolio>, active_portfolio_id: Option<Uuid>) -> Self {
        Self {
            portfolios,
            active_portfolio_id,
            template_service: TemplateService::new(),
            clock_service: ClockService::new(),
            ledger_service: LedgerService::new(),
            reconcile_service: ReconcileService::new(),
            growth_service: GrowthService::new(),
            report_service: ReportService::new(),
            dirty: false,
        }
    }

    fn from_snapshot(snapshot: SnapshotV2) -> Self {
        let active = snapshot
            .active_portfolio_id
            .filter(|id| snapshot.portfolios.iter().any(|p| p.id == *id))
            .or_else(|| snapshot.portfolios.first().map(|p| p.id));
        Self::build(snapshot.portfolios, active)
    }

    fn snapshot(&self) -> SnapshotV2 {
        SnapshotV2 {
            saved_at: Utc::now(),
            active_portfolio_id: self.active_portfolio_id,
            portfolios: self.portfolios.clone(),
        }
    }

    fn existing_amounts(portfolio: &Portfolio) -> HashMap<Uuid, f64> {
        portfolio
            .investments
            .iter()
            .map(|inv| (inv.id, inv.existing_amount))
            .collect()
    }

    fn find_in(portfolios: &mut [Portfolio], portfolio_id: Uuid) -> Result<&mut Portfolio, CoreError> {
        portfolios
            .iter_mut()
            .find(|p| p.id == portfolio_id)
            .ok_or_else(|| CoreError::PortfolioNotFound(portfolio_id.to_string()))
    }
}
