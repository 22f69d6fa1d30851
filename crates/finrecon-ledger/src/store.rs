//! In-memory ledger store with all-or-nothing transactions.
//!
//! [`StoreState`] holds run headers, run items, ledger-record claims,
//! partners, settlements and settlement line items. [`LedgerStore`] wraps it
//! in a lock and only exposes mutation through [`LedgerStore::transaction`],
//! which applies a closure to a private copy of the state and publishes the
//! copy only if the closure returns `Ok`.

use std::collections::{BTreeMap, HashMap};

use finrecon_types::{
    ErrorKind, FinreconError, ItemId, LedgerRecordId, Partner, PartnerId, ReconciliationItem,
    ReconciliationRun, Result, RunId, Settlement, SettlementId, SettlementLineItem, invariants,
};
use parking_lot::RwLock;

use crate::idempotency::PayoutReferenceGuard;

/// Everything the store persists.
#[derive(Debug, Clone, Default)]
pub struct StoreState {
    runs: BTreeMap<RunId, ReconciliationRun>,
    items: HashMap<ItemId, ReconciliationItem>,
    /// Items of each run, in line order.
    run_items: HashMap<RunId, Vec<ItemId>>,
    /// Statement digest -> run that imported it.
    digests: HashMap<String, RunId>,
    /// Ledger record -> item that claimed it, across all runs.
    claims: HashMap<LedgerRecordId, ItemId>,
    partners: HashMap<PartnerId, Partner>,
    settlements: BTreeMap<SettlementId, Settlement>,
    line_items: HashMap<SettlementId, Vec<SettlementLineItem>>,
    settlement_sequence: u64,
    payout_references: PayoutReferenceGuard,
}

impl StoreState {
    // ── Runs ───────────────────────────────────────────────────

    /// Insert a new run with all its items and claim every linked ledger record.
    ///
    /// # Errors
    /// - `DuplicateStatement` if a run with the same digest exists
    /// - `LedgerRecordClaimed` if a linked record is already claimed
    /// - `InvariantViolation` if header counters disagree with the items
    pub fn insert_run(
        &mut self,
        run: ReconciliationRun,
        items: Vec<ReconciliationItem>,
    ) -> Result<()> {
        if let Some(existing) = self.digests.get(&run.statement_digest) {
            return Err(FinreconError::DuplicateStatement {
                digest: run.statement_digest.clone(),
                run: *existing,
            });
        }
        invariants::check_run_items(&run, &items)?;

        let mut ids = Vec::with_capacity(items.len());
        for item in items {
            if item.status == finrecon_types::ItemStatus::Matched {
                if let Some(ledger_id) = &item.ledger_id {
                    self.claim(ledger_id, item.id)?;
                }
            }
            ids.push(item.id);
            self.items.insert(item.id, item);
        }
        self.run_items.insert(run.id, ids);
        self.digests.insert(run.statement_digest.clone(), run.id);
        self.runs.insert(run.id, run);
        Ok(())
    }

    pub fn run(&self, id: RunId) -> Result<&ReconciliationRun> {
        self.runs.get(&id).ok_or(FinreconError::RunNotFound(id))
    }

    pub fn run_mut(&mut self, id: RunId) -> Result<&mut ReconciliationRun> {
        self.runs.get_mut(&id).ok_or(FinreconError::RunNotFound(id))
    }

    /// The run that imported a statement with this digest.
    pub fn run_for_digest(&self, digest: &str) -> Option<RunId> {
        self.digests.get(digest).copied()
    }

    /// All runs, oldest first.
    pub fn runs(&self) -> impl Iterator<Item = &ReconciliationRun> {
        self.runs.values()
    }

    pub fn item(&self, id: ItemId) -> Result<&ReconciliationItem> {
        self.items.get(&id).ok_or(FinreconError::ItemNotFound(id))
    }

    pub fn item_mut(&mut self, id: ItemId) -> Result<&mut ReconciliationItem> {
        self.items.get_mut(&id).ok_or(FinreconError::ItemNotFound(id))
    }

    /// Items of a run in line order.
    pub fn run_items(&self, run_id: RunId) -> Result<Vec<&ReconciliationItem>> {
        let ids = self
            .run_items
            .get(&run_id)
            .ok_or(FinreconError::RunNotFound(run_id))?;
        ids.iter().map(|id| self.item(*id)).collect()
    }

    /// The item currently owning a ledger record, if any.
    pub fn claimant(&self, ledger_id: &LedgerRecordId) -> Option<ItemId> {
        self.claims.get(ledger_id).copied()
    }

    /// Record that `item` owns `ledger_id`.
    ///
    /// # Errors
    /// Returns `LedgerRecordClaimed` if another item already owns it.
    pub fn claim(&mut self, ledger_id: &LedgerRecordId, item: ItemId) -> Result<()> {
        match self.claims.get(ledger_id) {
            Some(owner) if *owner != item => {
                Err(FinreconError::LedgerRecordClaimed(ledger_id.clone()))
            }
            _ => {
                self.claims.insert(ledger_id.clone(), item);
                Ok(())
            }
        }
    }

    // ── Partners ───────────────────────────────────────────────

    pub fn upsert_partner(&mut self, partner: Partner) {
        self.partners.insert(partner.id, partner);
    }

    pub fn partner(&self, id: PartnerId) -> Result<&Partner> {
        self.partners.get(&id).ok_or(FinreconError::PartnerNotFound(id))
    }

    // ── Settlements ────────────────────────────────────────────

    /// Allocate the next settlement sequence number.
    pub fn next_settlement_sequence(&mut self) -> u64 {
        self.settlement_sequence += 1;
        self.settlement_sequence
    }

    /// Insert a settlement and its line items.
    ///
    /// # Errors
    /// Returns `InvariantViolation` if the total differs from the line sum.
    pub fn insert_settlement(
        &mut self,
        settlement: Settlement,
        lines: Vec<SettlementLineItem>,
    ) -> Result<()> {
        invariants::check_settlement_foot(&settlement, &lines)?;
        self.line_items.insert(settlement.id, lines);
        self.settlements.insert(settlement.id, settlement);
        Ok(())
    }

    pub fn settlement(&self, id: SettlementId) -> Result<&Settlement> {
        self.settlements
            .get(&id)
            .ok_or(FinreconError::SettlementNotFound(id))
    }

    pub fn settlement_mut(&mut self, id: SettlementId) -> Result<&mut Settlement> {
        self.settlements
            .get_mut(&id)
            .ok_or(FinreconError::SettlementNotFound(id))
    }

    /// Line items of a settlement in line order.
    pub fn settlement_lines(&self, id: SettlementId) -> Result<&[SettlementLineItem]> {
        self.line_items
            .get(&id)
            .map(Vec::as_slice)
            .ok_or(FinreconError::SettlementNotFound(id))
    }

    /// All settlements, oldest first.
    pub fn settlements(&self) -> impl Iterator<Item = &Settlement> {
        self.settlements.values()
    }

    pub fn payout_references(&self) -> &PayoutReferenceGuard {
        &self.payout_references
    }

    pub fn payout_references_mut(&mut self) -> &mut PayoutReferenceGuard {
        &mut self.payout_references
    }
}

/// Shared, lock-protected store.
#[derive(Debug, Default)]
pub struct LedgerStore {
    state: RwLock<StoreState>,
}

impl LedgerStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` atomically.
    ///
    /// Transactions are serialized by the write lock. `f` sees a private copy
    /// of the state; the copy replaces the live state only when `f` returns
    /// `Ok`. On `Err` the live state is untouched.
    pub fn transaction<T>(&self, f: impl FnOnce(&mut StoreState) -> Result<T>) -> Result<T> {
        let mut live = self.state.write();
        let mut working = live.clone();
        match f(&mut working) {
            Ok(out) => {
                *live = working;
                Ok(out)
            }
            Err(err) => {
                match err.kind() {
                    ErrorKind::InvalidStateTransition | ErrorKind::InvariantViolation => {
                        tracing::warn!(code = err.code(), error = %err, "Transaction rolled back");
                    }
                    _ => tracing::debug!(code = err.code(), error = %err, "Transaction rolled back"),
                }
                Err(err)
            }
        }
    }

    /// Consistent read of the committed state.
    pub fn read<T>(&self, f: impl FnOnce(&StoreState) -> T) -> T {
        f(&self.state.read())
    }
}
