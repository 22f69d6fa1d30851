//! Reconciliation orchestrator.
//!
//! Every mutating operation is one [`LedgerStore::transaction`]: either the
//! whole change (lines, counters, status, claims) commits or nothing does.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use finrecon_ledger::{LedgerStore, TransactionSource};
use finrecon_matchcore::match_statement;
use finrecon_types::{
    FinreconError, ItemId, ItemOrigin, ItemStatus, LedgerRecord, LedgerRecordId, MatchConfig,
    MatchType, Money, Period, RawStatementRow, ReconciliationItem, ReconciliationRun,
    ReconciliationType, Resolution, Result, RunId, RunStatus, RunSummary, StatementItem,
    constants, invariants, statement_digest,
};

/// One statement import, ready to be reconciled.
#[derive(Debug, Clone)]
pub struct StatementImport {
    pub run_type: ReconciliationType,
    pub period: Period,
    pub source_name: String,
    pub items: Vec<StatementItem>,
}

impl StatementImport {
    /// Parse importer rows. The first bad row fails the whole import.
    ///
    /// # Errors
    /// Returns `Validation` naming the offending row.
    pub fn from_rows(
        run_type: ReconciliationType,
        period: Period,
        source_name: impl Into<String>,
        rows: Vec<RawStatementRow>,
    ) -> Result<Self> {
        let items = rows
            .into_iter()
            .enumerate()
            .map(|(idx, row)| {
                StatementItem::try_from(row).map_err(|e| {
                    FinreconError::validation(format!("statement line {}: {e}", idx + 1))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            run_type,
            period,
            source_name: source_name.into(),
            items,
        })
    }
}

/// A committed run and its lines in line order.
#[derive(Debug, Clone)]
pub struct ReconciliationResult {
    pub run: ReconciliationRun,
    pub items: Vec<ReconciliationItem>,
}

/// Runs statement matching and operator remediation against the store.
pub struct Reconciler {
    store: Arc<LedgerStore>,
    source: Arc<dyn TransactionSource>,
    config: MatchConfig,
}

impl Reconciler {
    /// # Errors
    /// Returns `Configuration` if `config` is invalid.
    pub fn new(
        store: Arc<LedgerStore>,
        source: Arc<dyn TransactionSource>,
        config: MatchConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            source,
            config,
        })
    }

    #[must_use]
    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Reconcile an import against the completed ledger records of its period.
    ///
    /// # Errors
    /// See [`Reconciler::reconcile`]; collaborator failures are propagated.
    pub fn reconcile_import(&self, import: &StatementImport) -> Result<ReconciliationResult> {
        let records = self.source.completed_records(&import.period)?;
        self.reconcile(
            import.run_type,
            import.period,
            &import.source_name,
            &import.items,
            &records,
        )
    }

    /// Match a statement against ledger records and persist the run.
    ///
    /// Records already claimed by an earlier run are left out of the pool
    /// and out of the ledger balance. Duplicate record IDs keep their first
    /// occurrence.
    ///
    /// # Errors
    /// - `Validation` for a blank source name or an amount over the per-line limit
    /// - `Overflow` if a balance does not fit in minor units
    /// - `DuplicateStatement` if the identical statement was already imported
    /// - `InvariantViolation` if the run fails its foot-check
    pub fn reconcile(
        &self,
        run_type: ReconciliationType,
        period: Period,
        source_name: &str,
        statement: &[StatementItem],
        ledger_records: &[LedgerRecord],
    ) -> Result<ReconciliationResult> {
        let source_name = source_name.trim();
        if source_name.is_empty() {
            return Err(FinreconError::validation("source name is required"));
        }
        let outside = statement.iter().filter(|s| !period.contains(s.date)).count();
        if outside > 0 {
            tracing::warn!(
                source = source_name,
                period = %period,
                lines = outside,
                "Statement lines dated outside the run period"
            );
        }
        let digest = statement_digest(source_name, &period, statement);

        let result = self.store.transaction(|tx| {
            if let Some(existing) = tx.run_for_digest(&digest) {
                return Err(FinreconError::DuplicateStatement {
                    digest: digest.clone(),
                    run: existing,
                });
            }

            let mut seen = HashSet::new();
            let pool: Vec<LedgerRecord> = ledger_records
                .iter()
                .filter(|r| tx.claimant(&r.id).is_none() && seen.insert(r.id.clone()))
                .cloned()
                .collect();

            let run_id = RunId::new();
            let outcome = match_statement(run_id, statement, &pool, &self.config)?;
            let variance = outcome.variance()?;
            let now = Utc::now();
            let mut run = ReconciliationRun {
                id: run_id,
                run_type,
                period,
                source_name: source_name.to_string(),
                total_items: outcome.total_items(),
                matched_count: outcome.matched_count,
                unmatched_count: outcome.unmatched_count,
                auto_matched_count: outcome.matched_count,
                manual_matched_count: 0,
                resolved_count: 0,
                source_balance: outcome.source_balance,
                ledger_balance: outcome.ledger_balance,
                variance,
                status: RunStatus::Unmatched,
                statement_digest: digest.clone(),
                created_at: now,
                updated_at: now,
            };
            run.recompute_status();
            tx.insert_run(run.clone(), outcome.items.clone())?;
            Ok(ReconciliationResult {
                run,
                items: outcome.items,
            })
        })?;

        tracing::info!(
            run = %result.run.id,
            source = %result.run.source_name,
            run_type = %result.run.run_type,
            total = result.run.total_items,
            matched = result.run.matched_count,
            unmatched = result.run.unmatched_count,
            variance = %result.run.variance,
            status = %result.run.status,
            "Reconciliation run completed"
        );
        Ok(result)
    }

    /// Force-link an open statement line to a ledger record.
    ///
    /// If the record sits in the same run as an open orphan line, that line
    /// is closed as MATCHED too and its variance moves onto the statement
    /// line, so the run variance is unchanged. A record whose orphan line in
    /// the run was already written off cannot be linked.
    ///
    /// # Errors
    /// - `ItemNotFound` / `LedgerRecordNotFound`
    /// - `ItemAlreadyMatched` if the line is MATCHED
    /// - `InvalidStateTransition` if the line is RESOLVED, or the record's
    ///   orphan line in the same run is RESOLVED
    /// - `Validation` for orphan lines, a blank operator, or a record amount
    ///   over the per-line limit
    /// - `LedgerRecordClaimed` if another line owns the record
    pub fn manual_match(
        &self,
        item_id: ItemId,
        ledger_id: &LedgerRecordId,
        resolved_by: &str,
        notes: Option<&str>,
    ) -> Result<ReconciliationItem> {
        let resolved_by = operator(resolved_by)?;
        let record = self
            .source
            .find_record(ledger_id)?
            .ok_or_else(|| FinreconError::LedgerRecordNotFound(ledger_id.clone()))?;
        record
            .amount
            .ensure_line_amount(&format!("ledger record {}", record.id))?;

        let item = self.store.transaction(|tx| {
            let current = tx.item(item_id)?;
            match current.status {
                ItemStatus::Matched => return Err(FinreconError::ItemAlreadyMatched(item_id)),
                ItemStatus::Resolved => {
                    return Err(FinreconError::transition(
                        format!("item {item_id}"),
                        current.status,
                        ItemStatus::Matched,
                    ));
                }
                ItemStatus::Pending | ItemStatus::Unmatched => {}
            }
            if current.origin == ItemOrigin::LedgerOrphan {
                return Err(FinreconError::validation(
                    "ledger orphan lines can only be resolved",
                ));
            }
            let run_id = current.run_id;
            let line_number = current.line_number;

            tx.claim(&record.id, item_id)?;

            let orphan = match tx.run_items(run_id)?.into_iter().find(|i| {
                i.origin == ItemOrigin::LedgerOrphan && i.ledger_id.as_ref() == Some(&record.id)
            }) {
                Some(o) if o.status.is_open() => Some(o.id),
                Some(o) => {
                    return Err(FinreconError::transition(
                        format!("ledger orphan line {} for record {}", o.line_number, record.id),
                        o.status,
                        ItemStatus::Matched,
                    ));
                }
                None => None,
            };

            let now = Utc::now();
            let resolution = Resolution {
                resolved_by: resolved_by.clone(),
                notes: notes.map(str::to_string),
                resolved_at: now,
            };

            let line = tx.item_mut(item_id)?;
            line.link(&record, MatchType::Manual, constants::CONFIDENCE_MANUAL);
            line.resolution = Some(resolution.clone());
            let linked = line.clone();

            let mut closed = 1u32;
            if let Some(orphan_id) = orphan {
                let orphan_line = tx.item_mut(orphan_id)?;
                orphan_line.status = ItemStatus::Matched;
                orphan_line.match_type = Some(MatchType::Manual);
                orphan_line.confidence = constants::CONFIDENCE_MANUAL;
                orphan_line.variance = Money::ZERO;
                orphan_line.resolution = Some(Resolution {
                    notes: Some(format!("linked to statement line {line_number}")),
                    ..resolution
                });
                closed += 1;
            }

            let run = tx.run_mut(run_id)?;
            run.unmatched_count = decrement(run.unmatched_count, closed, run_id)?;
            run.matched_count += closed;
            run.manual_matched_count += closed;
            run.updated_at = now;
            run.recompute_status();
            invariants::check_run_counters(run)?;
            Ok(linked)
        })?;

        tracing::info!(
            item = %item.id,
            run = %item.run_id,
            ledger = %ledger_id,
            resolved_by = %resolved_by,
            "Item matched manually"
        );
        Ok(item)
    }

    /// Close an open line without a counterpart (write-off).
    ///
    /// # Errors
    /// - `ItemNotFound`
    /// - `InvalidStateTransition` if the line is already closed
    /// - `Validation` for a blank operator
    pub fn resolve_item(
        &self,
        item_id: ItemId,
        resolved_by: &str,
        notes: Option<&str>,
    ) -> Result<ReconciliationItem> {
        let resolved_by = operator(resolved_by)?;
        let item = self.store.transaction(|tx| {
            let now = Utc::now();
            let line = tx.item_mut(item_id)?;
            if !line.status.is_open() {
                return Err(FinreconError::transition(
                    format!("item {item_id}"),
                    line.status,
                    ItemStatus::Resolved,
                ));
            }
            line.status = ItemStatus::Resolved;
            line.suggested_ledger_id = None;
            line.resolution = Some(Resolution {
                resolved_by: resolved_by.clone(),
                notes: notes.map(str::to_string),
                resolved_at: now,
            });
            let resolved = line.clone();

            let run = tx.run_mut(resolved.run_id)?;
            run.unmatched_count = decrement(run.unmatched_count, 1, resolved.run_id)?;
            run.resolved_count += 1;
            run.updated_at = now;
            run.recompute_status();
            invariants::check_run_counters(run)?;
            Ok(resolved)
        })?;

        tracing::info!(
            item = %item.id,
            run = %item.run_id,
            variance = %item.variance,
            resolved_by = %resolved_by,
            "Item resolved"
        );
        Ok(item)
    }

    // ── Queries ────────────────────────────────────────────────

    /// # Errors
    /// Returns `RunNotFound` for an unknown run.
    pub fn run(&self, run_id: RunId) -> Result<ReconciliationRun> {
        self.store.read(|s| s.run(run_id).cloned())
    }

    /// Run summaries, oldest first, optionally filtered by status.
    #[must_use]
    pub fn run_summaries(&self, status: Option<RunStatus>) -> Vec<RunSummary> {
        self.store.read(|s| {
            s.runs()
                .filter(|r| status.is_none_or(|st| r.status == st))
                .map(ReconciliationRun::summary)
                .collect()
        })
    }

    /// Lines of a run in line order, optionally filtered by status.
    ///
    /// # Errors
    /// Returns `RunNotFound` for an unknown run.
    pub fn items(
        &self,
        run_id: RunId,
        status: Option<ItemStatus>,
    ) -> Result<Vec<ReconciliationItem>> {
        self.store.read(|s| {
            Ok(s.run_items(run_id)?
                .into_iter()
                .filter(|i| status.is_none_or(|st| i.status == st))
                .cloned()
                .collect())
        })
    }

    /// # Errors
    /// Returns `ItemNotFound` for an unknown line.
    pub fn item(&self, item_id: ItemId) -> Result<ReconciliationItem> {
        self.store.read(|s| s.item(item_id).cloned())
    }
}

fn operator(resolved_by: &str) -> Result<String> {
    let trimmed = resolved_by.trim();
    if trimmed.is_empty() {
        return Err(FinreconError::validation("resolved_by is required"));
    }
    Ok(trimmed.to_string())
}

fn decrement(count: u32, by: u32, run_id: RunId) -> Result<u32> {
    count
        .checked_sub(by)
        .ok_or_else(|| FinreconError::InvariantViolation {
            reason: format!("run {run_id}: unmatched count {count} cannot drop by {by}"),
        })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use finrecon_ledger::InMemoryTransactionSource;
    use finrecon_types::ErrorKind;

    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 17).unwrap()
    }

    fn stmt(reference: &str, amount: i64) -> StatementItem {
        StatementItem {
            reference: reference.into(),
            amount: Money(amount),
            date: day(),
            description: String::new(),
        }
    }

    fn rec(id: &str, reference: &str, amount: i64) -> LedgerRecord {
        LedgerRecord::dummy(id, reference, amount, day())
    }

    fn reconciler(records: Vec<LedgerRecord>) -> Reconciler {
        Reconciler::new(
            Arc::new(LedgerStore::new()),
            Arc::new(InMemoryTransactionSource::new(records)),
            MatchConfig::default(),
        )
        .unwrap()
    }

    fn run(r: &Reconciler, statement: &[StatementItem], pool: &[LedgerRecord]) -> ReconciliationResult {
        r.reconcile(
            ReconciliationType::PaymentProvider,
            Period::day(day()),
            "mpesa",
            statement,
            pool,
        )
        .unwrap()
    }

    #[test]
    fn blank_source_name_rejected() {
        let r = reconciler(vec![]);
        let err = r
            .reconcile(ReconciliationType::BankStatement, Period::day(day()), "  ", &[], &[])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationFailure);
    }

    #[test]
    fn empty_run_is_matched() {
        let r = reconciler(vec![]);
        let out = run(&r, &[], &[]);
        assert_eq!(out.run.total_items, 0);
        assert_eq!(out.run.status, RunStatus::Matched);
        assert_eq!(out.run.variance, Money::ZERO);
    }

    #[test]
    fn duplicate_ledger_ids_in_pool_keep_first() {
        let r = reconciler(vec![]);
        let pool = vec![rec("t1", "A", 100), rec("t1", "A", 100)];
        let out = run(&r, &[stmt("A", 100)], &pool);
        assert_eq!(out.run.total_items, 1);
        assert_eq!(out.run.ledger_balance, Money(100));
    }

    #[test]
    fn resolve_closes_run() {
        let r = reconciler(vec![]);
        let out = run(&r, &[stmt("A", 100)], &[]);
        assert_eq!(out.run.status, RunStatus::Unmatched);
        let item = r.resolve_item(out.items[0].id, "ops", Some("bank fee")).unwrap();
        assert_eq!(item.status, ItemStatus::Resolved);
        let header = r.run(out.run.id).unwrap();
        assert_eq!(header.status, RunStatus::Resolved);
        assert_eq!((header.unmatched_count, header.resolved_count), (0, 1));
    }

    #[test]
    fn resolving_twice_is_a_transition_error() {
        let r = reconciler(vec![]);
        let out = run(&r, &[stmt("A", 100)], &[]);
        r.resolve_item(out.items[0].id, "ops", None).unwrap();
        let err = r.resolve_item(out.items[0].id, "ops", None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidStateTransition);
    }

    #[test]
    fn blank_operator_rejected() {
        let r = reconciler(vec![]);
        let out = run(&r, &[stmt("A", 100)], &[]);
        let err = r.resolve_item(out.items[0].id, " ", None).unwrap_err();
        assert!(matches!(err, FinreconError::Validation { .. }));
        assert_eq!(r.run(out.run.id).unwrap().unmatched_count, 1);
    }

    #[test]
    fn unknown_item_is_not_found() {
        let r = reconciler(vec![]);
        let err = r.resolve_item(ItemId::new(), "ops", None).unwrap_err();
        assert!(matches!(err, FinreconError::ItemNotFound(_)));
    }

    #[test]
    fn orphan_line_cannot_be_manually_matched() {
        let orphan = rec("t9", "Z", 700);
        let r = reconciler(vec![orphan.clone()]);
        let out = run(&r, &[], &[orphan]);
        let err = r
            .manual_match(out.items[0].id, &LedgerRecordId::new("t9"), "ops", None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationFailure);
    }

    #[test]
    fn written_off_orphan_cannot_be_linked_later() {
        let late = rec("t9", "Z", 990);
        let r = reconciler(vec![late.clone()]);
        let out = run(&r, &[stmt("X", 500)], &[late]);
        let (line, orphan) = (&out.items[0], &out.items[1]);
        assert_eq!(orphan.origin, ItemOrigin::LedgerOrphan);
        r.resolve_item(orphan.id, "ops", Some("written off")).unwrap();

        let err = r
            .manual_match(line.id, &LedgerRecordId::new("t9"), "ops", None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidStateTransition);

        let header = r.run(out.run.id).unwrap();
        let items = r.items(out.run.id, None).unwrap();
        assert_eq!(items[0].status, ItemStatus::Unmatched);
        assert!(items[0].ledger_id.is_none());
        assert_eq!((header.matched_count, header.unmatched_count, header.resolved_count), (0, 1, 1));
        let variance_sum: Money = items.iter().map(|i| i.variance).sum();
        assert_eq!(variance_sum, header.variance);
        r.store
            .read(|s| assert!(s.claimant(&LedgerRecordId::new("t9")).is_none()));
    }

    #[test]
    fn balances_past_i64_are_rejected_not_wrapped() {
        let r = reconciler(vec![]);
        let big = constants::MAX_LINE_AMOUNT_MINOR;
        let err = r
            .reconcile(
                ReconciliationType::BankStatement,
                Period::day(day()),
                "mpesa",
                &[stmt("A", i64::MAX / 2 + 1), stmt("B", i64::MAX / 2 + 1)],
                &[],
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationFailure);

        let out = run(&r, &[stmt("A", big), stmt("B", big)], &[rec("t1", "Z", -big)]);
        assert_eq!(out.run.source_balance, Money(2 * big));
        assert_eq!(out.run.variance, Money(3 * big));
        r.store.read(|s| assert_eq!(s.runs().count(), 1));
    }

    #[test]
    fn item_filter_by_status() {
        let r = reconciler(vec![]);
        let out = run(&r, &[stmt("A", 100), stmt("B", 200)], &[rec("t1", "A", 100)]);
        let open = r.items(out.run.id, Some(ItemStatus::Unmatched)).unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].source_reference.as_deref(), Some("B"));
        assert_eq!(r.items(out.run.id, None).unwrap().len(), 2);
        assert!(r.items(RunId::new(), None).is_err());
    }
}
