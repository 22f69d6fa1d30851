//! Reconciliation flow tests: statement import → matching → operator
//! remediation → run status, all through the shared store.

use std::sync::Arc;
use std::thread;

use chrono::NaiveDate;
use finrecon_ledger::{InMemoryTransactionSource, LedgerStore};
use finrecon_reconcile::{ReconciliationResult, Reconciler, StatementImport};
use finrecon_types::*;

/// Test harness bundling the store, the ledger source and the reconciler.
struct Desk {
    store: Arc<LedgerStore>,
    source: Arc<InMemoryTransactionSource>,
    reconciler: Reconciler,
}

impl Desk {
    fn new(records: Vec<LedgerRecord>) -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("finrecon=debug")
            .with_test_writer()
            .try_init();
        let store = Arc::new(LedgerStore::new());
        let source = Arc::new(InMemoryTransactionSource::new(records));
        let reconciler =
            Reconciler::new(Arc::clone(&store), source.clone(), MatchConfig::default()).unwrap();
        Self {
            store,
            source,
            reconciler,
        }
    }

    fn import(&self, source_name: &str, statement: Vec<StatementItem>) -> Result<ReconciliationResult> {
        let import = StatementImport {
            run_type: ReconciliationType::PaymentProvider,
            period: january(),
            source_name: source_name.into(),
            items: statement,
        };
        self.reconciler.reconcile_import(&import)
    }
}

fn january() -> Period {
    Period::month(2026, 1).unwrap()
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, d).unwrap()
}

fn stmt(reference: &str, amount: i64) -> StatementItem {
    StatementItem {
        reference: reference.into(),
        amount: Money(amount),
        date: day(17),
        description: "premium".into(),
    }
}

fn rec(id: &str, reference: &str, amount: i64) -> LedgerRecord {
    LedgerRecord::dummy(id, reference, amount, day(17))
}

// =========================================================================
// Automatic matching
// =========================================================================

#[test]
fn perfect_statement_fully_matched() {
    let desk = Desk::new(vec![
        rec("t1", "QK1", 1_000),
        rec("t2", "QK2", 2_500),
        rec("t3", "QK3", 400),
    ]);
    let out = desk
        .import("mpesa", vec![stmt("QK1", 1_000), stmt("QK2", 2_500), stmt("QK3", 400)])
        .unwrap();
    assert_eq!(out.run.status, RunStatus::Matched);
    assert_eq!(out.run.matched_count, 3);
    assert_eq!(out.run.auto_matched_count, 3);
    assert_eq!(out.run.unmatched_count, 0);
    assert_eq!(out.run.variance, Money::ZERO);
    assert!(out.items.iter().all(|i| i.match_type == Some(MatchType::Exact)));
}

#[test]
fn run_counters_and_variance_foot() {
    let desk = Desk::new(vec![rec("t1", "A", 1_000), rec("t2", "ZZ", 9_999)]);
    let out = desk
        .import("mpesa", vec![stmt("A", 1_000), stmt("B", 50), stmt("C", 75)])
        .unwrap();
    let run = &out.run;
    assert_eq!(
        run.matched_count + run.unmatched_count + run.resolved_count,
        run.total_items
    );
    assert_eq!(run.total_items, 4);
    assert_eq!(run.source_balance, Money(1_125));
    assert_eq!(run.ledger_balance, Money(10_999));
    assert_eq!(run.variance, run.source_balance - run.ledger_balance);
    let variance_sum: Money = out.items.iter().map(|i| i.variance).sum();
    assert_eq!(variance_sum, run.variance);
}

#[test]
fn identical_statement_rejected_second_time() {
    let desk = Desk::new(vec![]);
    let first = desk.import("mpesa", vec![stmt("A", 100)]).unwrap();
    let err = desk.import("mpesa", vec![stmt("A", 100)]).unwrap_err();
    match err {
        FinreconError::DuplicateStatement { run, .. } => assert_eq!(run, first.run.id),
        other => panic!("expected DuplicateStatement, got {other:?}"),
    }
    assert_eq!(desk.reconciler.run_summaries(None).len(), 1);
}

#[test]
fn ledger_record_claimed_by_earlier_run_is_not_reused() {
    let desk = Desk::new(vec![rec("t1", "A", 100)]);
    let first = desk.import("mpesa", vec![stmt("A", 100)]).unwrap();
    assert_eq!(first.run.matched_count, 1);

    // Another provider statement quoting the same reference finds nothing.
    let second = desk.import("airtel", vec![stmt("A", 100)]).unwrap();
    assert_eq!(second.run.matched_count, 0);
    assert_eq!(second.run.ledger_balance, Money::ZERO);
    assert_eq!(second.items[0].status, ItemStatus::Unmatched);
}

#[test]
fn raw_rows_import() {
    let rows: Vec<RawStatementRow> = serde_json::from_str(
        r#"[
            { "reference": "QK1", "amount": "10.00", "date": "2026-01-17" },
            { "reference": "QK2", "amount_minor": 2500, "date": "2026-01-18" }
        ]"#,
    )
    .unwrap();
    let import = StatementImport::from_rows(
        ReconciliationType::MobileWallet,
        january(),
        "mpesa",
        rows,
    )
    .unwrap();
    assert_eq!(import.items[0].amount, Money(1_000));

    let bad: Vec<RawStatementRow> =
        serde_json::from_str(r#"[ { "reference": "QK1", "date": "2026-01-17" } ]"#).unwrap();
    let err = StatementImport::from_rows(ReconciliationType::MobileWallet, january(), "mpesa", bad)
        .unwrap_err();
    assert!(err.to_string().contains("statement line 1"));
}

// =========================================================================
// Manual match
// =========================================================================

#[test]
fn manual_match_updates_counters_and_status() {
    let desk = Desk::new(vec![]);
    let out = desk.import("mpesa", vec![stmt("A", 1_000), stmt("B", 500)]).unwrap();
    // The record lands in the ledger after the run (late settlement).
    desk.source.insert(rec("late-1", "B-LATE", 500));

    let target = out.items[1].id;
    let item = desk
        .reconciler
        .manual_match(target, &LedgerRecordId::new("late-1"), "alice", Some("late posting"))
        .unwrap();
    assert_eq!(item.status, ItemStatus::Matched);
    assert_eq!(item.match_type, Some(MatchType::Manual));
    assert_eq!(item.confidence, 100);
    assert_eq!(item.variance, Money::ZERO);
    assert_eq!(item.resolution.as_ref().unwrap().resolved_by, "alice");

    let run = desk.reconciler.run(out.run.id).unwrap();
    assert_eq!(run.unmatched_count, 1);
    assert_eq!(run.matched_count, 1);
    assert_eq!(run.manual_matched_count, 1);
    assert_eq!(run.status, RunStatus::Unmatched);

    desk.reconciler.resolve_item(out.items[0].id, "alice", None).unwrap();
    let run = desk.reconciler.run(out.run.id).unwrap();
    assert_eq!(run.status, RunStatus::Resolved);
    assert_eq!(desk.reconciler.run_summaries(Some(RunStatus::Resolved)).len(), 1);
    assert!(desk.reconciler.run_summaries(Some(RunStatus::Unmatched)).is_empty());
}

#[test]
fn manual_match_links_orphan_line() {
    let desk = Desk::new(vec![rec("t9", "XYZ", 800)]);
    let out = desk.import("mpesa", vec![stmt("ABC", 1_000)]).unwrap();
    assert_eq!(out.items.len(), 2);
    assert_eq!(out.items[1].origin, ItemOrigin::LedgerOrphan);

    desk.reconciler
        .manual_match(out.items[0].id, &LedgerRecordId::new("t9"), "bob", None)
        .unwrap();

    let run = desk.reconciler.run(out.run.id).unwrap();
    assert_eq!(run.unmatched_count, 0);
    assert_eq!(run.matched_count, 2);
    assert_eq!(run.manual_matched_count, 2);
    assert_eq!(run.status, RunStatus::Matched);
    assert_eq!(run.variance, Money(200));

    let items = desk.reconciler.items(out.run.id, None).unwrap();
    assert_eq!(items[0].variance, Money(200));
    assert_eq!(items[1].status, ItemStatus::Matched);
    assert_eq!(items[1].variance, Money::ZERO);
    let variance_sum: Money = items.iter().map(|i| i.variance).sum();
    assert_eq!(variance_sum, run.variance);
}

#[test]
fn manual_match_on_matched_item_conflicts() {
    let desk = Desk::new(vec![rec("t1", "A", 100), rec("t2", "OTHER", 5)]);
    let out = desk.import("mpesa", vec![stmt("A", 100)]).unwrap();
    let before = desk.reconciler.run(out.run.id).unwrap();
    let err = desk
        .reconciler
        .manual_match(out.items[0].id, &LedgerRecordId::new("t2"), "ops", None)
        .unwrap_err();
    assert!(matches!(err, FinreconError::ItemAlreadyMatched(_)));
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(desk.reconciler.run(out.run.id).unwrap(), before);
}

#[test]
fn manual_match_on_resolved_item_refused() {
    let desk = Desk::new(vec![]);
    let out = desk.import("mpesa", vec![stmt("A", 100)]).unwrap();
    desk.reconciler.resolve_item(out.items[0].id, "ops", None).unwrap();
    desk.source.insert(rec("t1", "A", 100));
    let err = desk
        .reconciler
        .manual_match(out.items[0].id, &LedgerRecordId::new("t1"), "ops", None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidStateTransition);
}

#[test]
fn manual_match_unknown_record_or_item() {
    let desk = Desk::new(vec![rec("t1", "A", 100)]);
    let out = desk.import("mpesa", vec![stmt("B", 999)]).unwrap();
    let err = desk
        .reconciler
        .manual_match(out.items[0].id, &LedgerRecordId::new("missing"), "ops", None)
        .unwrap_err();
    assert!(matches!(err, FinreconError::LedgerRecordNotFound(_)));
    let err = desk
        .reconciler
        .manual_match(ItemId::new(), &LedgerRecordId::new("t1"), "ops", None)
        .unwrap_err();
    assert!(matches!(err, FinreconError::ItemNotFound(_)));
}

#[test]
fn manual_match_cannot_steal_claimed_record() {
    let desk = Desk::new(vec![rec("t1", "A", 100)]);
    let first = desk.import("mpesa", vec![stmt("A", 100)]).unwrap();
    assert_eq!(first.run.matched_count, 1);
    let second = desk.import("airtel", vec![stmt("Q", 100)]).unwrap();

    let err = desk
        .reconciler
        .manual_match(second.items[0].id, &LedgerRecordId::new("t1"), "ops", None)
        .unwrap_err();
    assert!(matches!(err, FinreconError::LedgerRecordClaimed(_)));
    let run = desk.reconciler.run(second.run.id).unwrap();
    assert_eq!(run.unmatched_count, 1);
    assert_eq!(run.matched_count, 0);
}

#[test]
fn concurrent_manual_matches_claim_record_once() {
    let desk = Arc::new(Desk::new(vec![]));
    let out = desk
        .import("mpesa", vec![stmt("P1", 700), stmt("P2", 700), stmt("P3", 700)])
        .unwrap();
    desk.source.insert(rec("shared", "PX", 700));

    let handles: Vec<_> = out
        .items
        .iter()
        .map(|item| {
            let desk = Arc::clone(&desk);
            let id = item.id;
            thread::spawn(move || {
                desk.reconciler
                    .manual_match(id, &LedgerRecordId::new("shared"), "ops", None)
                    .is_ok()
            })
        })
        .collect();
    let wins = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();
    assert_eq!(wins, 1);

    let run = desk.reconciler.run(out.run.id).unwrap();
    assert_eq!(run.matched_count, 1);
    assert_eq!(run.unmatched_count, 2);
    let items: Vec<ReconciliationItem> =
        desk.store.read(|s| s.run_items(run.id).unwrap().into_iter().cloned().collect());
    invariants::check_run_items(&run, &items).unwrap();
}
