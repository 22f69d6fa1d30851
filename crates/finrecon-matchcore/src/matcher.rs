//! Pure matching pass over one statement.
//!
//! ```text
//! match_statement(run_id, statement, pool) -> Result<MatchOutcome>
//! ```
//!
//! ## Algorithm
//!
//! 0. Every amount must be within the per-line limit and both balances must
//!    fit in `i64`; otherwise the pass fails before scoring anything.
//! 1. For each statement item, in statement order, score it against every
//!    ledger record still in the pool. Keep the highest confidence; ties go
//!    to the record earlier in the pool. Stop searching on an EXACT score.
//! 2. Best confidence ≥ threshold → MATCHED; the record leaves the pool.
//! 3. Best below threshold → PENDING, the candidate is kept as a suggestion
//!    but stays in the pool.
//! 4. No candidate at all → UNMATCHED, variance = full amount.
//! 5. Every record left in the pool becomes an orphan line with negative
//!    variance.
//!
//! The pool is an ordered index map. Claimed records are removed from the
//! map, never from the caller's slice, so iteration and removal never alias.

use std::collections::BTreeMap;

use finrecon_types::{
    ItemStatus, LedgerRecord, LedgerRecordId, MatchConfig, MatchType, Money, ReconciliationItem,
    Result, RunId, StatementItem,
};

use crate::scorer::{MatchScore, score_candidate};

/// Lines and counters produced by one matching pass.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    /// Statement lines first (statement order), then orphans (pool order).
    pub items: Vec<ReconciliationItem>,
    /// Ledger records linked by this pass.
    pub claimed: Vec<LedgerRecordId>,
    pub matched_count: u32,
    /// PENDING + UNMATCHED lines, orphans included.
    pub unmatched_count: u32,
    pub source_balance: Money,
    pub ledger_balance: Money,
}

impl MatchOutcome {
    /// `source_balance - ledger_balance`.
    ///
    /// # Errors
    /// Returns `Overflow` if the difference does not fit in `i64`.
    pub fn variance(&self) -> Result<Money> {
        self.source_balance
            .try_sub(self.ledger_balance, "run variance")
    }

    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.matched_count + self.unmatched_count
    }
}

/// Match statement items against a pool of ledger records.
///
/// # Errors
/// - `Validation` if an amount exceeds the per-line limit
/// - `Overflow` if a balance does not fit in `i64`
pub fn match_statement(
    run_id: RunId,
    statement: &[StatementItem],
    pool: &[LedgerRecord],
    config: &MatchConfig,
) -> Result<MatchOutcome> {
    for (idx, stmt) in statement.iter().enumerate() {
        stmt.amount
            .ensure_line_amount(&format!("statement line {}", idx + 1))?;
    }
    for record in pool {
        record
            .amount
            .ensure_line_amount(&format!("ledger record {}", record.id))?;
    }
    let source_balance = Money::try_sum(statement.iter().map(|s| s.amount), "source balance")?;
    let ledger_balance = Money::try_sum(pool.iter().map(|r| r.amount), "ledger balance")?;

    let mut remaining: BTreeMap<usize, &LedgerRecord> = pool.iter().enumerate().collect();
    let mut items = Vec::with_capacity(statement.len() + pool.len());
    let mut claimed = Vec::new();
    let mut matched_count = 0u32;
    let mut unmatched_count = 0u32;
    let mut line_number = 0u32;

    for stmt in statement {
        line_number += 1;
        let mut item = ReconciliationItem::from_statement(run_id, line_number, stmt);

        let mut best: Option<(usize, MatchScore)> = None;
        for (&idx, record) in &remaining {
            let Some(score) = score_candidate(stmt, record, config) else {
                continue;
            };
            if best.is_none_or(|(_, b)| score.confidence > b.confidence) {
                best = Some((idx, score));
            }
            if score.match_type == MatchType::Exact {
                break;
            }
        }

        match best {
            Some((idx, score)) if score.confidence >= config.auto_match_threshold => {
                if let Some(record) = remaining.remove(&idx) {
                    item.link(record, score.match_type, score.confidence);
                    claimed.push(record.id.clone());
                    matched_count += 1;
                    tracing::debug!(
                        line = line_number,
                        reference = %stmt.reference,
                        ledger = %record.id,
                        match_type = %score.match_type,
                        confidence = score.confidence,
                        "Statement line matched"
                    );
                }
            }
            Some((idx, score)) => {
                item.status = ItemStatus::Pending;
                item.confidence = score.confidence;
                item.suggested_ledger_id = remaining.get(&idx).map(|r| r.id.clone());
                unmatched_count += 1;
                tracing::debug!(
                    line = line_number,
                    reference = %stmt.reference,
                    confidence = score.confidence,
                    "Statement line left pending for review"
                );
            }
            None => {
                unmatched_count += 1;
            }
        }
        items.push(item);
    }

    for record in remaining.into_values() {
        line_number += 1;
        items.push(ReconciliationItem::orphan(run_id, line_number, record));
        unmatched_count += 1;
    }

    Ok(MatchOutcome {
        items,
        claimed,
        matched_count,
        unmatched_count,
        source_balance,
        ledger_balance,
    })
}
