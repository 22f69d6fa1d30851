//! Monetary and counter invariant checks.
//!
//! ```text
//! run:         matched + unmatched + resolved == total_items
//! run:         variance == Σ(statement) - Σ(ledger)
//! settlement:  total_amount == Σ(line items)
//! allocation:  Σ(breakdown) == total == Σ(distribution)
//! ```
//!
//! Each check returns [`FinreconError::InvariantViolation`] with the numbers
//! involved. Callers run them inside the transaction that made the change so
//! a violation rolls the change back.

use crate::{
    CommissionAllocation, FinreconError, ItemStatus, Money, ReconciliationItem,
    ReconciliationRun, Result, Settlement, SettlementLineItem,
};

/// Counter foot-check on a run header.
pub fn check_run_counters(run: &ReconciliationRun) -> Result<()> {
    let accounted = run.matched_count + run.unmatched_count + run.resolved_count;
    if accounted != run.total_items {
        return Err(FinreconError::InvariantViolation {
            reason: format!(
                "run {}: matched {} + unmatched {} + resolved {} != total {}",
                run.id, run.matched_count, run.unmatched_count, run.resolved_count, run.total_items
            ),
        });
    }
    if run.auto_matched_count + run.manual_matched_count != run.matched_count {
        return Err(FinreconError::InvariantViolation {
            reason: format!(
                "run {}: auto {} + manual {} != matched {}",
                run.id, run.auto_matched_count, run.manual_matched_count, run.matched_count
            ),
        });
    }
    if run.source_balance.checked_sub(run.ledger_balance) != Some(run.variance) {
        return Err(FinreconError::InvariantViolation {
            reason: format!(
                "run {}: source {} - ledger {} != variance {}",
                run.id, run.source_balance, run.ledger_balance, run.variance
            ),
        });
    }
    Ok(())
}

/// Header counters agree with the item rows.
pub fn check_run_items(run: &ReconciliationRun, items: &[ReconciliationItem]) -> Result<()> {
    check_run_counters(run)?;
    let count = |status: ItemStatus| {
        u32::try_from(items.iter().filter(|i| i.status == status).count()).unwrap_or(u32::MAX)
    };
    let matched = count(ItemStatus::Matched);
    let open = count(ItemStatus::Pending) + count(ItemStatus::Unmatched);
    let resolved = count(ItemStatus::Resolved);
    let total = u32::try_from(items.len()).unwrap_or(u32::MAX);
    if (matched, open, resolved, total)
        != (
            run.matched_count,
            run.unmatched_count,
            run.resolved_count,
            run.total_items,
        )
    {
        return Err(FinreconError::InvariantViolation {
            reason: format!(
                "run {}: rows (matched {matched}, open {open}, resolved {resolved}, total {total}) \
                 disagree with header (matched {}, unmatched {}, resolved {}, total {})",
                run.id, run.matched_count, run.unmatched_count, run.resolved_count, run.total_items
            ),
        });
    }
    Ok(())
}

/// Settlement total equals the sum of its line items.
pub fn check_settlement_foot(settlement: &Settlement, lines: &[SettlementLineItem]) -> Result<()> {
    let sum = Money::try_sum(lines.iter().map(|l| l.amount), "settlement line items")?;
    let count = u32::try_from(lines.len()).unwrap_or(u32::MAX);
    if settlement.total_amount != sum || settlement.line_item_count != count {
        return Err(FinreconError::InvariantViolation {
            reason: format!(
                "settlement {}: total {} over {} lines, line items sum to {sum} over {count}",
                settlement.number, settlement.total_amount, settlement.line_item_count
            ),
        });
    }
    Ok(())
}

/// Both commission partitions foot to the total.
pub fn check_allocation_foot(allocation: &CommissionAllocation) -> Result<()> {
    let total = allocation.total_commission;
    let by_category = allocation.breakdown.total();
    let by_party = allocation.distribution.total();
    if by_category != total || by_party != total {
        return Err(FinreconError::InvariantViolation {
            reason: format!(
                "commission {total}: breakdown sums to {by_category}, distribution sums to {by_party}"
            ),
        });
    }
    Ok(())
}
