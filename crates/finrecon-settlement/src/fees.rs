//! Fee line items over period transaction volume.

use finrecon_types::{LedgerRecord, LineItemDraft, Result};
use rust_decimal::Decimal;

/// One line per completed ledger record, fee rounded per line.
///
/// Rounding per line keeps the settlement total equal to the sum of its
/// lines by construction.
///
/// # Errors
/// Returns `Overflow` if a fee does not fit in minor units.
pub fn fee_lines(records: &[LedgerRecord], fee_rate: Decimal) -> Result<Vec<LineItemDraft>> {
    records
        .iter()
        .map(|record| {
            Ok(LineItemDraft {
                description: format!("Fee on {} ({})", record.reference, record.amount),
                amount: record.amount.apply_ratio(fee_rate)?,
                ledger_id: Some(record.id.clone()),
            })
        })
        .collect()
}
