//! Candidate pair scoring.
//!
//! ```text
//! score_candidate(StatementItem, LedgerRecord) -> Option<MatchScore>
//! ```
//!
//! The first applicable rule wins:
//!
//! | # | Rule                                              | Type           | Confidence |
//! |---|---------------------------------------------------|----------------|-----------:|
//! | 1 | reference equal and amount equal                  | EXACT          | 100        |
//! | 2 | amount equal                                      | AMOUNT_ONLY    | 80         |
//! | 3 | reference equal                                   | REFERENCE_ONLY | 70         |
//! | 4 | reference contains the other, or amounts ≤ 100 apart | FUZZY       | 60         |
//!
//! Confidences and the fuzzy tolerance come from [`MatchConfig`]. A blank
//! reference never takes part in a reference rule: an empty string would
//! otherwise "contain" and equal every other blank reference.

use finrecon_types::{LedgerRecord, MatchConfig, MatchType, StatementItem};

/// Outcome of scoring one candidate pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchScore {
    pub match_type: MatchType,
    pub confidence: u8,
}

/// Score one statement item against one ledger record.
///
/// Returns `None` when no rule applies.
#[must_use]
pub fn score_candidate(
    item: &StatementItem,
    record: &LedgerRecord,
    config: &MatchConfig,
) -> Option<MatchScore> {
    let left = item.reference.trim();
    let right = record.reference.trim();
    let both_referenced = !left.is_empty() && !right.is_empty();

    let reference_equal = both_referenced && left == right;
    let amount_equal = item.amount == record.amount;

    let (match_type, confidence) = if reference_equal && amount_equal {
        (MatchType::Exact, config.exact_confidence)
    } else if amount_equal {
        (MatchType::AmountOnly, config.amount_only_confidence)
    } else if reference_equal {
        (MatchType::ReferenceOnly, config.reference_only_confidence)
    } else if (both_referenced && (left.contains(right) || right.contains(left)))
        || item.amount.distance(record.amount) <= config.fuzzy_amount_tolerance
    {
        (MatchType::Fuzzy, config.fuzzy_confidence)
    } else {
        return None;
    };

    Some(MatchScore {
        match_type,
        confidence,
    })
}
