//! Reconciliation model: statement items, ledger records, runs and run items.
//!
//! A [`ReconciliationRun`] is the header of one statement import matched
//! against the internal ledger for a [`Period`]. Each statement line and each
//! orphaned ledger record becomes one [`ReconciliationItem`].
//!
//! ## Item lifecycle
//!
//! ```text
//!   ┌─────────┐  manual match  ┌─────────┐
//!   │ PENDING ├───────────────▶│ MATCHED │
//!   └────┬────┘                └─────────┘
//!        │ resolve (write-off)      ▲
//!        ▼                          │ manual match
//!   ┌──────────┐             ┌──────┴────┐
//!   │ RESOLVED │◀────────────┤ UNMATCHED │
//!   └──────────┘   resolve   └───────────┘
//! ```
//!
//! MATCHED and RESOLVED are terminal: the audit trail is never overwritten.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{FinreconError, ItemId, LedgerRecordId, Money, Period, Result, RunId};

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// One line of an external payment-provider statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementItem {
    pub reference: String,
    pub amount: Money,
    pub date: NaiveDate,
    pub description: String,
}

/// One completed money movement from the internal transaction ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub id: LedgerRecordId,
    pub amount: Money,
    pub reference: String,
    pub description: String,
    pub completed_at: DateTime<Utc>,
}

impl LedgerRecord {
    /// Calendar date of completion.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.completed_at.date_naive()
    }
}

/// Statement row as delivered by an importer: every field is text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawStatementRow {
    pub reference: Option<String>,
    /// Major-unit amount such as `"1250.50"`.
    pub amount: Option<String>,
    /// Minor-unit amount; takes precedence over `amount` when present.
    pub amount_minor: Option<i64>,
    /// ISO date (`YYYY-MM-DD`).
    pub date: Option<String>,
    pub description: Option<String>,
}

/// Ledger row as returned by a loosely-typed store query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawLedgerRow {
    pub id: Option<String>,
    pub amount: Option<String>,
    pub amount_minor: Option<i64>,
    pub reference: Option<String>,
    pub description: Option<String>,
    /// RFC 3339 timestamp or ISO date.
    pub completed_at: Option<String>,
}

fn parse_amount(major: Option<&str>, minor: Option<i64>, what: &str) -> Result<Money> {
    match (minor, major) {
        (Some(minor), _) => Ok(Money(minor)),
        (None, Some(major)) => Money::parse_major(major),
        (None, None) => Err(FinreconError::validation(format!("{what}: amount is required"))),
    }
}

fn parse_date(raw: Option<&str>, what: &str) -> Result<NaiveDate> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| FinreconError::validation(format!("{what}: date is required")))?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| FinreconError::validation(format!("{what}: cannot parse date '{raw}': {e}")))
}

fn parse_timestamp(raw: Option<&str>, what: &str) -> Result<DateTime<Utc>> {
    let trimmed = raw.map(str::trim).unwrap_or_default();
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(ts.with_timezone(&Utc));
    }
    parse_date(raw, what).map(|d| d.and_time(NaiveTime::MIN).and_utc())
}

fn text(raw: Option<String>) -> String {
    raw.map(|s| s.trim().to_string()).unwrap_or_default()
}

impl TryFrom<RawStatementRow> for StatementItem {
    type Error = FinreconError;

    fn try_from(row: RawStatementRow) -> Result<Self> {
        let reference = text(row.reference);
        let what = format!("statement row '{reference}'");
        Ok(Self {
            amount: parse_amount(row.amount.as_deref(), row.amount_minor, &what)?,
            date: parse_date(row.date.as_deref(), &what)?,
            description: text(row.description),
            reference,
        })
    }
}

impl TryFrom<RawLedgerRow> for LedgerRecord {
    type Error = FinreconError;

    fn try_from(row: RawLedgerRow) -> Result<Self> {
        let id = text(row.id);
        if id.is_empty() {
            return Err(FinreconError::validation("ledger row: id is required"));
        }
        let what = format!("ledger row '{id}'");
        Ok(Self {
            amount: parse_amount(row.amount.as_deref(), row.amount_minor, &what)?,
            completed_at: parse_timestamp(row.completed_at.as_deref(), &what)?,
            reference: text(row.reference),
            description: text(row.description),
            id: LedgerRecordId(id),
        })
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which external source a run reconciles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReconciliationType {
    PaymentProvider,
    BankStatement,
    MobileWallet,
}

impl fmt::Display for ReconciliationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PaymentProvider => write!(f, "PAYMENT_PROVIDER"),
            Self::BankStatement => write!(f, "BANK_STATEMENT"),
            Self::MobileWallet => write!(f, "MOBILE_WALLET"),
        }
    }
}

/// The scoring rule that linked an item to its ledger counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchType {
    /// Reference and amount agree.
    Exact,
    /// Amount agrees, reference differs.
    AmountOnly,
    /// Reference agrees, amount differs.
    ReferenceOnly,
    /// Reference substring or amount within tolerance.
    Fuzzy,
    /// Linked by an operator.
    Manual,
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => write!(f, "EXACT"),
            Self::AmountOnly => write!(f, "AMOUNT_ONLY"),
            Self::ReferenceOnly => write!(f, "REFERENCE_ONLY"),
            Self::Fuzzy => write!(f, "FUZZY"),
            Self::Manual => write!(f, "MANUAL"),
        }
    }
}

/// Status of one reconciliation line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemStatus {
    /// Linked to a ledger record (automatically or manually).
    Matched,
    /// A below-threshold candidate exists; awaiting human review.
    Pending,
    /// No counterpart found.
    Unmatched,
    /// Closed without a counterpart (write-off).
    Resolved,
}

impl ItemStatus {
    /// Still counted as unmatched on the run.
    #[must_use]
    pub fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::Unmatched)
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Matched => write!(f, "MATCHED"),
            Self::Pending => write!(f, "PENDING"),
            Self::Unmatched => write!(f, "UNMATCHED"),
            Self::Resolved => write!(f, "RESOLVED"),
        }
    }
}

/// Where a reconciliation line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemOrigin {
    /// A line of the external statement.
    Statement,
    /// A ledger record nobody on the statement claimed.
    LedgerOrphan,
}

/// Status of a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunStatus {
    /// Every line matched automatically or manually.
    Matched,
    /// At least one line is still open.
    Unmatched,
    /// No line open, at least one closed by write-off.
    Resolved,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Matched => write!(f, "MATCHED"),
            Self::Unmatched => write!(f, "UNMATCHED"),
            Self::Resolved => write!(f, "RESOLVED"),
        }
    }
}

// ---------------------------------------------------------------------------
// Run + items
// ---------------------------------------------------------------------------

/// Who closed an item by hand, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub resolved_by: String,
    pub notes: Option<String>,
    pub resolved_at: DateTime<Utc>,
}

/// Header of one matching execution. Never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationRun {
    pub id: RunId,
    pub run_type: ReconciliationType,
    pub period: Period,
    pub source_name: String,
    pub total_items: u32,
    pub matched_count: u32,
    pub unmatched_count: u32,
    pub auto_matched_count: u32,
    pub manual_matched_count: u32,
    pub resolved_count: u32,
    /// Sum of statement item amounts.
    pub source_balance: Money,
    /// Sum of ledger record amounts offered to the run.
    pub ledger_balance: Money,
    /// `source_balance - ledger_balance`.
    pub variance: Money,
    pub status: RunStatus,
    /// SHA-256 over the imported statement, hex encoded.
    pub statement_digest: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReconciliationRun {
    /// Derive the status from the counters.
    pub fn recompute_status(&mut self) {
        self.status = if self.unmatched_count > 0 {
            RunStatus::Unmatched
        } else if self.resolved_count > 0 {
            RunStatus::Resolved
        } else {
            RunStatus::Matched
        };
    }

    #[must_use]
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            id: self.id,
            run_type: self.run_type,
            period: self.period,
            source_name: self.source_name.clone(),
            total_items: self.total_items,
            matched_count: self.matched_count,
            unmatched_count: self.unmatched_count,
            resolved_count: self.resolved_count,
            source_balance: self.source_balance,
            ledger_balance: self.ledger_balance,
            variance: self.variance,
            status: self.status,
        }
    }
}

/// Compact view of a run for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub id: RunId,
    pub run_type: ReconciliationType,
    pub period: Period,
    pub source_name: String,
    pub total_items: u32,
    pub matched_count: u32,
    pub unmatched_count: u32,
    pub resolved_count: u32,
    pub source_balance: Money,
    pub ledger_balance: Money,
    pub variance: Money,
    pub status: RunStatus,
}

/// One line within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationItem {
    pub id: ItemId,
    pub run_id: RunId,
    /// 1-based position: statement lines first, then orphans.
    pub line_number: u32,
    pub origin: ItemOrigin,
    pub source_reference: Option<String>,
    pub source_amount: Option<Money>,
    pub source_date: Option<NaiveDate>,
    pub source_description: Option<String>,
    pub ledger_id: Option<LedgerRecordId>,
    pub ledger_reference: Option<String>,
    pub ledger_amount: Option<Money>,
    pub ledger_date: Option<NaiveDate>,
    pub match_type: Option<MatchType>,
    pub confidence: u8,
    /// Statement amount minus ledger amount (missing side counts as zero).
    pub variance: Money,
    pub status: ItemStatus,
    /// Best below-threshold candidate, offered to the reviewer.
    pub suggested_ledger_id: Option<LedgerRecordId>,
    pub resolution: Option<Resolution>,
}

impl ReconciliationItem {
    /// A statement line with no ledger side yet.
    #[must_use]
    pub fn from_statement(run_id: RunId, line_number: u32, item: &StatementItem) -> Self {
        Self {
            id: ItemId::new(),
            run_id,
            line_number,
            origin: ItemOrigin::Statement,
            source_reference: Some(item.reference.clone()),
            source_amount: Some(item.amount),
            source_date: Some(item.date),
            source_description: Some(item.description.clone()),
            ledger_id: None,
            ledger_reference: None,
            ledger_amount: None,
            ledger_date: None,
            match_type: None,
            confidence: 0,
            variance: item.amount,
            status: ItemStatus::Unmatched,
            suggested_ledger_id: None,
            resolution: None,
        }
    }

    /// A ledger record that no statement line claimed.
    #[must_use]
    pub fn orphan(run_id: RunId, line_number: u32, record: &LedgerRecord) -> Self {
        Self {
            id: ItemId::new(),
            run_id,
            line_number,
            origin: ItemOrigin::LedgerOrphan,
            source_reference: None,
            source_amount: None,
            source_date: None,
            source_description: None,
            ledger_id: Some(record.id.clone()),
            ledger_reference: Some(record.reference.clone()),
            ledger_amount: Some(record.amount),
            ledger_date: Some(record.date()),
            match_type: None,
            confidence: 0,
            variance: -record.amount,
            status: ItemStatus::Unmatched,
            suggested_ledger_id: None,
            resolution: None,
        }
    }

    /// Copy the ledger side over and close the line as MATCHED.
    pub fn link(&mut self, record: &LedgerRecord, match_type: MatchType, confidence: u8) {
        self.ledger_id = Some(record.id.clone());
        self.ledger_reference = Some(record.reference.clone());
        self.ledger_amount = Some(record.amount);
        self.ledger_date = Some(record.date());
        self.match_type = Some(match_type);
        self.confidence = confidence;
        self.variance = self.source_amount.unwrap_or(Money::ZERO) - record.amount;
        self.status = ItemStatus::Matched;
        self.suggested_ledger_id = None;
    }
}

/// SHA-256 fingerprint of a statement import.
///
/// `SHA-256(domain_sep || source_name || period || for each item: reference || amount || date)`
#[must_use]
pub fn statement_digest(source_name: &str, period: &Period, items: &[StatementItem]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"finrecon:statement:v1:");
    hasher.update(source_name.as_bytes());
    hasher.update([0u8]);
    hasher.update(period.to_string().as_bytes());
    hasher.update((items.len() as u64).to_le_bytes());
    for item in items {
        hasher.update(item.reference.as_bytes());
        hasher.update([0u8]);
        hasher.update(item.amount.0.to_le_bytes());
        hasher.update(item.date.to_string().as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Dummy inputs for testing. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl StatementItem {
    /// A statement line with a random reference.
    pub fn dummy(amount: i64, date: NaiveDate) -> Self {
        Self {
            reference: format!("REF{:08}", rand::random::<u32>() % 100_000_000),
            amount: Money(amount),
            date,
            description: "dummy statement line".to_string(),
        }
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl LedgerRecord {
    /// A ledger record completed at midnight UTC on `date`.
    pub fn dummy(id: &str, reference: &str, amount: i64, date: NaiveDate) -> Self {
        Self {
            id: LedgerRecordId::new(id),
            amount: Money(amount),
            reference: reference.to_string(),
            description: "dummy ledger record".to_string(),
            completed_at: date.and_time(NaiveTime::MIN).and_utc(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn raw_statement_row_parses() {
        let row: RawStatementRow = serde_json::from_str(
            r#"{ "reference": " QK12 ", "amount": "1250.50", "date": "2026-01-17", "description": "premium" }"#,
        )
        .unwrap();
        let item = StatementItem::try_from(row).unwrap();
        assert_eq!(item.reference, "QK12");
        assert_eq!(item.amount, Money(125_050));
        assert_eq!(item.date, date("2026-01-17"));
    }

    #[test]
    fn minor_amount_takes_precedence() {
        let row = RawStatementRow {
            amount: Some("1.00".into()),
            amount_minor: Some(250),
            date: Some("2026-01-17".into()),
            ..RawStatementRow::default()
        };
        assert_eq!(StatementItem::try_from(row).unwrap().amount, Money(250));
    }

    #[test]
    fn raw_statement_row_requires_amount_and_date() {
        let no_amount = RawStatementRow {
            date: Some("2026-01-17".into()),
            ..RawStatementRow::default()
        };
        assert!(StatementItem::try_from(no_amount).is_err());

        let bad_date = RawStatementRow {
            amount: Some("1".into()),
            date: Some("17/01/2026".into()),
            ..RawStatementRow::default()
        };
        let err = StatementItem::try_from(bad_date).unwrap_err();
        assert!(matches!(err, FinreconError::Validation { .. }));
    }

    #[test]
    fn raw_ledger_row_accepts_timestamp_or_date() {
        let ts = RawLedgerRow {
            id: Some("tx-1".into()),
            amount_minor: Some(500),
            completed_at: Some("2026-01-17T10:15:00+03:00".into()),
            ..RawLedgerRow::default()
        };
        let rec = LedgerRecord::try_from(ts).unwrap();
        assert_eq!(rec.date(), date("2026-01-17"));

        let day = RawLedgerRow {
            id: Some("tx-2".into()),
            amount: Some("5".into()),
            completed_at: Some("2026-01-18".into()),
            ..RawLedgerRow::default()
        };
        let rec = LedgerRecord::try_from(day).unwrap();
        assert_eq!(rec.amount, Money(500));
        assert_eq!(rec.date(), date("2026-01-18"));
    }

    #[test]
    fn raw_ledger_row_requires_id() {
        let row = RawLedgerRow {
            amount_minor: Some(1),
            completed_at: Some("2026-01-18".into()),
            ..RawLedgerRow::default()
        };
        assert!(LedgerRecord::try_from(row).is_err());
    }

    #[test]
    fn link_copies_ledger_side() {
        let stmt = StatementItem::dummy(1_000, date("2026-01-17"));
        let rec = LedgerRecord::dummy("tx-1", "X", 950, date("2026-01-16"));
        let mut item = ReconciliationItem::from_statement(RunId::new(), 1, &stmt);
        assert_eq!(item.variance, Money(1_000));
        item.link(&rec, MatchType::Fuzzy, 60);
        assert_eq!(item.status, ItemStatus::Matched);
        assert_eq!(item.ledger_id, Some(LedgerRecordId::new("tx-1")));
        assert_eq!(item.variance, Money(50));
    }

    #[test]
    fn orphan_has_negative_variance() {
        let rec = LedgerRecord::dummy("tx-9", "Z", 700, date("2026-01-16"));
        let item = ReconciliationItem::orphan(RunId::new(), 3, &rec);
        assert_eq!(item.variance, Money(-700));
        assert_eq!(item.origin, ItemOrigin::LedgerOrphan);
        assert!(item.status.is_open());
    }

    #[test]
    fn digest_is_deterministic_and_sensitive() {
        let period = Period::day(date("2026-01-17"));
        let items = vec![StatementItem::dummy(100, date("2026-01-17"))];
        let a = statement_digest("mpesa", &period, &items);
        assert_eq!(a, statement_digest("mpesa", &period, &items));
        assert_eq!(a.len(), 64);
        assert_ne!(a, statement_digest("airtel", &period, &items));
    }

    #[test]
    fn status_display() {
        assert_eq!(MatchType::AmountOnly.to_string(), "AMOUNT_ONLY");
        assert_eq!(ItemStatus::Pending.to_string(), "PENDING");
        assert_eq!(RunStatus::Resolved.to_string(), "RESOLVED");
    }
}
