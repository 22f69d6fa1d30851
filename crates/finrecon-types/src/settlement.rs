//! Settlement model: partner payout obligations and their line items.
//!
//! ## State Machine
//!
//! ```text
//!   ┌─────────┐ approve ┌──────────┐ process ┌────────────┐ confirm ┌───────────┐
//!   │ PENDING ├────────▶│ APPROVED ├────────▶│ PROCESSING ├────────▶│ COMPLETED │
//!   └────┬────┘         └────┬─────┘         └─────┬──────┘         └───────────┘
//!        │                   │                     │
//!        └───────────────────┴──────────┬──────────┘
//!                                       ▼
//!                             ┌────────────────────┐
//!                             │ FAILED / CANCELLED │
//!                             └────────────────────┘
//! ```
//!
//! Transitions are **monotonic**: no state is ever skipped or revisited.
//! COMPLETED, FAILED and CANCELLED are terminal.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    FinreconError, LedgerRecordId, LineItemId, Money, PartnerId, Period, Result, SettlementId,
};

/// The lifecycle state of a settlement.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum SettlementStatus {
    /// Created, awaiting approval.
    Pending,
    /// Approved, awaiting payout.
    Approved,
    /// Payout handed to the gateway, awaiting confirmation.
    Processing,
    /// Paid out and posted to the ledger. **Immutable.**
    Completed,
    /// Payout or posting failed; reason recorded.
    Failed,
    /// Withdrawn by an operator.
    Cancelled,
}

impl SettlementStatus {
    /// Can a settlement move from this state to `target`?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::Approved)
                | (Self::Approved, Self::Processing)
                | (Self::Processing, Self::Completed)
                | (
                    Self::Pending | Self::Approved | Self::Processing,
                    Self::Failed | Self::Cancelled
                )
        )
    }

    /// No transition leaves this state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for SettlementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Approved => write!(f, "APPROVED"),
            Self::Processing => write!(f, "PROCESSING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed => write!(f, "FAILED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// What the settlement pays for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SettlementType {
    /// Fee on period transaction volume.
    Fee,
    /// Share of allocated commission.
    Commission,
}

impl SettlementType {
    /// Short code used in settlement numbers.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Fee => "FEE",
            Self::Commission => "COM",
        }
    }
}

impl fmt::Display for SettlementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fee => write!(f, "FEE"),
            Self::Commission => write!(f, "COMMISSION"),
        }
    }
}

/// Kind of receiving partner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartnerType {
    PaymentProvider,
    Agency,
    Underwriter,
    MobilizationPartner,
    Platform,
}

impl fmt::Display for PartnerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PaymentProvider => write!(f, "PAYMENT_PROVIDER"),
            Self::Agency => write!(f, "AGENCY"),
            Self::Underwriter => write!(f, "UNDERWRITER"),
            Self::MobilizationPartner => write!(f, "MOBILIZATION_PARTNER"),
            Self::Platform => write!(f, "PLATFORM"),
        }
    }
}

/// Where a payout is sent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PayoutDestination {
    Bank { account: String },
    MobileMoney { phone: String },
}

impl PayoutDestination {
    /// Rejects blank account numbers / phone numbers.
    pub fn validate(&self) -> Result<()> {
        let value = match self {
            Self::Bank { account } => account,
            Self::MobileMoney { phone } => phone,
        };
        if value.trim().is_empty() {
            return Err(FinreconError::validation("payout destination is blank"));
        }
        Ok(())
    }
}

impl fmt::Display for PayoutDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bank { account } => write!(f, "bank:{account}"),
            Self::MobileMoney { phone } => write!(f, "mobile:{phone}"),
        }
    }
}

/// A receiving party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partner {
    pub id: PartnerId,
    pub name: String,
    pub partner_type: PartnerType,
    /// Registered default payout destination.
    pub payout_destination: Option<PayoutDestination>,
}

impl Partner {
    #[must_use]
    pub fn new(name: impl Into<String>, partner_type: PartnerType) -> Self {
        Self {
            id: PartnerId::new(),
            name: name.into(),
            partner_type,
            payout_destination: None,
        }
    }

    #[must_use]
    pub fn with_destination(mut self, destination: PayoutDestination) -> Self {
        self.payout_destination = Some(destination);
        self
    }
}

/// A line item before it is attached to a settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemDraft {
    pub description: String,
    pub amount: Money,
    /// Originating ledger record, for fee lines.
    pub ledger_id: Option<LedgerRecordId>,
}

impl LineItemDraft {
    #[must_use]
    pub fn new(description: impl Into<String>, amount: Money) -> Self {
        Self {
            description: description.into(),
            amount,
            ledger_id: None,
        }
    }
}

/// Itemized contribution to a settlement total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementLineItem {
    pub id: LineItemId,
    pub settlement_id: SettlementId,
    pub line_number: u32,
    pub description: String,
    pub amount: Money,
    pub ledger_id: Option<LedgerRecordId>,
}

/// A partner payout obligation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub id: SettlementId,
    /// Human-readable number, e.g. `STL-FEE-202601-000042`.
    pub number: String,
    pub partner_id: PartnerId,
    pub partner_name: String,
    pub settlement_type: SettlementType,
    pub period: Period,
    /// Always equals the sum of the line items.
    pub total_amount: Money,
    pub line_item_count: u32,
    pub status: SettlementStatus,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub processed_at: Option<DateTime<Utc>>,
    /// Operator-supplied bank batch reference.
    pub bank_reference: Option<String>,
    pub payout_destination: Option<PayoutDestination>,
    /// Reference returned by the payout gateway.
    pub payout_reference: Option<String>,
    /// Journal entry returned by the posting service.
    pub journal_entry_id: Option<String>,
    pub settled_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
    pub cancelled_by: Option<String>,
    /// The failed settlement this one re-issues.
    pub retry_of: Option<SettlementId>,
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Settlement {
    /// Move to `target`, or fail without touching the record.
    ///
    /// # Errors
    /// Returns `InvalidStateTransition` if the state machine forbids it.
    pub fn transition(&mut self, target: SettlementStatus) -> Result<()> {
        if !self.status.can_transition_to(target) {
            return Err(FinreconError::transition(
                format!("settlement {}", self.number),
                self.status,
                target,
            ));
        }
        self.status = target;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Per-status count and amount, for operator dashboards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementSummary {
    pub by_status: BTreeMap<SettlementStatus, StatusTotals>,
}

/// Count and amount of settlements in one status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTotals {
    pub count: u32,
    pub amount: Money,
}

impl SettlementSummary {
    #[must_use]
    pub fn from_settlements<'a>(settlements: impl IntoIterator<Item = &'a Settlement>) -> Self {
        let mut summary = Self::default();
        for s in settlements {
            let entry = summary.by_status.entry(s.status).or_default();
            entry.count += 1;
            entry.amount = entry.amount.saturating_add(s.total_amount);
        }
        summary
    }

    #[must_use]
    pub fn get(&self, status: SettlementStatus) -> StatusTotals {
        self.by_status.get(&status).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use SettlementStatus::{Approved, Cancelled, Completed, Failed, Pending, Processing};

    fn make_settlement() -> Settlement {
        let day = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();
        Settlement {
            id: SettlementId::new(),
            number: "STL-FEE-202601-000001".into(),
            partner_id: PartnerId::new(),
            partner_name: "Acme Pay".into(),
            settlement_type: SettlementType::Fee,
            period: Period::day(day),
            total_amount: Money(10_000),
            line_item_count: 1,
            status: Pending,
            approved_by: None,
            approved_at: None,
            processed_at: None,
            bank_reference: None,
            payout_destination: None,
            payout_reference: None,
            journal_entry_id: None,
            settled_at: None,
            failure_reason: None,
            cancelled_by: None,
            retry_of: None,
            metadata: BTreeMap::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn forward_transitions_valid() {
        assert!(Pending.can_transition_to(Approved));
        assert!(Approved.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Completed));
        for from in [Pending, Approved, Processing] {
            assert!(from.can_transition_to(Failed));
            assert!(from.can_transition_to(Cancelled));
        }
    }

    #[test]
    fn skips_and_reversals_invalid() {
        assert!(!Pending.can_transition_to(Processing));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Approved.can_transition_to(Completed));
        assert!(!Approved.can_transition_to(Pending));
        assert!(!Processing.can_transition_to(Approved));
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn terminal_states_are_final() {
        let all = [Pending, Approved, Processing, Completed, Failed, Cancelled];
        for from in [Completed, Failed, Cancelled] {
            assert!(from.is_terminal());
            for to in all {
                assert!(!from.can_transition_to(to), "{from} -> {to} must fail");
            }
        }
    }

    #[test]
    fn rejected_transition_leaves_status() {
        let mut s = make_settlement();
        let err = s.transition(Completed).unwrap_err();
        assert!(matches!(err, FinreconError::InvalidStateTransition { .. }));
        assert_eq!(s.status, Pending);
        s.transition(Approved).unwrap();
        assert_eq!(s.status, Approved);
    }

    #[test]
    fn destination_validation() {
        assert!(PayoutDestination::Bank { account: " ".into() }.validate().is_err());
        let phone = PayoutDestination::MobileMoney {
            phone: "254700000001".into(),
        };
        phone.validate().unwrap();
        assert_eq!(phone.to_string(), "mobile:254700000001");
    }

    #[test]
    fn summary_groups_by_status() {
        let a = make_settlement();
        let mut b = make_settlement();
        b.status = Approved;
        let c = make_settlement();
        let summary = SettlementSummary::from_settlements([&a, &b, &c]);
        assert_eq!(summary.get(Pending).count, 2);
        assert_eq!(summary.get(Pending).amount, Money(20_000));
        assert_eq!(summary.get(Approved).count, 1);
        assert_eq!(summary.get(Completed), StatusTotals::default());
    }

    #[test]
    fn settlement_serde_roundtrip() {
        let s = make_settlement();
        let json = serde_json::to_string(&s).unwrap();
        let back: Settlement = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }
}
