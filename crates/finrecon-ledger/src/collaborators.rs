//! External collaborator contracts.
//!
//! None of these are implemented by this core against real systems; callers
//! plug in adapters for their ledger database, posting engine and payout
//! provider. All calls are synchronous. Failures are reported as
//! [`FinreconError::Collaborator`](finrecon_types::FinreconError::Collaborator)
//! and the settlement manager turns them into FAILED transitions.

use finrecon_types::{
    LedgerRecord, LedgerRecordId, Money, PayoutDestination, Period, Result, Settlement,
    SettlementId,
};

/// Read access to the platform's completed money movements.
pub trait TransactionSource: Send + Sync {
    /// Completed records whose completion date falls in `period`.
    fn completed_records(&self, period: &Period) -> Result<Vec<LedgerRecord>>;

    /// Look up one record by ID.
    fn find_record(&self, id: &LedgerRecordId) -> Result<Option<LedgerRecord>>;
}

/// Double-entry posting of settlement payouts.
pub trait PostingService: Send + Sync {
    fn post_settlement(&self, settlement: &Settlement) -> Result<PostingReceipt>;
}

/// Disbursement of money to a partner destination.
pub trait PayoutGateway: Send + Sync {
    fn disburse(&self, request: &PayoutRequest) -> Result<PayoutReceipt>;
}

/// Successful posting: the journal entry for traceability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostingReceipt {
    pub journal_entry_id: String,
}

/// One payout instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayoutRequest {
    pub settlement_id: SettlementId,
    pub settlement_number: String,
    pub destination: PayoutDestination,
    pub amount: Money,
    pub bank_reference: Option<String>,
}

/// Successful payout: the gateway's transaction reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayoutReceipt {
    pub external_reference: String,
}
