//! In-memory collaborator implementations.
//!
//! Used by tests and local tooling. The posting service and payout gateway
//! record every call and can be switched into a failing mode to exercise
//! the FAILED paths of the settlement lifecycle.

use finrecon_types::{
    FinreconError, LedgerRecord, LedgerRecordId, Period, Result, Settlement, SettlementId,
};
use parking_lot::{Mutex, RwLock};

use crate::collaborators::{
    PayoutGateway, PayoutReceipt, PayoutRequest, PostingReceipt, PostingService,
    TransactionSource,
};

/// Transaction source backed by a vector.
#[derive(Debug, Default)]
pub struct InMemoryTransactionSource {
    records: RwLock<Vec<LedgerRecord>>,
}

impl InMemoryTransactionSource {
    #[must_use]
    pub fn new(records: Vec<LedgerRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    pub fn insert(&self, record: LedgerRecord) {
        self.records.write().push(record);
    }
}

impl TransactionSource for InMemoryTransactionSource {
    fn completed_records(&self, period: &Period) -> Result<Vec<LedgerRecord>> {
        Ok(self
            .records
            .read()
            .iter()
            .filter(|r| period.contains(r.date()))
            .cloned()
            .collect())
    }

    fn find_record(&self, id: &LedgerRecordId) -> Result<Option<LedgerRecord>> {
        Ok(self.records.read().iter().find(|r| &r.id == id).cloned())
    }
}

/// Posting service that issues sequential journal entry IDs.
#[derive(Debug, Default)]
pub struct RecordingPostingService {
    posted: Mutex<Vec<SettlementId>>,
    failure: Mutex<Option<String>>,
}

impl RecordingPostingService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent postings fail with `reason` (`None` restores success).
    pub fn set_failure(&self, reason: Option<&str>) {
        *self.failure.lock() = reason.map(str::to_string);
    }

    /// Settlements posted so far.
    pub fn posted(&self) -> Vec<SettlementId> {
        self.posted.lock().clone()
    }
}

impl PostingService for RecordingPostingService {
    fn post_settlement(&self, settlement: &Settlement) -> Result<PostingReceipt> {
        if let Some(reason) = self.failure.lock().clone() {
            return Err(FinreconError::collaborator("posting", reason));
        }
        let mut posted = self.posted.lock();
        posted.push(settlement.id);
        Ok(PostingReceipt {
            journal_entry_id: format!("JE-{:06}", posted.len()),
        })
    }
}

/// Payout gateway that issues sequential transaction references.
#[derive(Debug, Default)]
pub struct RecordingPayoutGateway {
    requests: Mutex<Vec<PayoutRequest>>,
    failure: Mutex<Option<String>>,
}

impl RecordingPayoutGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent payouts fail with `reason` (`None` restores success).
    pub fn set_failure(&self, reason: Option<&str>) {
        *self.failure.lock() = reason.map(str::to_string);
    }

    /// Payout instructions received so far, failed ones included.
    pub fn requests(&self) -> Vec<PayoutRequest> {
        self.requests.lock().clone()
    }
}

impl PayoutGateway for RecordingPayoutGateway {
    fn disburse(&self, request: &PayoutRequest) -> Result<PayoutReceipt> {
        let mut requests = self.requests.lock();
        requests.push(request.clone());
        if let Some(reason) = self.failure.lock().clone() {
            return Err(FinreconError::collaborator("payout", reason));
        }
        Ok(PayoutReceipt {
            external_reference: format!("PAYOUT-{:06}", requests.len()),
        })
    }
}
