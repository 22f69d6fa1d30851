//! # finrecon-ledger
//!
//! **Shared ledger store and external collaborators.**
//!
//! ## Architecture
//!
//! Every mutation of a run or a settlement goes through
//! [`LedgerStore::transaction`]:
//! 1. The write lock is taken (transactions are serialized)
//! 2. The closure works on a private copy of the state
//! 3. `Ok` publishes the copy; `Err` discards it, nothing is visible
//!
//! Readers never observe a half-applied change, and preconditions checked
//! inside the closure cannot be invalidated before the write lands.
//!
//! The collaborators this core delegates to are traits:
//! - [`TransactionSource`]: completed ledger records for a period
//! - [`PostingService`]: double-entry posting of settlements
//! - [`PayoutGateway`]: money movement to a partner destination
//!
//! In-memory implementations live in [`memory`].

pub mod collaborators;
pub mod idempotency;
pub mod memory;
pub mod store;

pub use collaborators::{
    PayoutGateway, PayoutReceipt, PayoutRequest, PostingReceipt, PostingService, TransactionSource,
};
pub use idempotency::PayoutReferenceGuard;
pub use memory::{InMemoryTransactionSource, RecordingPayoutGateway, RecordingPostingService};
pub use store::{LedgerStore, StoreState};
