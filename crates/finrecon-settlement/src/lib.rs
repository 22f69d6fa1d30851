//! # finrecon-settlement
//!
//! **Settlement lifecycle manager.**
//!
//! A settlement is a payout obligation to one partner for one period,
//! itemized into line items whose sum is the settlement total.
//!
//! ## Pipeline
//!
//! ```text
//! create (fee | commission) → PENDING
//!   → approve              → APPROVED
//!   → process (gateway)    → PROCESSING   | FAILED on gateway error
//!   → confirm (posting)    → COMPLETED    | FAILED on posting error
//! ```
//!
//! Every transition re-reads the settlement inside a store transaction, so
//! a lost update surfaces as a rejected transition. Collaborator failures
//! are recorded on the settlement as a FAILED transition instead of being
//! returned as errors. A FAILED settlement can be re-issued with
//! [`SettlementManager::retry`].

pub mod fees;
pub mod manager;

pub use fees::fee_lines;
pub use manager::SettlementManager;
