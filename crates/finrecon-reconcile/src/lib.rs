//! # finrecon-reconcile
//!
//! **Statement reconciliation runs.**
//!
//! ## Architecture
//!
//! The [`Reconciler`] receives one external statement and the ledger
//! records of the same period and:
//! 1. Drops ledger records already claimed by earlier runs
//! 2. Runs the pure MatchCore pass (scoring ladder, single claim, orphans)
//! 3. Persists the run header and every line in one store transaction
//!
//! Operators then work the open lines:
//! - **manual match**: force-link an open line to a ledger record
//! - **resolve**: close an open line without a counterpart (write-off)
//!
//! Both update the line and the run counters in the same transaction and
//! re-derive the run status.

pub mod reconciler;

pub use reconciler::{ReconciliationResult, Reconciler, StatementImport};
