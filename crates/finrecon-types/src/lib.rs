//! # finrecon-types
//!
//! Shared types, errors, and configuration for **finrecon**, the statement
//! reconciliation, commission allocation and partner settlement core.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Money**: [`Money`] (signed integer minor units), [`Period`]
//! - **Identifiers**: [`RunId`], [`ItemId`], [`SettlementId`], [`LineItemId`], [`PartnerId`], [`LedgerRecordId`]
//! - **Reconciliation model**: [`StatementItem`], [`LedgerRecord`], [`ReconciliationRun`], [`ReconciliationItem`], [`MatchType`]
//! - **Settlement model**: [`Settlement`], [`SettlementLineItem`], [`SettlementStatus`], [`Partner`]
//! - **Commission model**: [`CommissionAllocation`], [`CommissionBreakdown`], [`CommissionDistribution`]
//! - **Configuration**: [`FinreconConfig`], [`MatchConfig`], [`CommissionConfig`], [`SettlementConfig`]
//! - **Errors**: [`FinreconError`] with `FR_ERR_` prefix codes
//! - **Invariant checks**: foot-checks over runs, settlements and allocations
//! - **Constants**: system-wide defaults

pub mod commission;
pub mod config;
pub mod constants;
pub mod error;
pub mod ids;
pub mod invariants;
pub mod money;
pub mod reconciliation;
pub mod settlement;

// Re-export all primary types at crate root for ergonomic imports:
//   use finrecon_types::{Money, Period, ReconciliationRun, Settlement, ...};

pub use commission::*;
pub use config::*;
pub use error::*;
pub use ids::*;
pub use money::*;
pub use reconciliation::*;
pub use settlement::*;

// Constants are accessed via `finrecon_types::constants::FOO` and invariant
// checks via `finrecon_types::invariants::check_*` (not re-exported).
