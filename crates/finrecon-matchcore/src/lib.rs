//! # finrecon-matchcore
//!
//! **Pure statement-to-ledger matching.**
//!
//! MatchCore is the compute plane of reconciliation: it takes statement
//! items plus a pool of candidate ledger records and produces the run's
//! item lines and counters. It has:
//!
//! - **Zero side effects**: no store writes, no clocks beyond item IDs
//! - **Deterministic output**: same input order -> same pairing
//! - **Single claim**: a ledger record is linked to at most one statement line
//! - **Fixed rule ladder**: EXACT > AMOUNT_ONLY > REFERENCE_ONLY > FUZZY

pub mod matcher;
pub mod scorer;

pub use matcher::{MatchOutcome, match_statement};
pub use scorer::{MatchScore, score_candidate};
