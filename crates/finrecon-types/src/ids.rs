//! Globally unique identifiers used throughout finrecon.
//!
//! Internally generated entity IDs use UUIDv7 for time-ordered lexicographic
//! sorting. `LedgerRecordId` wraps the transaction store's own identifier,
//! which is opaque to us.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declares a UUIDv7-backed identifier with a display prefix.
macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            #[must_use]
            pub fn from_bytes(bytes: [u8; 16]) -> Self {
                Self(Uuid::from_bytes(bytes))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

uuid_id!(
    /// Identifier of one reconciliation run (one statement import).
    RunId,
    "run"
);

uuid_id!(
    /// Identifier of one line within a reconciliation run.
    ItemId,
    "item"
);

uuid_id!(
    /// Identifier of a partner payout obligation.
    SettlementId,
    "stl"
);

uuid_id!(
    /// Identifier of an itemized settlement contribution.
    LineItemId,
    "line"
);

uuid_id!(
    /// Identifier of a receiving partner (underwriter, agency, mobilizer, ...).
    PartnerId,
    "partner"
);

// ---------------------------------------------------------------------------
// LedgerRecordId
// ---------------------------------------------------------------------------

/// Identifier assigned by the internal transaction ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LedgerRecordId(pub String);

impl LedgerRecordId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LedgerRecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
