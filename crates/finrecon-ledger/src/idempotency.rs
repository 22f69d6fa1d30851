//! Payout reference guard: prevents double confirmation.
//!
//! Each external payout reference can confirm exactly one settlement.
//! Confirming a second settlement with a reference already seen returns
//! [`FinreconError::DuplicatePayoutReference`]. Re-presenting the reference
//! for the settlement that already owns it is accepted (gateway retries).
//!
//! The guard lives inside [`crate::StoreState`] and is never pruned: a
//! reference stays bound for as long as the settlements it paid.

use std::collections::HashMap;

use finrecon_types::{FinreconError, Result, SettlementId};

/// Remembers which settlement each payout reference confirmed.
#[derive(Debug, Clone, Default)]
pub struct PayoutReferenceGuard {
    owners: HashMap<String, SettlementId>,
}

impl PayoutReferenceGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `reference` to `settlement`.
    ///
    /// # Errors
    /// Returns [`FinreconError::DuplicatePayoutReference`] if the reference
    /// already confirmed a different settlement.
    pub fn claim(&mut self, reference: &str, settlement: SettlementId) -> Result<()> {
        match self.owners.get(reference) {
            Some(owner) if *owner == settlement => Ok(()),
            Some(_) => Err(FinreconError::DuplicatePayoutReference(reference.to_string())),
            None => {
                self.owners.insert(reference.to_string(), settlement);
                Ok(())
            }
        }
    }

    /// Move a reference from the settlement it confirmed to its re-issue.
    ///
    /// # Errors
    /// Returns [`FinreconError::DuplicatePayoutReference`] unless the
    /// reference is owned by `from` (or already by `to`).
    pub fn transfer(&mut self, reference: &str, from: SettlementId, to: SettlementId) -> Result<()> {
        match self.owners.get_mut(reference) {
            Some(owner) if *owner == to => Ok(()),
            Some(owner) if *owner == from => {
                *owner = to;
                Ok(())
            }
            _ => Err(FinreconError::DuplicatePayoutReference(reference.to_string())),
        }
    }

    /// The settlement a reference confirmed.
    #[must_use]
    pub fn owner(&self, reference: &str) -> Option<SettlementId> {
        self.owners.get(reference).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}
