//! Settlement lifecycle manager.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use finrecon_ledger::{
    LedgerStore, PayoutGateway, PayoutRequest, PostingService, StoreState, TransactionSource,
};
use finrecon_types::{
    CommissionAllocation, FinreconError, LineItemDraft, LineItemId, Money, Partner, PartnerId,
    Party, PayoutDestination, Period, Result, Settlement, SettlementConfig, SettlementId,
    SettlementLineItem, SettlementStatus, SettlementSummary, SettlementType, invariants,
};
use serde_json::{Value, json};

use crate::fees::fee_lines;

/// Metadata key holding the collaborator error of a FAILED settlement.
pub const META_COLLABORATOR_ERROR: &str = "collaborator_error";
/// Metadata key holding the cancellation reason.
pub const META_CANCEL_REASON: &str = "cancel_reason";
/// Metadata key linking a re-issued settlement to the failed one's number.
pub const META_RETRY_OF: &str = "retry_of";

/// Everything a new settlement is built from.
struct NewSettlement<'a> {
    partner: &'a Partner,
    settlement_type: SettlementType,
    period: Period,
    lines: Vec<LineItemDraft>,
    metadata: BTreeMap<String, Value>,
    retry_of: Option<SettlementId>,
}

/// Creates settlements and drives them through their lifecycle.
pub struct SettlementManager {
    store: Arc<LedgerStore>,
    config: SettlementConfig,
    source: Arc<dyn TransactionSource>,
    posting: Arc<dyn PostingService>,
    gateway: Arc<dyn PayoutGateway>,
}

impl SettlementManager {
    /// # Errors
    /// Returns `Configuration` if `config` is invalid.
    pub fn new(
        store: Arc<LedgerStore>,
        config: SettlementConfig,
        source: Arc<dyn TransactionSource>,
        posting: Arc<dyn PostingService>,
        gateway: Arc<dyn PayoutGateway>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            source,
            posting,
            gateway,
        })
    }

    // ── Partners ───────────────────────────────────────────────

    /// Register (or replace) a receiving partner.
    ///
    /// # Errors
    /// Returns `Validation` for a blank name or a blank payout destination.
    pub fn register_partner(&self, partner: Partner) -> Result<PartnerId> {
        if partner.name.trim().is_empty() {
            return Err(FinreconError::validation("partner name is required"));
        }
        if let Some(destination) = &partner.payout_destination {
            destination.validate()?;
        }
        let id = partner.id;
        self.store.transaction(|tx| {
            tx.upsert_partner(partner);
            Ok(())
        })?;
        Ok(id)
    }

    /// # Errors
    /// Returns `PartnerNotFound` for an unknown partner.
    pub fn partner(&self, id: PartnerId) -> Result<Partner> {
        self.store.read(|s| s.partner(id).cloned())
    }

    // ── Creation ───────────────────────────────────────────────

    /// Fee settlement over the partner's completed transactions in `period`.
    ///
    /// # Errors
    /// - `PartnerNotFound`
    /// - `PartnerNotEligible` if the partner type does not receive fees
    /// - `DuplicateSettlement` if a live fee settlement for the partner
    ///   overlaps `period`
    /// - `Validation` if the period has no transactions
    pub fn create_fee_settlement(&self, partner_id: PartnerId, period: Period) -> Result<Settlement> {
        let partner = self.partner(partner_id)?;
        if !self.config.fee_partner_types.contains(&partner.partner_type) {
            return Err(FinreconError::PartnerNotEligible {
                partner: partner_id,
                partner_type: partner.partner_type.to_string(),
                settlement_type: SettlementType::Fee.to_string(),
            });
        }

        let records = self.source.completed_records(&period)?;
        let volume = Money::try_sum(records.iter().map(|r| r.amount), "transaction volume")?;
        let lines = fee_lines(&records, self.config.fee_rate)?;
        let metadata = BTreeMap::from([
            ("transaction_count".to_string(), json!(records.len())),
            ("transaction_volume".to_string(), json!(volume.minor())),
            ("fee_rate".to_string(), json!(self.config.fee_rate.to_string())),
        ]);

        let settlement = self.store.transaction(|tx| {
            if let Some(existing) = live_fee_settlement(tx, partner_id, &period) {
                return Err(FinreconError::DuplicateSettlement {
                    partner: partner_id,
                    settlement_type: SettlementType::Fee.to_string(),
                    period: period.to_string(),
                    existing: existing.number.clone(),
                });
            }
            self.open(
                tx,
                NewSettlement {
                    partner: &partner,
                    settlement_type: SettlementType::Fee,
                    period,
                    lines,
                    metadata,
                    retry_of: None,
                },
            )
        })?;
        tracing::info!(
            settlement = %settlement.number,
            partner = %partner.name,
            transactions = records.len(),
            total = %settlement.total_amount,
            "Fee settlement created"
        );
        Ok(settlement)
    }

    /// Commission settlement from pre-computed line items.
    ///
    /// # Errors
    /// - `PartnerNotFound`
    /// - `Validation` for no lines or a non-positive total
    pub fn create_commission_settlement(
        &self,
        partner_id: PartnerId,
        period: Period,
        lines: Vec<LineItemDraft>,
        metadata: BTreeMap<String, Value>,
    ) -> Result<Settlement> {
        let settlement = self.store.transaction(|tx| {
            let partner = tx.partner(partner_id)?.clone();
            self.open(
                tx,
                NewSettlement {
                    partner: &partner,
                    settlement_type: SettlementType::Commission,
                    period,
                    lines,
                    metadata,
                    retry_of: None,
                },
            )
        })?;
        tracing::info!(
            settlement = %settlement.number,
            partner = %settlement.partner_name,
            total = %settlement.total_amount,
            "Commission settlement created"
        );
        Ok(settlement)
    }

    /// Commission settlement paying `party` its share of `allocation`.
    ///
    /// # Errors
    /// - `InvariantViolation` if the allocation does not foot
    /// - see [`SettlementManager::create_commission_settlement`]
    pub fn create_commission_settlement_from_allocation(
        &self,
        partner_id: PartnerId,
        period: Period,
        allocation: &CommissionAllocation,
        party: Party,
    ) -> Result<Settlement> {
        invariants::check_allocation_foot(allocation)?;
        let metadata = BTreeMap::from([
            ("party".to_string(), json!(party.to_string())),
            ("policy_count".to_string(), json!(allocation.policy_count)),
            (
                "total_commission".to_string(),
                json!(allocation.total_commission.minor()),
            ),
        ]);
        self.create_commission_settlement(
            partner_id,
            period,
            allocation.line_items_for(party),
            metadata,
        )
    }

    fn open(&self, tx: &mut StoreState, new: NewSettlement<'_>) -> Result<Settlement> {
        if new.lines.is_empty() {
            return Err(FinreconError::validation(format!(
                "{} settlement for {} in {} has no line items",
                new.settlement_type, new.partner.name, new.period
            )));
        }
        let total = new
            .lines
            .iter()
            .try_fold(Money::ZERO, |acc, l| acc.checked_add(l.amount))
            .ok_or_else(|| FinreconError::Overflow {
                context: "settlement total".into(),
            })?;
        if total <= Money::ZERO {
            return Err(FinreconError::validation(format!(
                "settlement total must be positive, got {total}"
            )));
        }
        let line_item_count = u32::try_from(new.lines.len()).map_err(|_| FinreconError::Overflow {
            context: "settlement line count".into(),
        })?;

        let id = SettlementId::new();
        let number = format!(
            "{}-{}-{}-{:06}",
            self.config.number_prefix,
            new.settlement_type.code(),
            new.period.label(),
            tx.next_settlement_sequence()
        );
        let lines = new
            .lines
            .into_iter()
            .zip(1u32..)
            .map(|(draft, line_number)| SettlementLineItem {
                id: LineItemId::new(),
                settlement_id: id,
                line_number,
                description: draft.description,
                amount: draft.amount,
                ledger_id: draft.ledger_id,
            })
            .collect();

        let now = Utc::now();
        let settlement = Settlement {
            id,
            number,
            partner_id: new.partner.id,
            partner_name: new.partner.name.clone(),
            settlement_type: new.settlement_type,
            period: new.period,
            total_amount: total,
            line_item_count,
            status: SettlementStatus::Pending,
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
            retry_of: new.retry_of,
            metadata: new.metadata,
            created_at: now,
            updated_at: now,
        };
        tx.insert_settlement(settlement.clone(), lines)?;
        Ok(settlement)
    }

    // ── Lifecycle ──────────────────────────────────────────────

    /// PENDING → APPROVED.
    ///
    /// # Errors
    /// - `SettlementNotFound`
    /// - `InvalidStateTransition` unless PENDING
    /// - `Validation` for a blank approver
    pub fn approve(&self, id: SettlementId, approved_by: &str) -> Result<Settlement> {
        let approved_by = required("approved_by", approved_by)?;
        let settlement = self.store.transaction(|tx| {
            let s = tx.settlement_mut(id)?;
            s.transition(SettlementStatus::Approved)?;
            s.approved_by = Some(approved_by);
            s.approved_at = Some(s.updated_at);
            Ok(s.clone())
        })?;
        tracing::info!(settlement = %settlement.number, "Settlement approved");
        Ok(settlement)
    }

    /// APPROVED → PROCESSING, then hand the payout to the gateway.
    ///
    /// The destination is `destination`, else the one already on the
    /// settlement, else the partner's registered default. A gateway error
    /// moves the settlement to FAILED and is returned as `Ok`.
    ///
    /// A settlement re-issued by [`SettlementManager::retry_posting`] was
    /// already paid: it moves to PROCESSING with its carried payout and the
    /// gateway is not called again.
    ///
    /// # Errors
    /// - `SettlementNotFound`
    /// - `InvalidStateTransition` unless APPROVED
    /// - `MissingPayoutDestination` if no destination resolves
    pub fn process(
        &self,
        id: SettlementId,
        bank_reference: Option<&str>,
        destination: Option<PayoutDestination>,
    ) -> Result<Settlement> {
        let settlement = self.store.transaction(|tx| {
            let current = tx.settlement(id)?;
            if !current.status.can_transition_to(SettlementStatus::Processing) {
                return Err(FinreconError::transition(
                    format!("settlement {}", current.number),
                    current.status,
                    SettlementStatus::Processing,
                ));
            }
            if let Some(reference) = inherited_payout(tx, current) {
                let s = tx.settlement_mut(id)?;
                s.transition(SettlementStatus::Processing)?;
                s.processed_at = Some(s.updated_at);
                if let Some(bank_reference) =
                    bank_reference.map(str::trim).filter(|r| !r.is_empty())
                {
                    s.bank_reference = Some(bank_reference.to_string());
                }
                tracing::info!(
                    settlement = %s.number,
                    payout_reference = %reference,
                    "Payout already disbursed, gateway skipped"
                );
                return Ok(s.clone());
            }
            let fallback = current.payout_destination.clone();
            let registered = tx.partner(current.partner_id)?.payout_destination.clone();
            let destination = destination
                .or(fallback)
                .or(registered)
                .ok_or(FinreconError::MissingPayoutDestination(id))?;
            destination.validate()?;

            let s = tx.settlement_mut(id)?;
            s.transition(SettlementStatus::Processing)?;
            s.processed_at = Some(s.updated_at);
            s.bank_reference = bank_reference
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string);
            s.payout_destination = Some(destination.clone());

            let request = PayoutRequest {
                settlement_id: id,
                settlement_number: s.number.clone(),
                destination,
                amount: s.total_amount,
                bank_reference: s.bank_reference.clone(),
            };
            match self.gateway.disburse(&request) {
                Ok(receipt) => s.payout_reference = Some(receipt.external_reference),
                Err(err) => mark_failed(s, "payout gateway rejected the disbursement", &err)?,
            }
            Ok(s.clone())
        })?;

        match settlement.status {
            SettlementStatus::Failed => tracing::warn!(
                settlement = %settlement.number,
                reason = settlement.failure_reason.as_deref().unwrap_or_default(),
                "Payout failed"
            ),
            _ => tracing::info!(
                settlement = %settlement.number,
                amount = %settlement.total_amount,
                payout_reference = settlement.payout_reference.as_deref().unwrap_or_default(),
                "Payout submitted"
            ),
        }
        Ok(settlement)
    }

    /// PROCESSING → COMPLETED once the payout is confirmed and posted.
    ///
    /// `external_reference` is the gateway's confirmation reference and can
    /// complete one settlement only. A posting error moves the settlement to
    /// FAILED and is returned as `Ok`.
    ///
    /// # Errors
    /// - `SettlementNotFound`
    /// - `InvalidStateTransition` unless PROCESSING
    /// - `Validation` for a blank reference
    /// - `DuplicatePayoutReference` if the reference confirmed another settlement
    pub fn confirm_payout(&self, id: SettlementId, external_reference: &str) -> Result<Settlement> {
        let reference = required("external_reference", external_reference)?;
        let settlement = self.store.transaction(|tx| {
            let current = tx.settlement(id)?.clone();
            if current.status != SettlementStatus::Processing {
                return Err(FinreconError::transition(
                    format!("settlement {}", current.number),
                    current.status,
                    SettlementStatus::Completed,
                ));
            }
            if current
                .payout_reference
                .as_ref()
                .is_some_and(|submitted| *submitted != reference)
            {
                tracing::warn!(
                    settlement = %current.number,
                    confirmed = %reference,
                    "Confirmation reference differs from the submitted payout"
                );
            }
            match current.retry_of {
                Some(previous)
                    if tx.payout_references().owner(&reference) == Some(previous) =>
                {
                    tx.payout_references_mut().transfer(&reference, previous, id)?;
                }
                _ => tx.payout_references_mut().claim(&reference, id)?,
            }

            let posted = self.posting.post_settlement(&current);
            let s = tx.settlement_mut(id)?;
            s.payout_reference = Some(reference.clone());
            match posted {
                Ok(receipt) => {
                    s.transition(SettlementStatus::Completed)?;
                    s.journal_entry_id = Some(receipt.journal_entry_id);
                    s.settled_at = Some(s.updated_at);
                }
                Err(err) => mark_failed(s, "ledger posting failed", &err)?,
            }
            Ok(s.clone())
        })?;

        match settlement.status {
            SettlementStatus::Completed => tracing::info!(
                settlement = %settlement.number,
                journal_entry = settlement.journal_entry_id.as_deref().unwrap_or_default(),
                "Settlement completed"
            ),
            _ => tracing::warn!(
                settlement = %settlement.number,
                reason = settlement.failure_reason.as_deref().unwrap_or_default(),
                "Settlement posting failed"
            ),
        }
        Ok(settlement)
    }

    /// Asynchronous gateway failure for an APPROVED or PROCESSING settlement.
    ///
    /// # Errors
    /// - `SettlementNotFound`
    /// - `InvalidStateTransition` from any other state
    pub fn record_payout_failure(&self, id: SettlementId, reason: &str) -> Result<Settlement> {
        let reason = required("reason", reason)?;
        let settlement = self.store.transaction(|tx| {
            let s = tx.settlement_mut(id)?;
            if !matches!(
                s.status,
                SettlementStatus::Approved | SettlementStatus::Processing
            ) {
                return Err(FinreconError::transition(
                    format!("settlement {}", s.number),
                    s.status,
                    SettlementStatus::Failed,
                ));
            }
            let err = FinreconError::collaborator("payout", reason.clone());
            mark_failed(s, &reason, &err)?;
            Ok(s.clone())
        })?;
        tracing::warn!(settlement = %settlement.number, reason = %reason, "Payout failure recorded");
        Ok(settlement)
    }

    /// Operator-initiated failure from any non-terminal state.
    ///
    /// # Errors
    /// - `SettlementNotFound`
    /// - `InvalidStateTransition` from a terminal state
    pub fn fail(&self, id: SettlementId, reason: &str) -> Result<Settlement> {
        let reason = required("reason", reason)?;
        let settlement = self.store.transaction(|tx| {
            let s = tx.settlement_mut(id)?;
            s.transition(SettlementStatus::Failed)?;
            s.failure_reason = Some(reason.clone());
            Ok(s.clone())
        })?;
        tracing::warn!(settlement = %settlement.number, reason = %reason, "Settlement failed");
        Ok(settlement)
    }

    /// Withdraw a settlement that has not completed.
    ///
    /// # Errors
    /// - `SettlementNotFound`
    /// - `InvalidStateTransition` from a terminal state
    /// - `Validation` for a blank operator
    pub fn cancel(&self, id: SettlementId, cancelled_by: &str, reason: Option<&str>) -> Result<Settlement> {
        let cancelled_by = required("cancelled_by", cancelled_by)?;
        let settlement = self.store.transaction(|tx| {
            let s = tx.settlement_mut(id)?;
            s.transition(SettlementStatus::Cancelled)?;
            s.cancelled_by = Some(cancelled_by);
            if let Some(reason) = reason {
                s.metadata.insert(META_CANCEL_REASON.into(), json!(reason));
            }
            Ok(s.clone())
        })?;
        tracing::info!(settlement = %settlement.number, "Settlement cancelled");
        Ok(settlement)
    }

    /// Re-issue a FAILED settlement as a new PENDING one with the same lines.
    ///
    /// The failed record is left untouched. A settlement is re-issued once.
    /// A settlement whose payout was confirmed cannot be re-issued here; use
    /// [`SettlementManager::retry_posting`].
    ///
    /// # Errors
    /// - `SettlementNotFound`
    /// - `InvalidStateTransition` unless FAILED
    /// - `PayoutAlreadyDisbursed` if the payout was confirmed
    /// - `Validation` if it was already re-issued
    pub fn retry(&self, id: SettlementId) -> Result<Settlement> {
        let settlement = self.store.transaction(|tx| {
            let failed = reissuable(tx, id)?;
            if let Some(reference) =
                confirmed_payout(tx, &failed).or_else(|| inherited_payout(tx, &failed))
            {
                return Err(FinreconError::PayoutAlreadyDisbursed {
                    settlement: failed.number,
                    reference,
                });
            }
            self.reissue(tx, &failed)
        })?;
        tracing::info!(
            settlement = %settlement.number,
            retry_of = %id,
            "Failed settlement re-issued"
        );
        Ok(settlement)
    }

    /// Re-issue a settlement whose payout was confirmed but whose posting
    /// failed.
    ///
    /// The new PENDING settlement carries the confirmed payout reference and
    /// destination. Processing it skips the gateway; confirming it with the
    /// carried reference posts the settlement once.
    ///
    /// # Errors
    /// - `SettlementNotFound`
    /// - `InvalidStateTransition` unless FAILED
    /// - `Validation` if the payout was never confirmed or it was already
    ///   re-issued
    pub fn retry_posting(&self, id: SettlementId) -> Result<Settlement> {
        let settlement = self.store.transaction(|tx| {
            let failed = reissuable(tx, id)?;
            let reference = if let Some(reference) = confirmed_payout(tx, &failed) {
                reference
            } else if let (Some(reference), Some(previous)) =
                (inherited_payout(tx, &failed), failed.retry_of)
            {
                // Failed before its own confirmation; the next re-issue inherits from here.
                tx.payout_references_mut()
                    .transfer(&reference, previous, failed.id)?;
                reference
            } else {
                return Err(FinreconError::validation(format!(
                    "settlement {} has no confirmed payout to carry over",
                    failed.number
                )));
            };
            let reissued = self.reissue(tx, &failed)?;
            let s = tx.settlement_mut(reissued.id)?;
            s.payout_reference = Some(reference);
            s.payout_destination = failed.payout_destination.clone();
            s.bank_reference = failed.bank_reference.clone();
            Ok(s.clone())
        })?;
        tracing::info!(
            settlement = %settlement.number,
            retry_of = %id,
            payout_reference = settlement.payout_reference.as_deref().unwrap_or_default(),
            "Settlement re-issued for posting"
        );
        Ok(settlement)
    }

    fn reissue(&self, tx: &mut StoreState, failed: &Settlement) -> Result<Settlement> {
        let partner = tx.partner(failed.partner_id)?.clone();
        let lines = tx
            .settlement_lines(failed.id)?
            .iter()
            .map(|l| LineItemDraft {
                description: l.description.clone(),
                amount: l.amount,
                ledger_id: l.ledger_id.clone(),
            })
            .collect();
        let mut metadata = failed.metadata.clone();
        metadata.remove(META_COLLABORATOR_ERROR);
        metadata.insert(META_RETRY_OF.into(), json!(failed.number));
        self.open(
            tx,
            NewSettlement {
                partner: &partner,
                settlement_type: failed.settlement_type,
                period: failed.period,
                lines,
                metadata,
                retry_of: Some(failed.id),
            },
        )
    }

    // ── Queries ────────────────────────────────────────────────

    /// # Errors
    /// Returns `SettlementNotFound` for an unknown settlement.
    pub fn get(&self, id: SettlementId) -> Result<Settlement> {
        self.store.read(|s| s.settlement(id).cloned())
    }

    /// Line items in line order.
    ///
    /// # Errors
    /// Returns `SettlementNotFound` for an unknown settlement.
    pub fn lines(&self, id: SettlementId) -> Result<Vec<SettlementLineItem>> {
        self.store.read(|s| s.settlement_lines(id).map(<[_]>::to_vec))
    }

    #[must_use]
    pub fn by_partner(&self, partner_id: PartnerId) -> Vec<Settlement> {
        self.select(|s| s.partner_id == partner_id)
    }

    #[must_use]
    pub fn by_status(&self, status: SettlementStatus) -> Vec<Settlement> {
        self.select(|s| s.status == status)
    }

    /// Settlements awaiting approval.
    #[must_use]
    pub fn pending_queue(&self) -> Vec<Settlement> {
        self.by_status(SettlementStatus::Pending)
    }

    /// Settlements awaiting processing.
    #[must_use]
    pub fn approved_queue(&self) -> Vec<Settlement> {
        self.by_status(SettlementStatus::Approved)
    }

    #[must_use]
    pub fn summary(&self) -> SettlementSummary {
        self.store
            .read(|s| SettlementSummary::from_settlements(s.settlements()))
    }

    fn select(&self, predicate: impl Fn(&Settlement) -> bool) -> Vec<Settlement> {
        self.store.read(|s| {
            s.settlements()
                .filter(|settlement| predicate(settlement))
                .cloned()
                .collect()
        })
    }
}

/// A FAILED settlement that has not been re-issued yet.
fn reissuable(tx: &StoreState, id: SettlementId) -> Result<Settlement> {
    let failed = tx.settlement(id)?;
    if failed.status != SettlementStatus::Failed {
        return Err(FinreconError::transition(
            format!("settlement {}", failed.number),
            failed.status,
            "RETRY",
        ));
    }
    if let Some(previous) = tx.settlements().find(|s| s.retry_of == Some(id)) {
        return Err(FinreconError::validation(format!(
            "settlement {} was already re-issued as {}",
            failed.number, previous.number
        )));
    }
    Ok(failed.clone())
}

/// The payout reference this settlement confirmed, if any.
fn confirmed_payout(tx: &StoreState, settlement: &Settlement) -> Option<String> {
    settlement
        .payout_reference
        .clone()
        .filter(|r| tx.payout_references().owner(r) == Some(settlement.id))
}

/// The confirmed payout a posting re-issue carries from its predecessor.
fn inherited_payout(tx: &StoreState, settlement: &Settlement) -> Option<String> {
    let previous = settlement.retry_of?;
    settlement
        .payout_reference
        .clone()
        .filter(|r| tx.payout_references().owner(r) == Some(previous))
}

/// A fee settlement for the partner whose period overlaps `period` and that
/// still stands for the obligation: not cancelled, and not failed and
/// already re-issued.
fn live_fee_settlement<'a>(
    tx: &'a StoreState,
    partner_id: PartnerId,
    period: &Period,
) -> Option<&'a Settlement> {
    tx.settlements().find(|s| {
        s.partner_id == partner_id
            && s.settlement_type == SettlementType::Fee
            && s.period.overlaps(period)
            && match s.status {
                SettlementStatus::Cancelled => false,
                SettlementStatus::Failed => !tx.settlements().any(|r| r.retry_of == Some(s.id)),
                _ => true,
            }
    })
}

/// Move to FAILED, keeping the collaborator's error in metadata.
fn mark_failed(settlement: &mut Settlement, reason: &str, err: &FinreconError) -> Result<()> {
    settlement.transition(SettlementStatus::Failed)?;
    settlement.failure_reason = Some(format!("{reason}: {err}"));
    let detail = match err {
        FinreconError::Collaborator { service, reason } => {
            json!({ "code": err.code(), "service": service, "reason": reason })
        }
        other => json!({ "code": other.code(), "reason": other.to_string() }),
    };
    settlement
        .metadata
        .insert(META_COLLABORATOR_ERROR.into(), detail);
    Ok(())
}

fn required(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FinreconError::validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}
