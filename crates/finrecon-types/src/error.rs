//! Error types for finrecon.
//!
//! All errors use the `FR_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by family:
//! - 1xx: Not found
//! - 2xx: Invalid state transitions
//! - 3xx: Validation failures
//! - 4xx: Collaborator failures (posting service, payout gateway)
//! - 5xx: Conflicts
//! - 6xx: Invariant violations
//! - 9xx: General / internal errors

use thiserror::Error;

use crate::{ItemId, LedgerRecordId, PartnerId, RunId, SettlementId};

/// Coarse error taxonomy shared by every operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvalidStateTransition,
    ValidationFailure,
    CollaboratorFailure,
    Conflict,
    InvariantViolation,
    Internal,
}

/// Central error enum for all finrecon operations.
#[derive(Debug, Error)]
pub enum FinreconError {
    // =================================================================
    // Not Found (1xx)
    // =================================================================
    /// No reconciliation run with this ID.
    #[error("FR_ERR_100: Reconciliation run not found: {0}")]
    RunNotFound(RunId),

    /// No reconciliation item with this ID.
    #[error("FR_ERR_101: Reconciliation item not found: {0}")]
    ItemNotFound(ItemId),

    /// No settlement with this ID.
    #[error("FR_ERR_102: Settlement not found: {0}")]
    SettlementNotFound(SettlementId),

    /// The transaction store has no record with this ID.
    #[error("FR_ERR_103: Ledger record not found: {0}")]
    LedgerRecordNotFound(LedgerRecordId),

    /// No partner registered with this ID.
    #[error("FR_ERR_104: Partner not found: {0}")]
    PartnerNotFound(PartnerId),

    // =================================================================
    // Invalid State Transitions (2xx)
    // =================================================================
    /// The operation is not legal for the entity's current status.
    #[error("FR_ERR_200: Invalid state transition for {entity}: {from} -> {to}")]
    InvalidStateTransition {
        entity: String,
        from: String,
        to: String,
    },

    // =================================================================
    // Validation (3xx)
    // =================================================================
    /// A required field is missing or a value is out of range.
    #[error("FR_ERR_300: Validation failed: {reason}")]
    Validation { reason: String },

    /// No payout destination on the request or the partner profile.
    #[error("FR_ERR_301: No payout destination for settlement {0}")]
    MissingPayoutDestination(SettlementId),

    /// The partner type is not eligible for the requested settlement type.
    #[error("FR_ERR_302: Partner {partner} of type {partner_type} is not eligible for {settlement_type} settlements")]
    PartnerNotEligible {
        partner: PartnerId,
        partner_type: String,
        settlement_type: String,
    },

    // =================================================================
    // Collaborator Failures (4xx)
    // =================================================================
    /// An external collaborator (posting service, payout gateway) failed.
    #[error("FR_ERR_400: Collaborator {service} failed: {reason}")]
    Collaborator { service: String, reason: String },

    // =================================================================
    // Conflicts (5xx)
    // =================================================================
    /// The item is already matched; manual overwrite is refused.
    #[error("FR_ERR_500: Item already matched: {0}")]
    ItemAlreadyMatched(ItemId),

    /// The ledger record is already claimed by another item.
    #[error("FR_ERR_501: Ledger record already claimed: {0}")]
    LedgerRecordClaimed(LedgerRecordId),

    /// The same statement was already imported.
    #[error("FR_ERR_502: Duplicate statement import: digest {digest} already reconciled in run {run}")]
    DuplicateStatement { digest: String, run: RunId },

    /// The payout reference already confirmed another settlement.
    #[error("FR_ERR_503: Payout reference already used: {0}")]
    DuplicatePayoutReference(String),

    /// The settlement's payout was confirmed; re-issuing it would pay twice.
    #[error("FR_ERR_504: Settlement {settlement} already disbursed under payout {reference}")]
    PayoutAlreadyDisbursed {
        settlement: String,
        reference: String,
    },

    /// A live settlement of the same type already covers the partner and period.
    #[error("FR_ERR_505: {settlement_type} settlement {existing} already covers partner {partner} for {period}")]
    DuplicateSettlement {
        partner: PartnerId,
        settlement_type: String,
        period: String,
        existing: String,
    },

    // =================================================================
    // Invariant Violations (6xx)
    // =================================================================
    /// A monetary or counter invariant does not hold. Critical alert.
    #[error("FR_ERR_600: Invariant violation: {reason}")]
    InvariantViolation { reason: String },

    /// Integer minor-unit arithmetic overflowed.
    #[error("FR_ERR_601: Arithmetic overflow: {context}")]
    Overflow { context: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("FR_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("FR_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid rates, bad document, etc.).
    #[error("FR_ERR_902: Configuration error: {0}")]
    Configuration(String),
}

impl FinreconError {
    /// Shorthand for a [`FinreconError::Validation`] error.
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`FinreconError::InvalidStateTransition`] error.
    pub fn transition(
        entity: impl std::fmt::Display,
        from: impl std::fmt::Display,
        to: impl std::fmt::Display,
    ) -> Self {
        Self::InvalidStateTransition {
            entity: entity.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Shorthand for a [`FinreconError::Collaborator`] error.
    pub fn collaborator(service: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Collaborator {
            service: service.into(),
            reason: reason.into(),
        }
    }

    /// The stable `FR_ERR_nnn` code, as it appears in the message.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::RunNotFound(_) => "FR_ERR_100",
            Self::ItemNotFound(_) => "FR_ERR_101",
            Self::SettlementNotFound(_) => "FR_ERR_102",
            Self::LedgerRecordNotFound(_) => "FR_ERR_103",
            Self::PartnerNotFound(_) => "FR_ERR_104",
            Self::InvalidStateTransition { .. } => "FR_ERR_200",
            Self::Validation { .. } => "FR_ERR_300",
            Self::MissingPayoutDestination(_) => "FR_ERR_301",
            Self::PartnerNotEligible { .. } => "FR_ERR_302",
            Self::Collaborator { .. } => "FR_ERR_400",
            Self::ItemAlreadyMatched(_) => "FR_ERR_500",
            Self::LedgerRecordClaimed(_) => "FR_ERR_501",
            Self::DuplicateStatement { .. } => "FR_ERR_502",
            Self::DuplicatePayoutReference(_) => "FR_ERR_503",
            Self::PayoutAlreadyDisbursed { .. } => "FR_ERR_504",
            Self::DuplicateSettlement { .. } => "FR_ERR_505",
            Self::InvariantViolation { .. } => "FR_ERR_600",
            Self::Overflow { .. } => "FR_ERR_601",
            Self::Internal(_) => "FR_ERR_900",
            Self::Serialization(_) => "FR_ERR_901",
            Self::Configuration(_) => "FR_ERR_902",
        }
    }

    /// The taxonomy bucket this error belongs to.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RunNotFound(_)
            | Self::ItemNotFound(_)
            | Self::SettlementNotFound(_)
            | Self::LedgerRecordNotFound(_)
            | Self::PartnerNotFound(_) => ErrorKind::NotFound,
            Self::InvalidStateTransition { .. } => ErrorKind::InvalidStateTransition,
            Self::Validation { .. }
            | Self::MissingPayoutDestination(_)
            | Self::PartnerNotEligible { .. } => ErrorKind::ValidationFailure,
            Self::Collaborator { .. } => ErrorKind::CollaboratorFailure,
            Self::ItemAlreadyMatched(_)
            | Self::LedgerRecordClaimed(_)
            | Self::DuplicateStatement { .. }
            | Self::DuplicatePayoutReference(_)
            | Self::PayoutAlreadyDisbursed { .. }
            | Self::DuplicateSettlement { .. } => ErrorKind::Conflict,
            Self::InvariantViolation { .. } | Self::Overflow { .. } => ErrorKind::InvariantViolation,
            Self::Internal(_) | Self::Serialization(_) | Self::Configuration(_) => {
                ErrorKind::Internal
            }
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, FinreconError>;

impl From<serde_json::Error> for FinreconError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_prefix() {
        let err = FinreconError::RunNotFound(RunId::new());
        let msg = format!("{err}");
        assert!(msg.starts_with("FR_ERR_100"), "Got: {msg}");
    }

    #[test]
    fn transition_display() {
        let err = FinreconError::transition("settlement", "PENDING", "COMPLETED");
        let msg = format!("{err}");
        assert!(msg.contains("FR_ERR_200"));
        assert!(msg.contains("PENDING"));
        assert!(msg.contains("COMPLETED"));
    }

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(
            FinreconError::ItemNotFound(ItemId::new()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            FinreconError::ItemAlreadyMatched(ItemId::new()).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            FinreconError::MissingPayoutDestination(SettlementId::new()).kind(),
            ErrorKind::ValidationFailure
        );
        assert_eq!(
            FinreconError::collaborator("payout", "timeout").kind(),
            ErrorKind::CollaboratorFailure
        );
        assert_eq!(
            FinreconError::transition("settlement", "A", "B").kind(),
            ErrorKind::InvalidStateTransition
        );
    }

    #[test]
    fn all_errors_have_fr_err_prefix() {
        let errors: Vec<Box<dyn std::error::Error>> = vec![
            Box::new(FinreconError::validation("missing approver")),
            Box::new(FinreconError::LedgerRecordClaimed(LedgerRecordId::new("tx-1"))),
            Box::new(FinreconError::DuplicatePayoutReference("PAY-1".into())),
            Box::new(FinreconError::Internal("test".into())),
            Box::new(FinreconError::InvariantViolation {
                reason: "parts != whole".into(),
            }),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(
                msg.starts_with("FR_ERR_"),
                "Error missing FR_ERR_ prefix: {msg}"
            );
        }
    }

    #[test]
    fn code_matches_message_prefix() {
        let errors = [
            FinreconError::PartnerNotFound(PartnerId::new()),
            FinreconError::collaborator("posting", "down"),
            FinreconError::DuplicateStatement {
                digest: "ab".into(),
                run: RunId::new(),
            },
            FinreconError::Overflow {
                context: "total".into(),
            },
            FinreconError::PayoutAlreadyDisbursed {
                settlement: "STL-FEE-202601-000001".into(),
                reference: "PAY-1".into(),
            },
            FinreconError::DuplicateSettlement {
                partner: PartnerId::new(),
                settlement_type: "FEE".into(),
                period: "2026-01-01..2026-01-31".into(),
                existing: "STL-FEE-202601-000001".into(),
            },
            FinreconError::Configuration("bad".into()),
        ];
        for err in &errors[2..] {
            if matches!(
                err,
                FinreconError::PayoutAlreadyDisbursed { .. } | FinreconError::DuplicateSettlement { .. }
            ) {
                assert_eq!(err.kind(), ErrorKind::Conflict);
            }
        }
        for err in errors {
            assert!(err.to_string().starts_with(err.code()), "{err}");
        }
    }

    #[test]
    fn serde_json_error_converts() {
        let err: FinreconError = serde_json::from_str::<u8>("nope").unwrap_err().into();
        assert!(matches!(err, FinreconError::Serialization(_)));
    }
}
