//! Commission allocation result types.
//!
//! The same total commission is partitioned twice, independently:
//! - **breakdown** by allocation category (operating allowance, joint
//!   mobilization pool, profit-share pool)
//! - **distribution** by receiving party (platform, partner A, partner B)
//!
//! Both partitions must foot to the total exactly.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{LineItemDraft, Money, Period};

/// A receiving party of the commission distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Party {
    Platform,
    /// First mobilization partner.
    PartnerA,
    /// Second mobilization partner.
    PartnerB,
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Platform => write!(f, "PLATFORM"),
            Self::PartnerA => write!(f, "PARTNER_A"),
            Self::PartnerB => write!(f, "PARTNER_B"),
        }
    }
}

/// An active policy (or rider cover) record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActiveRider {
    pub policy_id: String,
    pub rider_id: String,
}

/// Partition of the total commission by allocation category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionBreakdown {
    /// Flat per-rider allowance actually funded (capped at the total commission).
    pub platform_operating_allowance: Money,
    pub joint_mobilization: Money,
    pub profit_share: Money,
    /// Part of the flat allowance the commission could not cover.
    pub allowance_shortfall: Money,
}

impl CommissionBreakdown {
    /// Sum of the funded categories.
    #[must_use]
    pub fn total(&self) -> Money {
        self.platform_operating_allowance + self.joint_mobilization + self.profit_share
    }
}

/// Partition of the total commission by receiving party.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionDistribution {
    /// Allowance + platform profit share + rounding remainders.
    pub platform_total: Money,
    pub partner_a_total: Money,
    pub partner_b_total: Money,
    pub partner_a_joint_share: Money,
    pub partner_b_joint_share: Money,
    pub platform_profit_share: Money,
    pub partner_a_profit_share: Money,
    pub partner_b_profit_share: Money,
    /// Minor units left over by the equal splits, credited to the platform.
    pub rounding_remainder: Money,
}

impl CommissionDistribution {
    /// Sum over the three parties.
    #[must_use]
    pub fn total(&self) -> Money {
        self.platform_total + self.partner_a_total + self.partner_b_total
    }

    #[must_use]
    pub fn for_party(&self, party: Party) -> Money {
        match party {
            Party::Platform => self.platform_total,
            Party::PartnerA => self.partner_a_total,
            Party::PartnerB => self.partner_b_total,
        }
    }
}

/// Result of one allocation. Ephemeral: never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionAllocation {
    pub policy_count: u64,
    /// Distinct riders among the input records (informational only).
    pub distinct_riders: Option<u64>,
    pub pure_premium_per_policy: Money,
    pub commission_per_policy: Money,
    pub total_commission: Money,
    pub breakdown: CommissionBreakdown,
    pub distribution: CommissionDistribution,
    pub partner_a_label: String,
    pub partner_b_label: String,
}

impl CommissionAllocation {
    /// Both partitions foot to the total.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.breakdown.total() == self.total_commission
            && self.distribution.total() == self.total_commission
    }

    /// Line items a commission settlement for `party` is built from.
    /// Zero-amount components are skipped.
    #[must_use]
    pub fn line_items_for(&self, party: Party) -> Vec<LineItemDraft> {
        let d = &self.distribution;
        let lines = match party {
            Party::Platform => vec![
                LineItemDraft::new(
                    "Platform operating allowance",
                    self.breakdown.platform_operating_allowance,
                ),
                LineItemDraft::new("Platform profit share", d.platform_profit_share),
                LineItemDraft::new("Allocation rounding remainder", d.rounding_remainder),
            ],
            Party::PartnerA => vec![
                LineItemDraft::new(
                    format!("{} joint mobilization share", self.partner_a_label),
                    d.partner_a_joint_share,
                ),
                LineItemDraft::new(
                    format!("{} profit share", self.partner_a_label),
                    d.partner_a_profit_share,
                ),
            ],
            Party::PartnerB => vec![
                LineItemDraft::new(
                    format!("{} joint mobilization share", self.partner_b_label),
                    d.partner_b_joint_share,
                ),
                LineItemDraft::new(
                    format!("{} profit share", self.partner_b_label),
                    d.partner_b_profit_share,
                ),
            ],
        };
        lines.into_iter().filter(|l| !l.amount.is_zero()).collect()
    }
}

/// A commission calculation for a period, checked before a settlement is committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionPreview {
    pub period: Period,
    pub allocation: CommissionAllocation,
    /// Both partitions foot to the total.
    pub balanced: bool,
}
